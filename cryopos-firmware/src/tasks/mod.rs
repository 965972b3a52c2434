//! Embassy async tasks
//!
//! The axis tick tasks run on a high-priority interrupt executor; the
//! command and USB tasks run on the thread-mode executor.

pub mod axis;
pub mod command;
pub mod usb;

pub use axis::{m0_tick_task, m1_tick_task, m2_tick_task};
pub use command::command_task;
pub use usb::usb_task;
