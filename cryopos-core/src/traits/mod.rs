//! Board collaborator traits
//!
//! These traits define what the command dispatcher needs from the board
//! besides the motor axes: general pin I/O, analog inputs, the auxiliary
//! PWM output and watchdog/identity services.

pub mod io;
pub mod supervisor;

pub use io::{AnalogInput, AuxPwm, PinIo, PinMode, PinSetting};
pub use supervisor::Supervisor;

/// Everything the dispatcher needs from the board
pub trait Peripherals: PinIo + AnalogInput + AuxPwm + Supervisor {}

// Blanket implementation for types that implement all collaborator traits
impl<T: PinIo + AnalogInput + AuxPwm + Supervisor> Peripherals for T {}
