//! Configuration types
//!
//! The machine description is compiled into the firmware from
//! `machine.toml`; nothing is persisted at runtime.

mod types;

pub use types::*;
