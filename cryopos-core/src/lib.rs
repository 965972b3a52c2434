//! Board-agnostic core logic for the cryopos stepper firmware
//!
//! This crate contains everything that does not depend on a specific chip:
//!
//! - Motion engine: one [`motion::Axis`] per motor, advanced by its own
//!   step timer tick, with acceleration-limited ramps and the three-phase
//!   move-to-position mode
//! - Command dispatcher: routes tokenized command lines to axes and to the
//!   board collaborators, and writes one response line per command
//! - Configuration type definitions
//! - Collaborator traits for pin I/O, ADC, auxiliary PWM and supervision

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod motion;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;
