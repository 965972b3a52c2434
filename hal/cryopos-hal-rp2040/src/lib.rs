//! RP2040-specific HAL for the cryostat positioner firmware
//!
//! This crate provides RP2040 implementations of the `cryopos-hal` and
//! `cryopos-core` collaborator traits:
//!
//! - PIO-based step pulse timers, one state machine per axis
//! - GPIO pin bank for the general purpose I/O channels
//! - ADC channel bank
//! - Auxiliary PWM output

#![no_std]

pub mod adc;
pub mod gpio;
pub mod pwm;
pub mod step_timer;

pub use adc::AdcBank;
pub use gpio::{PinBank, SignalPin};
pub use pwm::AuxPwmOutput;
pub use step_timer::{StepChannel, StepControl, StepProgram};
