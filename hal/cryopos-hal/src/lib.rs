//! Cryopos Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the motion engine and the command
//! dispatcher are written against. Chip-specific crates implement them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  cryopos-core (motion engine, commands) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cryopos-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ cryopos-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital signals (direction, enable)
//! - [`timer::StepTimer`] - Per-axis step pulse timer driven by a reload count

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod timer;

pub use gpio::{OutputPin, Stateful};
pub use timer::StepTimer;
