//! Motion engine
//!
//! Each motor axis is driven by its own step timer. Every timer period
//! produces one step pulse and one call to [`Axis::tick`], which updates the
//! position and advances the speed ramp. Commands from the dispatcher run
//! in a lower-priority context and only hand requests to the tick through
//! atomic fields.

mod axis;
mod clock;
pub mod ramp;

pub use axis::{
    Axis, AxisError, AxisStatus, RampOutcome, RampRequest, Signal, SignalSetting, SpeedOutcome,
    StepPhase, StepStatus,
};
pub use clock::{ClockSource, InvalidClock};
