//! Configuration type definitions

use heapless::String;

use crate::motion::ClockSource;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of motor axes
pub const NUM_AXES: usize = 3;

/// Maximum label length
pub const MAX_LABEL_LEN: usize = 16;

/// Default acceleration in steps/s²
pub const DEFAULT_ACCELERATION: u32 = 4000;

/// Lowest accepted acceleration in steps/s²
pub const ACCELERATION_MIN: u32 = 1000;

/// Highest accepted acceleration in steps/s²
pub const ACCELERATION_MAX: u32 = 10000;

/// Default floor speed in steps/s
pub const DEFAULT_MIN_SPEED: u32 = 25;

/// Static description of one motor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisConfig {
    /// I/O channel driving the driver's direction input
    pub dir_pin: u8,
    /// I/O channel driving the driver's enable input
    pub on_pin: u8,
    /// Initial direction polarity (high level means positive)
    #[cfg_attr(feature = "serde", serde(default))]
    pub dir_inverted: bool,
    /// Initial enable polarity (high level means off)
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_inverted: bool,
    /// Axis supports the three-phase `step` move
    #[cfg_attr(feature = "serde", serde(default))]
    pub can_step: bool,
    /// Floor speed in steps/s, also the parked speed
    #[cfg_attr(feature = "serde", serde(default = "default_min_speed"))]
    pub min_speed: u32,
    /// Power-on acceleration in steps/s²
    #[cfg_attr(feature = "serde", serde(default = "default_acceleration"))]
    pub acceleration: u32,
    /// Power-on clock source
    #[cfg_attr(feature = "serde", serde(default))]
    pub clock: ClockSource,
}

#[cfg(feature = "serde")]
fn default_min_speed() -> u32 {
    DEFAULT_MIN_SPEED
}

#[cfg(feature = "serde")]
fn default_acceleration() -> u32 {
    DEFAULT_ACCELERATION
}

impl AxisConfig {
    /// Axis on the given signal channels with default motion parameters
    pub const fn new(dir_pin: u8, on_pin: u8) -> Self {
        Self {
            dir_pin,
            on_pin,
            dir_inverted: false,
            on_inverted: false,
            can_step: false,
            min_speed: DEFAULT_MIN_SPEED,
            acceleration: DEFAULT_ACCELERATION,
            clock: ClockSource::DEFAULT,
        }
    }

    /// Same axis with an active-low enable input
    pub const fn with_enable_active_low(mut self) -> Self {
        self.on_inverted = true;
        self
    }

    /// Same axis with step moves enabled
    pub const fn with_step(mut self) -> Self {
        self.can_step = true;
        self
    }
}

/// Complete machine description
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineConfig {
    /// Product label reported by `ver`
    pub label: String<MAX_LABEL_LEN>,
    /// Motor axes, `m0` first
    #[cfg_attr(feature = "serde", serde(rename = "axis"))]
    pub axes: [AxisConfig; NUM_AXES],
}

impl MachineConfig {
    /// Axis table of the cryostat positioner board
    pub const CUTE_AXES: [AxisConfig; NUM_AXES] = [
        AxisConfig::new(33, 37).with_enable_active_low().with_step(),
        AxisConfig::new(35, 38).with_enable_active_low(),
        AxisConfig::new(43, 40).with_enable_active_low(),
    ];
}

impl Default for MachineConfig {
    fn default() -> Self {
        let mut label = String::new();
        let _ = label.push_str("CUTE");
        Self {
            label,
            axes: Self::CUTE_AXES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_machine() {
        let config = MachineConfig::default();
        assert_eq!(config.label.as_str(), "CUTE");
        assert!(config.axes[0].can_step);
        assert!(!config.axes[1].can_step);
        assert!(!config.axes[2].can_step);
        assert!(config.axes.iter().all(|a| a.on_inverted && !a.dir_inverted));
        assert_eq!(config.axes[2].dir_pin, 43);
    }

    #[test]
    fn test_axis_defaults() {
        let axis = AxisConfig::new(1, 2);
        assert_eq!(axis.min_speed, DEFAULT_MIN_SPEED);
        assert_eq!(axis.acceleration, DEFAULT_ACCELERATION);
        assert_eq!(axis.clock, ClockSource::Div8);
    }
}
