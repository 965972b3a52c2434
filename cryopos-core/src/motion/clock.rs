//! Step timer clock sources
//!
//! The step timer of each axis counts at one of five reference frequencies,
//! selected by number `1..=5`. Faster clocks give finer speed resolution,
//! slower ones reach lower speeds within the 16-bit reload range.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selectable timer clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
#[repr(u8)]
pub enum ClockSource {
    /// 32.768 kHz crystal
    Slow = 1,
    /// 6 MHz
    Div2 = 2,
    /// 1.5 MHz
    #[default]
    Div8 = 3,
    /// 375 kHz
    Div32 = 4,
    /// 93.75 kHz
    Div128 = 5,
}

/// Clock selector outside `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidClock(pub u8);

impl core::fmt::Display for InvalidClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "clock selector {} is not in 1..=5", self.0)
    }
}

impl ClockSource {
    pub const DEFAULT: Self = ClockSource::Div8;

    /// Look up a clock by its selector number
    pub const fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1 => Some(ClockSource::Slow),
            2 => Some(ClockSource::Div2),
            3 => Some(ClockSource::Div8),
            4 => Some(ClockSource::Div32),
            5 => Some(ClockSource::Div128),
            _ => None,
        }
    }

    /// Selector number `1..=5`
    pub const fn selector(self) -> u8 {
        self as u8
    }

    /// Counting frequency in Hz
    pub const fn hz(self) -> u32 {
        match self {
            ClockSource::Slow => 32_768,
            ClockSource::Div2 => 6_000_000,
            ClockSource::Div8 => 1_500_000,
            ClockSource::Div32 => 375_000,
            ClockSource::Div128 => 93_750,
        }
    }
}

impl TryFrom<u8> for ClockSource {
    type Error = InvalidClock;

    fn try_from(selector: u8) -> Result<Self, Self::Error> {
        Self::from_selector(selector).ok_or(InvalidClock(selector))
    }
}

impl From<ClockSource> for u8 {
    fn from(clock: ClockSource) -> u8 {
        clock.selector()
    }
}
