//! Ramp arithmetic
//!
//! Speeds are steps per second, reloads are timer counts per step. Ramp
//! time is not measured with a clock: each tick adds the reload that was
//! just counted to the elapsed time, so elapsed and duration are both in
//! timer counts. A ramp from `start` to `end` at acceleration `a` lasts
//! `|end - start| * (clock / a)` counts.
//!
//! The interpolation multiplies before it divides, in single precision,
//! and truncates toward zero. Ramp timing depends on this exact order.

use crate::config::{ACCELERATION_MAX, ACCELERATION_MIN};

/// Smallest reload; bounds the maximum step rate
pub const MIN_RELOAD: u16 = 5;

/// Largest reload the 16-bit timer accepts
pub const MAX_RELOAD: u16 = 0xFFFF;

/// Clamp a count to the timer's reload range
pub fn clamp_reload(counts: u32) -> u16 {
    counts.clamp(MIN_RELOAD as u32, MAX_RELOAD as u32) as u16
}

/// Reload for an integer speed, truncating
pub fn reload_for_speed(clock_hz: u32, speed: u32) -> u16 {
    clamp_reload(clock_hz / speed.max(1))
}

/// Reload for a fractional speed, rounded to the nearest count
///
/// `speed` must be positive.
pub fn reload_for_rate(clock_hz: u32, speed: f32) -> u16 {
    let counts = clock_hz as f32 / speed + 0.5;
    clamp_reload(counts as u32)
}

/// Step rate produced by a reload
pub fn speed_for_reload(clock_hz: u32, reload: u16) -> u32 {
    clock_hz / (reload.max(1) as u32)
}

/// Timer counts per unit of speed change
pub fn ramp_scale(clock_hz: u32, acceleration: u32) -> f32 {
    clock_hz as f32 / acceleration.max(1) as f32
}

/// Duration of a ramp in timer counts
pub fn ramp_duration(start: u32, end: u32, scale: f32) -> u32 {
    (start.abs_diff(end) as f32 * scale) as u32
}

/// Speed `elapsed` counts into a ramp of `duration` counts
///
/// Never returns zero.
pub fn interpolate(start: u32, end: u32, elapsed: u32, duration: u32) -> u32 {
    if duration == 0 {
        return end.max(1);
    }
    let span = end as i64 - start as i64;
    let delta = (span as f32 * elapsed as f32 / duration as f32) as i64;
    (start as i64 + delta).clamp(1, u32::MAX as i64) as u32
}

/// Clamp a requested acceleration to the supported range
pub fn clamp_acceleration(value: i64) -> u32 {
    value.clamp(ACCELERATION_MIN as i64, ACCELERATION_MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CLOCK: u32 = 1_500_000;

    #[test]
    fn test_reload_conversion() {
        assert_eq!(reload_for_speed(CLOCK, 100), 15_000);
        assert_eq!(reload_for_speed(CLOCK, 25), 60_000);
        assert_eq!(speed_for_reload(CLOCK, 15_000), 100);
        // 1.5 MHz / 7 does not fit in 16 bits
        assert_eq!(reload_for_speed(CLOCK, 7), 0xFFFF);
        assert_eq!(reload_for_speed(CLOCK, 1_000_000), MIN_RELOAD);
        assert_eq!(reload_for_speed(CLOCK, 0), 0xFFFF);
    }

    #[test]
    fn test_rate_rounding() {
        // 1.5 MHz / 7000 = 214.28 counts
        assert_eq!(reload_for_rate(CLOCK, 7000.0), 214);
        // 1.5 MHz / 6990 = 214.59 counts
        assert_eq!(reload_for_rate(CLOCK, 6990.0), 215);
        assert_eq!(reload_for_rate(CLOCK, 1.0), 0xFFFF);
        assert_eq!(reload_for_rate(CLOCK, 1e9), MIN_RELOAD);
    }

    #[test]
    fn test_duration() {
        let scale = ramp_scale(CLOCK, 4000);
        assert_eq!(scale, 375.0);
        assert_eq!(ramp_duration(25, 100, scale), 28_125);
        assert_eq!(ramp_duration(100, 25, scale), 28_125);
        assert_eq!(ramp_duration(100, 100, scale), 0);
    }

    #[test]
    fn test_interpolation() {
        assert_eq!(interpolate(25, 200, 0, 65_625), 25);
        assert_eq!(interpolate(25, 200, 60_000, 65_625), 185);
        assert_eq!(interpolate(200, 25, 7_500, 65_625), 180);
        assert_eq!(interpolate(25, 200, 65_625, 65_625), 200);
        assert_eq!(interpolate(5, 0, 1, 1), 1);
        assert_eq!(interpolate(10, 50, 3, 0), 50);
    }

    #[test]
    fn test_acceleration_clamp() {
        assert_eq!(clamp_acceleration(0), ACCELERATION_MIN);
        assert_eq!(clamp_acceleration(-5), ACCELERATION_MIN);
        assert_eq!(clamp_acceleration(2500), 2500);
        assert_eq!(clamp_acceleration(1 << 40), ACCELERATION_MAX);
    }

    proptest! {
        #[test]
        fn prop_interpolation_bounded(
            start in 1u32..1_200_000,
            end in 1u32..1_200_000,
            frac in 0.0f64..1.0,
            duration in 1u32..u32::MAX,
        ) {
            let elapsed = (duration as f64 * frac) as u32;
            let speed = interpolate(start, end, elapsed, duration);
            prop_assert!(speed >= start.min(end));
            prop_assert!(speed <= start.max(end));
        }

        #[test]
        fn prop_reload_in_range(clock in 1u32..10_000_000, speed in 0u32..u32::MAX) {
            let reload = reload_for_speed(clock, speed);
            prop_assert!(reload >= MIN_RELOAD);
        }

        #[test]
        fn prop_duration_symmetric(a in 0u32..2_000_000, b in 0u32..2_000_000, acc in 1000u32..=10000) {
            let scale = ramp_scale(CLOCK, acc);
            prop_assert_eq!(ramp_duration(a, b, scale), ramp_duration(b, a, scale));
        }

        #[test]
        fn prop_acceleration_in_bounds(value in any::<i64>()) {
            let acc = clamp_acceleration(value);
            prop_assert!((ACCELERATION_MIN..=ACCELERATION_MAX).contains(&acc));
        }
    }
}
