//! Auxiliary PWM output (`p6`)
//!
//! The output is a 50% duty square wave. Its period is set in counts of a
//! nominal 187.5 kHz PWM clock, which the hardware realizes with the slice
//! divider and top value.

use cryopos_core::motion::ramp::MIN_RELOAD;
use cryopos_core::traits::AuxPwm;
use embassy_rp::pwm::{Config, Pwm};
use fixed::types::extra::U4;
use fixed::FixedU16;

use crate::step_timer::SYS_CLK_HZ;

/// Nominal PWM counting frequency
pub const PWM_CLK: u32 = 187_500;

/// Largest period in counts
pub const MAX_PERIOD: u32 = 0xF_FFFF;

/// Period in counts for a rate in Hz
pub fn period_for_rate(rate: f32) -> u32 {
    ((PWM_CLK as f32 / rate) as u32).clamp(MIN_RELOAD as u32, MAX_PERIOD)
}

/// Slice divider (4 fractional bits) and top value for a period in counts
pub fn slice_timing(period: u32) -> (u16, u16) {
    let cycles = period as u64 * SYS_CLK_HZ as u64 / PWM_CLK as u64;
    let divider_x16 = ((cycles * 16).div_ceil(0x1_0000)).clamp(16, 0xFFF);
    let top = (cycles * 16 / divider_x16).saturating_sub(1).min(0xFFFF);
    (divider_x16 as u16, top as u16)
}

/// PWM slice driving the auxiliary output on channel A
pub struct AuxPwmOutput {
    pwm: Pwm<'static>,
    period: Option<u32>,
}

impl AuxPwmOutput {
    /// Take a slice configured with `Config::default()`; the output starts stopped
    pub fn new(mut pwm: Pwm<'static>) -> Self {
        let mut config = Config::default();
        config.enable = false;
        pwm.set_config(&config);
        Self { pwm, period: None }
    }
}

impl AuxPwm for AuxPwmOutput {
    fn rate(&self) -> f32 {
        match self.period {
            Some(period) => PWM_CLK as f32 / period as f32,
            None => 0.0,
        }
    }

    fn set_rate(&mut self, rate: f32) -> Option<u32> {
        let mut config = Config::default();
        if rate <= 0.0 {
            config.enable = false;
            self.pwm.set_config(&config);
            self.period = None;
            return None;
        }

        let period = period_for_rate(rate);
        let (divider_x16, top) = slice_timing(period);
        config.divider = FixedU16::<U4>::from_bits(divider_x16);
        config.top = top;
        config.compare_a = top / 2 + 1;
        self.pwm.set_config(&config);

        self.period = Some(period);
        self.period
    }
}
