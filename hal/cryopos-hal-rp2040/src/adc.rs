//! On-board analog inputs
//!
//! GPIO26..29 are the RP2040's external ADC inputs; `adc0`..`adc3` map to
//! them in order.

use cryopos_core::traits::AnalogInput;
use embassy_rp::adc::{Adc, Blocking, Channel};

/// Number of external ADC inputs
pub const ADC_CHANNELS: usize = 4;

/// Value reported when a conversion fails
const CONVERSION_ERROR: u16 = 0xFFFF;

/// The ADC and its external input channels
pub struct AdcBank {
    adc: Adc<'static, Blocking>,
    channels: [Channel<'static>; ADC_CHANNELS],
}

impl AdcBank {
    pub fn new(adc: Adc<'static, Blocking>, channels: [Channel<'static>; ADC_CHANNELS]) -> Self {
        Self { adc, channels }
    }
}

impl AnalogInput for AdcBank {
    fn adc_count(&self) -> u8 {
        ADC_CHANNELS as u8
    }

    fn read_adc(&mut self, channel: u8) -> u16 {
        let Some(channel) = self.channels.get_mut(channel as usize) else {
            return CONVERSION_ERROR;
        };
        self.adc.blocking_read(channel).unwrap_or(CONVERSION_ERROR)
    }
}
