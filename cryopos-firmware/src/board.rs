//! Board collaborators for the command dispatcher
//!
//! # Pin map
//!
//! | Function | GPIO | I/O channel |
//! |---|---|---|
//! | m0 step / dir / on | 2 / 3 / 4 | - / 33 / 37 |
//! | m1 step / dir / on | 6 / 7 / 8 | - / 35 / 38 |
//! | m2 step / dir / on | 10 / 11 / 12 | - / 43 / 40 |
//! | `p6` PWM | 14 | - |
//! | `adc0`..`adc3` | 26..29 | - |
//! | general I/O | 16..23, 0, 1, 24, 25 | 0..11 |
//!
//! Channels without a general purpose GPIO (motor signals included) read 0
//! and report the `function` mode.

use cryopos_core::traits::{AnalogInput, AuxPwm, PinIo, PinMode, PinSetting, Supervisor};
use cryopos_hal_rp2040::{AdcBank, AuxPwmOutput, PinBank};
use defmt::*;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::watchdog::{ResetReason, Watchdog};
use embassy_time::Duration;

/// Number of I/O channels (bank A `0..32`, bank B `32..44`)
pub const IO_CHANNELS: usize = 44;

/// Size of the on-board QSPI flash
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Watchdog timeout armed on the first command batch
pub const DEFAULT_WATCHDOG_SECS: u32 = 1;

/// Longest timeout the watchdog counter can hold
pub const MAX_WATCHDOG_SECS: u32 = 8;

/// Pin I/O, ADC, PWM and supervision for the dispatcher
pub struct Board {
    pins: PinBank<IO_CHANNELS>,
    adc: AdcBank,
    pwm: AuxPwmOutput,
    watchdog: Watchdog,
    timeout: Option<u32>,
    watchdog_reset: bool,
    serial: [u32; 4],
}

impl Board {
    /// Assemble the board; the watchdog stays idle until [`Board::arm_watchdog`]
    pub fn new(
        pins: PinBank<IO_CHANNELS>,
        adc: AdcBank,
        pwm: AuxPwmOutput,
        mut watchdog: Watchdog,
        serial: [u32; 4],
    ) -> Self {
        let watchdog_reset = matches!(watchdog.reset_reason(), Some(ResetReason::TimedOut));
        if watchdog_reset {
            warn!("Last reset was caused by the watchdog");
        }
        watchdog.pause_on_debug(true);

        Self {
            pins,
            adc,
            pwm,
            watchdog,
            timeout: Some(DEFAULT_WATCHDOG_SECS),
            watchdog_reset,
            serial,
        }
    }

    /// Start the watchdog with the configured timeout
    ///
    /// Unlike [`Supervisor::set_watchdog`] this keeps a pending watchdog
    /// reset reportable.
    pub fn arm_watchdog(&mut self) {
        if let Some(seconds) = self.timeout {
            self.watchdog.start(Duration::from_secs(seconds as u64));
            info!("Watchdog armed ({} s)", seconds);
        }
    }

    pub fn feed_watchdog(&mut self) {
        if self.timeout.is_some() {
            self.watchdog.feed();
        }
    }
}

/// Read the flash chip's 64-bit unique id as the device serial number
pub fn read_serial(flash: &mut Flash<'_, FLASH, Blocking, FLASH_SIZE>) -> [u32; 4] {
    let mut id = [0u8; 8];
    if let Err(e) = flash.blocking_unique_id(&mut id) {
        warn!("Failed to read flash unique id: {:?}", Debug2Format(&e));
        return [0; 4];
    }
    let hi = u32::from_be_bytes([id[0], id[1], id[2], id[3]]);
    let lo = u32::from_be_bytes([id[4], id[5], id[6], id[7]]);
    [0, hi, lo, 0]
}

impl PinIo for Board {
    fn pin_count(&self) -> u8 {
        self.pins.pin_count()
    }

    fn apply(&mut self, channel: u8, setting: PinSetting) {
        self.pins.apply(channel, setting);
    }

    fn read_pin(&mut self, channel: u8) -> bool {
        self.pins.read_pin(channel)
    }

    fn pin_mode(&self, channel: u8) -> PinMode {
        self.pins.pin_mode(channel)
    }
}

impl AnalogInput for Board {
    fn adc_count(&self) -> u8 {
        self.adc.adc_count()
    }

    fn read_adc(&mut self, channel: u8) -> u16 {
        self.adc.read_adc(channel)
    }
}

impl AuxPwm for Board {
    fn rate(&self) -> f32 {
        self.pwm.rate()
    }

    fn set_rate(&mut self, rate: f32) -> Option<u32> {
        self.pwm.set_rate(rate)
    }
}

impl Supervisor for Board {
    fn watchdog_timeout(&self) -> Option<u32> {
        self.timeout
    }

    fn set_watchdog(&mut self, seconds: u32) {
        if seconds == 0 {
            self.watchdog.stop();
            self.timeout = None;
            info!("Watchdog disabled");
        } else {
            let seconds = seconds.min(MAX_WATCHDOG_SECS);
            self.watchdog.start(Duration::from_secs(seconds as u64));
            self.timeout = Some(seconds);
            info!("Watchdog set to {} s", seconds);
        }
        self.watchdog_reset = false;
    }

    fn reset_by_watchdog(&self) -> bool {
        self.watchdog_reset
    }

    fn serial_number(&self) -> [u32; 4] {
        self.serial
    }
}
