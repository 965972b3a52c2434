//! Test doubles for the hardware and board traits

use cryopos_hal::{OutputPin, StepTimer};

use crate::traits::{AnalogInput, AuxPwm, PinIo, PinMode, PinSetting, Supervisor};

/// Step timer that records what it was asked to do
#[derive(Debug, Default)]
pub struct MockTimer {
    pub running: bool,
    pub reload: u16,
    pub reloads: Vec<u16>,
    pub clock_hz: u32,
    pub starts: u32,
    pub stops: u32,
}

impl StepTimer for MockTimer {
    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }

    fn set_reload(&mut self, reload: u16) {
        self.reload = reload;
        self.reloads.push(reload);
    }

    fn select_clock(&mut self, hz: u32) {
        self.clock_hz = hz;
    }
}

#[derive(Debug, Default)]
pub struct MockPin {
    pub high: bool,
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

pub const MOCK_PINS: usize = 44;

/// Board with 44 I/O channels, 4 ADC inputs and a PWM output
#[derive(Debug)]
pub struct MockBoard {
    pub levels: [bool; MOCK_PINS],
    pub modes: [PinMode; MOCK_PINS],
    pub adc: [u16; 4],
    pub pwm_rate: f32,
    pub watchdog: Option<u32>,
    pub watchdog_reset: bool,
    pub serial: [u32; 4],
}

impl Default for MockBoard {
    fn default() -> Self {
        Self {
            levels: [false; MOCK_PINS],
            modes: [PinMode::Input; MOCK_PINS],
            adc: [0; 4],
            pwm_rate: 0.0,
            watchdog: None,
            watchdog_reset: false,
            serial: [0; 4],
        }
    }
}

impl PinIo for MockBoard {
    fn pin_count(&self) -> u8 {
        MOCK_PINS as u8
    }

    fn apply(&mut self, channel: u8, setting: PinSetting) {
        let ch = channel as usize;
        match setting {
            PinSetting::Low | PinSetting::High => {
                self.levels[ch] = setting == PinSetting::High;
                self.modes[ch] = PinMode::Output;
            }
            PinSetting::Input => self.modes[ch] = PinMode::Input,
            PinSetting::PullUp => {
                self.levels[ch] = true;
                self.modes[ch] = PinMode::PullUp;
            }
        }
    }

    fn read_pin(&mut self, channel: u8) -> bool {
        self.levels[channel as usize]
    }

    fn pin_mode(&self, channel: u8) -> PinMode {
        self.modes[channel as usize]
    }
}

impl AnalogInput for MockBoard {
    fn adc_count(&self) -> u8 {
        self.adc.len() as u8
    }

    fn read_adc(&mut self, channel: u8) -> u16 {
        self.adc[channel as usize]
    }
}

impl AuxPwm for MockBoard {
    fn rate(&self) -> f32 {
        self.pwm_rate
    }

    fn set_rate(&mut self, rate: f32) -> Option<u32> {
        if rate > 0.0 {
            let period = (187_500.0 / rate) as u32;
            self.pwm_rate = 187_500.0 / period as f32;
            Some(period)
        } else {
            self.pwm_rate = 0.0;
            None
        }
    }
}

impl Supervisor for MockBoard {
    fn watchdog_timeout(&self) -> Option<u32> {
        self.watchdog
    }

    fn set_watchdog(&mut self, seconds: u32) {
        self.watchdog = (seconds > 0).then_some(seconds);
        self.watchdog_reset = false;
    }

    fn reset_by_watchdog(&self) -> bool {
        self.watchdog_reset
    }

    fn serial_number(&self) -> [u32; 4] {
        self.serial
    }
}
