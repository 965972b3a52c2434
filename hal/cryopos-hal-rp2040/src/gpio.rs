//! GPIO for driver signals and general purpose I/O channels
//!
//! The board exposes numbered I/O channels (bank A `0..32`, bank B `32..`).
//! Channels wired to a free GPIO are attached to the [`PinBank`]; the rest
//! are owned by a peripheral (motor signals, ADC, PWM) and report the
//! `function` mode.

use cryopos_core::traits::{PinIo, PinMode, PinSetting};
use cryopos_hal::Stateful;
use embassy_rp::gpio::{AnyPin, Flex, Level, Output, Pull};
use embassy_rp::Peri;

/// Direction or enable output of a motor driver
pub type SignalPin = Stateful<Output<'static>>;

/// Create a driver signal output at the given level
pub fn signal_pin(pin: Peri<'static, AnyPin>, high: bool) -> SignalPin {
    let level = if high { Level::High } else { Level::Low };
    Stateful::new(Output::new(pin, level), high)
}

/// General purpose I/O channels
pub struct PinBank<const N: usize> {
    pins: [Option<Flex<'static>>; N],
    modes: [PinMode; N],
}

impl<const N: usize> PinBank<N> {
    /// Bank with no channel attached
    pub fn new() -> Self {
        Self {
            pins: core::array::from_fn(|_| None),
            modes: [PinMode::Function; N],
        }
    }

    /// Attach a GPIO to a channel as a floating input
    ///
    /// Out-of-range channels are ignored.
    pub fn attach(&mut self, channel: u8, pin: Peri<'static, AnyPin>) {
        let Some(slot) = self.pins.get_mut(channel as usize) else {
            return;
        };
        let mut flex = Flex::new(pin);
        flex.set_as_input();
        flex.set_pull(Pull::None);
        *slot = Some(flex);
        self.modes[channel as usize] = PinMode::Input;
    }
}

impl<const N: usize> Default for PinBank<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PinIo for PinBank<N> {
    fn pin_count(&self) -> u8 {
        N as u8
    }

    fn apply(&mut self, channel: u8, setting: PinSetting) {
        let index = channel as usize;
        let Some(Some(pin)) = self.pins.get_mut(index) else {
            return;
        };
        let mode = match setting {
            PinSetting::Low | PinSetting::High => {
                pin.set_level(if setting == PinSetting::High {
                    Level::High
                } else {
                    Level::Low
                });
                pin.set_as_output();
                PinMode::Output
            }
            PinSetting::Input => {
                pin.set_as_input();
                pin.set_pull(Pull::None);
                PinMode::Input
            }
            PinSetting::PullUp => {
                pin.set_as_input();
                pin.set_pull(Pull::Up);
                PinMode::PullUp
            }
        };
        self.modes[index] = mode;
    }

    fn read_pin(&mut self, channel: u8) -> bool {
        match self.pins.get(channel as usize) {
            Some(Some(pin)) => pin.is_high(),
            _ => false,
        }
    }

    fn pin_mode(&self, channel: u8) -> PinMode {
        self.modes
            .get(channel as usize)
            .copied()
            .unwrap_or(PinMode::Function)
    }
}
