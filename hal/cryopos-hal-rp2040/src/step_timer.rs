//! PIO-based step pulse timer
//!
//! Each axis gets its own PIO0 state machine, all running one shared
//! program. The state machine counts at twice the selected clock source
//! frequency, so one reload count takes two PIO cycles.
//!
//! # Program
//!
//! Every pulse period the program takes the next loop count from the TX
//! FIFO (or keeps the previous one when the FIFO is empty), drives the step
//! pin high for half the period and low for the other half, then raises the
//! state machine's IRQ flag. The axis tick task waits on that flag.
//!
//! The fixed part of the loop is 10 cycles, so a loop count of `reload - 5`
//! gives a period of exactly `2 * reload` cycles.
//!
//! # Control
//!
//! [`StepControl`] drives the state machine through its registers instead of
//! through the owning `StateMachine`, so the tick task and the command task
//! can each hold one for the same axis.

use cryopos_core::motion::ramp::MIN_RELOAD;
use cryopos_hal::StepTimer;
use embassy_rp::pac;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, LoadedProgram, Pin, PioPin, StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// PIO cycles per reload count
const CYCLES_PER_COUNT: u32 = 2;

/// Fixed part of the pulse loop, in reload counts
const LOOP_OVERHEAD: u16 = 5;

/// `set pins, 0`
const SET_PINS_LOW: u16 = 0xE000;

/// Calculate the clock divider for a counting frequency
///
/// The PIO program runs at SYS_CLK / divider Hz and spends
/// [`CYCLES_PER_COUNT`] cycles per count, so:
/// divider = SYS_CLK / (count_hz * 2)
///
/// Returns (integer_part, fractional_part) for the 16.8 fixed-point divider.
pub fn calc_clock_divider(count_hz: u32) -> (u16, u8) {
    if count_hz == 0 {
        return (0xFFFF, 0xFF);
    }

    // divider * 256 = (SYS_CLK * 256) / (count_hz * 2)
    let divisor = count_hz as u64 * CYCLES_PER_COUNT as u64;
    let divider_x256 = (SYS_CLK_HZ as u64 * 256) / divisor;

    let int_part = (divider_x256 / 256).clamp(1, 0xFFFF) as u16;
    let frac_part = if divider_x256 / 256 > 0xFFFF {
        0xFF
    } else {
        (divider_x256 % 256) as u8
    };

    (int_part, frac_part)
}

/// Loop count pushed to the program for a reload value
pub fn loop_count(reload: u16) -> u32 {
    (reload.max(MIN_RELOAD) - LOOP_OVERHEAD) as u32
}

/// The pulse program, loaded once into PIO0
pub struct StepProgram<'d> {
    program: LoadedProgram<'d, PIO0>,
}

impl<'d> StepProgram<'d> {
    pub fn load(common: &mut Common<'d, PIO0>) -> Self {
        let prg = pio::pio_asm!(
            ".wrap_target",
            "pull noblock",         // next loop count, or keep X
            "mov x, osr",
            "mov y, x",
            "set pins, 1",
            "high:",
            "jmp y-- high",
            "mov y, x",
            "set pins, 0",
            "low:",
            "jmp y-- low",
            "irq nowait 0 rel [1]", // tick
            ".wrap"
        );

        Self {
            program: common.load_program(&prg.program),
        }
    }
}

/// One axis's state machine and step pin
///
/// Must stay alive while the axis is in use; dropping it disables the state
/// machine.
pub struct StepChannel<'d, const SM: usize> {
    _sm: StateMachine<'d, PIO0, SM>,
    _pin: Pin<'d, PIO0>,
}

impl<'d, const SM: usize> StepChannel<'d, SM> {
    /// Configure a stopped state machine counting at `clock_hz`
    ///
    /// `reload` is queued as the period of the first pulse after start.
    pub fn new(
        common: &mut Common<'d, PIO0>,
        mut sm: StateMachine<'d, PIO0, SM>,
        program: &StepProgram<'d>,
        step_pin: Peri<'d, impl PioPin + 'd>,
        clock_hz: u32,
        reload: u16,
    ) -> Self {
        let pin = common.make_pio_pin(step_pin);

        let mut cfg = Config::default();
        cfg.use_program(&program.program, &[]);
        cfg.set_set_pins(&[&pin]);

        let (int_div, frac_div) = calc_clock_divider(clock_hz);
        cfg.clock_divider = U24F8::from_bits(((int_div as u32) << 8) | frac_div as u32);

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::Out, &[&pin]);
        sm.tx().push(loop_count(reload));

        Self { _sm: sm, _pin: pin }
    }

    /// Register-level handle for this state machine
    pub fn control(&self) -> StepControl {
        StepControl::new(SM)
    }
}

/// Register-level control of one PIO0 state machine
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepControl {
    sm: usize,
}

impl StepControl {
    pub const fn new(sm: usize) -> Self {
        Self { sm }
    }
}

impl StepTimer for StepControl {
    fn start(&mut self) {
        pac::PIO0.ctrl().write_set(|w| w.set_sm_enable(1u8 << self.sm));
    }

    fn stop(&mut self) {
        pac::PIO0.ctrl().write_clear(|w| w.set_sm_enable(1u8 << self.sm));
        pac::PIO0.sm(self.sm).instr().write(|w| w.set_instr(SET_PINS_LOW));
    }

    fn set_reload(&mut self, reload: u16) {
        pac::PIO0.txf(self.sm).write_value(loop_count(reload));
    }

    fn select_clock(&mut self, hz: u32) {
        let (int_div, frac_div) = calc_clock_divider(hz);
        pac::PIO0.sm(self.sm).clkdiv().write(|w| {
            w.set_int(int_div);
            w.set_frac(frac_div);
        });
        pac::PIO0
            .ctrl()
            .write_set(|w| w.set_clkdiv_restart(1u8 << self.sm));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_divider() {
        // 125 MHz / (1.5 MHz * 2) = 41.67
        let (int_part, frac_part) = calc_clock_divider(1_500_000);
        assert_eq!(int_part, 41);
        assert_eq!(frac_part, 170);

        // 125 MHz / (6 MHz * 2) = 10.42
        let (int_part, _) = calc_clock_divider(6_000_000);
        assert_eq!(int_part, 10);

        // 125 MHz / (32768 * 2) = 1907.35
        let (int_part, _) = calc_clock_divider(32_768);
        assert_eq!(int_part, 1907);
    }

    #[test]
    fn test_loop_count() {
        assert_eq!(loop_count(5), 0);
        assert_eq!(loop_count(15_000), 14_995);
        assert_eq!(loop_count(0), 0);
    }
}
