//! Step pulse timer abstraction
//!
//! Each axis owns one hardware timer. The timer counts at the frequency of
//! the selected clock source and produces one step pulse (and one tick
//! event) every `reload` counts, with the output high for the first half of
//! the period.

/// Per-axis step pulse timer
pub trait StepTimer {
    /// Start generating pulses with the current reload value
    fn start(&mut self);

    /// Stop generating pulses
    fn stop(&mut self);

    /// Set the period of the next pulse, in clock counts
    ///
    /// Takes effect at the end of the current pulse period.
    fn set_reload(&mut self, reload: u16);

    /// Re-initialize the waveform generator to count at `hz`
    ///
    /// Callers stop the timer before changing the clock.
    fn select_clock(&mut self, hz: u32);
}

impl<T: StepTimer + ?Sized> StepTimer for &mut T {
    fn start(&mut self) {
        (**self).start();
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn set_reload(&mut self, reload: u16) {
        (**self).set_reload(reload);
    }

    fn select_clock(&mut self, hz: u32) {
        (**self).select_clock(hz);
    }
}
