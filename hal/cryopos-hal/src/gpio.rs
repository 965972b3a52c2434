//! GPIO pin abstractions
//!
//! Digital signal lines used for the stepper driver direction and enable
//! inputs. Reads of an output return the level last driven, which is what
//! the `dir`/`on` queries report.

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Adapter from any `embedded-hal` output to [`OutputPin`]
///
/// `embedded-hal` pins report errors and need `&mut self` to read back their
/// level. The adapter caches the last driven level so it can be queried
/// through `&self`, and discards errors (GPIO writes on the supported chips
/// are infallible).
pub struct Stateful<P> {
    pin: P,
    high: bool,
}

impl<P: embedded_hal::digital::OutputPin> Stateful<P> {
    /// Wrap a pin whose current level is `high`
    pub fn new(pin: P, high: bool) -> Self {
        Self { pin, high }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: embedded_hal::digital::OutputPin> OutputPin for Stateful<P> {
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
        self.high = true;
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct Recorder {
        writes: u32,
        level: bool,
    }

    impl embedded_hal::digital::ErrorType for Recorder {
        type Error = Infallible;
    }

    impl embedded_hal::digital::OutputPin for Recorder {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.writes += 1;
            self.level = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.writes += 1;
            self.level = true;
            Ok(())
        }
    }

    #[test]
    fn test_stateful_tracks_level() {
        let mut pin = Stateful::new(Recorder { writes: 0, level: false }, false);
        assert!(pin.is_set_low());

        pin.set_state(true);
        assert!(pin.is_set_high());

        pin.set_low();
        let inner = pin.into_inner();
        assert_eq!(inner.writes, 2);
        assert!(!inner.level);
    }
}
