//! Pin, ADC and PWM collaborators

/// Current configuration of an I/O channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    #[default]
    Input,
    /// Input with pull-up
    PullUp,
    Output,
    /// Claimed by a peripheral function
    Function,
}

impl PinMode {
    /// Suffix shown after a single-channel read
    pub fn suffix(self) -> &'static str {
        match self {
            PinMode::Input => "",
            PinMode::PullUp => " (pull up)",
            PinMode::Output => " (output)",
            PinMode::Function => " (function)",
        }
    }
}

/// Requested state of an I/O channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinSetting {
    /// Drive low (`0`)
    Low,
    /// Drive high (`1`)
    High,
    /// Release as input (`-`)
    Input,
    /// Input with pull-up (`+`)
    PullUp,
}

impl PinSetting {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(PinSetting::Low),
            b'1' => Some(PinSetting::High),
            b'-' => Some(PinSetting::Input),
            b'+' => Some(PinSetting::PullUp),
            _ => None,
        }
    }
}

/// General purpose I/O channels `0..pin_count()`
///
/// Channels `0..32` are bank A, `32..` bank B.
pub trait PinIo {
    /// Number of addressable channels
    fn pin_count(&self) -> u8;

    /// Apply a setting to a channel
    fn apply(&mut self, channel: u8, setting: PinSetting);

    /// Read the level present on a channel
    fn read_pin(&mut self, channel: u8) -> bool;

    /// Current mode of a channel
    fn pin_mode(&self, channel: u8) -> PinMode;
}

/// On-board analog inputs
pub trait AnalogInput {
    /// Number of ADC channels
    fn adc_count(&self) -> u8;

    /// Take one conversion
    fn read_adc(&mut self, channel: u8) -> u16;
}

/// Auxiliary PWM output
pub trait AuxPwm {
    /// The only channel number accepted by `p#` commands
    const CHANNEL: u8 = 6;

    /// Current output rate in Hz, zero when stopped
    fn rate(&self) -> f32;

    /// Set the output rate in Hz; zero or less stops the output
    ///
    /// Returns the period in counts while running, `None` when stopped.
    fn set_rate(&mut self, rate: f32) -> Option<u32>;
}
