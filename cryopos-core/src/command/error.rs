//! Command error taxonomy
//!
//! Every error renders to the exact text placed after `BAD` on the
//! response line. None of them is fatal: the failing line produces its
//! response and the batch continues.

use core::fmt;

use cryopos_protocol::LineError;

use crate::motion::AxisError;

/// Malformed command text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line could not be split into a command
    Line(LineError),
    UnknownCommand,
    NoSpeed,
    InvalidSpeed,
    NoDestination,
    InvalidDestination,
    InvalidPosition,
    InvalidAcceleration,
    InvalidTimeout,
    /// `dir`/`on` value other than `0`, `1`, `+`, `-`
    InvalidSignal,
    /// Pin value other than `0`, `1`, `-`, `+`
    InvalidPinSetting,
    ChannelOutOfRange,
    InvalidPwm,
}

impl ParseError {
    pub fn message(self) -> &'static str {
        match self {
            ParseError::Line(e) => e.message(),
            ParseError::UnknownCommand => "unknown cmd",
            ParseError::NoSpeed => "no speed",
            ParseError::InvalidSpeed => "invalid speed",
            ParseError::NoDestination => "no destination",
            ParseError::InvalidDestination => "invalid destination",
            ParseError::InvalidPosition => "invalid position",
            ParseError::InvalidAcceleration => "invalid acceleration",
            ParseError::InvalidTimeout => "invalid timeout",
            ParseError::InvalidSignal => "must set to 0, 1, + or -",
            ParseError::InvalidPinSetting => "must set to 0, 1, - or +",
            ParseError::ChannelOutOfRange => "channel out of range",
            ParseError::InvalidPwm => "invalid pwm",
        }
    }
}

/// Well-formed command refused in the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreconditionError {
    Axis { index: u8, error: AxisError },
    /// Clock selector outside `1..=5`
    BadClock,
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PreconditionError::Axis { index, error } => match error {
                AxisError::NotOn => write!(f, "m{} is not on", index),
                AxisError::StepUnsupported => write!(f, "m{} doesn't step", index),
                AxisError::AlreadyRunning => f.write_str("already running"),
                AxisError::AtDestination => f.write_str("at destination"),
            },
            PreconditionError::BadClock => f.write_str("bad clk"),
        }
    }
}

/// Any reason a command line produced a `BAD` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Parse(ParseError),
    Precondition(PreconditionError),
}

impl CommandError {
    pub(crate) fn axis(index: u8) -> impl Fn(AxisError) -> CommandError {
        move |error| CommandError::Precondition(PreconditionError::Axis { index, error })
    }
}

impl From<ParseError> for CommandError {
    fn from(e: ParseError) -> Self {
        CommandError::Parse(e)
    }
}

impl From<PreconditionError> for CommandError {
    fn from(e: PreconditionError) -> Self {
        CommandError::Precondition(e)
    }
}

impl From<LineError> for CommandError {
    fn from(e: LineError) -> Self {
        CommandError::Parse(ParseError::Line(e))
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(e) => f.write_str(e.message()),
            CommandError::Precondition(e) => e.fmt(f),
        }
    }
}
