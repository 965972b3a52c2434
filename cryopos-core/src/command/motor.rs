//! `m#` motor commands
//!
//! ```text
//! m# [stat]              status snapshot
//! m# ramp SPEED          ramp to SPEED (steps/s), 0 or less ramps to a stop
//! m# stop                ramp to a stop
//! m# step DEST SPEED     move to DEST (stepping axes only)
//! m# spd SPEED [CLK]     set speed immediately, optionally on clock 1..5
//! m# halt                stop as fast as possible
//! m# pos [POS]           get/set the position counter
//! m# acc [ACC]           get/set the acceleration
//! m# dir [0|1|+|-]       get/set the direction signal
//! m# on [0|1|+|-]        get/set the enable signal
//! ```

use cryopos_hal::{OutputPin, StepTimer};
use cryopos_protocol::{Args, Sig6};

use super::{message, CommandError, Message, MotorPort, ParseError, PreconditionError};
use crate::config::NUM_AXES;
use crate::motion::{Axis, ClockSource, RampOutcome, Signal, SignalSetting, SpeedOutcome};

/// Axis addressed by a command name of the form `m#`
pub fn axis_index(name: &str) -> Option<usize> {
    match name.as_bytes() {
        [b'm', digit @ b'0'..=b'9'] => {
            let index = (digit - b'0') as usize;
            (index < NUM_AXES).then_some(index)
        }
        _ => None,
    }
}

/// Execute a motor sub-command
pub fn execute<T: StepTimer, P: OutputPin>(
    axis: &Axis,
    port: &mut MotorPort<T, P>,
    mut args: Args<'_>,
) -> Result<Message, CommandError> {
    let index = axis.index();
    match args.next().unwrap_or("stat") {
        "stat" => Ok(message(format_args!("{}", axis.status()))),
        "ramp" => {
            let speed = parse_speed(args.next())?;
            ramp(axis, speed, &mut port.timer)
        }
        "stop" => ramp(axis, 0, &mut port.timer),
        "step" => step(axis, port, args),
        "spd" => set_speed(axis, &mut port.timer, args),
        "halt" => {
            axis.halt();
            Ok(message(format_args!("m{} HALTED", index)))
        }
        "pos" => {
            if let Some(token) = args.next() {
                let position = token
                    .parse::<i32>()
                    .map_err(|_| ParseError::InvalidPosition)?;
                axis.set_position(position);
            }
            Ok(message(format_args!("m{} POS={}", index, axis.position())))
        }
        "acc" => {
            let acceleration = match args.next() {
                Some(token) => {
                    let value = token
                        .parse::<i64>()
                        .map_err(|_| ParseError::InvalidAcceleration)?;
                    axis.set_acceleration(value)
                }
                None => axis.acceleration(),
            };
            Ok(message(format_args!("m{} ACC={}", index, acceleration)))
        }
        "dir" => signal(axis, Signal::Direction, &mut port.dir, args.next()),
        "on" => signal(axis, Signal::Enable, &mut port.on, args.next()),
        _ => Err(ParseError::UnknownCommand.into()),
    }
}

fn parse_speed(token: Option<&str>) -> Result<i32, ParseError> {
    token
        .ok_or(ParseError::NoSpeed)?
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidSpeed)
}

fn ramp<T: StepTimer>(axis: &Axis, speed: i32, timer: &mut T) -> Result<Message, CommandError> {
    let outcome = axis
        .ramp(speed, timer)
        .map_err(CommandError::axis(axis.index()))?;
    Ok(ramp_message(axis.index(), outcome))
}

fn ramp_message(index: u8, outcome: RampOutcome) -> Message {
    match outcome {
        RampOutcome::Ramping { speed, reload } => {
            message(format_args!("m{} RAMP={} (rc={})", index, speed, reload))
        }
        RampOutcome::Idle => message(format_args!("m{} RAMP=0", index)),
    }
}

fn step<T: StepTimer, P: OutputPin>(
    axis: &Axis,
    port: &mut MotorPort<T, P>,
    mut args: Args<'_>,
) -> Result<Message, CommandError> {
    let index = axis.index();
    axis.check_step_ready().map_err(CommandError::axis(index))?;

    let destination = args
        .next()
        .ok_or(ParseError::NoDestination)?
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidDestination)?;
    let speed = parse_speed(args.next())?;

    let outcome = axis
        .step(destination, speed, &mut port.timer, &mut port.dir)
        .map_err(CommandError::axis(index))?;
    Ok(ramp_message(index, outcome))
}

fn set_speed<T: StepTimer>(
    axis: &Axis,
    timer: &mut T,
    mut args: Args<'_>,
) -> Result<Message, CommandError> {
    let index = axis.index();
    let speed = args
        .next()
        .ok_or(ParseError::NoSpeed)?
        .parse::<f32>()
        .ok()
        .filter(|speed| speed.is_finite())
        .ok_or(ParseError::InvalidSpeed)?;

    let clock = match args.next() {
        Some(token) => Some(
            token
                .parse::<u8>()
                .ok()
                .and_then(|selector| ClockSource::try_from(selector).ok())
                .ok_or(PreconditionError::BadClock)?,
        ),
        None => None,
    };

    let outcome = axis
        .set_speed(speed, clock, timer)
        .map_err(CommandError::axis(index))?;
    Ok(match outcome {
        SpeedOutcome::Running { speed, reload } => {
            message(format_args!("m{} SPD={} (rc={})", index, Sig6(speed), reload))
        }
        SpeedOutcome::Stopped { clock } => {
            message(format_args!("m{} STOPPED (clk={})", index, clock.selector()))
        }
    })
}

/// Get or set a driver signal and report the level present on its pin
fn signal<P: OutputPin>(
    axis: &Axis,
    signal: Signal,
    pin: &mut P,
    token: Option<&str>,
) -> Result<Message, CommandError> {
    if let Some(token) = token {
        let setting = SignalSetting::parse(token).ok_or(ParseError::InvalidSignal)?;
        axis.apply_signal(signal, setting, pin);
    }
    let inverted = if axis.signal_inverted(signal) { " (inv)" } else { "" };
    Ok(message(format_args!(
        "pa{} VAL={}{}",
        axis.signal_pin(signal),
        pin.is_set_high() as u8,
        inverted
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_index() {
        assert_eq!(axis_index("m0"), Some(0));
        assert_eq!(axis_index("m2"), Some(2));
        assert_eq!(axis_index("m3"), None);
        assert_eq!(axis_index("m"), None);
        assert_eq!(axis_index("m10"), None);
        assert_eq!(axis_index("n0"), None);
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed(Some("250")), Ok(250));
        assert_eq!(parse_speed(Some("-3")), Ok(-3));
        assert_eq!(parse_speed(None), Err(ParseError::NoSpeed));
        assert_eq!(parse_speed(Some("1e3")), Err(ParseError::InvalidSpeed));
    }

    #[test]
    fn test_ramp_message() {
        let armed = RampOutcome::Ramping {
            speed: 100,
            reload: 15_000,
        };
        assert_eq!(ramp_message(1, armed).as_str(), "m1 RAMP=100 (rc=15000)");
        assert_eq!(ramp_message(2, RampOutcome::Idle).as_str(), "m2 RAMP=0");
    }
}
