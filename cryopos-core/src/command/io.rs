//! Board I/O commands
//!
//! ```text
//! pa#[-#] [VALUES]     read or write bank A channels (`pb` for bank B)
//! adc#                 read an analog input
//! p6 [stat|spd R|stop|halt]   auxiliary PWM output
//! ```
//!
//! `VALUES` holds one of `0`, `1`, `-`, `+` per channel of the range; the
//! last character repeats for the rest of the range.

use core::ops::RangeInclusive;

use cryopos_protocol::{Args, Sig6};

use super::{message, CommandError, Message, ParseError};
use crate::traits::{AnalogInput, AuxPwm, PinIo, PinSetting};

/// First channel of bank B
const BANK_B_OFFSET: u8 = 32;

/// Execute a `pa`/`pb`, `adc#` or `p#` command
pub fn execute<X>(board: &mut X, name: &str, args: Args<'_>) -> Result<Message, CommandError>
where
    X: PinIo + AnalogInput + AuxPwm,
{
    let bytes = name.as_bytes();
    match bytes {
        [b'p', b'a' | b'b', ..] => {
            let range = parse_channels(bytes).ok_or(ParseError::UnknownCommand)?;
            pins(board, range, args)
        }
        [b'a', b'd', b'c', digit @ b'0'..=b'9'] => adc(board, digit - b'0'),
        [b'p', digit @ b'0'..=b'9'] => pwm(board, digit - b'0', args),
        _ => Err(ParseError::UnknownCommand.into()),
    }
}

/// Channel range of `pa#`, `pa#-#`, `pb#` or `pb#-#`, bank B offset applied
///
/// Channel numbers have one or two digits. A range may run downward.
pub fn parse_channels(name: &[u8]) -> Option<RangeInclusive<u8>> {
    let (bank, rest) = match name {
        [b'p', bank @ (b'a' | b'b'), rest @ ..] => (*bank, rest),
        _ => return None,
    };
    let (first, rest) = take_channel(rest)?;
    let last = match rest {
        [] => first,
        [b'-', rest @ ..] => match take_channel(rest)? {
            (last, []) => last,
            _ => return None,
        },
        _ => return None,
    };

    let offset = if bank == b'b' { BANK_B_OFFSET } else { 0 };
    Some(first + offset..=last + offset)
}

fn take_channel(bytes: &[u8]) -> Option<(u8, &[u8])> {
    match bytes {
        [a @ b'0'..=b'9', b @ b'0'..=b'9', rest @ ..] => Some(((a - b'0') * 10 + (b - b'0'), rest)),
        [a @ b'0'..=b'9', rest @ ..] => Some((a - b'0', rest)),
        _ => None,
    }
}

/// Channels of a range in the order written
fn walk(range: &RangeInclusive<u8>) -> impl Iterator<Item = u8> {
    let (first, last) = (*range.start(), *range.end());
    (0..=first.abs_diff(last)).map(move |i| if first <= last { first + i } else { first - i })
}

fn pins<X: PinIo>(
    board: &mut X,
    range: RangeInclusive<u8>,
    mut args: Args<'_>,
) -> Result<Message, CommandError> {
    let (first, last) = (*range.start(), *range.end());
    if first >= board.pin_count() || last >= board.pin_count() {
        return Err(ParseError::ChannelOutOfRange.into());
    }

    if let Some(values) = args.next() {
        if !values.bytes().all(|b| PinSetting::from_byte(b).is_some()) {
            return Err(ParseError::InvalidPinSetting.into());
        }
        let mut settings = values.bytes().filter_map(PinSetting::from_byte);
        let mut setting = None;
        for channel in walk(&range) {
            setting = settings.next().or(setting);
            if let Some(setting) = setting {
                board.apply(channel, setting);
            }
        }
    }

    let mut text = Message::new();
    if first == last {
        let _ = text.push(if board.read_pin(first) { '1' } else { '0' });
        let _ = text.push_str(board.pin_mode(first).suffix());
    } else {
        for (i, channel) in walk(&range).enumerate() {
            if i > 0 && i % 8 == 0 {
                let _ = text.push(' ');
            }
            let _ = text.push(if board.read_pin(channel) { '1' } else { '0' });
        }
    }

    let (bank, first, last) = if first >= BANK_B_OFFSET && last >= BANK_B_OFFSET {
        ('b', first - BANK_B_OFFSET, last - BANK_B_OFFSET)
    } else {
        ('a', first, last)
    };
    Ok(if first == last {
        message(format_args!("p{}{} VAL={}", bank, first, text))
    } else {
        message(format_args!("p{}{}-{} VAL={}", bank, first, last, text))
    })
}

fn adc<X: AnalogInput>(board: &mut X, channel: u8) -> Result<Message, CommandError> {
    if channel >= board.adc_count() {
        return Err(ParseError::ChannelOutOfRange.into());
    }
    let value = board.read_adc(channel);
    Ok(message(format_args!("adc{} VAL={}", channel, value)))
}

fn pwm<X: AuxPwm>(board: &mut X, channel: u8, mut args: Args<'_>) -> Result<Message, CommandError> {
    if channel != X::CHANNEL {
        return Err(ParseError::InvalidPwm.into());
    }

    let period = match args.next().unwrap_or("stat") {
        "stat" => {
            return Ok(message(format_args!("p{} SPD={}", channel, Sig6(board.rate()))));
        }
        "spd" => {
            let rate = args
                .next()
                .ok_or(ParseError::NoSpeed)?
                .parse::<f32>()
                .ok()
                .filter(|rate| rate.is_finite())
                .ok_or(ParseError::InvalidSpeed)?;
            board.set_rate(rate)
        }
        "stop" | "halt" => board.set_rate(0.0),
        _ => return Err(ParseError::UnknownCommand.into()),
    };

    Ok(match period {
        Some(period) => message(format_args!(
            "p{} SPD={} (rc={})",
            channel,
            Sig6(board.rate()),
            period
        )),
        None => message(format_args!("p{} STOPPED", channel)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBoard;
    use crate::traits::PinMode;
    use cryopos_protocol::CommandLine;

    fn run(board: &mut MockBoard, line: &str) -> Result<std::string::String, CommandError> {
        let line = CommandLine::parse(line.as_bytes()).unwrap();
        execute(board, line.name, line.args()).map(|m| m.as_str().into())
    }

    #[test]
    fn test_parse_channels() {
        assert_eq!(parse_channels(b"pa3"), Some(3..=3));
        assert_eq!(parse_channels(b"pa12-4"), Some(12..=4));
        assert_eq!(parse_channels(b"pb0-11"), Some(32..=43));
        assert_eq!(parse_channels(b"pa"), None);
        assert_eq!(parse_channels(b"pa123"), None);
        assert_eq!(parse_channels(b"pa1-"), None);
        assert_eq!(parse_channels(b"pa1x"), None);
        assert_eq!(parse_channels(b"pc1"), None);
    }

    #[test]
    fn test_single_pin() {
        let mut board = MockBoard::default();
        assert_eq!(run(&mut board, "pa5").unwrap(), "pa5 VAL=0");
        assert_eq!(run(&mut board, "pa5 1").unwrap(), "pa5 VAL=1 (output)");
        assert_eq!(run(&mut board, "pb2 +").unwrap(), "pb2 VAL=1 (pull up)");
        assert_eq!(board.modes[34], PinMode::PullUp);
        assert_eq!(run(&mut board, "pb2 -").unwrap(), "pb2 VAL=1");
        assert_eq!(
            run(&mut board, "pa5 x"),
            Err(ParseError::InvalidPinSetting.into())
        );
    }

    #[test]
    fn test_pin_range_write_repeats_last_value() {
        let mut board = MockBoard::default();
        assert_eq!(run(&mut board, "pa0-9 01").unwrap(), "pa0-9 VAL=01111111 11");
        assert_eq!(run(&mut board, "pa3-0 0110").unwrap(), "pa3-0 VAL=0110");
        assert!(!board.levels[3] && board.levels[2] && board.levels[1] && !board.levels[0]);
    }

    #[test]
    fn test_range_spanning_banks_reports_bank_a() {
        let mut board = MockBoard::default();
        board.levels[32] = true;
        assert_eq!(run(&mut board, "pa31-32").unwrap(), "pa31-32 VAL=01");
        assert_eq!(run(&mut board, "pb10-11").unwrap(), "pb10-11 VAL=00");
    }

    #[test]
    fn test_pin_errors() {
        let mut board = MockBoard::default();
        assert_eq!(run(&mut board, "pa44"), Err(ParseError::ChannelOutOfRange.into()));
        assert_eq!(run(&mut board, "pb12"), Err(ParseError::ChannelOutOfRange.into()));
        assert_eq!(run(&mut board, "pa1-2-3"), Err(ParseError::UnknownCommand.into()));
        assert_eq!(run(&mut board, "pz"), Err(ParseError::UnknownCommand.into()));
    }

    #[test]
    fn test_adc() {
        let mut board = MockBoard::default();
        board.adc[2] = 1023;
        assert_eq!(run(&mut board, "adc2").unwrap(), "adc2 VAL=1023");
        assert_eq!(run(&mut board, "adc4"), Err(ParseError::ChannelOutOfRange.into()));
        assert_eq!(run(&mut board, "adc"), Err(ParseError::UnknownCommand.into()));
    }

    #[test]
    fn test_pwm() {
        let mut board = MockBoard::default();
        assert_eq!(run(&mut board, "p6").unwrap(), "p6 SPD=0");
        assert_eq!(run(&mut board, "p6 spd 1000").unwrap(), "p6 SPD=1002.67 (rc=187)");
        assert_eq!(run(&mut board, "p6 stat").unwrap(), "p6 SPD=1002.67");
        assert_eq!(run(&mut board, "p6 stop").unwrap(), "p6 STOPPED");
        assert_eq!(run(&mut board, "p6 spd"), Err(ParseError::NoSpeed.into()));
        assert_eq!(run(&mut board, "p6 spd fast"), Err(ParseError::InvalidSpeed.into()));
        assert_eq!(run(&mut board, "p6 jump"), Err(ParseError::UnknownCommand.into()));
        assert_eq!(run(&mut board, "p3"), Err(ParseError::InvalidPwm.into()));
    }
}
