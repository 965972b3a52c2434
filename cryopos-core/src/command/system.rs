//! System commands: `halt`, `ver`, `ser`, `help`, `wdt`

use cryopos_protocol::Args;

use super::{message, CommandError, Message, ParseError};
use crate::config::NUM_AXES;
use crate::motion::Axis;
use crate::traits::Supervisor;

/// Firmware version reported by `ver`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = "Available commands:\n\
                    pa#; pb#; adc#\n\
                    m# [ramp,step,spd,stop,halt,stat,pos,on,dir,acc]\n\
                    p# [spd,stop,halt,stat]; nop; ver; ser; wdt; help";

/// Halt every axis
pub fn halt_all(axes: &[Axis; NUM_AXES]) -> Message {
    for axis in axes {
        axis.halt();
    }
    message(format_args!("HALTED"))
}

pub fn version(label: &str) -> Message {
    message(format_args!("Version {} ({})", VERSION, label))
}

/// Unique device identifier as 30 hex digits
pub fn serial<X: Supervisor>(board: &X) -> Message {
    let id = board.serial_number();
    message(format_args!(
        "{:08x}{:08x}{:08x}{:06x}",
        id[0],
        id[1],
        id[2],
        id[3] >> 8
    ))
}

pub fn help() -> Message {
    message(format_args!("{}", HELP))
}

/// Get or set the watchdog timeout in seconds; zero disables it
pub fn watchdog<X: Supervisor>(board: &mut X, mut args: Args<'_>) -> Result<Message, CommandError> {
    if let Some(token) = args.next() {
        let seconds = token
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidTimeout)?;
        board.set_watchdog(seconds);
    }

    Ok(match board.watchdog_timeout() {
        Some(seconds) => {
            let reset = if board.reset_by_watchdog() {
                " (RESET OCCURRED!)"
            } else {
                ""
            };
            message(format_args!("WDT set to {} seconds{}", seconds, reset))
        }
        None => message(format_args!("WDT disabled")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBoard;
    use cryopos_protocol::CommandLine;

    fn wdt(board: &mut MockBoard, line: &str) -> Result<std::string::String, CommandError> {
        let line = CommandLine::parse(line.as_bytes()).unwrap();
        watchdog(board, line.args()).map(|m| m.as_str().into())
    }

    #[test]
    fn test_version() {
        assert_eq!(version("CUTE").as_str(), "Version 0.1.0 (CUTE)");
    }

    #[test]
    fn test_serial() {
        let board = MockBoard {
            serial: [0x0123_4567, 0x89ab_cdef, 0x0000_00ff, 0xaabb_ccdd],
            ..MockBoard::default()
        };
        assert_eq!(serial(&board).as_str(), "0123456789abcdef000000ffaabbcc");
    }

    #[test]
    fn test_help_fits_one_response() {
        assert!(help().len() < 200);
        assert!(help().starts_with("Available commands:\n"));
    }

    #[test]
    fn test_watchdog() {
        let mut board = MockBoard::default();
        assert_eq!(wdt(&mut board, "wdt").unwrap(), "WDT disabled");
        assert_eq!(wdt(&mut board, "wdt 5").unwrap(), "WDT set to 5 seconds");
        assert_eq!(wdt(&mut board, "wdt").unwrap(), "WDT set to 5 seconds");
        assert_eq!(wdt(&mut board, "wdt 0").unwrap(), "WDT disabled");
        assert_eq!(
            wdt(&mut board, "wdt soon"),
            Err(ParseError::InvalidTimeout.into())
        );

        board.watchdog = Some(1);
        board.watchdog_reset = true;
        assert_eq!(
            wdt(&mut board, "wdt").unwrap(),
            "WDT set to 1 seconds (RESET OCCURRED!)"
        );
        assert_eq!(wdt(&mut board, "wdt 2").unwrap(), "WDT set to 2 seconds");
    }
}
