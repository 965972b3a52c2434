//! Command dispatcher
//!
//! Executes a command batch line by line and writes one response line per
//! command into a [`ResponseFramer`]:
//!
//! | Command | Handler |
//! |---|---|
//! | `m0`..`m2` | motion engine ([`motor`]) |
//! | `pa#[-#]`, `pb#[-#]`, `adc#`, `p#` | board I/O ([`io`]) |
//! | `halt`, `ver`, `ser`, `help`, `wdt`, `nop` | system ([`system`]) |

mod error;
pub mod io;
pub mod motor;
pub mod system;

use core::fmt::{self, Write};

use cryopos_hal::{OutputPin, StepTimer};
use cryopos_protocol::{Batch, CommandLine, ResponseFramer, Status};
use heapless::String;

use crate::config::NUM_AXES;
use crate::motion::Axis;
use crate::traits::Peripherals;

pub use error::{CommandError, ParseError, PreconditionError};

/// Longest response message
pub const MAX_MESSAGE_LEN: usize = 256;

/// Response message text
pub type Message = String<MAX_MESSAGE_LEN>;

/// Format a response message; text beyond [`MAX_MESSAGE_LEN`] is cut off
pub fn message(args: fmt::Arguments<'_>) -> Message {
    let mut text = Message::new();
    let _ = text.write_fmt(args);
    text
}

/// Hardware the dispatcher drives for one axis
pub struct MotorPort<T, P> {
    pub timer: T,
    pub dir: P,
    pub on: P,
}

impl<T, P: OutputPin> MotorPort<T, P> {
    pub fn new(timer: T, dir: P, on: P) -> Self {
        Self { timer, dir, on }
    }
}

/// Summary of one executed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatchReport {
    /// Command lines executed
    pub executed: usize,
    /// Responses that did not fit in the response buffer
    pub dropped: usize,
}

/// Routes command lines to axes and board collaborators
pub struct Dispatcher<'a, T, P, X> {
    axes: &'a [Axis; NUM_AXES],
    ports: [MotorPort<T, P>; NUM_AXES],
    board: X,
    label: &'a str,
}

impl<'a, T, P, X> Dispatcher<'a, T, P, X>
where
    T: StepTimer,
    P: OutputPin,
    X: Peripherals,
{
    /// Create a dispatcher and drive every axis signal to its initial state
    pub fn new(
        axes: &'a [Axis; NUM_AXES],
        mut ports: [MotorPort<T, P>; NUM_AXES],
        board: X,
        label: &'a str,
    ) -> Self {
        for (axis, port) in axes.iter().zip(ports.iter_mut()) {
            axis.init_signals(&mut port.dir, &mut port.on);
        }
        Self {
            axes,
            ports,
            board,
            label,
        }
    }

    pub fn axes(&self) -> &'a [Axis; NUM_AXES] {
        self.axes
    }

    pub fn board(&self) -> &X {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut X {
        &mut self.board
    }

    /// Execute every line of `batch` and seal the response
    pub fn execute<const N: usize>(
        &mut self,
        batch: &[u8],
        out: &mut ResponseFramer<N>,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for line in Batch::new(batch) {
            let (tag, result) = match line {
                Ok(line) => (line.tag, self.execute_line(&line)),
                Err(e) => (None, Err(e.into())),
            };
            report.executed += 1;

            let pushed = match result {
                Ok(text) => out.push(tag, Status::Ok, &text),
                Err(e) => out.push(tag, Status::Bad, &message(format_args!("{}", e))),
            };
            if pushed.is_err() {
                report.dropped += 1;
            }
        }

        out.seal();
        report
    }

    /// Execute one tokenized line
    pub fn execute_line(&mut self, line: &CommandLine<'_>) -> Result<Message, CommandError> {
        let args = line.args();
        match line.name {
            "halt" => Ok(system::halt_all(self.axes)),
            "ver" => Ok(system::version(self.label)),
            "ser" => Ok(system::serial(&self.board)),
            "help" => Ok(system::help()),
            "wdt" => system::watchdog(&mut self.board, args),
            "nop" => Ok(Message::new()),
            name => {
                if let Some(index) = motor::axis_index(name) {
                    motor::execute(&self.axes[index], &mut self.ports[index], args)
                } else {
                    io::execute(&mut self.board, name, args)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::testing::{MockBoard, MockPin, MockTimer};
    use cryopos_protocol::{PACKET_SIZE, RESPONSE_CAPACITY};

    type TestDispatcher<'a> = Dispatcher<'a, MockTimer, MockPin, MockBoard>;

    fn axes() -> [Axis; NUM_AXES] {
        let config = MachineConfig::default();
        [
            Axis::new(0, config.axes[0]),
            Axis::new(1, config.axes[1]),
            Axis::new(2, config.axes[2]),
        ]
    }

    fn dispatcher(axes: &[Axis; NUM_AXES]) -> TestDispatcher<'_> {
        let ports = core::array::from_fn(|_| {
            MotorPort::new(MockTimer::default(), MockPin::default(), MockPin::default())
        });
        Dispatcher::new(axes, ports, MockBoard::default(), "CUTE")
    }

    fn run(dispatcher: &mut TestDispatcher<'_>, batch: &str) -> std::string::String {
        let mut out: ResponseFramer = ResponseFramer::new();
        dispatcher.execute(batch.as_bytes(), &mut out);
        std::string::String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    fn tick_until_idle_ramp(axis: &Axis) {
        let mut timer = MockTimer::default();
        axis.tick(&mut timer);
        let mut ticks = 0;
        while axis.is_ramping() {
            axis.tick(&mut timer);
            ticks += 1;
            assert!(ticks < 100_000);
        }
    }

    #[test]
    fn test_tagged_responses_in_order() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(
            run(&mut d, "A.m0 stat;B.m1 stat"),
            "A.OK m0 SPD=+0 POS=0 CLK=3\nB.OK m1 SPD=+0 POS=0 CLK=3\n"
        );
    }

    #[test]
    fn test_ramp_scenario() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(
            run(&mut d, "m0 acc 4000;m0 on 1;m0 ramp 100"),
            "OK m0 ACC=4000\nOK pa37 VAL=0 (inv)\nOK m0 RAMP=100 (rc=15000)\n"
        );

        tick_until_idle_ramp(&axes[0]);
        assert_eq!(run(&mut d, "m0"), "OK m0 SPD=+100 POS=2 CLK=3\n");
    }

    #[test]
    fn test_step_scenario() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(
            run(&mut d, "m0 on 1;m0 step 1000 200"),
            "OK pa37 VAL=0 (inv)\nOK m0 RAMP=200 (rc=7500)\n"
        );
        assert_eq!(axes[0].step_next(), 500);

        let mut timer = MockTimer::default();
        while axes[0].is_running() {
            axes[0].tick(&mut timer);
        }
        assert_eq!(run(&mut d, "m0 stat"), "OK m0 SPD=+0 POS=1000 CLK=3\n");
        assert_eq!(run(&mut d, "m0 step 1000 200"), "BAD at destination\n");
    }

    #[test]
    fn test_motor_errors() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(
            run(&mut d, "m1 ramp 50;m1 step 5 5;m0 ramp;m0 ramp x;m0 step;m0 step 5;m0 bogus"),
            "BAD m1 is not on\n\
             BAD m1 is not on\n\
             BAD no speed\n\
             BAD invalid speed\n\
             BAD no destination\n\
             BAD no speed\n\
             BAD unknown cmd\n"
        );
        assert_eq!(run(&mut d, "m3 stat;mx;m"), "BAD unknown cmd\nBAD unknown cmd\nBAD unknown cmd\n");
        assert_eq!(
            run(&mut d, "m1 on 1;m1 step 5 5;m1 step x 5"),
            "OK pa38 VAL=0 (inv)\nBAD m1 doesn't step\nBAD invalid destination\n"
        );
    }

    #[test]
    fn test_numeric_arguments_are_whole_tokens() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        run(&mut d, "m0 on 1");
        assert_eq!(
            run(&mut d, "m0 ramp 100x;m0 step 10x 100;m0 step 10 1e3;m0 pos 7.0;m0 acc 2000.5"),
            "BAD invalid speed\n\
             BAD invalid destination\n\
             BAD invalid speed\n\
             BAD invalid position\n\
             BAD invalid acceleration\n"
        );
        assert!(!axes[0].is_running());
        assert_eq!(axes[0].position(), 0);
    }

    #[test]
    fn test_stop_and_halt() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(run(&mut d, "m2 stop"), "OK m2 RAMP=0\n");

        run(&mut d, "m2 on 1;m2 ramp 400");
        tick_until_idle_ramp(&axes[2]);
        assert_eq!(run(&mut d, "m2 stop"), "OK m2 RAMP=25 (rc=60000)\n");
        assert_eq!(run(&mut d, "m2 halt"), "OK m2 HALTED\n");
        assert_eq!(run(&mut d, "halt"), "OK HALTED\n");
        assert!(axes
            .iter()
            .all(|a| a.pending_request() == crate::motion::RampRequest::HaltNow));
    }

    #[test]
    fn test_spd_command() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(run(&mut d, "m0 spd 100"), "BAD m0 is not on\n");
        assert_eq!(run(&mut d, "m0 spd 100 9"), "BAD bad clk\n");
        assert_eq!(run(&mut d, "m0 spd"), "BAD no speed\n");
        assert_eq!(run(&mut d, "m0 spd nan"), "BAD invalid speed\n");

        run(&mut d, "m0 on 1");
        assert_eq!(run(&mut d, "m0 spd 7000"), "OK m0 SPD=7009.35 (rc=214)\n");
        assert_eq!(run(&mut d, "m0 spd 100 2"), "OK m0 SPD=100 (rc=60000)\n");
        assert_eq!(axes[0].clock().selector(), 2);
        assert_eq!(run(&mut d, "m0 spd 0 3"), "OK m0 STOPPED (clk=3)\n");
        assert!(!axes[0].is_running());
    }

    #[test]
    fn test_pos_and_acc() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(
            run(&mut d, "m1 pos -1234;m1 pos;m1 pos 1.5"),
            "OK m1 POS=-1234\nOK m1 POS=-1234\nBAD invalid position\n"
        );
        assert_eq!(
            run(&mut d, "m2 acc 50;m2 acc 99999999999;m2 acc;m2 acc fast"),
            "OK m2 ACC=1000\nOK m2 ACC=10000\nOK m2 ACC=10000\nBAD invalid acceleration\n"
        );
    }

    #[test]
    fn test_signal_commands() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        assert_eq!(run(&mut d, "m1 dir"), "OK pa35 VAL=0\n");
        assert_eq!(run(&mut d, "m1 dir 1"), "OK pa35 VAL=1\n");
        assert_eq!(run(&mut d, "m1 dir -"), "OK pa35 VAL=0 (inv)\n");
        assert!(axes[1].is_reverse());
        assert_eq!(run(&mut d, "m1 on"), "OK pa38 VAL=1 (inv)\n");
        assert_eq!(run(&mut d, "m1 on x"), "BAD must set to 0, 1, + or -\n");
    }

    #[test]
    fn test_line_errors_continue_batch() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        let mut batch = "x".repeat(300);
        batch.push_str(";   ;Z.nop");
        assert_eq!(run(&mut d, &batch), "BAD cmd too big\nBAD no cmd\nZ.OK\n");
        assert_eq!(run(&mut d, "frob;Q."), "BAD unknown cmd\nQ.BAD unknown cmd\n");
    }

    #[test]
    fn test_overflow_drops_response() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        let mut out: ResponseFramer<48> = ResponseFramer::new();

        let report = d.execute(b"A.m0 stat;B.m1 stat;C.nop", &mut out);
        assert_eq!(report, BatchReport { executed: 3, dropped: 1 });
        assert_eq!(out.as_bytes(), b"A.OK m0 SPD=+0 POS=0 CLK=3\nC.OK\n");
    }

    #[test]
    fn test_batch_drains_with_terminator() {
        let axes = axes();
        let mut d = dispatcher(&axes);
        let mut out: ResponseFramer<RESPONSE_CAPACITY> = ResponseFramer::new();
        d.execute(b"ver\0garbage", &mut out);

        let mut packet = [0u8; PACKET_SIZE];
        let n = out.next_chunk(&mut packet).unwrap();
        assert_eq!(&packet[..n], b"OK Version 0.1.0 (CUTE)\n\0");
        assert_eq!(out.next_chunk(&mut packet), None);
    }
}
