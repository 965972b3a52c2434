//! One motor axis: position, speed ramp and step-move state
//!
//! [`Axis::tick`] runs in the step timer interrupt. Command methods run in
//! the dispatcher task. The two sides share the axis through atomics, and
//! each field has a single writer:
//!
//! - tick: position, running (cleared), current reload and speed, ramp
//!   progress, step-move phase changes once a move is under way
//! - commands: ramp request, target reload, acceleration, enable,
//!   direction, polarities, clock source, step-move setup, running (set)
//!
//! The ramp request is the only handoff: commands store it, the tick swaps
//! it back to `None` and acts on it once. A newer request overwrites one the
//! tick has not consumed yet.
//!
//! `pos` and `spd` are immediate commands and write tick-owned fields
//! directly; `spd` clears any pending request in the same step.

use core::fmt;

use cryopos_hal::{OutputPin, StepTimer};
use portable_atomic::{AtomicBool, AtomicI32, AtomicU16, AtomicU32, AtomicU8, Ordering};

use super::clock::ClockSource;
use super::ramp;
use crate::config::AxisConfig;

/// A step-move threshold fires when the position is within one step of it
const STEP_LOOKAHEAD: i32 = -2;

/// Ramp request handed from a command to the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RampRequest {
    None = 0,
    /// Ramp to the target reload and keep running
    ToTarget = 1,
    /// Ramp to the floor speed, then stop
    ToMinAndStop = 2,
    /// Jump to the floor speed and stop on the next tick
    HaltNow = 3,
}

impl RampRequest {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => RampRequest::ToTarget,
            2 => RampRequest::ToMinAndStop,
            3 => RampRequest::HaltNow,
            _ => RampRequest::None,
        }
    }

    fn stops(self) -> bool {
        matches!(self, RampRequest::ToMinAndStop | RampRequest::HaltNow)
    }
}

/// Phase of a move-to-position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StepPhase {
    Idle = 0,
    RampUp = 1,
    Cruise = 2,
    RampDown = 3,
}

impl StepPhase {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => StepPhase::RampUp,
            2 => StepPhase::Cruise,
            3 => StepPhase::RampDown,
            _ => StepPhase::Idle,
        }
    }
}

/// Reasons an axis command is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisError {
    /// Motion requested while the driver is disabled
    NotOn,
    /// Step move requested while the axis is moving
    AlreadyRunning,
    /// Step move to the current position
    AtDestination,
    /// Axis has no step-move capability
    StepUnsupported,
}

/// Result of a `ramp` or `step` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampOutcome {
    /// Stop requested on an axis that is not running
    Idle,
    /// Ramp armed toward `speed` (as realised by `reload`)
    Ramping { speed: u32, reload: u16 },
}

/// Result of a `spd` command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedOutcome {
    Stopped { clock: ClockSource },
    Running { speed: f32, reload: u16 },
}

/// Driver signal lines of an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    Direction,
    Enable,
}

/// Requested change to a driver signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalSetting {
    /// Set the logical state (`0`/`1`)
    Level(bool),
    /// Redefine the polarity (`+` normal, `-` inverted), keeping the state
    Polarity { inverted: bool },
}

impl SignalSetting {
    /// Parse `0`, `1`, `+` or `-`; only the first character counts
    pub fn parse(token: &str) -> Option<Self> {
        match token.as_bytes().first()? {
            b'0' => Some(SignalSetting::Level(false)),
            b'1' => Some(SignalSetting::Level(true)),
            b'+' => Some(SignalSetting::Polarity { inverted: false }),
            b'-' => Some(SignalSetting::Polarity { inverted: true }),
            _ => None,
        }
    }
}

/// Step-move progress, reported while a move is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepStatus {
    pub phase: StepPhase,
    pub next: i32,
}

/// Snapshot reported by `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisStatus {
    pub index: u8,
    /// Speed in steps/s, zero unless running and enabled
    pub speed: u32,
    pub reverse: bool,
    pub position: i32,
    pub clock: ClockSource,
    pub step: Option<StepStatus>,
}

impl fmt::Display for AxisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.reverse { '-' } else { '+' };
        write!(f, "m{} SPD={}{} POS={}", self.index, sign, self.speed, self.position)?;
        match self.step {
            Some(step) => write!(f, " MOD={} NXT={}", step.phase as u8, step.next),
            None => write!(f, " CLK={}", self.clock.selector()),
        }
    }
}

/// Progress of the ramp in flight (tick-owned)
struct RampProgress {
    active: AtomicBool,
    disposition: AtomicU8,
    start_speed: AtomicU32,
    end_speed: AtomicU32,
    elapsed: AtomicU32,
    duration: AtomicU32,
}

/// Move-to-position thresholds
struct StepMove {
    phase: AtomicU8,
    from: AtomicI32,
    to: AtomicI32,
    next: AtomicI32,
}

/// Logical state and polarity of a driver signal (command-owned)
struct SignalState {
    level: AtomicBool,
    inverted: AtomicBool,
}

impl SignalState {
    const fn new(inverted: bool) -> Self {
        Self {
            level: AtomicBool::new(false),
            inverted: AtomicBool::new(inverted),
        }
    }

    fn physical(&self) -> bool {
        self.level.load(Ordering::Relaxed) ^ self.inverted.load(Ordering::Relaxed)
    }
}

/// One stepper motor channel
pub struct Axis {
    index: u8,
    config: AxisConfig,

    position: AtomicI32,
    running: AtomicBool,
    current_reload: AtomicU16,
    current_speed: AtomicU32,
    ramp: RampProgress,
    busy: AtomicBool,

    request: AtomicU8,
    target_reload: AtomicU16,
    acceleration: AtomicU32,
    clock: AtomicU8,
    direction: SignalState,
    enable: SignalState,
    step: StepMove,
}

impl Axis {
    /// Create an idle axis parked at its floor speed
    pub const fn new(index: u8, config: AxisConfig) -> Self {
        let parked = ramp_const_reload(config.clock.hz(), config.min_speed);
        Self {
            index,
            config,
            position: AtomicI32::new(0),
            running: AtomicBool::new(false),
            current_reload: AtomicU16::new(parked),
            current_speed: AtomicU32::new(config.min_speed),
            ramp: RampProgress {
                active: AtomicBool::new(false),
                disposition: AtomicU8::new(RampRequest::None as u8),
                start_speed: AtomicU32::new(0),
                end_speed: AtomicU32::new(0),
                elapsed: AtomicU32::new(0),
                duration: AtomicU32::new(0),
            },
            busy: AtomicBool::new(false),
            request: AtomicU8::new(RampRequest::None as u8),
            target_reload: AtomicU16::new(parked),
            acceleration: AtomicU32::new(config.acceleration),
            clock: AtomicU8::new(config.clock as u8),
            direction: SignalState::new(config.dir_inverted),
            enable: SignalState::new(config.on_inverted),
            step: StepMove {
                phase: AtomicU8::new(StepPhase::Idle as u8),
                from: AtomicI32::new(0),
                to: AtomicI32::new(0),
                next: AtomicI32::new(0),
            },
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn can_step(&self) -> bool {
        self.config.can_step
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enable.level.load(Ordering::Relaxed)
    }

    /// True when pulses move the position downward
    pub fn is_reverse(&self) -> bool {
        self.direction.level.load(Ordering::Relaxed)
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.active.load(Ordering::Relaxed)
    }

    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Relaxed)
    }

    /// Overwrite the position counter; no motion is implied
    pub fn set_position(&self, position: i32) {
        self.position.store(position, Ordering::Relaxed);
    }

    pub fn current_speed(&self) -> u32 {
        self.current_speed.load(Ordering::Relaxed)
    }

    pub fn current_reload(&self) -> u16 {
        self.current_reload.load(Ordering::Relaxed)
    }

    pub fn target_reload(&self) -> u16 {
        self.target_reload.load(Ordering::Relaxed)
    }

    pub fn pending_request(&self) -> RampRequest {
        RampRequest::from_bits(self.request.load(Ordering::Acquire))
    }

    pub fn acceleration(&self) -> u32 {
        self.acceleration.load(Ordering::Relaxed)
    }

    /// Clamp and store a new acceleration; applies from the next ramp
    pub fn set_acceleration(&self, value: i64) -> u32 {
        let acceleration = ramp::clamp_acceleration(value);
        self.acceleration.store(acceleration, Ordering::Relaxed);
        acceleration
    }

    pub fn clock(&self) -> ClockSource {
        ClockSource::from_selector(self.clock.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn step_phase(&self) -> StepPhase {
        StepPhase::from_bits(self.step.phase.load(Ordering::Relaxed))
    }

    /// Next step-move threshold
    pub fn step_next(&self) -> i32 {
        self.step.next.load(Ordering::Relaxed)
    }

    /// Snapshot for `stat`; reads only
    pub fn status(&self) -> AxisStatus {
        let phase = self.step_phase();
        let speed = if self.is_running() && self.is_enabled() {
            self.current_speed()
        } else {
            0
        };
        AxisStatus {
            index: self.index,
            speed,
            reverse: self.is_reverse(),
            position: self.position(),
            clock: self.clock(),
            step: (self.config.can_step && phase != StepPhase::Idle).then(|| StepStatus {
                phase,
                next: self.step_next(),
            }),
        }
    }

    /// Timer tick: one step pulse has just been produced
    pub fn tick<T: StepTimer>(&self, timer: &mut T) {
        if self.is_enabled() {
            if self.is_reverse() {
                self.position.fetch_sub(1, Ordering::Relaxed);
            } else {
                self.position.fetch_add(1, Ordering::Relaxed);
            }
        }

        // A nested tick only counts the step
        if self.busy.swap(true, Ordering::Acquire) {
            return;
        }
        self.advance(timer);
        self.busy.store(false, Ordering::Release);
    }

    fn advance<T: StepTimer>(&self, timer: &mut T) {
        let clock_hz = self.clock().hz();

        if self.config.can_step && self.check_step_phase(clock_hz) {
            // Short move landed on its destination at the switch-over
            self.request.store(RampRequest::None as u8, Ordering::Release);
            self.ramp.active.store(false, Ordering::Relaxed);
            self.park(timer);
            self.apply_reload(timer, clock_hz);
            return;
        }

        let request =
            RampRequest::from_bits(self.request.swap(RampRequest::None as u8, Ordering::AcqRel));
        if request != RampRequest::None {
            self.arm_ramp(request, clock_hz);
        } else if self.is_ramping() {
            self.progress_ramp(timer, clock_hz);
        }
    }

    /// Advance the step move state machine; returns `true` when the axis
    /// already stands on the destination and must stop in this tick
    fn check_step_phase(&self, clock_hz: u32) -> bool {
        let phase = self.step_phase();
        if phase == StepPhase::Idle {
            return false;
        }

        let sign = if self.is_reverse() { -1 } else { 1 };
        let remaining = |next: i32| self.position().wrapping_sub(next).wrapping_mul(sign);
        if remaining(self.step_next()) <= STEP_LOOKAHEAD {
            return false;
        }

        let request = match phase {
            StepPhase::RampUp | StepPhase::Cruise => {
                let to = self.step.to.load(Ordering::Relaxed);
                self.step.next.store(to, Ordering::Relaxed);
                // Moves of one or two steps reach the ramp-down threshold
                // together with the midpoint
                let left = remaining(to);
                if left >= 0 {
                    self.step.phase.store(StepPhase::Idle as u8, Ordering::Relaxed);
                    return true;
                } else if left > STEP_LOOKAHEAD {
                    self.step.phase.store(StepPhase::Idle as u8, Ordering::Relaxed);
                    RampRequest::HaltNow
                } else {
                    self.step.phase.store(StepPhase::RampDown as u8, Ordering::Relaxed);
                    RampRequest::ToMinAndStop
                }
            }
            _ => {
                self.step.phase.store(StepPhase::Idle as u8, Ordering::Relaxed);
                RampRequest::HaltNow
            }
        };
        let parked = ramp::reload_for_speed(clock_hz, self.config.min_speed);
        self.target_reload.store(parked, Ordering::Relaxed);
        self.request.store(request as u8, Ordering::Release);
        false
    }

    fn arm_ramp(&self, request: RampRequest, clock_hz: u32) {
        self.ramp
            .disposition
            .store(request as u8, Ordering::Relaxed);

        let current = self.current_reload();
        let target = self.target_reload();
        if target == current && !request.stops() {
            return;
        }

        let start = ramp::speed_for_reload(clock_hz, current);
        let end = ramp::speed_for_reload(clock_hz, target);
        let duration = if request == RampRequest::HaltNow {
            0
        } else {
            let scale = ramp::ramp_scale(clock_hz, self.acceleration());
            ramp::ramp_duration(start, end, scale)
        };

        self.current_speed.store(start, Ordering::Relaxed);
        self.ramp.start_speed.store(start, Ordering::Relaxed);
        self.ramp.end_speed.store(end, Ordering::Relaxed);
        self.ramp.duration.store(duration, Ordering::Relaxed);
        self.ramp.elapsed.store(0, Ordering::Relaxed);
        self.ramp.active.store(true, Ordering::Relaxed);
    }

    fn progress_ramp<T: StepTimer>(&self, timer: &mut T, clock_hz: u32) {
        let elapsed = self
            .ramp
            .elapsed
            .load(Ordering::Relaxed)
            .saturating_add(self.current_reload() as u32);
        self.ramp.elapsed.store(elapsed, Ordering::Relaxed);

        let start = self.ramp.start_speed.load(Ordering::Relaxed);
        let end = self.ramp.end_speed.load(Ordering::Relaxed);
        let duration = self.ramp.duration.load(Ordering::Relaxed);

        if elapsed >= duration {
            let disposition = RampRequest::from_bits(self.ramp.disposition.load(Ordering::Relaxed));
            if disposition.stops() {
                // Keep stepping until the move reaches its endpoint
                if disposition == RampRequest::ToMinAndStop && self.step_phase() != StepPhase::Idle
                {
                    return;
                }
                self.park(timer);
            } else {
                self.current_speed.store(end, Ordering::Relaxed);
                if self.step_phase() != StepPhase::Idle {
                    let from = self.step.from.load(Ordering::Relaxed);
                    let to = self.step.to.load(Ordering::Relaxed);
                    let travelled = self.position().wrapping_sub(from);
                    self.step.next.store(to.wrapping_sub(travelled), Ordering::Relaxed);
                    self.step.phase.store(StepPhase::Cruise as u8, Ordering::Relaxed);
                }
            }
            self.ramp.active.store(false, Ordering::Relaxed);
        } else {
            let speed = ramp::interpolate(start, end, elapsed, duration);
            self.current_speed.store(speed, Ordering::Relaxed);
        }

        self.apply_reload(timer, clock_hz);
    }

    /// Stop the timer and fall back to the parked speed
    fn park<T: StepTimer>(&self, timer: &mut T) {
        timer.stop();
        self.running.store(false, Ordering::Relaxed);
        self.current_speed.store(self.config.min_speed, Ordering::Relaxed);
        self.step.phase.store(StepPhase::Idle as u8, Ordering::Relaxed);
    }

    fn apply_reload<T: StepTimer>(&self, timer: &mut T, clock_hz: u32) {
        let reload = ramp::reload_for_speed(clock_hz, self.current_speed());
        self.current_reload.store(reload, Ordering::Relaxed);
        timer.set_reload(reload);
    }

    /// Ramp to `speed`; zero or negative ramps down to a stop
    pub fn ramp<T: StepTimer>(&self, speed: i32, timer: &mut T) -> Result<RampOutcome, AxisError> {
        self.step.phase.store(StepPhase::Idle as u8, Ordering::Relaxed);
        self.request_ramp(speed, timer)
    }

    /// Check the step move precondition that comes before its arguments
    pub fn check_step_ready(&self) -> Result<(), AxisError> {
        if self.is_running() {
            return Err(AxisError::AlreadyRunning);
        }
        Ok(())
    }

    /// Move to `destination`: ramp up, cruise, ramp down and halt on it
    pub fn step<T: StepTimer, P: OutputPin>(
        &self,
        destination: i32,
        speed: i32,
        timer: &mut T,
        dir_pin: &mut P,
    ) -> Result<RampOutcome, AxisError> {
        self.check_step_ready()?;
        self.step.phase.store(StepPhase::Idle as u8, Ordering::Relaxed);
        if speed <= 0 {
            return Ok(RampOutcome::Idle);
        }
        if !self.is_enabled() {
            return Err(AxisError::NotOn);
        }
        if !self.config.can_step {
            return Err(AxisError::StepUnsupported);
        }

        let from = self.position();
        if destination == from {
            return Err(AxisError::AtDestination);
        }

        let reverse = destination < from;
        if reverse != self.is_reverse() {
            self.apply_signal(Signal::Direction, SignalSetting::Level(reverse), dir_pin);
        }

        let midpoint = ((from as i64 + destination as i64) / 2) as i32;
        self.step.from.store(from, Ordering::Relaxed);
        self.step.to.store(destination, Ordering::Relaxed);
        self.step.next.store(midpoint, Ordering::Relaxed);
        self.step.phase.store(StepPhase::RampUp as u8, Ordering::Relaxed);

        self.request_ramp(speed, timer)
    }

    fn request_ramp<T: StepTimer>(&self, speed: i32, timer: &mut T) -> Result<RampOutcome, AxisError> {
        let clock_hz = self.clock().hz();
        let (speed, request) = if speed <= 0 {
            if !self.is_running() {
                return Ok(RampOutcome::Idle);
            }
            let floor = self.current_speed().min(self.config.min_speed);
            (floor, RampRequest::ToMinAndStop)
        } else {
            if !self.is_enabled() {
                return Err(AxisError::NotOn);
            }
            (speed as u32, RampRequest::ToTarget)
        };

        let reload = ramp::reload_for_speed(clock_hz, speed);
        self.target_reload.store(reload, Ordering::Relaxed);
        self.request.store(request as u8, Ordering::Release);
        self.ensure_running(timer);

        Ok(RampOutcome::Ramping {
            speed: ramp::speed_for_reload(clock_hz, reload),
            reload,
        })
    }

    /// Set the speed immediately, without a ramp, optionally on a new clock
    ///
    /// A speed of zero or less stops the axis; the clock change and reload
    /// are still applied.
    pub fn set_speed<T: StepTimer>(
        &self,
        speed: f32,
        clock: Option<ClockSource>,
        timer: &mut T,
    ) -> Result<SpeedOutcome, AxisError> {
        let stopping = speed <= 0.0;
        let speed = if stopping {
            self.halt_timer(timer);
            self.config.min_speed as f32
        } else if !self.is_enabled() {
            return Err(AxisError::NotOn);
        } else {
            speed
        };

        let source = clock.unwrap_or_else(|| self.clock());
        if source != self.clock() {
            self.halt_timer(timer);
            self.clock.store(source as u8, Ordering::Relaxed);
            timer.select_clock(source.hz());
        }

        let clock_hz = source.hz();
        let reload = ramp::reload_for_rate(clock_hz, speed);
        let actual = clock_hz as f32 / reload as f32;

        self.request.store(RampRequest::None as u8, Ordering::Release);
        self.ramp.active.store(false, Ordering::Relaxed);
        self.current_reload.store(reload, Ordering::Relaxed);
        self.current_speed.store(actual as u32, Ordering::Relaxed);
        timer.set_reload(reload);

        if stopping {
            return Ok(SpeedOutcome::Stopped { clock: source });
        }
        self.ensure_running(timer);
        Ok(SpeedOutcome::Running { speed: actual, reload })
    }

    /// Fastest stop: jump to the floor speed, then stop
    pub fn halt(&self) {
        let parked = ramp::reload_for_speed(self.clock().hz(), self.config.min_speed);
        self.target_reload.store(parked, Ordering::Relaxed);
        self.request.store(RampRequest::HaltNow as u8, Ordering::Release);
    }

    fn ensure_running<T: StepTimer>(&self, timer: &mut T) {
        if !self.running.swap(true, Ordering::AcqRel) {
            timer.start();
        }
    }

    fn halt_timer<T: StepTimer>(&self, timer: &mut T) {
        if self.running.swap(false, Ordering::AcqRel) {
            timer.stop();
        }
    }

    fn signal(&self, signal: Signal) -> &SignalState {
        match signal {
            Signal::Direction => &self.direction,
            Signal::Enable => &self.enable,
        }
    }

    /// I/O channel of a signal line
    pub fn signal_pin(&self, signal: Signal) -> u8 {
        match signal {
            Signal::Direction => self.config.dir_pin,
            Signal::Enable => self.config.on_pin,
        }
    }

    pub fn signal_inverted(&self, signal: Signal) -> bool {
        self.signal(signal).inverted.load(Ordering::Relaxed)
    }

    /// Change a signal's state or polarity and drive the pin to match
    pub fn apply_signal<P: OutputPin>(&self, signal: Signal, setting: SignalSetting, pin: &mut P) {
        let state = self.signal(signal);
        match setting {
            SignalSetting::Level(level) => state.level.store(level, Ordering::Relaxed),
            SignalSetting::Polarity { inverted } => state.inverted.store(inverted, Ordering::Relaxed),
        }
        pin.set_state(state.physical());
    }

    /// Drive both signal pins to their power-on state
    pub fn init_signals<P: OutputPin>(&self, dir_pin: &mut P, on_pin: &mut P) {
        dir_pin.set_state(self.direction.physical());
        on_pin.set_state(self.enable.physical());
    }
}

/// Parked reload, usable in `const` context
const fn ramp_const_reload(clock_hz: u32, speed: u32) -> u16 {
    let speed = if speed == 0 { 1 } else { speed };
    let counts = clock_hz / speed;
    if counts < ramp::MIN_RELOAD as u32 {
        ramp::MIN_RELOAD
    } else if counts > ramp::MAX_RELOAD as u32 {
        ramp::MAX_RELOAD
    } else {
        counts as u16
    }
}
