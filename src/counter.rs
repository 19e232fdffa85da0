//! The streaming rainflow counter and its lifecycle.
//!
//! A [`RainflowCounter`] is initialized once, fed any number of sample
//! chunks, finalized, and released:
//!
//! ```
//! use rainflow::{Flags, RainflowCounter, ResidualMethod};
//!
//! let mut counter = RainflowCounter::new();
//! counter.init(4, 1.0, 0.5, 0.99, Flags::DEFAULT).unwrap();
//! counter.feed(&[1.0, 3.0]).unwrap();
//! counter.feed(&[2.0, 4.0]).unwrap();
//! counter.finalize(ResidualMethod::None).unwrap();
//!
//! let matrix = counter.matrix().unwrap();
//! assert_eq!(matrix.get(2, 1), counter.full_increment());
//! assert_eq!(counter.residue().len(), 2);
//! counter.release().unwrap();
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alloc::{Allocator, HeapAllocator, MemoryAim};
use crate::class::ClassParams;
use crate::cycle::find_cycles;
use crate::damage::{DamageAccumulator, Flags, WoehlerCurve};
use crate::error::{Error, Result};
use crate::filter::TurningPointFilter;
use crate::matrix::{Counts, RainflowMatrix, FULL_CYCLE_INCREMENT};
use crate::residue::{residue_capacity, Residue, RESIDUE_INLINE_CAPACITY};
use crate::sample::Sample;

/// Lifecycle of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    Uninitialized,
    /// Initialized, no turning point found yet.
    Ready,
    /// At least one turning point is known.
    Accumulating,
    /// Transient, while `finalize` runs.
    Finalizing,
    Finished,
    Error,
}

/// How unresolved residue is treated when finalizing.
///
/// Neither method derives cycles from the residue; it is left for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidualMethod {
    #[default]
    None,
    Ignore,
}

impl ResidualMethod {
    /// Method for a numeric code, `0` = none, `1` = ignore.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(ResidualMethod::None),
            1 => Ok(ResidualMethod::Ignore),
            _ => Err(Error::invalid_argument(format!("unsupported residual method {}", code))),
        }
    }
}

impl FromStr for ResidualMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ResidualMethod::None),
            "ignore" => Ok(ResidualMethod::Ignore),
            _ => Err(Error::invalid_argument(format!("unsupported residual method '{}'", s))),
        }
    }
}

impl fmt::Display for ResidualMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResidualMethod::None => write!(f, "none"),
            ResidualMethod::Ignore => write!(f, "ignore"),
        }
    }
}

/// Parameters a counter was initialized with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterConfig {
    pub classes: ClassParams,
    pub hysteresis: f64,
    pub flags: Flags,
    pub woehler: WoehlerCurve,
}

impl CounterConfig {
    pub fn new(classes: ClassParams, hysteresis: f64) -> Self {
        CounterConfig {
            classes,
            hysteresis,
            flags: Flags::DEFAULT,
            woehler: WoehlerCurve::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.classes.validate()?;
        if !(self.hysteresis >= 0.0 && self.hysteresis.is_finite()) {
            return Err(Error::invalid_argument(format!(
                "hysteresis must be 0.0 or greater, got {}",
                self.hysteresis
            )));
        }
        self.woehler.validate()
    }
}

/// Turning-point search state, private to the counter.
#[derive(Debug, Default)]
struct FilterState {
    filter: TurningPointFilter,
    /// Position of the last fed sample.
    pos: u64,
}

/// Everything owned between `init` and `release`.
#[derive(Debug)]
struct Session {
    config: CounterConfig,
    filter: FilterState,
    residue: Residue,
    acc: DamageAccumulator,
}

impl Session {
    fn has_turning_points(&self) -> bool {
        !self.residue.is_empty() || self.residue.interim().is_some()
    }

    fn feed(&mut self, data: &[f64]) -> Result<()> {
        for &value in data {
            self.filter.pos += 1;
            let pt = Sample::new(value, self.config.classes.class_of(value), self.filter.pos);
            self.feed_once(pt)?;
        }
        Ok(())
    }

    fn feed_once(&mut self, pt: Sample) -> Result<()> {
        let confirmed = self.filter.filter.process(&mut self.residue, pt, self.config.hysteresis)?;
        if confirmed.is_none() {
            return Ok(());
        }
        if self.config.classes.is_enabled() {
            self.find_cycles();
        } else if self.residue.len() > 1 {
            // Tracking only: keep the most recent turning point
            self.residue.remove(0, 1);
        }
        Ok(())
    }

    fn find_cycles(&mut self) {
        let classes = self.config.classes;
        let acc = &mut self.acc;
        find_cycles(&mut self.residue, |from, to| acc.count(&classes, from, to));
    }

    /// Takes the interim point into account and discards the residue.
    fn finalize_ignore(&mut self) -> Result<()> {
        if self.residue.promote_interim()? && self.config.classes.is_enabled() {
            self.find_cycles();
        }
        if !self.config.classes.is_enabled() {
            self.residue.clear();
        }
        Ok(())
    }

    fn release<A: Allocator>(mut self, allocator: &A) {
        if let Some(matrix) = self.acc.take_matrix() {
            allocator.release_matrix(matrix.into_buffer());
        }
        if let Some(buffer) = self.residue.into_buffer() {
            allocator.release_residue(buffer);
        }
    }
}

/// Streaming rainflow counter (four-point method) for one load series.
///
/// Memory is fixed after `init`: the residue holds at most
/// `max(3, 2 * class_count)` turning points and the matrix
/// `class_count²` cells. Independent series need independent counters.
pub struct RainflowCounter<A: Allocator = HeapAllocator> {
    allocator: A,
    state: State,
    last_error: Option<Error>,
    session: Option<Session>,
}

impl RainflowCounter<HeapAllocator> {
    pub fn new() -> Self {
        Self::with_allocator(HeapAllocator)
    }

    /// Initializes a counter and runs a complete series through it.
    pub fn from_series(config: &CounterConfig, data: &[f64], method: ResidualMethod) -> Result<Self> {
        let mut counter = Self::new();
        counter.init_with(config)?;
        counter.feed(data)?;
        counter.finalize(method)?;
        Ok(counter)
    }
}

impl Default for RainflowCounter<HeapAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> fmt::Debug for RainflowCounter<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RainflowCounter")
            .field("state", &self.state)
            .field("last_error", &self.last_error)
            .field("session", &self.session)
            .finish()
    }
}

impl<A: Allocator> RainflowCounter<A> {
    /// Uninitialized counter taking its buffers from `allocator`.
    pub fn with_allocator(allocator: A) -> Self {
        RainflowCounter {
            allocator,
            state: State::Uninitialized,
            last_error: None,
            session: None,
        }
    }

    /// Initializes the counter with the default Woehler curve.
    ///
    /// `class_count` 0 disables classification: turning points are tracked
    /// but no cycles are counted. [`Flags::DEFAULT`] counts matrix and damage.
    ///
    /// # Errors
    ///
    /// * `InvalidState` if the counter is not uninitialized.
    /// * `InvalidArgument` for a class count above 512, a non-positive class
    ///   width with classes enabled, or a negative hysteresis.
    /// * `AllocationFailure` if residue or matrix storage is unavailable.
    pub fn init(
        &mut self,
        class_count: u32,
        class_width: f64,
        class_offset: f64,
        hysteresis: f64,
        flags: Flags,
    ) -> Result<()> {
        let config = CounterConfig {
            classes: ClassParams { count: class_count, width: class_width, offset: class_offset },
            hysteresis,
            flags,
            woehler: WoehlerCurve::default(),
        };
        self.init_with(&config)
    }

    /// Like [`init`](Self::init), with every parameter taken from `config`.
    pub fn init_with(&mut self, config: &CounterConfig) -> Result<()> {
        self.require(&[State::Uninitialized], "init")?;
        match self.open_session(config) {
            Ok(session) => {
                debug!(
                    class_count = config.classes.count,
                    class_width = config.classes.width,
                    class_offset = config.classes.offset,
                    hysteresis = config.hysteresis,
                    residue_capacity = session.residue.capacity(),
                    residue_inline = session.residue.is_inline(),
                    "rainflow counter initialized"
                );
                self.session = Some(session);
                self.state = State::Ready;
                self.last_error = None;
                Ok(())
            }
            Err(err) => Err(self.raise(err)),
        }
    }

    fn open_session(&self, config: &CounterConfig) -> Result<Session> {
        config.validate()?;
        let flags = config.flags.resolve();
        let class_count = config.classes.count;

        let capacity = residue_capacity(class_count);
        let residue = if capacity <= RESIDUE_INLINE_CAPACITY {
            Residue::inline()
        } else {
            let buffer = self
                .allocator
                .acquire_residue(capacity)
                .ok_or(Error::AllocationFailure { aim: MemoryAim::Residue, len: capacity })?;
            Residue::owned(buffer, capacity)
        };

        let mut matrix = None;
        if class_count > 0 && flags.contains(Flags::COUNT_MATRIX) {
            let cells = (class_count as usize).pow(2);
            match self.allocator.acquire_matrix(cells) {
                Some(mut buffer) if buffer.len() == cells => {
                    buffer.fill(0);
                    matrix = Some(RainflowMatrix::from_buffer(class_count, buffer));
                }
                rejected => {
                    if let Some(buffer) = rejected {
                        self.allocator.release_matrix(buffer);
                    }
                    if let Some(buffer) = residue.into_buffer() {
                        self.allocator.release_residue(buffer);
                    }
                    return Err(Error::AllocationFailure { aim: MemoryAim::Matrix, len: cells });
                }
            }
        }

        let mut acc = DamageAccumulator::new(flags, matrix);
        acc.set_curve(config.woehler);
        Ok(Session {
            config: CounterConfig { flags, ..*config },
            filter: FilterState::default(),
            residue,
            acc,
        })
    }

    /// Replaces the Woehler curve used for pseudo damage.
    ///
    /// Only allowed right after `init`, before any sample was fed.
    pub fn set_woehler(&mut self, sd: f64, nd: f64, k: f64) -> Result<()> {
        self.require(&[State::Ready], "set_woehler")?;
        if self.position() > 0 {
            return Err(self.raise(Error::InvalidState { operation: "set_woehler", state: self.state }));
        }
        match WoehlerCurve::new(sd, nd, k) {
            Ok(curve) => {
                if let Some(session) = self.session.as_mut() {
                    session.config.woehler = curve;
                    session.acc.set_curve(curve);
                }
                Ok(())
            }
            Err(err) => Err(self.raise(err)),
        }
    }

    /// Feeds consecutive samples. Chunks are concatenated across calls.
    ///
    /// # Errors
    ///
    /// `InvalidState` outside `Ready`/`Accumulating`; `ResidueOverflow` if
    /// the residue bound is exceeded, in which case samples before the
    /// failing one stay counted.
    pub fn feed(&mut self, data: &[f64]) -> Result<()> {
        self.require(&[State::Ready, State::Accumulating], "feed")?;
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(self.raise(Error::InvalidState { operation: "feed", state: self.state })),
        };
        let result = session.feed(data);
        let accumulating = session.has_turning_points();
        match result {
            Ok(()) => {
                if accumulating {
                    self.state = State::Accumulating;
                }
                Ok(())
            }
            Err(err) => Err(self.raise(err)),
        }
    }

    /// Finishes counting: the interim turning point is added to the residue
    /// and checked once more for a closed cycle. Afterwards no samples are
    /// accepted. Without classes the residue is cleared.
    pub fn finalize(&mut self, method: ResidualMethod) -> Result<()> {
        self.require(&[State::Ready, State::Accumulating], "finalize")?;
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(self.raise(Error::InvalidState { operation: "finalize", state: self.state })),
        };
        self.state = State::Finalizing;
        let result = match method {
            ResidualMethod::None | ResidualMethod::Ignore => session.finalize_ignore(),
        };
        match result {
            Ok(()) => {
                debug!(
                    method = %method,
                    cycles = session.acc.cycles(),
                    residue = session.residue.len(),
                    pseudo_damage = session.acc.pseudo_damage(),
                    "rainflow counting finished"
                );
                self.state = State::Finished;
                Ok(())
            }
            Err(err) => Err(self.raise(err)),
        }
    }

    /// [`finalize`](Self::finalize) with the residual method given as a
    /// numeric code.
    pub fn finalize_code(&mut self, code: u32) -> Result<()> {
        self.require(&[State::Ready, State::Accumulating], "finalize")?;
        match ResidualMethod::from_code(code) {
            Ok(method) => self.finalize(method),
            Err(err) => Err(self.raise(err)),
        }
    }

    /// Gives all buffers back to the allocator and returns to
    /// `Uninitialized`.
    pub fn release(&mut self) -> Result<()> {
        if self.state == State::Uninitialized {
            return Err(self.raise(Error::InvalidState { operation: "release", state: self.state }));
        }
        if let Some(session) = self.session.take() {
            session.release(&self.allocator);
        }
        debug!(from = ?self.state, "rainflow counter released");
        self.state = State::Uninitialized;
        self.last_error = None;
        Ok(())
    }

    fn require(&mut self, allowed: &[State], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.raise(Error::InvalidState { operation, state: self.state }))
        }
    }

    /// Records `err`; fatal errors move the counter into `State::Error`.
    fn raise(&mut self, err: Error) -> Error {
        warn!(error = %err, state = ?self.state, "rainflow counter operation failed");
        if err.is_fatal() {
            self.state = State::Error;
        }
        self.last_error = Some(err.clone());
        err
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn config(&self) -> Option<&CounterConfig> {
        self.session.as_ref().map(|s| &s.config)
    }

    /// Confirmed, unresolved turning points in detection order.
    pub fn residue(&self) -> &[Sample] {
        self.session.as_ref().map_or(&[], |s| s.residue.as_slice())
    }

    /// The tentative trailing turning point, until `finalize`.
    pub fn interim(&self) -> Option<&Sample> {
        self.session.as_ref().and_then(|s| s.residue.interim())
    }

    pub fn residue_capacity(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.residue.capacity())
    }

    pub fn is_residue_inline(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.residue.is_inline())
    }

    pub fn matrix(&self) -> Option<&RainflowMatrix> {
        self.session.as_ref().and_then(|s| s.acc.matrix())
    }

    pub fn pseudo_damage(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.acc.pseudo_damage())
    }

    /// Matrix weight of one full cycle.
    pub fn full_increment(&self) -> Counts {
        self.session.as_ref().map_or(FULL_CYCLE_INCREMENT, |s| s.acc.full_increment())
    }

    /// Closed cycles found, including those within one class.
    pub fn cycles(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.acc.cycles())
    }

    /// Number of samples fed so far.
    pub fn position(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.filter.pos)
    }
}

impl<A: Allocator> Drop for RainflowCounter<A> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.release(&self.allocator);
        }
    }
}
