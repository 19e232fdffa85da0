//! Pseudo damage and rainflow matrix accumulation for closed cycles.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::class::ClassParams;
use crate::error::{Error, Result};
use crate::matrix::{Counts, RainflowMatrix, FULL_CYCLE_INCREMENT};
use crate::sample::Sample;

/// Selects what is counted for every closed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    /// No explicit selection; resolves to [`Flags::COUNT_ALL`].
    pub const DEFAULT: Flags = Flags(0);
    pub const COUNT_MATRIX: Flags = Flags(1);
    pub const COUNT_DAMAGE: Flags = Flags(1 << 1);
    pub const COUNT_ALL: Flags = Flags(Self::COUNT_MATRIX.0 | Self::COUNT_DAMAGE.0);

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The default (empty) selection counts everything.
    pub fn resolve(self) -> Flags {
        if self == Self::DEFAULT {
            Self::COUNT_ALL
        } else {
            self
        }
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Pseudo Woehler (S-N) curve: `N = ND * (Sa / SD)^k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WoehlerCurve {
    /// Reference amplitude.
    pub sd: f64,
    /// Cycles to failure at the reference amplitude.
    pub nd: f64,
    /// Slope, stored negative.
    pub k: f64,
}

impl Default for WoehlerCurve {
    fn default() -> Self {
        WoehlerCurve { sd: 1e3, nd: 1e7, k: -5.0 }
    }
}

impl WoehlerCurve {
    /// Curve through (`sd`, `nd`) with slope `-|k|`.
    pub fn new(sd: f64, nd: f64, k: f64) -> Result<Self> {
        let curve = WoehlerCurve { sd, nd, k: -k.abs() };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sd > 0.0 && self.sd.is_finite()) {
            return Err(Error::invalid_argument(format!("sd must be greater than 0.0, got {}", self.sd)));
        }
        if !(self.nd > 0.0 && self.nd.is_finite()) {
            return Err(Error::invalid_argument(format!("nd must be greater than 0.0, got {}", self.nd)));
        }
        if !self.k.is_finite() {
            return Err(Error::invalid_argument(format!("k must be finite, got {}", self.k)));
        }
        Ok(())
    }

    /// Damage of one full cycle with amplitude `sa`.
    ///
    /// `D = 1 / ND * (Sa / SD)^|k|`, evaluated in log space.
    pub fn damage(&self, sa: f64) -> f64 {
        debug_assert!(sa >= 0.0);
        (self.k.abs() * (sa.ln() - self.sd.ln()) - self.nd.ln()).exp()
    }
}

/// Amplitude of a cycle between two classes.
pub fn class_amplitude(classes: &ClassParams, from: u32, to: u32) -> f64 {
    classes.width * f64::from(from.abs_diff(to)) / 2.0
}

/// Running totals of the counted cycles.
#[derive(Debug)]
pub struct DamageAccumulator {
    flags: Flags,
    curve: WoehlerCurve,
    matrix: Option<RainflowMatrix>,
    pseudo_damage: f64,
    full_inc: Counts,
    curr_inc: Counts,
    cycles: u64,
}

impl DamageAccumulator {
    pub(crate) fn new(flags: Flags, matrix: Option<RainflowMatrix>) -> Self {
        DamageAccumulator {
            flags: flags.resolve(),
            curve: WoehlerCurve::default(),
            matrix,
            pseudo_damage: 0.0,
            full_inc: FULL_CYCLE_INCREMENT,
            curr_inc: FULL_CYCLE_INCREMENT,
            cycles: 0,
        }
    }

    pub(crate) fn set_curve(&mut self, curve: WoehlerCurve) {
        self.curve = curve;
    }

    pub(crate) fn take_matrix(&mut self) -> Option<RainflowMatrix> {
        self.matrix.take()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn curve(&self) -> &WoehlerCurve {
        &self.curve
    }

    pub fn matrix(&self) -> Option<&RainflowMatrix> {
        self.matrix.as_ref()
    }

    pub fn pseudo_damage(&self) -> f64 {
        self.pseudo_damage
    }

    pub fn full_increment(&self) -> Counts {
        self.full_inc
    }

    pub fn current_increment(&self) -> Counts {
        self.curr_inc
    }

    /// Closed cycles seen so far, including zero-range ones.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Counts the closed cycle `from` -> `to`.
    ///
    /// Cycles within a single class contribute nothing.
    pub(crate) fn count(&mut self, classes: &ClassParams, from: &Sample, to: &Sample) {
        self.cycles += 1;
        let class_from = classes.class_of(from.value);
        let class_to = classes.class_of(to.value);
        if class_from == class_to {
            return;
        }

        if self.flags.contains(Flags::COUNT_DAMAGE) {
            let amplitude = class_amplitude(classes, class_from, class_to);
            let damage = self.curve.damage(amplitude);
            self.pseudo_damage += damage * self.curr_inc as f64 / self.full_inc as f64;
        }
        if self.flags.contains(Flags::COUNT_MATRIX) {
            if let Some(matrix) = self.matrix.as_mut() {
                matrix.add(class_from, class_to, self.curr_inc);
            }
        }
        trace!(from = from.value, to = to.value, class_from, class_to, "closed cycle");
    }
}
