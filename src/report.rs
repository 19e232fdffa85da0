//! Serializable summary of a counting run.
use serde::Serialize;
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::alloc::Allocator;
use crate::class::ClassParams;
use crate::counter::{RainflowCounter, State};
use crate::error::{Error, Result};
use crate::matrix::Counts;
use crate::sample::Sample;

/// One non-empty cell of the rainflow matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    pub from: u32,
    pub to: u32,
    pub from_mean: f64,
    pub to_mean: f64,
    /// Full cycles, half cycles count as 0.5.
    pub cycles: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub name: Option<String>,
    pub state: State,
    pub classes: ClassParams,
    pub hysteresis: f64,
    pub samples: u64,
    pub cycles: u64,
    pub pseudo_damage: f64,
    pub full_increment: Counts,
    pub residue: Vec<Sample>,
    pub matrix: Vec<MatrixCell>,
}

impl Report {
    /// Snapshot of `counter`; fails if it was never initialized.
    pub fn from_counter<A: Allocator>(name: Option<String>, counter: &RainflowCounter<A>) -> Result<Report> {
        let config = match counter.config() {
            Some(config) => config,
            None => {
                return Err(Error::InvalidState {
                    operation: "report",
                    state: counter.state(),
                })
            }
        };
        let classes = config.classes;
        let unit = counter.full_increment().max(1) as f64;
        let matrix = counter
            .matrix()
            .map(|m| {
                m.nonzero()
                    .map(|(from, to, counts)| MatrixCell {
                        from,
                        to,
                        from_mean: classes.class_mean(from),
                        to_mean: classes.class_mean(to),
                        cycles: counts as f64 / unit,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Report {
            name,
            state: counter.state(),
            classes,
            hysteresis: config.hysteresis,
            samples: counter.position(),
            cycles: counter.cycles(),
            pseudo_damage: counter.pseudo_damage(),
            full_increment: counter.full_increment(),
            residue: counter.residue().to_vec(),
            matrix,
        })
    }

    /// Total of all matrix cells in full cycles.
    pub fn matrix_cycles(&self) -> f64 {
        self.matrix.iter().map(|cell| cell.cycles).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))
    }
}
