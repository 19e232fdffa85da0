// src/lib.rs
//! Streaming rainflow cycle counting (ASTM E1049, four-point method) with
//! hysteresis and peak-valley filtering, rainflow matrix and pseudo damage.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub mod alloc;
#[cfg(feature = "cli")]
pub mod app_logic;
pub mod batch;
pub mod class;
pub mod config;
pub mod counter;
pub mod cycle;
pub mod damage;
pub mod error;
pub mod filter;
pub mod matrix;
pub mod report;
pub mod residue;
pub mod sample;
pub mod series;

pub use alloc::{Allocator, HeapAllocator, MemoryAim};
pub use class::{ClassParams, CLASS_COUNT_MAX};
pub use counter::{CounterConfig, RainflowCounter, ResidualMethod, State};
pub use damage::{Flags, WoehlerCurve};
pub use error::{Error, Result};
pub use matrix::{Counts, RainflowMatrix, FULL_CYCLE_INCREMENT, HALF_CYCLE_INCREMENT};
pub use sample::Sample;

/// Counts `data` in one call and returns
/// `[pseudo_damage, residue_len, residue values..., matrix...]`, the matrix
/// normalized to full cycles in column-major order.
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn run_rainflow(
    data: &[f64],
    class_count: u32,
    class_width: f64,
    class_offset: f64,
    hysteresis: f64,
    residual_method: u32,
) -> std::result::Result<Vec<f64>, JsValue> {
    let counter = count(data, class_count, class_width, class_offset, hysteresis, residual_method)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let residue = counter.residue();
    let mut out = Vec::with_capacity(2 + residue.len() + (class_count as usize).pow(2));
    out.push(counter.pseudo_damage());
    out.push(residue.len() as f64);
    out.extend(residue.iter().map(|s| s.value));
    if let Some(matrix) = counter.matrix() {
        out.extend(matrix.to_column_major(counter.full_increment()));
    }
    Ok(out)
}

#[cfg(feature = "wasm")]
fn count(
    data: &[f64],
    class_count: u32,
    class_width: f64,
    class_offset: f64,
    hysteresis: f64,
    residual_method: u32,
) -> Result<RainflowCounter> {
    let mut counter = RainflowCounter::new();
    counter.init(class_count, class_width, class_offset, hysteresis, Flags::DEFAULT)?;
    counter.feed(data)?;
    counter.finalize_code(residual_method)?;
    Ok(counter)
}
