//! Counting many independent series in parallel.
//!
//! Every series gets its own counter; nothing is shared between them.
use rayon::prelude::*;
use tracing::debug;

use crate::counter::{CounterConfig, RainflowCounter, ResidualMethod};
use crate::error::Result;

/// Counts each series with `config` and finalizes it with `method`.
///
/// Results are returned in input order. A failure in one series does not
/// affect the others.
pub fn count_all<S>(config: &CounterConfig, series: &[S], method: ResidualMethod) -> Vec<Result<RainflowCounter>>
where
    S: AsRef<[f64]> + Sync,
{
    debug!(series = series.len(), "batch counting");
    series
        .par_iter()
        .map(|data| RainflowCounter::from_series(config, data.as_ref(), method))
        .collect()
}

/// Sum of the pseudo damage of all successfully counted series.
pub fn total_damage(results: &[Result<RainflowCounter>]) -> f64 {
    results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|counter| counter.pseudo_damage())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassParams;
    use crate::counter::State;
    use approx::assert_relative_eq;

    fn config() -> CounterConfig {
        CounterConfig::new(ClassParams::new(4, 1.0, 0.5).unwrap(), 0.99)
    }

    #[test]
    fn test_count_all_matches_sequential() {
        let series = vec![
            vec![1.0, 3.0, 2.0, 4.0],
            vec![4.0, 2.0, 3.0, 1.0],
            vec![],
            vec![2.0, 3.0, 1.0, 4.0, 1.0, 3.0, 2.0, 3.0],
        ];
        let results = count_all(&config(), &series, ResidualMethod::None);
        assert_eq!(results.len(), series.len());

        for (data, result) in series.iter().zip(&results) {
            let counter = result.as_ref().unwrap();
            let single = RainflowCounter::from_series(&config(), data, ResidualMethod::None).unwrap();
            assert_eq!(counter.state(), State::Finished);
            assert_eq!(counter.matrix(), single.matrix());
            assert_eq!(counter.residue(), single.residue());
        }
        assert_eq!(results[0].as_ref().unwrap().matrix().unwrap().get(2, 1), 2);
        assert_eq!(results[1].as_ref().unwrap().matrix().unwrap().get(1, 2), 2);
        assert_eq!(results[2].as_ref().unwrap().cycles(), 0);
    }

    #[test]
    fn test_total_damage() {
        let series: Vec<&[f64]> = vec![&[1.0, 3.0, 2.0, 4.0], &[4.0, 2.0, 3.0, 1.0]];
        let results = count_all(&config(), &series, ResidualMethod::Ignore);
        assert_relative_eq!(total_damage(&results), 2.0 * 3.125e-24, max_relative = 1e-9);
    }

    #[test]
    fn test_invalid_config_fails_every_series() {
        let mut bad = config();
        bad.hysteresis = -1.0;
        let results = count_all(&bad, &[vec![1.0, 2.0]], ResidualMethod::None);
        assert!(results[0].is_err());
    }
}
