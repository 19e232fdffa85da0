//! A module for the main application logic of the rainflow counting tool
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::config::{load_config, JobConfig};
use crate::counter::RainflowCounter;
use crate::report::Report;
use crate::series::{feed_file, value_range, SeriesReader};

/// Runs the job described in `config_path` and returns its report.
///
/// The report is written as JSON to `output` when given.
pub fn run(config_path: &Path, output: Option<&Path>) -> anyhow::Result<Report> {
    info!(config = %config_path.display(), "running rainflow job");
    let conf = load_config(config_path)?;
    conf.validate()
        .with_context(|| format!("invalid job file {}", config_path.display()))?;

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let report = count(&conf, base)?;
    info!(
        cycles = report.cycles,
        pseudo_damage = report.pseudo_damage,
        residue = report.residue.len(),
        "job finished"
    );

    if let Some(path) = output {
        report.write_json(path)?;
        info!(report = %path.display(), "report written");
    }
    Ok(report)
}

/// Counts the series of `conf`, relative paths resolved against `base`.
pub fn count(conf: &JobConfig, base: &Path) -> anyhow::Result<Report> {
    let series_path = conf.series.resolve(base);
    let range = if conf.classes.auto {
        let range = value_range(SeriesReader::open(&series_path, &conf.series.parse)?)?;
        info!(?range, "class range derived from series");
        Some(range.context("automatic classes need at least one sample")?)
    } else {
        None
    };
    let counter_config = conf.counter_config(range)?;

    let mut counter = RainflowCounter::new();
    counter.init_with(&counter_config)?;
    feed_file(&mut counter, &series_path, &conf.series.parse)?;
    counter.finalize(conf.residual)?;
    Ok(Report::from_counter(conf.name.clone(), &counter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::State;
    use approx::assert_relative_eq;

    #[test]
    fn test_run_yaml_job() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");
        let report = run(Path::new("tests/config.yaml"), Some(&output)).unwrap();

        assert_eq!(report.name.as_deref(), Some("small example"));
        assert_eq!(report.state, State::Finished);
        assert_eq!(report.samples, 19);
        assert_eq!(report.cycles, 7);
        assert_relative_eq!(report.matrix_cycles(), 7.0);
        assert_relative_eq!(report.pseudo_damage, 2.135e-20, max_relative = 1e-9);
        let residue: Vec<f64> = report.residue.iter().map(|s| s.value).collect();
        assert_eq!(residue, vec![2.0, 6.0, 1.0, 5.0, 2.0]);
        assert!(output.exists());
    }

    #[test]
    fn test_run_toml_job_with_automatic_classes() {
        let report = run(Path::new("tests/config.toml"), None).unwrap();
        assert_eq!(report.classes.count, 4);
        // Range 1..6 over four classes
        assert_relative_eq!(report.classes.width, 1.67);
        assert!(report.matrix.is_empty());
        assert!(report.pseudo_damage > 0.0);
    }

    #[test]
    fn test_missing_series_fails() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.yaml");
        std::fs::write(&job, "classes:\n  count: 4\n  width: 1.0\nseries:\n  path: missing.csv\n").unwrap();
        assert!(run(&job, None).is_err());
    }
}
