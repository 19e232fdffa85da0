//! A module for loading and validating rainflow counting jobs.
//!
//! A job names the input series, the class layout, the hysteresis and the
//! Woehler curve. It is read from YAML, or from TOML when the file ends in
//! `.toml`.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::class::{ClassParams, CLASS_COUNT_MAX};
use crate::counter::{CounterConfig, ResidualMethod};
use crate::damage::{Flags, WoehlerCurve};
use crate::series::ParseConfig;

/// Represents an error that can occur during validation of configuration data.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a given message.
    pub fn new(message: &str) -> ValidationError {
        ValidationError {
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A complete counting job.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    /// Label copied into the report.
    #[serde(default)]
    pub name: Option<String>,
    pub classes: ClassConfig,
    /// Hysteresis threshold. Defaults to the class width.
    #[serde(default)]
    pub hysteresis: Option<f64>,
    /// Residue treatment at the end of the series.
    #[serde(default)]
    pub residual: ResidualMethod,
    /// What to count per closed cycle.
    #[serde(default)]
    pub count: CountConfig,
    /// Pseudo Woehler curve for damage.
    #[serde(default)]
    pub woehler: WoehlerCurve,
    pub series: SeriesConfig,
}

impl JobConfig {
    /// Validates the entire job.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.classes.validate()?;
        if let Some(h) = self.hysteresis {
            if !(h >= 0.0 && h.is_finite()) {
                return Err(ValidationError::new(&format!("hysteresis must be 0.0 or greater, got {}", h)));
            }
        }
        self.count.validate()?;
        WoehlerCurve::new(self.woehler.sd, self.woehler.nd, self.woehler.k)
            .map_err(|e| ValidationError::new(&format!("woehler: {}", e)))?;
        self.series.validate()?;
        Ok(())
    }

    /// Counter parameters for this job.
    ///
    /// `range` is the `(max, min)` of the series and is only needed for
    /// automatic classes.
    pub fn counter_config(&self, range: Option<(f64, f64)>) -> anyhow::Result<CounterConfig> {
        let classes = self.classes.params(range)?;
        let hysteresis = self.hysteresis.unwrap_or(classes.width);
        Ok(CounterConfig {
            classes,
            hysteresis,
            flags: self.count.flags(),
            woehler: WoehlerCurve::new(self.woehler.sd, self.woehler.nd, self.woehler.k)?,
        })
    }
}

/// Class layout, either explicit or derived from the data range.
///
/// With `auto: true` the series is scanned once for its extremes and the
/// width and offset are computed so that both extremes fall inside the
/// outer classes.
#[derive(Debug, Deserialize)]
pub struct ClassConfig {
    #[serde(default)]
    pub auto: bool,
    /// Number of classes; 0 only tracks turning points.
    pub count: u32,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
}

impl ClassConfig {
    /// Validates the `ClassConfig`.
    ///
    /// Explicit layouts need a width when classes are enabled; automatic
    /// layouts must not carry one.
    ///
    /// # Examples
    ///
    /// ```
    /// use rainflow::config::ClassConfig;
    ///
    /// let explicit = ClassConfig { auto: false, count: 4, width: Some(1.0), offset: Some(0.5) };
    /// assert!(explicit.validate().is_ok());
    ///
    /// let missing_width = ClassConfig { auto: false, count: 4, width: None, offset: None };
    /// assert!(missing_width.validate().is_err());
    ///
    /// let auto = ClassConfig { auto: true, count: 100, width: None, offset: None };
    /// assert!(auto.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.count > CLASS_COUNT_MAX {
            return Err(ValidationError::new(&format!(
                "classes.count must not exceed {}, got {}",
                CLASS_COUNT_MAX, self.count
            )));
        }
        if self.auto {
            if self.width.is_some() || self.offset.is_some() {
                return Err(ValidationError::new("classes.width and classes.offset must be omitted when classes.auto is set"));
            }
            return Ok(());
        }
        if self.count > 0 {
            match self.width {
                Some(w) if w > 0.0 => (),
                _ => return Err(ValidationError::new("classes.width must be greater than 0.0")),
            }
        }
        Ok(())
    }

    pub fn params(&self, range: Option<(f64, f64)>) -> anyhow::Result<ClassParams> {
        if self.auto {
            let (max, min) = range.context("automatic classes need the data range")?;
            return Ok(ClassParams::from_range(max, min, self.count)?);
        }
        Ok(ClassParams::new(
            self.count,
            self.width.unwrap_or(1.0),
            self.offset.unwrap_or(0.0),
        )?)
    }
}

/// Counting selection per closed cycle.
#[derive(Debug, Deserialize)]
pub struct CountConfig {
    #[serde(default = "enabled")]
    pub matrix: bool,
    #[serde(default = "enabled")]
    pub damage: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CountConfig {
    fn default() -> Self {
        CountConfig { matrix: true, damage: true }
    }
}

impl CountConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.matrix && !self.damage {
            return Err(ValidationError::new("count must enable matrix, damage, or both"));
        }
        Ok(())
    }

    pub fn flags(&self) -> Flags {
        let mut flags = Flags::DEFAULT;
        if self.matrix {
            flags = flags | Flags::COUNT_MATRIX;
        }
        if self.damage {
            flags = flags | Flags::COUNT_DAMAGE;
        }
        flags
    }
}

/// Location and layout of the sample file.
#[derive(Debug, Deserialize)]
pub struct SeriesConfig {
    /// Sample file, relative paths are taken from the job file's directory.
    pub path: String,
    #[serde(flatten)]
    pub parse: ParseConfig,
}

impl SeriesConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::new("series.path must not be empty"));
        }
        self.parse.validate()
    }

    /// Path of the sample file for a job file located in `base`.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        let path = Path::new(self.path.trim());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

/// Loads a job from a YAML or TOML file.
///
/// # Errors
///
/// This function will return an error if reading or parsing the file fails.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> anyhow::Result<JobConfig> {
    let path = config_path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read job file {}", path.display()))?;
    let is_toml = path.extension().map_or(false, |ext| ext == "toml");
    let config: JobConfig = if is_toml {
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let config_path = "tests/config.yaml";
        let config = load_config(config_path).expect("Failed to load config");
        assert!(config.validate().is_ok(), "Expected Ok(()) but got Err with {:?}", config.validate());
        assert_eq!(config.name.as_deref(), Some("small example"));
        assert_eq!(config.classes.count, 6);
        assert_eq!(config.residual, ResidualMethod::None);
        assert_eq!(config.series.parse.column, 1);
        assert_eq!(config.series.parse.header, 1);

        let counter_config = config.counter_config(None).unwrap();
        assert_eq!(counter_config.classes, ClassParams::new(6, 1.0, 0.5).unwrap());
        assert_eq!(counter_config.hysteresis, 0.99);
        assert_eq!(counter_config.flags, Flags::COUNT_ALL);
    }

    #[test]
    fn test_load_toml_config() {
        let config = load_config("tests/config.toml").expect("Failed to load config");
        assert!(config.validate().is_ok());
        assert!(config.classes.auto);
        assert_eq!(config.residual, ResidualMethod::Ignore);
        assert!(!config.count.matrix);

        // Automatic classes need the range, hysteresis defaults to the width
        assert!(config.counter_config(None).is_err());
        let counter_config = config.counter_config(Some((4.0, 1.0))).unwrap();
        assert_eq!(counter_config.classes.width, 1.0);
        assert_eq!(counter_config.hysteresis, 1.0);
        assert_eq!(counter_config.flags, Flags::COUNT_DAMAGE);
        assert_eq!(counter_config.woehler.k, -3.0);
    }

    #[test]
    fn test_job_validation() {
        let yaml = "
classes:
  count: 4
  width: 1.0
  offset: 0.5
hysteresis: -1.0
series:
  path: data.csv
";
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = "
classes:
  auto: true
  count: 4
  width: 2.0
series:
  path: data.csv
";
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = "
classes:
  count: 0
count:
  matrix: false
  damage: false
series:
  path: data.csv
";
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::new("count must enable matrix, damage, or both"))
        );
    }

    #[test]
    fn test_series_path_resolution() {
        let series = SeriesConfig { path: "series.csv".into(), parse: ParseConfig::default() };
        assert_eq!(series.resolve(Path::new("jobs")), PathBuf::from("jobs/series.csv"));
    }
}
