//! Class discretization of sample values.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound for the number of classes.
pub const CLASS_COUNT_MAX: u32 = 512;

/// Equal-width classes starting at `offset`.
///
/// A `count` of 0 disables classification; the counter then only tracks
/// turning points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassParams {
    pub count: u32,
    pub width: f64,
    pub offset: f64,
}

impl ClassParams {
    /// Validated class parameters.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `count` exceeds [`CLASS_COUNT_MAX`] or, with
    /// classification enabled, `width` is not a positive finite number.
    pub fn new(count: u32, width: f64, offset: f64) -> Result<Self> {
        let params = ClassParams { count, width, offset };
        params.validate()?;
        Ok(params)
    }

    /// Derives width and offset so that `[min, max]` is covered by `count`
    /// classes, the extremes sitting near the middle of the outer classes.
    ///
    /// Width is rounded up to two decimals, offset down to three. With
    /// `count` 0 the result is width 1 and offset 0.
    ///
    /// ```
    /// use rainflow::ClassParams;
    ///
    /// let params = ClassParams::from_range(4.0, 1.0, 4).unwrap();
    /// assert_eq!(params.width, 1.0);
    /// assert_eq!(params.offset, 0.5);
    /// ```
    pub fn from_range(max: f64, min: f64, count: u32) -> Result<Self> {
        if !(max >= min) {
            return Err(Error::invalid_argument(format!(
                "range maximum {} is below minimum {}",
                max, min
            )));
        }
        if count < 1 {
            return Ok(ClassParams { count: 0, width: 1.0, offset: 0.0 });
        }
        // A single class has no spacing to derive; span the range instead.
        let spacing = if count > 1 { (max - min) / f64::from(count - 1) } else { max - min };
        let mut width = (spacing * 100.0).ceil() / 100.0;
        if width <= 0.0 {
            width = 1.0;
        }
        let offset = ((min - width / 2.0) * 1000.0).floor() / 1000.0;
        Self::new(count, width, offset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.count > CLASS_COUNT_MAX {
            return Err(Error::invalid_argument(format!(
                "class_count must not exceed {}, got {}",
                CLASS_COUNT_MAX, self.count
            )));
        }
        if self.count > 0 && !(self.width > 0.0 && self.width.is_finite()) {
            return Err(Error::invalid_argument(format!(
                "class_width must be greater than 0.0, got {}",
                self.width
            )));
        }
        if !self.offset.is_finite() {
            return Err(Error::invalid_argument(format!(
                "class_offset must be finite, got {}",
                self.offset
            )));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.count > 0
    }

    /// Raw class index, `floor((value - offset) / width)`. May lie outside
    /// `[0, count)`.
    pub fn quantize(&self, value: f64) -> i64 {
        ((value - self.offset) / self.width).floor() as i64
    }

    /// Class index clamped into `[0, count - 1]`; always 0 when
    /// classification is disabled.
    pub fn class_of(&self, value: f64) -> u32 {
        if !self.is_enabled() {
            return 0;
        }
        let last = i64::from(self.count - 1);
        self.quantize(value).clamp(0, last) as u32
    }

    /// Midpoint of class `class`.
    pub fn class_mean(&self, class: u32) -> f64 {
        self.width * (0.5 + f64::from(class)) + self.offset
    }

    /// Upper bound of class `class`.
    pub fn class_upper(&self, class: u32) -> f64 {
        self.width * (1.0 + f64::from(class)) + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantize_and_clamp() {
        let params = ClassParams::new(4, 1.0, 0.5).unwrap();
        assert_eq!(params.class_of(1.0), 0);
        assert_eq!(params.class_of(2.0), 1);
        assert_eq!(params.class_of(3.0), 2);
        assert_eq!(params.class_of(4.0), 3);
        // Exactly on the upper boundary of the last class
        assert_eq!(params.quantize(4.5), 4);
        assert_eq!(params.class_of(4.5), 3);
        assert_eq!(params.class_of(100.0), 3);
        assert_eq!(params.quantize(0.0), -1);
        assert_eq!(params.class_of(0.0), 0);
    }

    #[test]
    fn test_disabled_classes() {
        let params = ClassParams::new(0, 0.0, 0.0).unwrap();
        assert!(!params.is_enabled());
        assert_eq!(params.class_of(42.0), 0);
    }

    #[test]
    fn test_validation() {
        assert!(ClassParams::new(512, 1.0, 0.0).is_ok());
        assert!(matches!(ClassParams::new(513, 1.0, 0.0), Err(Error::InvalidArgument(_))));
        assert!(ClassParams::new(4, 0.0, 0.0).is_err());
        assert!(ClassParams::new(4, -1.0, 0.0).is_err());
        assert!(ClassParams::new(4, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_from_range() {
        let params = ClassParams::from_range(6.0, 1.0, 6).unwrap();
        assert_relative_eq!(params.width, 1.0);
        assert_relative_eq!(params.offset, 0.5);

        let params = ClassParams::from_range(1.0, -1.0, 100).unwrap();
        assert_relative_eq!(params.width, 0.03);
        assert_relative_eq!(params.offset, -1.015, epsilon = 1e-12);
        assert!(params.class_upper(99) > 1.0);

        let params = ClassParams::from_range(1.0, -1.0, 0).unwrap();
        assert_eq!(params.count, 0);
        assert_eq!(params.width, 1.0);

        assert!(ClassParams::from_range(0.0, 1.0, 4).is_err());
    }

    #[test]
    fn test_class_bounds() {
        let params = ClassParams::new(4, 1.0, 0.5).unwrap();
        assert_relative_eq!(params.class_mean(0), 1.0);
        assert_relative_eq!(params.class_upper(0), 1.5);
        assert_relative_eq!(params.class_mean(3), 4.0);
    }
}
