//! Hysteresis and peak-valley filtering of the raw sample stream.

use tracing::trace;

use crate::error::Result;
use crate::residue::Residue;
use crate::sample::Sample;

/// Direction of the slope leading into the interim turning point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slope {
    #[default]
    Unset,
    Rising,
    Falling,
}

impl Slope {
    fn of(delta: f64) -> Self {
        if delta < 0.0 {
            Slope::Falling
        } else {
            Slope::Rising
        }
    }
}

/// Turning-point detector.
///
/// Until the first turning point is known the filter tracks the running
/// minimum and maximum. Afterwards every sample is compared with the interim
/// point held by the residue.
#[derive(Debug, Clone, Default)]
pub struct TurningPointFilter {
    slope: Slope,
    /// Running `[minimum, maximum]` before the first turning point.
    extrema: Option<[Sample; 2]>,
}

impl TurningPointFilter {
    pub fn slope(&self) -> Slope {
        self.slope
    }

    /// Feeds one sample. Returns the turning point confirmed by it, if any.
    ///
    /// # Errors
    ///
    /// `ResidueOverflow` if the confirmed point does not fit into `residue`.
    pub fn process(
        &mut self,
        residue: &mut Residue,
        pt: Sample,
        hysteresis: f64,
    ) -> Result<Option<Sample>> {
        match residue.interim().copied() {
            None => self.search_first(residue, pt, hysteresis),
            Some(interim) => self.follow(residue, interim, pt, hysteresis),
        }
    }

    fn search_first(
        &mut self,
        residue: &mut Residue,
        pt: Sample,
        hysteresis: f64,
    ) -> Result<Option<Sample>> {
        let [min, max] = match &mut self.extrema {
            Some(extrema) => extrema,
            None => {
                self.extrema = Some([pt, pt]);
                return Ok(None);
            }
        };

        let slope = if pt.value < min.value {
            *min = pt;
            Slope::Falling
        } else if pt.value > max.value {
            *max = pt;
            Slope::Rising
        } else {
            return Ok(None);
        };

        if max.value - min.value <= hysteresis {
            return Ok(None);
        }

        // The extreme opposite to the new one is the first turning point,
        // the sample itself becomes interim.
        let first = match slope {
            Slope::Falling => *max,
            _ => *min,
        };
        residue.push(first)?;
        residue.set_interim(pt);
        self.slope = slope;
        self.extrema = None;
        trace!(value = first.value, pos = first.pos, "first turning point");
        Ok(Some(first))
    }

    fn follow(
        &mut self,
        residue: &mut Residue,
        interim: Sample,
        pt: Sample,
        hysteresis: f64,
    ) -> Result<Option<Sample>> {
        let delta = pt.value - interim.value;
        let slope = Slope::of(delta);

        if slope == self.slope {
            // Slope continues, move the interim point. Plateaus keep their
            // first position.
            if interim.value != pt.value {
                residue.set_interim(pt);
            }
            return Ok(None);
        }
        if delta.abs() <= hysteresis {
            return Ok(None);
        }

        residue.push(interim)?;
        residue.set_interim(pt);
        self.slope = slope;
        trace!(value = interim.value, pos = interim.pos, "turning point");
        Ok(Some(interim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(data: &[f64], hysteresis: f64) -> (Residue, Vec<Sample>) {
        let mut filter = TurningPointFilter::default();
        let mut residue = Residue::owned(Vec::new(), 64);
        let mut confirmed = Vec::new();
        for (i, &value) in data.iter().enumerate() {
            let pt = Sample::new(value, 0, i as u64 + 1);
            if let Some(tp) = filter.process(&mut residue, pt, hysteresis).unwrap() {
                confirmed.push(tp);
            }
        }
        (residue, confirmed)
    }

    #[test]
    fn test_no_turning_point_inside_hysteresis() {
        let (residue, confirmed) = run(&[1.0, 1.5, 0.8, 1.2, 1.0], 1.0);
        assert!(confirmed.is_empty());
        assert!(residue.is_empty());
        assert!(residue.interim().is_none());
    }

    #[test]
    fn test_first_turning_point_rising() {
        let (residue, confirmed) = run(&[1.0, 3.0], 0.5);
        assert_eq!(confirmed, vec![Sample::new(1.0, 0, 1)]);
        assert_eq!(residue.interim(), Some(&Sample::new(3.0, 0, 2)));
    }

    #[test]
    fn test_first_turning_point_falling() {
        let (residue, confirmed) = run(&[2.0, 2.4, 0.0], 1.0);
        assert_eq!(confirmed, vec![Sample::new(2.4, 0, 2)]);
        assert_eq!(residue.interim().map(|s| s.value), Some(0.0));
    }

    #[test]
    fn test_peak_valley_and_plateau() {
        // 3 -> 4 continues the rising slope, the plateau at 4 keeps pos 3,
        // 3.5 is inside the band, 1 reverses.
        let (residue, confirmed) = run(&[1.0, 3.0, 4.0, 4.0, 3.5, 1.0], 1.0);
        assert_eq!(confirmed.len(), 2);
        assert_eq!(confirmed[1], Sample::new(4.0, 0, 3));
        assert_eq!(residue.interim().map(|s| s.pos), Some(6));
    }

    #[test]
    fn test_slope_reversal_needs_more_than_hysteresis() {
        let (_, confirmed) = run(&[0.0, 2.0, 1.0], 1.0);
        assert_eq!(confirmed.len(), 1);
        let (_, confirmed) = run(&[0.0, 2.0, 0.9], 1.0);
        assert_eq!(confirmed.len(), 2);
    }
}
