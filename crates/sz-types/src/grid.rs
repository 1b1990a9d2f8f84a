//! Radial grid construction and initial metric guesses.

use serde::{Deserialize, Serialize};

use crate::errors::SzResult;
use crate::field::{Field, FieldSample};
use crate::validation_error;

/// Upper bound on generated grid size; guards against growth factors so
/// close to one that the grid would never reach `r_max`.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Starting guess for the metric components at each radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedProfile {
    /// `a = 1 - 1/r`, `b = -1/(1 - 1/r)`: the closed-form vacuum solution.
    Schwarzschild,
    /// `a = r/r_max`, `b = -r_max/r`: a non-solution that gives the
    /// optimiser real work to do.
    Scaled,
}

impl Default for SeedProfile {
    fn default() -> Self {
        Self::Schwarzschild
    }
}

impl SeedProfile {
    pub fn seed(&self, r: f64, r_max: f64) -> (f64, f64) {
        match self {
            Self::Schwarzschild => {
                let a = 1.0 - 1.0 / r;
                (a, -1.0 / a)
            }
            Self::Scaled => (r / r_max, -r_max / r),
        }
    }
}

/// Geometry of the radial grid.
///
/// Spacing grows geometrically measured from an offset of 1.0:
/// `r_next = (r - 1) * growth_factor + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub r_min: f64,
    pub r_max: f64,
    pub growth_factor: f64,
    #[serde(default)]
    pub seed_profile: SeedProfile,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            r_min: 1.01,
            r_max: 100.0,
            growth_factor: 1.014,
            seed_profile: SeedProfile::Schwarzschild,
        }
    }
}

impl GridSpec {
    pub fn new(r_min: f64, r_max: f64, growth_factor: f64) -> Self {
        Self {
            r_min,
            r_max,
            growth_factor,
            seed_profile: SeedProfile::default(),
        }
    }

    pub fn with_seed_profile(mut self, profile: SeedProfile) -> Self {
        self.seed_profile = profile;
        self
    }

    pub fn validate(&self) -> SzResult<()> {
        if !(self.r_min > 1.0) {
            return Err(validation_error!(
                "r_min of {} must be greater than 1.0",
                self.r_min
            ));
        }
        if !(self.r_max > self.r_min) {
            return Err(validation_error!(
                "r_max of {} must be greater than r_min of {}",
                self.r_max,
                self.r_min
            ));
        }
        if !(self.growth_factor > 1.0) || !self.growth_factor.is_finite() {
            return Err(validation_error!(
                "growth_factor of {} must be a finite number greater than 1.0",
                self.growth_factor
            ));
        }
        Ok(())
    }

    /// The radii of the grid: every growth step below `r_max`, then exactly
    /// one final point at `r_max`.
    pub fn radii(&self) -> SzResult<Vec<f64>> {
        self.validate()?;

        let mut radii = Vec::new();
        let mut r = self.r_min;
        while r < self.r_max {
            if radii.len() >= MAX_GRID_POINTS {
                return Err(validation_error!(
                    "grid would exceed {} points; increase growth_factor",
                    MAX_GRID_POINTS
                ));
            }
            radii.push(r);
            r = (r - 1.0) * self.growth_factor + 1.0;
        }
        radii.push(self.r_max);

        Ok(radii)
    }

    /// Build the seeded value field.
    pub fn build(&self) -> SzResult<Field> {
        let samples = self
            .radii()?
            .into_iter()
            .map(|r| {
                let (a, b) = self.seed_profile.seed(r, self.r_max);
                FieldSample::new(r, a, b)
            })
            .collect();
        Ok(Field::new(samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SzError;

    #[test]
    fn default_grid_is_snapped_to_r_max() {
        let radii = GridSpec::default().radii().unwrap();

        assert_eq!(radii[0], 1.01);
        assert_eq!(*radii.last().unwrap(), 100.0);
        assert!(radii.len() > 600 && radii.len() < 700, "{}", radii.len());
        assert!(radii.windows(2).all(|w| w[0] < w[1]));
        // exactly one point at r_max
        assert_eq!(radii.iter().filter(|r| **r == 100.0).count(), 1);
    }

    #[test]
    fn spacing_grows_geometrically_from_offset_one() {
        let radii = GridSpec::new(1.5, 50.0, 2.0).radii().unwrap();
        assert_eq!(radii, vec![1.5, 2.0, 3.0, 5.0, 9.0, 17.0, 33.0, 50.0]);
    }

    #[test]
    fn schwarzschild_seed_values() {
        let field = GridSpec::new(2.0, 5.0, 2.0).build().unwrap();
        let first = field.get(0).unwrap();
        assert_eq!(first.r, 2.0);
        assert!((first.a - 0.5).abs() < 1e-15);
        assert!((first.b + 2.0).abs() < 1e-15);
    }

    #[test]
    fn scaled_seed_values() {
        let field = GridSpec::new(2.0, 5.0, 2.0)
            .with_seed_profile(SeedProfile::Scaled)
            .build()
            .unwrap();
        let last = field.get(field.len() - 1).unwrap();
        assert_eq!(last.r, 5.0);
        assert_eq!(last.a, 1.0);
        assert_eq!(last.b, -1.0);
    }

    #[test]
    fn invalid_specs_are_rejected() {
        for spec in [
            GridSpec::new(1.0, 100.0, 1.014),
            GridSpec::new(10.0, 5.0, 1.014),
            GridSpec::new(1.01, 100.0, 1.0),
            GridSpec::new(1.01, 100.0, f64::NAN),
        ] {
            assert!(matches!(spec.radii(), Err(SzError::Validation(_))), "{spec:?}");
        }
    }
}
