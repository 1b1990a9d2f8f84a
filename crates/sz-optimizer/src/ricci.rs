//! Closed-form Ricci tensor components for the static, spherically-symmetric
//! ansatz with metric components `A` (time) and `B` (radial).
//!
//! `R33` is `sin²θ · R22` and is not evaluated separately.

use serde::{Deserialize, Serialize};
use sz_types::{MetricPoint, NumericalError};

/// The three independent Ricci components at one radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RicciComponents {
    pub r00: f64,
    pub r11: f64,
    pub r22: f64,
}

impl RicciComponents {
    pub fn as_array(&self) -> [f64; 3] {
        [self.r00, self.r11, self.r22]
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.r00 * self.r00 + self.r11 * self.r11 + self.r22 * self.r22
    }
}

fn check_denominators(point: &MetricPoint) -> Result<(), NumericalError> {
    for (quantity, value) in [("A", point.a), ("B", point.b), ("r", point.r)] {
        if value == 0.0 {
            return Err(NumericalError::ZeroDenominator {
                quantity,
                r: point.r,
            });
        }
    }
    Ok(())
}

/// Evaluate `(R00, R11, R22)` at a point.
pub fn ricci_components(point: &MetricPoint) -> Result<RicciComponents, NumericalError> {
    check_denominators(point)?;

    let MetricPoint {
        r,
        a,
        b,
        da_dr,
        db_dr,
        d2a_dr2,
    } = *point;

    let r00 = (1.0 / (b * r)) * da_dr
        - (1.0 / (4.0 * a * b)) * da_dr * da_dr
        - (1.0 / (4.0 * b * b)) * da_dr * db_dr
        + (1.0 / (2.0 * b)) * d2a_dr2;

    let r11 = -(1.0 / (b * r)) * db_dr
        - (1.0 / (4.0 * a * b)) * da_dr * db_dr
        - (1.0 / (4.0 * a * a)) * da_dr * da_dr
        + (1.0 / (2.0 * a)) * d2a_dr2;

    let r22 = -1.0 - (1.0 / b) - (r / (2.0 * a * b)) * da_dr + (r / (2.0 * b * b)) * db_dr;

    Ok(RicciComponents { r00, r11, r22 })
}

/// Partial derivatives of `(R00, R11, R22)` with respect to the metric values
/// `(A, B)` at a point, holding the radial derivatives fixed.
///
/// Row `i` is Ricci component `i`; column 0 is `∂/∂A`, column 1 is `∂/∂B`.
pub fn ricci_jacobian(point: &MetricPoint) -> Result<[[f64; 2]; 3], NumericalError> {
    check_denominators(point)?;

    let MetricPoint {
        r,
        a,
        b,
        da_dr,
        db_dr,
        d2a_dr2,
    } = *point;

    let dr00_da = (1.0 / (4.0 * a * a * b)) * da_dr * da_dr;
    let dr00_db = -(1.0 / (b * b * r)) * da_dr
        + (1.0 / (4.0 * a * b * b)) * da_dr * da_dr
        + (1.0 / (2.0 * b * b * b)) * da_dr * db_dr
        - (1.0 / (2.0 * b * b)) * d2a_dr2;

    let dr11_da = (1.0 / (4.0 * a * a * b)) * da_dr * db_dr
        + (1.0 / (2.0 * a * a * a)) * da_dr * da_dr
        - (1.0 / (2.0 * a * a)) * d2a_dr2;
    let dr11_db = (1.0 / (b * b * r)) * db_dr + (1.0 / (4.0 * a * b * b)) * da_dr * db_dr;

    let dr22_da = (r / (2.0 * a * a * b)) * da_dr;
    let dr22_db =
        1.0 / (b * b) + (r / (2.0 * a * b * b)) * da_dr - (r / (b * b * b)) * db_dr;

    Ok([
        [dr00_da, dr00_db],
        [dr11_da, dr11_db],
        [dr22_da, dr22_db],
    ])
}
