//! Finite-difference radial derivatives on a non-uniform grid.
//!
//! Every stencil uses three points. Interior points are centred; the first
//! and last points use the nearest three points on their own side.

use sz_types::{Component, DerivativeLevel, Field, FieldSet, NumericalError};

/// Fewest samples any stencil can work with.
pub const MIN_STENCIL_POINTS: usize = 3;

/// Derivative order produced by [`differentiate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    First,
    Second,
}

impl Order {
    /// The field of a [`FieldSet`] this order is stored in.
    pub fn level(self) -> DerivativeLevel {
        match self {
            Self::First => DerivativeLevel::First,
            Self::Second => DerivativeLevel::Second,
        }
    }
}

/// Where an index sits relative to the grid ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Start,
    Interior,
    End,
}

/// Derivative of one component of `field` with respect to `r` at `index`.
pub fn differentiate(
    field: &Field,
    component: Component,
    index: usize,
    order: Order,
) -> Result<f64, NumericalError> {
    field.ensure_len(MIN_STENCIL_POINTS)?;
    let n = field.len();
    if index >= n {
        return Err(NumericalError::IndexOutOfRange { index, len: n });
    }

    let position = match index {
        0 => Position::Start,
        i if i == n - 1 => Position::End,
        _ => Position::Interior,
    };
    // Three consecutive stencil points, lo < mid < hi.
    let (lo, mid, hi) = match position {
        Position::Start => (0, 1, 2),
        Position::Interior => (index - 1, index, index + 1),
        Position::End => (n - 3, n - 2, n - 1),
    };

    let slope = |i: usize, j: usize| -> Result<f64, NumericalError> {
        let dr = spacing(field, i, j)?;
        Ok((field.component(j, component) - field.component(i, component)) / dr)
    };

    let result = match (order, position) {
        (Order::First, Position::Interior) => 0.5 * (slope(mid, hi)? + slope(lo, mid)?),
        (Order::First, Position::Start) => 2.0 * slope(lo, mid)? - slope(lo, hi)?,
        (Order::First, Position::End) => 2.0 * slope(mid, hi)? - slope(lo, hi)?,
        (Order::Second, _) => 2.0 * (slope(mid, hi)? - slope(lo, mid)?) / spacing(field, lo, hi)?,
    };

    Ok(result)
}

fn spacing(field: &Field, i: usize, j: usize) -> Result<f64, NumericalError> {
    let dr = field.radius(j) - field.radius(i);
    if dr == 0.0 {
        return Err(NumericalError::ZeroDenominator {
            quantity: "radial spacing",
            r: field.radius(i),
        });
    }
    Ok(dr)
}

/// Recompute both derivative fields of `fields` from its value field.
///
/// All first derivatives are computed before any second derivative. Second
/// derivatives come straight from the value field.
pub fn differentiate_all(fields: &mut FieldSet) -> Result<(), NumericalError> {
    for order in [Order::First, Order::Second] {
        let value = fields.value();
        let results = (0..value.len())
            .map(|i| {
                Ok((
                    differentiate(value, Component::A, i, order)?,
                    differentiate(value, Component::B, i, order)?,
                ))
            })
            .collect::<Result<Vec<(f64, f64)>, NumericalError>>()?;

        let target = fields.level_mut(order.level());
        for (i, (da, db)) in results.into_iter().enumerate() {
            target.set_component(i, Component::A, da);
            target.set_component(i, Component::B, db);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sz_types::FieldSample;

    const TOLERANCE: f64 = 1e-9;

    fn field_from(radii: &[f64], f: impl Fn(f64) -> f64, g: impl Fn(f64) -> f64) -> Field {
        Field::new(
            radii
                .iter()
                .map(|&r| FieldSample::new(r, f(r), g(r)))
                .collect(),
        )
    }

    fn non_uniform_radii() -> Vec<f64> {
        vec![1.01, 1.02, 1.05, 1.2, 1.6, 2.5, 4.0, 7.5, 12.0, 30.0]
    }

    #[test]
    fn linear_field_has_unit_slope_everywhere() {
        let field = field_from(&non_uniform_radii(), |r| r, |r| -3.0 * r + 2.0);

        for i in 0..field.len() {
            let da = differentiate(&field, Component::A, i, Order::First).unwrap();
            let db = differentiate(&field, Component::B, i, Order::First).unwrap();
            let d2a = differentiate(&field, Component::A, i, Order::Second).unwrap();
            assert!((da - 1.0).abs() < TOLERANCE, "index {i}: {da}");
            assert!((db + 3.0).abs() < TOLERANCE, "index {i}: {db}");
            assert!(d2a.abs() < TOLERANCE, "index {i}: {d2a}");
        }
    }

    #[test]
    fn quadratic_field_on_uniform_grid() {
        let radii: Vec<f64> = (0..12).map(|i| 1.5 + 0.25 * i as f64).collect();
        let field = field_from(&radii, |r| r * r, |_| 1.0);

        for (i, &r) in radii.iter().enumerate() {
            let da = differentiate(&field, Component::A, i, Order::First).unwrap();
            let d2a = differentiate(&field, Component::A, i, Order::Second).unwrap();
            assert!((da - 2.0 * r).abs() < TOLERANCE, "index {i}: {da} vs {}", 2.0 * r);
            assert!((d2a - 2.0).abs() < TOLERANCE, "index {i}: {d2a}");
        }
    }

    #[test]
    fn second_derivative_of_quadratic_is_exact_on_non_uniform_grid() {
        let field = field_from(&non_uniform_radii(), |r| 3.0 * r * r - r, |r| r);
        for i in 0..field.len() {
            let d2a = differentiate(&field, Component::A, i, Order::Second).unwrap();
            assert!((d2a - 6.0).abs() < 1e-6, "index {i}: {d2a}");
        }
    }

    #[test]
    fn short_grid_is_rejected() {
        let field = field_from(&[1.5, 2.0], |r| r, |r| r);
        assert_eq!(
            differentiate(&field, Component::A, 0, Order::First),
            Err(NumericalError::GridTooShort {
                len: 2,
                required: MIN_STENCIL_POINTS
            })
        );
    }

    #[test]
    fn coincident_radii_are_a_zero_denominator() {
        let field = field_from(&[1.5, 2.0, 2.0, 3.0], |r| r, |r| r);
        let err = differentiate(&field, Component::A, 1, Order::First).unwrap_err();
        assert!(matches!(err, NumericalError::ZeroDenominator { .. }));
    }

    #[test]
    fn out_of_range_index() {
        let field = field_from(&[1.5, 2.0, 3.0], |r| r, |r| r);
        assert_eq!(
            differentiate(&field, Component::B, 3, Order::Second),
            Err(NumericalError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn full_pass_fills_both_components_and_levels() {
        let radii: Vec<f64> = (0..8).map(|i| 2.0 + 0.5 * i as f64).collect();
        let mut fields = FieldSet::from_value(field_from(&radii, |r| r * r, |r| 4.0 * r));
        differentiate_all(&mut fields).unwrap();

        let first = fields.level(DerivativeLevel::First);
        let second = fields.level(DerivativeLevel::Second);
        for (i, &r) in radii.iter().enumerate() {
            assert_eq!(first.radius(i), r);
            assert!((first.component(i, Component::A) - 2.0 * r).abs() < TOLERANCE);
            assert!((first.component(i, Component::B) - 4.0).abs() < TOLERANCE);
            assert!((second.component(i, Component::A) - 2.0).abs() < TOLERANCE);
            assert!(second.component(i, Component::B).abs() < TOLERANCE);
        }
    }

    #[test]
    fn full_pass_overwrites_stale_derivatives() {
        let radii = [1.5, 2.0, 3.0, 4.5];
        let mut fields = FieldSet::from_value(field_from(&radii, |r| r, |r| r));
        fields
            .level_mut(DerivativeLevel::Second)
            .set_component(0, Component::A, 123.0);

        differentiate_all(&mut fields).unwrap();
        assert!(
            fields
                .level(DerivativeLevel::Second)
                .component(0, Component::A)
                .abs()
                < TOLERANCE
        );
    }
}
