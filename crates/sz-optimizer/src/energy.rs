//! The annealing objective: squared Ricci components summed over the grid.

use sz_types::{FieldSet, NumericalError};

use crate::ricci::{ricci_components, RicciComponents};

/// Sum of `R00² + R11² + R22²` over every grid index.
///
/// Zero only when the discretised vacuum equations hold at every radius.
pub fn energy(fields: &FieldSet) -> Result<f64, NumericalError> {
    let mut total = 0.0;
    for i in 0..fields.len() {
        total += ricci_components(&fields.point(i)?)?.sum_of_squares();
    }
    Ok(total)
}

/// Ricci components at every grid index, in radius order.
pub fn ricci_profile(fields: &FieldSet) -> Result<Vec<RicciComponents>, NumericalError> {
    (0..fields.len())
        .map(|i| ricci_components(&fields.point(i)?))
        .collect()
}
