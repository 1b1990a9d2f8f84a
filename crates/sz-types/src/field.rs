//! Radial fields of metric components and their derivatives.

use serde::{Deserialize, Serialize};

use crate::errors::NumericalError;

/// One of the two independent metric components of the static,
/// spherically-symmetric ansatz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// The `g_tt`-related component.
    A,
    /// The `g_rr`-related component.
    B,
}

impl Component {
    pub const ALL: [Component; 2] = [Component::A, Component::B];
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Which of the three parallel fields of a [`FieldSet`] is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivativeLevel {
    Value,
    First,
    Second,
}

/// A single radial sample: radius plus the two component values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub r: f64,
    pub a: f64,
    pub b: f64,
}

impl FieldSample {
    pub fn new(r: f64, a: f64, b: f64) -> Self {
        Self { r, a, b }
    }

    pub fn component(&self, component: Component) -> f64 {
        match component {
            Component::A => self.a,
            Component::B => self.b,
        }
    }

    pub fn set_component(&mut self, component: Component, value: f64) {
        match component {
            Component::A => self.a = value,
            Component::B => self.b = value,
        }
    }
}

/// An ordered sequence of samples with strictly increasing radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    samples: Vec<FieldSample>,
}

impl Field {
    pub fn new(samples: Vec<FieldSample>) -> Self {
        Self { samples }
    }

    /// A field over the same radii with both components zero.
    pub fn zeroed_like(&self) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| FieldSample::new(s.r, 0.0, 0.0))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[FieldSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<FieldSample> {
        self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSample> {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&FieldSample> {
        self.samples.get(index)
    }

    pub fn radius(&self, index: usize) -> f64 {
        self.samples[index].r
    }

    pub fn component(&self, index: usize, component: Component) -> f64 {
        self.samples[index].component(component)
    }

    pub fn set_component(&mut self, index: usize, component: Component, value: f64) {
        self.samples[index].set_component(component, value);
    }

    /// Fails with [`NumericalError::GridTooShort`] when the field has fewer
    /// than `required` samples.
    pub fn ensure_len(&self, required: usize) -> Result<(), NumericalError> {
        if self.samples.len() < required {
            return Err(NumericalError::GridTooShort {
                len: self.samples.len(),
                required,
            });
        }
        Ok(())
    }

    /// Whether radii strictly increase with index.
    pub fn is_strictly_increasing(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].r < w[1].r)
    }
}

/// The values and radial derivatives needed to evaluate the Ricci
/// components at one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub r: f64,
    pub a: f64,
    pub b: f64,
    pub da_dr: f64,
    pub db_dr: f64,
    pub d2a_dr2: f64,
}

/// A complete optimisation state: the value field and its first and second
/// radial derivatives, all over the same radii.
///
/// Cloning deep-copies all three fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    value: Field,
    first: Field,
    second: Field,
}

impl FieldSet {
    /// Wrap a value field; both derivative fields start at zero until the
    /// next differentiation pass.
    pub fn from_value(value: Field) -> Self {
        let first = value.zeroed_like();
        let second = value.zeroed_like();
        Self {
            value,
            first,
            second,
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn value(&self) -> &Field {
        &self.value
    }

    pub fn into_value(self) -> Field {
        self.value
    }

    pub fn level(&self, level: DerivativeLevel) -> &Field {
        match level {
            DerivativeLevel::Value => &self.value,
            DerivativeLevel::First => &self.first,
            DerivativeLevel::Second => &self.second,
        }
    }

    pub fn level_mut(&mut self, level: DerivativeLevel) -> &mut Field {
        match level {
            DerivativeLevel::Value => &mut self.value,
            DerivativeLevel::First => &mut self.first,
            DerivativeLevel::Second => &mut self.second,
        }
    }

    /// Gather the Ricci inputs at `index`.
    pub fn point(&self, index: usize) -> Result<MetricPoint, NumericalError> {
        let len = self.value.len();
        if self.first.len() != len {
            return Err(NumericalError::LengthMismatch {
                expected: len,
                actual: self.first.len(),
            });
        }
        if self.second.len() != len {
            return Err(NumericalError::LengthMismatch {
                expected: len,
                actual: self.second.len(),
            });
        }
        let value = self
            .value
            .get(index)
            .ok_or(NumericalError::IndexOutOfRange { index, len })?;
        let first = &self.first.samples()[index];
        let second = &self.second.samples()[index];

        Ok(MetricPoint {
            r: value.r,
            a: value.a,
            b: value.b,
            da_dr: first.a,
            db_dr: first.b,
            d2a_dr2: second.a,
        })
    }
}
