use log::warn;
use ndarray::{Array1, ArrayView1};

use crate::error::{Error, Result};

/// The (max, min) pair a column is rescaled with
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub max: f64,
    pub min: f64,
}

impl Bounds {
    pub fn new(max: f64, min: f64) -> Bounds {
        Bounds { max, min }
    }

    /// Bounds of the values. None if there are no values
    pub fn of(values: ArrayView1<f64>) -> Option<Bounds> {
        if values.is_empty() {
            return None;
        }

        let max = values.fold(f64::NEG_INFINITY, |acc, x| acc.max(*x));
        let min = values.fold(f64::INFINITY, |acc, x| acc.min(*x));

        Some(Bounds { max, min })
    }

    /// A constant column has no range to scale by
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Feature and label bounds of the data a model was trained on.
/// These are fixed once computed and used for every later prediction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingBounds {
    pub feature: Bounds,
    pub label: Bounds,
}

/// A normalized column together with the bounds that produced it
#[derive(Clone, Debug)]
pub struct Normalized {
    pub values: Array1<f64>,
    pub bounds: Bounds,
}

/// Rescale a single value. A degenerate range maps everything to 0
pub fn normalize_value(x: f64, bounds: Bounds) -> f64 {
    if bounds.is_degenerate() {
        0f64
    } else {
        (x - bounds.min) / bounds.range()
    }
}

/// Map a normalized value back into the original units
pub fn denormalize_value(x: f64, bounds: Bounds) -> f64 {
    x * bounds.range() + bounds.min
}

/// Rescale `values` to [0, 1]. With `bounds` given they are used as-is and
/// values outside them fall outside [0, 1]; otherwise they are derived from `values`
pub fn normalize(values: ArrayView1<f64>, bounds: Option<Bounds>) -> Result<Normalized> {
    let bounds = match bounds {
        Some(bounds) => bounds,
        None => Bounds::of(values).ok_or(Error::EmptyData { stage: "normalize" })?,
    };

    if bounds.is_degenerate() {
        warn!(
            "cannot rescale a constant column (max = min = {}), mapping it to 0",
            bounds.min
        );
    }

    Ok(Normalized {
        values: values.mapv(|x| normalize_value(x, bounds)),
        bounds,
    })
}

pub fn denormalize(values: ArrayView1<f64>, bounds: Bounds) -> Array1<f64> {
    values.mapv(|x| denormalize_value(x, bounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_self_bounds() {
        let normalized = normalize(array![100.0, 200.0, 300.0, 400.0].view(), None).unwrap();

        assert_eq!(normalized.bounds, Bounds::new(400.0, 100.0));
        let expected = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        for (x, e) in normalized.values.iter().zip(expected) {
            assert!((x - e).abs() < EPS);
        }
    }

    #[test]
    fn test_round_trip() {
        let values = array![3.5, -2.0, 17.25, 0.0, 1e6, 42.0];
        let normalized = normalize(values.view(), None).unwrap();

        assert!(normalized.values.iter().all(|x| (0.0..=1.0).contains(x)));

        let restored = denormalize(normalized.values.view(), normalized.bounds);
        for (a, b) in values.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_external_bounds_ignore_input() {
        let bounds = Bounds::new(10.0, 0.0);
        let normalized = normalize(array![5.0, 20.0, -10.0].view(), Some(bounds)).unwrap();

        assert_eq!(normalized.bounds, bounds);
        assert_eq!(normalized.values.to_vec(), vec![0.5, 2.0, -1.0]);
    }

    #[test]
    fn test_identity_outside_range() {
        let bounds = Bounds::new(750000.0, 75000.0);

        for x in [-5e5, 0.0, 75000.0, 412500.0, 2e6] {
            let y = denormalize_value(normalize_value(x, bounds), bounds);
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_denormalize_label() {
        let bounds = Bounds::new(750000.0, 75000.0);
        assert_eq!(denormalize_value(0.5, bounds), 412500.0);
    }

    #[test]
    fn test_constant_column() {
        let normalized = normalize(array![3.0, 3.0, 3.0].view(), None).unwrap();

        assert!(normalized.bounds.is_degenerate());
        assert_eq!(normalized.values.to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(denormalize_value(0.7, normalized.bounds), 3.0);
    }

    #[test]
    fn test_empty_without_bounds() {
        let empty: Array1<f64> = Array1::zeros(0);

        assert!(matches!(
            normalize(empty.view(), None),
            Err(Error::EmptyData { .. })
        ));
        assert!(normalize(empty.view(), Some(Bounds::new(1.0, 0.0))).is_ok());
    }
}
