use ndarray::{Array, Array2, Axis};

use super::normalize::{denormalize_value, normalize_value, TrainingBounds};
use super::points::Point;
use crate::error::{Error, Result};
use crate::model::Model;

/// Read a feature value typed by the user
pub fn parse_input(input: &str) -> Result<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| Error::InvalidInput(input.to_string()))
}

/// Predict the label for a feature value in original units.
/// Values outside the training range are extrapolated
pub fn predict_value<M: Model + ?Sized>(x: f64, bounds: &TrainingBounds, model: &M) -> f64 {
    let input = Array2::from_elem((1, 1), normalize_value(x, bounds.feature));
    let output = model.predict(&input.view());

    denormalize_value(output[[0, 0]], bounds.label)
}

/// Parse the input and predict the label for it
pub fn predict<M: Model + ?Sized>(input: &str, bounds: &TrainingBounds, model: &M) -> Result<f64> {
    let x = parse_input(input)?;

    Ok(predict_value(x, bounds, model))
}

/// The fitted curve over the training feature range, in original units
pub fn prediction_curve<M: Model + ?Sized>(
    model: &M,
    bounds: &TrainingBounds,
    steps: usize,
) -> Vec<Point> {
    let xs = Array::linspace(0.0, 1.0, steps);
    let ys = model.predict(&xs.view().insert_axis(Axis(1)));

    xs.iter()
        .zip(ys.iter())
        .map(|(x, y)| Point {
            x: denormalize_value(*x, bounds.feature),
            y: denormalize_value(*y, bounds.label),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::neural_net::{NeuralNet, Topology};
    use crate::pipeline::normalize::Bounds;
    use ndarray::array;

    fn bounds() -> TrainingBounds {
        TrainingBounds {
            feature: Bounds::new(5000.0, 500.0),
            label: Bounds::new(750000.0, 75000.0),
        }
    }

    fn constant_half() -> NeuralNet {
        NeuralNet::from_layers(Topology::SingleLayer, vec![(array![[0.0]], array![0.0])], 0.001).unwrap()
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("1180").unwrap(), 1180.0);
        assert_eq!(parse_input(" 2.5 ").unwrap(), 2.5);
        assert!(matches!(parse_input("abc"), Err(Error::InvalidInput(_))));
        assert!(parse_input("").is_err());
        assert!(parse_input("NaN").is_err());
        assert!(parse_input("inf").is_err());
    }

    #[test]
    fn test_denormalized_output() {
        // Output 0.5 is half way between the label bounds
        let price = predict("1180", &bounds(), &constant_half()).unwrap();
        assert_eq!(price, 412500.0);
    }

    #[test]
    fn test_invalid_input_has_no_prediction() {
        assert!(predict("abc", &bounds(), &constant_half()).is_err());
    }

    #[test]
    fn test_uses_feature_bounds() {
        // sigmoid(10 * x - 5) is 0.5 exactly at the middle of the feature range
        let model = NeuralNet::from_layers(
            Topology::SingleLayer,
            vec![(array![[10.0]], array![-5.0])],
            0.001,
        )
        .unwrap();

        let price = predict_value(2750.0, &bounds(), &model);
        assert!((price - 412500.0).abs() < 1e-6);

        // Outside the training range the model extrapolates
        let above = predict_value(9000.0, &bounds(), &model);
        assert!(above > price && above < 750000.0);
    }

    #[test]
    fn test_deterministic() {
        let model = NeuralNet::from_layers(
            Topology::SingleLayer,
            vec![(array![[3.0]], array![-1.0])],
            0.001,
        )
        .unwrap();

        let first = predict("3210", &bounds(), &model).unwrap();
        for _ in 0..10 {
            assert_eq!(predict("3210", &bounds(), &model).unwrap(), first);
        }
    }

    #[test]
    fn test_curve_spans_feature_range() {
        let curve = prediction_curve(&constant_half(), &bounds(), 100);

        assert_eq!(curve.len(), 100);
        assert_eq!(curve[0].x, 500.0);
        assert!((curve[99].x - 5000.0).abs() < 1e-9);
        assert!(curve.iter().all(|p| p.y == 412500.0));
    }
}
