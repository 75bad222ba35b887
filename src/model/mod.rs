use ndarray::{Array2, ArrayView2};

pub mod neural_net;
pub mod optimizer;
pub mod trainer;

/// A regressor from feature rows to label rows. Both are (n, 1) matrices of normalized values
pub trait Model {
    /// Run one optimization step on a batch. Returns the batch loss before the update
    fn train_batch(&mut self, inputs: &ArrayView2<f64>, targets: &ArrayView2<f64>) -> f64;
    fn predict(&self, inputs: &ArrayView2<f64>) -> Array2<f64>;

    /// Loss on a set of instances, without updating the model
    fn evaluate(&self, inputs: &ArrayView2<f64>, targets: &ArrayView2<f64>) -> f64 {
        mean_squared_error(&self.predict(inputs).view(), targets)
    }
}

/// Mean squared error over all elements. Zero for empty input
pub fn mean_squared_error(predictions: &ArrayView2<f64>, targets: &ArrayView2<f64>) -> f64 {
    (predictions - targets)
        .mapv(|x| x.powi(2))
        .mean()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse() {
        let predictions = array![[0.5], [1.0], [0.0]];
        let targets = array![[0.0], [1.0], [1.0]];

        let loss = mean_squared_error(&predictions.view(), &targets.view());
        assert!((loss - 1.25 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mse_empty() {
        let empty = Array2::<f64>::zeros((0, 1));
        assert_eq!(mean_squared_error(&empty.view(), &empty.view()), 0.0);
    }
}
