//! Adam (Adaptive Moment Estimation) with one moment state per dense layer

use ndarray::{Array1, Array2};

pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

#[derive(Clone, Debug)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

impl Adam {
    /// Optimizer state for a layer with the given weight shape
    pub fn new(learning_rate: f64, shape: (usize, usize)) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            m_w: Array2::zeros(shape),
            v_w: Array2::zeros(shape),
            m_b: Array1::zeros(shape.1),
            v_b: Array1::zeros(shape.1),
        }
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update to a layer's weights and biases
    pub fn step(
        &mut self,
        weights: &mut Array2<f64>,
        biases: &mut Array1<f64>,
        weight_grad: &Array2<f64>,
        bias_grad: &Array1<f64>,
    ) {
        self.t += 1;

        // Biased first and second moment estimates
        self.m_w = &self.m_w * self.beta1 + weight_grad * (1.0 - self.beta1);
        self.v_w = &self.v_w * self.beta2 + &(weight_grad * weight_grad) * (1.0 - self.beta2);
        self.m_b = &self.m_b * self.beta1 + bias_grad * (1.0 - self.beta1);
        self.v_b = &self.v_b * self.beta2 + &(bias_grad * bias_grad) * (1.0 - self.beta2);

        let c1 = 1.0 - self.beta1.powi(self.t);
        let c2 = 1.0 - self.beta2.powi(self.t);

        let m_hat = &self.m_w / c1;
        let v_hat = &self.v_w / c2;
        *weights = &*weights - &(&m_hat * self.learning_rate / &(v_hat.mapv(f64::sqrt) + self.epsilon));

        let m_hat = &self.m_b / c1;
        let v_hat = &self.v_b / c2;
        *biases = &*biases - &(&m_hat * self.learning_rate / &(v_hat.mapv(f64::sqrt) + self.epsilon));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.01, (2, 1));
        let mut weights = Array2::ones((2, 1));
        let mut biases = Array1::zeros(1);

        adam.step(
            &mut weights,
            &mut biases,
            &Array2::from_elem((2, 1), 4.0),
            &Array1::from_elem(1, -2.0),
        );

        // After bias correction the first step is lr * g / |g|
        assert!((weights[[0, 0]] - 0.99).abs() < 1e-6);
        assert!((biases[0] - 0.01).abs() < 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_zero_gradient_is_noop() {
        let mut adam = Adam::new(0.01, (1, 3));
        let mut weights = Array2::from_elem((1, 3), 0.5);
        let mut biases = Array1::from_elem(3, 0.25);

        for _ in 0..5 {
            adam.step(&mut weights, &mut biases, &Array2::zeros((1, 3)), &Array1::zeros(3));
        }

        assert!(weights.iter().all(|w| *w == 0.5));
        assert!(biases.iter().all(|b| *b == 0.25));
    }
}
