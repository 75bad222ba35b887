use std::fmt;

use ndarray::{Array, Array1, Array2, ArrayView2, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use super::optimizer::{Adam, DEFAULT_LEARNING_RATE};
use super::{mean_squared_error, Model};
use crate::error::{Error, Result};

/// Hidden units of the two-layer topology unless configured otherwise
pub const DEFAULT_HIDDEN_UNITS: usize = 8;

/// A feed-forward regressor from one feature to one label.
/// Every dense layer has a bias and a sigmoid activation, the output layer included
pub struct NeuralNet {
    pub layers: Vec<(Array2<f64>, Array1<f64>)>, // Each layer holds a weight matrix and a bias vector
    pub topology: Topology,
    optimizers: Vec<Adam>, // One Adam state per layer
}

/// Layer layout of the network
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// A single dense layer: sigmoid(w * x + b)
    SingleLayer,
    /// A hidden dense layer followed by a one-unit dense layer
    TwoLayer,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitMethod {
    Default,
    Xavier,
}

/// Hyperparameters fixed when a network is created
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub topology: Topology,
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub init_method: InitMethod,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            topology: Topology::TwoLayer,
            hidden_units: DEFAULT_HIDDEN_UNITS,
            learning_rate: DEFAULT_LEARNING_RATE,
            init_method: InitMethod::Xavier,
        }
    }
}

impl Topology {
    pub fn name(&self) -> &'static str {
        match self {
            Topology::SingleLayer => "single-layer",
            Topology::TwoLayer => "two-layer",
        }
    }

    pub fn from_name(name: &str) -> Option<Topology> {
        match name {
            "single-layer" => Some(Topology::SingleLayer),
            "two-layer" => Some(Topology::TwoLayer),
            _ => None,
        }
    }

    /// Width of every layer, input layer included, e.g. [1, 8, 1]
    pub fn layer_structure(&self, hidden_units: usize) -> Vec<usize> {
        match self {
            Topology::SingleLayer => vec![1, 1],
            Topology::TwoLayer => vec![1, hidden_units, 1],
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl NeuralNet {
    /// Construct a new neural net with freshly initialized weights
    pub fn new<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> NeuralNet {
        let layer_structure = config.topology.layer_structure(config.hidden_units);
        let layers = match config.init_method {
            InitMethod::Default => init_layers_default(&layer_structure, rng),
            InitMethod::Xavier => init_layers_xavier(&layer_structure, rng),
        };

        NeuralNet::with_layers(config.topology, layers, config.learning_rate)
    }

    /// Rebuild a net from known weights, checking them against the topology
    pub fn from_layers(
        topology: Topology,
        layers: Vec<(Array2<f64>, Array1<f64>)>,
        learning_rate: f64,
    ) -> Result<NeuralNet> {
        let expected_layers = topology.layer_structure(1).len() - 1;
        if layers.len() != expected_layers {
            return Err(Error::Format(format!(
                "{} network needs {} layers, got {}",
                topology,
                expected_layers,
                layers.len()
            )));
        }

        let mut inputs = 1;
        for (i, (weights, biases)) in layers.iter().enumerate() {
            if weights.nrows() != inputs || weights.ncols() != biases.len() || biases.is_empty() {
                return Err(Error::Format(format!(
                    "layer {} has weights {:?} and {} biases, expected {} inputs",
                    i,
                    weights.dim(),
                    biases.len(),
                    inputs
                )));
            }
            inputs = weights.ncols();
        }

        if inputs != 1 {
            return Err(Error::Format(format!("network outputs {} values, expected 1", inputs)));
        }

        Ok(NeuralNet::with_layers(topology, layers, learning_rate))
    }

    fn with_layers(
        topology: Topology,
        layers: Vec<(Array2<f64>, Array1<f64>)>,
        learning_rate: f64,
    ) -> NeuralNet {
        let optimizers = layers
            .iter()
            .map(|(weights, _)| Adam::new(learning_rate, weights.dim()))
            .collect();

        NeuralNet {
            layers,
            topology,
            optimizers,
        }
    }

    /// Units of the first layer
    pub fn hidden_units(&self) -> usize {
        self.layers.first().map_or(0, |(_, biases)| biases.len())
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizers
            .first()
            .map_or(DEFAULT_LEARNING_RATE, |adam| adam.learning_rate)
    }

    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(|(w, b)| w.len() + b.len()).sum()
    }

    /// A short description of the layers, one line each
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("{} network", self.topology)];

        for (i, (weights, biases)) in self.layers.iter().enumerate() {
            lines.push(format!(
                "  dense_{}: {} -> {} (sigmoid), {} params",
                i,
                weights.nrows(),
                weights.ncols(),
                weights.len() + biases.len()
            ));
        }
        lines.push(format!("  total params: {}", self.num_parameters()));

        lines.join("\n")
    }

    // Perform a forward pass of the network on some input.
    // Returns the outputs of every layer (the input first), and the non-activated outputs (used for backprop)
    fn forward(&self, inputs: &ArrayView2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut hidden = vec![inputs.to_owned()];
        let mut hidden_linear = vec![];

        for (weights, biases) in &self.layers {
            // The output of the layer without applying the activation function
            let lin_output = hidden[hidden.len() - 1].dot(weights) + biases;

            hidden.push(lin_output.mapv(sigmoid));
            hidden_linear.push(lin_output);
        }

        (hidden, hidden_linear)
    }

    /// Calculate the gradients using backprop and perform an Adam step on every layer.
    /// `grad` is the gradient of the loss WRT the activated output of the last layer
    fn backward_and_update(
        &mut self,
        hidden: Vec<Array2<f64>>,
        hidden_linear: Vec<Array2<f64>>,
        grad: Array2<f64>,
    ) {
        // The gradient WRT the activated output of the current layer
        let mut grad_help = grad;

        for idx in (0..self.layers.len()).rev() {
            // Move through the sigmoid to get the gradient WRT the linear output
            let delta = grad_help * hidden_linear[idx].mapv(delta_sigmoid);

            // Gradient WRT the weights in the current layer
            let weight_grad = hidden[idx].t().dot(&delta);
            // Gradient WRT the biases in the current layer
            let bias_grad = delta.sum_axis(Axis(0));

            // Propagate with the weights as they were before this step
            grad_help = delta.dot(&self.layers[idx].0.t());

            let (weights, biases) = &mut self.layers[idx];
            self.optimizers[idx].step(weights, biases, &weight_grad, &bias_grad);
        }
    }
}

impl Model for NeuralNet {
    fn train_batch(&mut self, inputs: &ArrayView2<f64>, targets: &ArrayView2<f64>) -> f64 {
        let (hidden, hidden_linear) = self.forward(inputs);
        let predictions = hidden[hidden.len() - 1].view();
        let loss = mean_squared_error(&predictions, targets);

        // Gradient of the mean squared error WRT the predictions
        let grad = (&predictions - targets) * (2f64 / predictions.len().max(1) as f64);

        self.backward_and_update(hidden, hidden_linear, grad);

        loss
    }

    /// Predict the labels for a set of instances - each instance is a row in "inputs"
    fn predict(&self, inputs: &ArrayView2<f64>) -> Array2<f64> {
        self.layers
            .iter()
            .fold(inputs.to_owned(), |x, (weights, biases)| {
                (x.dot(weights) + biases).mapv(sigmoid)
            })
    }
}

fn sigmoid(z: f64) -> f64 {
    (1f64 + (-z).exp()).recip()
}

fn delta_sigmoid(z: f64) -> f64 {
    let s = sigmoid(z);
    s * (1f64 - s)
}

fn init_layers_default<R: Rng + ?Sized>(
    layer_structure: &[usize],
    rng: &mut R,
) -> Vec<(Array2<f64>, Array1<f64>)> {
    let mut layers = vec![];
    // Weights are initialized from a uniform distribiution
    let distribution = Uniform::new(-0.3, 0.3);

    for i in 0..layer_structure.len() - 1 {
        // Random matrix of the weights between this layer and the next layer
        let weights = Array::zeros((layer_structure[i], layer_structure[i + 1]))
            .map(|_: &f64| distribution.sample(rng));
        // Bias vector between this layer and the next layer. Init'd to ones
        let bias = Array::ones(layer_structure[i + 1]);

        layers.push((weights, bias));
    }

    layers
}

/// Glorot uniform weights and zero biases
fn init_layers_xavier<R: Rng + ?Sized>(
    layer_structure: &[usize],
    rng: &mut R,
) -> Vec<(Array2<f64>, Array1<f64>)> {
    let mut layers = vec![];

    for i in 0..layer_structure.len() - 1 {
        let boundary = (6f64 / (layer_structure[i] + layer_structure[i + 1]) as f64).sqrt();
        let dist = Uniform::new(-boundary, boundary);

        let weights = Array::zeros((layer_structure[i], layer_structure[i + 1]))
            .map(|_: &f64| dist.sample(rng));
        let bias = Array::zeros(layer_structure[i + 1]);

        layers.push((weights, bias));
    }

    layers
}
