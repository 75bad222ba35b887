use ndarray::{s, Array1, ArrayView1};

/// Sizes of the (train, test) partitions of `n` points. Training gets floor(0.8 n)
pub fn split_sizes(n: usize) -> (usize, usize) {
    let train = n * 4 / 5;

    (train, n - train)
}

/// Split a column into its leading `train` values and the rest, keeping order
pub fn split(values: ArrayView1<f64>, train: usize) -> (Array1<f64>, Array1<f64>) {
    let train = train.min(values.len());

    (
        values.slice(s![..train]).to_owned(),
        values.slice(s![train..]).to_owned(),
    )
}

/// Normalized features and labels partitioned at the same position
#[derive(Clone, Debug)]
pub struct DataSplit {
    pub train_features: Array1<f64>,
    pub train_labels: Array1<f64>,
    pub test_features: Array1<f64>,
    pub test_labels: Array1<f64>,
}

impl DataSplit {
    /// The columns must still be positionally paired
    pub fn new(features: ArrayView1<f64>, labels: ArrayView1<f64>) -> DataSplit {
        debug_assert_eq!(features.len(), labels.len());
        let (train, _) = split_sizes(features.len());

        let (train_features, test_features) = split(features, train);
        let (train_labels, test_labels) = split(labels, train);

        DataSplit {
            train_features,
            train_labels,
            test_features,
            test_labels,
        }
    }

    pub fn train_len(&self) -> usize {
        self.train_features.len()
    }

    pub fn test_len(&self) -> usize {
        self.test_features.len()
    }
}
