//! The data pipeline around the model: points are extracted from the records,
//! normalized to [0, 1], split into train and test partitions, and the fitted
//! model is evaluated on, and predicts from, values scaled with the same bounds.

pub mod evaluate;
pub mod normalize;
pub mod points;
pub mod predict;
pub mod split;
