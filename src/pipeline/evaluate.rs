use log::info;
use ndarray::ArrayView1;

use crate::error::{Error, Result};
use crate::model::trainer::as_column;
use crate::model::Model;

/// Mean squared error of the model on the normalized test split.
/// The columns must be scaled with the bounds the model was trained with
pub fn evaluate<M: Model + ?Sized>(
    model: &M,
    test_features: ArrayView1<f64>,
    test_labels: ArrayView1<f64>,
) -> Result<f64> {
    if test_features.len() != test_labels.len() {
        return Err(Error::LengthMismatch {
            features: test_features.len(),
            labels: test_labels.len(),
        });
    }
    if test_features.is_empty() {
        return Err(Error::EmptyData { stage: "evaluate" });
    }

    let loss = model.evaluate(
        &as_column(test_features).view(),
        &as_column(test_labels).view(),
    );
    info!("test loss over {} rows: {:.6}", test_features.len(), loss);

    Ok(loss)
}
