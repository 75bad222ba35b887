/// Column holding the value the model learns to predict
pub const LABEL_NAME: &str = "price";

/// Columns that can never be picked as the feature
pub const LABELS_TO_IGNORE: [&str; 3] = ["id", "date", "price"];

/// Prefix of the storage key a trained model is saved under
pub const STORAGE_ID: &str = "kc-house-price-regression";

pub const DEFAULT_DATA_PATH: &str = "data/kc_house_data.csv";

pub const DEFAULT_MODEL_DIR: &str = "models";

/// Number of samples taken along the feature axis when drawing the fitted curve
pub const CURVE_STEPS: usize = 100;
