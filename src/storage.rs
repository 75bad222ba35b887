//! Trained models on disk, one JSON file per feature.
//!
//! The file holds the topology, the training bounds and the weights of every
//! layer. The keys of the weights are e.g. W0, b0, W1, b1, each an array of
//! the values, with the shape of W{i} under W{i}_shape.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use json::{object, JsonValue};
use log::info;
use ndarray::{Array1, Array2};

use crate::error::{Error, Result};
use crate::model::neural_net::{NeuralNet, Topology};
use crate::pipeline::normalize::{Bounds, TrainingBounds};

/// Version of the file layout
const FORMAT: u32 = 1;

/// A model read back from the store, with the bounds it was trained with
pub struct StoredModel {
    pub model: NeuralNet,
    pub bounds: TrainingBounds,
}

pub struct ModelStore {
    dir: PathBuf,
    prefix: String,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str) -> ModelStore {
        ModelStore {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    /// Storage identifier of the model trained on `feature`
    pub fn key(&self, feature: &str) -> String {
        format!("{}-{}", self.prefix, feature)
    }

    pub fn path(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("{}.json", self.key(feature)))
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.path(feature).is_file()
    }

    /// Write the model and its bounds, replacing any model stored for the feature
    pub fn save(&self, feature: &str, model: &NeuralNet, bounds: &TrainingBounds) -> Result<PathBuf> {
        let mut data = layers_json(model);
        data["format"] = FORMAT.into();
        data["topology"] = model.topology.name().into();
        data["learning_rate"] = model.learning_rate().into();
        data["bounds"] = object! {};
        data["bounds"]["feature"] = bounds_json(&bounds.feature);
        data["bounds"]["label"] = bounds_json(&bounds.label);

        fs::create_dir_all(&self.dir)?;
        let path = self.path(feature);
        let mut file = File::create(&path)?;
        file.write_all(data.pretty(2).as_bytes())?;

        info!("saved {} model to {}", feature, path.display());

        Ok(path)
    }

    /// Read the model stored for `feature`, None if there is none.
    /// A model stored with another topology than `expected` is an error
    pub fn load(&self, feature: &str, expected: Topology) -> Result<Option<StoredModel>> {
        let path = self.path(feature);
        if !path.is_file() {
            return Ok(None);
        }

        let data = json::parse(&fs::read_to_string(&path)?)?;

        let format = data["format"].as_u32();
        if format != Some(FORMAT) {
            return Err(Error::Format(format!("unsupported format {}", data["format"])));
        }

        let name = data["topology"]
            .as_str()
            .ok_or_else(|| missing("topology"))?;
        let topology = Topology::from_name(name)
            .ok_or_else(|| Error::Format(format!("unknown topology {}", name)))?;
        if topology != expected {
            return Err(Error::TopologyMismatch {
                expected: expected.to_string(),
                found: topology.to_string(),
            });
        }

        let learning_rate = read_f64(&data["learning_rate"], "learning_rate")?;
        let bounds = TrainingBounds {
            feature: read_bounds(&data["bounds"]["feature"], "bounds.feature")?,
            label: read_bounds(&data["bounds"]["label"], "bounds.label")?,
        };

        let mut layers = vec![];
        while data.has_key(&format!("W{}", layers.len())) {
            layers.push(read_layer(&data, layers.len())?);
        }

        let model = NeuralNet::from_layers(topology, layers, learning_rate)?;
        info!("loaded {} model from {}", feature, path.display());

        Ok(Some(StoredModel { model, bounds }))
    }
}

/// Write the weights of the model in JSON format, without topology or bounds
pub fn export_weights<P: AsRef<Path>>(path: P, model: &NeuralNet) -> Result<()> {
    let mut file = File::create(path)?;

    file.write_all(layers_json(model).dump().as_bytes())?;

    Ok(())
}

fn layers_json(model: &NeuralNet) -> JsonValue {
    let mut data = object! {};

    for (i, (weights, biases)) in model.layers.iter().enumerate() {
        let w: Vec<f64> = weights.iter().copied().collect();
        let b: Vec<f64> = biases.iter().copied().collect();

        data[format!("W{}", i)] = w.into();
        data[format!("W{}_shape", i)] = vec![weights.nrows(), weights.ncols()].into();
        data[format!("b{}", i)] = b.into();
    }

    data
}

fn bounds_json(bounds: &Bounds) -> JsonValue {
    let mut data = object! {};
    data["max"] = bounds.max.into();
    data["min"] = bounds.min.into();

    data
}

fn missing(key: &str) -> Error {
    Error::Format(format!("missing or invalid {}", key))
}

/// Numbers are parsed from their text so they come back exactly as written
fn read_f64(value: &JsonValue, key: &str) -> Result<f64> {
    if !value.is_number() {
        return Err(missing(key));
    }

    value.dump().parse::<f64>().map_err(|_| missing(key))
}

fn read_f64s(value: &JsonValue, key: &str) -> Result<Vec<f64>> {
    if !value.is_array() {
        return Err(missing(key));
    }

    value.members().map(|x| read_f64(x, key)).collect()
}

fn read_bounds(value: &JsonValue, key: &str) -> Result<Bounds> {
    Ok(Bounds {
        max: read_f64(&value["max"], key)?,
        min: read_f64(&value["min"], key)?,
    })
}

fn read_layer(data: &JsonValue, i: usize) -> Result<(Array2<f64>, Array1<f64>)> {
    let w_key = format!("W{}", i);
    let shape_key = format!("W{}_shape", i);
    let b_key = format!("b{}", i);

    let shape: Vec<usize> = data[&shape_key]
        .members()
        .map(|x| x.as_usize().ok_or_else(|| missing(&shape_key)))
        .collect::<Result<_>>()?;
    let [rows, cols] = shape[..] else {
        return Err(missing(&shape_key));
    };

    let weights = Array2::from_shape_vec((rows, cols), read_f64s(&data[&w_key], &w_key)?)
        .map_err(|err| Error::Format(format!("{}: {}", w_key, err)))?;
    let biases = Array1::from(read_f64s(&data[&b_key], &b_key)?);

    Ok((weights, biases))
}
