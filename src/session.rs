//! Everything that belongs to one selected feature: its points, the bounds they
//! were scaled with, the train/test split and the model. Selecting another
//! feature means building another `Session`.

use std::fmt;

use log::info;
use rand::Rng;

use crate::consts::LABEL_NAME;
use crate::error::{Error, Result};
use crate::model::neural_net::{ModelConfig, NeuralNet};
use crate::model::trainer::{History, ProgressObserver, TrainOptions, Trainer};
use crate::parsing::HousingData;
use crate::pipeline::normalize::{normalize, TrainingBounds};
use crate::pipeline::points::{self, extract_points, Point};
use crate::pipeline::split::DataSplit;
use crate::pipeline::{evaluate, predict};
use crate::storage::ModelStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Uninitialized,
    Initialized,
    Trained,
    Saved,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Uninitialized => "not initialized",
            Status::Initialized => "initialized",
            Status::Trained => "trained",
            Status::Saved => "saved",
        };

        write!(f, "{s}")
    }
}

/// What a user can do with a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Initialize,
    Train,
    Evaluate,
    Save,
    Load,
    Predict,
}

impl Action {
    /// The states the action may start from
    pub fn allowed_from(&self) -> &'static [Status] {
        use Status::*;

        match self {
            Action::Initialize => &[Uninitialized],
            Action::Train => &[Initialized],
            Action::Evaluate | Action::Predict => &[Trained, Saved],
            Action::Save => &[Trained],
            Action::Load => &[Uninitialized, Initialized, Trained, Saved],
        }
    }

    /// The state after the action succeeds from `from`
    pub fn next(&self, from: Status) -> Status {
        match self {
            Action::Initialize => Status::Initialized,
            Action::Train => Status::Trained,
            Action::Save | Action::Load => Status::Saved,
            Action::Evaluate | Action::Predict => from,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Initialize => "initialize",
            Action::Train => "train",
            Action::Evaluate => "evaluate",
            Action::Save => "save",
            Action::Load => "load",
            Action::Predict => "predict",
        };

        write!(f, "{s}")
    }
}

pub struct Session {
    feature: String,
    points: Vec<Point>,
    bounds: TrainingBounds,
    data: DataSplit,
    config: ModelConfig,
    model: Option<NeuralNet>,
    status: Status,
}

impl Session {
    /// Extract, shuffle, normalize and split the points of `feature`.
    /// The session starts uninitialized, without a model
    pub fn new<R: Rng + ?Sized>(
        data: &HousingData,
        feature: &str,
        config: ModelConfig,
        rng: &mut R,
    ) -> Result<Session> {
        for column in [feature, LABEL_NAME] {
            if !data.has_column(column) {
                return Err(Error::MissingColumn { name: column.to_string() });
            }
        }

        let points = extract_points(&data.records, feature, rng);
        if points.is_empty() {
            return Err(Error::EmptyData { stage: "extract points" });
        }

        let features = normalize(points::features(&points).view(), None)?;
        let labels = normalize(points::labels(&points).view(), None)?;
        let bounds = TrainingBounds {
            feature: features.bounds,
            label: labels.bounds,
        };
        let split = DataSplit::new(features.values.view(), labels.values.view());

        info!(
            "{}: {} points, {} for training, {} for testing",
            feature,
            points.len(),
            split.train_len(),
            split.test_len()
        );

        Ok(Session {
            feature: feature.to_string(),
            points,
            bounds,
            data: split,
            config,
            model: None,
            status: Status::Uninitialized,
        })
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bounds(&self) -> &TrainingBounds {
        &self.bounds
    }

    pub fn data(&self) -> &DataSplit {
        &self.data
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn model(&self) -> Option<&NeuralNet> {
        self.model.as_ref()
    }

    fn require(&self, action: Action) -> Result<()> {
        if action.allowed_from().contains(&self.status) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                action,
                status: self.status,
            })
        }
    }

    fn advance(&mut self, action: Action) {
        let next = action.next(self.status);

        if next != self.status {
            info!("{}: model {} -> {}", self.feature, self.status, next);
        }
        self.status = next;
    }

    fn fitted_model(&self, action: Action) -> Result<&NeuralNet> {
        self.require(action)?;

        self.model.as_ref().ok_or(Error::InvalidState {
            action,
            status: self.status,
        })
    }

    /// Create a fresh model for this feature
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.require(Action::Initialize)?;

        let model = NeuralNet::new(&self.config, rng);
        info!("{}", model.summary());
        self.model = Some(model);
        self.advance(Action::Initialize);

        Ok(())
    }

    /// Train the model on the training split
    pub fn train<O, R>(&mut self, options: TrainOptions, observer: &mut O, rng: &mut R) -> Result<History>
    where
        O: ProgressObserver + ?Sized,
        R: Rng + ?Sized,
    {
        self.require(Action::Train)?;
        let Some(model) = self.model.as_mut() else {
            return Err(Error::InvalidState {
                action: Action::Train,
                status: self.status,
            });
        };

        let history = Trainer::new(options).fit(
            model,
            self.data.train_features.view(),
            self.data.train_labels.view(),
            observer,
            rng,
        )?;

        if let Some(loss) = history.final_loss() {
            info!("{}: model trained with {:.6} loss", self.feature, loss);
        }
        self.advance(Action::Train);

        Ok(history)
    }

    /// Loss of the model on the test split
    pub fn evaluate(&self) -> Result<f64> {
        let model = self.fitted_model(Action::Evaluate)?;

        evaluate::evaluate(
            model,
            self.data.test_features.view(),
            self.data.test_labels.view(),
        )
    }

    /// Predict the label for a value typed by the user
    pub fn predict(&self, input: &str) -> Result<f64> {
        let model = self.fitted_model(Action::Predict)?;

        predict::predict(input, &self.bounds, model)
    }

    /// The fitted curve over the feature range
    pub fn prediction_curve(&self, steps: usize) -> Result<Vec<Point>> {
        let model = self.fitted_model(Action::Predict)?;

        Ok(predict::prediction_curve(model, &self.bounds, steps))
    }

    /// Persist the trained model and its bounds
    pub fn save(&mut self, store: &ModelStore) -> Result<()> {
        let model = self.fitted_model(Action::Save)?;

        store.save(&self.feature, model, &self.bounds)?;
        self.advance(Action::Save);

        Ok(())
    }

    /// Replace the model with the one stored for this feature.
    /// Returns false if nothing is stored. A failed load leaves the session as it was
    pub fn load(&mut self, store: &ModelStore) -> Result<bool> {
        self.require(Action::Load)?;

        let Some(stored) = store.load(&self.feature, self.config.topology)? else {
            return Ok(false);
        };

        if stored.bounds != self.bounds {
            // The model only makes sense with the bounds it was trained with
            info!("{}: rescaling points with the stored bounds", self.feature);
            self.rescale(stored.bounds)?;
        }

        self.model = Some(stored.model);
        self.advance(Action::Load);

        Ok(true)
    }

    fn rescale(&mut self, bounds: TrainingBounds) -> Result<()> {
        let features = normalize(points::features(&self.points).view(), Some(bounds.feature))?;
        let labels = normalize(points::labels(&self.points).view(), Some(bounds.label))?;

        self.data = DataSplit::new(features.values.view(), labels.values.view());
        self.bounds = bounds;

        Ok(())
    }
}
