use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;

use log::{debug, info};
use ndarray::{s, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::Model;
use crate::error::{Error, Result};

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(size) => size,
    None => unreachable!(),
};

pub const DEFAULT_EPOCHS: usize = 50;

/// Hyperparameters of one training run
#[derive(Clone, Debug)]
pub struct TrainOptions {
    pub batch_size: NonZeroUsize,
    pub epochs: usize,
    /// Fraction of the training rows held out to report a validation loss
    pub validation_split: Option<f64>,
    /// Reorder the rows before every epoch
    pub shuffle: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            epochs: DEFAULT_EPOCHS,
            validation_split: None,
            shuffle: true,
        }
    }
}

/// Losses at the end of an epoch. Epochs count from 1
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct EpochEvent {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

/// Receives an event after every epoch. Observers only look at the model
pub trait ProgressObserver {
    fn on_epoch_end(&mut self, event: &EpochEvent, model: &dyn Model);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&EpochEvent, &dyn Model),
{
    fn on_epoch_end(&mut self, event: &EpochEvent, model: &dyn Model) {
        self(event, model)
    }
}

/// Discards every event
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_epoch_end(&mut self, _: &EpochEvent, _: &dyn Model) {}
}

/// Logs every epoch's losses
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_epoch_end(&mut self, event: &EpochEvent, _: &dyn Model) {
        match event.validation_loss {
            Some(validation_loss) => info!(
                "epoch {}: loss {:.6}, validation loss {:.6}",
                event.epoch, event.train_loss, validation_loss
            ),
            None => info!("epoch {}: loss {:.6}", event.epoch, event.train_loss),
        }
    }
}

/// The losses of every epoch of a run
#[derive(Clone, Debug, Default)]
pub struct History {
    pub events: Vec<EpochEvent>,
}

impl History {
    pub fn final_loss(&self) -> Option<f64> {
        self.events.last().map(|event| event.train_loss)
    }

    pub fn final_validation_loss(&self) -> Option<f64> {
        self.events.last().and_then(|event| event.validation_loss)
    }

    /// Write the losses as CSV with an `epoch,train_loss,validation_loss` header
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);

        for event in &self.events {
            writer.serialize(event)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Runs mini-batch training of a model
pub struct Trainer {
    pub options: TrainOptions,
}

impl Trainer {
    pub fn new(options: TrainOptions) -> Trainer {
        Trainer { options }
    }

    /// Number of rows kept for fitting out of `n`: `floor(n * (1 - split))`.
    /// The remaining trailing rows are for validation
    fn fitting_rows(&self, n: usize) -> Result<usize> {
        match self.options.validation_split {
            None => Ok(n),
            Some(split) if split > 0.0 && split < 1.0 => {
                let rows = (n as f64 * (1.0 - split)).floor() as usize;

                if rows == 0 {
                    Err(Error::EmptyData { stage: "fit after the validation split" })
                } else {
                    Ok(rows)
                }
            }
            Some(split) => Err(Error::InvalidValidationSplit(split)),
        }
    }

    /// Train the model for the configured number of epochs on normalized columns.
    /// The rows after the fitting rows are only used for the validation loss
    pub fn fit<M, O, R>(
        &self,
        model: &mut M,
        features: ArrayView1<f64>,
        labels: ArrayView1<f64>,
        observer: &mut O,
        rng: &mut R,
    ) -> Result<History>
    where
        M: Model,
        O: ProgressObserver + ?Sized,
        R: Rng + ?Sized,
    {
        if features.len() != labels.len() {
            return Err(Error::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(Error::EmptyData { stage: "fit" });
        }
        if self.options.epochs == 0 {
            return Err(Error::NoEpochs);
        }

        let rows = self.fitting_rows(features.len())?;
        let inputs = as_column(features.slice(s![..rows]));
        let targets = as_column(labels.slice(s![..rows]));
        let validation = (rows < features.len()).then(|| {
            (
                as_column(features.slice(s![rows..])),
                as_column(labels.slice(s![rows..])),
            )
        });

        info!(
            "training on {} rows ({} held out for validation) for {} epochs",
            rows,
            features.len() - rows,
            self.options.epochs
        );

        let batch_size = self.options.batch_size.get();
        let mut order: Vec<usize> = (0..rows).collect();
        let mut history = History::default();

        for epoch in 1..=self.options.epochs {
            if self.options.shuffle {
                order.shuffle(rng);
            }

            let mut total = 0f64;
            for batch in order.chunks(batch_size) {
                let input_batch = inputs.select(Axis(0), batch);
                let target_batch = targets.select(Axis(0), batch);

                // Weighted by size so a short last batch counts less
                total += model.train_batch(&input_batch.view(), &target_batch.view()) * batch.len() as f64;
            }

            let event = EpochEvent {
                epoch,
                train_loss: total / rows as f64,
                validation_loss: validation
                    .as_ref()
                    .map(|(x, y)| model.evaluate(&x.view(), &y.view())),
            };

            debug!("{:?}", event);
            observer.on_epoch_end(&event, &*model);
            history.events.push(event);
        }

        Ok(history)
    }
}

/// An (n, 1) matrix of the values
pub fn as_column(values: ArrayView1<f64>) -> Array2<f64> {
    values.to_owned().insert_axis(Axis(1))
}
