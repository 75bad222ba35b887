pub mod consts;
pub mod error;
pub mod model;
pub mod parsing;
pub mod pipeline;
pub mod plot;
pub mod session;
pub mod storage;

use std::num::NonZeroUsize;

use anyhow::Context;
use clap::Parser;
use model::neural_net::{InitMethod, ModelConfig, Topology, DEFAULT_HIDDEN_UNITS};
use model::optimizer::DEFAULT_LEARNING_RATE;
use model::trainer::{EpochEvent, LogProgress, ProgressObserver, TrainOptions, DEFAULT_EPOCHS};
use model::Model;
use parsing::{housing, HousingData};
use pipeline::points::Point;
use plot::CurveRecorder;
use rand::rngs::StdRng;
use rand::SeedableRng;
use session::Session;
use storage::ModelStore;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The path of the housing dataset (CSV with a header line)
    #[arg(short, long, default_value = consts::DEFAULT_DATA_PATH)]
    data_path: String,

    /// The column to predict the price from
    #[arg(short, long)]
    feature: Option<String>,

    /// Print the columns that can be used as a feature and exit
    #[arg(short, long)]
    list_features: bool,

    /// Layer layout of the network
    #[arg(long, value_enum, default_value_t = Topology::TwoLayer)]
    topology: Topology,

    /// Units of the hidden layer of the two-layer network
    #[arg(long, default_value_t = DEFAULT_HIDDEN_UNITS)]
    hidden_units: usize,

    /// Learning rate of the Adam optimizer
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f64,

    /// Weight initialization method
    #[arg(short, long, value_enum, default_value_t = InitMethod::Xavier)]
    initialization: InitMethod,

    /// Batch size of the network
    #[arg(short, long, default_value = "50")]
    batch_size: NonZeroUsize,

    /// Number of epochs to train the network for
    #[arg(short, long, default_value_t = DEFAULT_EPOCHS)]
    num_epochs: usize,

    /// Fraction of the training rows held out to report a validation loss, 0 to disable
    #[arg(short, long, default_value_t = 0.1)]
    validation_split: f64,

    /// Keep the row order fixed between epochs
    #[arg(long)]
    no_shuffle: bool,

    /// Seed of the random generator, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,

    /// Directory trained models are stored in
    #[arg(short, long, default_value = consts::DEFAULT_MODEL_DIR)]
    model_dir: String,

    /// Prefix of the storage key of a model
    #[arg(long, default_value = consts::STORAGE_ID)]
    storage_id: String,

    /// Load the stored model of the feature instead of training a new one
    #[arg(long)]
    load: bool,

    /// Store the trained model
    #[arg(short, long)]
    save: bool,

    /// Debug mode (save the loss of every epoch as CSV)
    #[arg(long)]
    debug_path: Option<String>,

    /// Save the points and the fitted curve as CSV
    #[arg(short, long)]
    curve_path: Option<String>,

    /// Whether or not to export the model's weights
    /// Weights are exported in JSON format
    #[arg(short, long)]
    weight_path: Option<String>,

    /// Feature values to predict the price of
    #[arg(short, long)]
    predict: Vec<String>,
}

impl Args {
    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            topology: self.topology,
            hidden_units: self.hidden_units,
            learning_rate: self.learning_rate,
            init_method: self.initialization,
        }
    }

    fn train_options(&self) -> TrainOptions {
        TrainOptions {
            batch_size: self.batch_size,
            epochs: self.num_epochs,
            validation_split: (self.validation_split > 0.0).then_some(self.validation_split),
            shuffle: !self.no_shuffle,
        }
    }
}

fn print_features(data: &HousingData) {
    println!("Available features:");

    for feature in data.available_features() {
        println!("  {}", feature);
    }
}

/// Train a fresh model, reporting every epoch. Returns the curve fitted in the last epoch
fn train(session: &mut Session, args: &Args, rng: &mut StdRng) -> anyhow::Result<Vec<Point>> {
    session.initialize(rng)?;

    let mut curve = CurveRecorder::new(*session.bounds(), consts::CURVE_STEPS);
    let mut observer = |event: &EpochEvent, model: &dyn Model| {
        LogProgress.on_epoch_end(event, model);
        curve.on_epoch_end(event, model);
    };
    let history = session.train(args.train_options(), &mut observer, rng)?;

    if let Some(loss) = history.final_loss() {
        println!("Model trained with {:.6} loss", loss);
    }
    if let Some(loss) = history.final_validation_loss() {
        println!("Validation loss: {:.6}", loss);
    }

    if let Some(debug_path) = &args.debug_path {
        history
            .write_csv(debug_path)
            .with_context(|| format!("writing losses to {}", debug_path))?;
    }

    Ok(curve.curve)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let data = housing::parse_dataset(&args.data_path)
        .with_context(|| format!("loading {}", args.data_path))?;

    let feature = match &args.feature {
        Some(feature) if !args.list_features => feature.clone(),
        _ => {
            print_features(&data);
            return Ok(());
        }
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let store = ModelStore::new(&args.model_dir, &args.storage_id);
    let mut session = Session::new(&data, &feature, args.model_config(), &mut rng)?;

    let fitted = if args.load {
        if !session.load(&store)? {
            return Err(error::Error::ModelNotFound(store.key(&feature)).into());
        }
        println!("Loaded model from {}", store.path(&feature).display());
        None
    } else {
        if store.contains(&feature) {
            println!("A stored model exists for {}, run with --load to use it", feature);
        }
        Some(train(&mut session, &args, &mut rng)?)
    };

    println!("Test loss: {:.6}", session.evaluate()?);

    if args.save && !args.load {
        // The model in memory stays usable when saving fails
        match session.save(&store) {
            Ok(()) => println!("Model saved to {}", store.path(&feature).display()),
            Err(err) => eprintln!("Failed to save model: {}", err),
        }
    }

    if let Some(curve_path) = &args.curve_path {
        let curve = match fitted {
            Some(curve) => curve,
            None => session.prediction_curve(consts::CURVE_STEPS)?,
        };
        plot::write_curve(curve_path, &feature, session.points(), &curve)
            .with_context(|| format!("writing curve to {}", curve_path))?;
    }

    if let (Some(weight_path), Some(model)) = (&args.weight_path, session.model()) {
        storage::export_weights(weight_path, model)
            .with_context(|| format!("writing weights to {}", weight_path))?;
    }

    for input in &args.predict {
        match session.predict(input) {
            Ok(price) => println!("Predicted {} for {} = {}: {:.0}", consts::LABEL_NAME, feature, input.trim(), price),
            Err(error::Error::InvalidInput(_)) => println!("{}: invalid input", input),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
