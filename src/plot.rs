//! Plot data for an external charting tool: the actual points of a feature next
//! to the curve the model fits through them.

use std::fs::File;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::model::trainer::{EpochEvent, ProgressObserver};
use crate::model::Model;
use crate::pipeline::normalize::TrainingBounds;
use crate::pipeline::points::Point;
use crate::pipeline::predict::prediction_curve;

/// Name of the fitted series
pub const PREDICTED_SERIES: &str = "predicted";

#[derive(Serialize)]
struct Row<'a> {
    series: &'a str,
    x: f64,
    y: f64,
}

/// Write both series as CSV with a `series,x,y` header.
/// The actual points are labeled with the feature name
pub fn write_curve<P: AsRef<Path>>(
    path: P,
    feature: &str,
    points: &[Point],
    curve: &[Point],
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);

    let series = points
        .iter()
        .map(|p| (feature, p))
        .chain(curve.iter().map(|p| (PREDICTED_SERIES, p)));
    for (series, point) in series {
        writer.serialize(Row {
            series,
            x: point.x,
            y: point.y,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Redraws the fitted curve after every epoch, keeping the latest one
pub struct CurveRecorder {
    bounds: TrainingBounds,
    steps: usize,
    pub curve: Vec<Point>,
}

impl CurveRecorder {
    pub fn new(bounds: TrainingBounds, steps: usize) -> CurveRecorder {
        CurveRecorder {
            bounds,
            steps,
            curve: vec![],
        }
    }
}

impl ProgressObserver for CurveRecorder {
    fn on_epoch_end(&mut self, event: &EpochEvent, model: &dyn Model) {
        self.curve = prediction_curve(model, &self.bounds, self.steps);

        if let (Some(first), Some(last)) = (self.curve.first(), self.curve.last()) {
            debug!(
                "epoch {}: fit runs from ({:.1}, {:.1}) to ({:.1}, {:.1})",
                event.epoch, first.x, first.y, last.x, last.y
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::neural_net::{NeuralNet, Topology};
    use crate::pipeline::normalize::Bounds;
    use ndarray::array;

    #[test]
    fn test_write_curve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.csv");
        let points = [Point { x: 1180.0, y: 221900.0 }];
        let curve = [Point { x: 290.0, y: 75000.0 }, Point { x: 13540.0, y: 7700000.0 }];

        write_curve(&path, "sqft_living", &points, &curve).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "series,x,y\nsqft_living,1180.0,221900.0\npredicted,290.0,75000.0\npredicted,13540.0,7700000.0\n"
        );
    }

    #[test]
    fn test_recorder_keeps_latest_curve() {
        let bounds = TrainingBounds {
            feature: Bounds::new(10.0, 0.0),
            label: Bounds::new(100.0, 0.0),
        };
        let model = NeuralNet::from_layers(
            Topology::SingleLayer,
            vec![(array![[0.0]], array![0.0])],
            0.001,
        )
        .unwrap();
        let mut recorder = CurveRecorder::new(bounds, 5);
        let event = EpochEvent {
            epoch: 1,
            train_loss: 0.1,
            validation_loss: None,
        };

        recorder.on_epoch_end(&event, &model);

        assert_eq!(recorder.curve.len(), 5);
        assert!(recorder.curve.iter().all(|p| p.y == 50.0));
        assert_eq!(recorder.curve[4].x, 10.0);
    }
}
