use log::debug;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::consts::LABEL_NAME;
use crate::parsing::Record;

/// A feature value and the price it was paired with
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Pair the selected feature of every record with its price.
/// Records missing either value are skipped. An odd number of points loses its
/// last point, then the points are shuffled once
pub fn extract_points<R: Rng + ?Sized>(records: &[Record], feature: &str, rng: &mut R) -> Vec<Point> {
    let mut points: Vec<Point> = records
        .iter()
        .filter_map(|record| {
            let x = *record.get(feature)?;
            let y = *record.get(LABEL_NAME)?;

            Some(Point { x, y })
        })
        .collect();

    if points.len() % 2 != 0 {
        points.pop();
    }

    points.shuffle(rng);
    debug!("extracted {} points for {}", points.len(), feature);

    points
}

/// The feature column of the points
pub fn features(points: &[Point]) -> Array1<f64> {
    points.iter().map(|p| p.x).collect()
}

/// The label column of the points
pub fn labels(points: &[Point]) -> Array1<f64> {
    points.iter().map(|p| p.y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::from([
                    ("sqft_living".to_string(), i as f64),
                    ("price".to_string(), 1000.0 * i as f64),
                ])
            })
            .collect()
    }

    #[test]
    fn test_odd_count_drops_last() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = extract_points(&records(7), "sqft_living", &mut rng);

        assert_eq!(points.len(), 6);
        // The last record (x = 6) is the one dropped
        assert!(points.iter().all(|p| p.x != 6.0));
    }

    #[test]
    fn test_pairs_survive_shuffle() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = extract_points(&records(40), "sqft_living", &mut rng);

        assert_eq!(points.len(), 40);
        assert!(points.iter().all(|p| p.y == 1000.0 * p.x));

        let mut xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        xs.sort_by(f64::total_cmp);
        assert_eq!(xs, (0..40).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(extract_points(&[], "sqft_living", &mut rng).is_empty());
    }

    #[test]
    fn test_records_without_feature_are_skipped() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut rows = records(4);
        rows[2].remove("sqft_living");

        // 3 usable points, rounded down to 2
        let points = extract_points(&rows, "sqft_living", &mut rng);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_columns() {
        let points = [Point { x: 1.0, y: 10.0 }, Point { x: 2.0, y: 20.0 }];

        assert_eq!(features(&points).to_vec(), vec![1.0, 2.0]);
        assert_eq!(labels(&points).to_vec(), vec![10.0, 20.0]);
    }
}
