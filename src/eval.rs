//! Prediction scoring against ground-truth positions.

use crate::labels::{LabelStore, Position};
use crate::sequence::Label;

/// Score one predicted position against the truth. Higher is better for
/// accuracies; metrics like distance invert that, callers know which.
pub type Metric = Box<dyn Fn(Position, Position) -> f64>;

fn ell_inf(a: Position, b: Position) -> f64 {
    f64::from((a.x - b.x).abs().max((a.y - b.y).abs()))
}

/// Banded accuracy on the L-infinity distance: 1.0 within `small`, 0.5
/// within `big`, else 0.0.
pub fn ell_inf_accuracy(small: f64, big: f64) -> Metric {
    Box::new(move |truth, predicted| {
        let distance = ell_inf(truth, predicted);
        if distance <= small {
            1.0
        } else if distance <= big {
            0.5
        } else {
            0.0
        }
    })
}

/// Manhattan distance between truth and prediction.
pub fn manhattan_distance() -> Metric {
    Box::new(|truth, predicted| {
        f64::from((truth.x - predicted.x).abs() + (truth.y - predicted.y).abs())
    })
}

/// Mean metric value over the labels present in both stores. Returns the
/// number of labels compared and the mean; an empty intersection scores
/// (0, 0.0).
pub fn evaluate(truth: &LabelStore, predicted: &LabelStore, metric: &Metric) -> (usize, f64) {
    let common: Vec<Label> = truth.common_labels(predicted);
    if common.is_empty() {
        return (0, 0.0);
    }
    let mut total = 0.0;
    for label in &common {
        if let (Some(t), Some(p)) = (truth.get(*label), predicted.get(*label)) {
            total += metric(t, p);
        }
    }
    (common.len(), total / common.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(Label, f32, f32)]) -> LabelStore {
        entries
            .iter()
            .map(|(label, x, y)| (*label, Position::new(*x, *y)))
            .collect()
    }

    #[test]
    fn accuracy_bands_on_ell_inf_distance() {
        let metric = ell_inf_accuracy(10.0, 20.0);
        let origin = Position::new(0.0, 0.0);
        assert_eq!(metric(origin, Position::new(5.0, 9.0)), 1.0);
        assert_eq!(metric(origin, Position::new(15.0, 3.0)), 0.5);
        assert_eq!(metric(origin, Position::new(0.0, 25.0)), 0.0);
    }

    #[test]
    fn manhattan_sums_absolute_components() {
        let metric = manhattan_distance();
        // opposite signs must not cancel
        let d = metric(Position::new(0.0, 0.0), Position::new(3.0, -4.0));
        assert_eq!(d, 7.0);
    }

    #[test]
    fn evaluate_means_over_the_intersection() {
        let truth = store(&[(0, 0.0, 0.0), (1, 10.0, 10.0), (2, 5.0, 5.0)]);
        let predicted = store(&[(0, 1.0, 1.0), (1, 50.0, 50.0)]);
        let metric = ell_inf_accuracy(2.0, 4.0);
        let (compared, score) = evaluate(&truth, &predicted, &metric);
        assert_eq!(compared, 2);
        assert_eq!(score, 0.5);
    }

    #[test]
    fn empty_intersection_scores_zero() {
        let truth = store(&[(0, 0.0, 0.0)]);
        let predicted = store(&[(9, 0.0, 0.0)]);
        let metric = manhattan_distance();
        assert_eq!(evaluate(&truth, &predicted, &metric), (0, 0.0));
    }
}
