use std::collections::HashSet;

/// Root mean squared error over paired predictions and targets.
///
/// Accumulates in f64 so long evaluation runs do not lose precision.
pub fn rmse(predictions: &[f32], targets: &[f32]) -> f64 {
    let n = predictions.len().min(targets.len());
    if n == 0 {
        return 0.0;
    }

    let sum_squared: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| {
            let diff = (*p - *t) as f64;
            diff * diff
        })
        .sum();

    (sum_squared / n as f64).sqrt()
}

/// Mean absolute error over paired predictions and targets.
pub fn mae(predictions: &[f32], targets: &[f32]) -> f64 {
    let n = predictions.len().min(targets.len());
    if n == 0 {
        return 0.0;
    }

    let sum_abs: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| ((*p - *t) as f64).abs())
        .sum();

    sum_abs / n as f64
}

/// Ranking quality metrics at a fixed cutoff.
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    k: usize,
}

impl MetricsCalculator {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn calculate_precision_at_k(&self, recommended: &[String], relevant: &[String]) -> f64 {
        if recommended.is_empty() || self.k == 0 {
            return 0.0;
        }

        let relevant_set: HashSet<_> = relevant.iter().collect();
        let relevant_recommended = recommended
            .iter()
            .take(self.k)
            .filter(|item| relevant_set.contains(item))
            .count();

        relevant_recommended as f64 / self.k.min(recommended.len()) as f64
    }

    pub fn calculate_recall_at_k(&self, recommended: &[String], relevant: &[String]) -> f64 {
        if relevant.is_empty() {
            return 0.0;
        }

        let relevant_set: HashSet<_> = relevant.iter().collect();
        let relevant_recommended = recommended
            .iter()
            .take(self.k)
            .filter(|item| relevant_set.contains(item))
            .count();

        relevant_recommended as f64 / relevant.len() as f64
    }

    pub fn calculate_f1_score(&self, precision: f64, recall: f64) -> f64 {
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}
