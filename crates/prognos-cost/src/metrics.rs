//! Holdout regression metrics.

/// Mean absolute error and coefficient of determination on held-out rows.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RegressionMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// R² score; 1.0 is a perfect fit, 0.0 matches predicting the mean.
    pub r2: f64,
}

impl RegressionMetrics {
    /// Score `predicted` against `actual`. Both must be non-empty and equally long.
    pub(crate) fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len() as f64;
        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;
        let mean = actual.iter().sum::<f64>() / n;
        let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
        Self { mae, r2 }
    }
}

#[cfg(test)]
mod tests {
    use super::RegressionMetrics;

    #[test]
    fn perfect_prediction() {
        let m = RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(m.mae.abs() < 1e-12);
        assert!((m.r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let m = RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]);
        assert!((m.mae - 2.0 / 3.0).abs() < 1e-12);
        assert!(m.r2.abs() < 1e-12);
    }
}
