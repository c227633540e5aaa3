use tracing::info;

/// Binary classification metrics computed from confusion counts.
///
/// Mirrors the usual scikit-learn definitions: `balanced_accuracy` is the
/// chance-adjusted variant ((recall_pos + recall_neg) / 2 rescaled so that
/// random guessing scores 0 and perfect prediction scores 1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryMetrics {
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub matthews_corrcoef: f64,
    pub cohen_kappa: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ConfusionCounts {
    tp: f64,
    tn: f64,
    fp: f64,
    fn_: f64,
}

impl ConfusionCounts {
    fn from_labels(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => counts.tp += 1.0,
                (false, false) => counts.tn += 1.0,
                (false, true) => counts.fp += 1.0,
                (true, false) => counts.fn_ += 1.0,
            }
        }
        counts
    }

    fn total(&self) -> f64 {
        self.tp + self.tn + self.fp + self.fn_
    }
}

impl BinaryMetrics {
    /// Computes all metrics from true labels and predicted probabilities.
    /// Probabilities are rounded at 0.5.
    pub fn from_predictions(y_true: &[f64], y_pred_proba: &[f64]) -> Self {
        let c = ConfusionCounts::from_labels(y_true, y_pred_proba);
        let n = c.total();
        if n == 0.0 {
            return Self::default();
        }

        let accuracy = (c.tp + c.tn) / n;

        let recall_pos = ratio(c.tp, c.tp + c.fn_);
        let recall_neg = ratio(c.tn, c.tn + c.fp);
        let balanced = (recall_pos + recall_neg) / 2.0;
        // Adjusted for chance: 0.5 (coin flip) maps to 0.0.
        let balanced_accuracy = 2.0 * balanced - 1.0;

        let mcc_denom = ((c.tp + c.fp) * (c.tp + c.fn_) * (c.tn + c.fp) * (c.tn + c.fn_)).sqrt();
        let matthews_corrcoef = if mcc_denom == 0.0 {
            0.0
        } else {
            (c.tp * c.tn - c.fp * c.fn_) / mcc_denom
        };

        let p_expected =
            ((c.tp + c.fp) * (c.tp + c.fn_) + (c.tn + c.fn_) * (c.tn + c.fp)) / (n * n);
        let cohen_kappa = if (1.0 - p_expected).abs() < f64::EPSILON {
            0.0
        } else {
            (accuracy - p_expected) / (1.0 - p_expected)
        };

        Self {
            accuracy,
            balanced_accuracy,
            matthews_corrcoef,
            cohen_kappa,
        }
    }
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom == 0.0 { 0.0 } else { num / denom }
}

/// Evaluation callback for the backtester: computes the binary metrics over
/// true labels and predicted probabilities and logs a one-line summary.
pub fn evaluate_binary(y_true: &[f64], y_pred_proba: &[f64]) -> BinaryMetrics {
    let metrics = BinaryMetrics::from_predictions(y_true, y_pred_proba);
    info!(
        samples = y_true.len(),
        accuracy = format!("{:.3}", metrics.accuracy),
        balanced_accuracy = format!("{:.3}", metrics.balanced_accuracy),
        matthews_corrcoef = format!("{:.3}", metrics.matthews_corrcoef),
        cohen_kappa = format!("{:.3}", metrics.cohen_kappa),
        "evaluation"
    );
    metrics
}
