// projeto: extratotrain
// file: src/neural/metrics.rs
// Per-epoch training metrics and the in-memory training history

use log::info;
use crate::neural::utils::TrainingError;

#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    pub duration_secs: f64,
}

/// Epoch records of one training run. Lives only as long as the run.
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        TrainingHistory { epochs: Vec::new() }
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        info!(
            "📈 Época {}: loss={:.4} acc={:.4} | val_loss={:.4} val_acc={:.4} | {:.1}s",
            metrics.epoch,
            metrics.loss,
            metrics.accuracy,
            metrics.val_loss,
            metrics.val_accuracy,
            metrics.duration_secs
        );
        self.epochs.push(metrics);
    }

    pub fn best_epoch(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .min_by(|a, b| a.val_loss.total_cmp(&b.val_loss))
    }

    pub fn latest(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn print_summary(&self) {
        let (Some(best), Some(last)) = (self.best_epoch(), self.latest()) else {
            return;
        };
        info!("📊 [Metrics] Training summary:");
        info!("   ├── Epochs: {}", self.epochs.len());
        info!("   ├── Best val_loss: {:.4} (epoch {})", best.val_loss, best.epoch);
        info!("   ├── Final loss / acc: {:.4} / {:.2}%", last.loss, last.accuracy * 100.0);
        info!("   └── Final val_loss / val_acc: {:.4} / {:.2}%", last.val_loss, last.val_accuracy * 100.0);
    }
}

/// Fraction of predictions equal to their target.
pub fn accuracy(predictions: &[usize], targets: &[usize]) -> Result<f64, TrainingError> {
    if predictions.len() != targets.len() {
        return Err(TrainingError::DataProcessing(format!(
            "{} predictions for {} targets",
            predictions.len(),
            targets.len()
        )));
    }
    if predictions.is_empty() {
        return Ok(0.0);
    }
    let correct = predictions.iter().zip(targets).filter(|(p, t)| p == t).count();
    Ok(correct as f64 / predictions.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, val_loss: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            loss: 1.0 / epoch as f64,
            accuracy: 0.5,
            val_loss,
            val_accuracy: 0.4,
            duration_secs: 0.1,
        }
    }

    #[test]
    fn test_history_tracks_best_and_latest() {
        let mut history = TrainingHistory::new();
        assert!(history.epochs.is_empty());
        assert!(history.best_epoch().is_none());

        history.push(epoch(1, 0.9));
        history.push(epoch(2, 0.4));
        history.push(epoch(3, 0.6));

        assert_eq!(history.epochs.len(), 3);
        assert_eq!(history.best_epoch().unwrap().epoch, 2);
        assert_eq!(history.latest().unwrap().epoch, 3);
        history.print_summary();
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 2, 2], &[0, 1, 1, 2]).unwrap(), 0.75);
        assert_eq!(accuracy(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_accuracy_length_mismatch_is_error() {
        assert!(matches!(
            accuracy(&[0, 1], &[0]),
            Err(TrainingError::DataProcessing(_))
        ));
    }
}
