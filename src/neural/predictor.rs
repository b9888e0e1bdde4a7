// projeto: extratotrain
// file: src/neural/predictor.rs
// Category prediction from the persisted model and label mapping

use log::{debug, info};
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use std::path::Path;
use crate::neural::data::TransactionRecord;
use crate::neural::encoder::LabelEncoder;
use crate::neural::model::TextClassifier;
use crate::neural::storage::{load_label_encoder, load_model};
use crate::neural::utils::TrainingError;
use crate::neural::vectorizer::TextVectorizer;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category: String,
    pub probability: f64,
}

pub struct CategoryPredictor {
    classifier: TextClassifier,
    vectorizer: TextVectorizer,
    label_encoder: LabelEncoder,
}

impl CategoryPredictor {
    pub fn new(
        classifier: TextClassifier,
        vectorizer: TextVectorizer,
        label_encoder: LabelEncoder,
    ) -> Result<Self, TrainingError> {
        if classifier.num_classes() != label_encoder.num_classes() {
            return Err(TrainingError::ModelConfiguration(format!(
                "Model predicts {} classes but the label mapping has {}",
                classifier.num_classes(),
                label_encoder.num_classes()
            )));
        }
        Ok(CategoryPredictor { classifier, vectorizer, label_encoder })
    }

    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, label_encoder_path: Q) -> Result<Self, TrainingError> {
        let (classifier, vectorizer) = load_model(model_path)?.into_parts()?;
        let label_encoder = load_label_encoder(label_encoder_path)?;
        info!("🔮 [Predictor] Ready with {} categories", label_encoder.num_classes());
        Self::new(classifier, vectorizer, label_encoder)
    }

    /// Most likely category of a feature text and its probability.
    pub fn predict(&self, text: &str) -> Result<Prediction, TrainingError> {
        let tokens = Array1::from(self.vectorizer.transform(text));
        let probs = self.classifier.predict_proba(tokens.view())?;
        let code = probs
            .argmax()
            .map_err(|e| TrainingError::Training(format!("Cannot take argmax of probabilities: {}", e)))?;
        let category = self
            .label_encoder
            .inverse_transform(&[code])?
            .into_iter()
            .next()
            .unwrap_or_default();
        debug!("🔮 [Predictor] '{}' → {} ({:.3})", text, category, probs[code]);
        Ok(Prediction { category, probability: probs[code] })
    }

    pub fn predict_record(&self, record: &TransactionRecord) -> Result<Prediction, TrainingError> {
        self.predict(&record.feature_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::config::TrainingConfig;
    use crate::neural::pipeline::tests::synthetic_records;
    use crate::neural::pipeline::{persist, train_from_records};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_predictor_from_persisted_files() {
        let records = synthetic_records();
        let config = TrainingConfig {
            max_tokens: 100,
            sequence_length: 10,
            epochs: 2,
            ..TrainingConfig::default()
        };
        let outcome = train_from_records(&records, &config).unwrap();

        let dir = std::env::temp_dir().join(format!("extratotrain_predictor_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let model_path = dir.join("model.json");
        let label_path = dir.join("labels.bin");
        persist(&outcome, &model_path, &label_path).unwrap();

        let predictor = CategoryPredictor::load(&model_path, &label_path).unwrap();
        for record in &records {
            let prediction = predictor.predict_record(record).unwrap();
            assert!(outcome.label_encoder.classes().contains(&prediction.category));
            assert!(prediction.probability > 0.0 && prediction.probability <= 1.0);

            let text = record.feature_text();
            let tokens = Array1::from(outcome.vectorizer.transform(&text));
            let probs = outcome.classifier.predict_proba(tokens.view()).unwrap();
            assert!((probs.iter().cloned().fold(f64::MIN, f64::max) - prediction.probability).abs() < 1e-9);
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_class_count_mismatch_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let config = crate::neural::model::ClassifierConfig {
            vocab_size: 10,
            embedding_dim: 2,
            lstm_units: vec![2],
            dense_units: 2,
            num_classes: 2,
        };
        let classifier = TextClassifier::new(config, &mut rng).unwrap();
        let vectorizer = TextVectorizer::new(10, 4).unwrap();
        let labels = LabelEncoder::fit(&["a", "b", "c"]).unwrap();
        assert!(CategoryPredictor::new(classifier, vectorizer, labels).is_err());
    }
}
