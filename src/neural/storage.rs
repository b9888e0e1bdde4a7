// projeto: extratotrain
// file: src/neural/storage.rs
// Persistence of the trained classifier and of the label mapping

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use crate::neural::encoder::LabelEncoder;
use crate::neural::model::{ClassifierConfig, ModelWeights, TextClassifier};
use crate::neural::utils::TrainingError;
use crate::neural::vectorizer::TextVectorizer;

/// Everything needed to rebuild the trained model for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub config: ClassifierConfig,
    pub weights: ModelWeights,
    pub vocabulary: Vec<String>,
    pub max_tokens: usize,
    pub sequence_length: usize,
    pub epochs: usize,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(classifier: &TextClassifier, vectorizer: &TextVectorizer, epochs: usize) -> Self {
        ModelArtifact {
            config: classifier.config().clone(),
            weights: classifier.weights().clone(),
            vocabulary: vectorizer.vocabulary().to_vec(),
            max_tokens: vectorizer.max_tokens(),
            sequence_length: vectorizer.sequence_length(),
            epochs,
            trained_at: Utc::now(),
        }
    }

    pub fn into_parts(self) -> Result<(TextClassifier, TextVectorizer), TrainingError> {
        let vectorizer = TextVectorizer::from_vocabulary(self.vocabulary, self.max_tokens, self.sequence_length)?;
        let classifier = TextClassifier::from_weights(self.config, self.weights)?;
        Ok((classifier, vectorizer))
    }
}

pub fn save_model<P: AsRef<Path>>(path: P, artifact: &ModelArtifact) -> Result<(), TrainingError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, artifact)?;
    writer.flush()?;
    info!(
        "💾 [Storage] Model saved to {} ({} classes, {} vocabulary entries)",
        path.display(),
        artifact.config.num_classes,
        artifact.vocabulary.len()
    );
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelArtifact, TrainingError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let artifact: ModelArtifact = serde_json::from_reader(reader)?;
    info!("📂 [Storage] Model loaded from {} (trained at {})", path.display(), artifact.trained_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(artifact)
}

pub fn save_label_encoder<P: AsRef<Path>>(path: P, encoder: &LabelEncoder) -> Result<(), TrainingError> {
    let path = path.as_ref();
    let bytes = bincode::serde::encode_to_vec(encoder, bincode::config::standard())
        .map_err(|e| TrainingError::Serialization(format!("Failed to encode label mapping: {}", e)))?;
    std::fs::write(path, bytes)?;
    info!("💾 [Storage] Label mapping with {} classes saved to {}", encoder.num_classes(), path.display());
    Ok(())
}

pub fn load_label_encoder<P: AsRef<Path>>(path: P) -> Result<LabelEncoder, TrainingError> {
    let bytes = std::fs::read(path.as_ref())?;
    let (encoder, _): (LabelEncoder, usize) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
        .map_err(|e| TrainingError::Serialization(format!("Failed to decode label mapping: {}", e)))?;
    Ok(encoder.restore())
}
