// projeto: extratotrain
// file: src/neural/vectorizer.rs
// Text vectorization: vocabulary learning and fixed-length integer encoding

use log::{debug, info};
use ndarray::Array2;
use std::collections::HashMap;
use crate::neural::utils::TrainingError;

pub const PAD_TOKEN: &str = "";
pub const OOV_TOKEN: &str = "[UNK]";
pub const PAD_ID: usize = 0;
pub const OOV_ID: usize = 1;

const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Debug, Clone)]
pub struct TextVectorizer {
    max_tokens: usize,
    sequence_length: usize,
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
}

impl TextVectorizer {
    pub fn new(max_tokens: usize, sequence_length: usize) -> Result<Self, TrainingError> {
        if max_tokens < 3 {
            return Err(TrainingError::ModelConfiguration(format!(
                "max_tokens must leave room for padding, OOV and at least one token, got {}",
                max_tokens
            )));
        }
        if sequence_length == 0 {
            return Err(TrainingError::ModelConfiguration(
                "sequence_length must be positive".to_string(),
            ));
        }

        let mut vectorizer = TextVectorizer {
            max_tokens,
            sequence_length,
            vocabulary: Vec::new(),
            index: HashMap::new(),
        };
        vectorizer.set_vocabulary(vec![PAD_TOKEN.to_string(), OOV_TOKEN.to_string()]);
        Ok(vectorizer)
    }

    /// Restores a vectorizer from a vocabulary produced by `adapt`.
    pub fn from_vocabulary(
        vocabulary: Vec<String>,
        max_tokens: usize,
        sequence_length: usize,
    ) -> Result<Self, TrainingError> {
        if vocabulary.len() < 2 || vocabulary[PAD_ID] != PAD_TOKEN || vocabulary[OOV_ID] != OOV_TOKEN {
            return Err(TrainingError::ModelConfiguration(
                "Vocabulary must start with the padding and OOV tokens".to_string(),
            ));
        }
        if vocabulary.len() > max_tokens {
            return Err(TrainingError::ModelConfiguration(format!(
                "Vocabulary has {} entries, more than max_tokens {}",
                vocabulary.len(),
                max_tokens
            )));
        }

        let mut vectorizer = Self::new(max_tokens, sequence_length)?;
        vectorizer.set_vocabulary(vocabulary);
        Ok(vectorizer)
    }

    fn set_vocabulary(&mut self, vocabulary: Vec<String>) {
        self.index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();
        self.vocabulary = vocabulary;
    }

    /// Lowercase and remove ASCII punctuation.
    pub fn standardize(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .filter(|c| !PUNCTUATION.contains(*c))
            .collect()
    }

    pub fn tokenize(text: &str) -> Vec<String> {
        Self::standardize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Learns the vocabulary from `texts`. Tokens are ranked by frequency,
    /// ties broken by descending token order, and the list is capped so that
    /// padding + OOV + tokens fit in `max_tokens`.
    pub fn adapt<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<(), TrainingError> {
        if texts.is_empty() {
            return Err(TrainingError::DataProcessing(
                "Cannot adapt the vectorizer on an empty dataset".to_string(),
            ));
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for token in Self::tokenize(text.as_ref()) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|(ta, ca), (tb, cb)| cb.cmp(ca).then_with(|| tb.cmp(ta)));
        let distinct = ranked.len();
        ranked.truncate(self.max_tokens - 2);

        let mut vocabulary = vec![PAD_TOKEN.to_string(), OOV_TOKEN.to_string()];
        vocabulary.extend(ranked.into_iter().map(|(token, _)| token));
        self.set_vocabulary(vocabulary);

        info!(
            "✅ [Vectorizer] Vocabulary learned: {} entries ({} distinct tokens in {} texts)",
            self.vocabulary.len(),
            distinct,
            texts.len()
        );
        Ok(())
    }

    /// Token ids for one text, truncated to `sequence_length` and padded
    /// with zeros at the end.
    pub fn transform(&self, text: &str) -> Vec<usize> {
        let mut ids: Vec<usize> = Self::tokenize(text)
            .iter()
            .take(self.sequence_length)
            .map(|token| self.index.get(token).copied().unwrap_or(OOV_ID))
            .collect();
        ids.resize(self.sequence_length, PAD_ID);
        ids
    }

    pub fn transform_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Array2<usize>, TrainingError> {
        let flat: Vec<usize> = texts
            .iter()
            .flat_map(|text| self.transform(text.as_ref()))
            .collect();
        let batch = Array2::from_shape_vec((texts.len(), self.sequence_length), flat)?;
        debug!("🔢 [Vectorizer] Encoded batch with shape {:?}", batch.dim());
        Ok(batch)
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}
