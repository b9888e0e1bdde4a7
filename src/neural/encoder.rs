// projeto: extratotrain
// file: src/neural/encoder.rs
// Label encoding for the financial category target

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use crate::neural::utils::TrainingError;

/// Bijection between category names and `0..K`. Classes are kept sorted,
/// so the code of a label only depends on the set of labels seen in `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self, TrainingError> {
        if labels.is_empty() {
            return Err(TrainingError::DataProcessing(
                "Cannot fit a label encoder on an empty label column".to_string(),
            ));
        }

        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self::from_classes(classes))
    }

    pub fn fit_transform<S: AsRef<str>>(labels: &[S]) -> Result<(Self, Vec<usize>), TrainingError> {
        let encoder = Self::fit(labels)?;
        let codes = encoder.transform(labels)?;
        Ok((encoder, codes))
    }

    fn from_classes(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        LabelEncoder { classes, index }
    }

    /// Rebuilds the lookup table after deserialization.
    pub fn restore(self) -> Self {
        Self::from_classes(self.classes)
    }

    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, TrainingError> {
        labels
            .iter()
            .map(|label| {
                self.index.get(label.as_ref()).copied().ok_or_else(|| {
                    TrainingError::DataProcessing(format!("Unknown label: '{}'", label.as_ref()))
                })
            })
            .collect()
    }

    pub fn inverse_transform(&self, codes: &[usize]) -> Result<Vec<String>, TrainingError> {
        codes
            .iter()
            .map(|&code| {
                self.classes.get(code).cloned().ok_or_else(|| {
                    TrainingError::DataProcessing(format!(
                        "Label code {} out of range 0..{}",
                        code,
                        self.classes.len()
                    ))
                })
            })
            .collect()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_are_sorted_and_dense() {
        let labels = ["Receita", "Alimentação", "Lazer", "Alimentação", "Receita"];
        let (encoder, codes) = LabelEncoder::fit_transform(&labels).unwrap();

        assert_eq!(encoder.classes(), &["Alimentação", "Lazer", "Receita"]);
        assert_eq!(encoder.num_classes(), 3);
        assert_eq!(codes, vec![2, 0, 1, 0, 2]);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let labels = ["b", "a", "c", "a"];
        let encoder = LabelEncoder::fit(&labels).unwrap();
        let codes = encoder.transform(&labels).unwrap();
        let decoded = encoder.inverse_transform(&codes).unwrap();
        assert_eq!(decoded, labels);
    }

    #[test]
    fn test_unknown_inputs_are_errors() {
        let encoder = LabelEncoder::fit(&["x", "y"]).unwrap();
        assert!(encoder.transform(&["z"]).is_err());
        assert!(encoder.inverse_transform(&[2]).is_err());
        assert!(LabelEncoder::fit::<&str>(&[]).is_err());
    }

    #[test]
    fn test_restore_after_serde() {
        let encoder = LabelEncoder::fit(&["Lazer", "Receita"]).unwrap();
        let json = serde_json::to_string(&encoder).unwrap();
        let restored = serde_json::from_str::<LabelEncoder>(&json).unwrap().restore();
        assert_eq!(restored, encoder);
        assert_eq!(restored.transform(&["Receita"]).unwrap(), vec![1]);
    }
}
