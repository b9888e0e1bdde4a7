// projeto: extratotrain
// file: src/neural/pipeline.rs
// Training procedure: features → labels → split → vectorize → fit → persist

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use crate::neural::config::TrainingConfig;
use crate::neural::data::{build_features, train_test_split, TransactionRecord};
use crate::neural::encoder::LabelEncoder;
use crate::neural::metrics::{accuracy, TrainingHistory};
use crate::neural::model::{ClassifierConfig, TextClassifier};
use crate::neural::storage::{save_label_encoder, save_model, ModelArtifact};
use crate::neural::utils::TrainingError;
use crate::neural::vectorizer::TextVectorizer;

pub struct TrainingOutcome {
    pub classifier: TextClassifier,
    pub vectorizer: TextVectorizer,
    pub label_encoder: LabelEncoder,
    pub history: TrainingHistory,
    pub epochs: usize,
    pub validation_loss: f64,
    pub validation_accuracy: f64,
}

pub fn train_from_records(
    records: &[TransactionRecord],
    config: &TrainingConfig,
) -> Result<TrainingOutcome, TrainingError> {
    let samples = build_features(records)?;
    let texts: Vec<String> = samples.iter().map(|s| s.text.clone()).collect();
    let labels: Vec<&str> = samples.iter().map(|s| s.label.as_str()).collect();

    let (label_encoder, codes) = LabelEncoder::fit_transform(&labels)?;
    info!("🏷️ [Pipeline] {} categories: {:?}", label_encoder.num_classes(), label_encoder.classes());
    if label_encoder.num_classes() == 1 {
        warn!("⚠️ [Pipeline] Only one category in the data, the classifier cannot learn anything useful");
    }

    let split = train_test_split(&texts, &codes, config.test_size, config.seed)?;
    info!(
        "✂️ [Pipeline] Split: {} train / {} test (seed {})",
        split.train_texts.len(),
        split.test_texts.len(),
        config.seed
    );

    let mut vectorizer = TextVectorizer::new(config.max_tokens, config.sequence_length)?;
    vectorizer.adapt(&split.train_texts)?;
    let train_x = vectorizer.transform_batch(&split.train_texts)?;
    let test_x = vectorizer.transform_batch(&split.test_texts)?;

    let classifier_config = ClassifierConfig {
        vocab_size: config.max_tokens,
        embedding_dim: config.embedding_dim,
        lstm_units: config.lstm_units.clone(),
        dense_units: config.dense_units,
        num_classes: label_encoder.num_classes(),
    };
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut classifier = TextClassifier::new(classifier_config, &mut rng)?;

    warn!("⚠️ [Pipeline] The test split is also used as validation data; its metrics are not an independent test score");
    let history = classifier.fit(
        &train_x,
        &split.train_labels,
        &test_x,
        &split.test_labels,
        config.epochs,
        config.batch_size,
        config.learning_rate,
        &mut rng,
    )?;
    history.print_summary();

    let (validation_loss, validation_accuracy) = classifier.evaluate(&test_x, &split.test_labels)?;
    info!(
        "🎯 [Pipeline] Validation metrics: loss={:.4} accuracy={:.2}%",
        validation_loss,
        validation_accuracy * 100.0
    );

    let predictions = classifier.predict_batch(&test_x)?;
    for (code, class) in label_encoder.classes().iter().enumerate() {
        let (preds, targets): (Vec<usize>, Vec<usize>) = predictions
            .iter()
            .zip(&split.test_labels)
            .filter(|&(_, &target)| target == code)
            .map(|(&p, &t)| (p, t))
            .unzip();
        if !targets.is_empty() {
            debug!("   {} → {:.2}% of {} samples", class, accuracy(&preds, &targets)? * 100.0, targets.len());
        }
    }

    Ok(TrainingOutcome {
        classifier,
        vectorizer,
        label_encoder,
        history,
        epochs: config.epochs,
        validation_loss,
        validation_accuracy,
    })
}

/// Writes the model artifact and the label mapping. Existing files are
/// overwritten.
pub fn persist<P: AsRef<Path>, Q: AsRef<Path>>(
    outcome: &TrainingOutcome,
    model_path: P,
    label_encoder_path: Q,
) -> Result<(), TrainingError> {
    let artifact = ModelArtifact::new(&outcome.classifier, &outcome.vectorizer, outcome.epochs);
    save_model(model_path, &artifact)?;
    save_label_encoder(label_encoder_path, &outcome.label_encoder)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::neural::data::{select_records, RawTable, SELECTED_COLUMNS};
    use crate::neural::storage::{load_label_encoder, load_model};

    pub(crate) fn synthetic_records() -> Vec<TransactionRecord> {
        let rows = [
            ("Débito", "Mercado", "Supermercado Bom Preço", "Compra cartão", "Banco A", "Alimentação"),
            ("Débito", "Mercado", "Padaria Central", "Compra cartão", "Banco A", "Alimentação"),
            ("Débito", "Mercado", "Hortifruti Verde", "Compra débito", "Banco B", "Alimentação"),
            ("Débito", "Restaurante", "Restaurante Sabor", "Almoço", "Banco A", "Alimentação"),
            ("Débito", "Transporte", "Posto Shell", "Combustível", "Banco B", "Transporte"),
            ("Débito", "Transporte", "Uber", "Corrida", "Banco A", "Transporte"),
            ("Débito", "Transporte", "Posto Ipiranga", "Combustível", "Banco A", "Transporte"),
            ("Crédito", "Salário", "Empresa XYZ", "Pagamento mensal", "Banco A", "Receita"),
            ("Crédito", "Salário", "Empresa XYZ", "Adiantamento", "Banco B", "Receita"),
            ("Crédito", "Pix", "João Silva", "Reembolso", "Banco A", "Receita"),
        ];
        rows.iter()
            .enumerate()
            .map(|(i, r)| TransactionRecord {
                date: format!("2024-01-{:02}", i + 1),
                month_year: "01/2024".to_string(),
                operation_type: r.0.to_string(),
                category: r.1.to_string(),
                supplier: r.2.to_string(),
                description: r.3.to_string(),
                institution: r.4.to_string(),
                financial_category: r.5.to_string(),
            })
            .collect()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            max_tokens: 200,
            sequence_length: 12,
            embedding_dim: 8,
            lstm_units: vec![8, 6],
            dense_units: 6,
            epochs: 3,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_persists_three_classes() {
        let records = synthetic_records();
        let outcome = train_from_records(&records, &TrainingConfig::default()).unwrap();
        assert_eq!(outcome.history.epochs.len(), 10);
        assert_eq!(outcome.label_encoder.num_classes(), 3);

        let dir = std::env::temp_dir().join(format!("extratotrain_e2e_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let model_path = dir.join("modelo_classificacao.json");
        let label_path = dir.join("label_encoder.bin");
        persist(&outcome, &model_path, &label_path).unwrap();

        let artifact = load_model(&model_path).unwrap();
        assert_eq!(artifact.config.num_classes, 3);
        assert_eq!(artifact.weights.output_layer.w.nrows(), 3);
        assert_eq!(artifact.weights.embedding.dim(), (5000, 16));
        assert_eq!(artifact.sequence_length, 100);
        assert_eq!(artifact.epochs, 10);

        let labels = load_label_encoder(&label_path).unwrap();
        assert_eq!(labels.classes(), &["Alimentação", "Receita", "Transporte"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_null_rows_never_reach_training() {
        let mut table = RawTable {
            columns: SELECTED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        };
        for record in synthetic_records() {
            table.rows.push(vec![
                Some(record.date),
                Some(record.month_year),
                Some(record.operation_type),
                Some(record.category),
                Some(record.supplier),
                Some(record.description),
                Some(record.institution),
                Some(record.financial_category),
            ]);
        }
        // a null in a feature column removes a whole category
        table.rows.push(vec![
            Some("2024-02-01".to_string()),
            Some("02/2024".to_string()),
            Some("Débito".to_string()),
            None,
            Some("Cinema".to_string()),
            Some("Ingresso".to_string()),
            Some("Banco A".to_string()),
            Some("Lazer".to_string()),
        ]);

        let records = select_records(&table).unwrap();
        let outcome = train_from_records(&records, &small_config()).unwrap();
        assert!(!outcome.label_encoder.classes().iter().any(|c| c == "Lazer"));
        assert_eq!(outcome.classifier.num_classes(), 3);
    }

    #[test]
    fn test_training_is_reproducible() {
        let records = synthetic_records();
        let a = train_from_records(&records, &small_config()).unwrap();
        let b = train_from_records(&records, &small_config()).unwrap();
        assert_eq!(a.vectorizer.vocabulary(), b.vectorizer.vocabulary());
        assert_eq!(a.classifier.weights(), b.classifier.weights());
        assert_eq!(a.validation_loss, b.validation_loss);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            train_from_records(&[], &small_config()),
            Err(TrainingError::DataProcessing(_))
        ));
    }
}
