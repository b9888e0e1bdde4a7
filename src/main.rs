// projeto: extratotrain
// file: src/main.rs
// Treinamento do classificador de categoria financeira a partir da tabela extrato

mod neural;

use chrono::Utc;
use log::{error, info, warn};
use std::time::Instant;

use crate::neural::{
    load_transactions, persist, select_records, train_from_records, CategoryPredictor, Config,
    TrainingError,
};

fn main() {
    setup_logging();

    let start_time = Instant::now();
    info!("🚀 Treinamento do classificador de categorias iniciado");
    info!("🕐 Iniciado em: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));

    let result = run();
    let elapsed = start_time.elapsed();
    match result {
        Ok(()) => {
            info!("✅ Treinamento concluído com sucesso em {:.2}s", elapsed.as_secs_f64());
            info!("🏁 Finalizado em: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        }
        Err(e) => {
            error!("❌ Erro durante treinamento: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), TrainingError> {
    let config = Config::from_env()?;
    config.print_summary();

    let raw = load_transactions(&config.database_url, &config.table)?;
    if raw.is_empty() {
        warn!("⚠️ Tabela {} está vazia", config.table);
    }
    let records = select_records(&raw)?;

    let outcome = train_from_records(&records, &config.training)?;
    info!(
        "📊 Métricas de validação após {} épocas: loss={:.4} acurácia={:.2}%",
        outcome.history.epochs.len(),
        outcome.validation_loss,
        outcome.validation_accuracy * 100.0
    );

    persist(&outcome, &config.model_path, &config.label_encoder_path)?;

    // reload what was written
    let predictor = CategoryPredictor::load(&config.model_path, &config.label_encoder_path)?;
    if let Some(sample) = records.first() {
        let prediction = predictor.predict_record(sample)?;
        info!(
            "🔎 Verificação: \"{}\" → {} ({:.1}%) | real: {}",
            sample.feature_text(),
            prediction.category,
            prediction.probability * 100.0,
            sample.financial_category
        );
    }

    Ok(())
}

fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}
