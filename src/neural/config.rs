// projeto: extratotrain
// file: src/neural/config.rs
// Configuração do treinamento: conexão, caminhos de saída e hiperparâmetros

use log::{debug, info};
use postgres::config::Host;
use std::path::Path;
use crate::neural::utils::TrainingError;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const SOURCE_TABLE: &str = "extrato";
pub const MODEL_FILE: &str = "modelo_classificacao.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.bin";

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub max_tokens: usize,
    pub sequence_length: usize,
    pub embedding_dim: usize,
    pub lstm_units: Vec<usize>,
    pub dense_units: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub test_size: f64,
    pub seed: u64,
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            max_tokens: 5000,
            sequence_length: 100,
            embedding_dim: 16,
            lstm_units: vec![64, 32],
            dense_units: 32,
            epochs: 10,
            batch_size: 32,
            test_size: 0.2,
            seed: 42,
            learning_rate: 0.001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub table: String,
    pub model_path: String,
    pub label_encoder_path: String,
    pub training: TrainingConfig,
}

impl Config {
    /// Reads `DATABASE_URL` from the process environment, after loading a
    /// `.env` file from the working directory or its parents when present.
    /// Variables already set in the environment take precedence.
    pub fn from_env() -> Result<Self, TrainingError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("📄 Variáveis carregadas de {}", path.display()),
            Err(e) if e.not_found() => debug!("📄 Nenhum arquivo .env encontrado"),
            Err(e) => return Err(TrainingError::Configuration(format!("Falha ao ler .env: {}", e))),
        }
        Self::from_process_env()
    }

    /// Same as `from_env`, with an explicit `.env` path that must exist.
    pub fn from_env_file<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|e| {
            TrainingError::Configuration(format!("Falha ao ler {}: {}", path.display(), e))
        })?;
        Self::from_process_env()
    }

    fn from_process_env() -> Result<Self, TrainingError> {
        Self::with_database_url(std::env::var(DATABASE_URL_VAR).unwrap_or_default())
    }

    pub fn with_database_url(database_url: String) -> Result<Self, TrainingError> {
        if database_url.trim().is_empty() {
            return Err(TrainingError::Configuration(format!(
                "{} is not set",
                DATABASE_URL_VAR
            )));
        }

        Ok(Config {
            database_url,
            table: SOURCE_TABLE.to_string(),
            model_path: MODEL_FILE.to_string(),
            label_encoder_path: LABEL_ENCODER_FILE.to_string(),
            training: TrainingConfig::default(),
        })
    }

    pub fn print_summary(&self) {
        let t = &self.training;
        info!("📋 Resumo da Configuração:");
        info!("  🗄️ Banco: {} | tabela: {}", describe_connection(&self.database_url), self.table);
        info!(
            "  🧠 Modelo: vocab {} | seq {} | emb {} | LSTM {:?} | dense {}",
            t.max_tokens, t.sequence_length, t.embedding_dim, t.lstm_units, t.dense_units
        );
        info!(
            "  🎓 Treino: {} épocas | batch {} | lr {} | teste {:.0}% | seed {}",
            t.epochs,
            t.batch_size,
            t.learning_rate,
            t.test_size * 100.0,
            t.seed
        );
        info!("  💾 Saída: {} | {}", self.model_path, self.label_encoder_path);
    }
}

/// `user@host:port/dbname` of a connection string in URL or key=value form.
/// The password and any other option are never part of the result.
fn describe_connection(database_url: &str) -> String {
    let Ok(config) = database_url.parse::<postgres::Config>() else {
        return "<connection string inválida>".to_string();
    };

    let hosts: Vec<String> = config
        .get_hosts()
        .iter()
        .map(|host| match host {
            Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            Host::Unix(path) => path.display().to_string(),
        })
        .collect();
    let ports: Vec<String> = config.get_ports().iter().map(u16::to_string).collect();

    let mut shown = String::new();
    if let Some(user) = config.get_user() {
        shown.push_str(user);
        shown.push('@');
    }
    if hosts.is_empty() {
        shown.push_str("localhost");
    } else {
        shown.push_str(&hosts.join(","));
    }
    if !ports.is_empty() {
        shown.push(':');
        shown.push_str(&ports.join(","));
    }
    if let Some(dbname) = config.get_dbname() {
        shown.push('/');
        shown.push_str(dbname);
    }
    shown
}
