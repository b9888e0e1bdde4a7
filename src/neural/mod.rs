// projeto: extratotrain
// file: src/neural/mod.rs
// Module declarations for the financial category classifier

pub mod utils;      // Error type, optimizer, activations and initializers
pub mod config;     // Environment configuration and hyperparameters
pub mod data;       // PostgreSQL loading, record selection and splitting
pub mod encoder;    // Category label encoding
pub mod vectorizer; // Text standardization, vocabulary and token sequences
pub mod model;      // Embedding + LSTM + dense classifier
pub mod metrics;    // Per-epoch training metrics
pub mod storage;    // Model and label mapping persistence
pub mod pipeline;   // End-to-end training procedure
pub mod predictor;  // Inference from persisted artifacts

// Re-export commonly used items for convenience
pub use config::Config;
pub use data::{load_transactions, select_records};
pub use pipeline::{persist, train_from_records};
pub use predictor::CategoryPredictor;
pub use utils::TrainingError;
