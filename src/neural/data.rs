// projeto: extratotrain
// file: src/neural/data.rs
// Data loading, feature text construction and train/test split

use log::{debug, info, warn};
use postgres::{Client, NoTls, SimpleQueryMessage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use crate::neural::utils::TrainingError;

/// Columns read from the statement table, in the order they are selected.
pub const SELECTED_COLUMNS: [&str; 8] = [
    "data",
    "mes_ano",
    "tipo_operacao",
    "categoria",
    "fornecedor",
    "descricao",
    "instituicao",
    "categoria_financeira",
];

/// In-memory result of a full-table read. Every cell is held in its textual
/// form; `None` is SQL `NULL`.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: String,
    pub month_year: String,
    pub operation_type: String,
    pub category: String,
    pub supplier: String,
    pub description: String,
    pub institution: String,
    pub financial_category: String,
}

impl TransactionRecord {
    /// Lowercased, space-joined operation type, category, supplier,
    /// description, institution and financial category.
    pub fn feature_text(&self) -> String {
        [
            self.operation_type.as_str(),
            self.category.as_str(),
            self.supplier.as_str(),
            self.description.as_str(),
            self.institution.as_str(),
            self.financial_category.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledText {
    pub text: String,
    pub label: String,
}

pub fn connect_db(db_url: &str) -> Result<Client, TrainingError> {
    debug!("🔌 [DataLoader] Connecting to PostgreSQL");
    Ok(Client::connect(db_url, NoTls)?)
}

pub struct DataLoader<'a> {
    client: &'a mut Client,
}

impl<'a> DataLoader<'a> {
    pub fn new(client: &'a mut Client) -> Self {
        DataLoader { client }
    }

    /// Reads every row of `table`. The simple-query protocol returns each
    /// value already rendered as text in PostgreSQL's own output format:
    /// booleans are `t`/`f` and integers never gain a `.0`, whether or not
    /// the column holds NULLs.
    pub fn load_table(&mut self, table: &str) -> Result<RawTable, TrainingError> {
        info!("📥 [DataLoader] Loading all rows from \"{}\"", table);

        let query = format!("SELECT * FROM {};", quote_identifier(table));
        let messages = self.client.simple_query(&query)?;

        let mut raw = RawTable::default();
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    raw.columns = columns.iter().map(|c| c.name().to_string()).collect();
                }
                SimpleQueryMessage::Row(row) => {
                    if raw.columns.is_empty() {
                        raw.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                    }
                    let cells = (0..row.len())
                        .map(|idx| row.get(idx).map(str::to_string))
                        .collect();
                    raw.rows.push(cells);
                }
                _ => {}
            }
        }

        info!("✅ [DataLoader] Loaded {} rows with {} columns", raw.len(), raw.columns.len());
        Ok(raw)
    }

    pub fn count_rows(&mut self, table: &str) -> Result<i64, TrainingError> {
        let query = format!("SELECT COUNT(*) FROM {};", quote_identifier(table));
        let row = self.client.query_one(query.as_str(), &[])?;
        Ok(row.get(0))
    }
}

/// Connects, reads the table and its row count, and releases the connection
/// before returning.
pub fn load_transactions(db_url: &str, table: &str) -> Result<RawTable, TrainingError> {
    let mut client = connect_db(db_url)?;
    let mut loader = DataLoader::new(&mut client);

    let raw = loader.load_table(table)?;
    let total = loader.count_rows(table)?;
    info!("📊 [DataLoader] Rows reported by COUNT(*): {}", total);
    if total != raw.len() as i64 {
        debug!("⚠️ [DataLoader] COUNT(*) = {} but {} rows were read", total, raw.len());
    }

    Ok(raw)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Projects the selected columns and drops every row with a missing value
/// in any of them.
pub fn select_records(table: &RawTable) -> Result<Vec<TransactionRecord>, TrainingError> {
    let mut indices = [0usize; SELECTED_COLUMNS.len()];
    for (slot, name) in indices.iter_mut().zip(SELECTED_COLUMNS.iter()) {
        *slot = table.column_index(name).ok_or_else(|| {
            TrainingError::DataProcessing(format!(
                "Column '{}' not found; available columns: {}",
                name,
                table.columns.join(", ")
            ))
        })?;
    }

    let records: Vec<TransactionRecord> = table
        .rows
        .iter()
        .filter_map(|row| {
            let mut values = indices.iter().map(|&idx| row.get(idx).cloned().flatten());
            Some(TransactionRecord {
                date: values.next()??,
                month_year: values.next()??,
                operation_type: values.next()??,
                category: values.next()??,
                supplier: values.next()??,
                description: values.next()??,
                institution: values.next()??,
                financial_category: values.next()??,
            })
        })
        .collect();

    let dropped = table.len() - records.len();
    if dropped > 0 {
        debug!("🧹 [Features] Dropped {} rows with missing values", dropped);
    }
    info!("✅ [Features] {} complete records out of {}", records.len(), table.len());

    Ok(records)
}

pub fn build_features(records: &[TransactionRecord]) -> Result<Vec<LabeledText>, TrainingError> {
    if records.is_empty() {
        return Err(TrainingError::DataProcessing(
            "No complete records left after dropping rows with missing values".to_string(),
        ));
    }

    Ok(records
        .iter()
        .map(|record| LabeledText {
            text: record.feature_text(),
            label: record.financial_category.clone(),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSplit {
    pub train_texts: Vec<String>,
    pub test_texts: Vec<String>,
    pub train_labels: Vec<usize>,
    pub test_labels: Vec<usize>,
}

/// Random train/test partition. `ceil(n * test_size)` rows go to test; the
/// permutation depends only on `seed`.
pub fn train_test_split(
    texts: &[String],
    labels: &[usize],
    test_size: f64,
    seed: u64,
) -> Result<DataSplit, TrainingError> {
    if texts.len() != labels.len() {
        return Err(TrainingError::DataProcessing(format!(
            "texts ({}) and labels ({}) differ in length",
            texts.len(),
            labels.len()
        )));
    }
    if !(0.0..1.0).contains(&test_size) {
        return Err(TrainingError::DataProcessing(format!(
            "test_size must be in [0, 1), got {}",
            test_size
        )));
    }

    let n = texts.len();
    let n_test = (n as f64 * test_size).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(TrainingError::DataProcessing(format!(
            "Cannot split {} rows with test_size {}: train={}, test={}",
            n, test_size, n_train, n_test
        )));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let (test_idx, train_idx) = permutation.split_at(n_test);
    let pick_texts = |idx: &[usize]| idx.iter().map(|&i| texts[i].clone()).collect::<Vec<_>>();
    let pick_labels = |idx: &[usize]| idx.iter().map(|&i| labels[i]).collect::<Vec<_>>();

    let split = DataSplit {
        train_texts: pick_texts(train_idx),
        test_texts: pick_texts(test_idx),
        train_labels: pick_labels(train_idx),
        test_labels: pick_labels(test_idx),
    };

    let train_classes: std::collections::BTreeSet<_> = split.train_labels.iter().collect();
    let all_classes: std::collections::BTreeSet<_> = labels.iter().collect();
    if train_classes.len() < all_classes.len() {
        warn!(
            "⚠️ [Split] {} of {} classes have no training example",
            all_classes.len() - train_classes.len(),
            all_classes.len()
        );
    }

    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn sample_table() -> RawTable {
        RawTable {
            columns: vec![
                "id", "data", "mes_ano", "tipo_operacao", "categoria", "fornecedor",
                "descricao", "instituicao", "categoria_financeira",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            rows: vec![
                vec![
                    cell("1"), cell("2024-01-05"), cell("01/2024"), cell("Débito"), cell("Mercado"),
                    cell("Supermercado ABC"), cell("Compra no cartão"), cell("Banco X"), cell("Alimentação"),
                ],
                vec![
                    cell("2"), cell("2024-01-06"), None, cell("Crédito"), cell("Salário"),
                    cell("Empresa Y"), cell("Pagamento"), cell("Banco X"), cell("Receita"),
                ],
                vec![
                    cell("3"), cell("2024-01-07"), cell("01/2024"), cell("PIX"), cell("42"),
                    cell("João"), cell("Transferência"), cell("7"), cell("Transferências"),
                ],
                vec![
                    cell("4"), cell("2024-01-08"), cell("01/2024"), cell("Débito"), cell("Lazer"),
                    cell("Cinema"), cell("Ingresso"), cell("Banco Z"), None,
                ],
            ],
        }
    }

    #[test]
    fn test_rows_with_nulls_are_dropped() {
        let records = select_records(&sample_table()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.date != "2024-01-06" && r.date != "2024-01-08"));
    }

    #[test]
    fn test_empty_string_is_not_missing() {
        let mut table = sample_table();
        table.rows[0][6] = cell("");
        let records = select_records(&table).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "");
        assert_eq!(records[0].feature_text(), "débito mercado supermercado abc  banco x alimentação");
    }

    #[test]
    fn test_postgres_text_forms_are_kept_verbatim() {
        let mut table = sample_table();
        table.rows[0][4] = cell("t");
        table.rows[0][7] = cell("42");
        let records = select_records(&table).unwrap();
        let text = records[0].feature_text();
        assert_eq!(text, "débito t supermercado abc compra no cartão 42 alimentação");
        assert!(!text.contains("true") && !text.contains("42.0"));
    }

    #[test]
    fn test_feature_text_is_lowercase_join_in_order() {
        let records = select_records(&sample_table()).unwrap();
        assert_eq!(
            records[0].feature_text(),
            "débito mercado supermercado abc compra no cartão banco x alimentação"
        );
        // numeric cells arrive as text and are kept verbatim
        assert_eq!(records[1].feature_text(), "pix 42 joão transferência 7 transferências");
    }

    #[test]
    fn test_missing_column_is_reported() {
        let mut table = sample_table();
        table.columns[5] = "supplier".to_string();
        match select_records(&table) {
            Err(TrainingError::DataProcessing(msg)) => assert!(msg.contains("fornecedor")),
            other => panic!("expected DataProcessing error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_features_pairs_text_and_label() {
        let records = select_records(&sample_table()).unwrap();
        let features = build_features(&records).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].label, "Alimentação");
        assert!(features[0].text.ends_with("alimentação"));
        assert!(build_features(&[]).is_err());
    }

    #[test]
    fn test_split_sizes_and_reproducibility() {
        let texts: Vec<String> = (0..10).map(|i| format!("texto {}", i)).collect();
        let labels: Vec<usize> = (0..10).map(|i| i % 3).collect();

        let first = train_test_split(&texts, &labels, 0.2, 42).unwrap();
        let second = train_test_split(&texts, &labels, 0.2, 42).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.train_texts.len(), 8);
        assert_eq!(first.test_texts.len(), 2);

        // every row lands in exactly one side, with its own label
        let mut all: Vec<String> = first.train_texts.iter().chain(&first.test_texts).cloned().collect();
        all.sort();
        let mut expected = texts.clone();
        expected.sort();
        assert_eq!(all, expected);
        for (text, label) in first.train_texts.iter().zip(&first.train_labels) {
            let idx: usize = text.trim_start_matches("texto ").parse().unwrap();
            assert_eq!(*label, labels[idx]);
        }
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let texts: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        let labels = vec![0; 11];
        let split = train_test_split(&texts, &labels, 0.2, 42).unwrap();
        assert_eq!(split.test_texts.len(), 3);
        assert_eq!(split.train_texts.len(), 8);
    }

    #[test]
    fn test_split_rejects_tiny_inputs() {
        let texts = vec!["a".to_string()];
        assert!(train_test_split(&texts, &[0], 0.2, 42).is_err());
        assert!(train_test_split(&[], &[], 0.2, 42).is_err());
    }
}
