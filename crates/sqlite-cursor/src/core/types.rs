use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Lower-cased column name, as used for case-insensitive lookup.
    pub name: String,
    #[serde(default)]
    pub decl_type: Option<String>,
}

/// JSON-ready row keyed by column name.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<JsonRow>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub next_offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub changes: u64,
    #[serde(default)]
    pub last_insert_rowid: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Limits {
    pub max_rows: usize,
}
