use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};

/// A single cell (or bound parameter).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

/// Layout SQLite's own date functions produce and accept.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Types a raw storage value using what the column was declared as.
    pub fn from_storage(raw: SqlValue, kind: DeclaredKind) -> Value {
        match (raw, kind) {
            (SqlValue::Null, _) => Value::Null,
            (SqlValue::Integer(i), DeclaredKind::Boolean) if i == 0 || i == 1 => Value::Bool(i == 1),
            (SqlValue::Integer(i), DeclaredKind::SmallInteger) => match i32::try_from(i) {
                Ok(v) => Value::Int32(v),
                Err(_) => Value::Int64(i),
            },
            (SqlValue::Integer(i), DeclaredKind::Timestamp) => match Utc.timestamp_opt(i, 0).single() {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Int64(i),
            },
            (SqlValue::Real(f), DeclaredKind::Timestamp) => match timestamp_from_secs(f) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Double(f),
            },
            (SqlValue::Text(s), DeclaredKind::Timestamp) => match parse_timestamp(&s) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Text(s),
            },
            (SqlValue::Integer(i), _) => Value::Int64(i),
            (SqlValue::Real(f), _) => Value::Double(f),
            (SqlValue::Text(s), _) => Value::Text(s),
            (SqlValue::Blob(b), _) => Value::Blob(b),
        }
    }
}

/// Coarse reading of a column's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    Boolean,
    SmallInteger,
    Timestamp,
    Other,
}

impl DeclaredKind {
    pub fn from_decl_type(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return DeclaredKind::Other;
        };
        let decl = decl.trim().to_ascii_uppercase();
        // Strip a size suffix such as "SMALLINT(4)".
        let base = decl.split('(').next().unwrap_or_default().trim();
        match base {
            "BOOL" | "BOOLEAN" => DeclaredKind::Boolean,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT2" => DeclaredKind::SmallInteger,
            "DATE" | "DATETIME" | "TIMESTAMP" => DeclaredKind::Timestamp,
            _ => DeclaredKind::Other,
        }
    }
}

fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int32(i) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*i))),
            Value::Int64(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Double(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
            Value::Blob(b) => ToSqlOutput::Borrowed(b.as_slice().into()),
            Value::Timestamp(ts) => {
                ToSqlOutput::Owned(SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            }
        })
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Why a stored value could not be read as the requested type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromValueError {
    Null,
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Checked extraction of a Rust type from a cell.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, FromValueError>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> Result<T, FromValueError> {
    match value {
        Value::Null => Err(FromValueError::Null),
        other => Err(FromValueError::Mismatch {
            expected,
            found: other.type_name(),
        }),
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int64(0) | Value::Int32(0) => Ok(false),
            Value::Int64(1) | Value::Int32(1) => Ok(true),
            other => mismatch("bool", other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Int64(i) => Ok(*i),
            Value::Int32(i) => Ok(i64::from(*i)),
            other => mismatch("int64", other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Int32(i) => Ok(*i),
            Value::Int64(i) => i32::try_from(*i).or_else(|_| mismatch("int32", value)),
            other => mismatch("int32", other),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Int64(i) => u64::try_from(*i).or_else(|_| mismatch("uint64", value)),
            Value::Int32(i) => u64::try_from(*i).or_else(|_| mismatch("uint64", value)),
            other => mismatch("uint64", other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Double(f) => Ok(*f),
            Value::Int64(i) => Ok(*i as f64),
            Value::Int32(i) => Ok(f64::from(*i)),
            other => mismatch("double", other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch("text", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            other => mismatch("blob", other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            other => mismatch("timestamp", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, FromValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
