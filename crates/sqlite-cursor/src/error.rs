use thiserror::Error;

/// Extended result code used when a failure did not originate in SQLite.
pub const NO_NATIVE_CODE: i32 = -1;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error ({code}): {message}")]
    Connection { code: i32, message: String },

    #[error("database is not open")]
    NotOpen,

    #[error("statement error ({code}): {message}")]
    Statement { code: i32, message: String },

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Cursor misuse. These are programmer errors; no value is ever fabricated
/// in their place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("cursor used after close")]
    CursorClosed,

    #[error("cursor is not positioned on a row")]
    NotPositioned,

    #[error("cursor moved past the last row")]
    Exhausted,

    #[error("no such column: {0}")]
    NoSuchColumn(String),

    #[error("column index {index} out of range (column count {count})")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("column {column} is null")]
    NullValue { column: String },

    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl DbError {
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Connection { .. } => "CONNECTION_ERROR",
            DbError::NotOpen => "NOT_OPEN",
            DbError::Statement { .. } => "STATEMENT_ERROR",
            DbError::Contract(v) => v.code(),
        }
    }

    /// Native SQLite extended result code, when there is one.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            DbError::Connection { code, .. } | DbError::Statement { code, .. }
                if *code != NO_NATIVE_CODE =>
            {
                Some(*code)
            }
            _ => None,
        }
    }

    pub(crate) fn connection(e: rusqlite::Error) -> Self {
        let (code, message) = native_parts(&e);
        DbError::Connection { code, message }
    }

    pub(crate) fn statement(e: rusqlite::Error) -> Self {
        let (code, message) = native_parts(&e);
        DbError::Statement { code, message }
    }

    pub(crate) fn invalid_statement(message: impl Into<String>) -> Self {
        DbError::Statement {
            code: NO_NATIVE_CODE,
            message: message.into(),
        }
    }
}

impl ContractViolation {
    pub fn code(&self) -> &'static str {
        match self {
            ContractViolation::CursorClosed => "CURSOR_CLOSED",
            ContractViolation::NotPositioned => "NOT_POSITIONED",
            ContractViolation::Exhausted => "CURSOR_EXHAUSTED",
            ContractViolation::NoSuchColumn(_) => "NO_SUCH_COLUMN",
            ContractViolation::ColumnOutOfRange { .. } => "COLUMN_OUT_OF_RANGE",
            ContractViolation::NullValue { .. } => "NULL_VALUE",
            ContractViolation::TypeMismatch { .. } => "TYPE_MISMATCH",
        }
    }
}

fn native_parts(e: &rusqlite::Error) -> (i32, String) {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) => (
            err.extended_code,
            msg.clone().unwrap_or_else(|| err.to_string()),
        ),
        other => (NO_NATIVE_CODE, other.to_string()),
    }
}

pub type DbResult<T> = Result<T, DbError>;
