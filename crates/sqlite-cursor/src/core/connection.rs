use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::{Connection, OpenFlags};

use crate::{
    core::{cursor::Cursor, params::Params, stream::SqliteRowStream},
    error::{DbError, DbResult},
};

pub const DEFAULT_PREFETCH_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub busy_timeout: Duration,
    pub read_only: bool,
    /// Rows each new cursor pulls before `execute_query` returns.
    /// At least the first row is always pulled.
    pub prefetch_rows: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(2_000),
            read_only: false,
            prefetch_rows: DEFAULT_PREFETCH_ROWS,
        }
    }
}

/// One SQLite database, opened and closed explicitly.
///
/// Not safe for concurrent statement execution; cursors borrow the
/// connection that produced them, so it cannot be closed under them.
#[derive(Debug)]
pub struct Database {
    conn: Option<Connection>,
    path: Option<PathBuf>,
    options: OpenOptions,
}

impl Database {
    /// `None` names a private in-memory database.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self::with_options(path, OpenOptions::default())
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn with_options(path: Option<PathBuf>, options: OpenOptions) -> Self {
        Self {
            conn: None,
            path,
            options,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the database. Already open is reported as success.
    pub fn open(&mut self) -> DbResult<bool> {
        if self.conn.is_some() {
            return Ok(true);
        }
        let conn = open_conn(self.path.as_deref(), &self.options)?;
        tracing::debug!(path = ?self.path, read_only = self.options.read_only, "database opened");
        self.conn = Some(conn);
        Ok(true)
    }

    /// Closes the database. Already closed is reported as success.
    pub fn close(&mut self) -> DbResult<bool> {
        let Some(conn) = self.conn.take() else {
            return Ok(true);
        };
        if let Err((conn, e)) = conn.close() {
            self.conn = Some(conn);
            return Err(DbError::connection(e));
        }
        tracing::debug!(path = ?self.path, "database closed");
        Ok(true)
    }

    pub fn start_transaction(&self) -> DbResult<bool> {
        self.transaction_control("BEGIN")
    }

    pub fn commit(&self) -> DbResult<bool> {
        self.transaction_control("COMMIT")
    }

    pub fn rollback(&self) -> DbResult<bool> {
        self.transaction_control("ROLLBACK")
    }

    pub fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| !c.is_autocommit())
    }

    fn transaction_control(&self, sql: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        conn.execute_batch(sql).map_err(DbError::connection)?;
        tracing::debug!(statement = sql, "transaction control");
        Ok(true)
    }

    /// Runs a statement that returns no rows; yields the rows it changed.
    pub fn execute_update(&self, sql: &str, params: impl Into<Params>) -> DbResult<u64> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(DbError::statement)?;
        params.into().bind(&mut stmt)?;
        let changes = stmt.raw_execute().map_err(DbError::statement)? as u64;
        tracing::debug!(sql, changes, "executed update");
        Ok(changes)
    }

    /// Runs a query and returns a cursor over its rows.
    ///
    /// The statement is stepped before returning, so a statement that fails
    /// on its first rows yields an error instead of a cursor.
    pub fn execute_query(&self, sql: &str, params: impl Into<Params>) -> DbResult<Cursor<'_>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(DbError::statement)?;
        params.into().bind(&mut stmt)?;
        let mut cursor = Cursor::from_stream(SqliteRowStream::new(stmt));
        cursor.prefetch(self.options.prefetch_rows.max(1))?;
        tracing::debug!(sql, columns = cursor.column_count(), "executed query");
        Ok(cursor)
    }

    /// Row id of the most recent successful INSERT on this connection.
    pub fn last_inserted_row_id(&self) -> DbResult<i64> {
        Ok(self.conn()?.last_insert_rowid())
    }

    /// Rows changed by the most recent completed INSERT, UPDATE or DELETE.
    pub fn changes(&self) -> DbResult<u64> {
        Ok(self.conn()?.changes())
    }

    fn conn(&self) -> DbResult<&Connection> {
        self.conn.as_ref().ok_or(DbError::NotOpen)
    }
}

fn open_conn(path: Option<&Path>, options: &OpenOptions) -> DbResult<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if options.read_only {
        flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
    } else {
        flags |= OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    }
    let conn = match path {
        Some(path) => Connection::open_with_flags(path, flags),
        None => Connection::open_in_memory_with_flags(flags),
    }
    .map_err(DbError::connection)?;
    conn.busy_timeout(options.busy_timeout)
        .map_err(DbError::connection)?;
    Ok(conn)
}
