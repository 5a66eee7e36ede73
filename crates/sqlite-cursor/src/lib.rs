//! Client-side cursor and connection layer over SQLite.
//!
//! A [`Database`] opens a connection, runs statements and manages
//! transactions. Every query yields a [`Cursor`]: a random-access view over
//! SQLite's forward-only row stream, backed by a lazily filled row cache.
//!
//! ```no_run
//! use sqlite_cursor::{Database, Params, Value};
//!
//! # fn main() -> sqlite_cursor::DbResult<()> {
//! let mut db = Database::in_memory();
//! db.open()?;
//! db.execute_update("CREATE TABLE t (a TEXT, b INTEGER)", ())?;
//! db.execute_update("INSERT INTO t VALUES (?, ?)", Params::positional([Value::from("First"), Value::from(1)]))?;
//!
//! let mut cursor = db.execute_query("SELECT a, b FROM t", ())?;
//! while cursor.next()? {
//!     println!("{} {}", cursor.string_for("a")?, cursor.int_for(1)?);
//! }
//! cursor.close();
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use crate::core::{
    column::ColumnIndex,
    connection::{Database, OpenOptions},
    cursor::{Cursor, CursorState},
    params::Params,
    stream::{RowStream, SqliteRowStream},
    types::ColumnMeta,
    value::{FromValue, FromValueError, Value},
};
pub use crate::error::{ContractViolation, DbError, DbResult};
