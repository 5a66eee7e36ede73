use ouroboros::self_referencing;
use rusqlite::{
    types::{Value as SqlValue, ValueRef},
    Row, Rows, Statement,
};

use crate::core::types::ColumnMeta;
use crate::error::{DbError, DbResult};

/// A forward-only, single-pass source of raw rows.
///
/// Once `next_row` has returned `Ok(None)` or an error, it must keep
/// returning `Ok(None)`.
pub trait RowStream {
    fn columns(&self) -> Vec<ColumnMeta>;

    fn next_row(&mut self) -> DbResult<Option<Vec<SqlValue>>>;
}

/// A prepared statement together with the `Rows` that step it.
#[self_referencing]
struct StatementRows<'conn> {
    stmt: Statement<'conn>,
    #[borrows(mut stmt)]
    #[not_covariant]
    rows: Rows<'this>,
}

/// Row stream over a prepared, already bound SQLite statement.
pub struct SqliteRowStream<'conn> {
    inner: StatementRows<'conn>,
    columns: Vec<ColumnMeta>,
    finished: bool,
}

impl<'conn> SqliteRowStream<'conn> {
    pub fn new(stmt: Statement<'conn>) -> Self {
        // `stmt` is mutably borrowed by its rows from here on.
        let columns = stmt
            .columns()
            .into_iter()
            .map(|c| ColumnMeta {
                name: c.name().to_string(),
                decl_type: c.decl_type().map(|s| s.to_string()),
            })
            .collect();
        let inner = StatementRowsBuilder {
            stmt,
            rows_builder: |stmt: &mut Statement<'conn>| stmt.raw_query(),
        }
        .build();
        Self {
            inner,
            columns,
            finished: false,
        }
    }
}

impl RowStream for SqliteRowStream<'_> {
    fn columns(&self) -> Vec<ColumnMeta> {
        self.columns.clone()
    }

    fn next_row(&mut self) -> DbResult<Option<Vec<SqlValue>>> {
        // Stepping a finished statement would silently run it again.
        if self.finished {
            return Ok(None);
        }

        let column_count = self.columns.len();
        let stepped = self.inner.with_rows_mut(|rows| match rows.next() {
            Ok(Some(row)) => read_row(row, column_count).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(DbError::statement(e)),
        });
        match stepped {
            Ok(Some(values)) => Ok(Some(values)),
            Ok(None) => {
                self.finished = true;
                tracing::trace!("row stream exhausted");
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                tracing::debug!(code = e.native_code(), error = %e, "row stream failed");
                Err(e)
            }
        }
    }
}

fn read_row(row: &Row<'_>, column_count: usize) -> DbResult<Vec<SqlValue>> {
    (0..column_count)
        .map(|i| row.get_ref(i).map(owned_value).map_err(DbError::statement))
        .collect()
}

/// Text that is not valid UTF-8 is kept byte for byte as a blob.
fn owned_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s.to_owned()),
            Err(_) => SqlValue::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::{ffi, Connection};

    use super::*;

    #[test]
    fn steps_until_done_and_stays_done() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (a TEXT, b BLOB, c REAL);
             INSERT INTO t VALUES ('x', x'0102', 1.5), (NULL, x'', NULL);",
        )
        .unwrap();
        let stmt = conn.prepare("SELECT a, b, c FROM t ORDER BY rowid").unwrap();
        let mut stream = SqliteRowStream::new(stmt);

        let names: Vec<_> = stream.columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        assert_eq!(
            stream.next_row().unwrap(),
            Some(vec![
                SqlValue::Text("x".into()),
                SqlValue::Blob(vec![1, 2]),
                SqlValue::Real(1.5)
            ])
        );
        assert_eq!(
            stream.next_row().unwrap(),
            Some(vec![SqlValue::Null, SqlValue::Blob(vec![]), SqlValue::Null])
        );
        assert_eq!(stream.next_row().unwrap(), None);
        // A second step would restart the query; it must not happen.
        assert_eq!(stream.next_row().unwrap(), None);
    }

    #[test]
    fn finished_insert_runs_once() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER)").unwrap();
        let stmt = conn
            .prepare("INSERT INTO t (a) VALUES (7) RETURNING a")
            .unwrap();
        let mut stream = SqliteRowStream::new(stmt);
        assert_eq!(
            stream.next_row().unwrap(),
            Some(vec![SqlValue::Integer(7)])
        );
        assert_eq!(stream.next_row().unwrap(), None);
        assert_eq!(stream.next_row().unwrap(), None);
        drop(stream);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn invalid_utf8_text_is_kept_as_bytes() {
        let conn = Connection::open_in_memory().unwrap();
        let stmt = conn
            .prepare("SELECT CAST(x'66ff6f' AS TEXT), typeof(CAST(x'66ff6f' AS TEXT))")
            .unwrap();
        let mut stream = SqliteRowStream::new(stmt);
        assert_eq!(
            stream.next_row().unwrap(),
            Some(vec![
                SqlValue::Blob(vec![0x66, 0xff, 0x6f]),
                SqlValue::Text("text".into())
            ])
        );
    }

    #[test]
    fn step_errors_carry_native_code() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER PRIMARY KEY)").unwrap();
        let stmt = conn
            .prepare("INSERT INTO t (a) VALUES (1), (1) RETURNING a")
            .unwrap();
        let mut stream = SqliteRowStream::new(stmt);

        let mut err = None;
        for _ in 0..3 {
            match stream.next_row() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        let err = err.expect("duplicate key must fail");
        assert_eq!(err.code(), "STATEMENT_ERROR");
        assert_eq!(err.native_code(), Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY));
        assert_eq!(stream.next_row().unwrap(), None);
    }
}
