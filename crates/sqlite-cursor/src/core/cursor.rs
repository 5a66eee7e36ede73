use chrono::{DateTime, Utc};

use crate::core::column::{ColumnIndex, Columns};
use crate::core::stream::RowStream;
use crate::core::types::ColumnMeta;
use crate::core::value::{FromValue, FromValueError, Value};
use crate::error::{ContractViolation, DbError, DbResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Before the first row; nothing read yet.
    Fresh,
    Positioned,
    /// A forward move ran off the end of the result set.
    Exhausted,
    Closed,
}

/// Random-access view over a forward-only row stream.
///
/// Rows are pulled from the stream only as far as navigation (or an
/// explicit prefetch) requires and
/// are kept in an append-only cache, so moving backwards never re-executes
/// the query. `move_to_last` is the only move that drains the stream.
pub struct Cursor<'conn> {
    stream: Option<Box<dyn RowStream + 'conn>>,
    columns: Columns,
    cache: Vec<Vec<Value>>,
    position: isize,
    at_end: bool,
    past_end: bool,
    closed: bool,
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("columns", &self.columns.metas())
            .field("cached", &self.cache.len())
            .field("position", &self.position)
            .field("at_end", &self.at_end)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<'conn> Cursor<'conn> {
    pub fn from_stream<S: RowStream + 'conn>(stream: S) -> Self {
        let columns = Columns::new(stream.columns());
        Self {
            stream: Some(Box::new(stream)),
            columns,
            cache: Vec::new(),
            position: -1,
            at_end: false,
            past_end: false,
            closed: false,
        }
    }

    // ---- navigation ----

    pub fn next(&mut self) -> DbResult<bool> {
        self.move_by(1)
    }

    pub fn previous(&mut self) -> DbResult<bool> {
        self.check_open()?;
        if self.position <= 0 {
            return Ok(false);
        }
        self.position -= 1;
        self.past_end = false;
        Ok(true)
    }

    /// Relative move from the current position.
    pub fn move_by(&mut self, offset: isize) -> DbResult<bool> {
        self.check_open()?;
        match self.position.checked_add(offset) {
            Some(target) => self.move_to_position(target),
            None => Ok(false),
        }
    }

    pub fn move_to_first(&mut self) -> DbResult<bool> {
        self.move_to_position(0)
    }

    /// Drains the stream and lands on the final row.
    pub fn move_to_last(&mut self) -> DbResult<bool> {
        self.check_open()?;
        self.ensure_all_cached()?;
        if self.cache.is_empty() {
            self.past_end = true;
            return Ok(false);
        }
        self.position = self.cache.len() as isize - 1;
        self.past_end = false;
        Ok(true)
    }

    /// Absolute move. Out-of-range targets leave the position unchanged.
    pub fn move_to_position(&mut self, target: isize) -> DbResult<bool> {
        self.check_open()?;
        let Ok(index) = usize::try_from(target) else {
            return Ok(false);
        };
        if !self.ensure_cached_up_to(index)? {
            self.past_end = true;
            return Ok(false);
        }
        self.position = target;
        self.past_end = false;
        Ok(true)
    }

    /// Pulls rows until `target` is cached or the stream ends. Reports
    /// whether `target` is now readable.
    fn ensure_cached_up_to(&mut self, target: usize) -> DbResult<bool> {
        while self.cache.len() <= target {
            if !self.pull()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Pulls up to `rows` rows without moving.
    pub(crate) fn prefetch(&mut self, rows: usize) -> DbResult<()> {
        if let Some(last) = rows.checked_sub(1) {
            self.ensure_cached_up_to(last)?;
        }
        Ok(())
    }

    fn ensure_all_cached(&mut self) -> DbResult<()> {
        while self.pull()? {}
        Ok(())
    }

    fn pull(&mut self) -> DbResult<bool> {
        if self.at_end {
            return Ok(false);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(ContractViolation::CursorClosed.into());
        };
        match stream.next_row()? {
            Some(raw) => {
                let row = raw
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Value::from_storage(v, self.columns.kind(i)))
                    .collect();
                self.cache.push(row);
                tracing::trace!(cached = self.cache.len(), "pulled row");
                Ok(true)
            }
            None => {
                self.at_end = true;
                Ok(false)
            }
        }
    }

    /// Releases cached rows and the underlying stream. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.cache = Vec::new();
        self.stream = None;
        self.position = -1;
        self.past_end = false;
        self.closed = true;
        tracing::trace!("cursor closed");
    }

    // ---- state ----

    /// Zero-based position; -1 before the first row.
    pub fn position(&self) -> isize {
        self.position
    }

    pub fn cached_row_count(&self) -> usize {
        self.cache.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the underlying stream has been read to its end.
    pub fn is_exhausted(&self) -> bool {
        self.at_end
    }

    pub fn state(&self) -> CursorState {
        if self.closed {
            CursorState::Closed
        } else if self.past_end {
            CursorState::Exhausted
        } else if self.position < 0 {
            CursorState::Fresh
        } else {
            CursorState::Positioned
        }
    }

    fn check_open(&self) -> Result<(), ContractViolation> {
        if self.closed {
            Err(ContractViolation::CursorClosed)
        } else {
            Ok(())
        }
    }

    // ---- column metadata ----

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        self.columns.metas()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.metas().iter().map(|m| m.name.as_str())
    }

    pub fn column_name_for(&self, index: usize) -> DbResult<&str> {
        Ok(self.columns.name_for(index)?)
    }

    pub fn column_index_for(&self, name: &str) -> DbResult<usize> {
        Ok(self.columns.index_for(name)?)
    }

    pub fn column_is_null<C: ColumnIndex>(&self, column: C) -> DbResult<bool> {
        Ok(self.value_for(column)?.is_null())
    }

    // ---- typed extraction ----

    /// The stored value at the current row.
    pub fn value_for<C: ColumnIndex>(&self, column: C) -> DbResult<&Value> {
        Ok(self.cell(column)?.1)
    }

    /// Reads the current row's value as `T`, failing on NULL or on a
    /// type that cannot be converted without loss.
    pub fn get<T: FromValue, C: ColumnIndex>(&self, column: C) -> DbResult<T> {
        let (index, value) = self.cell(column)?;
        T::from_value(value).map_err(|e| {
            let column = self.column_label(index);
            match e {
                FromValueError::Null => ContractViolation::NullValue { column },
                FromValueError::Mismatch { expected, found } => ContractViolation::TypeMismatch {
                    column,
                    expected,
                    found,
                },
            }
            .into()
        })
    }

    pub fn bool_for<C: ColumnIndex>(&self, column: C) -> DbResult<bool> {
        self.get(column)
    }

    pub fn int_for<C: ColumnIndex>(&self, column: C) -> DbResult<i64> {
        self.get(column)
    }

    pub fn long_for<C: ColumnIndex>(&self, column: C) -> DbResult<i32> {
        self.get(column)
    }

    pub fn long_long_int_for<C: ColumnIndex>(&self, column: C) -> DbResult<i64> {
        self.get(column)
    }

    pub fn unsigned_long_long_int_for<C: ColumnIndex>(&self, column: C) -> DbResult<u64> {
        self.get(column)
    }

    pub fn double_for<C: ColumnIndex>(&self, column: C) -> DbResult<f64> {
        self.get(column)
    }

    pub fn string_for<C: ColumnIndex>(&self, column: C) -> DbResult<&str> {
        match self.cell(column)? {
            (_, Value::Text(s)) => Ok(s),
            (index, other) => Err(self.mismatch(index, "text", other)),
        }
    }

    pub fn data_for<C: ColumnIndex>(&self, column: C) -> DbResult<&[u8]> {
        match self.cell(column)? {
            (_, Value::Blob(b)) => Ok(b),
            (index, other) => Err(self.mismatch(index, "blob", other)),
        }
    }

    pub fn date_for<C: ColumnIndex>(&self, column: C) -> DbResult<DateTime<Utc>> {
        self.get(column)
    }

    fn cell<C: ColumnIndex>(&self, column: C) -> Result<(usize, &Value), ContractViolation> {
        let row = self.current_row()?;
        let index = column.resolve(&self.columns)?;
        // Rows always carry one value per column.
        let value = row.get(index).ok_or(ContractViolation::ColumnOutOfRange {
            index,
            count: row.len(),
        })?;
        Ok((index, value))
    }

    fn column_label(&self, index: usize) -> String {
        self.columns.name_for(index).unwrap_or_default().to_string()
    }

    fn mismatch(&self, index: usize, expected: &'static str, found: &Value) -> DbError {
        let column = self.column_label(index);
        if found.is_null() {
            ContractViolation::NullValue { column }.into()
        } else {
            ContractViolation::TypeMismatch {
                column,
                expected,
                found: found.type_name(),
            }
            .into()
        }
    }

    fn current_row(&self) -> Result<&[Value], ContractViolation> {
        if self.closed {
            return Err(ContractViolation::CursorClosed);
        }
        if self.past_end {
            return Err(ContractViolation::Exhausted);
        }
        usize::try_from(self.position)
            .ok()
            .and_then(|p| self.cache.get(p))
            .map(Vec::as_slice)
            .ok_or(ContractViolation::NotPositioned)
    }
}
