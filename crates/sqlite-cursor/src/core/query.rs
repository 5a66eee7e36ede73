use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;

use crate::core::connection::Database;
use crate::core::cursor::Cursor;
use crate::core::params::Params;
use crate::core::types::{ExecResult, JsonRow, QueryResult};
use crate::core::value::Value;
use crate::error::{DbError, DbResult};

/// Reads at most `limit` rows starting at `offset` through a cursor.
///
/// Only `offset + limit + 1` rows are ever pulled; the extra one tells
/// whether the result was truncated.
pub fn run_query(
    db: &Database,
    sql: &str,
    params: Params,
    limit: usize,
    offset: Option<usize>,
) -> DbResult<QueryResult> {
    let mut cursor = db.execute_query(sql, params)?;
    let result = read_window(&mut cursor, limit, offset.unwrap_or(0));
    cursor.close();
    result
}

fn read_window(cursor: &mut Cursor<'_>, limit: usize, offset: usize) -> DbResult<QueryResult> {
    let columns = cursor.columns().to_vec();
    let mut rows = Vec::new();
    let mut truncated = false;
    let mut next_offset = None;

    let start = isize::try_from(offset)
        .map_err(|_| DbError::invalid_statement(format!("offset too large: {offset}")))?;
    let mut has_row = cursor.move_to_position(start)?;
    while has_row {
        if rows.len() >= limit {
            truncated = true;
            next_offset = Some(offset + rows.len());
            break;
        }
        rows.push(row_to_json_object(cursor)?);
        has_row = cursor.next()?;
    }

    Ok(QueryResult {
        columns,
        rows,
        truncated,
        next_offset,
    })
}

pub fn run_execute(db: &Database, sql: &str, params: Params) -> DbResult<ExecResult> {
    let changes = db.execute_update(sql, params)?;
    let last_id = db.last_inserted_row_id()?;
    Ok(ExecResult {
        changes,
        last_insert_rowid: Some(last_id),
    })
}

fn row_to_json_object(cursor: &Cursor<'_>) -> DbResult<JsonRow> {
    let mut out = JsonRow::new();
    for (i, name) in cursor.column_names().enumerate() {
        out.insert(name.to_string(), value_to_json(cursor.value_for(i)?));
    }
    Ok(out)
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int32(x) => json!(x),
        Value::Int64(x) => json!(x),
        Value::Double(x) => json!(x),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!({
            "$type": "blob",
            "base64": STANDARD.encode(b),
            "size": b.len()
        }),
        Value::Timestamp(ts) => json!(ts.to_rfc3339()),
    }
}

/// JSON arrays bind positionally, objects by name; `null` means no parameters.
pub fn params_from_json(v: serde_json::Value) -> DbResult<Params> {
    match v {
        serde_json::Value::Null => Ok(Params::None),
        serde_json::Value::Array(items) => Ok(Params::Positional(
            items.into_iter().map(json_to_value).collect::<DbResult<_>>()?,
        )),
        serde_json::Value::Object(map) => Ok(Params::Named(
            map.into_iter()
                .map(|(k, v)| Ok((k, json_to_value(v)?)))
                .collect::<DbResult<_>>()?,
        )),
        other => Err(DbError::invalid_statement(format!(
            "params must be an array or an object, got {other}"
        ))),
    }
}

fn json_to_value(v: serde_json::Value) -> DbResult<Value> {
    Ok(match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if n.is_u64() {
                return Err(DbError::invalid_statement(format!(
                    "integer parameter out of range: {n}"
                )));
            } else {
                match n.as_f64() {
                    Some(f) => Value::Double(f),
                    None => {
                        return Err(DbError::invalid_statement(format!(
                            "unsupported numeric parameter: {n}"
                        )))
                    }
                }
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Object(map)
            if map.get("$type").and_then(|t| t.as_str()) == Some("blob") =>
        {
            let encoded = map.get("base64").and_then(|b| b.as_str()).unwrap_or_default();
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| DbError::invalid_statement(format!("invalid blob parameter: {e}")))?;
            Value::Blob(bytes)
        }
        other => {
            return Err(DbError::invalid_statement(format!(
                "unsupported parameter value: {other}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_rows(n: i64) -> Database {
        let mut db = Database::in_memory();
        db.open().unwrap();
        db.execute_update("CREATE TABLE t (id INTEGER, data BLOB)", ()).unwrap();
        for i in 0..n {
            db.execute_update(
                "INSERT INTO t (id, data) VALUES (?, ?)",
                Params::positional([Value::Int64(i), Value::Blob(vec![i as u8])]),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn window_reports_truncation() {
        let db = db_with_rows(5);
        let r = run_query(&db, "SELECT id FROM t ORDER BY id", Params::None, 2, Some(1)).unwrap();
        let ids: Vec<_> = r.rows.iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
        assert!(r.truncated);
        assert_eq!(r.next_offset, Some(3));

        let r = run_query(&db, "SELECT id FROM t ORDER BY id", Params::None, 10, Some(3)).unwrap();
        assert_eq!(r.rows.len(), 2);
        assert!(!r.truncated);
        assert_eq!(r.next_offset, None);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let db = db_with_rows(2);
        let r = run_query(&db, "SELECT id FROM t", Params::None, 10, Some(7)).unwrap();
        assert!(r.rows.is_empty());
        assert_eq!(r.columns.len(), 1);
    }

    #[test]
    fn blobs_render_as_base64() {
        let db = db_with_rows(1);
        let r = run_query(&db, "SELECT data FROM t", Params::None, 10, None).unwrap();
        assert_eq!(
            r.rows[0]["data"],
            json!({"$type": "blob", "base64": "AA==", "size": 1})
        );
    }

    #[test]
    fn json_params_pick_binding_style() {
        assert_eq!(
            params_from_json(json!(["x", 1, 1.5, null])).unwrap(),
            Params::Positional(vec![
                Value::Text("x".into()),
                Value::Int64(1),
                Value::Double(1.5),
                Value::Null
            ])
        );
        assert_eq!(
            params_from_json(json!({"v": {"$type": "blob", "base64": "AQI="}})).unwrap(),
            Params::Named(vec![("v".into(), Value::Blob(vec![1, 2]))])
        );
        assert_eq!(params_from_json(json!(null)).unwrap(), Params::None);
        assert!(params_from_json(json!("x")).is_err());
    }

    #[test]
    fn json_integers_beyond_i64_are_rejected() {
        let err = params_from_json(json!([u64::MAX])).unwrap_err();
        assert_eq!(err.code(), "STATEMENT_ERROR");
        assert!(err.to_string().contains(&u64::MAX.to_string()), "{err}");
        assert_eq!(
            params_from_json(json!({"v": i64::MAX})).unwrap(),
            Params::Named(vec![("v".into(), Value::Int64(i64::MAX))])
        );
    }

    #[test]
    fn execute_reports_changes_and_rowid() {
        let db = db_with_rows(2);
        let r = run_execute(
            &db,
            "INSERT INTO t (id) VALUES (:id)",
            Params::named([("id", 9)]),
        )
        .unwrap();
        assert_eq!(r.changes, 1);
        assert_eq!(r.last_insert_rowid, Some(3));
    }
}
