use std::collections::{BTreeMap, HashMap};

use rusqlite::Statement;

use crate::core::value::Value;
use crate::error::{DbError, DbResult};

/// Values for a statement's placeholders: none, `?` in order, or `:name` by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Binds onto a freshly prepared statement.
    pub(crate) fn bind(&self, stmt: &mut Statement<'_>) -> DbResult<()> {
        let expected = stmt.parameter_count();
        let placeholders: Vec<Option<String>> = (1..=expected)
            .map(|i| stmt.parameter_name(i).map(str::to_string))
            .collect();

        match self {
            Params::None => {
                if expected != 0 {
                    return Err(DbError::invalid_statement(format!(
                        "statement expects {expected} parameters, none given"
                    )));
                }
            }
            Params::Positional(values) => {
                if placeholders.iter().flatten().any(|n| is_named(n)) {
                    return Err(DbError::invalid_statement(
                        "named placeholders cannot be bound positionally",
                    ));
                }
                if values.len() != expected {
                    return Err(DbError::invalid_statement(format!(
                        "statement expects {expected} parameters, got {}",
                        values.len()
                    )));
                }
                for (i, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, value)
                        .map_err(DbError::statement)?;
                }
            }
            Params::Named(pairs) => {
                if placeholders.iter().any(|n| !n.as_deref().is_some_and(is_named)) {
                    return Err(DbError::invalid_statement(
                        "positional placeholders cannot be bound by name",
                    ));
                }
                let mut bound = vec![false; expected];
                for (key, value) in pairs {
                    let name = placeholder_name(key);
                    let Some(index) = stmt.parameter_index(&name).map_err(DbError::statement)? else {
                        return Err(DbError::invalid_statement(format!(
                            "no such named parameter: {name}"
                        )));
                    };
                    stmt.raw_bind_parameter(index, value)
                        .map_err(DbError::statement)?;
                    bound[index - 1] = true;
                }
                if let Some(missing) = bound.iter().position(|b| !b) {
                    let name = placeholders[missing].as_deref().unwrap_or("?");
                    return Err(DbError::invalid_statement(format!(
                        "missing value for named parameter {name}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_named(placeholder: &str) -> bool {
    placeholder.starts_with([':', '@', '$'])
}

fn placeholder_name(key: &str) -> String {
    if is_named(key) {
        key.to_string()
    } else {
        format!(":{key}")
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl<K: Into<String>, V: Into<Value>> From<HashMap<K, V>> for Params {
    fn from(map: HashMap<K, V>) -> Self {
        Params::named(map)
    }
}

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Params {
    fn from(map: BTreeMap<K, V>) -> Self {
        Params::named(map)
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::None
    }
}
