use std::collections::HashMap;

use crate::core::types::ColumnMeta;
use crate::core::value::DeclaredKind;
use crate::error::ContractViolation;

/// Column layout of one result set, fixed when the cursor is created.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    metas: Vec<ColumnMeta>,
    kinds: Vec<DeclaredKind>,
    by_name: HashMap<String, usize>,
}

impl Columns {
    pub fn new(metas: Vec<ColumnMeta>) -> Self {
        let mut metas = metas;
        let mut by_name = HashMap::with_capacity(metas.len());
        for (i, meta) in metas.iter_mut().enumerate() {
            meta.name = meta.name.to_lowercase();
            // Duplicate names resolve to the first column carrying them.
            by_name.entry(meta.name.clone()).or_insert(i);
        }
        let kinds = metas
            .iter()
            .map(|m| DeclaredKind::from_decl_type(m.decl_type.as_deref()))
            .collect();
        Self {
            metas,
            kinds,
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn metas(&self) -> &[ColumnMeta] {
        &self.metas
    }

    pub fn kind(&self, index: usize) -> DeclaredKind {
        self.kinds.get(index).copied().unwrap_or(DeclaredKind::Other)
    }

    pub fn name_for(&self, index: usize) -> Result<&str, ContractViolation> {
        self.metas
            .get(index)
            .map(|m| m.name.as_str())
            .ok_or(ContractViolation::ColumnOutOfRange {
                index,
                count: self.metas.len(),
            })
    }

    pub fn index_for(&self, name: &str) -> Result<usize, ContractViolation> {
        self.by_name
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| ContractViolation::NoSuchColumn(name.to_string()))
    }
}

/// Addresses a column either by zero-based index or by (case-insensitive) name.
pub trait ColumnIndex {
    fn resolve(&self, columns: &Columns) -> Result<usize, ContractViolation>;
}

impl ColumnIndex for usize {
    fn resolve(&self, columns: &Columns) -> Result<usize, ContractViolation> {
        columns.name_for(*self).map(|_| *self)
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, columns: &Columns) -> Result<usize, ContractViolation> {
        columns.index_for(self)
    }
}

impl ColumnIndex for &String {
    fn resolve(&self, columns: &Columns) -> Result<usize, ContractViolation> {
        columns.index_for(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Columns {
        Columns::new(
            names
                .iter()
                .map(|n| ColumnMeta {
                    name: n.to_string(),
                    decl_type: None,
                })
                .collect(),
        )
    }

    #[test]
    fn names_are_stored_lower_case() {
        let cols = columns(&["ID", "Name"]);
        assert_eq!(cols.name_for(1), Ok("name"));
        assert_eq!(cols.index_for("NAME"), Ok(1));
        assert_eq!("id".resolve(&cols), Ok(0));
    }

    #[test]
    fn first_duplicate_wins() {
        let cols = columns(&["a", "A", "b"]);
        assert_eq!(cols.index_for("a"), Ok(0));
        assert_eq!(cols.len(), 3);
    }

    #[test]
    fn unknown_columns_are_contract_violations() {
        let cols = columns(&["a"]);
        assert_eq!(
            "missing".resolve(&cols),
            Err(ContractViolation::NoSuchColumn("missing".into()))
        );
        assert_eq!(
            3usize.resolve(&cols),
            Err(ContractViolation::ColumnOutOfRange { index: 3, count: 1 })
        );
    }
}
