use super::types::Limits;

/// Clamps a requested page size to the configured ceiling (and at least one row).
pub fn effective_limit(requested: Option<usize>, max_rows: usize) -> Limits {
    let max_rows = requested.unwrap_or(max_rows).min(max_rows).max(1);
    Limits { max_rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_limit_is_clamped() {
        assert_eq!(effective_limit(None, 1000).max_rows, 1000);
        assert_eq!(effective_limit(Some(10), 1000).max_rows, 10);
        assert_eq!(effective_limit(Some(5000), 1000).max_rows, 1000);
        assert_eq!(effective_limit(Some(0), 1000).max_rows, 1);
    }
}
