mod versioned_schema;

pub use versioned_schema::{
    open_versioned, Column, ForeignKey, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
};

/// Converts a LIMIT/OFFSET operand for SQLite, saturating at `i64::MAX`.
///
/// A plain cast wraps large values negative, and SQLite reads a negative
/// OFFSET as 0.
pub fn sql_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::sql_bound;

    #[test]
    fn sql_bound_saturates() {
        assert_eq!(sql_bound(0), 0);
        assert_eq!(sql_bound(20), 20);
        assert_eq!(sql_bound(usize::MAX), i64::MAX);
    }
}
