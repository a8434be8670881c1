//! SQL text for the Oracle catalog session.
//!
//! All values are bound; owner names are never interpolated into SQL.

/// Connectivity check.
pub(super) const PING_SQL: &str = "SELECT 1 FROM DUAL";

/// Verifies that the catalog view used for listing is readable.
pub(super) const CATALOG_ACCESS_SQL: &str = "SELECT COUNT(*) FROM all_objects WHERE ROWNUM = 1";

/// Definition call. Binds: `:1` object type, `:2` name, `:3` owner.
pub(super) const GET_DDL_SQL: &str = "SELECT DBMS_METADATA.GET_DDL(:1, :2, :3) FROM DUAL";

/// Catalog view named in decoding errors.
pub(super) const LISTING_VIEW: &str = "all_objects";

/// Builds the changed-object listing for `owner_count` allowed owners.
///
/// Binds: `:1` cutoff, `:2..=:n+1` owners. Type names have spaces replaced
/// with underscores so they match the tracked-type set and path layout.
pub(super) fn changed_objects_sql(owner_count: usize) -> String {
    let owner_binds = (0..owner_count)
        .map(|i| format!(":{}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
        SELECT
            o.owner AS owner,
            o.object_name AS name,
            replace(o.object_type, ' ', '_') AS type
        FROM all_objects o
        WHERE o.generated = 'N'
          AND o.secondary = 'N'
          AND o.oracle_maintained = 'N'
          AND o.last_ddl_time > :1
          AND o.owner IN ({owner_binds})
        ORDER BY o.last_ddl_time DESC
    "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_objects_sql_binds_every_owner() {
        let sql = changed_objects_sql(3);
        assert!(sql.contains("o.owner IN (:2, :3, :4)"));
        assert!(sql.contains("o.last_ddl_time > :1"));
        assert!(sql.contains("ORDER BY o.last_ddl_time DESC"));
        assert!(!sql.contains(":5"));
    }

    #[test]
    fn test_changed_objects_sql_single_owner() {
        let sql = changed_objects_sql(1);
        assert!(sql.contains("o.owner IN (:2)"));
    }

    #[test]
    fn test_listing_excludes_generated_objects() {
        let sql = changed_objects_sql(1);
        for filter in ["generated = 'N'", "secondary = 'N'", "oracle_maintained = 'N'"] {
            assert!(sql.contains(filter), "missing filter {filter}");
        }
    }
}
