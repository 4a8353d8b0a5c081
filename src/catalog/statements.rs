//! Per-dialect introspection statement resources.
//!
//! Three statements per dialect: `info` (version, default schema, database
//! name), `columns` (one row per column, constraint rows unioned in on
//! MySQL), and `functions` (one row per function parameter). The texts are
//! opaque to the rest of the crate; only their result-row shapes matter.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Mysql,
}

impl Dialect {
    /// `(version integer, default_schema text, database_name text)`
    pub fn info_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_INFO,
            Dialect::Mysql => MYSQL_INFO,
        }
    }

    /// `(schema, table, column, sql_type, not_null, primary_key, unique_key,
    /// is_array, full_text, fk_schema, fk_table, fk_column)`
    pub fn columns_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_COLUMNS,
            Dialect::Mysql => MYSQL_COLUMNS,
        }
    }

    /// `(func_schema, func_name, return_type, is_aggregate, param_ordinal,
    /// param_name, param_type, param_mode, param_is_array)`
    pub fn functions_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_FUNCTIONS,
            Dialect::Mysql => MYSQL_FUNCTIONS,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::Mysql => f.write_str("mysql"),
        }
    }
}

const POSTGRES_INFO: &str = r#"
SELECT current_setting('server_version_num')::int AS version,
       current_schema() AS default_schema,
       current_database() AS database_name
"#;

const MYSQL_INFO: &str = r#"
SELECT CAST(SUBSTRING_INDEX(VERSION(), '.', 1) AS UNSIGNED) AS version,
       DATABASE() AS default_schema,
       DATABASE() AS database_name
"#;

const POSTGRES_COLUMNS: &str = r#"
SELECT n.nspname AS table_schema,
       c.relname AS table_name,
       a.attname AS column_name,
       pg_catalog.format_type(a.atttypid, a.atttypmod) AS sql_type,
       a.attnotnull AS not_null,
       COALESCE(ct.contype = 'p', false) AS primary_key,
       COALESCE(ct.contype = 'u', false) AS unique_key,
       (a.attndims > 0) AS is_array,
       (pg_catalog.format_type(a.atttypid, a.atttypmod) = 'tsvector') AS full_text,
       COALESCE(fn.nspname, '') AS fk_schema,
       COALESCE(fc.relname, '') AS fk_table,
       COALESCE(fa.attname, '') AS fk_column
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_constraint ct
       ON ct.conrelid = c.oid AND a.attnum = ANY (ct.conkey)
LEFT JOIN pg_class fc ON fc.oid = ct.confrelid
LEFT JOIN pg_namespace fn ON fn.oid = fc.relnamespace
LEFT JOIN pg_attribute fa
       ON fa.attrelid = ct.confrelid AND fa.attnum = ct.confkey[1]
WHERE c.relkind IN ('r', 'v', 'm', 'f')
  AND n.nspname NOT IN ('pg_catalog', 'information_schema')
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY n.nspname, c.relname, a.attnum
"#;

const MYSQL_COLUMNS: &str = r#"
SELECT col.table_schema,
       col.table_name,
       col.column_name,
       col.data_type AS sql_type,
       (col.is_nullable = 'NO') AS not_null,
       false AS primary_key,
       false AS unique_key,
       false AS is_array,
       false AS full_text,
       '' AS fk_schema,
       '' AS fk_table,
       '' AS fk_column
FROM information_schema.columns col
WHERE col.table_schema = DATABASE()
UNION ALL
SELECT kcu.table_schema,
       kcu.table_name,
       kcu.column_name,
       '' AS sql_type,
       false AS not_null,
       (kcu.constraint_name = 'PRIMARY') AS primary_key,
       (tc.constraint_type = 'UNIQUE') AS unique_key,
       false AS is_array,
       false AS full_text,
       COALESCE(kcu.referenced_table_schema, '') AS fk_schema,
       COALESCE(kcu.referenced_table_name, '') AS fk_table,
       COALESCE(kcu.referenced_column_name, '') AS fk_column
FROM information_schema.key_column_usage kcu
LEFT JOIN information_schema.table_constraints tc
       ON tc.constraint_name = kcu.constraint_name
      AND tc.table_schema = kcu.table_schema
      AND tc.table_name = kcu.table_name
WHERE kcu.table_schema = DATABASE()
ORDER BY table_schema, table_name, column_name
"#;

const POSTGRES_FUNCTIONS: &str = r#"
SELECT r.routine_schema AS func_schema,
       r.routine_name AS func_name,
       COALESCE(r.data_type, '') AS return_type,
       false AS is_aggregate,
       COALESCE(p.ordinal_position, 0) AS param_ordinal,
       COALESCE(p.parameter_name, '') AS param_name,
       COALESCE(p.data_type, '') AS param_type,
       COALESCE(p.parameter_mode, '') AS param_mode,
       (COALESCE(p.data_type, '') = 'ARRAY') AS param_is_array
FROM information_schema.routines r
LEFT JOIN information_schema.parameters p
       ON p.specific_schema = r.specific_schema
      AND p.specific_name = r.specific_name
WHERE r.routine_schema NOT IN ('pg_catalog', 'information_schema')
ORDER BY r.routine_schema, r.routine_name, p.ordinal_position
"#;

const MYSQL_FUNCTIONS: &str = r#"
SELECT r.routine_schema AS func_schema,
       r.routine_name AS func_name,
       COALESCE(r.data_type, '') AS return_type,
       false AS is_aggregate,
       COALESCE(p.ordinal_position, 0) AS param_ordinal,
       COALESCE(p.parameter_name, '') AS param_name,
       COALESCE(p.data_type, '') AS param_type,
       COALESCE(p.parameter_mode, '') AS param_mode,
       false AS param_is_array
FROM information_schema.routines r
LEFT JOIN information_schema.parameters p
       ON p.specific_schema = r.routine_schema
      AND p.specific_name = r.specific_name
WHERE r.routine_schema = DATABASE()
ORDER BY r.routine_schema, r.routine_name, p.ordinal_position
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialects_render_lowercase() {
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(Dialect::Mysql.to_string(), "mysql");
    }

    #[test]
    fn statements_are_distinct_per_dialect() {
        assert_ne!(Dialect::Postgres.info_sql(), Dialect::Mysql.info_sql());
        assert_ne!(
            Dialect::Postgres.columns_sql(),
            Dialect::Mysql.columns_sql()
        );
        assert_ne!(
            Dialect::Postgres.functions_sql(),
            Dialect::Mysql.functions_sql()
        );
    }

    #[test]
    fn serde_round_trip_uses_lowercase_tags() {
        let yaml = serde_yaml::to_string(&Dialect::Mysql).unwrap();
        assert!(yaml.contains("mysql"));
        let back: Dialect = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, Dialect::Mysql);
    }
}
