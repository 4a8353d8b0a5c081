use thiserror::Error;

use super::db::DbError;
use super::statements::Dialect;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("{dialect} introspection failed: {source}")]
    Introspection {
        dialect: Dialect,
        #[source]
        source: DbError,
    },
    #[error("introspection canceled")]
    Canceled,
    #[error("invalid blocklist pattern `{pattern}`: {message}")]
    Blocklist { pattern: String, message: String },
}

/// Non-fatal ingest findings. The catalog is still produced; callers can
/// inspect these through `Catalog::warnings`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogWarning {
    #[error("conflicting {field} for duplicate rows of {schema}.{table}.{column}, keeping `{kept}`")]
    DuplicateColumnConflict {
        schema: String,
        table: String,
        column: String,
        field: &'static str,
        kept: String,
    },
    #[error("table {schema}.{table} has more than one primary key column, keeping `{kept}`")]
    MultiplePrimaryKeys {
        schema: String,
        table: String,
        kept: String,
    },
}
