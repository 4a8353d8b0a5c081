use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("no relationship found under `{name}` to start from")]
    FromEdgeNotFound { name: String },
    #[error("no relationship found under `{name}` to end at")]
    ToEdgeNotFound { name: String },
    #[error("through table `{name}` is not part of the graph")]
    ThroughNodeNotFound { name: String },
    #[error("no join path connects `{from}` to `{to}`")]
    PathNotFound { from: String, to: String },
    #[error("relationship on {table}.{column} references unknown table `{target}`")]
    EdgeToUnknownTable {
        table: String,
        column: String,
        target: String,
    },
    #[error("duplicate graph registration for `{key}`")]
    DuplicateNode { key: String },
    #[error("table `{schema}.{table}` not found")]
    TableNotFound { schema: String, table: String },
}
