//! Fixture support: a scripted database handle and a canned catalog.
//!
//! Public rather than test-only so downstream consumers can smoke-test their
//! own resolvers against a known relationship graph without a live database.

use async_trait::async_trait;

use super::db::{Db, DbError, Row, Value};
use super::statements::Dialect;
use super::types::{Catalog, Column, ForeignKey, Table, TableKind};

/// A `Db` that answers the three introspection statements from canned rows.
/// Failures can be injected per statement to exercise error paths.
#[derive(Debug)]
pub struct MockDb {
    pub dialect: Dialect,
    pub info: Row,
    pub columns: Vec<Row>,
    pub functions: Vec<Row>,
    pub fail_info: Option<DbError>,
    pub fail_columns: Option<DbError>,
    pub fail_functions: Option<DbError>,
}

impl MockDb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            info: info_row(150004, "public", "testdb"),
            columns: Vec::new(),
            functions: Vec::new(),
            fail_info: None,
            fail_columns: None,
            fail_functions: None,
        }
    }
}

#[async_trait]
impl Db for MockDb {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        if sql == self.dialect.columns_sql() {
            if let Some(err) = &self.fail_columns {
                return Err(err.clone());
            }
            return Ok(self.columns.clone());
        }
        if sql == self.dialect.functions_sql() {
            if let Some(err) = &self.fail_functions {
                return Err(err.clone());
            }
            return Ok(self.functions.clone());
        }
        Err(DbError::Query {
            message: format!("unscripted statement: {}", sql.trim()),
        })
    }

    async fn query_row(&self, sql: &str) -> Result<Row, DbError> {
        if sql == self.dialect.info_sql() {
            if let Some(err) = &self.fail_info {
                return Err(err.clone());
            }
            return Ok(self.info.clone());
        }
        Err(DbError::Query {
            message: format!("unscripted statement: {}", sql.trim()),
        })
    }
}

/// Builds an `info` row in statement shape.
pub fn info_row(version: i64, schema: &str, database: &str) -> Row {
    Row::new(vec![
        Value::Int(version),
        Value::Text(schema.to_string()),
        Value::Text(database.to_string()),
    ])
}

/// Builds a `columns` row in statement shape. `fk` is `(schema, table,
/// column)` with empty strings when the column has no foreign key.
#[allow(clippy::too_many_arguments)]
pub fn column_row(
    schema: &str,
    table: &str,
    column: &str,
    sql_type: &str,
    not_null: bool,
    primary_key: bool,
    unique_key: bool,
    fk: (&str, &str, &str),
) -> Row {
    Row::new(vec![
        Value::Text(schema.to_string()),
        Value::Text(table.to_string()),
        Value::Text(column.to_string()),
        Value::Text(sql_type.to_string()),
        Value::Bool(not_null),
        Value::Bool(primary_key),
        Value::Bool(unique_key),
        Value::Bool(false),
        Value::Bool(false),
        Value::Text(fk.0.to_string()),
        Value::Text(fk.1.to_string()),
        Value::Text(fk.2.to_string()),
    ])
}

/// Builds a `functions` row in statement shape.
pub fn function_row(
    schema: &str,
    name: &str,
    return_type: &str,
    ordinal: i64,
    param_name: &str,
    param_type: &str,
    param_mode: &str,
) -> Row {
    Row::new(vec![
        Value::Text(schema.to_string()),
        Value::Text(name.to_string()),
        Value::Text(return_type.to_string()),
        Value::Bool(false),
        Value::Int(ordinal),
        Value::Text(param_name.to_string()),
        Value::Text(param_type.to_string()),
        Value::Text(param_mode.to_string()),
        Value::Bool(false),
    ])
}

fn col(table: &str, name: &str, sql_type: &str) -> Column {
    Column {
        schema: "public".to_string(),
        table: table.to_string(),
        name: name.to_string(),
        sql_type: sql_type.to_string(),
        ..Column::default()
    }
}

fn pk(table: &str) -> Column {
    Column {
        not_null: true,
        primary_key: true,
        unique_key: true,
        ..col(table, "id", "bigint")
    }
}

fn fk(table: &str, name: &str, target: &str) -> Column {
    Column {
        foreign_key: Some(ForeignKey {
            schema: "public".to_string(),
            table: target.to_string(),
            column: "id".to_string(),
        }),
        ..col(table, name, "bigint")
    }
}

/// A small blog catalog: `users`, `posts` referencing `users`, and
/// `comments` referencing both.
pub fn test_catalog() -> Catalog {
    let users = Table::new(
        "public",
        "users",
        TableKind::Base,
        vec![pk("users"), col("users", "full_name", "text")],
    );
    let posts = Table::new(
        "public",
        "posts",
        TableKind::Base,
        vec![
            pk("posts"),
            col("posts", "body", "text"),
            fk("posts", "user_id", "users"),
        ],
    );
    let comments = Table::new(
        "public",
        "comments",
        TableKind::Base,
        vec![
            pk("comments"),
            col("comments", "body", "text"),
            fk("comments", "post_id", "posts"),
            fk("comments", "user_id", "users"),
        ],
    );

    Catalog::build(
        Dialect::Postgres,
        150004,
        "public",
        "blogdb",
        vec![users, posts, comments],
        vec![],
        vec![],
    )
}

/// The recursive fixture: `employees` with a self-referential manager key.
pub fn recursive_catalog() -> Catalog {
    let employees = Table::new(
        "public",
        "employees",
        TableKind::Base,
        vec![
            pk("employees"),
            col("employees", "full_name", "text"),
            fk("employees", "manager_id", "employees"),
        ],
    );
    let mut catalog = Catalog::build(
        Dialect::Postgres,
        150004,
        "public",
        "hrdb",
        vec![employees],
        vec![],
        vec![],
    );
    for table in &mut catalog.tables {
        for column in &mut table.columns {
            if let Some(fk) = &column.foreign_key {
                column.recursive_fk = fk.schema == column.schema && fk.table == column.table;
            }
        }
    }
    catalog
}
