//! Catalog ingestion over a scripted database handle.

use relgraph::catalog::testing::{column_row, function_row, info_row, MockDb};
use relgraph::catalog::{
    get_catalog, CatalogError, CatalogWarning, DbError, Dialect, TableKind,
};
use relgraph::catalog::{Row, Value};

const NO_FK: (&str, &str, &str) = ("", "", "");

fn blog_rows() -> Vec<Row> {
    vec![
        column_row("public", "users", "id", "bigint", true, true, true, NO_FK),
        column_row("public", "users", "email", "text", true, false, false, NO_FK),
        column_row(
            "public",
            "posts",
            "id",
            "bigint",
            true,
            true,
            true,
            NO_FK,
        ),
        column_row(
            "public",
            "posts",
            "user_id",
            "bigint",
            false,
            false,
            false,
            ("public", "users", "id"),
        ),
    ]
}

fn mock(columns: Vec<Row>) -> MockDb {
    let mut db = MockDb::new(Dialect::Postgres);
    db.columns = columns;
    db
}

#[tokio::test]
async fn ingests_tables_and_foreign_keys() {
    let db = mock(blog_rows());
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    assert_eq!(catalog.dialect, Dialect::Postgres);
    assert_eq!(catalog.version, 150004);
    assert_eq!(catalog.schema, "public");
    assert_eq!(catalog.name, "testdb");

    let posts = catalog.get_table("public", "posts").unwrap();
    assert_eq!(posts.kind, TableKind::Base);
    assert_eq!(posts.primary_col.as_ref().unwrap().name, "id");
    let fk = posts
        .get_column("user_id")
        .unwrap()
        .foreign_key
        .as_ref()
        .unwrap();
    assert_eq!((fk.schema.as_str(), fk.table.as_str(), fk.column.as_str()),
        ("public", "users", "id"));
    assert!(catalog.warnings().is_empty());
}

#[tokio::test]
async fn blocklist_drops_tables_and_flags_columns() {
    let mut rows = blog_rows();
    rows.push(column_row(
        "public", "users", "password", "text", true, false, false, NO_FK,
    ));
    rows.push(column_row(
        "public", "audit_log", "id", "bigint", true, true, false, NO_FK,
    ));
    let db = mock(rows);

    let blocklist = vec!["audit_.*".to_string(), "\\*\\.password".to_string()];
    let catalog = get_catalog(&db, Dialect::Postgres, &blocklist)
        .await
        .unwrap();

    assert!(catalog.get_table("public", "audit_log").is_none());
    let password = catalog.get_column("public", "users", "password").unwrap();
    assert!(password.blocked);
    assert!(!catalog.get_column("public", "users", "email").unwrap().blocked);
}

#[tokio::test]
async fn duplicate_rows_merge_without_conflict() {
    // The MySQL shape: a plain column row and a separate constraint row for
    // the same column.
    let mut rows = vec![
        column_row("public", "users", "id", "bigint", true, true, true, NO_FK),
        column_row(
            "public",
            "posts",
            "user_id",
            "bigint",
            true,
            false,
            false,
            NO_FK,
        ),
        column_row(
            "public",
            "posts",
            "user_id",
            "",
            false,
            false,
            false,
            ("public", "users", "id"),
        ),
    ];
    rows.push(column_row(
        "public", "posts", "id", "bigint", true, true, true, NO_FK,
    ));
    let db = mock(rows);
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    let merged = catalog.get_column("public", "posts", "user_id").unwrap();
    assert_eq!(merged.sql_type, "bigint");
    assert!(merged.not_null);
    assert_eq!(merged.foreign_key.as_ref().unwrap().table, "users");
    assert!(catalog.warnings().is_empty());
}

#[tokio::test]
async fn conflicting_types_warn_and_keep_first() {
    let rows = vec![
        column_row("public", "t", "c", "bigint", false, false, false, NO_FK),
        column_row("public", "t", "c", "text", false, false, false, NO_FK),
    ];
    let db = mock(rows);
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    assert_eq!(catalog.get_column("public", "t", "c").unwrap().sql_type, "bigint");
    assert!(matches!(
        catalog.warnings()[0],
        CatalogWarning::DuplicateColumnConflict { field: "sql_type", .. }
    ));
}

#[tokio::test]
async fn multiple_primary_keys_warn_and_keep_first() {
    let rows = vec![
        column_row("public", "t", "a", "bigint", true, true, false, NO_FK),
        column_row("public", "t", "b", "bigint", true, true, false, NO_FK),
    ];
    let db = mock(rows);
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    assert_eq!(
        catalog
            .get_table("public", "t")
            .unwrap()
            .primary_col
            .as_ref()
            .unwrap()
            .name,
        "a"
    );
    assert!(matches!(
        catalog.warnings()[0],
        CatalogWarning::MultiplePrimaryKeys { .. }
    ));
}

#[tokio::test]
async fn self_referencing_keys_are_marked_recursive() {
    let rows = vec![
        column_row("public", "employees", "id", "bigint", true, true, true, NO_FK),
        column_row(
            "public",
            "employees",
            "manager_id",
            "bigint",
            false,
            false,
            false,
            ("public", "employees", "id"),
        ),
    ];
    let db = mock(rows);
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    assert!(
        catalog
            .get_column("public", "employees", "manager_id")
            .unwrap()
            .recursive_fk
    );
}

#[tokio::test]
async fn reserved_internal_tables_never_surface() {
    let mut rows = blog_rows();
    rows.push(column_row(
        "public",
        "_gj_migrations",
        "id",
        "bigint",
        true,
        true,
        false,
        NO_FK,
    ));
    let db = mock(rows);
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    assert!(catalog.get_table("public", "_gj_migrations").is_none());
    assert_eq!(catalog.tables.len(), 2);
}

#[tokio::test]
async fn record_functions_become_tables() {
    let mut db = mock(blog_rows());
    db.functions = vec![
        function_row("public", "search_posts", "record", 1, "query", "text", "IN"),
        function_row("public", "search_posts", "record", 2, "id", "bigint", "OUT"),
        function_row("public", "search_posts", "record", 3, "rank", "real", "OUT"),
        // A parameterless function arrives as one row with empty fields.
        function_row("public", "touch_stats", "void", 0, "", "", ""),
    ];
    let catalog = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap();

    let table = catalog.get_table("public", "search_posts").unwrap();
    assert_eq!(table.kind, TableKind::FunctionBacked);
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "rank"]);
    assert!(table.func.is_some());

    // Plain functions are kept but grow no table.
    assert!(catalog.get_table("public", "touch_stats").is_none());
    let touch = catalog
        .functions
        .iter()
        .find(|f| f.name == "touch_stats")
        .unwrap();
    assert!(touch.inputs.is_empty() && touch.outputs.is_empty());
}

#[tokio::test]
async fn content_hash_is_stable_per_database() {
    let a = get_catalog(&mock(blog_rows()), Dialect::Postgres, &[])
        .await
        .unwrap();
    let b = get_catalog(&mock(blog_rows()), Dialect::Postgres, &[])
        .await
        .unwrap();
    assert_eq!(a.hash(), b.hash());

    let mut other = mock(blog_rows());
    other.info = info_row(150004, "public", "otherdb");
    let c = get_catalog(&other, Dialect::Postgres, &[]).await.unwrap();
    assert_ne!(a.hash(), c.hash());
}

#[tokio::test]
async fn canceled_queries_surface_as_canceled() {
    let mut db = mock(blog_rows());
    db.fail_columns = Some(DbError::Canceled);
    let err = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap_err();
    assert_eq!(err, CatalogError::Canceled);
}

#[tokio::test]
async fn query_failures_surface_as_introspection_errors() {
    let mut db = mock(blog_rows());
    db.fail_functions = Some(DbError::Query {
        message: "permission denied".to_string(),
    });
    let err = get_catalog(&db, Dialect::Postgres, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Introspection {
            dialect: Dialect::Postgres,
            ..
        }
    ));
}

#[tokio::test]
async fn invalid_blocklist_fails_before_querying() {
    let db = mock(blog_rows());
    let err = get_catalog(&db, Dialect::Postgres, &["(unclosed".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Blocklist { .. }));
}

#[tokio::test]
async fn mysql_integer_flags_and_schemaless_keys_normalize() {
    let mut db = MockDb::new(Dialect::Mysql);
    db.info = info_row(8, "appdb", "appdb");
    // MySQL rows carry 0/1 flags and may omit the referenced schema.
    db.columns = vec![
        Row::new(vec![
            Value::Text("appdb".into()),
            Value::Text("orders".into()),
            Value::Text("id".into()),
            Value::Text("bigint".into()),
            Value::Int(1),
            Value::Int(1),
            Value::Int(1),
            Value::Int(0),
            Value::Int(0),
            Value::Null,
            Value::Null,
            Value::Null,
        ]),
        Row::new(vec![
            Value::Text("appdb".into()),
            Value::Text("orders".into()),
            Value::Text("customer_id".into()),
            Value::Text("bigint".into()),
            Value::Int(0),
            Value::Int(0),
            Value::Int(0),
            Value::Int(0),
            Value::Int(0),
            Value::Null,
            Value::Text("customers".into()),
            Value::Text("id".into()),
        ]),
        Row::new(vec![
            Value::Text("appdb".into()),
            Value::Text("customers".into()),
            Value::Text("id".into()),
            Value::Text("bigint".into()),
            Value::Int(1),
            Value::Int(1),
            Value::Int(1),
            Value::Int(0),
            Value::Int(0),
            Value::Null,
            Value::Null,
            Value::Null,
        ]),
    ];
    let catalog = get_catalog(&db, Dialect::Mysql, &[]).await.unwrap();

    assert_eq!(catalog.version, 8);
    let fk = catalog
        .get_column("appdb", "orders", "customer_id")
        .unwrap()
        .foreign_key
        .as_ref()
        .unwrap();
    // The missing target schema falls back to the column's own schema.
    assert_eq!(fk.schema, "appdb");
    assert_eq!(fk.table, "customers");
    assert!(catalog.get_column("appdb", "orders", "id").unwrap().primary_key);
}
