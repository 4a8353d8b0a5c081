//! Catalog ingestion: runs the dialect's introspection statements and
//! normalizes their rows into a `Catalog`.
//!
//! The columns statement may return several rows for the same column, most
//! notably on MySQL where constraint rows are unioned in separately. Rows are
//! merged field-wise into a map keyed by `(schema, table, column)` and the
//! map is drained in sorted key order, so the finished catalog is
//! deterministic regardless of row arrival order.

use std::collections::BTreeMap;

use log::debug;

use super::blocklist::Blocklist;
use super::db::{Db, DbError, Row};
use super::errors::{CatalogError, CatalogWarning};
use super::statements::Dialect;
use super::types::{Catalog, Column, ForeignKey, Function, Param, Table, TableKind};

/// Tables carrying this prefix are internal bookkeeping and never surface.
const RESERVED_PREFIX: &str = "_gj_";

/// Return-type sentinel admitting a function as a function-backed table.
const RECORD_RETURN: &str = "record";

/// Introspects the database behind `db` and produces a normalized catalog.
/// The three statements run concurrently; any failure aborts the whole pass.
pub async fn get_catalog(
    db: &dyn Db,
    dialect: Dialect,
    blocklist: &[String],
) -> Result<Catalog, CatalogError> {
    let blocklist = Blocklist::compile(blocklist)?;

    let (info, column_rows, function_rows) = tokio::try_join!(
        fetch_info(db, dialect),
        fetch_rows(db, dialect, dialect.columns_sql()),
        fetch_rows(db, dialect, dialect.functions_sql()),
    )?;

    debug!(
        "{} introspection returned {} column rows and {} function rows",
        dialect,
        column_rows.len(),
        function_rows.len()
    );

    let mut warnings = Vec::new();
    let columns = merge_column_rows(dialect, &column_rows, &mut warnings)?;
    let functions = collect_functions(dialect, &function_rows)?;

    let mut tables = group_tables(columns, &blocklist, &mut warnings);
    tables.extend(function_tables(&functions, &blocklist));

    Ok(Catalog::build(
        dialect,
        info.version,
        &info.schema,
        &info.name,
        tables,
        functions,
        warnings,
    ))
}

struct Info {
    version: i32,
    schema: String,
    name: String,
}

fn introspection_error(dialect: Dialect, source: DbError) -> CatalogError {
    match source {
        DbError::Canceled => CatalogError::Canceled,
        source => CatalogError::Introspection { dialect, source },
    }
}

async fn fetch_info(db: &dyn Db, dialect: Dialect) -> Result<Info, CatalogError> {
    let row = db
        .query_row(dialect.info_sql())
        .await
        .map_err(|e| introspection_error(dialect, e))?;
    let decode = |row: &Row| -> Result<Info, DbError> {
        Ok(Info {
            version: row.int(0)? as i32,
            schema: row.text(1)?.to_string(),
            name: row.text(2)?.to_string(),
        })
    };
    decode(&row).map_err(|e| introspection_error(dialect, e))
}

async fn fetch_rows(
    db: &dyn Db,
    dialect: Dialect,
    sql: &str,
) -> Result<Vec<Row>, CatalogError> {
    db.query(sql)
        .await
        .map_err(|e| introspection_error(dialect, e))
}

/// Field-wise accumulator for duplicate column rows. Boolean flags merge with
/// OR semantics, foreign-key fields keep the last non-empty value, and the
/// SQL type must agree across duplicates once both sides carry one.
#[derive(Default)]
struct ColumnAcc {
    sql_type: String,
    is_array: bool,
    not_null: bool,
    primary_key: bool,
    unique_key: bool,
    full_text: bool,
    fk_schema: String,
    fk_table: String,
    fk_column: String,
}

fn merge_column_rows(
    dialect: Dialect,
    rows: &[Row],
    warnings: &mut Vec<CatalogWarning>,
) -> Result<BTreeMap<(String, String, String), Column>, CatalogError> {
    let mut acc: BTreeMap<(String, String, String), ColumnAcc> = BTreeMap::new();

    for row in rows {
        let decoded = decode_column_row(row).map_err(|e| introspection_error(dialect, e))?;
        let (key, sql_type, flags, fk) = decoded;
        let entry = acc.entry(key.clone()).or_default();

        if entry.sql_type.is_empty() {
            entry.sql_type = sql_type;
        } else if !sql_type.is_empty() && sql_type != entry.sql_type {
            warnings.push(CatalogWarning::DuplicateColumnConflict {
                schema: key.0.clone(),
                table: key.1.clone(),
                column: key.2.clone(),
                field: "sql_type",
                kept: entry.sql_type.clone(),
            });
        }

        entry.is_array |= flags.0;
        entry.not_null |= flags.1;
        entry.primary_key |= flags.2;
        entry.unique_key |= flags.3;
        entry.full_text |= flags.4;

        if !fk.0.is_empty() {
            entry.fk_schema = fk.0;
        }
        if !fk.1.is_empty() {
            entry.fk_table = fk.1;
        }
        if !fk.2.is_empty() {
            entry.fk_column = fk.2;
        }
    }

    let mut columns = BTreeMap::new();
    for ((schema, table, name), a) in acc {
        let foreign_key = if !a.fk_table.is_empty() && !a.fk_column.is_empty() {
            Some(ForeignKey {
                // MySQL constraint rows can omit the target schema.
                schema: if a.fk_schema.is_empty() {
                    schema.clone()
                } else {
                    a.fk_schema
                },
                table: a.fk_table,
                column: a.fk_column,
            })
        } else {
            None
        };
        let recursive_fk = foreign_key
            .as_ref()
            .map(|fk| fk.schema == schema && fk.table == table)
            .unwrap_or(false);

        let column = Column {
            schema: schema.clone(),
            table: table.clone(),
            name: name.clone(),
            sql_type: a.sql_type,
            is_array: a.is_array,
            not_null: a.not_null,
            primary_key: a.primary_key,
            unique_key: a.unique_key,
            full_text: a.full_text,
            foreign_key,
            recursive_fk,
            blocked: false,
            embedded_table: None,
        };
        columns.insert((schema, table, name), column);
    }
    Ok(columns)
}

type ColumnKey = (String, String, String);
type ColumnFlags = (bool, bool, bool, bool, bool);
type FkFields = (String, String, String);

fn decode_column_row(row: &Row) -> Result<(ColumnKey, String, ColumnFlags, FkFields), DbError> {
    let key = (
        row.text(0)?.to_string(),
        row.text(1)?.to_string(),
        row.text(2)?.to_string(),
    );
    let sql_type = row.text(3)?.to_string();
    let flags = (
        row.boolean(7)?,
        row.boolean(4)?,
        row.boolean(5)?,
        row.boolean(6)?,
        row.boolean(8)?,
    );
    let fk = (
        row.text(9)?.to_string(),
        row.text(10)?.to_string(),
        row.text(11)?.to_string(),
    );
    Ok((key, sql_type, flags, fk))
}

/// Groups merged columns into tables, applying the blocklist and dropping
/// reserved internal tables outright.
fn group_tables(
    columns: BTreeMap<(String, String, String), Column>,
    blocklist: &Blocklist,
    warnings: &mut Vec<CatalogWarning>,
) -> Vec<Table> {
    let mut tables: Vec<Table> = Vec::new();
    let mut current: Option<(String, String, Vec<Column>)> = None;

    for ((schema, table, _), mut column) in columns {
        column.blocked = blocklist.column_blocked(&table, &column.name);

        let same_table = matches!(&current, Some((s, t, _)) if *s == schema && *t == table);
        if same_table {
            if let Some((_, _, cols)) = &mut current {
                cols.push(column);
            }
        } else {
            if let Some(group) = current.take() {
                push_table(group, blocklist, warnings, &mut tables);
            }
            current = Some((schema, table, vec![column]));
        }
    }
    if let Some(group) = current.take() {
        push_table(group, blocklist, warnings, &mut tables);
    }
    tables
}

fn push_table(
    (schema, name, columns): (String, String, Vec<Column>),
    blocklist: &Blocklist,
    warnings: &mut Vec<CatalogWarning>,
    tables: &mut Vec<Table>,
) {
    if name.starts_with(RESERVED_PREFIX) {
        debug!("discarding internal table {schema}.{name}");
        return;
    }
    if blocklist.table_blocked(&name) {
        debug!("discarding blocklisted table {schema}.{name}");
        return;
    }

    let primary_count = columns.iter().filter(|c| c.primary_key).count();
    let table = Table::new(&schema, &name, TableKind::Base, columns);
    if primary_count > 1 {
        warnings.push(CatalogWarning::MultiplePrimaryKeys {
            schema: schema.clone(),
            table: name.clone(),
            kept: table
                .primary_col
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        });
    }
    tables.push(table);
}

fn collect_functions(dialect: Dialect, rows: &[Row]) -> Result<Vec<Function>, CatalogError> {
    let mut functions: BTreeMap<(String, String), Function> = BTreeMap::new();
    for row in rows {
        collect_function_row(&mut functions, row)
            .map_err(|e| introspection_error(dialect, e))?;
    }
    Ok(functions.into_values().collect())
}

fn collect_function_row(
    functions: &mut BTreeMap<(String, String), Function>,
    row: &Row,
) -> Result<(), DbError> {
    let schema = row.text(0)?.to_string();
    let name = row.text(1)?.to_string();
    let entry = functions
        .entry((schema.clone(), name.clone()))
        .or_insert_with(|| Function {
            schema,
            name,
            return_type: String::new(),
            is_aggregate: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
    entry.return_type = row.text(2)?.to_string();
    entry.is_aggregate |= row.boolean(3)?;

    let mode = row.text(7)?.to_uppercase();
    let param = Param {
        position: row.int(4)? as i32,
        name: row.text(5)?.to_string(),
        sql_type: row.text(6)?.to_string(),
        is_array: row.boolean(8)?,
    };
    // Functions without parameters still yield one row, with null parameter
    // fields.
    if param.name.is_empty() && param.sql_type.is_empty() && mode.is_empty() {
        return Ok(());
    }
    match mode.as_str() {
        "OUT" | "TABLE" => push_param(&mut entry.outputs, param),
        "INOUT" => {
            push_param(&mut entry.inputs, param.clone());
            push_param(&mut entry.outputs, param);
        }
        _ => push_param(&mut entry.inputs, param),
    }
    Ok(())
}

/// Keeps the list position-ordered with unique positions.
fn push_param(params: &mut Vec<Param>, param: Param) {
    if params.iter().any(|p| p.position == param.position) {
        return;
    }
    let at = params
        .iter()
        .position(|p| p.position > param.position)
        .unwrap_or(params.len());
    params.insert(at, param);
}

/// Functions returning the record sentinel with at least one output double
/// as tables; their outputs become columns with no constraints.
fn function_tables(functions: &[Function], blocklist: &Blocklist) -> Vec<Table> {
    let mut tables = Vec::new();
    for func in functions {
        if func.return_type != RECORD_RETURN || func.outputs.is_empty() {
            continue;
        }
        if func.name.starts_with(RESERVED_PREFIX) || blocklist.table_blocked(&func.name) {
            continue;
        }
        let columns = func
            .outputs
            .iter()
            .map(|p| Column {
                schema: func.schema.clone(),
                table: func.name.clone(),
                name: p.name.clone(),
                sql_type: p.sql_type.clone(),
                is_array: p.is_array,
                ..Column::default()
            })
            .collect();
        let mut table = Table::new(&func.schema, &func.name, TableKind::FunctionBacked, columns);
        table.func = Some(func.clone());
        debug!("admitting function-backed table {}.{}", func.schema, func.name);
        tables.push(table);
    }
    tables
}
