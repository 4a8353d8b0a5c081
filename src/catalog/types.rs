//! Canonical catalog model: tables, columns, functions.
//!
//! A `Catalog` is the immutable snapshot produced by one introspection pass.
//! The composite key `(schema, table, column)` identifies a column and
//! `(schema, table)` identifies a table across both dialects. Declarations
//! for polymorphic, embedded, and remote relationships are attached by a
//! higher layer between ingestion and schema build.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::CatalogWarning;
use super::statements::Dialect;

/// Single-column foreign-key target. All three fields are non-empty when
/// the key is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub schema: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub sql_type: String,
    pub is_array: bool,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique_key: bool,
    pub full_text: bool,
    pub foreign_key: Option<ForeignKey>,
    /// The foreign key points back at this column's own table.
    pub recursive_fk: bool,
    pub blocked: bool,
    /// Target-table hint for a JSON-embedded column.
    pub embedded_table: Option<String>,
}

impl Column {
    /// `table.column`, the form blocklist patterns match against.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

impl fmt::Display for Column {
    // Canonical form, stable across runs; feeds the catalog content hash.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} {} {}{}{}{}{}",
            self.schema,
            self.table,
            self.name,
            self.sql_type,
            u8::from(self.is_array),
            u8::from(self.not_null),
            u8::from(self.primary_key),
            u8::from(self.unique_key),
            u8::from(self.full_text),
        )?;
        if let Some(fk) = &self.foreign_key {
            write!(f, " -> {}.{}.{}", fk.schema, fk.table, fk.column)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Base,
    View,
    FunctionBacked,
    VirtualPolymorphic,
    JsonEmbedded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    /// The unique primary-key column, when the table has one.
    pub primary_col: Option<Column>,
    pub full_text_cols: Vec<Column>,
    /// Backing function for `FunctionBacked` tables.
    pub func: Option<Function>,
    pub blocked: bool,
}

impl Table {
    /// Assembles a table from its columns. The first primary-key column in
    /// column order wins when several claim the flag.
    pub fn new(schema: &str, name: &str, kind: TableKind, columns: Vec<Column>) -> Self {
        let primary_col = columns.iter().find(|c| c.primary_key).cloned();
        let full_text_cols = columns.iter().filter(|c| c.full_text).cloned().collect();
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            kind,
            columns,
            primary_col,
            full_text_cols,
            func: None,
            blocked: false,
        }
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// One function parameter, input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub position: i32,
    pub name: String,
    pub sql_type: String,
    pub is_array: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub schema: String,
    pub name: String,
    pub return_type: String,
    pub is_aggregate: bool,
    /// Inputs ordered by position; positions are unique.
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {} {}",
            self.schema,
            self.name,
            self.return_type,
            u8::from(self.is_aggregate)
        )?;
        for p in self.inputs.iter().chain(self.outputs.iter()) {
            write!(f, " {}:{}:{}:{}", p.position, p.name, p.sql_type, u8::from(p.is_array))?;
        }
        Ok(())
    }
}

/// Declared polymorphic pseudo-table. Each concrete target joins to the
/// pseudo-table through `(id_column, type_column)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTable {
    #[serde(default)]
    pub schema: String,
    pub name: String,
    pub id_column: String,
    pub type_column: String,
    pub targets: Vec<String>,
}

/// Declared remote relationship. The target must be registered as a table
/// (usually a stub inserted by the caller) before the schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRel {
    #[serde(default)]
    pub schema: String,
    pub table: String,
    pub column: String,
    pub target_table: String,
    pub target_column: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub dialect: Dialect,
    pub version: i32,
    /// Default schema name, used to qualify unqualified lookups.
    pub schema: String,
    /// Database name.
    pub name: String,
    pub tables: Vec<Table>,
    pub functions: Vec<Function>,
    pub virtual_tables: Vec<VirtualTable>,
    pub remote_rels: Vec<RemoteRel>,
    warnings: Vec<CatalogWarning>,
    hash: String,
}

impl Catalog {
    /// Finalizes a catalog and derives its content hash from the dialect,
    /// version, schema, database name, and the canonical string form of
    /// every column and function in order.
    pub fn build(
        dialect: Dialect,
        version: i32,
        schema: &str,
        name: &str,
        tables: Vec<Table>,
        functions: Vec<Function>,
        warnings: Vec<CatalogWarning>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(dialect.to_string());
        hasher.update(version.to_string());
        hasher.update(schema);
        hasher.update(name);
        for table in &tables {
            for column in &table.columns {
                hasher.update(column.to_string());
            }
        }
        for function in &functions {
            hasher.update(function.to_string());
        }
        // 128 bits of the digest, hex-encoded.
        let hash = hasher.finalize()[..16]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        Self {
            dialect,
            version,
            schema: schema.to_string(),
            name: name.to_string(),
            tables,
            functions,
            virtual_tables: Vec::new(),
            remote_rels: Vec::new(),
            warnings,
            hash,
        }
    }

    /// Content hash usable as a cache key.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn warnings(&self) -> &[CatalogWarning] {
        &self.warnings
    }

    pub fn get_table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    pub fn get_column(&self, schema: &str, table: &str, column: &str) -> Option<&Column> {
        self.get_table(schema, table)
            .and_then(|t| t.get_column(column))
    }

    /// Declares a polymorphic pseudo-table and registers it as a table of
    /// kind `VirtualPolymorphic` so the schema builder picks it up as a node.
    /// An empty declaration schema inherits the default schema.
    pub fn add_virtual_table(&mut self, mut vt: VirtualTable) {
        if vt.schema.is_empty() {
            vt.schema = self.schema.clone();
        }
        if self.get_table(&vt.schema, &vt.name).is_none() {
            let id_col = Column {
                schema: vt.schema.clone(),
                table: vt.name.clone(),
                name: vt.id_column.clone(),
                sql_type: "bigint".to_string(),
                primary_key: true,
                ..Column::default()
            };
            let type_col = Column {
                schema: vt.schema.clone(),
                table: vt.name.clone(),
                name: vt.type_column.clone(),
                sql_type: "text".to_string(),
                ..Column::default()
            };
            self.tables.push(Table::new(
                &vt.schema,
                &vt.name,
                TableKind::VirtualPolymorphic,
                vec![id_col, type_col],
            ));
        }
        self.virtual_tables.push(vt);
    }

    /// Marks a column as JSON-embedded with a target-table hint and registers
    /// the target as a `JsonEmbedded` table when it does not already exist.
    /// Returns false when the column is unknown.
    pub fn mark_embedded(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        target_table: &str,
    ) -> bool {
        let schema = if schema.is_empty() {
            self.schema.clone()
        } else {
            schema.to_string()
        };
        let Some(t) = self
            .tables
            .iter_mut()
            .find(|t| t.schema == schema && t.name == table)
        else {
            return false;
        };
        let Some(c) = t.columns.iter_mut().find(|c| c.name == column) else {
            return false;
        };
        c.embedded_table = Some(target_table.to_string());

        if self.get_table(&schema, target_table).is_none() {
            let id_col = Column {
                schema: schema.clone(),
                table: target_table.to_string(),
                name: "id".to_string(),
                sql_type: "text".to_string(),
                primary_key: true,
                ..Column::default()
            };
            self.tables.push(Table::new(
                &schema,
                target_table,
                TableKind::JsonEmbedded,
                vec![id_col],
            ));
        }
        true
    }

    /// Declares a remote relationship. An empty declaration schema inherits
    /// the default schema.
    pub fn add_remote_rel(&mut self, mut rel: RemoteRel) {
        if rel.schema.is_empty() {
            rel.schema = self.schema.clone();
        }
        self.remote_rels.push(rel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, name: &str, primary: bool) -> Column {
        Column {
            schema: "public".to_string(),
            table: table.to_string(),
            name: name.to_string(),
            sql_type: "bigint".to_string(),
            primary_key: primary,
            ..Column::default()
        }
    }

    fn catalog() -> Catalog {
        let users = Table::new(
            "public",
            "users",
            TableKind::Base,
            vec![column("users", "id", true), column("users", "email", false)],
        );
        Catalog::build(
            Dialect::Postgres,
            150004,
            "public",
            "appdb",
            vec![users],
            vec![],
            vec![],
        )
    }

    #[test]
    fn first_primary_column_wins() {
        let t = Table::new(
            "public",
            "users",
            TableKind::Base,
            vec![column("users", "id", true), column("users", "uuid", true)],
        );
        assert_eq!(t.primary_col.unwrap().name, "id");
    }

    #[test]
    fn composite_key_lookups() {
        let c = catalog();
        assert!(c.get_table("public", "users").is_some());
        assert!(c.get_table("public", "missing").is_none());
        assert_eq!(
            c.get_column("public", "users", "email").unwrap().name,
            "email"
        );
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = catalog();
        let b = catalog();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 32);

        let renamed = Catalog::build(
            Dialect::Postgres,
            150004,
            "public",
            "otherdb",
            a.tables.clone(),
            vec![],
            vec![],
        );
        assert_ne!(a.hash(), renamed.hash());
    }

    #[test]
    fn virtual_table_registers_a_node_table() {
        let mut c = catalog();
        c.add_virtual_table(VirtualTable {
            schema: String::new(),
            name: "subject".to_string(),
            id_column: "subject_id".to_string(),
            type_column: "subject_type".to_string(),
            targets: vec!["users".to_string()],
        });
        let t = c.get_table("public", "subject").unwrap();
        assert_eq!(t.kind, TableKind::VirtualPolymorphic);
        assert_eq!(c.virtual_tables[0].schema, "public");
    }

    #[test]
    fn mark_embedded_sets_hint_and_target() {
        let mut c = catalog();
        assert!(c.mark_embedded("", "users", "email", "contact_info"));
        assert!(!c.mark_embedded("", "users", "nope", "x"));
        assert_eq!(
            c.get_column("public", "users", "email")
                .unwrap()
                .embedded_table
                .as_deref(),
            Some("contact_info")
        );
        assert_eq!(
            c.get_table("public", "contact_info").unwrap().kind,
            TableKind::JsonEmbedded
        );
    }
}
