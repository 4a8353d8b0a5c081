//! relgraph - relational catalogs as traversable relationship graphs
//!
//! This crate provides join-path resolution over live databases through:
//! - Catalog introspection for PostgreSQL and MySQL
//! - Relationship classification from foreign keys and declarations
//! - An indexed weighted digraph of table relationships
//! - Cheapest-path resolution into concrete join steps

pub mod catalog;
pub mod config;
pub mod digraph;
pub mod schema;

pub use catalog::{get_catalog, Catalog, CatalogError, CatalogWarning, Db, DbError, Dialect};
pub use config::{ConfigError, SchemaConfig};
pub use schema::{path_to_rel, JoinStep, RelType, RelatedNode, Relationship, Schema, SchemaError};
