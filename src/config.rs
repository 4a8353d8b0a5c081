//! Build-pass configuration.
//!
//! One YAML document carries everything a caller feeds the ingester and the
//! schema builder besides the database handle: blocklist patterns, table
//! aliases, and the declared polymorphic, embedded, and remote
//! relationships.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, RemoteRel, VirtualTable};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// A JSON-embedded column declaration. An empty schema means the catalog's
/// default schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedColumn {
    #[serde(default)]
    pub schema: String,
    pub table: String,
    pub column: String,
    pub target_table: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Anchored patterns matched against table names and `table.column`.
    #[serde(default)]
    pub blocklist: Vec<String>,
    /// Table name to its secondary lookup names.
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub virtual_tables: Vec<VirtualTable>,
    #[serde(default)]
    pub embedded: Vec<EmbeddedColumn>,
    #[serde(default)]
    pub remotes: Vec<RemoteRel>,
}

impl SchemaConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Compiles every blocklist pattern so a malformed entry fails at load
    /// time rather than inside the ingest pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.blocklist {
            Regex::new(&format!("^{pattern}$")).map_err(|e| ConfigError::Invalid {
                message: format!("blocklist pattern `{pattern}`: {e}"),
            })?;
        }
        for vt in &self.virtual_tables {
            if vt.name.is_empty() || vt.id_column.is_empty() || vt.type_column.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("virtual table `{}` is missing a name or column", vt.name),
                });
            }
        }
        Ok(())
    }

    /// Attaches the declared relationships to an ingested catalog. Unknown
    /// embedded columns are rejected rather than silently dropped.
    pub fn apply(&self, catalog: &mut Catalog) -> Result<(), ConfigError> {
        for vt in &self.virtual_tables {
            catalog.add_virtual_table(vt.clone());
        }
        for e in &self.embedded {
            if !catalog.mark_embedded(&e.schema, &e.table, &e.column, &e.target_table) {
                return Err(ConfigError::Invalid {
                    message: format!("embedded column {}.{} not in catalog", e.table, e.column),
                });
            }
        }
        for rel in &self.remotes {
            catalog.add_remote_rel(rel.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::test_catalog;

    const YAML: &str = r#"
blocklist:
  - "audit_.*"
  - "\\*\\.password"
aliases:
  users: [authors]
virtual_tables:
  - name: subject
    id_column: subject_id
    type_column: subject_type
    targets: [posts, comments]
embedded:
  - table: users
    column: full_name
    target_table: name_parts
"#;

    #[test]
    fn yaml_round_trip() {
        let config = SchemaConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.blocklist.len(), 2);
        assert_eq!(config.aliases["users"], vec!["authors".to_string()]);
        assert_eq!(config.virtual_tables[0].targets.len(), 2);

        let serialized = serde_yaml::to_string(&config).unwrap();
        let back = SchemaConfig::from_yaml(&serialized).unwrap();
        assert_eq!(back.blocklist, config.blocklist);
        assert_eq!(back.embedded, config.embedded);
    }

    #[test]
    fn invalid_blocklist_pattern_fails_validation() {
        let err = SchemaConfig {
            blocklist: vec!["(unclosed".to_string()],
            ..SchemaConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn apply_attaches_declarations() {
        let config = SchemaConfig::from_yaml(YAML).unwrap();
        let mut catalog = test_catalog();
        config.apply(&mut catalog).unwrap();
        assert_eq!(catalog.virtual_tables.len(), 1);
        assert!(catalog.get_table("public", "subject").is_some());
        assert!(catalog.get_table("public", "name_parts").is_some());
    }

    #[test]
    fn apply_rejects_unknown_embedded_column() {
        let config = SchemaConfig {
            embedded: vec![EmbeddedColumn {
                schema: String::new(),
                table: "users".to_string(),
                column: "missing".to_string(),
                target_table: "x".to_string(),
            }],
            ..SchemaConfig::default()
        };
        let mut catalog = test_catalog();
        assert!(config.apply(&mut catalog).is_err());
    }
}
