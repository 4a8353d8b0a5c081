//! Blocklist filtering for introspected tables and columns.
//!
//! Patterns are anchored at both ends and matched against unqualified table
//! names and `table.column` strings. The special form `*.column` blocks a
//! column name in every table.

use regex::Regex;

use super::errors::CatalogError;

#[derive(Debug, Default)]
pub struct Blocklist {
    patterns: Vec<Regex>,
}

impl Blocklist {
    /// Compiles every pattern eagerly so a malformed entry fails the whole
    /// ingest up front instead of silently filtering nothing.
    pub fn compile(patterns: &[String]) -> Result<Self, CatalogError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let anchored = format!("^{pattern}$");
            let re = Regex::new(&anchored).map_err(|e| CatalogError::Blocklist {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            compiled.push(re);
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn table_blocked(&self, table: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(table))
    }

    pub fn column_blocked(&self, table: &str, column: &str) -> bool {
        let qualified = format!("{table}.{column}");
        let any_table = format!("*.{column}");
        self.patterns
            .iter()
            .any(|re| re.is_match(&qualified) || re.is_match(&any_table))
    }
}
