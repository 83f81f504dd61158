//! Sequence database manifest resolution (spec.md §6): maps a user-supplied
//! database name to its indexed path, per-plasmid procurement cost, and
//! provenance URL template.

use crate::error::{PlannerError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One resolved entry of the database manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseEntry {
    pub path: PathBuf,
    pub unit_cost: f64,
    /// Template with a single `{id}` placeholder, rendered into a
    /// per-fragment provenance URL.
    pub url_template: Option<String>,
}

impl DatabaseEntry {
    pub fn render_url(&self, entry_id: &str) -> Option<String> {
        self.url_template
            .as_ref()
            .map(|tpl| tpl.replace("{id}", entry_id))
    }
}

/// The full manifest: `name -> entry`, loaded from a YAML file (SPEC_FULL §6).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest(pub HashMap<String, DatabaseEntry>);

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Resolves a comma-separated list of database names into
    /// `(path, unit_cost)` pairs the core consumes, failing if any name is
    /// unknown to the manifest.
    pub fn resolve(&self, names: &str) -> Result<Vec<(PathBuf, f64)>> {
        names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|name| {
                self.0
                    .get(name)
                    .map(|e| (e.path.clone(), e.unit_cost))
                    .ok_or_else(|| {
                        PlannerError::InvalidInput(format!("unknown database: {name}"))
                    })
            })
            .collect()
    }

    pub fn entry(&self, name: &str) -> Option<&DatabaseEntry> {
        self.0.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        let mut map = HashMap::new();
        map.insert(
            "lib".to_string(),
            DatabaseEntry {
                path: PathBuf::from("/data/lib.db"),
                unit_cost: 0.0,
                url_template: Some("https://example.com/{id}".to_string()),
            },
        );
        let manifest = Manifest(map);
        let resolved = manifest.resolve("lib").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1, 0.0);
    }

    #[test]
    fn unknown_name_is_invalid_input() {
        let manifest = Manifest::default();
        assert!(manifest.resolve("nonexistent").is_err());
    }

    #[test]
    fn url_template_renders_entry_id() {
        let entry = DatabaseEntry {
            path: PathBuf::from("/data/lib.db"),
            unit_cost: 0.0,
            url_template: Some("https://example.com/{id}".to_string()),
        };
        assert_eq!(entry.render_url("e1"), Some("https://example.com/e1".to_string()));
    }
}
