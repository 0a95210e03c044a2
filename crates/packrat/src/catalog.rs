use pocketmind_core::{ModelDescriptor, PocketError};
use serde::Deserialize;
use std::collections::HashSet;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    models: Vec<ModelDescriptor>,
}

/// Read-only catalog of downloadable models.
///
/// Loaded once from static data; never mutated afterwards. Entries are
/// identified by `local_file_name`.
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    /// The catalog embedded in the binary.
    pub fn builtin() -> Result<Self, PocketError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    pub fn from_toml(text: &str) -> Result<Self, PocketError> {
        let parsed: CatalogFile =
            toml::from_str(text).map_err(|e| PocketError::Catalog(e.to_string()))?;

        // local_file_name is the identity; a duplicate is a catalog bug.
        let mut seen = HashSet::new();
        for model in &parsed.models {
            if !seen.insert(model.local_file_name.as_str()) {
                return Err(PocketError::Catalog(format!(
                    "duplicate local_file_name: {}",
                    model.local_file_name
                )));
            }
        }

        Ok(Self {
            models: parsed.models,
        })
    }

    pub fn descriptors(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn find(&self, local_file_name: &str) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.local_file_name == local_file_name)
    }

    /// Resolve a query against the catalog: exact file name first, then
    /// display name.
    pub fn resolve(&self, query: &str) -> Option<&ModelDescriptor> {
        self.find(query)
            .or_else(|| self.models.iter().find(|m| m.display_name == query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = ModelCatalog::builtin().unwrap();
        assert!(!catalog.descriptors().is_empty());
        for model in catalog.descriptors() {
            assert!(model.local_file_name.ends_with(".gguf"));
            assert!(model.source_url.starts_with("https://"));
            assert!(!model.display_name.is_empty());
            assert!(!model.human_size.is_empty());
        }
    }

    #[test]
    fn duplicate_file_names_rejected() {
        let text = r#"
            [[models]]
            display_name = "A"
            human_size = "1 GB"
            source_url = "https://example/a.gguf"
            local_file_name = "same.gguf"

            [[models]]
            display_name = "B"
            human_size = "2 GB"
            source_url = "https://example/b.gguf"
            local_file_name = "same.gguf"
        "#;
        assert!(matches!(
            ModelCatalog::from_toml(text),
            Err(PocketError::Catalog(_))
        ));
    }

    #[test]
    fn resolve_by_file_or_display_name() {
        let catalog = ModelCatalog::builtin().unwrap();
        let first = catalog.descriptors()[0].clone();
        assert_eq!(
            catalog.resolve(&first.local_file_name).unwrap(),
            &first
        );
        assert_eq!(catalog.resolve(&first.display_name).unwrap(), &first);
        assert!(catalog.resolve("nope.gguf").is_none());
    }
}
