use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::ConfigError;
use crate::sanitize::{is_identifier, sanitize};

use super::model::{Resource, Source};
use super::SchemaRegistry;

/// A catalog document: the JSON shape of a registry snapshot.
///
/// ```json
/// {
///   "sources": [{"id": "src-1", "display_name": "Trendyol", "technical_name": "trendyol"}],
///   "resources": [{
///     "id": "res-1", "source_id": "src-1", "display_name": "Order List",
///     "technical_name": "orders", "category": "portal", "active": true,
///     "config": {"format": "excel", "manual_fields": []}
///   }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Default)]
struct Inner {
    sources: Vec<Source>,
    resources: Vec<Resource>,
}

/// In-process registry backing both pipeline reads and administrative writes.
///
/// Writes enforce the catalog invariants:
///
/// - technical names are identifier-safe
/// - source technical names are unique; resource technical names are unique within their source
/// - a source's technical name is immutable once a resource references it
/// - a source cannot be deleted while referenced
/// - every resource config passes [`super::ResourceConfig::check`]
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    inner: RwLock<Inner>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a catalog, validating every record.
    pub fn from_catalog(catalog: Catalog) -> Result<Self, ConfigError> {
        let registry = Self::new();
        registry.import(catalog)?;
        Ok(registry)
    }

    /// Load every `*.json` catalog under `dir` (recursively, in file-name order).
    ///
    /// Sources from all files are registered before any resource, so a resource may reference a
    /// source declared in another file.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut merged = Catalog::default();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ConfigError::Load {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if !entry.file_type().is_file() || !is_json {
                continue;
            }

            let catalog = read_catalog(path)?;
            tracing::debug!(
                path = %path.display(),
                sources = catalog.sources.len(),
                resources = catalog.resources.len(),
                "loaded catalog"
            );
            merged.sources.extend(catalog.sources);
            merged.resources.extend(catalog.resources);
        }

        Self::from_catalog(merged)
    }

    /// Register every source, then every resource, of `catalog`.
    pub fn import(&self, catalog: Catalog) -> Result<(), ConfigError> {
        for source in catalog.sources {
            self.upsert_source(source)?;
        }
        for resource in catalog.resources {
            self.upsert_resource(resource)?;
        }
        Ok(())
    }

    /// Snapshot of the whole registry.
    pub fn catalog(&self) -> Catalog {
        let inner = self.read();
        Catalog {
            sources: inner.sources.clone(),
            resources: inner.resources.clone(),
        }
    }

    /// All sources in registration order.
    pub fn sources(&self) -> Vec<Source> {
        self.read().sources.clone()
    }

    /// Create or replace a source (matched by id).
    pub fn upsert_source(&self, source: Source) -> Result<(), ConfigError> {
        ensure_identifier("source technical name", &source.technical_name)?;

        let mut inner = self.write();
        if inner
            .sources
            .iter()
            .any(|s| s.id != source.id && s.technical_name == source.technical_name)
        {
            return Err(ConfigError::DuplicateTechnicalName {
                kind: "source",
                name: source.technical_name,
            });
        }

        match inner.sources.iter().position(|s| s.id == source.id) {
            Some(idx) => {
                let current = &inner.sources[idx];
                let referenced = inner.resources.iter().any(|r| r.source_id == source.id);
                if referenced && current.technical_name != source.technical_name {
                    return Err(ConfigError::ImmutableTechnicalName {
                        id: source.id,
                        name: current.technical_name.clone(),
                    });
                }
                inner.sources[idx] = source;
            }
            None => inner.sources.push(source),
        }
        Ok(())
    }

    /// Delete an unreferenced source.
    pub fn delete_source(&self, id: &str) -> Result<Source, ConfigError> {
        let mut inner = self.write();
        let idx = inner
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| not_found("source", id))?;
        let resources = inner.resources.iter().filter(|r| r.source_id == id).count();
        if resources > 0 {
            return Err(ConfigError::SourceInUse {
                id: id.to_string(),
                resources,
            });
        }
        Ok(inner.sources.remove(idx))
    }

    /// Create or replace a resource (matched by id).
    pub fn upsert_resource(&self, resource: Resource) -> Result<(), ConfigError> {
        ensure_identifier("resource technical name", &resource.technical_name)?;
        resource.config.check()?;

        let mut inner = self.write();
        if !inner.sources.iter().any(|s| s.id == resource.source_id) {
            return Err(not_found("source", &resource.source_id));
        }
        if inner.resources.iter().any(|r| {
            r.id != resource.id
                && r.source_id == resource.source_id
                && r.technical_name == resource.technical_name
        }) {
            return Err(ConfigError::DuplicateTechnicalName {
                kind: "resource",
                name: resource.technical_name,
            });
        }

        match inner.resources.iter().position(|r| r.id == resource.id) {
            Some(idx) => inner.resources[idx] = resource,
            None => inner.resources.push(resource),
        }
        Ok(())
    }

    /// Delete a resource. Past ingestion logs keep referencing its id.
    pub fn delete_resource(&self, id: &str) -> Result<Resource, ConfigError> {
        let mut inner = self.write();
        let idx = inner
            .resources
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found("resource", id))?;
        Ok(inner.resources.remove(idx))
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("registry lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("registry lock poisoned")
    }
}

impl SchemaRegistry for InMemoryRegistry {
    fn source(&self, id: &str) -> Result<Source, ConfigError> {
        self.read()
            .sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found("source", id))
    }

    fn resource(&self, id: &str) -> Result<Resource, ConfigError> {
        self.read()
            .resources
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("resource", id))
    }

    fn active_resources(&self, source_id: &str) -> Result<Vec<Resource>, ConfigError> {
        let inner = self.read();
        if !inner.sources.iter().any(|s| s.id == source_id) {
            return Err(not_found("source", source_id));
        }
        Ok(inner
            .resources
            .iter()
            .filter(|r| r.source_id == source_id && r.active)
            .cloned()
            .collect())
    }
}

fn read_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let load_err = |message: String| ConfigError::Load {
        path: path.display().to_string(),
        message,
    };
    let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))
}

fn ensure_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field,
            value: value.to_string(),
            suggested: sanitize(value),
        })
    }
}

fn not_found(kind: &'static str, id: &str) -> ConfigError {
    ConfigError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryRegistry;
    use crate::error::ConfigError;
    use crate::ingestion::FileFormat;
    use crate::registry::{Category, Resource, ResourceConfig, SchemaRegistry, Source};

    fn resource(id: &str, source_id: &str, technical_name: &str) -> Resource {
        Resource {
            id: id.to_string(),
            source_id: source_id.to_string(),
            display_name: technical_name.to_string(),
            technical_name: technical_name.to_string(),
            category: Category::Portal,
            active: true,
            config: ResourceConfig::new(FileFormat::Csv, Vec::new()),
        }
    }

    fn seeded() -> InMemoryRegistry {
        let reg = InMemoryRegistry::new();
        reg.upsert_source(Source::new("src-1", "Trendyol", "trendyol"))
            .unwrap();
        reg.upsert_resource(resource("res-1", "src-1", "orders"))
            .unwrap();
        reg
    }

    #[test]
    fn source_technical_name_is_immutable_once_referenced() {
        let reg = seeded();
        let err = reg
            .upsert_source(Source::new("src-1", "Trendyol", "trendyol_tr"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ImmutableTechnicalName { .. }));

        // Display name edits are fine.
        reg.upsert_source(Source::new("src-1", "Trendyol TR", "trendyol"))
            .unwrap();
        assert_eq!(reg.source("src-1").unwrap().display_name, "Trendyol TR");
    }

    #[test]
    fn delete_source_refused_while_referenced() {
        let reg = seeded();
        assert!(matches!(
            reg.delete_source("src-1"),
            Err(ConfigError::SourceInUse { resources: 1, .. })
        ));
        reg.delete_resource("res-1").unwrap();
        reg.delete_source("src-1").unwrap();
        assert!(reg.sources().is_empty());
    }

    #[test]
    fn resource_technical_name_unique_within_source() {
        let reg = seeded();
        reg.upsert_source(Source::new("src-2", "Hepsiburada", "hepsiburada"))
            .unwrap();

        let err = reg
            .upsert_resource(resource("res-2", "src-1", "orders"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTechnicalName { kind: "resource", .. }));

        // Same technical name under another source is allowed.
        reg.upsert_resource(resource("res-3", "src-2", "orders"))
            .unwrap();
    }

    #[test]
    fn inactive_resources_are_not_ingestion_targets() {
        let reg = seeded();
        let mut inactive = resource("res-2", "src-1", "returns");
        inactive.active = false;
        reg.upsert_resource(inactive).unwrap();

        let active: Vec<_> = reg
            .active_resources("src-1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(active, vec!["res-1".to_string()]);
        assert!(matches!(
            reg.resource_config("res-2"),
            Err(ConfigError::NotFound { kind: "active resource", .. })
        ));
        assert!(reg.resource_config("res-1").is_ok());
        assert!(matches!(
            reg.resource_config("nope"),
            Err(ConfigError::NotFound { kind: "resource", .. })
        ));
    }

    #[test]
    fn technical_names_must_be_identifiers() {
        let reg = InMemoryRegistry::new();
        let err = reg
            .upsert_source(Source::new("src-1", "Amazon TR", "Amazon TR"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidIdentifier { suggested, .. } if suggested == "amazon_tr"
        ));
    }
}
