//! Schema registry: per-resource ingestion configuration.
//!
//! The ingestion pipeline only reads through [`SchemaRegistry`]. Mutation belongs to the
//! administrative side, which [`InMemoryRegistry`] also implements (with the catalog invariants
//! enforced on every write).

mod memory;
mod model;

pub use memory::{Catalog, InMemoryRegistry};
pub use model::{Category, FieldType, ManualField, Resource, ResourceConfig, Source};

use crate::error::ConfigError;

/// Read-only view of sources and resources used by the pipeline.
pub trait SchemaRegistry: Send + Sync {
    /// Look up a source by id.
    fn source(&self, id: &str) -> Result<Source, ConfigError>;

    /// Look up a resource by id, active or not.
    fn resource(&self, id: &str) -> Result<Resource, ConfigError>;

    /// Active resources of a source, in registration order.
    fn active_resources(&self, source_id: &str) -> Result<Vec<Resource>, ConfigError>;

    /// Current configuration of an ingestible resource.
    ///
    /// Fails with `NotFound` if the resource does not exist or is inactive (inactive resources
    /// are not ingestion targets).
    fn resource_config(&self, resource_id: &str) -> Result<ResourceConfig, ConfigError> {
        self.active_resource(resource_id).map(|r| r.config)
    }

    /// Look up a resource that is currently an ingestion target.
    fn active_resource(&self, id: &str) -> Result<Resource, ConfigError> {
        let resource = self.resource(id)?;
        if !resource.active {
            return Err(ConfigError::NotFound {
                kind: "active resource",
                id: resource.id,
            });
        }
        Ok(resource)
    }
}
