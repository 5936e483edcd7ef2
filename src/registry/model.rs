//! Declarative data model: sources, resources, and their ingestion schema.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ingestion::FileFormat;
use crate::sanitize::{is_identifier, sanitize};

/// An external system that produces reports (e.g. a marketplace portal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub display_name: String,
    /// Lowercase identifier; the schema part of every table this source feeds.
    pub technical_name: String,
}

impl Source {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        technical_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            technical_name: technical_name.into(),
        }
    }
}

/// Routing/display bucket of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Portal,
    Api,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portal => "portal",
            Self::Api => "api",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingestible report type, owned by exactly one [`Source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub source_id: String,
    pub display_name: String,
    /// Identifier, unique within the owning source.
    pub technical_name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "default_active")]
    pub active: bool,
    pub config: ResourceConfig,
}

fn default_active() -> bool {
    true
}

/// Value type of a manual field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Date,
    Boolean,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Boolean => "boolean",
        })
    }
}

/// A value the operator supplies at ingestion time because the file does not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualField {
    /// Label shown to the operator (e.g. "Report Date").
    pub name: String,
    /// Destination column (e.g. `report_date`).
    pub target: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ManualField {
    /// A field whose target is derived from its label.
    pub fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        let name = name.into();
        let target = sanitize(&name);
        Self {
            name,
            target,
            field_type,
            required,
            description: None,
        }
    }

    /// Override the derived target column.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Ingestion schema of a resource: expected file format plus ordered manual fields.
///
/// Manual field order is the column-append order and the display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub format: FileFormat,
    #[serde(default)]
    pub manual_fields: Vec<ManualField>,
}

impl ResourceConfig {
    pub fn new(format: FileFormat, manual_fields: Vec<ManualField>) -> Self {
        Self {
            format,
            manual_fields,
        }
    }

    /// Configuration-time checks: every target is identifier-safe and unique.
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.manual_fields.len());
        for field in &self.manual_fields {
            if !is_identifier(&field.target) {
                return Err(ConfigError::InvalidIdentifier {
                    field: "manual field target",
                    value: field.target.clone(),
                    suggested: sanitize(&field.target),
                });
            }
            if !seen.insert(field.target.as_str()) {
                return Err(ConfigError::DuplicateTarget(field.target.clone()));
            }
        }
        Ok(())
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self::new(FileFormat::Excel, Vec::new())
    }
}
