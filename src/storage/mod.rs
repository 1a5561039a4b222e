//! # Data Source Trait
//!
//! The contract between this crate and whatever store holds the dataset.
//! A source hands over fully materialized class and parameter definitions;
//! the snapshot builder validates and indexes them.
//!
//! ## Implementations
//!
//! | Source | Module | Description |
//! |--------|--------|-------------|
//! | `MemorySource` | `memory` | Definitions built in code or parsed from JSON |

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::model::Value;
use crate::Result;

pub use memory::MemorySource;

// ============================================================================
// Configuration
// ============================================================================

/// How snapshots are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Build the entity → rows reverse index of every relationship class.
    pub reverse_index: bool,
    /// Abort population on a parameter value for a key that is not a
    /// member of its class. When false such values are dropped.
    pub reject_orphan_values: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            reverse_index: true,
            reject_orphan_values: true,
        }
    }
}

impl DatasetConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Definitions (what a source hands over)
// ============================================================================

/// An object class and the names of its objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectClassDef {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

/// A relationship class, its ordered member classes, and its tuples as
/// object names (one per member class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipClassDef {
    pub name: String,
    pub object_classes: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Vec<String>>,
}

/// The value of a parameter for one member of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValueDef {
    pub class: String,
    /// Object names, one per dimension of `class`.
    pub key: Vec<String>,
    pub value: Value,
}

/// A parameter, the classes it is defined on, and its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub classes: Vec<String>,
    #[serde(default)]
    pub values: Vec<ParameterValueDef>,
}

// ============================================================================
// DataSource Trait
// ============================================================================

/// The ingest contract.
///
/// Every call returns a complete, owned copy of the definitions; a source
/// that cannot produce them reports it through the error instead of
/// returning a partial list.
pub trait DataSource {
    fn object_classes(&self) -> Result<Vec<ObjectClassDef>>;

    fn relationship_classes(&self) -> Result<Vec<RelationshipClassDef>>;

    fn parameters(&self) -> Result<Vec<ParameterDef>>;

    /// Short label for logs.
    fn describe(&self) -> String {
        "data source".to_owned()
    }
}

impl<S: DataSource + ?Sized> DataSource for &S {
    fn object_classes(&self) -> Result<Vec<ObjectClassDef>> { (**self).object_classes() }
    fn relationship_classes(&self) -> Result<Vec<RelationshipClassDef>> { (**self).relationship_classes() }
    fn parameters(&self) -> Result<Vec<ParameterDef>> { (**self).parameters() }
    fn describe(&self) -> String { (**self).describe() }
}
