//! # spine-interface — In-Memory Query & Indexing Engine
//!
//! Loads a dataset of object classes, relationship classes and parameter
//! values once, indexes it, and answers membership queries and parameter
//! lookups against it.
//!
//! ## Design Principles
//!
//! 1. **Source-agnostic**: `DataSource` is the contract between the engine and whatever holds the data
//! 2. **Immutable snapshots**: a loaded dataset never changes; a reload publishes a new one
//! 3. **One query contract**: object and relationship classes both implement `ClassIndex`
//! 4. **Values are DTOs**: `Value` covers scalars, arrays, time series and nested maps
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spine_interface::{Dataset, Entity, Filters, Lookup, MemorySource, QueryOptions};
//!
//! # fn example() -> spine_interface::Result<()> {
//! let source = MemorySource::new()
//!     .with_object_class("actor", ["Phoenix", "Johansson"])
//!     .with_object_class("film", ["Her", "Joker"])
//!     .with_relationship_class(
//!         "actor__film",
//!         ["actor", "film"],
//!         [["Phoenix", "Joker"], ["Phoenix", "Her"], ["Johansson", "Her"]],
//!     )
//!     .with_parameter_value("release_year", "film", ["Joker"], 2019);
//!
//! let dataset = Dataset::open(&source)?;
//! let snapshot = dataset.snapshot();
//!
//! let films = snapshot.query(
//!     "actor__film",
//!     &Filters::new().with("actor", Entity::new("actor", "Johansson")),
//!     &QueryOptions::default(),
//! )?;
//! println!("{films:?}");
//!
//! let year = snapshot.resolve(
//!     "release_year",
//!     &Filters::new().with("film", Entity::new("film", "Joker")),
//!     &Lookup::new(),
//! )?;
//! println!("{year:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Data Sources
//!
//! | Source | Description |
//! |--------|-------------|
//! | `MemorySource` | Definitions built in code or parsed from JSON |
//! | any `DataSource` | Binders to external stores implement the trait |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod index;
pub mod parameter;
pub mod storage;
pub mod snapshot;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Entity, RelationshipKey, TimeSlice, Timestamp, TimeSeries,
    MapKey, ParameterMap, Value,
};
pub use model::{
    duration, before, overlaps, iscontained, overlap_duration,
    t_lowest_resolution, t_highest_resolution,
};

// ============================================================================
// Re-exports: Queries
// ============================================================================

pub use index::{
    ClassIndex, ObjectClass, RelationshipClass,
    Filter, Filters, QueryOptions, Selection, anything,
};
pub use parameter::{Parameter, Lookup, IndexEntry, Indices};

// ============================================================================
// Re-exports: Storage & Snapshots
// ============================================================================

pub use storage::{DataSource, DatasetConfig, MemorySource};
pub use snapshot::{Snapshot, SnapshotId};

// ============================================================================
// Top-level Dataset handle
// ============================================================================

/// The primary entry point. A `Dataset` owns the current [`Snapshot`] and
/// swaps in a new one on reload.
///
/// Readers take an `Arc<Snapshot>` and keep a consistent view for as long
/// as they hold it. Reloads are serialized; a failed reload leaves the
/// current snapshot in place.
pub struct Dataset {
    config: DatasetConfig,
    current: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
    next_snapshot_id: AtomicU64,
}

impl Dataset {
    /// An empty dataset (snapshot 0) with the given configuration.
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(Snapshot::empty(SnapshotId(0)))),
            reload_lock: Mutex::new(()),
            next_snapshot_id: AtomicU64::new(1),
        }
    }

    /// Load `source` with the default configuration.
    pub fn open<S: DataSource>(source: &S) -> Result<Self> {
        Self::open_with(source, DatasetConfig::default())
    }

    pub fn open_with<S: DataSource>(source: &S, config: DatasetConfig) -> Result<Self> {
        let dataset = Self::new(config);
        dataset.reload(source)?;
        Ok(dataset)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Build a snapshot from `source` and publish it.
    ///
    /// Readers holding the previous snapshot are unaffected. On error the
    /// previous snapshot stays current.
    pub fn reload<S: DataSource>(&self, source: &S) -> Result<SnapshotId> {
        let _writer = self.reload_lock.lock();
        let id = SnapshotId(self.next_snapshot_id.fetch_add(1, Ordering::Relaxed));
        let snapshot = Snapshot::build(source, &self.config, id)?;
        *self.current.write() = Arc::new(snapshot);
        info!(snapshot = %id, "snapshot published");
        Ok(id)
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Unknown entity {name} in class {class}")]
    UnknownEntity { class: String, name: String },

    #[error("Class {class} has no dimension {dimension}")]
    UnknownDimension { class: String, dimension: String },

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Parameter {parameter} is not specified for {key}")]
    ParameterNotSpecified { parameter: String, key: String },

    #[error("Index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Map key not found: {key}")]
    MapKeyNotFound { key: String },

    #[error("Ambiguous temporal match for {t}: {candidates:?}")]
    AmbiguousTemporalMatch { t: String, candidates: Vec<String> },

    #[error("Duplicate {kind}: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Malformed ingest data: {0}")]
    MalformedIngest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
