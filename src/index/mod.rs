//! # Class Indexes
//!
//! Membership sets over entities (object classes) and entity tuples
//! (relationship classes), queried with wildcard-aware filters.
//!
//! ## Implementations
//!
//! | Index | Module | Dimensions |
//! |-------|--------|------------|
//! | `ObjectClass` | `object_class` | one, named after the class |
//! | `RelationshipClass` | `relationship_class` | one per member class |

pub mod object_class;
pub mod relationship_class;

use crate::model::{Entity, RelationshipKey};
use crate::{Error, Result};

pub use object_class::ObjectClass;
pub use relationship_class::RelationshipClass;

// ============================================================================
// Filters
// ============================================================================

/// Filter on one dimension of a class.
///
/// Leaving a dimension out of [`Filters`] matches every value and keeps
/// the dimension. `Anything` also matches every value, but counts as a
/// filter for compaction: the dimension is kept only with `compact` off.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    /// Match every value of the dimension.
    #[default]
    Anything,
    /// Match exactly this entity.
    One(Entity),
    /// Match any entity of the set. An empty set matches nothing.
    Many(Vec<Entity>),
}

/// The wildcard filter.
pub fn anything() -> Filter {
    Filter::Anything
}

impl From<Entity> for Filter {
    fn from(e: Entity) -> Self { Filter::One(e) }
}

impl From<Vec<Entity>> for Filter {
    fn from(v: Vec<Entity>) -> Self { Filter::Many(v) }
}

impl From<&[Entity]> for Filter {
    fn from(v: &[Entity]) -> Self { Filter::Many(v.to_vec()) }
}

/// Filters by dimension name. Dimensions left out are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, Filter)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter for `dimension`, replacing any earlier one.
    pub fn with(mut self, dimension: impl Into<String>, filter: impl Into<Filter>) -> Self {
        let dimension = dimension.into();
        let filter = filter.into();
        match self.0.iter_mut().find(|(d, _)| *d == dimension) {
            Some(slot) => slot.1 = filter,
            None => self.0.push((dimension, filter)),
        }
        self
    }

    pub fn get(&self, dimension: &str) -> Option<&Filter> {
        self.0.iter().find(|(d, _)| d == dimension).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.0.iter().map(|(d, f)| (d.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Query options and results
// ============================================================================

/// Options of [`ClassIndex::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Drop dimensions filtered down to a single entity, and dimensions
    /// given an explicit [`anything`] filter.
    pub compact: bool,
    /// Returned instead of an empty result.
    pub default: Selection,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            compact: true,
            default: Selection::default(),
        }
    }
}

impl QueryOptions {
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_default(mut self, default: Selection) -> Self {
        self.default = default;
        self
    }
}

/// Result of a class query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Members of an object class, or the one dimension left after compacting.
    Entities(Vec<Entity>),
    /// Relationship tuples restricted to `dimensions`.
    Tuples {
        dimensions: Vec<String>,
        keys: Vec<RelationshipKey>,
    },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Entities(Vec::new())
    }
}

impl Selection {
    pub fn len(&self) -> usize {
        match self {
            Selection::Entities(v) => v.len(),
            Selection::Tuples { keys, .. } => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_entities(&self) -> Option<&[Entity]> {
        match self {
            Selection::Entities(v) => Some(v),
            Selection::Tuples { .. } => None,
        }
    }

    pub fn into_entities(self) -> Option<Vec<Entity>> {
        match self {
            Selection::Entities(v) => Some(v),
            Selection::Tuples { .. } => None,
        }
    }

    pub fn as_tuples(&self) -> Option<(&[String], &[RelationshipKey])> {
        match self {
            Selection::Tuples { dimensions, keys } => Some((dimensions, keys)),
            Selection::Entities(_) => None,
        }
    }
}

// ============================================================================
// ClassIndex trait
// ============================================================================

/// The query contract shared by object and relationship classes.
///
/// Keys are entity tuples in dimension order; object classes have a
/// single dimension named after the class itself.
pub trait ClassIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Dimension names, in key order. Used as filter names.
    fn dimensions(&self) -> &[String];

    /// Object class each dimension draws its entities from.
    fn member_classes(&self) -> &[String];

    /// Number of current members.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is a current member.
    fn contains_key(&self, key: &[Entity]) -> bool;

    /// Fails with [`Error::UnknownEntity`] unless `entity` belongs to the
    /// object class behind dimension `position`.
    fn check_member(&self, position: usize, entity: &Entity) -> Result<()>;

    /// Members passing `filters`, shaped by `options`.
    fn query(&self, filters: &Filters, options: &QueryOptions) -> Result<Selection>;
}

// ============================================================================
// Filter resolution (shared by class queries and parameter indices)
// ============================================================================

/// A filter bound to a key position.
#[derive(Debug, Clone)]
pub(crate) struct DimensionFilter {
    pub position: usize,
    /// Sorted, deduplicated. `None` for an explicit wildcard.
    pub allowed: Option<Vec<Entity>>,
}

impl DimensionFilter {
    pub fn accepts(&self, entity: &Entity) -> bool {
        match &self.allowed {
            Some(allowed) => allowed.binary_search(entity).is_ok(),
            None => true,
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(&self.allowed, Some(allowed) if allowed.len() == 1)
    }

    pub fn is_wildcard(&self) -> bool {
        self.allowed.is_none()
    }
}

/// Bind `filters` to positions of `class`. Explicit wildcards are kept
/// with `allowed: None`; omitted dimensions get no entry.
///
/// Returns `Ok(None)` when a filter names a dimension `class` lacks.
pub(crate) fn resolve_filters(
    class: &dyn ClassIndex,
    filters: &Filters,
) -> Result<Option<Vec<DimensionFilter>>> {
    let mut resolved = Vec::with_capacity(filters.len());
    for (dimension, filter) in filters.iter() {
        let Some(position) = class.dimensions().iter().position(|d| d == dimension) else {
            return Ok(None);
        };
        let mut allowed = match filter {
            Filter::Anything => {
                resolved.push(DimensionFilter { position, allowed: None });
                continue;
            }
            Filter::One(e) => vec![e.clone()],
            Filter::Many(v) => v.clone(),
        };
        for entity in &allowed {
            class.check_member(position, entity)?;
        }
        allowed.sort();
        allowed.dedup();
        resolved.push(DimensionFilter { position, allowed: Some(allowed) });
    }
    Ok(Some(resolved))
}

/// The error for a filter naming a dimension `class` does not have.
pub(crate) fn unknown_dimension(class: &dyn ClassIndex, filters: &Filters) -> Error {
    let dimension = filters
        .iter()
        .map(|(d, _)| d)
        .find(|d| !class.dimensions().iter().any(|x| x == d))
        .unwrap_or_default()
        .to_owned();
    Error::UnknownDimension {
        class: class.name().to_owned(),
        dimension,
    }
}

/// Dimension names for the given member classes. Classes appearing more
/// than once get a 1-based occurrence suffix: `[node, node]` becomes
/// `[node1, node2]`.
pub fn dimension_names(member_classes: &[String]) -> Vec<String> {
    let mut seen: hashbrown::HashMap<&str, usize> = hashbrown::HashMap::new();
    member_classes
        .iter()
        .map(|c| {
            let total = member_classes.iter().filter(|x| *x == c).count();
            if total == 1 {
                return c.clone();
            }
            let n = seen.entry(c.as_str()).or_insert(0);
            *n += 1;
            format!("{c}{n}")
        })
        .collect()
}
