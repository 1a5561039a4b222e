//! Relationship classes.
//!
//! A relationship class holds entity tuples, one entity per member class.
//! Queries scan the current tuples and keep those whose component at
//! every filtered position is allowed by the filter.
//!
//! ## Compaction
//!
//! With `compact` on, a dimension filtered to a single entity or given an
//! explicit `anything` is left out of the result, and the projected tuples
//! are deduplicated in first-seen order. When one dimension remains the
//! result is a flat entity list.
//!
//! ## Reverse index
//!
//! When built with [`RelationshipClass::build_reverse_index`], each position
//! maps entity → rows holding it there. A filtered query then starts from
//! the smallest row set among its filtered dimensions instead of scanning
//! every tuple.

use std::hash::Hash;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use crate::model::{Entity, RelationshipKey};
use crate::{Error, Result};
use super::{
    dimension_names, resolve_filters, unknown_dimension, ClassIndex, DimensionFilter, Filters,
    ObjectClass, QueryOptions, Selection,
};

/// A named set of entity tuples over ordered member classes.
#[derive(Debug)]
pub struct RelationshipClass {
    name: String,
    member_classes: Vec<String>,
    dimensions: Vec<String>,
    members: Vec<Arc<ObjectClass>>,
    /// Current tuples, in ingest order.
    keys: Vec<RelationshipKey>,
    rows: HashMap<RelationshipKey, usize>,
    /// position → entity → rows (ascending)
    reverse: Option<Vec<HashMap<Entity, Vec<usize>>>>,
}

impl RelationshipClass {
    pub fn new(name: impl Into<String>, members: Vec<Arc<ObjectClass>>) -> Self {
        let member_classes: Vec<String> = members.iter().map(|m| m.name().to_owned()).collect();
        Self {
            name: name.into(),
            dimensions: dimension_names(&member_classes),
            member_classes,
            members,
            keys: Vec::new(),
            rows: HashMap::new(),
            reverse: None,
        }
    }

    /// Add the tuple naming one object per member class.
    ///
    /// Fails on an arity mismatch, an object missing from its member class,
    /// or a tuple already present.
    pub fn insert<S: AsRef<str>>(&mut self, objects: &[S]) -> Result<()> {
        if objects.len() != self.members.len() {
            return Err(Error::MalformedIngest(format!(
                "relationship of {} needs {} objects, got {}",
                self.name,
                self.members.len(),
                objects.len()
            )));
        }
        let key: RelationshipKey = self
            .members
            .iter()
            .zip(objects)
            .map(|(class, object)| class.entity(object.as_ref()))
            .collect::<Result<_>>()?;

        if self.rows.contains_key(&key) {
            return Err(Error::DuplicateName {
                kind: "relationship",
                name: format!("{}{key}", self.name),
            });
        }
        self.rows.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        // Any earlier reverse index is stale now.
        self.reverse = None;
        Ok(())
    }

    pub fn build_reverse_index(&mut self) {
        let mut reverse: Vec<HashMap<Entity, Vec<usize>>> =
            vec![HashMap::new(); self.members.len()];
        for (row, key) in self.keys.iter().enumerate() {
            for (position, entity) in key.iter().enumerate() {
                reverse[position].entry(entity.clone()).or_default().push(row);
            }
        }
        self.reverse = Some(reverse);
    }

    pub fn has_reverse_index(&self) -> bool {
        self.reverse.is_some()
    }

    /// All current tuples, in ingest order.
    pub fn relationships(&self) -> &[RelationshipKey] {
        &self.keys
    }

    /// Rows worth testing against `filters`, ascending.
    fn candidate_rows(&self, filters: &[DimensionFilter]) -> Vec<usize> {
        let Some(reverse) = &self.reverse else {
            return (0..self.keys.len()).collect();
        };
        filters
            .iter()
            .filter_map(|f| {
                let mut rows: Vec<usize> = f
                    .allowed
                    .as_ref()?
                    .iter()
                    .filter_map(|e| reverse[f.position].get(e))
                    .flatten()
                    .copied()
                    .collect();
                rows.sort_unstable();
                rows.dedup();
                Some(rows)
            })
            .min_by_key(Vec::len)
            .unwrap_or_else(|| (0..self.keys.len()).collect())
    }
}

/// `items` without repeats, in first-seen order.
fn first_seen<T: Clone + Eq + Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

impl ClassIndex for RelationshipClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    fn member_classes(&self) -> &[String] {
        &self.member_classes
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn contains_key(&self, key: &[Entity]) -> bool {
        // Borrowed lookup would need a second key type; keys are small.
        self.rows.contains_key(&RelationshipKey::new(key.iter().cloned()))
    }

    fn check_member(&self, position: usize, entity: &Entity) -> Result<()> {
        let class = self.members.get(position).ok_or_else(|| Error::UnknownDimension {
            class: self.name.clone(),
            dimension: position.to_string(),
        })?;
        if class.contains(entity) {
            Ok(())
        } else {
            Err(Error::UnknownEntity {
                class: class.name().to_owned(),
                name: entity.name().to_owned(),
            })
        }
    }

    fn query(&self, filters: &Filters, options: &QueryOptions) -> Result<Selection> {
        trace!(class = %self.name, filters = filters.len(), compact = options.compact, "relationship class query");
        let resolved = resolve_filters(self, filters)?
            .ok_or_else(|| unknown_dimension(self, filters))?;

        let matching = self
            .candidate_rows(&resolved)
            .into_iter()
            .map(|row| &self.keys[row])
            .filter(|key| resolved.iter().all(|f| f.accepts(&key[f.position])));

        // Anything on every dimension lists the class like no filter at all.
        let listing = resolved.len() == self.dimensions.len()
            && resolved.iter().all(DimensionFilter::is_wildcard);
        let kept: Vec<usize> = (0..self.dimensions.len())
            .filter(|&p| {
                !options.compact
                    || listing
                    || !resolved
                        .iter()
                        .any(|f| f.position == p && (f.is_single() || f.is_wildcard()))
            })
            .collect();

        let selection = match kept.as_slice() {
            [only] if options.compact => {
                Selection::Entities(first_seen(matching.map(|key| key[*only].clone())))
            }
            _ if kept.len() < self.dimensions.len() => Selection::Tuples {
                dimensions: kept.iter().map(|&p| self.dimensions[p].clone()).collect(),
                keys: first_seen(matching.map(|key| key.project(&kept))),
            },
            _ => Selection::Tuples {
                dimensions: self.dimensions.clone(),
                keys: matching.cloned().collect(),
            },
        };

        if selection.is_empty() {
            Ok(options.default.clone())
        } else {
            Ok(selection)
        }
    }
}
