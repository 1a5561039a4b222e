//! # Parameters
//!
//! Sparse maps from class member to [`Value`], for one parameter name over
//! one or more classes.
//!
//! [`Parameter::resolve`] binds every dimension of exactly one class to a
//! single entity, looks up the base value and then navigates into it with a
//! [`Lookup`]: an array index, a time slice for time series, and one key
//! per nested map level. Parts of a lookup that do not apply to the value
//! at hand are ignored.
//!
//! [`Parameter::indices`] enumerates where the parameter is specified,
//! filtered like a class query, without touching the values.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::trace;

use crate::index::{resolve_filters, ClassIndex, DimensionFilter, Filter, Filters};
use crate::model::{Entity, MapKey, RelationshipKey, TimeSlice, Value};
use crate::{Error, Result};

// ============================================================================
// Lookup
// ============================================================================

/// How to navigate into a value, and what to do when nothing is there.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// 0-based index into an array value.
    pub index: Option<usize>,
    /// Query slice for a time series value.
    pub t: Option<TimeSlice>,
    /// One key per nested map level.
    pub inds: Vec<MapKey>,
    /// Fail with [`Error::ParameterNotSpecified`] instead of returning `None`.
    pub strict: bool,
}

impl Default for Lookup {
    fn default() -> Self {
        Self {
            index: None,
            t: None,
            inds: Vec::new(),
            strict: true,
        }
    }
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_time(mut self, t: TimeSlice) -> Self {
        self.t = Some(t);
        self
    }

    pub fn with_map_keys<K: Into<MapKey>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.inds = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Descend from `value` as far as this lookup allows.
    ///
    /// `Ok(None)` means a time series had no entry for the query slice.
    pub fn navigate<'v>(&self, mut value: &'v Value) -> Result<Option<&'v Value>> {
        let mut index = self.index;
        let mut t = self.t.as_ref();
        let mut keys = self.inds.iter();
        loop {
            value = match value {
                Value::Array(items) => match index.take() {
                    Some(i) => items
                        .get(i)
                        .ok_or(Error::IndexOutOfRange { index: i, len: items.len() })?,
                    None => return Ok(Some(value)),
                },
                Value::TimeSeries(series) => match t.take() {
                    Some(t) => match series.at(t)? {
                        Some(v) => v,
                        None => return Ok(None),
                    },
                    None => return Ok(Some(value)),
                },
                Value::Map(map) => match keys.next() {
                    Some(k) => map
                        .get(k)
                        .ok_or_else(|| Error::MapKeyNotFound { key: k.to_string() })?,
                    None => return Ok(Some(value)),
                },
                _ => return Ok(Some(value)),
            };
        }
    }
}

// ============================================================================
// Parameter
// ============================================================================

/// Values of one parameter on one class.
struct ParameterClass {
    class: Arc<dyn ClassIndex>,
    /// In ingest order.
    values: Vec<(RelationshipKey, Value)>,
    rows: HashMap<RelationshipKey, usize>,
}

impl ParameterClass {
    fn get(&self, key: &RelationshipKey) -> Option<&Value> {
        self.rows.get(key).map(|&row| &self.values[row].1)
    }
}

/// A named parameter defined on one or more classes.
pub struct Parameter {
    name: String,
    classes: Vec<ParameterClass>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("classes", &self.classes().collect::<Vec<_>>())
            .field("values", &self.len())
            .finish()
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, classes: Vec<Arc<dyn ClassIndex>>) -> Self {
        Self {
            name: name.into(),
            classes: classes
                .into_iter()
                .map(|class| ParameterClass {
                    class,
                    values: Vec::new(),
                    rows: HashMap::new(),
                })
                .collect(),
        }
    }

    /// Set the value for `key` of `class`.
    ///
    /// Fails when `class` is not one of the parameter's classes, when `key`
    /// is not a current member of it, or when `key` already has a value.
    pub fn insert(&mut self, class: &str, key: RelationshipKey, value: Value) -> Result<()> {
        let parameter = &self.name;
        let pc = self
            .classes
            .iter_mut()
            .find(|pc| pc.class.name() == class)
            .ok_or_else(|| Error::UnknownClass(format!("{class} (parameter {parameter})")))?;
        if !pc.class.contains_key(&key) {
            return Err(Error::MalformedIngest(format!(
                "value of {parameter} for {key}: not a member of {class}"
            )));
        }
        if pc.rows.contains_key(&key) {
            return Err(Error::DuplicateName {
                kind: "parameter value",
                name: format!("{parameter}{key}"),
            });
        }
        pc.rows.insert(key.clone(), pc.values.len());
        pc.values.push((key, value));
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the classes this parameter is defined on.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|pc| pc.class.name())
    }

    /// Number of specified values over all classes.
    pub fn len(&self) -> usize {
        self.classes.iter().map(|pc| pc.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored value for `key` of `class`, without navigation.
    pub fn value(&self, class: &str, key: &[Entity]) -> Option<&Value> {
        let pc = self.classes.iter().find(|pc| pc.class.name() == class)?;
        pc.get(&RelationshipKey::new(key.iter().cloned()))
    }

    /// The value for the member bound by `binding`, navigated by `lookup`.
    ///
    /// `binding` must bind every dimension of one of the parameter's classes
    /// to a single entity. A missing value (or a time series with nothing
    /// for `lookup.t`) is [`Error::ParameterNotSpecified`] when
    /// `lookup.strict`, and `Ok(None)` otherwise.
    pub fn resolve(&self, binding: &Filters, lookup: &Lookup) -> Result<Option<&Value>> {
        trace!(parameter = %self.name, bound = binding.len(), "resolve");
        let (pc, key) = self.bind(binding)?;
        let found = match pc.get(&key) {
            Some(base) => lookup.navigate(base)?,
            None => None,
        };
        match found {
            Some(value) => Ok(Some(value)),
            None if lookup.strict => Err(Error::ParameterNotSpecified {
                parameter: self.name.clone(),
                key: describe(pc.class.dimensions(), &key),
            }),
            None => Ok(None),
        }
    }

    /// The class fully bound by `binding`, and the key it binds.
    fn bind(&self, binding: &Filters) -> Result<(&ParameterClass, RelationshipKey)> {
        for (dimension, filter) in binding.iter() {
            if !matches!(filter, Filter::One(_)) {
                return Err(Error::InvalidKey(format!(
                    "{} needs a single entity for {dimension}",
                    self.name
                )));
            }
        }
        let pc = self
            .classes
            .iter()
            .find(|pc| {
                let dims = pc.class.dimensions();
                dims.len() == binding.len() && dims.iter().all(|d| binding.get(d).is_some())
            })
            .ok_or_else(|| {
                let bound: Vec<&str> = binding.iter().map(|(d, _)| d).collect();
                Error::InvalidKey(format!(
                    "{} is not defined on a class with dimensions [{}]",
                    self.name,
                    bound.join(", ")
                ))
            })?;

        let mut key = Vec::with_capacity(binding.len());
        for (position, dimension) in pc.class.dimensions().iter().enumerate() {
            if let Some(Filter::One(entity)) = binding.get(dimension) {
                pc.class.check_member(position, entity)?;
                key.push(entity.clone());
            }
        }
        Ok((pc, RelationshipKey::new(key)))
    }

    /// Members with a non-null value, filtered like a class query.
    ///
    /// A filter restricts the classes that have its dimension and excludes
    /// the ones that lack it. A dimension no class has is an error.
    pub fn indices(&self, filters: &Filters) -> Result<Indices<'_>> {
        for (dimension, _) in filters.iter() {
            let known = self
                .classes
                .iter()
                .any(|pc| pc.class.dimensions().iter().any(|d| d == dimension));
            if !known {
                return Err(Error::UnknownDimension {
                    class: self.name.clone(),
                    dimension: dimension.to_owned(),
                });
            }
        }

        let mut plans = Vec::with_capacity(self.classes.len());
        for (i, pc) in self.classes.iter().enumerate() {
            if let Some(resolved) = resolve_filters(pc.class.as_ref(), filters)? {
                plans.push((i, resolved));
            }
        }
        Ok(Indices {
            parameter: self,
            plans,
            plan: 0,
            row: 0,
        })
    }
}

/// `actor => Johansson, film => Joker`
fn describe(dimensions: &[String], key: &RelationshipKey) -> String {
    dimensions
        .iter()
        .zip(key.iter())
        .map(|(d, e)| format!("{d} => {e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Indices
// ============================================================================

/// One member where a parameter is specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry<'p> {
    pub class: &'p str,
    pub dimensions: &'p [String],
    pub key: &'p RelationshipKey,
}

impl IndexEntry<'_> {
    /// The entity bound to `dimension`.
    pub fn get(&self, dimension: &str) -> Option<&Entity> {
        let position = self.dimensions.iter().position(|d| d == dimension)?;
        self.key.get(position)
    }
}

impl fmt::Display for IndexEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", describe(self.dimensions, self.key))
    }
}

/// Lazy iterator returned by [`Parameter::indices`]. Clone it to restart.
#[derive(Clone)]
pub struct Indices<'p> {
    parameter: &'p Parameter,
    /// (class position, filters bound to that class)
    plans: Vec<(usize, Vec<DimensionFilter>)>,
    plan: usize,
    row: usize,
}

impl<'p> Iterator for Indices<'p> {
    type Item = IndexEntry<'p>;

    fn next(&mut self) -> Option<IndexEntry<'p>> {
        let parameter: &'p Parameter = self.parameter;
        while let Some((class, filters)) = self.plans.get(self.plan) {
            let pc = &parameter.classes[*class];
            while let Some((key, value)) = pc.values.get(self.row) {
                self.row += 1;
                if !value.is_null() && filters.iter().all(|f| f.accepts(&key[f.position])) {
                    return Some(IndexEntry {
                        class: pc.class.name(),
                        dimensions: pc.class.dimensions(),
                        key,
                    });
                }
            }
            self.plan += 1;
            self.row = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{anything, ObjectClass, RelationshipClass};
    use crate::model::{ParameterMap, TimeSeries};
    use chrono::NaiveDate;

    fn node(n: &str) -> Entity { Entity::new("node", n) }

    fn demand() -> Parameter {
        let nodes = Arc::new(ObjectClass::new("node", ["Nimes", "Sthlm", "Leuven"]).unwrap());
        let mut p = Parameter::new("demand", vec![nodes as Arc<dyn ClassIndex>]);
        p.insert("node", node("Nimes").into(), Value::from(vec![18, 19])).unwrap();
        p.insert("node", node("Sthlm").into(), Value::from(vec![21, 22, 23])).unwrap();
        p.insert("node", node("Leuven").into(), Value::Null).unwrap();
        p
    }

    #[test]
    fn test_array_index() {
        let p = demand();
        let b = Filters::new().with("node", node("Sthlm"));
        assert_eq!(p.resolve(&b, &Lookup::new().with_index(0)).unwrap(), Some(&Value::Int(21)));
        let err = p.resolve(&b, &Lookup::new().with_index(3)).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 3 }));
        // No index: the whole array.
        assert_eq!(p.resolve(&b, &Lookup::new()).unwrap().map(Value::type_name), Some("ARRAY"));
    }

    #[test]
    fn test_wildcard_binding_rejected() {
        let p = demand();
        let err = p.resolve(&Filters::new().with("node", anything()), &Lookup::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
        let err = p.resolve(&Filters::new(), &Lookup::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_explicit_null_is_specified() {
        let p = demand();
        let b = Filters::new().with("node", node("Leuven"));
        assert_eq!(p.resolve(&b, &Lookup::new()).unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_indices_skip_null() {
        let p = demand();
        let names: Vec<String> = p
            .indices(&Filters::new())
            .unwrap()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(names, vec!["node => Nimes", "node => Sthlm"]);
    }

    #[test]
    fn test_nested_navigation() {
        let nodes = Arc::new(ObjectClass::new("node", ["Sthlm"]).unwrap());
        let day = |d| NaiveDate::from_ymd_opt(2030, 1, d).and_then(|x| x.and_hms_opt(0, 0, 0)).unwrap();
        let series = TimeSeries::new(vec![
            (TimeSlice::new(day(1), day(2)).unwrap(), Value::from(vec![1.0, 2.0])),
            (TimeSlice::new(day(2), day(3)).unwrap(), Value::from(vec![3.0, 4.0])),
        ]).unwrap();
        let map = ParameterMap::new(vec![(MapKey::from("base"), Value::from(series))]).unwrap();

        let mut p = Parameter::new("price", vec![nodes as Arc<dyn ClassIndex>]);
        p.insert("node", node("Sthlm").into(), Value::Map(map)).unwrap();

        let b = Filters::new().with("node", node("Sthlm"));
        let lookup = Lookup::new()
            .with_map_keys(["base"])
            .with_time(TimeSlice::new(day(2), day(3)).unwrap())
            .with_index(1);
        assert_eq!(p.resolve(&b, &lookup).unwrap(), Some(&Value::Float(4.0)));

        let missing = Lookup::new().with_map_keys(["peak"]);
        assert!(matches!(p.resolve(&b, &missing), Err(Error::MapKeyNotFound { .. })));

        let uncovered = Lookup::new()
            .with_map_keys(["base"])
            .with_time(TimeSlice::new(day(5), day(6)).unwrap());
        assert!(matches!(p.resolve(&b, &uncovered), Err(Error::ParameterNotSpecified { .. })));
        assert_eq!(p.resolve(&b, &uncovered.with_strict(false)).unwrap(), None);
    }

    #[test]
    fn test_insert_validation() {
        let nodes = Arc::new(ObjectClass::new("node", ["a"]).unwrap());
        let edges = Arc::new(RelationshipClass::new("node__node", vec![nodes.clone(), nodes.clone()]));
        let mut p = Parameter::new("w", vec![nodes as Arc<dyn ClassIndex>, edges as Arc<dyn ClassIndex>]);
        assert!(matches!(
            p.insert("unit", node("a").into(), Value::Null),
            Err(Error::UnknownClass(_))
        ));
        assert!(matches!(
            p.insert("node__node", RelationshipKey::new([node("a"), node("a")]), Value::Null),
            Err(Error::MalformedIngest(_))
        ));
        p.insert("node", node("a").into(), Value::from(1)).unwrap();
        assert!(matches!(
            p.insert("node", node("a").into(), Value::from(2)),
            Err(Error::DuplicateName { .. })
        ));
        assert_eq!(p.classes().collect::<Vec<_>>(), vec!["node", "node__node"]);
    }
}
