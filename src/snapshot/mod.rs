//! Dataset snapshots.
//!
//! A snapshot is built in one pass from a [`DataSource`] and never changes
//! afterwards. Lookups go through explicit name → handle tables.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::index::{ClassIndex, Filters, ObjectClass, QueryOptions, RelationshipClass, Selection};
use crate::model::{Entity, RelationshipKey, Value};
use crate::parameter::{Lookup, Parameter};
use crate::storage::{DataSource, DatasetConfig, ParameterDef, RelationshipClassDef};
use crate::{Error, Result};

/// Opaque snapshot identifier, increasing with every publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub u64);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable, fully indexed copy of a dataset.
#[derive(Debug)]
pub struct Snapshot {
    id: SnapshotId,
    loaded_at: DateTime<Utc>,
    object_classes: HashMap<String, Arc<ObjectClass>>,
    relationship_classes: HashMap<String, Arc<RelationshipClass>>,
    parameters: HashMap<String, Arc<Parameter>>,
    /// Names in ingest order, for listings.
    object_class_order: Vec<String>,
    relationship_class_order: Vec<String>,
    parameter_order: Vec<String>,
}

impl Snapshot {
    /// A snapshot with no classes and no parameters.
    pub fn empty(id: SnapshotId) -> Self {
        Self {
            id,
            loaded_at: Utc::now(),
            object_classes: HashMap::new(),
            relationship_classes: HashMap::new(),
            parameters: HashMap::new(),
            object_class_order: Vec::new(),
            relationship_class_order: Vec::new(),
            parameter_order: Vec::new(),
        }
    }

    /// Read every definition from `source`, validate it and index it.
    ///
    /// Any invalid definition aborts the whole build.
    pub fn build<S: DataSource>(source: &S, config: &DatasetConfig, id: SnapshotId) -> Result<Self> {
        let mut snapshot = Self::empty(id);

        for def in source.object_classes()? {
            snapshot.check_class_name_free(&def.name)?;
            let class = ObjectClass::new(def.name.clone(), def.objects)?;
            debug!(class = %def.name, objects = class.len(), "object class built");
            snapshot.object_class_order.push(def.name.clone());
            snapshot.object_classes.insert(def.name, Arc::new(class));
        }

        for def in source.relationship_classes()? {
            snapshot.check_class_name_free(&def.name)?;
            let class = snapshot.build_relationship_class(&def, config)?;
            debug!(
                class = %def.name,
                relationships = class.len(),
                reverse_index = class.has_reverse_index(),
                "relationship class built"
            );
            snapshot.relationship_class_order.push(def.name.clone());
            snapshot.relationship_classes.insert(def.name, Arc::new(class));
        }

        for def in source.parameters()? {
            if snapshot.parameters.contains_key(&def.name) {
                return Err(Error::DuplicateName { kind: "parameter", name: def.name });
            }
            let parameter = snapshot.build_parameter(&def, config)?;
            debug!(parameter = %def.name, values = parameter.len(), "parameter built");
            snapshot.parameter_order.push(def.name.clone());
            snapshot.parameters.insert(def.name, Arc::new(parameter));
        }

        info!(
            snapshot = %id,
            source = %source.describe(),
            object_classes = snapshot.object_classes.len(),
            relationship_classes = snapshot.relationship_classes.len(),
            parameters = snapshot.parameters.len(),
            "snapshot built"
        );
        Ok(snapshot)
    }

    fn check_class_name_free(&self, name: &str) -> Result<()> {
        if self.object_classes.contains_key(name) || self.relationship_classes.contains_key(name) {
            return Err(Error::DuplicateName { kind: "class", name: name.to_owned() });
        }
        Ok(())
    }

    fn build_relationship_class(
        &self,
        def: &RelationshipClassDef,
        config: &DatasetConfig,
    ) -> Result<RelationshipClass> {
        if def.object_classes.is_empty() {
            return Err(Error::MalformedIngest(format!(
                "relationship class {} has no member classes",
                def.name
            )));
        }
        let members = def
            .object_classes
            .iter()
            .map(|name| self.object_class(name).cloned())
            .collect::<Result<Vec<_>>>()?;

        let mut class = RelationshipClass::new(def.name.clone(), members);
        for objects in &def.relationships {
            class.insert(objects)?;
        }
        if config.reverse_index {
            class.build_reverse_index();
        }
        Ok(class)
    }

    fn build_parameter(&self, def: &ParameterDef, config: &DatasetConfig) -> Result<Parameter> {
        let classes = def
            .classes
            .iter()
            .map(|name| self.class(name))
            .collect::<Result<Vec<_>>>()?;
        let mut parameter = Parameter::new(def.name.clone(), classes);

        for value in &def.values {
            let class = self.class(&value.class)?;
            let key = match self.key_for(class.as_ref(), &value.key) {
                Ok(key) if class.contains_key(&key) => Ok(key),
                Ok(key) => Err(Error::MalformedIngest(format!(
                    "value of {} for {key}: not a member of {}",
                    def.name, value.class
                ))),
                Err(e) => Err(e),
            };
            match key {
                Ok(key) => parameter.insert(&value.class, key, value.value.clone())?,
                Err(e) if !config.reject_orphan_values => {
                    warn!(parameter = %def.name, class = %value.class, error = %e, "orphan value dropped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(parameter)
    }

    /// The key of `class` naming `objects`, one per dimension.
    fn key_for(&self, class: &dyn ClassIndex, objects: &[String]) -> Result<RelationshipKey> {
        let members = class.member_classes();
        if members.len() != objects.len() {
            return Err(Error::MalformedIngest(format!(
                "key of {} needs {} objects, got {}",
                class.name(),
                members.len(),
                objects.len()
            )));
        }
        members
            .iter()
            .zip(objects)
            .map(|(member, object)| self.object_class(member)?.entity(object))
            .collect()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn object_class(&self, name: &str) -> Result<&Arc<ObjectClass>> {
        self.object_classes
            .get(name)
            .ok_or_else(|| Error::UnknownClass(name.to_owned()))
    }

    pub fn relationship_class(&self, name: &str) -> Result<&Arc<RelationshipClass>> {
        self.relationship_classes
            .get(name)
            .ok_or_else(|| Error::UnknownClass(name.to_owned()))
    }

    /// Object or relationship class called `name`.
    pub fn class(&self, name: &str) -> Result<Arc<dyn ClassIndex>> {
        if let Some(c) = self.object_classes.get(name) {
            return Ok(Arc::clone(c) as Arc<dyn ClassIndex>);
        }
        if let Some(c) = self.relationship_classes.get(name) {
            return Ok(Arc::clone(c) as Arc<dyn ClassIndex>);
        }
        Err(Error::UnknownClass(name.to_owned()))
    }

    pub fn parameter(&self, name: &str) -> Result<&Arc<Parameter>> {
        self.parameters
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_owned()))
    }

    pub fn object_class_names(&self) -> impl Iterator<Item = &str> {
        self.object_class_order.iter().map(String::as_str)
    }

    pub fn relationship_class_names(&self) -> impl Iterator<Item = &str> {
        self.relationship_class_order.iter().map(String::as_str)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameter_order.iter().map(String::as_str)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// [`ClassIndex::query`] on the class called `class`.
    pub fn query(&self, class: &str, filters: &Filters, options: &QueryOptions) -> Result<Selection> {
        self.class(class)?.query(filters, options)
    }

    /// [`Parameter::resolve`] on the parameter called `parameter`.
    pub fn resolve(&self, parameter: &str, binding: &Filters, lookup: &Lookup) -> Result<Option<&Value>> {
        self.parameter(parameter)?.resolve(binding, lookup)
    }

    /// Objects of `class` whose stored value of `parameter` equals `value`.
    pub fn objects_where(&self, class: &str, parameter: &str, value: &Value) -> Result<Vec<Entity>> {
        let objects = self.object_class(class)?;
        let parameter = self.parameter(parameter)?;
        if !parameter.classes().any(|c| c == class) {
            return Err(Error::InvalidKey(format!(
                "{} is not defined on {class}",
                parameter.name()
            )));
        }
        Ok(objects
            .objects()
            .iter()
            .filter(|e| parameter.value(class, std::slice::from_ref(*e)) == Some(value))
            .cloned()
            .collect())
    }
}
