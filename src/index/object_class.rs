//! Object classes.

use hashbrown::HashMap;
use tracing::trace;

use crate::model::Entity;
use crate::{Error, Result};
use super::{resolve_filters, unknown_dimension, ClassIndex, Filters, QueryOptions, Selection};

/// A named set of entities. Immutable once populated.
#[derive(Debug)]
pub struct ObjectClass {
    /// Doubles as the single dimension name and the member class.
    name: [String; 1],
    objects: Vec<Entity>,
    by_name: HashMap<String, usize>,
}

impl ObjectClass {
    /// Fails with [`Error::DuplicateName`] when a name repeats.
    pub fn new<I, S>(name: impl Into<String>, objects: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name: String = name.into();
        let mut class = Self {
            name: [name],
            objects: Vec::new(),
            by_name: HashMap::new(),
        };
        for object in objects {
            let object: String = object.into();
            if class.by_name.contains_key(&object) {
                return Err(Error::DuplicateName {
                    kind: "object",
                    name: format!("{}::{object}", class.name[0]),
                });
            }
            class.by_name.insert(object.clone(), class.objects.len());
            class.objects.push(Entity::new(class.name[0].as_str(), object));
        }
        Ok(class)
    }

    /// All members, in ingest order.
    pub fn objects(&self) -> &[Entity] {
        &self.objects
    }

    /// The member called `name`.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).map(|&i| &self.objects[i])
    }

    /// Like [`ObjectClass::get`], failing with [`Error::UnknownEntity`].
    pub fn entity(&self, name: &str) -> Result<Entity> {
        self.get(name).cloned().ok_or_else(|| Error::UnknownEntity {
            class: self.name[0].clone(),
            name: name.to_owned(),
        })
    }

    pub fn contains(&self, entity: &Entity) -> bool {
        entity.is_of(&self.name[0]) && self.by_name.contains_key(entity.name())
    }
}

impl ClassIndex for ObjectClass {
    fn name(&self) -> &str {
        &self.name[0]
    }

    fn dimensions(&self) -> &[String] {
        &self.name
    }

    fn member_classes(&self) -> &[String] {
        &self.name
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn contains_key(&self, key: &[Entity]) -> bool {
        matches!(key, [e] if self.contains(e))
    }

    fn check_member(&self, position: usize, entity: &Entity) -> Result<()> {
        if position == 0 && self.contains(entity) {
            Ok(())
        } else {
            Err(Error::UnknownEntity {
                class: self.name[0].clone(),
                name: entity.name().to_owned(),
            })
        }
    }

    /// Always yields [`Selection::Entities`]; `compact` has no effect.
    fn query(&self, filters: &Filters, options: &QueryOptions) -> Result<Selection> {
        trace!(class = %self.name[0], filters = filters.len(), "object class query");
        let resolved = resolve_filters(self, filters)?
            .ok_or_else(|| unknown_dimension(self, filters))?;

        let objects: Vec<Entity> = match resolved.first() {
            Some(f) => self.objects.iter().filter(|e| f.accepts(e)).cloned().collect(),
            None => self.objects.clone(),
        };

        if objects.is_empty() {
            Ok(options.default.clone())
        } else {
            Ok(Selection::Entities(objects))
        }
    }
}
