//! Entity: a named member of an object class.

use std::fmt;
use std::sync::Arc;

/// An addressable object of an object class.
///
/// Identity is `(class, name)`: two entities from different classes may
/// share a display name without being equal. Both strings are shared, so
/// cloning an entity never allocates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    class: Arc<str>,
    name: Arc<str>,
}

impl Entity {
    pub fn new(class: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }

    /// Name of the object class this entity belongs to.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_of(&self, class: &str) -> bool {
        &*self.class == class
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_includes_class() {
        let a = Entity::new("node", "Sthlm");
        let b = Entity::new("region", "Sthlm");
        assert_ne!(a, b);
        assert_eq!(a, Entity::new("node", "Sthlm"));
        assert_eq!(a.to_string(), "Sthlm");
    }

    #[test]
    fn test_ordering_is_class_then_name() {
        let mut v = vec![
            Entity::new("node", "Leuven"),
            Entity::new("commodity", "wind"),
            Entity::new("node", "Dublin"),
        ];
        v.sort();
        let names: Vec<&str> = v.iter().map(Entity::name).collect();
        assert_eq!(names, vec!["wind", "Dublin", "Leuven"]);
    }
}
