//! Relationship keys: ordered entity tuples.

use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

use super::Entity;

/// An ordered tuple of entities, one per member class of a relationship
/// class, in the class's declared member order.
///
/// Object-class members are addressed by one-element keys, so parameter
/// values on objects and on relationships share a single key type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RelationshipKey(SmallVec<[Entity; 4]>);

impl RelationshipKey {
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self(entities.into_iter().collect())
    }

    /// One-element key addressing a single object.
    pub fn single(entity: Entity) -> Self {
        let mut inner = SmallVec::new();
        inner.push(entity);
        Self(inner)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Keep only the components at `positions`, in that order.
    pub fn project(&self, positions: &[usize]) -> Self {
        Self(positions.iter().filter_map(|&p| self.0.get(p).cloned()).collect())
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.0.into_vec()
    }
}

impl Deref for RelationshipKey {
    type Target = [Entity];

    fn deref(&self) -> &[Entity] {
        &self.0
    }
}

impl FromIterator<Entity> for RelationshipKey {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Entity> for RelationshipKey {
    fn from(entity: Entity) -> Self {
        Self::single(entity)
    }
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{e}")?;
        }
        write!(f, ")")
    }
}
