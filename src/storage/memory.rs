//! In-memory data source.
//!
//! The reference implementation of `DataSource`: definitions are added
//! with builder calls (or parsed from JSON) and handed over verbatim.
//! Nothing is validated here; the snapshot builder does that.
//!
//! Use this source for:
//! - Tests of queries and parameter resolution
//! - Binders that already hold the whole dataset in memory

use serde::{Deserialize, Serialize};

use crate::model::Value;
use crate::Result;
use super::{
    DataSource, ObjectClassDef, ParameterDef, ParameterValueDef, RelationshipClassDef,
};

/// Dataset definitions held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySource {
    pub object_classes: Vec<ObjectClassDef>,
    pub relationship_classes: Vec<RelationshipClassDef>,
    pub parameters: Vec<ParameterDef>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_object_class<I, S>(mut self, name: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_classes.push(ObjectClassDef {
            name: name.into(),
            objects: objects.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// `relationships` name one object per member class, in member order.
    pub fn with_relationship_class<M, C, R, K, O>(
        mut self,
        name: impl Into<String>,
        object_classes: M,
        relationships: R,
    ) -> Self
    where
        M: IntoIterator<Item = C>,
        C: Into<String>,
        R: IntoIterator<Item = K>,
        K: IntoIterator<Item = O>,
        O: Into<String>,
    {
        self.relationship_classes.push(RelationshipClassDef {
            name: name.into(),
            object_classes: object_classes.into_iter().map(Into::into).collect(),
            relationships: relationships
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        });
        self
    }

    /// Declare a parameter on `classes`. Declaring it again adds classes.
    pub fn with_parameter<I, S>(mut self, name: impl Into<String>, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                for c in classes {
                    if !p.classes.contains(&c) {
                        p.classes.push(c);
                    }
                }
            }
            None => self.parameters.push(ParameterDef { name, classes, values: Vec::new() }),
        }
        self
    }

    /// Add a value, declaring the parameter on `class` if needed.
    pub fn with_parameter_value<I, S>(
        self,
        parameter: impl Into<String>,
        class: impl Into<String>,
        key: I,
        value: impl Into<Value>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parameter = parameter.into();
        let class = class.into();
        let mut source = self.with_parameter(parameter.clone(), [class.clone()]);
        if let Some(p) = source.parameters.iter_mut().find(|p| p.name == parameter) {
            p.values.push(ParameterValueDef {
                class,
                key: key.into_iter().map(Into::into).collect(),
                value: value.into(),
            });
        }
        source
    }
}

impl DataSource for MemorySource {
    fn object_classes(&self) -> Result<Vec<ObjectClassDef>> {
        Ok(self.object_classes.clone())
    }

    fn relationship_classes(&self) -> Result<Vec<RelationshipClassDef>> {
        Ok(self.relationship_classes.clone())
    }

    fn parameters(&self) -> Result<Vec<ParameterDef>> {
        Ok(self.parameters.clone())
    }

    fn describe(&self) -> String {
        format!(
            "memory source ({} object classes, {} relationship classes, {} parameters)",
            self.object_classes.len(),
            self.relationship_classes.len(),
            self.parameters.len()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
