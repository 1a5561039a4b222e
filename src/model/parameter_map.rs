//! ParameterMap: nested, ordered key → value maps.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::time_slice::Timestamp;
use super::Value;
use crate::{Error, Result};

/// Key of one level of a [`ParameterMap`].
///
/// Serialized with its variant tag, like [`Value`], so a string that reads
/// like a timestamp stays a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MapKey {
    Int(i64),
    DateTime(Timestamp),
    String(String),
}

impl From<i64> for MapKey { fn from(v: i64) -> Self { MapKey::Int(v) } }
impl From<i32> for MapKey { fn from(v: i32) -> Self { MapKey::Int(v as i64) } }
impl From<Timestamp> for MapKey { fn from(v: Timestamp) -> Self { MapKey::DateTime(v) } }
impl From<String> for MapKey { fn from(v: String) -> Self { MapKey::String(v) } }
impl From<&str> for MapKey { fn from(v: &str) -> Self { MapKey::String(v.to_owned()) } }

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(i) => write!(f, "{i}"),
            MapKey::DateTime(t) => write!(f, "{t}"),
            MapKey::String(s) => write!(f, "{s}"),
        }
    }
}

/// An ordered map from [`MapKey`] to [`Value`]; values may be maps again.
///
/// Entries keep their ingest order and keys are unique.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<(MapKey, Value)>", into = "Vec<(MapKey, Value)>")]
pub struct ParameterMap {
    entries: Vec<(MapKey, Value)>,
}

impl ParameterMap {
    /// Fails with [`Error::MalformedIngest`] on a repeated key.
    pub fn new(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Result<Self> {
        let mut map = Self::default();
        for (k, v) in entries {
            if map.get(&k).is_some() {
                return Err(Error::MalformedIngest(format!("map key {k} given twice")));
            }
            map.entries.push((k, v));
        }
        Ok(map)
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<(MapKey, Value)>> for ParameterMap {
    type Error = Error;

    fn try_from(entries: Vec<(MapKey, Value)>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<ParameterMap> for Vec<(MapKey, Value)> {
    fn from(map: ParameterMap) -> Self {
        map.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_ingest_order() {
        let m = ParameterMap::new(vec![
            (MapKey::from("b"), Value::from(1)),
            (MapKey::from("a"), Value::from(2)),
        ]).unwrap();
        let keys: Vec<String> = m.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(m.get(&"a".into()), Some(&Value::Int(2)));
        assert_eq!(m.get(&"c".into()), None);
    }

    #[test]
    fn test_repeated_key_rejected() {
        let err = ParameterMap::new(vec![
            (MapKey::from(1), Value::Null),
            (MapKey::from(1), Value::Null),
        ]).unwrap_err();
        assert!(matches!(err, Error::MalformedIngest(_)));
    }

    #[test]
    fn test_timestamp_like_string_key_stays_string() {
        let m = ParameterMap::new(vec![
            (MapKey::from("2030-01-01T00:00:00"), Value::from(1)),
            (MapKey::from(2030), Value::from(2)),
        ]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: ParameterMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(matches!(back.keys().next(), Some(MapKey::String(_))));

        let key: MapKey = serde_json::from_str(r#"{"type": "DateTime", "value": "2030-01-01T00:00:00"}"#).unwrap();
        assert!(matches!(key, MapKey::DateTime(_)));
    }
}
