//! Lists stored as TOML tables keyed by index
//!
//! Configuration files write repeated entries as `[...axes.0]`,
//! `[...axes.1]` and so on. Reading also accepts a plain array.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Ordered entries written as an index-keyed table
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedList<T>(pub Vec<T>);

impl<T> Default for IndexedList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> IndexedList<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<Vec<T>> for IndexedList<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for IndexedList<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> DerefMut for IndexedList<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T: Serialize> Serialize for IndexedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, item) in self.0.iter().enumerate() {
            map.serialize_entry(&index.to_string(), item)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for IndexedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IndexedVisitor(PhantomData))
    }
}

struct IndexedVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for IndexedVisitor<T> {
    type Value = IndexedList<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array or a table keyed by integer index")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(IndexedList(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut keyed = BTreeMap::new();
        while let Some((key, item)) = map.next_entry::<String, T>()? {
            let index: usize = key
                .parse()
                .map_err(|_| de::Error::custom(format!("expected an integer index, got '{key}'")))?;
            keyed.insert(index, item);
        }
        Ok(IndexedList(keyed.into_values().collect()))
    }
}
