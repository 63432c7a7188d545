//! Declared shape of an index: its name, uniqueness and ordered key parts.

use crate::index::Index;
use flatdex_result::{Error, Result};

/// One key part of an index definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPartDefinition {
    /// Name of the indexed column in the row source.
    pub name: String,
    /// Key length in bytes. Zero keeps the column's full width; a text
    /// column longer than this becomes a prefix key.
    pub key_len: usize,
    pub ascending: bool,
    /// Largest number of rows sharing one value of the key prefix ending at
    /// this part, as observed by the last build.
    pub max_same: usize,
}

impl KeyPartDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_len: 0,
            ascending: true,
            max_same: 1,
        }
    }

    pub fn with_key_len(mut self, key_len: usize) -> Self {
        self.key_len = key_len;
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    /// Index number inside its table. Doubles as the slot number when the
    /// table's indexes share one file.
    pub id: u32,
    pub unique: bool,
    parts: Vec<KeyPartDefinition>,
}

impl IndexDefinition {
    pub fn new(
        name: impl Into<String>,
        id: u32,
        unique: bool,
        parts: Vec<KeyPartDefinition>,
    ) -> Result<Self> {
        let name = name.into();
        if parts.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "index {name} has no key parts"
            )));
        }
        Ok(Self {
            name,
            id,
            unique,
            parts,
        })
    }

    #[inline]
    pub fn parts(&self) -> &[KeyPartDefinition] {
        &self.parts
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Largest duplicate count over the whole key.
    pub fn max_same(&self) -> usize {
        self.parts.last().map_or(1, |p| p.max_same)
    }

    /// Refresh each part's `max_same` from a built index.
    pub fn set_max_same(&mut self, index: &Index) {
        for (k, part) in self.parts.iter_mut().enumerate() {
            part.max_same = index.part_max_same(k);
        }
        tracing::debug!(
            index = %self.name,
            max_same = self.max_same(),
            "refreshed key part statistics"
        );
    }
}
