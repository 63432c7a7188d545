//! All indexes of one table, built or loaded together.

use crate::config::{IndexConfig, IndexStore};
use crate::definition::IndexDefinition;
use crate::index::Index;
use crate::source::{RecordFormat, RowSource};
use flatdex_result::Result;
use flatdex_storage::{FileBackend, OpenMode};
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// Where a table's index files go.
#[derive(Clone, Debug)]
pub struct TableLayout {
    /// Path of the table's data file; index file names derive from it.
    pub base: PathBuf,
    pub format: RecordFormat,
    /// One file per index instead of one shared file per table.
    pub separate: bool,
    pub backend: FileBackend,
}

impl TableLayout {
    pub fn new(base: impl Into<PathBuf>, format: RecordFormat) -> Self {
        Self {
            base: base.into(),
            format,
            separate: false,
            backend: FileBackend::default(),
        }
    }

    pub fn separate(mut self, separate: bool) -> Self {
        self.separate = separate;
        self
    }

    pub fn with_backend(mut self, backend: FileBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn store_for(&self, definition: &IndexDefinition) -> Result<IndexStore> {
        IndexStore::for_table(
            &self.base,
            definition,
            self.format,
            self.separate,
            self.backend.clone(),
        )
    }
}

#[derive(Debug, Default)]
pub struct TableIndexes {
    indexes: Vec<Index>,
    by_name: FxHashMap<String, usize>,
}

impl TableIndexes {
    /// Build and save every index of a table.
    ///
    /// In a shared file the first index truncates the file and the others
    /// are appended. Each definition's `max_same` statistics are refreshed.
    pub fn make_all(
        definitions: &mut [IndexDefinition],
        source: &mut dyn RowSource,
        layout: &TableLayout,
        config: &IndexConfig,
    ) -> Result<Self> {
        let mut table = Self::default();
        for (i, definition) in definitions.iter_mut().enumerate() {
            let store = layout.store_for(definition)?;
            let mode = if layout.separate || i == 0 {
                OpenMode::Write
            } else {
                OpenMode::Insert
            };
            let index = Index::make(definition, source, config.clone(), Some(&store), mode)?;
            definition.set_max_same(&index);
            table.push(index);
        }
        tracing::debug!(
            table = %layout.base.display(),
            indexes = table.len(),
            separate = layout.separate,
            "table indexes made"
        );
        Ok(table)
    }

    /// Load every index of a table from its files.
    pub fn load_all(
        definitions: &[IndexDefinition],
        source: &mut dyn RowSource,
        layout: &TableLayout,
        config: &IndexConfig,
    ) -> Result<Self> {
        let mut table = Self::default();
        for definition in definitions {
            let store = layout.store_for(definition)?;
            table.push(Index::load(definition, source, &store, config.clone())?);
        }
        Ok(table)
    }

    fn push(&mut self, index: Index) {
        self.by_name.insert(index.name().to_string(), self.indexes.len());
        self.indexes.push(index);
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.by_name.get(name).map(|&i| &self.indexes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Index> {
        self.by_name.get(name).map(|&i| &mut self.indexes[i])
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter()
    }

    /// Release every index.
    pub fn close(&mut self) {
        for index in &mut self.indexes {
            index.close();
        }
        self.indexes.clear();
        self.by_name.clear();
    }
}
