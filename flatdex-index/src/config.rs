//! Run-time configuration (no hidden constants) and index file placement.

use crate::definition::IndexDefinition;
use crate::source::RecordFormat;
use flatdex_result::Result;
use flatdex_storage::file::MappedIndexFile;
use flatdex_storage::{FileBackend, IndexFile, IndexSlot, open_index_file};
use std::path::{Path, PathBuf};

/// Leading-part distinct count at which block sampling kicks in.
pub const DEFAULT_BLOCK_THRESHOLD: usize = 65_536;
pub const DEFAULT_MIN_BLOCK_STRIDE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Build the two-tier block array once the leading part has at least
    /// this many distinct values. `None` disables block sampling.
    pub block_threshold: Option<usize>,
    /// Starting block stride; doubled while `stride * stride * 4` stays
    /// below the distinct count.
    pub min_block_stride: usize,
    /// Allow replacing the row position array by a constant stride when the
    /// row store turns out to be physically sorted.
    pub allow_position_stride: bool,
    /// Load on-disk indexes through a read-only memory map instead of
    /// streamed reads. Ignored for in-memory stores.
    pub mapped: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            block_threshold: Some(DEFAULT_BLOCK_THRESHOLD),
            min_block_stride: DEFAULT_MIN_BLOCK_STRIDE,
            allow_position_stride: true,
            mapped: false,
        }
    }
}

impl IndexConfig {
    /// Block count and stride for a leading part with `ndf` distinct values,
    /// or `None` when no block array should be built.
    pub fn block_geometry(&self, ndf: usize) -> Option<(usize, usize)> {
        let threshold = self.block_threshold?;
        if ndf == 0 || ndf < threshold {
            return None;
        }
        let mut stride = self.min_block_stride.max(1);
        while stride.saturating_mul(stride).saturating_mul(4) < ndf {
            stride *= 2;
        }
        Some(((ndf - 1) / stride + 1, stride))
    }
}

/// Where the persisted form of one index lives.
#[derive(Debug, Clone)]
pub struct IndexStore {
    pub path: PathBuf,
    pub slot: IndexSlot,
    pub backend: FileBackend,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>, slot: IndexSlot, backend: FileBackend) -> Self {
        Self {
            path: path.into(),
            slot,
            backend,
        }
    }

    pub fn dedicated(path: impl Into<PathBuf>) -> Self {
        Self::new(path, IndexSlot::Dedicated, FileBackend::default())
    }

    pub fn shared(path: impl Into<PathBuf>, id: u32) -> Result<Self> {
        Ok(Self::new(path, IndexSlot::shared(id)?, FileBackend::default()))
    }

    pub fn with_backend(mut self, backend: FileBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Placement of `definition` for a table stored at `base`.
    ///
    /// Separate indexes get a dedicated file each; otherwise all indexes of
    /// the table share one file and the index id selects the slot.
    pub fn for_table(
        base: &Path,
        definition: &IndexDefinition,
        format: RecordFormat,
        separate: bool,
        backend: FileBackend,
    ) -> Result<Self> {
        let path = Self::file_name(base, &definition.name, format, separate);
        let slot = if separate {
            IndexSlot::Dedicated
        } else {
            IndexSlot::shared(definition.id)?
        };
        Ok(Self::new(path, slot, backend))
    }

    /// Conventional index file name for a table file at `base`.
    ///
    /// ```
    /// use flatdex_index::{IndexStore, RecordFormat};
    /// use std::path::{Path, PathBuf};
    ///
    /// let base = Path::new("data/orders.txt");
    /// assert_eq!(
    ///     IndexStore::file_name(base, "by_date", RecordFormat::Variable, true),
    ///     PathBuf::from("data/orders_by_date.dnx")
    /// );
    /// assert_eq!(
    ///     IndexStore::file_name(base, "by_date", RecordFormat::Fixed, false),
    ///     PathBuf::from("data/orders.fnx")
    /// );
    /// ```
    pub fn file_name(base: &Path, index_name: &str, format: RecordFormat, separate: bool) -> PathBuf {
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = if separate {
            format!("{stem}_{index_name}.{}", format.index_extension())
        } else {
            format!("{stem}.{}", format.index_extension())
        };
        base.with_file_name(file)
    }

    /// A fresh, unopened handle on the configured backend.
    pub fn open_file(&self) -> Box<dyn IndexFile> {
        open_index_file(&self.backend)
    }

    /// A handle for loading: a memory map when `mapped` and the index lives
    /// on disk, the configured backend otherwise.
    pub fn open_reader(&self, mapped: bool) -> Box<dyn IndexFile> {
        match &self.backend {
            FileBackend::Buffered | FileBackend::Huge if mapped => Box::new(MappedIndexFile::new()),
            _ => self.open_file(),
        }
    }
}
