//! Saving an index to, and loading it from, its index file.
//!
//! Section order, all integers 32-bit little-endian:
//!
//! 1. header `[tag, parts, pof_len, num_rows, stride, nblk, sblk, sorted]`
//! 2. `pof_len` row offsets when multi-valued
//! 3. `num_rows` row positions when `stride == 0`
//! 4. per part `[ndf, kof_len, nblk, klen, type]`, then block samples,
//!    values and offsets
//!
//! The tag is the index id plus [`MAX_SLOTS`]. A tag below that marks the
//! legacy layout whose header stops after `sblk`.

use crate::config::{IndexConfig, IndexStore};
use crate::definition::IndexDefinition;
use crate::index::Index;
use crate::key_column::KeyColumn;
use crate::source::{ColumnSpec, RecordFormat, RowSource};
use crate::types::KeyType;
use flatdex_result::{Error, Result};
use flatdex_storage::codec::{SectionReader, SectionWriter};
use flatdex_storage::constants::MAX_SLOTS;
use flatdex_storage::{IndexFile, OpenMode};

const LEGACY_HEADER_LEN: usize = 7;
const PART_HEADER_LEN: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) id: u32,
    pub(crate) part_count: u32,
    pub(crate) offset_len: u32,
    pub(crate) num_rows: u32,
    pub(crate) position_stride: u32,
    pub(crate) block_count: u32,
    pub(crate) block_stride: u32,
    pub(crate) sorted: bool,
}

impl Header {
    fn to_u32s(self) -> [u32; 8] {
        [
            self.id + MAX_SLOTS as u32,
            self.part_count,
            self.offset_len,
            self.num_rows,
            self.position_stride,
            self.block_count,
            self.block_stride,
            u32::from(self.sorted),
        ]
    }

    fn read(reader: &mut SectionReader<'_>) -> Result<Self> {
        let nv = reader.read_u32s(LEGACY_HEADER_LEN)?;
        let (id, sorted) = if nv[0] >= MAX_SLOTS as u32 {
            (nv[0] - MAX_SLOTS as u32, reader.read_u32()? != 0)
        } else {
            (nv[0], false)
        };
        Ok(Self {
            id,
            part_count: nv[1],
            offset_len: nv[2],
            num_rows: nv[3],
            position_stride: nv[4],
            block_count: nv[5],
            block_stride: nv[6],
            sorted,
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct PartHeader {
    ndf: usize,
    offset_len: usize,
    block_count: usize,
    key_len: usize,
    type_code: u32,
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::InvalidArgumentError(format!("{what} {value} does not fit the index file format"))
    })
}

fn mismatch(index: &str, detail: impl std::fmt::Display) -> Error {
    Error::FormatMismatch(format!("index {index}: {detail}"))
}

/// Offsets must start at zero, strictly increase and end at `end`. Every
/// group holds at least one entry.
fn check_offsets(index: &str, what: &str, offsets: &[u32], end: usize) -> Result<()> {
    let well_formed = offsets.first() == Some(&0)
        && offsets.windows(2).all(|w| w[0] < w[1])
        && offsets.last().map(|&o| o as usize) == Some(end);
    if well_formed {
        Ok(())
    } else {
        Err(mismatch(index, format!("{what} offsets do not span {end} entries")))
    }
}

impl Index {
    // ===== save =====

    /// Write the built index to `store`.
    ///
    /// `mode` is [`OpenMode::Write`] for the first index of a file and
    /// [`OpenMode::Insert`] to append to a shared file. An empty index only
    /// creates (or truncates) the file. Returns the number of payload bytes
    /// written.
    pub fn save(&self, store: &IndexStore, mode: OpenMode) -> Result<usize> {
        let mut file = store.open_file();
        self.save_with(&mut *file, store, mode)
    }

    /// [`Index::save`] through a caller-supplied file handle, e.g. an
    /// instrumented one.
    pub fn save_with(&self, file: &mut dyn IndexFile, store: &IndexStore, mode: OpenMode) -> Result<usize> {
        if !self.is_built() {
            return Err(Error::InvalidArgumentError(format!(
                "index {} is not built",
                self.name
            )));
        }
        if mode == OpenMode::Read {
            return Err(Error::InvalidArgumentError(
                "an index cannot be saved in read mode".into(),
            ));
        }

        file.open(&store.path, store.slot, mode)?;
        let written = if self.num_distinct == 0 {
            tracing::debug!(index = %self.name, path = %store.path.display(), "saved void index");
            Ok(0)
        } else {
            self.write_sections(file, store)
        };
        match written {
            Ok(written) => {
                file.close(&store.path, store.slot)?;
                Ok(written)
            }
            Err(e) => {
                // Closing would commit a partial payload to a shared slot.
                if let Err(discard) = file.discard(&store.path, store.slot) {
                    tracing::warn!(
                        index = %self.name,
                        path = %store.path.display(),
                        error = %discard,
                        "could not invalidate a partially written index"
                    );
                }
                Err(e)
            }
        }
    }

    fn write_sections(&self, file: &mut dyn IndexFile, store: &IndexStore) -> Result<usize> {
        let id = match store.slot.shared_id() {
            Some(id) => id as u32,
            None => 0,
        };
        let pof = self.row_offsets();
        let header = Header {
            id,
            part_count: to_u32(self.columns.len(), "part count")?,
            offset_len: match pof {
                Some(p) => to_u32(p.len(), "offset count")?,
                None => 0,
            },
            num_rows: to_u32(self.num_rows, "row count")?,
            position_stride: self.position_stride,
            block_count: to_u32(self.block_count, "block count")?,
            block_stride: to_u32(self.block_stride, "block stride")?,
            sorted: self.sorted,
        };
        tracing::debug!(index = %self.name, ?header, path = %store.path.display(), "saving index");

        let mut w = SectionWriter::new(file);
        w.write_u32s(&header.to_u32s())?;
        if let Some(pof) = pof {
            w.write_u32s(pof)?;
        }
        if self.position_stride == 0 {
            let positions = self.positions.as_deref().ok_or_else(|| {
                Error::Internal(format!("index {} lost its row positions", self.name))
            })?;
            w.write_u32s(positions)?;
        }

        for (k, col) in self.columns.iter().enumerate() {
            let ndf = col.len();
            let blocks = if k == 0 { col.blocks_le_bytes() } else { None };
            let part = [
                to_u32(ndf, "distinct count")?,
                match col.offsets() {
                    Some(o) => to_u32(o.len(), "offset count")?,
                    None => 0,
                },
                if blocks.is_some() { header.block_count } else { 0 },
                to_u32(col.key_len(), "key length")?,
                u32::from(col.key_type()),
            ];
            w.write_u32s(&part)?;
            if let Some(blocks) = blocks {
                w.write_bytes(&blocks)?;
            }
            w.write_bytes(&col.values_le_bytes())?;
            if let Some(offsets) = col.offsets() {
                w.write_u32s(offsets)?;
            }
        }

        tracing::debug!(index = %self.name, size = w.written(), "index saved");
        Ok(w.written())
    }

    // ===== load =====

    /// Load a persisted index for `definition`, checking it against the
    /// live row source.
    ///
    /// Any disagreement with the definition or a stale row count fails with
    /// [`Error::FormatMismatch`]; the index must then be rebuilt. With
    /// [`IndexConfig::mapped`] the file is read through a memory map.
    pub fn load(
        definition: &IndexDefinition,
        source: &mut dyn RowSource,
        store: &IndexStore,
        config: IndexConfig,
    ) -> Result<Index> {
        let mut file = store.open_reader(config.mapped);
        Index::load_with(definition, source, &mut *file, store, config)
    }

    /// [`Index::load`] through a caller-supplied file handle.
    pub fn load_with(
        definition: &IndexDefinition,
        source: &mut dyn RowSource,
        file: &mut dyn IndexFile,
        store: &IndexStore,
        config: IndexConfig,
    ) -> Result<Index> {
        let (n, estimated) = match source.exact_cardinality() {
            Some(n) => (n, source.record_format() == RecordFormat::Dbf),
            None => match source.max_size_estimate() {
                Some(n) => (n, true),
                None => {
                    return Err(Error::RowSource(format!(
                        "cannot size the table indexed by {}",
                        definition.name
                    )));
                }
            },
        };

        let specs = definition
            .parts()
            .iter()
            .map(|part| source.column_spec(&part.name))
            .collect::<Result<Vec<ColumnSpec>>>()?;

        let mut index = Index::empty(definition, config);
        if n == 0 {
            for (part, spec) in definition.parts().iter().zip(&specs) {
                index
                    .columns
                    .push(KeyColumn::init(spec, 0, part.ascending, part.key_len)?);
            }
            index.finish_empty();
            return Ok(index);
        }

        file.open(&store.path, store.slot, OpenMode::Read)?;
        let loaded = index.read_sections(file, definition, &specs, n, estimated);
        let closed = file.close(&store.path, store.slot);

        match loaded.and(closed) {
            Ok(()) => {
                index.finish_built();
                Ok(index)
            }
            Err(e) => {
                tracing::debug!(
                    index = %definition.name,
                    path = %store.path.display(),
                    error = %e,
                    "index load failed"
                );
                index.close();
                Err(e)
            }
        }
    }

    fn read_sections(
        &mut self,
        file: &mut dyn IndexFile,
        definition: &IndexDefinition,
        specs: &[ColumnSpec],
        n: usize,
        estimated: bool,
    ) -> Result<()> {
        let mut r = SectionReader::new(file);
        let header = Header::read(&mut r)?;
        tracing::debug!(index = %self.name, ?header, "index header read");

        let nk = definition.part_count();
        if header.part_count as usize != nk {
            return Err(mismatch(
                &self.name,
                format!("{} key parts on file, {nk} declared", header.part_count),
            ));
        }

        let num_rows = header.num_rows as usize;
        let n = if num_rows < n && estimated { num_rows } else { n };
        if num_rows != n {
            return Err(mismatch(
                &self.name,
                format!("{num_rows} rows on file, table has {n}"),
            ));
        }

        let pof = if header.offset_len > 0 {
            let pof = r.read_u32s(header.offset_len as usize)?;
            check_offsets(&self.name, "row", &pof, num_rows)?;
            Some(pof)
        } else {
            None
        };
        self.multi = pof.is_some();
        self.num_rows = num_rows;
        self.num_distinct = match &pof {
            Some(p) => p.len() - 1,
            None => num_rows,
        };
        self.position_stride = header.position_stride;
        self.block_count = header.block_count as usize;
        self.block_stride = header.block_stride as usize;
        if self.block_count > 0 && self.block_stride == 0 {
            return Err(mismatch(&self.name, "block array without a stride"));
        }

        if header.position_stride == 0 {
            self.positions = Some(r.read_u32s(num_rows)?);
            self.sorted = header.sorted;
        } else {
            self.positions = None;
            self.sorted = true;
        }

        for (k, (part, spec)) in definition.parts().iter().zip(specs).enumerate() {
            let nv = r.read_u32s(PART_HEADER_LEN)?;
            let ph = PartHeader {
                ndf: nv[0] as usize,
                offset_len: nv[1] as usize,
                block_count: nv[2] as usize,
                key_len: nv[3] as usize,
                type_code: nv[4],
            };

            let key_type = KeyType::try_from(ph.type_code).map_err(|e| {
                mismatch(&self.name, format!("part {k}: unknown key type code {}", e.number))
            })?;
            if key_type != spec.key_type {
                return Err(mismatch(
                    &self.name,
                    format!("part {} is {key_type:?} on file, {:?} in the table", spec.name, spec.key_type),
                ));
            }
            let prefix = key_type == KeyType::Utf8 && part.key_len > 0 && spec.width > part.key_len;
            if spec.nullable && !prefix {
                return Err(Error::AllocationFailed {
                    what: format!("key storage for nullable column {}", spec.name),
                    count: ph.ndf,
                });
            }
            let expected_len = match key_type.fixed_width() {
                Some(w) => w,
                None if prefix => part.key_len,
                None => spec.width.max(1),
            };
            if ph.key_len != expected_len {
                return Err(mismatch(
                    &self.name,
                    format!("part {} key length {} on file, {expected_len} expected", spec.name, ph.key_len),
                ));
            }
            if ph.block_count > 0 && (k > 0 || ph.block_count != self.block_count) {
                return Err(mismatch(&self.name, format!("unexpected block array on part {}", spec.name)));
            }

            let blocks = if ph.block_count > 0 {
                Some(r.read_bytes(ph.block_count * ph.key_len)?)
            } else {
                None
            };
            let values = r.read_bytes(ph.ndf * ph.key_len)?;
            let offsets = if ph.offset_len > 0 {
                if ph.offset_len != ph.ndf + 1 {
                    return Err(mismatch(&self.name, format!("part {} offset count", spec.name)));
                }
                Some(r.read_u32s(ph.offset_len)?)
            } else {
                None
            };

            let col = KeyColumn::from_sections(
                spec,
                part.ascending,
                prefix,
                ph.key_len,
                ph.ndf,
                &values,
                blocks.as_deref().map(|b| (ph.block_count, b)),
                offsets,
            )?;
            tracing::trace!(part = k, ndf = ph.ndf, key_len = ph.key_len, "key part loaded");
            self.columns.push(col);
        }

        if self.block_count > 0 && self.columns.first().is_some_and(|c| c.block_count() == 0) {
            return Err(mismatch(
                &self.name,
                "header announces a block array the first part lacks",
            ));
        }
        self.check_part_chain(pof.as_deref())?;

        for k in 0..nk {
            self.columns[k].max_same = self.col_max_same(k);
        }
        self.max_same = self.columns.last().map_or(1, KeyColumn::max_same);
        Ok(())
    }

    /// Each part's offsets must span the next part, the last one the rows.
    fn check_part_chain(&self, pof: Option<&[u32]>) -> Result<()> {
        let nk = self.columns.len();
        for (k, col) in self.columns.iter().enumerate() {
            let end = match self.columns.get(k + 1) {
                Some(next) => next.len(),
                None => self.num_rows,
            };
            match col.offsets() {
                Some(o) => check_offsets(&self.name, col.name(), o, end)?,
                None if col.len() != end => {
                    return Err(mismatch(
                        &self.name,
                        format!("part {} holds {} values for {end} entries", col.name(), col.len()),
                    ));
                }
                None => {}
            }
            if k + 1 == nk && col.offsets() != pof {
                return Err(mismatch(&self.name, "last part offsets differ from the row offsets"));
            }
        }
        Ok(())
    }

    // ===== make =====

    /// Build the index and, when a store is given, save it.
    ///
    /// On failure any artifact at the store is made unloadable.
    pub fn make(
        definition: &IndexDefinition,
        source: &mut dyn RowSource,
        config: IndexConfig,
        store: Option<&IndexStore>,
        mode: OpenMode,
    ) -> Result<Index> {
        let made = Index::build(definition, source, config).and_then(|index| {
            if let Some(store) = store {
                index.save(store, mode)?;
            }
            Ok(index)
        });

        if let (Err(e), Some(store)) = (&made, store) {
            tracing::debug!(index = %definition.name, error = %e, "make failed, discarding artifact");
            if let Err(discard) = store.open_file().discard(&store.path, store.slot) {
                tracing::warn!(
                    index = %definition.name,
                    path = %store.path.display(),
                    error = %discard,
                    "could not invalidate index file after a failed build"
                );
            }
        }
        made
    }
}

/// Read only the header of a persisted index and return its row count.
pub fn read_sizes(store: &IndexStore, definition: &IndexDefinition) -> Result<usize> {
    let mut file = store.open_file();
    file.open(&store.path, store.slot, OpenMode::Read)?;
    let header = Header::read(&mut SectionReader::new(&mut *file));
    let closed = file.close(&store.path, store.slot);
    let header = header?;
    closed?;

    if header.part_count as usize != definition.part_count() {
        return Err(mismatch(
            &definition.name,
            format!("{} key parts on file, {} declared", header.part_count, definition.part_count()),
        ));
    }
    tracing::debug!(index = %definition.name, num_rows = header.num_rows, "index size read");
    Ok(header.num_rows as usize)
}
