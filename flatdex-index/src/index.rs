//! The runtime index object and its lifecycle.

use crate::config::IndexConfig;
use crate::cursor::SeekOp;
use crate::definition::IndexDefinition;
use crate::key_column::{KeyColumn, ProbeKey};
use crate::types::RowPosition;

/// Buffers that only exist while sorting and compacting a fresh build.
#[derive(Debug, Default)]
pub(crate) struct BuildBuffers {
    /// Sort permutation; `None` marks a slot already placed by reorder.
    pub(crate) permutation: Vec<Option<u32>>,
    /// Start of each run of equal composite keys, plus a final `num_rows`.
    pub(crate) boundaries: Vec<u32>,
}

#[derive(Debug, Default)]
pub(crate) enum Phase {
    #[default]
    Empty,
    Building(BuildBuffers),
    Built,
}

#[derive(Debug)]
pub(crate) struct CursorState {
    pub(crate) op: SeekOp,
    /// Current logical position, `num_rows` when invalid.
    pub(crate) cur: usize,
    pub(crate) served: Option<usize>,
    /// Number of key parts covered by the probe.
    pub(crate) nval: usize,
    pub(crate) probe: Vec<ProbeKey>,
    /// An `Eq` fetch consumes the probe.
    pub(crate) probe_pending: bool,
}

/// A sorted, deduplicated, multi-part index over a row source.
///
/// Built by [`Index::build`] or loaded by [`Index::load`]; queried through
/// [`IndexCursor`](crate::IndexCursor) and the lookup methods.
#[derive(Debug)]
pub struct Index {
    pub(crate) name: String,
    pub(crate) declared_unique: bool,
    pub(crate) config: IndexConfig,
    pub(crate) columns: Vec<KeyColumn>,
    pub(crate) num_rows: usize,
    pub(crate) num_distinct: usize,
    /// Some composite key repeats; the last part then carries row offsets.
    pub(crate) multi: bool,
    pub(crate) positions: Option<Vec<RowPosition>>,
    /// Zero when positions are stored explicitly.
    pub(crate) position_stride: u32,
    pub(crate) block_count: usize,
    pub(crate) block_stride: usize,
    pub(crate) sorted: bool,
    pub(crate) max_same: usize,
    pub(crate) phase: Phase,
    pub(crate) cursor: CursorState,
}

impl Index {
    pub(crate) fn empty(definition: &IndexDefinition, config: IndexConfig) -> Self {
        let nk = definition.part_count();
        Self {
            name: definition.name.clone(),
            declared_unique: definition.unique,
            config,
            columns: Vec::with_capacity(nk),
            num_rows: 0,
            num_distinct: 0,
            multi: !definition.unique,
            positions: None,
            position_stride: 0,
            block_count: 0,
            block_stride: 0,
            sorted: false,
            max_same: 1,
            phase: Phase::Empty,
            cursor: CursorState {
                op: SeekOp::First,
                cur: 0,
                served: None,
                nval: nk,
                probe: Vec::new(),
                probe_pending: false,
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn num_distinct(&self) -> usize {
        self.num_distinct
    }

    /// Whether the built index holds no repeated composite key.
    #[inline]
    pub fn is_unique(&self) -> bool {
        !self.multi
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn columns(&self) -> &[KeyColumn] {
        &self.columns
    }

    pub fn column(&self, part: usize) -> Option<&KeyColumn> {
        self.columns.get(part)
    }

    /// Constant distance between consecutive row positions, if positions
    /// are computed rather than stored.
    #[inline]
    pub fn position_stride(&self) -> Option<u32> {
        (self.position_stride != 0).then_some(self.position_stride)
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    #[inline]
    pub fn block_stride(&self) -> usize {
        self.block_stride
    }

    /// True when the row store was already in index order at build time.
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    #[inline]
    pub fn max_same(&self) -> usize {
        self.max_same
    }

    pub fn part_max_same(&self, part: usize) -> usize {
        self.columns.get(part).map_or(1, KeyColumn::max_same)
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        matches!(self.phase, Phase::Built)
    }

    /// Row offsets of each distinct composite key, present when multi-valued.
    pub fn row_offsets(&self) -> Option<&[u32]> {
        if self.multi {
            self.columns.last().and_then(KeyColumn::offsets)
        } else {
            None
        }
    }

    /// Explicit row position array, absent when a stride is used.
    pub fn positions(&self) -> Option<&[RowPosition]> {
        self.positions.as_deref()
    }

    /// Row store position of logical position `cur`.
    pub fn position(&self, cur: usize) -> Option<RowPosition> {
        if cur >= self.num_rows {
            return None;
        }
        if self.position_stride != 0 {
            RowPosition::try_from(cur)
                .ok()
                .and_then(|c| c.checked_mul(self.position_stride))
        } else {
            self.positions.as_ref().and_then(|p| p.get(cur).copied())
        }
    }

    /// Current logical position of the cursor, if valid.
    pub fn current(&self) -> Option<usize> {
        (self.cursor.cur < self.num_rows).then_some(self.cursor.cur)
    }

    /// Release every buffer. Key columns go first, last part to first,
    /// since each part's offsets address the part after it.
    pub fn close(&mut self) {
        self.phase = Phase::Empty;
        for col in self.columns.iter_mut().rev() {
            col.release();
        }
        self.columns.clear();
        self.positions = None;
        self.num_rows = 0;
        self.num_distinct = 0;
        self.cursor.probe.clear();
        self.cursor.probe_pending = false;
        self.cursor.cur = 0;
        self.cursor.served = None;
        tracing::trace!(index = %self.name, "index closed");
    }
}
