//! Cursor protocol shared by every index kind.

use crate::types::{KeyValue, RowPosition};
use flatdex_result::Result;

/// Operator driving the next [`IndexCursor::fetch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeekOp {
    First,
    Next,
    /// Next row whose probed key prefix equals the previous one.
    Same,
    FirstDistinct,
    NextDistinct,
    Last,
    Prev,
    Eq,
    Gt,
    Ge,
}

/// Result of one fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetch {
    /// Row store position of the row to read.
    Row(RowPosition),
    /// No more rows in index order.
    End,
    /// The probe matched nothing, or the run of equal keys is exhausted.
    NoMatch,
    /// The row is the one served by the previous fetch.
    AlreadyServed,
}

/// Bound kind for [`IndexCursor::range`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeBound {
    Gt,
    Ge,
    Lt,
    Le,
}

pub trait IndexCursor {
    /// Number of logical positions (indexed rows).
    fn num_rows(&self) -> usize;

    /// Install a probe on the leading `values.len()` key parts.
    fn set_probe(&mut self, values: &[KeyValue]) -> Result<()>;

    fn seek(&mut self, op: SeekOp);

    fn fetch(&mut self) -> Fetch;

    /// Rows sharing the current value of the probed key prefix.
    fn group_size(&self) -> usize;

    /// Number of rows satisfying `key <bound> probe`.
    fn range(&mut self, bound: RangeBound, probe: &[KeyValue]) -> Result<usize>;

    /// Forget the cursor position and the last served row.
    fn reset(&mut self);
}
