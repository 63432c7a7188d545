//! Degenerate index over a dense row-number space.
//!
//! The key is a 1-based row number, so lookups are arithmetic and there is
//! nothing to build or persist.

use crate::cursor::{Fetch, IndexCursor, RangeBound, SeekOp};
use crate::source::RowSource;
use crate::types::{KeyValue, RowPosition};
use flatdex_result::{Error, Result};

#[derive(Debug)]
pub struct RowIndex {
    name: String,
    num_rows: usize,
    op: SeekOp,
    probe: Option<i64>,
    cur: usize,
    served: Option<usize>,
}

impl RowIndex {
    /// Record the row count of `source`. Stores that cannot report an exact
    /// cardinality cannot be addressed by row number.
    pub fn new(name: impl Into<String>, source: &mut dyn RowSource) -> Result<Self> {
        let name = name.into();
        let num_rows = source.exact_cardinality().ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "row index {name} needs a table with a known row count"
            ))
        })?;
        Ok(Self::with_rows(name, num_rows))
    }

    pub fn with_rows(name: impl Into<String>, num_rows: usize) -> Self {
        let name = name.into();
        tracing::debug!(index = %name, num_rows, "row index ready");
        Self {
            name,
            num_rows,
            op: SeekOp::Eq,
            probe: None,
            cur: num_rows,
            served: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn probe_value(&self, values: &[KeyValue]) -> Result<i64> {
        match values {
            [value] => value.as_i64().ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "row index {} takes an integer row number, got {value:?}",
                    self.name
                ))
            }),
            _ => Err(Error::InvalidArgumentError(format!(
                "row index {} takes exactly one key value, got {}",
                self.name,
                values.len()
            ))),
        }
    }

    /// Logical position for row number `v` under `op`; `None` when an
    /// equality probe cannot match.
    fn locate(&self, op: SeekOp, v: i64) -> Option<usize> {
        let n = i64::try_from(self.num_rows).unwrap_or(i64::MAX - 1);
        // Anything outside 0..=n+1 lands on the same position as its bound.
        let v = v.clamp(0, n + 1);
        if op == SeekOp::Eq && !(1..=n).contains(&v) {
            return None;
        }
        let pos = if op == SeekOp::Gt { v } else { v - 1 };
        Some(pos.clamp(0, n) as usize)
    }
}

impl IndexCursor for RowIndex {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn set_probe(&mut self, values: &[KeyValue]) -> Result<()> {
        self.probe = Some(self.probe_value(values)?);
        Ok(())
    }

    fn seek(&mut self, op: SeekOp) {
        self.op = op;
    }

    fn fetch(&mut self) -> Fetch {
        if self.num_rows == 0 {
            return Fetch::End;
        }
        let Some(v) = self.probe else {
            return Fetch::End;
        };
        self.cur = match self.locate(self.op, v) {
            Some(cur) if cur < self.num_rows => cur,
            _ => {
                self.cur = self.num_rows;
                return Fetch::NoMatch;
            }
        };
        if self.served == Some(self.cur) {
            return Fetch::AlreadyServed;
        }
        self.served = Some(self.cur);
        match RowPosition::try_from(self.cur) {
            Ok(pos) => Fetch::Row(pos),
            Err(_) => Fetch::End,
        }
    }

    fn group_size(&self) -> usize {
        usize::from(self.cur < self.num_rows)
    }

    fn range(&mut self, bound: RangeBound, probe: &[KeyValue]) -> Result<usize> {
        let v = self.probe_value(probe)?;
        let n = self.num_rows;
        let gt = self.locate(SeekOp::Gt, v).unwrap_or(n);
        let ge = self.locate(SeekOp::Ge, v).unwrap_or(n);
        Ok(match bound {
            RangeBound::Gt => n - gt,
            RangeBound::Ge => n - ge,
            RangeBound::Lt => ge,
            RangeBound::Le => gt,
        })
    }

    fn reset(&mut self) {
        self.cur = self.num_rows;
        self.served = None;
    }
}
