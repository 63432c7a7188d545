//! Lookup engine: composite binary search, cursor movement and the fetch
//! state machine.
//!
//! Part `k` holds the distinct values of the key prefix `0..=k`; its offset
//! array maps value `i` to the half-open child range
//! `offsets[i]..offsets[i + 1]` in part `k + 1`, or in logical row positions
//! for the last part. A missing offset array is the identity mapping.

use crate::cursor::{Fetch, IndexCursor, RangeBound, SeekOp};
use crate::index::Index;
use crate::key_column::{KeyColumn, ProbeKey};
use crate::types::KeyValue;
use flatdex_result::{Error, Result};
use std::cmp::Ordering;

/// Binary search of `probe` inside `lo..hi` of one column.
#[inline]
fn search(col: &KeyColumn, lo: usize, hi: usize, probe: &ProbeKey) -> std::result::Result<usize, usize> {
    let (mut lo, mut hi) = (lo, hi);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match col.compare_to_probe(mid, probe) {
            Ordering::Less => hi = mid,
            Ordering::Greater => lo = mid + 1,
            Ordering::Equal => return Ok(mid),
        }
    }
    Err(lo)
}

impl Index {
    /// Logical position of the first row under value `i` of part `part`.
    /// `i == len` maps to the position just past that part's last group.
    pub(crate) fn descend(&self, part: usize, i: usize) -> usize {
        self.columns[part..]
            .iter()
            .fold(i, |x, col| col.child_start(x))
    }

    /// Point every part's cursor at the value containing logical position `cur`.
    pub(crate) fn sync_cursor(&mut self, cur: usize) {
        self.cursor.cur = cur;
        if cur >= self.num_rows {
            self.invalidate_parts();
            return;
        }
        let mut x = cur;
        for col in self.columns.iter_mut().rev() {
            x = match col.offsets() {
                Some(o) => o.partition_point(|&s| s as usize <= x) - 1,
                None => x,
            };
            col.cursor = x;
        }
    }

    fn invalidate_parts(&mut self) {
        self.cursor.cur = self.num_rows;
        for col in &mut self.columns {
            col.cursor = col.len();
        }
    }

    /// Convert caller values into per-part probes.
    pub(crate) fn prepare_probe(&self, values: &[KeyValue]) -> Result<Vec<ProbeKey>> {
        if values.is_empty() || values.len() > self.columns.len() {
            return Err(Error::InvalidArgumentError(format!(
                "index {} takes 1 to {} key values, got {}",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }
        self.columns
            .iter()
            .zip(values)
            .map(|(col, v)| col.prepare_probe(v))
            .collect()
    }

    // ===== search =====

    /// Locate `probe` under `op`.
    ///
    /// `Eq` yields the first matching logical position or `None`. `Gt`/`Ge`
    /// always yield the first position strictly/not strictly after the
    /// probe, `num_rows` when there is none.
    pub(crate) fn locate(&self, op: SeekOp, probe: &[ProbeKey]) -> Option<usize> {
        if self.columns.len() == 1 {
            return self.locate_single(op, &probe[0]);
        }
        let nval = probe.len();
        let first = &self.columns[0];
        let (mut lo, mut hi) = (0, first.len());

        if op == SeekOp::Eq && self.block_count > 0 {
            (lo, hi) = self.block_range(first, &probe[0])?;
        }

        for (k, key) in probe.iter().enumerate() {
            let col = &self.columns[k];
            match search(col, lo, hi, key) {
                Ok(i) if k + 1 == nval => {
                    return Some(match op {
                        SeekOp::Gt => self.descend(k, i + 1),
                        _ => self.descend(k, i),
                    });
                }
                Ok(i) => {
                    lo = col.child_start(i);
                    hi = col.child_start(i + 1);
                }
                Err(insert_at) => {
                    tracing::trace!(part = k, insert_at, ?op, "probe not matched");
                    return match op {
                        SeekOp::Eq => None,
                        _ => Some(self.descend(k, insert_at)),
                    };
                }
            }
        }
        None
    }

    /// Coarse search over the block samples of the leading part.
    fn block_range(&self, first: &KeyColumn, key: &ProbeKey) -> Option<(usize, usize)> {
        let (mut inf, mut sup) = (-1isize, self.block_count as isize);
        while sup - inf > 1 {
            let mid = (inf + sup) / 2;
            match first.compare_block_to_probe(mid as usize, key) {
                Ordering::Less => sup = mid,
                Ordering::Equal => {
                    inf = mid;
                    break;
                }
                Ordering::Greater => inf = mid,
            }
        }
        if inf < 0 {
            return None;
        }
        let lo = inf as usize * self.block_stride;
        let hi = (lo + self.block_stride).min(first.len());
        tracing::trace!(block = inf, lo, hi, "two-tier search narrowed");
        Some((lo, hi))
    }

    // ===== cursor movement =====

    /// Step to the next logical position.
    ///
    /// Returns true when there is no next row or, with `require_equal`,
    /// when the probed key prefix changed.
    pub(crate) fn next_val(&mut self, require_equal: bool) -> bool {
        if self.columns.len() == 1 {
            return self.next_val_single(require_equal);
        }
        if self.cursor.cur >= self.num_rows {
            return true;
        }
        let nk = self.columns.len();
        self.cursor.cur += 1;
        let mut curk = self.cursor.cur;
        // 1-based number of the first part whose value changed
        let mut neq = nk + 1;

        for k in (0..nk).rev() {
            let n = k + 1;
            let col = &mut self.columns[k];
            if curk == col.child_start(col.cursor + 1) {
                neq = n;
            }
            if neq > n {
                break;
            }
            col.cursor += 1;
            curk = col.cursor;
        }

        self.cursor.cur == self.num_rows || (require_equal && neq <= self.cursor.nval)
    }

    /// Step to the previous logical position. Returns true at the start.
    pub(crate) fn prev_val(&mut self) -> bool {
        if self.columns.len() == 1 {
            return self.prev_val_single();
        }
        if self.cursor.cur == 0 {
            return true;
        }
        let nk = self.columns.len();
        self.cursor.cur = self.cursor.cur.min(self.num_rows) - 1;
        let mut curk = self.cursor.cur;
        let mut neq = nk + 1;

        for k in (0..nk).rev() {
            let n = k + 1;
            let col = &mut self.columns[k];
            if curk < col.child_start(col.cursor) {
                neq = n;
            }
            if neq > n {
                break;
            }
            col.cursor -= 1;
            curk = col.cursor;
        }
        false
    }

    /// Jump to the first row of the next distinct probed prefix.
    pub(crate) fn next_val_dif(&mut self) -> bool {
        let kc = self.probed_part();
        let next = self.columns[kc].cursor + 1;
        if next >= self.columns[kc].len() {
            self.invalidate_parts();
            return true;
        }
        let cur = self.descend(kc, next);
        self.sync_cursor(cur);
        false
    }

    /// Last key part covered by the probe.
    #[inline]
    fn probed_part(&self) -> usize {
        self.cursor.nval.clamp(1, self.columns.len()) - 1
    }

    // ===== single key part =====

    fn locate_single(&self, op: SeekOp, key: &ProbeKey) -> Option<usize> {
        let col = &self.columns[0];
        let (lo, hi) = if op == SeekOp::Eq && self.block_count > 0 {
            self.block_range(col, key)?
        } else {
            (0, col.len())
        };
        let i = match (search(col, lo, hi, key), op) {
            (Ok(i), SeekOp::Gt) => i + 1,
            (Ok(i), _) => i,
            (Err(_), SeekOp::Eq) => return None,
            (Err(i), _) => i,
        };
        Some(match self.row_offsets() {
            Some(pof) => pof[i] as usize,
            None => i,
        })
    }

    fn next_val_single(&mut self, require_equal: bool) -> bool {
        let ndif = self.num_distinct;
        let num_rows = self.num_rows;
        let multi = self.multi;
        let col = &mut self.columns[0];
        if col.cursor >= ndif {
            return true;
        }
        if multi {
            let limit = col.child_start(col.cursor + 1);
            self.cursor.cur += 1;
            if self.cursor.cur == limit {
                col.cursor += 1;
                require_equal || limit == num_rows
            } else {
                false
            }
        } else {
            self.cursor.cur += 1;
            col.cursor = self.cursor.cur;
            self.cursor.cur == num_rows || require_equal
        }
    }

    fn prev_val_single(&mut self) -> bool {
        if self.cursor.cur == 0 {
            return true;
        }
        self.cursor.cur = self.cursor.cur.min(self.num_rows) - 1;
        let cur = self.cursor.cur;
        let multi = self.multi;
        let col = &mut self.columns[0];
        if multi {
            if cur < col.child_start(col.cursor) {
                col.cursor -= 1;
            }
        } else {
            col.cursor = cur;
        }
        false
    }

    fn fetch_single(&mut self) -> Option<Fetch> {
        match self.cursor.op {
            SeekOp::Next => {
                if self.next_val_single(false) {
                    return Some(Fetch::End);
                }
            }
            SeekOp::First => {
                self.columns[0].cursor = 0;
                self.cursor.cur = 0;
                self.cursor.op = SeekOp::Next;
            }
            SeekOp::Same => {
                if !self.multi || self.next_val_single(true) {
                    self.cursor.op = SeekOp::Eq;
                    return Some(Fetch::NoMatch);
                }
            }
            SeekOp::NextDistinct => {
                let next = self.columns[0].cursor + 1;
                if next >= self.num_distinct {
                    self.invalidate_parts();
                    return Some(Fetch::End);
                }
                self.columns[0].cursor = next;
                self.cursor.cur = self.columns[0].child_start(next);
            }
            SeekOp::FirstDistinct => {
                self.columns[0].cursor = 0;
                self.cursor.cur = 0;
                self.cursor.op = if self.multi {
                    SeekOp::NextDistinct
                } else {
                    SeekOp::Next
                };
            }
            SeekOp::Last => {
                self.cursor.cur = self.num_rows - 1;
                self.columns[0].cursor = self.num_distinct - 1;
                self.cursor.op = SeekOp::Prev;
            }
            SeekOp::Prev => {
                if self.prev_val_single() {
                    return Some(Fetch::End);
                }
            }
            SeekOp::Eq | SeekOp::Gt | SeekOp::Ge => return None,
        }
        None
    }

    // ===== fetch =====

    /// Advance the cursor according to the current operator and return the
    /// row to read.
    pub fn fetch(&mut self) -> Fetch {
        if self.num_rows == 0 {
            return Fetch::End;
        }
        tracing::trace!(index = %self.name, op = ?self.cursor.op, "fetch");

        let early = if self.columns.len() == 1 {
            self.fetch_single()
        } else {
            self.fetch_composite()
        };
        if let Some(done) = early {
            return done;
        }

        if matches!(self.cursor.op, SeekOp::Eq | SeekOp::Gt | SeekOp::Ge) {
            if let Some(done) = self.fetch_probe() {
                return done;
            }
        }

        let cur = self.cursor.cur;
        if self.cursor.served == Some(cur) {
            return Fetch::AlreadyServed;
        }
        self.cursor.served = Some(cur);
        match self.position(cur) {
            Some(pos) => Fetch::Row(pos),
            None => Fetch::End,
        }
    }

    fn fetch_composite(&mut self) -> Option<Fetch> {
        let nk = self.columns.len();
        match self.cursor.op {
            SeekOp::Next => {
                if self.next_val(false) {
                    return Some(Fetch::End);
                }
            }
            SeekOp::First => {
                self.sync_cursor(0);
                self.cursor.op = SeekOp::Next;
            }
            SeekOp::Same => {
                if self.next_val(true) {
                    self.cursor.op = SeekOp::Eq;
                    return Some(Fetch::NoMatch);
                }
            }
            SeekOp::NextDistinct => {
                if self.next_val_dif() {
                    return Some(Fetch::End);
                }
            }
            SeekOp::FirstDistinct => {
                self.sync_cursor(0);
                self.cursor.op = if self.multi || self.cursor.nval < nk {
                    SeekOp::NextDistinct
                } else {
                    SeekOp::Next
                };
            }
            SeekOp::Last => {
                self.sync_cursor(self.num_rows - 1);
                self.cursor.op = SeekOp::Prev;
            }
            SeekOp::Prev => {
                if self.prev_val() {
                    return Some(Fetch::End);
                }
            }
            SeekOp::Eq | SeekOp::Gt | SeekOp::Ge => return None,
        }
        None
    }

    /// Probe-driven operators. Each installed probe is used once.
    fn fetch_probe(&mut self) -> Option<Fetch> {
        if !self.cursor.probe_pending {
            return Some(Fetch::End);
        }
        self.cursor.probe_pending = false;
        let op = self.cursor.op;

        match self.locate(op, &self.cursor.probe) {
            Some(cur) if cur < self.num_rows => self.sync_cursor(cur),
            _ => {
                self.invalidate_parts();
                return Some(Fetch::NoMatch);
            }
        }

        if op != SeekOp::Eq {
            self.cursor.op = SeekOp::Next;
        } else if self.multi || self.cursor.nval < self.columns.len() {
            self.cursor.op = SeekOp::Same;
        }
        None
    }

    // ===== public queries =====

    /// Position the cursor on `probe` under `op` without fetching.
    ///
    /// Returns the logical position found, if any.
    pub fn find(&mut self, op: SeekOp, probe: &[KeyValue]) -> Result<Option<usize>> {
        let keys = self.prepare_probe(probe)?;
        self.cursor.nval = keys.len();
        let found = self
            .locate(op, &keys)
            .filter(|&cur| cur < self.num_rows);
        self.cursor.probe = keys;
        self.cursor.probe_pending = false;
        match found {
            Some(cur) => self.sync_cursor(cur),
            None => self.invalidate_parts(),
        }
        Ok(found)
    }

    /// Move to the next logical position; see [`Index::fetch`] for the
    /// operator-driven form. Returns false when nothing was left.
    pub fn advance(&mut self, require_equal: bool) -> bool {
        !self.next_val(require_equal)
    }

    pub fn retreat(&mut self) -> bool {
        !self.prev_val()
    }

    /// Value of key part `part` under the cursor.
    pub fn current_value(&self, part: usize) -> Option<KeyValue> {
        let col = self.columns.get(part)?;
        col.fill(col.cursor)
    }

    /// Number of rows with exactly the probed key prefix.
    pub fn count_equal(&self, probe: &[KeyValue]) -> Result<usize> {
        let keys = self.prepare_probe(probe)?;
        if self.num_rows == 0 {
            return Ok(0);
        }
        let ge = self.locate(SeekOp::Ge, &keys).unwrap_or(self.num_rows);
        let gt = self.locate(SeekOp::Gt, &keys).unwrap_or(self.num_rows);
        Ok(gt - ge)
    }
}

impl IndexCursor for Index {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn set_probe(&mut self, values: &[KeyValue]) -> Result<()> {
        self.cursor.probe = self.prepare_probe(values)?;
        self.cursor.nval = values.len();
        self.cursor.probe_pending = true;
        Ok(())
    }

    fn seek(&mut self, op: SeekOp) {
        self.cursor.op = op;
    }

    fn fetch(&mut self) -> Fetch {
        Index::fetch(self)
    }

    fn group_size(&self) -> usize {
        if self.cursor.cur >= self.num_rows {
            return 0;
        }
        if self.columns.len() == 1 {
            let v = self.columns[0].cursor;
            return match self.row_offsets() {
                Some(pof) => (pof[v + 1] - pof[v]) as usize,
                None => 1,
            };
        }
        let kc = self.probed_part();
        let v = self.columns[kc].cursor;
        if v >= self.columns[kc].len() {
            return 0;
        }
        self.descend(kc, v + 1) - self.descend(kc, v)
    }

    fn range(&mut self, bound: RangeBound, probe: &[KeyValue]) -> Result<usize> {
        let keys = self.prepare_probe(probe)?;
        let n = self.num_rows;
        if n == 0 {
            return Ok(0);
        }
        let gt = self.locate(SeekOp::Gt, &keys).unwrap_or(n);
        let ge = self.locate(SeekOp::Ge, &keys).unwrap_or(n);
        Ok(match bound {
            RangeBound::Gt => n - gt,
            RangeBound::Ge => n - ge,
            RangeBound::Lt => ge,
            RangeBound::Le => gt,
        })
    }

    fn reset(&mut self) {
        self.invalidate_parts();
        self.cursor.served = None;
        self.cursor.op = match self.cursor.op {
            SeekOp::First | SeekOp::Next => SeekOp::First,
            SeekOp::FirstDistinct | SeekOp::NextDistinct => SeekOp::FirstDistinct,
            SeekOp::Last | SeekOp::Prev => SeekOp::Last,
            SeekOp::Eq | SeekOp::Same | SeekOp::Gt | SeekOp::Ge => SeekOp::Eq,
        };
        self.cursor.probe_pending = !self.cursor.probe.is_empty();
    }
}
