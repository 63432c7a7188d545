//! Index construction: scan, sort, deduplicate, reorder, compact.

use crate::config::IndexConfig;
use crate::definition::IndexDefinition;
use crate::index::{BuildBuffers, Index, Phase};
use crate::key_column::KeyColumn;
use crate::source::{BlockTest, ColumnSpec, ReadStatus, RecordFormat, RowSource};
use crate::types::RowPosition;
use flatdex_result::{Error, Result};
use std::cmp::Ordering;

impl Index {
    /// Build a fresh index by scanning `source` from its first row.
    ///
    /// Any failure releases everything captured so far; no partial index is
    /// returned.
    pub fn build(
        definition: &IndexDefinition,
        source: &mut dyn RowSource,
        config: IndexConfig,
    ) -> Result<Index> {
        let mut index = Index::empty(definition, config);
        match index.populate(definition, source) {
            Ok(()) => Ok(index),
            Err(e) => {
                tracing::debug!(index = %definition.name, error = %e, "index build aborted");
                index.close();
                Err(e)
            }
        }
    }

    fn populate(&mut self, definition: &IndexDefinition, source: &mut dyn RowSource) -> Result<()> {
        let estimate = source.max_size_estimate().ok_or_else(|| {
            Error::RowSource(format!(
                "cannot estimate the size of the table indexed by {}",
                definition.name
            ))
        })?;

        let specs = definition
            .parts()
            .iter()
            .map(|part| source.column_spec(&part.name))
            .collect::<Result<Vec<ColumnSpec>>>()?;

        for (part, spec) in definition.parts().iter().zip(&specs) {
            self.columns
                .push(KeyColumn::init(spec, estimate, part.ascending, part.key_len)?);
        }

        tracing::debug!(index = %self.name, estimate, parts = specs.len(), "index build started");

        if estimate == 0 {
            self.finish_empty();
            return Ok(());
        }

        let filtered = source.has_filter();
        self.scan(source, &specs, estimate)?;

        if self.num_rows == 0 {
            self.finish_empty();
            return Ok(());
        }

        self.sort_and_dedup()?;
        self.sorted = self.reorder();
        self.compact_parts()?;
        self.apply_position_stride(source.record_format(), filtered);
        self.build_blocks()?;
        self.finish_built();
        Ok(())
    }

    // ===== scan =====

    fn scan(&mut self, source: &mut dyn RowSource, specs: &[ColumnSpec], estimate: usize) -> Result<()> {
        let mut positions: Vec<RowPosition> = Vec::new();
        positions
            .try_reserve_exact(estimate)
            .map_err(|_| Error::allocation("row positions", estimate))?;

        source.rewind()?;
        let filtered = source.has_filter();

        loop {
            match source.test_block()? {
                BlockTest::EndOfFile => break,
                BlockTest::NotFound => continue,
                BlockTest::Ok => {}
            }
            match source.read_next()? {
                ReadStatus::EndOfFile => break,
                ReadStatus::Filtered => continue,
                ReadStatus::Ok => {}
            }
            if filtered && !source.apply_filter()? {
                continue;
            }

            let slot = positions.len();
            if slot == positions.capacity() {
                // The estimate was low; grow instead of failing.
                positions
                    .try_reserve(1)
                    .map_err(|_| Error::allocation("row positions", slot + 1))?;
            }
            positions.push(source.current_position());
            for (col, spec) in self.columns.iter_mut().zip(specs) {
                col.capture(&source.value(spec.ordinal)?, slot)?;
            }
            tracing::trace!(slot, position = positions[slot], "captured row");
        }

        let num_rows = positions.len();
        if num_rows > u32::MAX as usize {
            return Err(Error::InvalidArgumentError(format!(
                "{num_rows} rows exceed the index capacity"
            )));
        }
        if num_rows < estimate {
            positions.shrink_to_fit();
            for col in &mut self.columns {
                col.compact(num_rows);
            }
        }

        tracing::debug!(index = %self.name, num_rows, estimate, "row source exhausted");
        self.num_rows = num_rows;
        self.positions = Some(positions);
        Ok(())
    }

    // ===== sort =====

    #[inline]
    fn compare_rows(columns: &[KeyColumn], a: usize, b: usize) -> Ordering {
        for col in columns {
            match col.compare(a, b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    fn sort_and_dedup(&mut self) -> Result<()> {
        let n = self.num_rows;

        let mut order: Vec<u32> = Vec::new();
        order
            .try_reserve_exact(n)
            .map_err(|_| Error::allocation("sort index", n))?;
        order.extend(0..n as u32);
        // Stable, so equal keys keep scan order.
        let columns = &self.columns;
        order.sort_by(|&a, &b| Self::compare_rows(columns, a as usize, b as usize));

        let mut boundaries: Vec<u32> = Vec::new();
        boundaries
            .try_reserve_exact(n + 1)
            .map_err(|_| Error::allocation("offset", n + 1))?;
        boundaries.push(0);
        for i in 1..n {
            if Self::compare_rows(columns, order[i - 1] as usize, order[i] as usize) != Ordering::Equal {
                boundaries.push(i as u32);
            }
        }
        boundaries.push(n as u32);
        let ndif = boundaries.len() - 1;

        tracing::debug!(index = %self.name, num_rows = n, num_distinct = ndif, "sorted");

        if self.declared_unique && ndif < n {
            return Err(Error::UniqueViolation {
                index: self.name.clone(),
            });
        }

        let mut permutation: Vec<Option<u32>> = Vec::new();
        permutation
            .try_reserve_exact(n)
            .map_err(|_| Error::allocation("sort index", n))?;
        permutation.extend(order.into_iter().map(Some));

        self.num_distinct = ndif;
        self.phase = Phase::Building(BuildBuffers {
            permutation,
            boundaries,
        });
        Ok(())
    }

    /// Apply the sort permutation in place by following its cycles.
    ///
    /// Returns true when the permutation was the identity, i.e. the row
    /// store was already in index order.
    pub(crate) fn reorder(&mut self) -> bool {
        let Phase::Building(buffers) = &mut self.phase else {
            return self.sorted;
        };
        let perm = &mut buffers.permutation;
        let columns = &mut self.columns;
        let mut positions = self.positions.as_mut();
        let mut sorted = true;

        for i in 0..perm.len() {
            match perm[i] {
                None => continue,
                Some(p) if p as usize == i => {
                    perm[i] = None;
                    continue;
                }
                Some(_) => {}
            }
            sorted = false;

            // Slot j receives the row the permutation names for it; the row
            // that started at i travels along the cycle until it lands.
            let mut j = i;
            while let Some(k) = perm[j].take() {
                let k = k as usize;
                if k == i {
                    break;
                }
                for col in columns.iter_mut() {
                    col.swap_slots(j, k);
                }
                if let Some(p) = positions.as_deref_mut() {
                    p.swap(j, k);
                }
                j = k;
            }
        }

        tracing::trace!(index = %self.name, sorted, "reordered");
        sorted
    }

    // ===== compaction =====

    fn compact_parts(&mut self) -> Result<()> {
        let boundaries = match std::mem::take(&mut self.phase) {
            Phase::Building(buffers) => buffers.boundaries,
            other => {
                self.phase = other;
                return Err(Error::Internal("compaction outside of a build".into()));
            }
        };
        let n = self.num_rows;
        let ndif = self.num_distinct;
        let nk = self.columns.len();

        if ndif < n {
            self.multi = true;
            self.max_same = boundaries
                .windows(2)
                .map(|w| (w[1] - w[0]) as usize)
                .max()
                .unwrap_or(1);
            for col in &mut self.columns {
                for i in 1..ndif {
                    col.move_slot(i, boundaries[i] as usize);
                }
                col.compact(ndif);
            }
            if let Some(last) = self.columns.last_mut() {
                last.make_offset_array(ndif)?.copy_from_slice(&boundaries);
            }
        } else {
            self.multi = false;
            self.max_same = 1;
        }
        drop(boundaries);

        if let Some(last) = self.columns.last_mut() {
            last.max_same = self.max_same;
        }

        // Walk toward the first part; each part keeps the distinct values of
        // the key prefix ending at it.
        let mut ndf = ndif;
        for k in (0..nk.saturating_sub(1)).rev() {
            let mut bof: Vec<u32> = Vec::new();
            bof.try_reserve_exact(ndf + 1)
                .map_err(|_| Error::allocation("offset array", ndf + 1))?;
            bof.push(0);

            let mut last = 0;
            for i in 1..ndf {
                if self.columns[..=k]
                    .iter()
                    .any(|col| col.compare(last, i) != Ordering::Equal)
                {
                    bof.push(i as u32);
                    last = i;
                }
            }

            let j = bof.len();
            if j < ndf {
                bof.push(ndf as u32);
                ndf = j;
                for col in &mut self.columns[..=k] {
                    for i in 1..ndf {
                        col.move_slot(i, bof[i] as usize);
                    }
                    col.compact(ndf);
                }
                self.columns[k]
                    .make_offset_array(ndf)?
                    .copy_from_slice(&bof);
                self.columns[k].max_same = self.col_max_same(k);
            } else {
                self.columns[k].set_offsets(None);
                self.columns[k].max_same = self.col_max_same(k);
            }

            tracing::trace!(part = k, distinct = ndf, "compacted key part");
        }
        Ok(())
    }

    /// Largest number of rows under one distinct value of part `k`.
    pub(crate) fn col_max_same(&self, k: usize) -> usize {
        let ndf = self.columns[k].len();
        (0..ndf)
            .map(|i| self.descend(k, i + 1) - self.descend(k, i))
            .max()
            .unwrap_or(1)
            .max(1)
    }

    // ===== finishing touches =====

    fn apply_position_stride(&mut self, format: RecordFormat, filtered: bool) {
        if !(self.sorted && !filtered && self.config.allow_position_stride) {
            return;
        }
        if !format.has_computable_positions() {
            return;
        }
        let Some(positions) = self.positions.as_ref() else {
            return;
        };
        let incr = match positions.get(1) {
            Some(&second) => second,
            None => 1,
        };
        if incr == 0 {
            return;
        }
        let arithmetic = positions
            .iter()
            .enumerate()
            .all(|(i, &p)| (i as u32).checked_mul(incr) == Some(p));
        if arithmetic {
            tracing::debug!(index = %self.name, incr, "row positions replaced by stride");
            self.position_stride = incr;
            self.positions = None;
        }
    }

    fn build_blocks(&mut self) -> Result<()> {
        let Some(first) = self.columns.first_mut() else {
            return Ok(());
        };
        if let Some((count, stride)) = self.config.block_geometry(first.len()) {
            first.make_block_array(count, stride)?;
            self.block_count = count;
            self.block_stride = stride;
            tracing::debug!(
                index = %self.name,
                block_count = count,
                block_stride = stride,
                "two-tier block array built"
            );
        }
        Ok(())
    }

    pub(crate) fn finish_empty(&mut self) {
        self.num_rows = 0;
        self.num_distinct = 0;
        self.multi = false;
        self.max_same = 1;
        self.sorted = true;
        self.positions = None;
        for col in &mut self.columns {
            col.compact(0);
            col.max_same = 1;
        }
        tracing::debug!(index = %self.name, "built empty index");
        self.finish_built();
    }

    pub(crate) fn finish_built(&mut self) {
        self.phase = Phase::Built;
        self.cursor.cur = self.num_rows;
        self.cursor.served = None;
        for col in &mut self.columns {
            col.cursor = col.len();
        }
        tracing::debug!(
            index = %self.name,
            num_rows = self.num_rows,
            num_distinct = self.num_distinct,
            max_same = self.max_same,
            sorted = self.sorted,
            stride = self.position_stride,
            "index ready"
        );
    }
}
