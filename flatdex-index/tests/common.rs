#![allow(dead_code)]

use flatdex_index::{
    ColumnSpec, IndexDefinition, KeyPartDefinition, KeyType, KeyValue, ReadStatus, RecordFormat,
    RowPosition, RowSource,
};
use flatdex_result::{Error, Result};

/// In-memory row store used by the index tests.
pub struct VecRowSource {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<KeyValue>>,
    pub format: RecordFormat,
    pub record_len: u32,
    /// Report only an estimate, and this one instead of the row count.
    pub estimate: Option<usize>,
    pub exact: bool,
    pub filter: Option<fn(&[KeyValue]) -> bool>,
    /// Fail the read of this row.
    pub fail_at: Option<usize>,
    next: usize,
    current: usize,
}

impl VecRowSource {
    pub fn new(columns: Vec<ColumnSpec>, rows: Vec<Vec<KeyValue>>) -> Self {
        Self {
            columns,
            rows,
            format: RecordFormat::Fixed,
            record_len: 1,
            estimate: None,
            exact: true,
            filter: None,
            fail_at: None,
            next: 0,
            current: 0,
        }
    }

    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_record_len(mut self, record_len: u32) -> Self {
        self.record_len = record_len;
        self
    }

    pub fn estimated(mut self, estimate: usize) -> Self {
        self.estimate = Some(estimate);
        self.exact = false;
        self
    }

    pub fn with_filter(mut self, filter: fn(&[KeyValue]) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl RowSource for VecRowSource {
    fn record_format(&self) -> RecordFormat {
        self.format
    }

    fn column_spec(&self, name: &str) -> Result<ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| Error::InvalidArgumentError(format!("no column {name}")))
    }

    fn max_size_estimate(&mut self) -> Option<usize> {
        Some(self.estimate.unwrap_or(self.rows.len()))
    }

    fn exact_cardinality(&mut self) -> Option<usize> {
        self.exact.then_some(self.rows.len())
    }

    fn rewind(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }

    fn read_next(&mut self) -> Result<ReadStatus> {
        if self.next >= self.rows.len() {
            return Ok(ReadStatus::EndOfFile);
        }
        if self.fail_at == Some(self.next) {
            return Err(Error::row_source(format!("bad record {}", self.next)));
        }
        self.current = self.next;
        self.next += 1;
        Ok(ReadStatus::Ok)
    }

    fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    fn apply_filter(&mut self) -> Result<bool> {
        Ok(self.filter.is_none_or(|f| f(&self.rows[self.current])))
    }

    fn current_position(&self) -> RowPosition {
        self.current as RowPosition * self.record_len
    }

    fn value(&self, ordinal: usize) -> Result<KeyValue> {
        Ok(self.rows[self.current][ordinal].clone())
    }
}

pub fn int_spec(name: &str, ordinal: usize) -> ColumnSpec {
    ColumnSpec {
        name: name.into(),
        ordinal,
        key_type: KeyType::Int32,
        width: 4,
        nullable: false,
    }
}

pub fn text_spec(name: &str, ordinal: usize, width: usize) -> ColumnSpec {
    ColumnSpec {
        name: name.into(),
        ordinal,
        key_type: KeyType::Utf8,
        width,
        nullable: false,
    }
}

/// Single Int32 column `k`.
pub fn int_source(values: &[i32]) -> VecRowSource {
    VecRowSource::new(
        vec![int_spec("k", 0)],
        values.iter().map(|&v| vec![KeyValue::Int32(v)]).collect(),
    )
}

/// Columns `a` (Int32) and `b` (text, 8 bytes).
pub fn pair_source(rows: &[(i32, &str)]) -> VecRowSource {
    VecRowSource::new(
        vec![int_spec("a", 0), text_spec("b", 1, 8)],
        rows.iter()
            .map(|&(a, b)| vec![KeyValue::Int32(a), KeyValue::Utf8(b.to_string())])
            .collect(),
    )
}

pub fn single_def(name: &str, unique: bool) -> IndexDefinition {
    IndexDefinition::new(name, 0, unique, vec![KeyPartDefinition::new("k")]).unwrap()
}

pub fn pair_def(name: &str, unique: bool) -> IndexDefinition {
    IndexDefinition::new(
        name,
        1,
        unique,
        vec![KeyPartDefinition::new("a"), KeyPartDefinition::new("b")],
    )
    .unwrap()
}
