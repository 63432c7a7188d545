//! Row source over an in-memory Arrow [`RecordBatch`].
//!
//! Row positions are row numbers scaled by a record length, which lets a
//! batch stand in for a fixed-length record file.

use crate::source::{ColumnSpec, ReadStatus, RecordFormat, RowSource};
use crate::types::{KeyType, KeyValue, RowPosition};
use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, Int16Array, Int32Array, Int64Array, StringArray,
};
use arrow::record_batch::RecordBatch;
use flatdex_result::{Error, Result};

/// Row-level predicate evaluated on `(batch, row)`.
pub type RowPredicate = Box<dyn FnMut(&RecordBatch, usize) -> bool>;

pub struct BatchRowSource {
    batch: RecordBatch,
    format: RecordFormat,
    record_len: u32,
    next_row: usize,
    current: usize,
    predicate: Option<RowPredicate>,
    estimate_only: bool,
}

impl BatchRowSource {
    pub fn new(batch: RecordBatch) -> Self {
        Self {
            batch,
            format: RecordFormat::Fixed,
            record_len: 1,
            next_row: 0,
            current: 0,
            predicate: None,
            estimate_only: false,
        }
    }

    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    /// Distance between consecutive row positions.
    pub fn with_record_len(mut self, record_len: u32) -> Self {
        self.record_len = record_len.max(1);
        self
    }

    pub fn with_predicate(mut self, predicate: impl FnMut(&RecordBatch, usize) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Report only a size estimate, like a variable-length file that was
    /// never scanned.
    pub fn estimate_only(mut self) -> Self {
        self.estimate_only = true;
        self
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    fn text_width(column: &ArrayRef) -> Result<usize> {
        let strings = downcast::<StringArray>(column, "utf8")?;
        Ok(strings
            .iter()
            .flatten()
            .map(str::len)
            .max()
            .unwrap_or(0)
            .max(1))
    }
}

fn downcast<'a, T: 'static>(column: &'a ArrayRef, what: &str) -> Result<&'a T> {
    column
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Internal(format!("batch column is not {what}")))
}

impl std::fmt::Debug for BatchRowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRowSource")
            .field("rows", &self.batch.num_rows())
            .field("format", &self.format)
            .field("record_len", &self.record_len)
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

impl RowSource for BatchRowSource {
    fn record_format(&self) -> RecordFormat {
        self.format
    }

    fn column_spec(&self, name: &str) -> Result<ColumnSpec> {
        let schema = self.batch.schema();
        let ordinal = schema.index_of(name)?;
        let field = schema.field(ordinal);
        let key_type = KeyType::from_arrow(field.data_type())?;
        let width = match key_type.fixed_width() {
            Some(w) => w,
            None => Self::text_width(self.batch.column(ordinal))?,
        };
        Ok(ColumnSpec {
            name: name.to_string(),
            ordinal,
            key_type,
            width,
            nullable: field.is_nullable(),
        })
    }

    fn max_size_estimate(&mut self) -> Option<usize> {
        Some(self.batch.num_rows())
    }

    fn exact_cardinality(&mut self) -> Option<usize> {
        (!self.estimate_only).then(|| self.batch.num_rows())
    }

    fn rewind(&mut self) -> Result<()> {
        self.next_row = 0;
        self.current = 0;
        Ok(())
    }

    fn read_next(&mut self) -> Result<ReadStatus> {
        if self.next_row >= self.batch.num_rows() {
            return Ok(ReadStatus::EndOfFile);
        }
        self.current = self.next_row;
        self.next_row += 1;
        Ok(ReadStatus::Ok)
    }

    fn has_filter(&self) -> bool {
        self.predicate.is_some()
    }

    fn apply_filter(&mut self) -> Result<bool> {
        Ok(match self.predicate.as_mut() {
            Some(predicate) => predicate(&self.batch, self.current),
            None => true,
        })
    }

    fn current_position(&self) -> RowPosition {
        (self.current as RowPosition).wrapping_mul(self.record_len)
    }

    fn value(&self, ordinal: usize) -> Result<KeyValue> {
        let column = self.batch.columns().get(ordinal).ok_or_else(|| {
            Error::InvalidArgumentError(format!("batch has no column {ordinal}"))
        })?;
        let row = self.current;
        if column.is_null(row) {
            return Ok(KeyValue::Null);
        }
        let key_type = KeyType::from_arrow(column.data_type())?;
        Ok(match key_type {
            KeyType::Int16 => KeyValue::Int16(downcast::<Int16Array>(column, "int16")?.value(row)),
            KeyType::Int32 => KeyValue::Int32(downcast::<Int32Array>(column, "int32")?.value(row)),
            KeyType::Int64 => KeyValue::Int64(downcast::<Int64Array>(column, "int64")?.value(row)),
            KeyType::Float64 => {
                KeyValue::Float64(downcast::<Float64Array>(column, "float64")?.value(row))
            }
            KeyType::Date => KeyValue::Date(downcast::<Date32Array>(column, "date32")?.value(row)),
            KeyType::Utf8 => {
                KeyValue::Utf8(downcast::<StringArray>(column, "utf8")?.value(row).to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![7, 8, 9])),
                Arc::new(StringArray::from(vec![Some("ab"), None, Some("abcd")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn specs_come_from_the_schema() {
        let source = BatchRowSource::new(batch());
        let id = source.column_spec("id").unwrap();
        assert_eq!((id.ordinal, id.key_type, id.width, id.nullable), (0, KeyType::Int32, 4, false));
        let name = source.column_spec("name").unwrap();
        assert_eq!((name.key_type, name.width, name.nullable), (KeyType::Utf8, 4, true));
        assert!(matches!(source.column_spec("missing"), Err(Error::Arrow(_))));
    }

    #[test]
    fn scan_yields_scaled_positions_and_nulls() {
        let mut source = BatchRowSource::new(batch()).with_record_len(16);
        source.rewind().unwrap();
        assert_eq!(source.read_next().unwrap(), ReadStatus::Ok);
        assert_eq!(source.current_position(), 0);
        assert_eq!(source.read_next().unwrap(), ReadStatus::Ok);
        assert_eq!(source.current_position(), 16);
        assert_eq!(source.value(0).unwrap(), KeyValue::Int32(8));
        assert_eq!(source.value(1).unwrap(), KeyValue::Null);
        assert_eq!(source.read_next().unwrap(), ReadStatus::Ok);
        assert_eq!(source.read_next().unwrap(), ReadStatus::EndOfFile);
    }

    #[test]
    fn estimate_only_hides_cardinality() {
        let mut source = BatchRowSource::new(batch()).estimate_only();
        assert_eq!(source.exact_cardinality(), None);
        assert_eq!(source.max_size_estimate(), Some(3));
    }
}
