//! Key value types shared by the column store, the row-source contract and
//! the on-disk format.

use arrow::datatypes::DataType;
use flatdex_result::{Error, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Position of a row inside the row store, as handed out by a row source.
pub type RowPosition = u32;

/// Physical type of one key part.
///
/// The discriminant is persisted in each part header. Do not renumber;
/// new variants get fresh explicit values.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum KeyType {
    /// Fixed-width, blank-padded text.
    Utf8 = 1,
    Float64 = 2,
    Int16 = 3,
    Int64 = 5,
    Int32 = 7,
    /// Days since the Unix epoch.
    Date = 8,
}

impl KeyType {
    /// Byte width of one value, `None` for text whose width is declared.
    #[inline]
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            KeyType::Int16 => Some(2),
            KeyType::Int32 | KeyType::Date => Some(4),
            KeyType::Int64 | KeyType::Float64 => Some(8),
            KeyType::Utf8 => None,
        }
    }

    /// Map an Arrow column type onto a key type.
    pub fn from_arrow(data_type: &DataType) -> Result<Self> {
        match data_type {
            DataType::Int16 => Ok(KeyType::Int16),
            DataType::Int32 => Ok(KeyType::Int32),
            DataType::Int64 => Ok(KeyType::Int64),
            DataType::Float64 => Ok(KeyType::Float64),
            DataType::Date32 => Ok(KeyType::Date),
            DataType::Utf8 => Ok(KeyType::Utf8),
            other => Err(Error::InvalidArgumentError(format!(
                "cannot index arrow type {other:?}"
            ))),
        }
    }
}

/// One key value, as produced by a row source or supplied as a probe.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyValue {
    Null,
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Date(i32),
    Utf8(String),
}

impl KeyValue {
    pub fn key_type(&self) -> Option<KeyType> {
        match self {
            KeyValue::Null => None,
            KeyValue::Int16(_) => Some(KeyType::Int16),
            KeyValue::Int32(_) => Some(KeyType::Int32),
            KeyValue::Int64(_) => Some(KeyType::Int64),
            KeyValue::Float64(_) => Some(KeyType::Float64),
            KeyValue::Date(_) => Some(KeyType::Date),
            KeyValue::Utf8(_) => Some(KeyType::Utf8),
        }
    }

    /// Integer view of a numeric value; floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            KeyValue::Int16(v) => Some(v as i64),
            KeyValue::Int32(v) | KeyValue::Date(v) => Some(v as i64),
            KeyValue::Int64(v) => Some(v),
            KeyValue::Float64(v) => Some(v as i64),
            KeyValue::Null | KeyValue::Utf8(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            KeyValue::Float64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

impl From<i16> for KeyValue {
    fn from(v: i16) -> Self {
        KeyValue::Int16(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Int32(v)
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int64(v)
    }
}

impl From<f64> for KeyValue {
    fn from(v: f64) -> Self {
        KeyValue::Float64(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Utf8(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Utf8(v)
    }
}
