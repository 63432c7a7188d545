//! Per-key-part value store.
//!
//! A [`KeyColumn`] owns the values of one key part. During a build it holds
//! one value per captured row; after compaction it holds only the distinct
//! values of the key prefix ending at this part, plus an offset array that
//! maps each of them onto its children in the next part (or onto logical
//! row positions for the last part).

use crate::source::ColumnSpec;
use crate::types::{KeyType, KeyValue};
use flatdex_result::{Error, Result};
use std::cmp::Ordering;

const BLANK: u8 = b' ';

// ===== scalar helpers =====

trait KeyScalar: Copy {
    fn key_cmp(&self, other: &Self) -> Ordering;
    fn as_i64(self) -> Option<i64>;
    fn as_f64(self) -> f64;
    fn push_le(self, out: &mut Vec<u8>);
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! int_scalar {
    ($t:ty) => {
        impl KeyScalar for $t {
            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
            #[inline]
            fn as_i64(self) -> Option<i64> {
                Some(self as i64)
            }
            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn push_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
            #[inline]
            fn from_le(bytes: &[u8]) -> Self {
                let mut word = [0u8; std::mem::size_of::<$t>()];
                word.copy_from_slice(bytes);
                <$t>::from_le_bytes(word)
            }
        }
    };
}

int_scalar!(i16);
int_scalar!(i32);
int_scalar!(i64);

impl KeyScalar for f64 {
    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
    #[inline]
    fn as_i64(self) -> Option<i64> {
        None
    }
    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
    #[inline]
    fn push_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
    #[inline]
    fn from_le(bytes: &[u8]) -> Self {
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        f64::from_le_bytes(word)
    }
}

/// A probe value converted into the domain of one key column.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeKey {
    Int(i64),
    Float(f64),
    /// Blank padded or truncated to the column's key length.
    Text(Vec<u8>),
}

/// Ordering of `probe` relative to the stored scalar `x`.
#[inline]
fn probe_cmp_scalar<T: KeyScalar>(probe: &ProbeKey, x: T) -> Ordering {
    match (probe, x.as_i64()) {
        (ProbeKey::Int(p), Some(xi)) => p.cmp(&xi),
        (ProbeKey::Int(p), None) => (*p as f64).total_cmp(&x.as_f64()),
        (ProbeKey::Float(p), _) => p.total_cmp(&x.as_f64()),
        // prepare_probe never pairs text with a numeric column
        (ProbeKey::Text(_), _) => Ordering::Equal,
    }
}

fn reserve<T>(v: &mut Vec<T>, n: usize, what: &str) -> Result<()> {
    v.try_reserve_exact(n)
        .map_err(|_| Error::allocation(what, n))
}

fn fixed_text(s: &[u8], width: usize) -> impl Iterator<Item = u8> + '_ {
    s.iter()
        .copied()
        .chain(std::iter::repeat(BLANK))
        .take(width)
}

// ===== typed value arrays =====

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum KeyValues {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Date(Vec<i32>),
    Utf8 { width: usize, bytes: Vec<u8> },
}

macro_rules! dispatch {
    ($values:expr, $v:ident => $num:expr, ($w:ident, $b:ident) => $text:expr) => {
        match $values {
            KeyValues::Int16($v) => $num,
            KeyValues::Int32($v) | KeyValues::Date($v) => $num,
            KeyValues::Int64($v) => $num,
            KeyValues::Float64($v) => $num,
            KeyValues::Utf8 {
                width: $w,
                bytes: $b,
            } => $text,
        }
    };
}

impl KeyValues {
    fn with_capacity(key_type: KeyType, width: usize, n: usize) -> Result<Self> {
        const WHAT: &str = "key values";
        Ok(match key_type {
            KeyType::Int16 => {
                let mut v = Vec::new();
                reserve(&mut v, n, WHAT)?;
                KeyValues::Int16(v)
            }
            KeyType::Int32 => {
                let mut v = Vec::new();
                reserve(&mut v, n, WHAT)?;
                KeyValues::Int32(v)
            }
            KeyType::Date => {
                let mut v = Vec::new();
                reserve(&mut v, n, WHAT)?;
                KeyValues::Date(v)
            }
            KeyType::Int64 => {
                let mut v = Vec::new();
                reserve(&mut v, n, WHAT)?;
                KeyValues::Int64(v)
            }
            KeyType::Float64 => {
                let mut v = Vec::new();
                reserve(&mut v, n, WHAT)?;
                KeyValues::Float64(v)
            }
            KeyType::Utf8 => {
                let total = n
                    .checked_mul(width)
                    .ok_or_else(|| Error::allocation(WHAT, n))?;
                let mut bytes = Vec::new();
                reserve(&mut bytes, total, WHAT)?;
                KeyValues::Utf8 { width, bytes }
            }
        })
    }

    /// Decode `count` little-endian values of `width` bytes each.
    fn from_le_bytes(key_type: KeyType, width: usize, count: usize, raw: &[u8]) -> Result<Self> {
        if raw.len() != count * width {
            return Err(Error::FormatMismatch(format!(
                "expected {count} keys of {width} bytes, found {} bytes",
                raw.len()
            )));
        }
        let mut out = Self::with_capacity(key_type, width, count)?;
        dispatch!(&mut out, v => {
            for chunk in raw.chunks_exact(width) {
                v.push(KeyScalar::from_le(chunk));
            }
        }, (_w, b) => b.extend_from_slice(raw));
        Ok(out)
    }

    fn push_le_bytes(&self, out: &mut Vec<u8>) {
        dispatch!(self, v => {
            for &x in v.iter() {
                x.push_le(out);
            }
        }, (_w, b) => out.extend_from_slice(b));
    }

    #[inline]
    fn len(&self) -> usize {
        dispatch!(self, v => v.len(), (w, b) => if *w == 0 { 0 } else { b.len() / *w })
    }

    #[inline]
    fn text(bytes: &[u8], width: usize, i: usize) -> &[u8] {
        &bytes[i * width..(i + 1) * width]
    }

    #[inline]
    fn cmp(&self, i: usize, j: usize) -> Ordering {
        dispatch!(self, v => v[i].key_cmp(&v[j]), (w, b) => {
            Self::text(b, *w, i).cmp(Self::text(b, *w, j))
        })
    }

    /// Ordering of `probe` relative to element `i`.
    #[inline]
    fn probe_cmp(&self, i: usize, probe: &ProbeKey) -> Ordering {
        dispatch!(self, v => probe_cmp_scalar(probe, v[i]), (w, b) => match probe {
            ProbeKey::Text(p) => p.as_slice().cmp(Self::text(b, *w, i)),
            _ => Ordering::Equal,
        })
    }

    fn move_slot(&mut self, dst: usize, src: usize) {
        dispatch!(self, v => v[dst] = v[src], (w, b) => {
            let w = *w;
            b.copy_within(src * w..(src + 1) * w, dst * w);
        })
    }

    fn swap(&mut self, a: usize, c: usize) {
        if a == c {
            return;
        }
        dispatch!(self, v => v.swap(a, c), (w, b) => {
            let w = *w;
            for k in 0..w {
                b.swap(a * w + k, c * w + k);
            }
        })
    }

    fn truncate(&mut self, n: usize) {
        dispatch!(self, v => {
            v.truncate(n);
            v.shrink_to_fit();
        }, (w, b) => {
            b.truncate(n * *w);
            b.shrink_to_fit();
        })
    }

    fn clear(&mut self) {
        dispatch!(self, v => *v = Vec::new(), (_w, b) => *b = Vec::new())
    }

    /// Every `stride`-th element, `count` of them.
    fn sample(&self, key_type: KeyType, count: usize, stride: usize) -> Result<Self> {
        let width = match self {
            KeyValues::Utf8 { width, .. } => *width,
            _ => 0,
        };
        let mut out = Self::with_capacity(key_type, width, count)?;
        for k in 0..count {
            out.push_from(self, k * stride)?;
        }
        Ok(out)
    }

    fn push_from(&mut self, other: &Self, i: usize) -> Result<()> {
        match (self, other) {
            (KeyValues::Int16(d), KeyValues::Int16(s)) => d.push(s[i]),
            (KeyValues::Int32(d), KeyValues::Int32(s)) | (KeyValues::Date(d), KeyValues::Date(s)) => {
                d.push(s[i])
            }
            (KeyValues::Int64(d), KeyValues::Int64(s)) => d.push(s[i]),
            (KeyValues::Float64(d), KeyValues::Float64(s)) => d.push(s[i]),
            (KeyValues::Utf8 { bytes: d, .. }, KeyValues::Utf8 { width, bytes: s }) => {
                d.extend_from_slice(Self::text(s, *width, i))
            }
            (d, s) => {
                return Err(Error::Internal(format!(
                    "cannot copy a {} value into {} storage",
                    s.kind(),
                    d.kind()
                )));
            }
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        match self {
            KeyValues::Int16(_) => "int16",
            KeyValues::Int32(_) => "int32",
            KeyValues::Date(_) => "date",
            KeyValues::Int64(_) => "int64",
            KeyValues::Float64(_) => "float64",
            KeyValues::Utf8 { .. } => "text",
        }
    }

    fn get(&self, i: usize) -> KeyValue {
        match self {
            KeyValues::Int16(v) => KeyValue::Int16(v[i]),
            KeyValues::Int32(v) => KeyValue::Int32(v[i]),
            KeyValues::Date(v) => KeyValue::Date(v[i]),
            KeyValues::Int64(v) => KeyValue::Int64(v[i]),
            KeyValues::Float64(v) => KeyValue::Float64(v[i]),
            KeyValues::Utf8 { width, bytes } => {
                let raw = Self::text(bytes, *width, i);
                let end = raw.iter().rposition(|&c| c != BLANK).map_or(0, |p| p + 1);
                KeyValue::Utf8(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
        }
    }

    /// Store `value` at `slot`, appending when `slot == len`.
    fn set(&mut self, slot: usize, value: &KeyValue) -> Result<()> {
        let len = self.len();
        if slot > len {
            return Err(Error::Internal(format!(
                "capture slot {slot} skips past {len} stored keys"
            )));
        }

        fn int<T: TryFrom<i64>>(value: &KeyValue) -> Result<T> {
            let raw = match value {
                KeyValue::Null => 0,
                other => other.as_i64().ok_or_else(|| mismatch(other))?,
            };
            T::try_from(raw).map_err(|_| {
                Error::InvalidArgumentError(format!("key value {raw} out of range"))
            })
        }

        fn put<T>(v: &mut Vec<T>, slot: usize, x: T) {
            if slot == v.len() {
                v.push(x);
            } else {
                v[slot] = x;
            }
        }

        match self {
            KeyValues::Int16(v) => put(v, slot, int::<i16>(value)?),
            KeyValues::Int32(v) | KeyValues::Date(v) => put(v, slot, int::<i32>(value)?),
            KeyValues::Int64(v) => put(v, slot, int::<i64>(value)?),
            KeyValues::Float64(v) => {
                let x = match value {
                    KeyValue::Null => 0.0,
                    other => other.as_f64().ok_or_else(|| mismatch(other))?,
                };
                put(v, slot, x)
            }
            KeyValues::Utf8 { width, bytes } => {
                let w = *width;
                let text: &[u8] = match value {
                    KeyValue::Null => &[],
                    KeyValue::Utf8(s) => s.as_bytes(),
                    other => return Err(mismatch(other)),
                };
                if slot == len {
                    bytes.extend(fixed_text(text, w));
                } else {
                    for (dst, src) in bytes[slot * w..(slot + 1) * w]
                        .iter_mut()
                        .zip(fixed_text(text, w))
                    {
                        *dst = src;
                    }
                }
            }
        }
        Ok(())
    }
}

fn mismatch(value: &KeyValue) -> Error {
    Error::InvalidArgumentError(format!("key value {value:?} does not fit the key column"))
}

// ===== KeyColumn =====

/// Values, offsets and block samples of one key part.
#[derive(Clone, Debug)]
pub struct KeyColumn {
    name: String,
    key_type: KeyType,
    /// Bytes per stored value.
    width: usize,
    prefix: bool,
    ascending: bool,
    values: KeyValues,
    blocks: Option<KeyValues>,
    offsets: Option<Vec<u32>>,
    pub(crate) max_same: usize,
    /// Index of the current distinct value, `len()` when invalid.
    pub(crate) cursor: usize,
}

impl KeyColumn {
    /// Prepare storage for `capacity` captured rows of `spec`.
    ///
    /// `key_len` below a text column's width turns the key into a prefix
    /// key. Nullable columns can only be indexed through a prefix key.
    pub fn init(spec: &ColumnSpec, capacity: usize, ascending: bool, key_len: usize) -> Result<Self> {
        let prefix = spec.key_type == KeyType::Utf8 && key_len > 0 && spec.width > key_len;
        if spec.nullable && !prefix {
            return Err(Error::AllocationFailed {
                what: format!("key storage for nullable column {}", spec.name),
                count: capacity,
            });
        }
        let width = match spec.key_type.fixed_width() {
            Some(w) => w,
            None if prefix => key_len,
            None => spec.width.max(1),
        };
        tracing::trace!(
            column = %spec.name,
            capacity,
            width,
            prefix,
            "key column init"
        );
        Ok(Self {
            name: spec.name.clone(),
            key_type: spec.key_type,
            width,
            prefix,
            ascending,
            values: KeyValues::with_capacity(spec.key_type, width, capacity)?,
            blocks: None,
            offsets: None,
            max_same: 1,
            cursor: 0,
        })
    }

    /// Rebuild a column from its persisted sections.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_sections(
        spec: &ColumnSpec,
        ascending: bool,
        prefix: bool,
        width: usize,
        ndf: usize,
        values: &[u8],
        blocks: Option<(usize, &[u8])>,
        offsets: Option<Vec<u32>>,
    ) -> Result<Self> {
        let values = KeyValues::from_le_bytes(spec.key_type, width, ndf, values)?;
        let blocks = match blocks {
            Some((count, raw)) => Some(KeyValues::from_le_bytes(spec.key_type, width, count, raw)?),
            None => None,
        };
        Ok(Self {
            name: spec.name.clone(),
            key_type: spec.key_type,
            width,
            prefix,
            ascending,
            values,
            blocks,
            offsets,
            max_same: 1,
            cursor: ndf,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Persisted key length in bytes.
    #[inline]
    pub fn key_len(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    #[inline]
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    /// Number of stored values (distinct values once compacted).
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn offsets(&self) -> Option<&[u32]> {
        self.offsets.as_deref()
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.as_ref().map_or(0, KeyValues::len)
    }

    #[inline]
    pub fn max_same(&self) -> usize {
        self.max_same
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First child (in the next part, or the first logical row for the last
    /// part) of distinct value `i`. `i == len()` maps past the last child.
    #[inline]
    pub(crate) fn child_start(&self, i: usize) -> usize {
        match &self.offsets {
            Some(o) => o[i] as usize,
            None => i,
        }
    }

    /// Copy the current value of a row into slot `row_index`.
    pub fn capture(&mut self, value: &KeyValue, row_index: usize) -> Result<()> {
        self.values.set(row_index, value)
    }

    /// Total order over two slots, honoring the sort direction.
    #[inline]
    pub fn compare(&self, i: usize, j: usize) -> Ordering {
        let o = self.values.cmp(i, j);
        if self.ascending { o } else { o.reverse() }
    }

    /// Ordering of `probe` relative to slot `i`, in index order.
    #[inline]
    pub fn compare_to_probe(&self, i: usize, probe: &ProbeKey) -> Ordering {
        let o = self.values.probe_cmp(i, probe);
        if self.ascending { o } else { o.reverse() }
    }

    /// Ordering of `probe` relative to block sample `block_i`.
    #[inline]
    pub fn compare_block_to_probe(&self, block_i: usize, probe: &ProbeKey) -> Ordering {
        let Some(blocks) = &self.blocks else {
            return Ordering::Equal;
        };
        let o = blocks.probe_cmp(block_i, probe);
        if self.ascending { o } else { o.reverse() }
    }

    /// Convert a caller value into this column's probe domain.
    pub fn prepare_probe(&self, value: &KeyValue) -> Result<ProbeKey> {
        match (self.key_type, value) {
            (_, KeyValue::Null) => Err(Error::InvalidArgumentError(format!(
                "null probe on key column {}",
                self.name
            ))),
            (KeyType::Utf8, KeyValue::Utf8(s)) => {
                Ok(ProbeKey::Text(fixed_text(s.as_bytes(), self.width).collect()))
            }
            (KeyType::Utf8, other) | (_, other @ KeyValue::Utf8(_)) => Err(Error::InvalidArgumentError(
                format!("probe {other:?} does not match key column {}", self.name),
            )),
            (_, KeyValue::Float64(f)) => Ok(ProbeKey::Float(*f)),
            (_, other) => other
                .as_i64()
                .map(ProbeKey::Int)
                .ok_or_else(|| mismatch(other)),
        }
    }

    /// Allocate an `n + 1` entry offset array, zero filled.
    pub fn make_offset_array(&mut self, n: usize) -> Result<&mut [u32]> {
        let mut offsets = Vec::new();
        reserve(&mut offsets, n + 1, "offset array")?;
        offsets.resize(n + 1, 0);
        Ok(self.offsets.insert(offsets).as_mut_slice())
    }

    /// Shrink the offset array to `n + 1` entries, or drop it when `n == 0`.
    pub(crate) fn resize_offset_array(&mut self, n: usize) {
        if n == 0 {
            self.offsets = None;
        } else if let Some(o) = self.offsets.as_mut() {
            o.truncate(n + 1);
            o.shrink_to_fit();
        }
    }

    pub(crate) fn set_offsets(&mut self, offsets: Option<Vec<u32>>) {
        self.offsets = offsets;
    }

    /// Sample every `stride`-th value into a `block_count` entry array.
    pub fn make_block_array(&mut self, block_count: usize, stride: usize) -> Result<()> {
        self.blocks = Some(self.values.sample(self.key_type, block_count, stride)?);
        Ok(())
    }

    /// Keep only the first `new_size` values, releasing spare capacity.
    pub fn compact(&mut self, new_size: usize) {
        self.values.truncate(new_size);
        self.cursor = self.cursor.min(new_size);
    }

    /// Free every owned buffer. Idempotent.
    pub fn release(&mut self) {
        self.values.clear();
        self.blocks = None;
        self.offsets = None;
        self.cursor = 0;
    }

    /// Materialize the value stored at `slot`.
    pub fn fill(&self, slot: usize) -> Option<KeyValue> {
        (slot < self.len()).then(|| self.values.get(slot))
    }

    #[inline]
    pub(crate) fn move_slot(&mut self, dst: usize, src: usize) {
        self.values.move_slot(dst, src);
    }

    #[inline]
    pub(crate) fn swap_slots(&mut self, a: usize, b: usize) {
        self.values.swap(a, b);
    }

    pub(crate) fn values_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.width);
        self.values.push_le_bytes(&mut out);
        out
    }

    pub(crate) fn blocks_le_bytes(&self) -> Option<Vec<u8>> {
        self.blocks.as_ref().map(|b| {
            let mut out = Vec::with_capacity(b.len() * self.width);
            b.push_le_bytes(&mut out);
            out
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(key_type: KeyType, width: usize, nullable: bool) -> ColumnSpec {
        ColumnSpec {
            name: "c".into(),
            ordinal: 0,
            key_type,
            width,
            nullable,
        }
    }

    fn int_column(values: &[i32]) -> KeyColumn {
        let mut col = KeyColumn::init(&spec(KeyType::Int32, 4, false), values.len(), true, 0).unwrap();
        for (i, v) in values.iter().enumerate() {
            col.capture(&KeyValue::Int32(*v), i).unwrap();
        }
        col
    }

    #[test]
    fn nullable_full_keys_cannot_be_indexed() {
        let err = KeyColumn::init(&spec(KeyType::Int64, 8, true), 4, true, 0).unwrap_err();
        assert!(matches!(err, Error::AllocationFailed { .. }));

        // A truncated text key on a nullable column is accepted.
        let col = KeyColumn::init(&spec(KeyType::Utf8, 20, true), 4, true, 3).unwrap();
        assert!(col.is_prefix());
        assert_eq!(col.key_len(), 3);
    }

    #[test]
    fn compare_honors_direction() {
        let mut col = int_column(&[5, 9]);
        assert_eq!(col.compare(0, 1), Ordering::Less);
        col.ascending = false;
        assert_eq!(col.compare(0, 1), Ordering::Greater);
    }

    #[test]
    fn text_keys_are_blank_padded_and_truncated() {
        let mut col = KeyColumn::init(&spec(KeyType::Utf8, 10, false), 2, true, 4).unwrap();
        col.capture(&KeyValue::from("ab"), 0).unwrap();
        col.capture(&KeyValue::from("abcdefg"), 1).unwrap();
        assert_eq!(col.values_le_bytes(), b"ab  abcd".to_vec());
        assert_eq!(col.fill(0), Some(KeyValue::from("ab")));
        assert_eq!(col.fill(1), Some(KeyValue::from("abcd")));

        let probe = col.prepare_probe(&KeyValue::from("abcdzz")).unwrap();
        assert_eq!(col.compare_to_probe(1, &probe), Ordering::Equal);
        assert_eq!(col.compare_to_probe(0, &probe), Ordering::Greater);
    }

    #[test]
    fn probes_compare_across_integer_widths() {
        let col = int_column(&[-3, 7]);
        let wide = col.prepare_probe(&KeyValue::Int64(i64::MAX)).unwrap();
        assert_eq!(col.compare_to_probe(1, &wide), Ordering::Greater);
        let frac = col.prepare_probe(&KeyValue::Float64(6.5)).unwrap();
        assert_eq!(col.compare_to_probe(1, &frac), Ordering::Less);
        assert!(col.prepare_probe(&KeyValue::from("7")).is_err());
    }

    #[test]
    fn block_array_samples_every_stride() {
        let mut col = int_column(&(0..10).collect::<Vec<_>>());
        col.make_block_array(4, 3).unwrap();
        assert_eq!(col.block_count(), 4);
        let probe = col.prepare_probe(&KeyValue::Int32(6)).unwrap();
        assert_eq!(col.compare_block_to_probe(2, &probe), Ordering::Equal);
        assert_eq!(col.compare_block_to_probe(3, &probe), Ordering::Less);
    }

    #[test]
    fn copying_between_storage_kinds_is_refused() {
        let ints = KeyValues::Int32(vec![1, 2]);
        let dates = KeyValues::Date(vec![1, 2]);
        let mut text = KeyValues::with_capacity(KeyType::Utf8, 4, 2).unwrap();
        let err = text.push_from(&ints, 0).unwrap_err();
        assert!(matches!(err, Error::Internal(_)), "{err:?}");
        assert_eq!(text.len(), 0);

        let mut same = KeyValues::with_capacity(KeyType::Int32, 4, 2).unwrap();
        assert!(same.push_from(&dates, 1).is_err());
        same.push_from(&ints, 1).unwrap();
        assert_eq!(same, KeyValues::Int32(vec![2]));
    }

    #[test]
    fn compact_and_release() {
        let mut col = int_column(&[1, 2, 3, 4]);
        col.move_slot(1, 3);
        col.compact(2);
        assert_eq!(col.len(), 2);
        assert_eq!(col.fill(1), Some(KeyValue::Int32(4)));
        assert_eq!(col.fill(2), None);

        col.make_offset_array(2).unwrap().copy_from_slice(&[0, 1, 4]);
        col.release();
        col.release();
        assert!(col.is_empty());
        assert!(col.offsets().is_none());
    }
}
