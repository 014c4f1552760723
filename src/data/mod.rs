//! # Column Chunk Storage
//!
//! A [`Data`] is the backing storage of one column chunk. It is a common
//! header (type, length, offset, lazily computed null count, validity
//! bitmap) plus one [`DataKind`] payload per physical layout.
//!
//! ## Windows and sharing
//!
//! Buffers are [`bytes::Bytes`], so every slice and clone shares memory with
//! its parent. A `Data` never mutates a buffer after construction; the only
//! write is the one-time memoization of the null count.
//!
//! The header `offset` is the absolute bit position of row 0 in the validity
//! bitmap (and, for booleans, in the value bitmap). Structural buffers are
//! narrowed when slicing:
//!
//! | Kind | On `slice` |
//! |------|-----------|
//! | `Flat` | value bytes narrowed to the window |
//! | `Bool` | nothing copied or narrowed, bits addressed through `offset` |
//! | `FlatList`, `List` | offsets narrowed (keeping the trailing entry), values shared |
//! | `Struct` | every child sliced to the same window |
//! | `Union` | type ids narrowed; dense offsets narrowed, or sparse children sliced |
//! | `Dictionary` | indices sliced, dictionary shared by reference |
//! | `Chunked` | only boundary-overlapping chunks sliced |

pub mod builder;
pub mod dictionary;
pub mod flat;
pub mod list;
pub mod native;
pub mod nested;
pub mod union;
pub mod value;

pub use dictionary::DictionaryData;
pub use flat::{
    BoolData,
    FlatData,
};
pub use list::{
    FlatListData,
    ListData,
    OffsetBuffer,
};
pub use native::NativeType;
pub use nested::NestedData;
pub use union::UnionData;
pub use value::ColumnValue;

use crate::{
    bit,
    chunked::{
        ChunkedData,
        ChunkedView,
    },
    types::{
        DataType,
        TypeCode,
        UnionMode,
    },
    vector::Vector,
    Error,
    Result,
};
use bytes::Bytes;
use std::sync::{
    Arc,
    OnceLock,
};

/// Reference to shared column storage
pub type DataRef = Arc<Data>;

/// One column chunk: shared header plus a layout-specific payload
#[derive(Debug, Clone)]
pub struct Data {
    data_type: DataType,
    length: usize,
    offset: usize,
    null_count: OnceLock<usize>,
    validity: Option<Bytes>,
    kind: DataKind,
}

/// Layout-specific buffers of a [`Data`]
#[derive(Debug, Clone)]
pub enum DataKind {
    /// Every row is null; no buffers
    Null,
    Flat(FlatData),
    Bool(BoolData),
    FlatList(FlatListData),
    Dictionary(DictionaryData),
    Struct(NestedData),
    List(ListData),
    Union(UnionData),
    Chunked(ChunkedData),
}

impl Data {
    pub(crate) fn from_parts(
        data_type: DataType,
        length: usize,
        offset: usize,
        validity: Option<Bytes>,
        null_count: Option<usize>,
        kind: DataKind,
    ) -> Result<Self> {
        if let Some(bitmap) = &validity {
            let needed = bit::bytes_for_bits(offset + length);
            if bitmap.len() < needed {
                return Err(Error::Validation(format!(
                    "Validity bitmap too short: need {} bytes for {} rows at offset {}, have {}",
                    needed,
                    length,
                    offset,
                    bitmap.len()
                )));
            }
        }
        if let Some(count) = null_count {
            if count > length {
                return Err(Error::Validation(format!(
                    "Null count {} exceeds length {}",
                    count, length
                )));
            }
        }

        Ok(Self {
            data_type,
            length,
            offset,
            null_count: null_count.map(OnceLock::from).unwrap_or_default(),
            validity,
            kind,
        })
    }

    /// An all-null column of `length` rows
    pub fn new_null(length: usize) -> Self {
        Self {
            data_type: DataType::null(),
            length,
            offset: 0,
            null_count: OnceLock::from(length),
            validity: None,
            kind: DataKind::Null,
        }
    }

    /// A zero-length column of any type
    pub fn empty(data_type: &DataType) -> Self {
        let kind = match data_type {
            DataType::Simple(TypeCode::Null) => DataKind::Null,
            DataType::Simple(TypeCode::Bool) => {
                DataKind::Bool(BoolData::new(Bytes::new()))
            }
            DataType::Simple(TypeCode::Utf8)
            | DataType::Simple(TypeCode::Binary) => DataKind::FlatList(
                FlatListData::new(OffsetBuffer::zero(), Bytes::new()),
            ),
            DataType::List { item_type } => DataKind::List(ListData::new(
                OffsetBuffer::zero(),
                Arc::new(Data::empty(item_type)),
            )),
            DataType::Struct { fields } => {
                DataKind::Struct(NestedData::new(empty_children(fields)))
            }
            DataType::Union { mode, fields, .. } => {
                let value_offsets = match mode {
                    UnionMode::Dense => Some(Bytes::new()),
                    UnionMode::Sparse => None,
                };
                DataKind::Union(UnionData::new(
                    Bytes::new(),
                    value_offsets,
                    empty_children(fields),
                ))
            }
            DataType::Dictionary { index_type, value_type } => {
                DataKind::Dictionary(DictionaryData::new(
                    Arc::new(Data::empty(index_type)),
                    Vector::new(Data::empty(value_type)),
                ))
            }
            _ => DataKind::Flat(FlatData::new(Bytes::new())),
        };

        Self {
            data_type: data_type.clone(),
            length: 0,
            offset: 0,
            null_count: OnceLock::from(0),
            validity: None,
            kind,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Number of rows in this window
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Absolute bit offset of row 0 in the validity bitmap
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> &DataKind {
        &self.kind
    }

    /// The validity bitmap, if any. Dictionary columns report their indices'
    /// bitmap; chunked columns have none of their own.
    pub fn null_bitmap(&self) -> Option<&Bytes> {
        match &self.kind {
            DataKind::Dictionary(dictionary) => {
                dictionary.indices().null_bitmap()
            }
            _ => self.validity.as_ref(),
        }
    }

    /// Number of null rows in this window.
    ///
    /// Computed from the validity bitmap on first use and cached; dictionary
    /// columns always answer from their indices.
    pub fn null_count(&self) -> usize {
        if let DataKind::Dictionary(dictionary) = &self.kind {
            return dictionary.indices().null_count();
        }
        *self.null_count.get_or_init(|| self.compute_null_count())
    }

    fn compute_null_count(&self) -> usize {
        match &self.kind {
            DataKind::Null => self.length,
            DataKind::Chunked(chunked) => {
                chunked.chunks().iter().map(|chunk| chunk.null_count()).sum()
            }
            _ => match &self.validity {
                Some(bitmap) => {
                    self.length
                        - bit::popcnt_bit_range(
                            bitmap,
                            self.offset,
                            self.offset + self.length,
                        )
                }
                None => 0,
            },
        }
    }

    /// Whether row `index` holds a value. Out-of-range rows are not valid.
    pub fn is_valid(&self, index: usize) -> bool {
        if index >= self.length {
            return false;
        }
        match &self.kind {
            DataKind::Null => false,
            DataKind::Dictionary(dictionary) => {
                dictionary.indices().is_valid(index)
            }
            DataKind::Chunked(chunked) => chunked.view().is_valid(index),
            _ => match &self.validity {
                Some(bitmap) => bit::get_bool(bitmap, self.offset + index),
                None => true,
            },
        }
    }

    /// Decode row `index`.
    ///
    /// Returns `None` past the end and `Some(ColumnValue::Null)` for null rows.
    pub fn value(&self, index: usize) -> Option<ColumnValue> {
        if let DataKind::Chunked(chunked) = &self.kind {
            return chunked.view().get(index);
        }
        if index >= self.length {
            return None;
        }
        if !self.is_valid(index) {
            return Some(ColumnValue::Null);
        }

        let value = match &self.kind {
            DataKind::Null => ColumnValue::Null,
            DataKind::Flat(flat) => flat.value(&self.data_type, index),
            DataKind::Bool(bools) => {
                ColumnValue::Bool(bools.value(self.offset + index))
            }
            DataKind::FlatList(list) => list.value(&self.data_type, index),
            DataKind::List(list) => list.value(index),
            DataKind::Struct(nested) => nested.value(index),
            DataKind::Union(union) => union.value(&self.data_type, index),
            DataKind::Dictionary(dictionary) => dictionary.value(index),
            DataKind::Chunked(_) => return None,
        };
        Some(value)
    }

    /// Zero-copy window of `length` rows starting at `offset`.
    ///
    /// A zero `length` returns the column unchanged. The window's null count
    /// is recomputed on demand unless the parent is known to be all-valid.
    pub fn slice(&self, offset: usize, length: usize) -> Result<Data> {
        if length == 0 {
            return Ok(self.clone());
        }
        if offset.checked_add(length).map_or(true, |end| end > self.length) {
            return Err(Error::InvalidArgument(format!(
                "Slice out of bounds: begin={}, len={}, size={}",
                offset, length, self.length
            )));
        }

        let null_count = match self.null_count.get() {
            Some(0) => Some(0),
            _ => None,
        };

        let kind = match &self.kind {
            DataKind::Dictionary(dictionary) => {
                return dictionary.slice(&self.data_type, offset, length);
            }
            DataKind::Chunked(chunked) => {
                return Data::from_parts(
                    self.data_type.clone(),
                    length,
                    0,
                    None,
                    None,
                    DataKind::Chunked(chunked.slice(offset, length)?),
                );
            }
            DataKind::Null => DataKind::Null,
            DataKind::Flat(flat) => {
                let width = self.data_type.byte_width().unwrap_or(0);
                DataKind::Flat(flat.slice(width, offset, length))
            }
            DataKind::Bool(bools) => DataKind::Bool(bools.clone()),
            DataKind::FlatList(list) => {
                DataKind::FlatList(list.slice(offset, length))
            }
            DataKind::List(list) => DataKind::List(list.slice(offset, length)),
            DataKind::Struct(nested) => {
                DataKind::Struct(nested.slice(offset, length)?)
            }
            DataKind::Union(union) => {
                DataKind::Union(union.slice(offset, length)?)
            }
        };

        Data::from_parts(
            self.data_type.clone(),
            length,
            self.offset + offset,
            self.validity.clone(),
            null_count,
            kind,
        )
    }

    /// Same buffers and window, viewed as another layout-compatible type.
    ///
    /// Dictionary columns retype their shared dictionary; chunked columns
    /// retype every chunk. The variant of the result always matches `self`.
    pub fn clone_with_type(&self, data_type: DataType) -> Result<Data> {
        let kind = match &self.kind {
            DataKind::Dictionary(dictionary) => {
                DataKind::Dictionary(dictionary.retype(&data_type)?)
            }
            DataKind::Chunked(chunked) => {
                DataKind::Chunked(chunked.retype(&data_type)?)
            }
            other => {
                if !same_layout(&self.data_type, &data_type) {
                    return Err(Error::TypeMismatch {
                        expected: self.data_type.name(),
                        actual: data_type.name(),
                    });
                }
                other.clone()
            }
        };

        Ok(Data {
            data_type,
            length: self.length,
            offset: self.offset,
            null_count: self.null_count.clone(),
            validity: self.validity.clone(),
            kind,
        })
    }

    /// Retyped copy with an optional new window and null count.
    ///
    /// `offset` and `length` are relative to this column and narrow it the
    /// way [`Data::slice`] does. A given `null_count` replaces the lazily
    /// computed one.
    pub fn clone_with(
        &self,
        data_type: DataType,
        length: Option<usize>,
        offset: Option<usize>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        let retyped = self.clone_with_type(data_type)?;
        let mut data = match (offset, length) {
            (None, None) => retyped,
            _ => {
                let offset = offset.unwrap_or(0);
                let length =
                    length.unwrap_or_else(|| retyped.length.saturating_sub(offset));
                retyped.slice(offset, length)?
            }
        };
        if let Some(count) = null_count {
            if count > data.length {
                return Err(Error::Validation(format!(
                    "Null count {} exceeds length {}",
                    count, data.length
                )));
            }
            data.null_count = OnceLock::from(count);
        }
        Ok(data)
    }
}

fn empty_children(fields: &[crate::schema::Field]) -> Vec<DataRef> {
    fields
        .iter()
        .map(|field| Arc::new(Data::empty(field.data_type())))
        .collect()
}

/// Whether data laid out for `a` can be read as `b`.
pub(crate) fn same_layout(a: &DataType, b: &DataType) -> bool {
    match (a.byte_width(), b.byte_width()) {
        (Some(x), Some(y)) => x == y,
        (None, None) => match (a, b) {
            (
                DataType::List { item_type: x },
                DataType::List { item_type: y },
            ) => same_layout(x, y),
            (DataType::Struct { fields: x }, DataType::Struct { fields: y }) => {
                x.len() == y.len()
                    && x.iter().zip(y.iter()).all(|(fx, fy)| {
                        same_layout(fx.data_type(), fy.data_type())
                    })
            }
            (
                DataType::Union { mode: mx, fields: x, .. },
                DataType::Union { mode: my, fields: y, .. },
            ) => {
                mx == my
                    && x.len() == y.len()
                    && x.iter().zip(y.iter()).all(|(fx, fy)| {
                        same_layout(fx.data_type(), fy.data_type())
                    })
            }
            _ => matches!(
                (a.code(), b.code()),
                (
                    TypeCode::Utf8 | TypeCode::Binary,
                    TypeCode::Utf8 | TypeCode::Binary
                ) | (TypeCode::Bool, TypeCode::Bool)
                    | (TypeCode::Null, TypeCode::Null)
            ),
        },
        _ => false,
    }
}

/// Chunked columns expose their addressing view
impl Data {
    pub fn chunked_view(&self) -> Option<ChunkedView<'_>> {
        match &self.kind {
            DataKind::Chunked(chunked) => Some(chunked.view()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::pack_bools;

    fn nullable_ints() -> Data {
        Data::from_options(&[
            Some(1i32),
            None,
            Some(3),
            Some(4),
            None,
            Some(6),
            Some(7),
            Some(8),
            None,
            Some(10),
        ])
    }

    #[test]
    fn test_null_count_is_lazy_and_cached() {
        let validity = pack_bools([true, false, true, false]);
        let values = native::encode_native(&[1i32, 0, 3, 0]).freeze();
        let data = Data::new_flat(
            DataType::int32(),
            4,
            values,
            Some(validity),
            None,
        )
        .unwrap();

        assert!(data.null_count.get().is_none());
        assert_eq!(data.null_count(), 2);
        assert_eq!(data.null_count.get(), Some(&2));
    }

    #[test]
    fn test_slice_resets_null_count() {
        let data = nullable_ints();
        assert_eq!(data.null_count(), 3);

        let sliced = data.slice(2, 4).unwrap();
        assert_eq!(sliced.len(), 4);
        assert_eq!(sliced.offset(), 2);
        assert!(sliced.null_count.get().is_none());
        assert_eq!(sliced.null_count(), 1);
        assert_eq!(sliced.value(0), Some(ColumnValue::Int(3)));
        assert_eq!(sliced.value(2), Some(ColumnValue::Null));
    }

    #[test]
    fn test_slice_of_all_valid_keeps_zero_null_count() {
        let data = Data::from_values(&[1i64, 2, 3, 4]);
        assert_eq!(data.null_count(), 0);
        let sliced = data.slice(1, 2).unwrap();
        assert_eq!(sliced.null_count.get(), Some(&0));
    }

    #[test]
    fn test_zero_length_slice_is_noop() {
        let data = nullable_ints();
        let same = data.slice(5, 0).unwrap();
        assert_eq!(same.len(), data.len());
        assert_eq!(same.offset(), data.offset());
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let data = nullable_ints();
        assert!(matches!(
            data.slice(8, 5),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_nested_slice_windows_compose() {
        let data = nullable_ints();
        let outer = data.slice(1, 8).unwrap();
        let inner = outer.slice(2, 3).unwrap();
        assert_eq!(inner.offset(), 3);
        let values: Vec<ColumnValue> =
            (0..3).filter_map(|i| inner.value(i)).collect();
        assert_eq!(
            values,
            vec![ColumnValue::Int(4), ColumnValue::Null, ColumnValue::Int(6)]
        );
    }

    #[test]
    fn test_value_out_of_range() {
        let data = Data::from_values(&[1u8]);
        assert_eq!(data.value(1), None);
        assert!(!data.is_valid(1));
    }

    #[test]
    fn test_null_data() {
        let data = Data::new_null(3);
        assert_eq!(data.null_count(), 3);
        assert_eq!(data.value(2), Some(ColumnValue::Null));
        assert_eq!(data.slice(1, 2).unwrap().null_count(), 2);
    }

    #[test]
    fn test_empty_data_for_every_layout() {
        let types = vec![
            DataType::int32(),
            DataType::bool(),
            DataType::utf8(),
            DataType::list(DataType::int8()),
            DataType::dictionary(DataType::int32(), DataType::utf8()),
            DataType::struct_(vec![crate::schema::Field::new(
                "a",
                DataType::float64(),
            )]),
            DataType::dense_union(vec![crate::schema::Field::new(
                "a",
                DataType::int64(),
            )])
            .unwrap(),
        ];
        for data_type in types {
            let data = Data::empty(&data_type);
            assert_eq!(data.len(), 0, "{}", data_type);
            assert_eq!(data.null_count(), 0);
            assert_eq!(data.value(0), None);
            assert_eq!(data.data_type(), &data_type);
        }
    }

    #[test]
    fn test_clone_with_type_preserves_variant() {
        let data = Data::from_values(&[1i32, -1]);
        let retyped = data.clone_with_type(DataType::uint32()).unwrap();
        assert!(matches!(retyped.kind(), DataKind::Flat(_)));
        assert_eq!(retyped.value(1), Some(ColumnValue::UInt(u32::MAX as u64)));

        assert!(matches!(
            data.clone_with_type(DataType::int64()),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_clone_with_window_and_null_count() {
        let data = Data::from_options(&[Some(1i32), None, Some(3), None]);
        let clone = data
            .clone_with(DataType::uint32(), Some(2), Some(1), None)
            .unwrap();
        assert!(matches!(clone.kind(), DataKind::Flat(_)));
        assert_eq!(clone.len(), 2);
        assert_eq!(clone.value(0), Some(ColumnValue::Null));
        assert_eq!(clone.value(1), Some(ColumnValue::UInt(3)));
        assert_eq!(clone.null_count(), 1);

        let tail = data.clone_with(DataType::int32(), None, Some(2), Some(1)).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.null_count(), 1);

        assert!(matches!(
            data.clone_with(DataType::int32(), Some(1), None, Some(2)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            data.clone_with(DataType::int32(), Some(3), Some(2), None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validity_bitmap_too_short() {
        let values = native::encode_native(&[0i32; 16]).freeze();
        let result = Data::new_flat(
            DataType::int32(),
            16,
            values,
            Some(Bytes::from_static(&[0xFF])),
            None,
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
