use super::{
    native::{
        encode_native,
        read_native,
    },
    value::ColumnValue,
    Data,
    DataKind,
    DataRef,
};
use crate::{
    types::{
        DataType,
        TypeCode,
    },
    Error,
    Result,
};
use bytes::Bytes;
use std::sync::Arc;

/// Little-endian `i32` offsets; row `i` spans `[get(i), get(i + 1))`
#[derive(Debug, Clone)]
pub struct OffsetBuffer {
    bytes: Bytes,
}

impl OffsetBuffer {
    /// Wrap raw offset bytes, checking that they are non-negative and
    /// non-decreasing
    pub fn new(bytes: Bytes) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::Validation(format!(
                "Offset buffer length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let mut previous = 0i32;
        for index in 0..bytes.len() / 4 {
            let offset = read_native::<i32>(&bytes, index);
            if offset < previous {
                return Err(Error::Validation(format!(
                    "Offsets must be non-negative and non-decreasing: \
                     offset[{}] = {} after {}",
                    index, offset, previous
                )));
            }
            previous = offset;
        }
        Ok(Self { bytes })
    }

    pub fn from_offsets(offsets: &[i32]) -> Result<Self> {
        Self::new(encode_native(offsets).freeze())
    }

    pub(crate) fn zero() -> Self {
        Self { bytes: encode_native(&[0i32]).freeze() }
    }

    /// Number of entries (rows + 1)
    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> usize {
        read_native::<i32>(&self.bytes, index) as usize
    }

    /// Value range of row `index`
    pub fn range(&self, index: usize) -> (usize, usize) {
        (self.get(index), self.get(index + 1))
    }

    pub fn last(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.get(self.len() - 1)
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Entries `[offset, offset + length]`, keeping the trailing entry
    pub(crate) fn slice(&self, offset: usize, length: usize) -> Self {
        Self { bytes: self.bytes.slice(offset * 4..(offset + length + 1) * 4) }
    }
}

fn check_offsets(
    data_type: &DataType,
    value_offsets: &OffsetBuffer,
    length: usize,
    values_len: usize,
) -> Result<()> {
    if value_offsets.len() < length + 1 {
        return Err(Error::Validation(format!(
            "{} needs {} offsets for {} rows, have {}",
            data_type.name(),
            length + 1,
            length,
            value_offsets.len()
        )));
    }
    if value_offsets.get(length) > values_len {
        return Err(Error::Validation(format!(
            "{} offsets reach {} but values hold {}",
            data_type.name(),
            value_offsets.get(length),
            values_len
        )));
    }
    Ok(())
}

/// Variable-width strings or binaries over one contiguous byte buffer
#[derive(Debug, Clone)]
pub struct FlatListData {
    value_offsets: OffsetBuffer,
    values: Bytes,
}

impl FlatListData {
    pub(crate) fn new(value_offsets: OffsetBuffer, values: Bytes) -> Self {
        Self { value_offsets, values }
    }

    pub fn value_offsets(&self) -> &OffsetBuffer {
        &self.value_offsets
    }

    pub fn values(&self) -> &Bytes {
        &self.values
    }

    /// Raw bytes of row `index`
    pub fn bytes_at(&self, index: usize) -> &[u8] {
        let (start, end) = self.value_offsets.range(index);
        &self.values[start..end]
    }

    pub(crate) fn slice(&self, offset: usize, length: usize) -> Self {
        Self {
            value_offsets: self.value_offsets.slice(offset, length),
            values: self.values.clone(),
        }
    }

    pub(crate) fn value(&self, data_type: &DataType, index: usize) -> ColumnValue {
        let bytes = self.bytes_at(index);
        match data_type.code() {
            TypeCode::Utf8 => {
                ColumnValue::Utf8(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => ColumnValue::Binary(bytes.to_vec()),
        }
    }
}

/// Variable-length lists over a child column
#[derive(Debug, Clone)]
pub struct ListData {
    value_offsets: OffsetBuffer,
    values: DataRef,
}

impl ListData {
    pub(crate) fn new(value_offsets: OffsetBuffer, values: DataRef) -> Self {
        Self { value_offsets, values }
    }

    pub fn value_offsets(&self) -> &OffsetBuffer {
        &self.value_offsets
    }

    /// The child column holding every list's elements
    pub fn values(&self) -> &DataRef {
        &self.values
    }

    pub(crate) fn slice(&self, offset: usize, length: usize) -> Self {
        Self {
            value_offsets: self.value_offsets.slice(offset, length),
            values: self.values.clone(),
        }
    }

    pub(crate) fn value(&self, index: usize) -> ColumnValue {
        let (start, end) = self.value_offsets.range(index);
        ColumnValue::List(
            (start..end)
                .map(|i| self.values.value(i).unwrap_or(ColumnValue::Null))
                .collect(),
        )
    }
}

impl Data {
    /// Utf8 or Binary column. Utf8 rows are checked to be valid UTF-8.
    pub fn new_flat_list(
        data_type: DataType,
        length: usize,
        value_offsets: OffsetBuffer,
        values: Bytes,
        validity: Option<Bytes>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        match data_type.code() {
            TypeCode::Utf8 | TypeCode::Binary => {}
            _ => {
                return Err(Error::TypeMismatch {
                    expected: "Utf8 or Binary".to_string(),
                    actual: data_type.name(),
                })
            }
        }
        check_offsets(&data_type, &value_offsets, length, values.len())?;

        let list = FlatListData::new(value_offsets, values);
        if data_type.code() == TypeCode::Utf8 {
            for index in 0..length {
                std::str::from_utf8(list.bytes_at(index))?;
            }
        }

        Data::from_parts(
            data_type,
            length,
            0,
            validity,
            null_count,
            DataKind::FlatList(list),
        )
    }

    /// List column whose elements live in `values`
    pub fn new_list(
        data_type: DataType,
        length: usize,
        value_offsets: OffsetBuffer,
        values: Data,
        validity: Option<Bytes>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        let DataType::List { item_type } = &data_type else {
            return Err(Error::TypeMismatch {
                expected: "List".to_string(),
                actual: data_type.name(),
            });
        };
        if item_type.as_ref() != values.data_type() {
            return Err(Error::TypeMismatch {
                expected: item_type.name(),
                actual: values.data_type().name(),
            });
        }
        check_offsets(&data_type, &value_offsets, length, values.len())?;

        Data::from_parts(
            data_type,
            length,
            0,
            validity,
            null_count,
            DataKind::List(ListData::new(value_offsets, Arc::new(values))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_must_be_monotone() {
        assert!(OffsetBuffer::from_offsets(&[0, 2, 5]).is_ok());
        assert!(matches!(
            OffsetBuffer::from_offsets(&[0, 3, 2]),
            Err(Error::Validation(_))
        ));
        assert!(OffsetBuffer::from_offsets(&[-1, 0]).is_err());
    }

    #[test]
    fn test_offset_slice_keeps_trailing_entry() {
        let offsets = OffsetBuffer::from_offsets(&[0, 1, 3, 6, 10]).unwrap();
        let sliced = offsets.slice(1, 2);
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.range(0), (1, 3));
        assert_eq!(sliced.range(1), (3, 6));
    }

    #[test]
    fn test_utf8_slice() {
        let data = Data::from_strings(&["a", "bb", "ccc", "dddd"]).unwrap();
        let sliced = data.slice(1, 2).unwrap();
        assert_eq!(sliced.value(0), Some(ColumnValue::from("bb")));
        assert_eq!(sliced.value(1), Some(ColumnValue::from("ccc")));
        assert_eq!(sliced.value(2), None);
        match sliced.kind() {
            DataKind::FlatList(list) => assert_eq!(list.values().len(), 10),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let offsets = OffsetBuffer::from_offsets(&[0, 2]).unwrap();
        let result = Data::new_flat_list(
            DataType::utf8(),
            1,
            offsets,
            Bytes::from_static(&[0xC3, 0x28]),
            None,
            None,
        );
        assert!(matches!(result, Err(Error::Utf8(_))));
    }

    #[test]
    fn test_offsets_past_values() {
        let offsets = OffsetBuffer::from_offsets(&[0, 4]).unwrap();
        let result = Data::new_flat_list(
            DataType::binary(),
            1,
            offsets,
            Bytes::from_static(b"ab"),
            None,
            None,
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_list_values_and_slice() {
        let values = Data::from_values(&[1i32, 2, 3, 4, 5, 6]);
        let offsets = OffsetBuffer::from_offsets(&[0, 2, 2, 6]).unwrap();
        let data = Data::new_list(
            DataType::list(DataType::int32()),
            3,
            offsets,
            values,
            None,
            None,
        )
        .unwrap();

        assert_eq!(data.value(1), Some(ColumnValue::List(vec![])));
        let sliced = data.slice(2, 1).unwrap();
        assert_eq!(
            sliced.value(0),
            Some(ColumnValue::List(vec![3.into(), 4.into(), 5.into(), 6.into()]))
        );
    }

    #[test]
    fn test_list_item_type_checked() {
        let offsets = OffsetBuffer::from_offsets(&[0, 1]).unwrap();
        let result = Data::new_list(
            DataType::list(DataType::utf8()),
            1,
            offsets,
            Data::from_values(&[1i32]),
            None,
            None,
        );
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }
}
