use super::{
    native::read_native,
    nested::check_children,
    value::ColumnValue,
    Data,
    DataKind,
    DataRef,
};
use crate::{
    types::{
        DataType,
        UnionMode,
    },
    Error,
    Result,
};
use bytes::Bytes;

/// Union payload.
///
/// Sparse unions keep every child aligned to the parent's rows; dense unions
/// carry a per-row offset into the selected child.
#[derive(Debug, Clone)]
pub struct UnionData {
    type_ids: Bytes,
    value_offsets: Option<Bytes>,
    children: Vec<DataRef>,
}

impl UnionData {
    pub(crate) fn new(
        type_ids: Bytes,
        value_offsets: Option<Bytes>,
        children: Vec<DataRef>,
    ) -> Self {
        Self { type_ids, value_offsets, children }
    }

    /// One `i8` type id per row of this window
    pub fn type_ids(&self) -> &Bytes {
        &self.type_ids
    }

    /// Dense-mode `i32` offsets, one per row of this window
    pub fn value_offsets(&self) -> Option<&Bytes> {
        self.value_offsets.as_ref()
    }

    pub fn children(&self) -> &[DataRef] {
        &self.children
    }

    pub fn type_id(&self, index: usize) -> i8 {
        self.type_ids[index] as i8
    }

    pub(crate) fn slice(&self, offset: usize, length: usize) -> Result<Self> {
        let type_ids = self.type_ids.slice(offset..offset + length);
        match &self.value_offsets {
            Some(offsets) => Ok(Self {
                type_ids,
                value_offsets: Some(offsets.slice(offset * 4..(offset + length) * 4)),
                children: self.children.clone(),
            }),
            None => {
                let children = self
                    .children
                    .iter()
                    .map(|child| child.slice(offset, length).map(DataRef::new))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self { type_ids, value_offsets: None, children })
            }
        }
    }

    pub(crate) fn value(&self, data_type: &DataType, index: usize) -> ColumnValue {
        let DataType::Union { type_ids, .. } = data_type else {
            return ColumnValue::Null;
        };
        let type_id = self.type_id(index);
        let Some(child) = type_ids
            .iter()
            .position(|id| *id == type_id)
            .and_then(|position| self.children.get(position))
        else {
            return ColumnValue::Null;
        };
        let row = match &self.value_offsets {
            Some(offsets) => read_native::<i32>(offsets, index) as usize,
            None => index,
        };
        child.value(row).unwrap_or(ColumnValue::Null)
    }
}

impl Data {
    /// Union column. Dense unions require `value_offsets`, sparse unions
    /// must not carry them.
    pub fn new_union(
        data_type: DataType,
        length: usize,
        type_ids: Bytes,
        value_offsets: Option<Bytes>,
        children: Vec<DataRef>,
        validity: Option<Bytes>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        let DataType::Union { mode, type_ids: declared, .. } = &data_type else {
            return Err(Error::TypeMismatch {
                expected: "Union".to_string(),
                actual: data_type.name(),
            });
        };
        if type_ids.len() < length {
            return Err(Error::Validation(format!(
                "Union needs {} type ids, have {}",
                length,
                type_ids.len()
            )));
        }

        match (mode, &value_offsets) {
            (UnionMode::Dense, Some(offsets)) => {
                if offsets.len() < length * 4 {
                    return Err(Error::Validation(format!(
                        "Dense union needs {} offset bytes, have {}",
                        length * 4,
                        offsets.len()
                    )));
                }
                check_children(&data_type, &children, None)?;
            }
            (UnionMode::Sparse, None) => {
                check_children(&data_type, &children, Some(length))?;
            }
            (UnionMode::Dense, None) => {
                return Err(Error::Validation(
                    "Dense union requires value offsets".to_string(),
                ))
            }
            (UnionMode::Sparse, Some(_)) => {
                return Err(Error::Validation(
                    "Sparse union must not carry value offsets".to_string(),
                ))
            }
        }

        for index in 0..length {
            let type_id = type_ids[index] as i8;
            let Some(position) = declared.iter().position(|id| *id == type_id)
            else {
                return Err(Error::Validation(format!(
                    "Unknown union type id {} at row {}",
                    type_id, index
                )));
            };
            if let Some(offsets) = &value_offsets {
                let row = read_native::<i32>(offsets, index);
                if row < 0 || row as usize >= children[position].len() {
                    return Err(Error::Validation(format!(
                        "Dense union offset {} out of range at row {}",
                        row, index
                    )));
                }
            }
        }

        let kind = DataKind::Union(UnionData::new(type_ids, value_offsets, children));
        Data::from_parts(data_type, length, 0, validity, null_count, kind)
    }
}
