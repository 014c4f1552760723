use super::{
    value::ColumnValue,
    Data,
    DataKind,
    DataRef,
};
use crate::{
    types::DataType,
    vector::Vector,
    Error,
    Result,
};
use std::sync::{
    Arc,
    OnceLock,
};

/// Dictionary-encoded payload: integer keys into a shared value vector.
///
/// The header of a dictionary `Data` mirrors its indices (length, validity,
/// null count); the dictionary itself is never sliced.
#[derive(Debug, Clone)]
pub struct DictionaryData {
    indices: DataRef,
    dictionary: Vector,
}

impl DictionaryData {
    pub(crate) fn new(indices: DataRef, dictionary: Vector) -> Self {
        Self { indices, dictionary }
    }

    pub fn indices(&self) -> &DataRef {
        &self.indices
    }

    pub fn dictionary(&self) -> &Vector {
        &self.dictionary
    }

    /// Key stored at row `index`, or `None` for a null row
    pub fn key(&self, index: usize) -> Option<usize> {
        if !self.indices.is_valid(index) {
            return None;
        }
        match self.indices.kind() {
            DataKind::Flat(flat) => flat.key(self.indices.data_type(), index),
            _ => self.indices.value(index).and_then(|value| value.as_key()),
        }
    }

    pub(crate) fn value(&self, index: usize) -> ColumnValue {
        self.key(index)
            .and_then(|key| self.dictionary.get(key))
            .unwrap_or(ColumnValue::Null)
    }

    pub(crate) fn slice(
        &self,
        data_type: &DataType,
        offset: usize,
        length: usize,
    ) -> Result<Data> {
        let indices = Arc::new(self.indices.slice(offset, length)?);
        Ok(dictionary_header(
            data_type.clone(),
            DictionaryData::new(indices, self.dictionary.clone()),
        ))
    }

    pub(crate) fn retype(&self, data_type: &DataType) -> Result<Self> {
        let DataType::Dictionary { index_type, value_type } = data_type else {
            return Err(Error::TypeMismatch {
                expected: "Dictionary".to_string(),
                actual: data_type.name(),
            });
        };
        if index_type.as_ref() != self.indices.data_type() {
            return Err(Error::TypeMismatch {
                expected: self.indices.data_type().name(),
                actual: index_type.name(),
            });
        }
        let dictionary = Vector::new(
            self.dictionary.data().clone_with_type(value_type.as_ref().clone())?,
        );
        Ok(Self { indices: self.indices.clone(), dictionary })
    }
}

fn dictionary_header(data_type: DataType, dictionary: DictionaryData) -> Data {
    Data {
        data_type,
        length: dictionary.indices.len(),
        offset: 0,
        null_count: OnceLock::new(),
        validity: None,
        kind: DataKind::Dictionary(dictionary),
    }
}

impl Data {
    /// Dictionary header over already type-checked parts
    pub(crate) fn dictionary_unchecked(
        data_type: DataType,
        indices: DataRef,
        dictionary: Vector,
    ) -> Data {
        dictionary_header(data_type, DictionaryData::new(indices, dictionary))
    }

    /// Dictionary column from integer `indices` into `dictionary`
    pub fn new_dictionary(
        data_type: DataType,
        indices: DataRef,
        dictionary: Vector,
    ) -> Result<Data> {
        let DataType::Dictionary { index_type, value_type } = &data_type else {
            return Err(Error::TypeMismatch {
                expected: "Dictionary".to_string(),
                actual: data_type.name(),
            });
        };
        if !index_type.is_integer() {
            return Err(Error::TypeMismatch {
                expected: "integer index type".to_string(),
                actual: index_type.name(),
            });
        }
        if index_type.as_ref() != indices.data_type() {
            return Err(Error::TypeMismatch {
                expected: index_type.name(),
                actual: indices.data_type().name(),
            });
        }
        if value_type.as_ref() != dictionary.data_type() {
            return Err(Error::TypeMismatch {
                expected: value_type.name(),
                actual: dictionary.data_type().name(),
            });
        }

        Ok(dictionary_header(data_type, DictionaryData::new(indices, dictionary)))
    }
}
