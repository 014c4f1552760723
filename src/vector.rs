//! # Vectors
//!
//! A [`Vector`] is the user-facing handle to one column: a cheap-to-clone
//! reference to shared [`Data`]. Reads dispatch on the data's layout, so the
//! same API serves flat, nested, dictionary and chunked columns.
//!
//! Vectors are immutable. [`Vector::set`] returns a new vector and leaves the
//! original untouched; on a chunked vector only the chunk holding the row is
//! rebuilt.

use crate::{
    data::{
        ColumnValue,
        Data,
        DataKind,
        DataRef,
        NativeType,
    },
    types::{
        DataType,
        ToType,
    },
    Error,
    Result,
};
use bytes::Bytes;
use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
};

/// Materialized column contents, see [`Vector::to_array`]
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    /// Little-endian fixed-width values, one slot per row (null slots
    /// included)
    Typed { data_type: DataType, values: Bytes },
    /// Decoded values, `ColumnValue::Null` for null rows
    Values(Vec<ColumnValue>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Typed { data_type, values } => {
                values.len() / data_type.byte_width().unwrap_or(1).max(1)
            }
            ArrayValues::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Vector {
    data: DataRef,
}

impl Vector {
    pub fn new(data: Data) -> Self {
        Self { data: Arc::new(data) }
    }

    pub fn from_data(data: DataRef) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &DataRef {
        &self.data
    }

    pub fn data_type(&self) -> &DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.data.is_valid(index)
    }

    /// Value at row `index`; `None` past the end
    pub fn get(&self, index: usize) -> Option<ColumnValue> {
        self.data.value(index)
    }

    /// Whether both handles share the same storage
    pub fn ptr_eq(&self, other: &Vector) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = ColumnValue> + '_> {
        match self.data.chunked_view() {
            Some(view) => Box::new(view.iter()),
            None => Box::new(
                (0..self.len())
                    .map(move |index| self.get(index).unwrap_or(ColumnValue::Null)),
            ),
        }
    }

    pub fn to_vec(&self) -> Vec<ColumnValue> {
        self.iter().collect()
    }

    /// Materialize the column. Flat columns hand out their value buffer
    /// without copying.
    pub fn to_array(&self) -> ArrayValues {
        match self.data.kind() {
            DataKind::Flat(flat) => ArrayValues::Typed {
                data_type: self.data_type().clone(),
                values: flat.values().clone(),
            },
            DataKind::Chunked(chunked) => chunked.view().to_array(),
            _ => ArrayValues::Values(self.to_vec()),
        }
    }

    /// Zero-copy window; a zero `length` returns the vector unchanged
    pub fn slice(&self, offset: usize, length: usize) -> Result<Vector> {
        if length == 0 {
            return Ok(self.clone());
        }
        Ok(Vector::new(self.data.slice(offset, length)?))
    }

    /// Copy of this vector with row `index` replaced by `value`
    pub fn set(&self, index: usize, value: impl Into<ColumnValue>) -> Result<Vector> {
        if index >= self.len() {
            return Err(Error::InvalidArgument(format!(
                "Index out of bounds: {} >= {}",
                index,
                self.len()
            )));
        }
        let value = value.into();

        if let DataKind::Chunked(chunked) = self.data.kind() {
            let (chunk, row) = chunked.view().locate(index).ok_or_else(|| {
                Error::InvalidArgument(format!("Index {} not in any chunk", index))
            })?;
            let mut chunks = chunked.chunks().to_vec();
            chunks[chunk] = chunks[chunk].set(row, value)?;
            return Ok(Vector::new(Data::new_chunked(
                self.data_type().clone(),
                chunks,
            )?));
        }

        let mut values = self.to_vec();
        values[index] = value;
        Vector::from_column_values(self.data_type(), &values)
    }

    /// First row at or after `from` whose value matches `value`.
    /// Null never matches.
    pub fn index_of(&self, value: &ColumnValue, from: usize) -> Option<usize> {
        if let Some(view) = self.data.chunked_view() {
            return view.index_of(value, from);
        }
        (from..self.len()).find(|index| {
            self.get(*index).is_some_and(|candidate| candidate.matches(value))
        })
    }

    /// Concatenate same-typed vectors into one chunked vector.
    ///
    /// A single input is returned as-is; chunked inputs are flattened.
    pub fn concat(vectors: &[Vector]) -> Result<Vector> {
        match vectors {
            [] => Err(Error::InvalidArgument(
                "Cannot concatenate zero vectors".to_string(),
            )),
            [single] => Ok(single.clone()),
            [first, ..] => Ok(Vector::new(Data::new_chunked(
                first.data_type().clone(),
                vectors.to_vec(),
            )?)),
        }
    }

    pub fn is_dictionary(&self) -> bool {
        self.data_type().is_dictionary()
    }

    /// The dictionary of a dictionary-encoded vector. Chunked vectors report
    /// the dictionary of their last chunk.
    pub fn dictionary(&self) -> Option<&Vector> {
        match self.data.kind() {
            DataKind::Dictionary(dictionary) => Some(dictionary.dictionary()),
            DataKind::Chunked(chunked) => chunked.chunks().last()?.dictionary(),
            _ => None,
        }
    }

    /// Integer keys of a dictionary-encoded vector
    pub fn indices(&self) -> Option<Vector> {
        match self.data.kind() {
            DataKind::Dictionary(dictionary) => {
                Some(Vector::from_data(dictionary.indices().clone()))
            }
            DataKind::Chunked(chunked) => {
                let indices = chunked
                    .chunks()
                    .iter()
                    .map(Vector::indices)
                    .collect::<Option<Vec<_>>>()?;
                Vector::concat(&indices).ok()
            }
            _ => None,
        }
    }

    /// Dictionary key at row `index`; `None` for null rows and for vectors
    /// that are not dictionary-encoded
    pub fn get_key(&self, index: usize) -> Option<usize> {
        match self.data.kind() {
            DataKind::Dictionary(dictionary) => dictionary.key(index),
            DataKind::Chunked(chunked) => chunked.view().get_key(index),
            _ => None,
        }
    }

    /// Key of the first dictionary entry matching `value`
    pub fn reverse_lookup(&self, value: &ColumnValue) -> Option<usize> {
        self.dictionary()?.index_of(value, 0)
    }

    /// Child column `index` of a struct, union or list vector
    pub fn get_child_at(&self, index: usize) -> Option<Vector> {
        match self.data.kind() {
            DataKind::Struct(nested) => {
                nested.children().get(index).cloned().map(Vector::from_data)
            }
            DataKind::Union(union) => {
                union.children().get(index).cloned().map(Vector::from_data)
            }
            DataKind::List(list) if index == 0 => {
                Some(Vector::from_data(list.values().clone()))
            }
            DataKind::Chunked(chunked) => chunked.child_at(index),
            _ => None,
        }
    }

    pub fn from_values<T: NativeType + ToType>(values: &[T]) -> Vector {
        Vector::new(Data::from_values(values))
    }

    pub fn from_options<T: NativeType + ToType + Default>(values: &[Option<T>]) -> Vector {
        Vector::new(Data::from_options(values))
    }

    pub fn from_bools(values: &[bool]) -> Vector {
        Vector::new(Data::from_bools(values))
    }

    pub fn from_opt_bools(values: &[Option<bool>]) -> Vector {
        Vector::new(Data::from_opt_bools(values))
    }

    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Result<Vector> {
        Data::from_strings(values).map(Vector::new)
    }

    pub fn from_opt_strings<S: AsRef<str>>(values: &[Option<S>]) -> Result<Vector> {
        Data::from_opt_strings(values).map(Vector::new)
    }

    pub fn from_column_values(
        data_type: &DataType,
        values: &[ColumnValue],
    ) -> Result<Vector> {
        Ok(Vector::new(Data::from_column_values(data_type, values)?))
    }

    /// Dictionary-encode strings with `Int32` keys, in first-seen order
    pub fn dictionary_from_strings<S: AsRef<str>>(values: &[Option<S>]) -> Result<Vector> {
        let mut unique: Vec<&str> = Vec::new();
        let mut unique_map: HashMap<&str, usize> = HashMap::new();
        let mut keys: Vec<Option<i32>> = Vec::with_capacity(values.len());
        for value in values {
            let Some(value): Option<&str> = value.as_ref().map(|s| s.as_ref()) else {
                keys.push(None);
                continue;
            };
            let key = *unique_map.entry(value).or_insert_with(|| {
                unique.push(value);
                unique.len() - 1
            });
            let key = i32::try_from(key).map_err(|_| {
                Error::InvalidArgument(format!(
                    "Dictionary of {} entries exceeds Int32 keys",
                    unique.len()
                ))
            })?;
            keys.push(Some(key));
        }

        Ok(Vector::new(Data::dictionary_unchecked(
            DataType::dictionary(DataType::int32(), DataType::utf8()),
            Arc::new(Data::from_options(&keys)),
            Vector::from_strings(&unique)?,
        )))
    }

    /// Dictionary vector from integer `indices` into `dictionary`
    pub fn new_dictionary(indices: &Vector, dictionary: Vector) -> Result<Vector> {
        let data_type = DataType::dictionary(
            indices.data_type().clone(),
            dictionary.data_type().clone(),
        );
        Ok(Vector::new(Data::new_dictionary(
            data_type,
            indices.data().clone(),
            dictionary,
        )?))
    }
}

impl From<Data> for Vector {
    fn from(data: Data) -> Self {
        Vector::new(data)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, value) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn test_get_and_validity() {
        let vector = Vector::from_options(&[Some(1.5f64), None]);
        assert_eq!(vector.get(0), Some(ColumnValue::Float(1.5)));
        assert_eq!(vector.get(1), Some(ColumnValue::Null));
        assert_eq!(vector.get(2), None);
        assert!(!vector.is_valid(1));
        assert_eq!(vector.to_string(), "[1.5, null]");
    }

    #[test]
    fn test_set_is_copy_on_write() {
        let vector = Vector::from_values(&[1i32, 2, 3]);
        let updated = vector.set(1, 20i32).unwrap();
        assert_eq!(vector.get(1), Some(ColumnValue::Int(2)));
        assert_eq!(updated.get(1), Some(ColumnValue::Int(20)));

        let nulled = vector.set(0, ColumnValue::Null).unwrap();
        assert_eq!(nulled.null_count(), 1);
        assert!(vector.set(3, 0i32).is_err());
    }

    #[test]
    fn test_set_on_chunked_rebuilds_one_chunk() {
        let chunks = vec![Vector::from_values(&[1i32, 2]), Vector::from_values(&[3i32])];
        let vector = Vector::concat(&chunks).unwrap();
        let updated = vector.set(2, 30i32).unwrap();
        assert_eq!(updated.to_vec(), vec![1.into(), 2.into(), 30.into()]);

        let DataKind::Chunked(chunked) = updated.data().kind() else {
            panic!("expected chunked");
        };
        assert!(chunked.chunks()[0].ptr_eq(&chunks[0]));
    }

    #[test]
    fn test_index_of() {
        let vector =
            Vector::from_opt_strings(&[Some("a"), None, Some("b"), Some("a")]).unwrap();
        assert_eq!(vector.index_of(&"a".into(), 0), Some(0));
        assert_eq!(vector.index_of(&"a".into(), 1), Some(3));
        assert_eq!(vector.index_of(&ColumnValue::Null, 0), None);
    }

    #[test]
    fn test_dictionary_accessors() {
        let vector =
            Vector::dictionary_from_strings(&[Some("x"), Some("y"), None, Some("x")]).unwrap();
        assert!(vector.is_dictionary());
        assert_eq!(vector.dictionary().unwrap().len(), 2);
        assert_eq!(vector.get_key(3), Some(0));
        assert_eq!(vector.get_key(2), None);
        assert_eq!(vector.reverse_lookup(&"y".into()), Some(1));
        assert_eq!(vector.reverse_lookup(&"z".into()), None);
        assert_eq!(
            vector.indices().unwrap().to_vec(),
            vec![0.into(), 1.into(), ColumnValue::Null, 0.into()]
        );
        assert_eq!(vector.get(3), Some(ColumnValue::from("x")));
    }

    #[test]
    fn test_dictionary_from_many_strings() {
        let labels: Vec<String> = (0..5_000).map(|n| format!("label-{}", n % 1_000)).collect();
        let values: Vec<Option<&str>> = labels.iter().map(|s| Some(s.as_str())).collect();
        let vector = Vector::dictionary_from_strings(&values).unwrap();
        assert_eq!(vector.dictionary().unwrap().len(), 1_000);
        assert_eq!(vector.get_key(1_234), Some(234));
        assert_eq!(vector.get(4_999), Some("label-999".into()));
    }

    #[test]
    fn test_new_dictionary_checks_index_type() {
        let result = Vector::new_dictionary(
            &Vector::from_strings(&["0"]).unwrap(),
            Vector::from_strings(&["a"]).unwrap(),
        );
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_concat() {
        assert!(Vector::concat(&[]).is_err());
        let a = Vector::from_values(&[1u8]);
        assert!(Vector::concat(std::slice::from_ref(&a)).unwrap().ptr_eq(&a));

        let b = Vector::from_values(&[2u8, 3]);
        let joined = Vector::concat(&[a.clone(), b]).unwrap();
        let nested = Vector::concat(&[joined.clone(), a]).unwrap();
        let DataKind::Chunked(chunked) = nested.data().kind() else {
            panic!("expected chunked");
        };
        assert_eq!(chunked.chunks().len(), 3);
        assert_eq!(nested.len(), 4);
        assert!(Vector::concat(&[joined, Vector::from_values(&[1i8])]).is_err());
    }

    #[test]
    fn test_chunked_child_is_memoized() {
        let data_type = DataType::struct_(vec![Field::new("a", DataType::int32())]);
        let chunk = |v: i32| {
            Vector::from_column_values(
                &data_type,
                &[ColumnValue::Struct(vec![v.into()])],
            )
            .unwrap()
        };
        let vector = Vector::concat(&[chunk(1), chunk(2)]).unwrap();

        let first = vector.get_child_at(0).unwrap();
        let second = vector.get_child_at(0).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(first.to_vec(), vec![1.into(), 2.into()]);
        assert!(vector.get_child_at(1).is_none());
    }

    #[test]
    fn test_to_array_flat_is_zero_copy() {
        let vector = Vector::from_values(&[1u32, 2, 3]).slice(1, 2).unwrap();
        let array = vector.to_array();
        assert_eq!(array.len(), 2);
        match array {
            ArrayValues::Typed { values, .. } => assert_eq!(values.len(), 8),
            other => panic!("expected typed array, got {:?}", other),
        }
    }
}
