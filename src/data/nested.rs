use super::{
    value::ColumnValue,
    Data,
    DataKind,
    DataRef,
};
use crate::{
    types::DataType,
    Error,
    Result,
};
use bytes::Bytes;

/// Struct payload: one child per field, each aligned to the parent's rows
#[derive(Debug, Clone)]
pub struct NestedData {
    children: Vec<DataRef>,
}

impl NestedData {
    pub(crate) fn new(children: Vec<DataRef>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[DataRef] {
        &self.children
    }

    pub(crate) fn slice(&self, offset: usize, length: usize) -> Result<Self> {
        let children = self
            .children
            .iter()
            .map(|child| child.slice(offset, length).map(DataRef::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { children })
    }

    pub(crate) fn value(&self, index: usize) -> ColumnValue {
        ColumnValue::Struct(
            self.children
                .iter()
                .map(|child| child.value(index).unwrap_or(ColumnValue::Null))
                .collect(),
        )
    }
}

pub(super) fn check_children(
    data_type: &DataType,
    children: &[DataRef],
    min_length: Option<usize>,
) -> Result<()> {
    let fields = data_type.children();
    if fields.len() != children.len() {
        return Err(Error::Validation(format!(
            "{} has {} fields but {} children",
            data_type.name(),
            fields.len(),
            children.len()
        )));
    }
    for (field, child) in fields.iter().zip(children) {
        if field.data_type() != child.data_type() {
            return Err(Error::TypeMismatch {
                expected: field.data_type().name(),
                actual: child.data_type().name(),
            });
        }
        if let Some(length) = min_length {
            if child.len() < length {
                return Err(Error::Validation(format!(
                    "Child '{}' has {} rows, parent has {}",
                    field.name(),
                    child.len(),
                    length
                )));
            }
        }
    }
    Ok(())
}

impl Data {
    /// Struct column from one child per field
    pub fn new_struct(
        data_type: DataType,
        length: usize,
        children: Vec<DataRef>,
        validity: Option<Bytes>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        if !matches!(data_type, DataType::Struct { .. }) {
            return Err(Error::TypeMismatch {
                expected: "Struct".to_string(),
                actual: data_type.name(),
            });
        }
        check_children(&data_type, &children, Some(length))?;

        Data::from_parts(
            data_type,
            length,
            0,
            validity,
            null_count,
            DataKind::Struct(NestedData::new(children)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use std::sync::Arc;

    fn point_type() -> DataType {
        DataType::struct_(vec![
            Field::new("x", DataType::int32()),
            Field::new("label", DataType::utf8()),
        ])
    }

    fn points() -> Data {
        Data::new_struct(
            point_type(),
            3,
            vec![
                Arc::new(Data::from_values(&[1i32, 2, 3])),
                Arc::new(Data::from_strings(&["a", "b", "c"]).unwrap()),
            ],
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_struct_value() {
        let data = points();
        assert_eq!(
            data.value(1),
            Some(ColumnValue::Struct(vec![2.into(), "b".into()]))
        );
    }

    #[test]
    fn test_struct_slice_slices_children() {
        let sliced = points().slice(1, 2).unwrap();
        match sliced.kind() {
            DataKind::Struct(nested) => {
                for child in nested.children() {
                    assert_eq!(child.len(), 2);
                }
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(
            sliced.value(1),
            Some(ColumnValue::Struct(vec![3.into(), "c".into()]))
        );
    }

    #[test]
    fn test_struct_child_type_checked() {
        let result = Data::new_struct(
            point_type(),
            1,
            vec![
                Arc::new(Data::from_values(&[1i64])),
                Arc::new(Data::from_strings(&["a"]).unwrap()),
            ],
            None,
            None,
        );
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }
}
