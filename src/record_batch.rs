use crate::{
    data::{
        ColumnValue,
        Data,
        DataKind,
    },
    schema::{
        Field,
        Schema,
    },
    types::DataType,
    vector::Vector,
    Error,
    Result,
};
use std::sync::Arc;

/// A batch is a schema plus one vector per field, all with the same number
/// of rows
#[derive(Debug, Clone)]
pub struct RecordBatch {
    schema: Arc<Schema>,
    length: usize,
    columns: Vec<Vector>,
}

impl RecordBatch {
    /// Create a batch, checking that every column matches its field's type
    /// and that all columns have the same row count
    pub fn new(schema: Arc<Schema>, columns: Vec<Vector>) -> Result<Self> {
        let length = columns.first().map_or(0, Vector::len);
        Self::with_length(schema, length, columns)
    }

    /// Like [`RecordBatch::new`], with an explicit row count (the only way to
    /// give a column-less batch rows)
    pub fn with_length(
        schema: Arc<Schema>,
        length: usize,
        columns: Vec<Vector>,
    ) -> Result<Self> {
        if schema.len() != columns.len() {
            return Err(Error::SchemaMismatch(format!(
                "Schema has {} fields but batch has {} columns",
                schema.len(),
                columns.len()
            )));
        }

        for (field, column) in schema.fields().iter().zip(&columns) {
            if field.data_type() != column.data_type() {
                return Err(Error::TypeMismatch {
                    expected: field.data_type().name(),
                    actual: column.data_type().name(),
                });
            }
            if column.len() != length {
                return Err(Error::Validation(format!(
                    "All columns in batch must have same count of rows. Name: '{}', expected rows: {}, got: {}",
                    field.name(),
                    length,
                    column.len()
                )));
            }
        }

        Ok(Self { schema, length, columns })
    }

    /// Build a batch from named columns, deriving the schema from their types
    pub fn try_from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vector)>,
        S: Into<String>,
    {
        let (fields, columns): (Vec<Field>, Vec<Vector>) = columns
            .into_iter()
            .map(|(name, column)| {
                (Field::new(name, column.data_type().clone()), column)
            })
            .unzip();
        Self::new(Arc::new(Schema::new(fields)), columns)
    }

    /// Zero-row batch with one empty column per field
    pub fn empty(schema: Arc<Schema>) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|field| Vector::new(Data::empty(field.data_type())))
            .collect();
        Self { schema, length: 0, columns }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Get the number of rows in the batch
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn num_rows(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Get the number of columns in the batch
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Vector] {
        &self.columns
    }

    /// Get column by index
    pub fn get_child_at(&self, index: usize) -> Option<&Vector> {
        self.columns.get(index)
    }

    /// Get column name by index
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.schema.field(index).map(Field::name)
    }

    /// Get column by name
    pub fn column_by_name(&self, name: &str) -> Option<&Vector> {
        self.schema.index_of(name).and_then(|index| self.columns.get(index))
    }

    /// Values of row `index`, one per column
    pub fn get(&self, index: usize) -> Option<Vec<ColumnValue>> {
        if index >= self.length {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|column| column.get(index).unwrap_or(ColumnValue::Null))
                .collect(),
        )
    }

    /// Project onto the named columns in schema order; unknown names are
    /// ignored
    pub fn select(&self, names: &[&str]) -> RecordBatch {
        let indices = self.schema.select_indices(names);
        let columns = indices.iter().map(|index| self.columns[*index].clone()).collect();
        RecordBatch {
            schema: Arc::new(self.schema.select(names)),
            length: self.length,
            columns,
        }
    }

    pub fn slice(&self, offset: usize, length: usize) -> Result<RecordBatch> {
        if length == 0 {
            return Ok(self.clone());
        }
        if offset.checked_add(length).map_or(true, |end| end > self.length) {
            return Err(Error::InvalidArgument(format!(
                "Slice out of bounds: begin={}, len={}, size={}",
                offset, length, self.length
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|column| column.slice(offset, length))
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordBatch { schema: self.schema.clone(), length, columns })
    }

    /// Append `other`'s rows after this batch's, column by column
    pub fn concat(&self, other: &RecordBatch) -> Result<RecordBatch> {
        Self::concat_all(&self.schema, &[self.clone(), other.clone()])
    }

    /// Column-wise concatenation of batches sharing `schema`
    pub fn concat_all(schema: &Arc<Schema>, batches: &[RecordBatch]) -> Result<RecordBatch> {
        match batches {
            [] => Ok(RecordBatch::empty(schema.clone())),
            [single] => Ok(single.clone()),
            _ => {
                for batch in batches {
                    if batch.schema.as_ref() != schema.as_ref() {
                        return Err(Error::SchemaMismatch(format!(
                            "expected {}, got {}",
                            schema,
                            batch.schema
                        )));
                    }
                }
                let columns = (0..schema.len())
                    .map(|index| {
                        let parts: Vec<Vector> = batches
                            .iter()
                            .map(|batch| batch.columns[index].clone())
                            .collect();
                        Vector::concat(&parts)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let length = batches.iter().map(RecordBatch::len).sum();
                RecordBatch::with_length(schema.clone(), length, columns)
            }
        }
    }

    /// View this batch as one struct vector whose children are the columns
    pub fn to_struct(&self) -> Result<Vector> {
        let data_type = DataType::struct_(self.schema.fields().to_vec());
        let children = self.columns.iter().map(|column| column.data().clone()).collect();
        Ok(Vector::new(Data::new_struct(data_type, self.length, children, None, None)?))
    }

    /// Inverse of [`RecordBatch::to_struct`]: the struct's fields become the
    /// schema, its children the columns. Struct-level nulls are dropped.
    pub fn from_struct(vector: &Vector) -> Result<RecordBatch> {
        let DataType::Struct { fields } = vector.data_type() else {
            return Err(Error::TypeMismatch {
                expected: "Struct".to_string(),
                actual: vector.data_type().name(),
            });
        };
        let DataKind::Struct(nested) = vector.data().kind() else {
            return Err(Error::InvalidArgument(
                "Chunked struct vectors convert to one batch per chunk".to_string(),
            ));
        };
        let columns = nested
            .children()
            .iter()
            .map(|child| Vector::from_data(child.clone()))
            .collect();
        RecordBatch::with_length(Arc::new(Schema::new(fields.clone())), vector.len(), columns)
    }

    /// Iterate over `(name, type, column)` triples
    pub fn iter(&self) -> RecordBatchIter<'_> {
        RecordBatchIter { batch: self, index: 0 }
    }
}

/// Iterator over batch columns
pub struct RecordBatchIter<'a> {
    batch: &'a RecordBatch,
    index: usize,
}

impl<'a> Iterator for RecordBatchIter<'a> {
    type Item = (&'a str, &'a DataType, &'a Vector);

    fn next(&mut self) -> Option<Self::Item> {
        let field = self.batch.schema.field(self.index)?;
        let column = self.batch.columns.get(self.index)?;
        self.index += 1;
        Some((field.name(), field.data_type(), column))
    }
}

impl<'a> IntoIterator for &'a RecordBatch {
    type Item = (&'a str, &'a DataType, &'a Vector);
    type IntoIter = RecordBatchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_batch() -> RecordBatch {
        RecordBatch::try_from_columns([
            ("id", Vector::from_values(&[1u64, 2, 3])),
            ("name", Vector::from_strings(&["a", "b", "c"]).unwrap()),
        ])
        .unwrap()
    }

    #[test]
    fn test_batch_creation() {
        let batch = make_batch();
        assert_eq!(batch.num_cols(), 2);
        assert_eq!(batch.num_rows(), 3);
        assert!(!batch.is_empty());
        assert_eq!(batch.schema().to_string(), "Schema<{ id: UInt64, name: Utf8 }>");
    }

    #[test]
    fn test_batch_mismatched_rows() {
        let result = RecordBatch::try_from_columns([
            ("id", Vector::from_values(&[1u64, 2])),
            ("value", Vector::from_values(&[100u64, 200, 300])),
        ]);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_batch_type_checked_against_schema() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::int32())]));
        let result = RecordBatch::new(schema, vec![Vector::from_values(&[1u64])]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_batch_get_column() {
        let batch = make_batch();
        assert_eq!(batch.get_child_at(0).unwrap().len(), 3);
        assert!(batch.get_child_at(2).is_none());
        assert!(batch.column_by_name("name").is_some());
        assert!(batch.column_by_name("nonexistent").is_none());
        assert_eq!(batch.column_name(1), Some("name"));
        assert_eq!(batch.column_name(2), None);
    }

    #[test]
    fn test_batch_row() {
        let batch = make_batch();
        assert_eq!(batch.get(1), Some(vec![2u64.into(), "b".into()]));
        assert_eq!(batch.get(3), None);
    }

    #[test]
    fn test_batch_iterator() {
        let batch = make_batch();
        let names: Vec<&str> = batch.iter().map(|(name, _, _)| name).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_select_and_slice() {
        let batch = make_batch();
        let selected = batch.select(&["name"]);
        assert_eq!(selected.num_cols(), 1);
        assert_eq!(selected.len(), 3);

        let sliced = batch.slice(1, 2).unwrap();
        assert_eq!(sliced.get(0), Some(vec![2u64.into(), "b".into()]));
        assert!(batch.slice(2, 2).is_err());
    }

    #[test]
    fn test_concat() {
        let batch = make_batch();
        let joined = batch.concat(&batch).unwrap();
        assert_eq!(joined.len(), 6);
        assert_eq!(joined.get(4), Some(vec![2u64.into(), "b".into()]));

        let other = batch.select(&["id"]);
        assert!(matches!(batch.concat(&other), Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn test_struct_round_trip() {
        let batch = make_batch();
        let vector = batch.to_struct().unwrap();
        assert_eq!(
            vector.get(2),
            Some(ColumnValue::Struct(vec![3u64.into(), "c".into()]))
        );
        let back = RecordBatch::from_struct(&vector).unwrap();
        assert_eq!(back.schema(), batch.schema());
        assert!(back.get_child_at(0).unwrap().ptr_eq(batch.get_child_at(0).unwrap()));
    }

    #[test]
    fn test_empty_batch() {
        let batch = RecordBatch::empty(make_batch().schema().clone());
        assert!(batch.is_empty());
        assert_eq!(batch.num_cols(), 2);
        assert_eq!(batch.get(0), None);
    }
}
