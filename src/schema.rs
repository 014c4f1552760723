use crate::types::DataType;
use std::fmt;

/// A named, typed column slot in a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl Field {
    /// Create a nullable field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self { name: name.into(), data_type, nullable: true }
    }

    /// Set whether the field may contain nulls (builder pattern)
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}

/// Ordered list of fields shared by every batch of a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Schema with no fields
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Index of the first field called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Indices of the fields whose names appear in `names`, in schema order.
    ///
    /// Names that match no field are ignored.
    pub fn select_indices(&self, names: &[&str]) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| names.contains(&field.name.as_str()))
            .map(|(index, _)| index)
            .collect()
    }

    /// Project this schema onto `names`, keeping schema order
    pub fn select(&self, names: &[&str]) -> Schema {
        let fields = self
            .select_indices(names)
            .into_iter()
            .map(|index| self.fields[index].clone())
            .collect();
        Schema { fields }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> =
            self.fields.iter().map(|field| field.to_string()).collect();
        write!(f, "Schema<{{ {} }}>", fields.join(", "))
    }
}
