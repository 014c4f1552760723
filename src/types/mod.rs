//! # Logical Type System
//!
//! Every column chunk carries a [`DataType`] that decides both how its buffers
//! are laid out and which [`crate::data::DataKind`] variant holds them.
//!
//! ## Physical layouts
//!
//! | Type | Layout |
//! |------|--------|
//! | `Int8`..`UInt64`, `Float32`, `Float64`, `Date32`, `Timestamp`, `Decimal` | fixed-width little-endian values |
//! | `Bool` | bit-packed values, LSB first |
//! | `Utf8`, `Binary` | `Int32` offsets (n + 1 entries) + contiguous bytes |
//! | `List(T)` | `Int32` offsets (n + 1 entries) + one child column |
//! | `Struct(...)` | one child column per field, same length as the parent |
//! | `Union(...)` | `Int8` type ids, plus `Int32` value offsets when dense |
//! | `Dictionary(K, V)` | integer keys of type `K` into a shared dictionary of `V` |
//!
//! All layouts share an optional validity bitmap (see [`crate::bit`]).

use crate::{
    schema::Field,
    Error,
    Result,
};
use std::fmt;

/// Trait for mapping Rust primitive types to column types.
///
/// # Examples
///
/// ```
/// use columnar_frame::types::{DataType, ToType};
///
/// assert_eq!(i32::to_type(), DataType::int32());
/// assert_eq!(f64::to_type(), DataType::float64());
/// ```
pub trait ToType {
    /// Returns the corresponding [`DataType`] for this Rust type.
    fn to_type() -> DataType;
}

macro_rules! impl_to_type {
    ($rust:ty, $ctor:ident) => {
        impl ToType for $rust {
            fn to_type() -> DataType {
                DataType::$ctor()
            }
        }
    };
}

impl_to_type!(i8, int8);
impl_to_type!(i16, int16);
impl_to_type!(i32, int32);
impl_to_type!(i64, int64);
impl_to_type!(u8, uint8);
impl_to_type!(u16, uint16);
impl_to_type!(u32, uint32);
impl_to_type!(u64, uint64);
impl_to_type!(f32, float32);
impl_to_type!(f64, float64);
impl_to_type!(bool, bool);

/// Type code enumeration.
///
/// Each variant names a base type. Parametric types (decimal, timestamp,
/// list, struct, union, dictionary) carry their parameters in [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// All-null column with no value buffer.
    Null = 0,
    /// Bit-packed boolean.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit IEEE 754 floating-point number.
    Float32,
    /// 64-bit IEEE 754 floating-point number.
    Float64,
    /// 128-bit scaled decimal.
    Decimal,
    /// Days since 1970-01-01, stored as Int32.
    Date32,
    /// Instant since the Unix epoch, stored as Int64 in a [`TimeUnit`].
    Timestamp,
    /// Variable-length UTF-8 string.
    Utf8,
    /// Variable-length byte string.
    Binary,
    /// Variable-length list of a single child type.
    List,
    /// Fixed set of named child columns.
    Struct,
    /// Tagged union of child columns.
    Union,
    /// Integer keys into a shared dictionary.
    Dictionary,
}

impl TypeCode {
    /// Returns the type name string for this type code.
    pub fn name(&self) -> &'static str {
        match self {
            TypeCode::Null => "Null",
            TypeCode::Bool => "Bool",
            TypeCode::Int8 => "Int8",
            TypeCode::Int16 => "Int16",
            TypeCode::Int32 => "Int32",
            TypeCode::Int64 => "Int64",
            TypeCode::UInt8 => "UInt8",
            TypeCode::UInt16 => "UInt16",
            TypeCode::UInt32 => "UInt32",
            TypeCode::UInt64 => "UInt64",
            TypeCode::Float32 => "Float32",
            TypeCode::Float64 => "Float64",
            TypeCode::Decimal => "Decimal",
            TypeCode::Date32 => "Date32",
            TypeCode::Timestamp => "Timestamp",
            TypeCode::Utf8 => "Utf8",
            TypeCode::Binary => "Binary",
            TypeCode::List => "List",
            TypeCode::Struct => "Struct",
            TypeCode::Union => "Union",
            TypeCode::Dictionary => "Dictionary",
        }
    }
}

/// Resolution of a [`DataType::Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Microsecond => "us",
            TimeUnit::Nanosecond => "ns",
        }
    }
}

/// Whether a union stores every child at full length (sparse) or addresses
/// children through a per-row value offset (dense).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnionMode {
    Sparse,
    Dense,
}

/// Column type definition, representing both simple and parametric types.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// A non-parametric type identified by its [`TypeCode`].
    Simple(TypeCode),
    /// 128-bit decimal with given precision and scale.
    Decimal {
        /// Total number of significant digits.
        precision: u8,
        /// Number of digits after the decimal point.
        scale: u8,
    },
    /// Instant with a resolution and optional timezone.
    Timestamp {
        unit: TimeUnit,
        /// Optional IANA timezone name, carried for display only.
        timezone: Option<String>,
    },
    /// Variable-length list of the given element type.
    List {
        /// The type of each element.
        item_type: Box<DataType>,
    },
    /// Named child columns.
    Struct {
        /// The ordered child fields.
        fields: Vec<Field>,
    },
    /// Tagged union over child fields.
    Union {
        mode: UnionMode,
        /// Type id used for each child, parallel to `fields`.
        type_ids: Vec<i8>,
        fields: Vec<Field>,
    },
    /// Integer keys of `index_type` referencing values of `value_type`.
    Dictionary {
        index_type: Box<DataType>,
        value_type: Box<DataType>,
    },
}

impl DataType {
    /// Returns the [`TypeCode`] for this type.
    pub fn code(&self) -> TypeCode {
        match self {
            DataType::Simple(code) => *code,
            DataType::Decimal { .. } => TypeCode::Decimal,
            DataType::Timestamp { .. } => TypeCode::Timestamp,
            DataType::List { .. } => TypeCode::List,
            DataType::Struct { .. } => TypeCode::Struct,
            DataType::Union { .. } => TypeCode::Union,
            DataType::Dictionary { .. } => TypeCode::Dictionary,
        }
    }

    /// Returns the full type name string, including parameters.
    pub fn name(&self) -> String {
        match self {
            DataType::Simple(code) => code.name().to_string(),
            DataType::Decimal { precision, scale } => {
                format!("Decimal({}, {})", precision, scale)
            }
            DataType::Timestamp { unit, timezone: None } => {
                format!("Timestamp({})", unit.name())
            }
            DataType::Timestamp { unit, timezone: Some(tz) } => {
                format!("Timestamp({}, '{}')", unit.name(), tz)
            }
            DataType::List { item_type } => {
                format!("List({})", item_type.name())
            }
            DataType::Struct { fields } => {
                format!("Struct({})", format_fields(fields))
            }
            DataType::Union { mode, fields, .. } => {
                let mode = match mode {
                    UnionMode::Sparse => "Sparse",
                    UnionMode::Dense => "Dense",
                };
                format!("{}Union({})", mode, format_fields(fields))
            }
            DataType::Dictionary { index_type, value_type } => {
                format!(
                    "Dictionary({}, {})",
                    index_type.name(),
                    value_type.name()
                )
            }
        }
    }

    /// Returns the width in bytes of one value for fixed-width types.
    ///
    /// Returns `None` for bit-packed, variable-length and composite types.
    ///
    /// # Examples
    ///
    /// ```
    /// use columnar_frame::types::DataType;
    ///
    /// assert_eq!(DataType::int32().byte_width(), Some(4));
    /// assert_eq!(DataType::decimal(20, 2).byte_width(), Some(16));
    /// assert_eq!(DataType::utf8().byte_width(), None);
    /// ```
    pub fn byte_width(&self) -> Option<usize> {
        match self {
            DataType::Simple(code) => match code {
                TypeCode::Int8 | TypeCode::UInt8 => Some(1),
                TypeCode::Int16 | TypeCode::UInt16 => Some(2),
                TypeCode::Int32
                | TypeCode::UInt32
                | TypeCode::Float32
                | TypeCode::Date32 => Some(4),
                TypeCode::Int64 | TypeCode::UInt64 | TypeCode::Float64 => {
                    Some(8)
                }
                _ => None,
            },
            DataType::Decimal { .. } => Some(16),
            DataType::Timestamp { .. } => Some(8),
            DataType::List { .. }
            | DataType::Struct { .. }
            | DataType::Union { .. }
            | DataType::Dictionary { .. } => None,
        }
    }

    /// True for the signed and unsigned integer types usable as dictionary keys.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.code(),
            TypeCode::Int8
                | TypeCode::Int16
                | TypeCode::Int32
                | TypeCode::Int64
                | TypeCode::UInt8
                | TypeCode::UInt16
                | TypeCode::UInt32
                | TypeCode::UInt64
        )
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, DataType::Dictionary { .. })
    }

    /// Child fields of a struct or union, empty for every other type.
    pub fn children(&self) -> &[Field] {
        match self {
            DataType::Struct { fields } | DataType::Union { fields, .. } => {
                fields
            }
            _ => &[],
        }
    }

    /// Creates a Null type.
    pub fn null() -> Self {
        DataType::Simple(TypeCode::Null)
    }

    /// Creates a Bool type.
    pub fn bool() -> Self {
        DataType::Simple(TypeCode::Bool)
    }

    /// Creates an Int8 type.
    pub fn int8() -> Self {
        DataType::Simple(TypeCode::Int8)
    }

    /// Creates an Int16 type.
    pub fn int16() -> Self {
        DataType::Simple(TypeCode::Int16)
    }

    /// Creates an Int32 type.
    pub fn int32() -> Self {
        DataType::Simple(TypeCode::Int32)
    }

    /// Creates an Int64 type.
    pub fn int64() -> Self {
        DataType::Simple(TypeCode::Int64)
    }

    /// Creates a UInt8 type.
    pub fn uint8() -> Self {
        DataType::Simple(TypeCode::UInt8)
    }

    /// Creates a UInt16 type.
    pub fn uint16() -> Self {
        DataType::Simple(TypeCode::UInt16)
    }

    /// Creates a UInt32 type.
    pub fn uint32() -> Self {
        DataType::Simple(TypeCode::UInt32)
    }

    /// Creates a UInt64 type.
    pub fn uint64() -> Self {
        DataType::Simple(TypeCode::UInt64)
    }

    /// Creates a Float32 type.
    pub fn float32() -> Self {
        DataType::Simple(TypeCode::Float32)
    }

    /// Creates a Float64 type.
    pub fn float64() -> Self {
        DataType::Simple(TypeCode::Float64)
    }

    /// Creates a Utf8 type.
    pub fn utf8() -> Self {
        DataType::Simple(TypeCode::Utf8)
    }

    /// Creates a Binary type.
    pub fn binary() -> Self {
        DataType::Simple(TypeCode::Binary)
    }

    /// Creates a Date32 type (days since 1970-01-01).
    pub fn date32() -> Self {
        DataType::Simple(TypeCode::Date32)
    }

    /// Creates a Timestamp type with the given unit and optional timezone.
    pub fn timestamp(unit: TimeUnit, timezone: Option<String>) -> Self {
        DataType::Timestamp { unit, timezone }
    }

    /// Creates a Decimal type with the given precision and scale.
    pub fn decimal(precision: u8, scale: u8) -> Self {
        DataType::Decimal { precision, scale }
    }

    /// Creates a List type with the given element type.
    pub fn list(item_type: DataType) -> Self {
        DataType::List { item_type: Box::new(item_type) }
    }

    /// Creates a Struct type with the given child fields.
    pub fn struct_(fields: Vec<Field>) -> Self {
        DataType::Struct { fields }
    }

    /// Creates a sparse Union; type ids default to the child positions.
    ///
    /// Fails when there are more children than `Int8` type ids.
    pub fn sparse_union(fields: Vec<Field>) -> Result<Self> {
        Self::union_of(UnionMode::Sparse, fields)
    }

    /// Creates a dense Union; type ids default to the child positions.
    ///
    /// Fails when there are more children than `Int8` type ids.
    pub fn dense_union(fields: Vec<Field>) -> Result<Self> {
        Self::union_of(UnionMode::Dense, fields)
    }

    fn union_of(mode: UnionMode, fields: Vec<Field>) -> Result<Self> {
        let type_ids = (0..fields.len())
            .map(|position| {
                i8::try_from(position).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "Union of {} children exceeds Int8 type ids",
                        fields.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DataType::Union { mode, type_ids, fields })
    }

    /// Creates a Dictionary type with the given key and value types.
    pub fn dictionary(index_type: DataType, value_type: DataType) -> Self {
        DataType::Dictionary {
            index_type: Box::new(index_type),
            value_type: Box::new(value_type),
        }
    }

    /// Create a DataType from a Rust primitive type
    pub fn for_rust_type<T: ToType>() -> Self {
        T::to_type()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn format_fields(fields: &[Field]) -> String {
    let formatted: Vec<String> =
        fields.iter().map(|field| field.to_string()).collect();
    formatted.join(", ")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_name() {
        assert_eq!(TypeCode::Int32.name(), "Int32");
        assert_eq!(TypeCode::Utf8.name(), "Utf8");
        assert_eq!(TypeCode::Dictionary.name(), "Dictionary");
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(DataType::int32().name(), "Int32");
        assert_eq!(DataType::uint64().name(), "UInt64");
        assert_eq!(DataType::bool().to_string(), "Bool");
    }

    #[test]
    fn test_list_type() {
        let t = DataType::list(DataType::int32());
        assert_eq!(t.code(), TypeCode::List);
        assert_eq!(t.name(), "List(Int32)");
    }

    #[test]
    fn test_struct_and_union_names() {
        let fields = vec![
            Field::new("a", DataType::int32()),
            Field::new("b", DataType::utf8()),
        ];
        assert_eq!(
            DataType::struct_(fields.clone()).name(),
            "Struct(a: Int32, b: Utf8)"
        );
        assert_eq!(
            DataType::dense_union(fields).unwrap().name(),
            "DenseUnion(a: Int32, b: Utf8)"
        );
    }

    #[test]
    fn test_union_type_ids_fit_int8() {
        let fields = |count: usize| -> Vec<Field> {
            (0..count)
                .map(|n| Field::new(format!("f{}", n), DataType::int32()))
                .collect()
        };
        match DataType::sparse_union(fields(128)).unwrap() {
            DataType::Union { type_ids, .. } => {
                assert_eq!(type_ids.len(), 128);
                assert_eq!(type_ids.last(), Some(&127));
            }
            other => panic!("unexpected type {}", other),
        }
        assert!(matches!(
            DataType::dense_union(fields(129)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dictionary_type() {
        let t = DataType::dictionary(DataType::int32(), DataType::utf8());
        assert!(t.is_dictionary());
        assert_eq!(t.name(), "Dictionary(Int32, Utf8)");
        assert_eq!(t.byte_width(), None);
    }

    #[test]
    fn test_timestamp_with_timezone() {
        let t = DataType::timestamp(TimeUnit::Millisecond, Some("UTC".into()));
        assert_eq!(t.name(), "Timestamp(ms, 'UTC')");
        assert_eq!(t.byte_width(), Some(8));
    }

    #[test]
    fn test_integer_classification() {
        assert!(DataType::uint8().is_integer());
        assert!(DataType::int64().is_integer());
        assert!(!DataType::float32().is_integer());
        assert!(!DataType::utf8().is_integer());
    }

    #[test]
    fn test_type_equality() {
        assert_eq!(DataType::int32(), DataType::int32());
        assert_eq!(
            DataType::list(DataType::utf8()),
            DataType::list(DataType::utf8())
        );
        assert_ne!(DataType::int32(), DataType::int64());
        assert_ne!(DataType::decimal(10, 2), DataType::decimal(10, 3));
    }

    #[test]
    fn test_for_rust_type() {
        assert_eq!(DataType::for_rust_type::<u16>(), DataType::uint16());
        assert_eq!(DataType::for_rust_type::<bool>(), DataType::bool());
    }
}
