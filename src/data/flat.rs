use super::{
    native::{
        read_native,
        NativeType,
    },
    value::ColumnValue,
    Data,
    DataKind,
};
use crate::{
    bit,
    types::{
        DataType,
        TimeUnit,
        TypeCode,
    },
    Error,
    Result,
};
use bytes::Bytes;
use chrono::{
    DateTime,
    NaiveDate,
    NaiveDateTime,
};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01
pub(crate) const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Fixed-width values stored contiguously, narrowed to the row window
#[derive(Debug, Clone)]
pub struct FlatData {
    values: Bytes,
}

impl FlatData {
    pub(crate) fn new(values: Bytes) -> Self {
        Self { values }
    }

    /// Value bytes of this window; row `i` starts at `i * byte_width`
    pub fn values(&self) -> &Bytes {
        &self.values
    }

    /// Typed read of row `index`
    pub fn native<T: NativeType>(&self, index: usize) -> T {
        read_native(&self.values, index)
    }

    pub(crate) fn slice(&self, width: usize, offset: usize, length: usize) -> Self {
        Self {
            values: self.values.slice(offset * width..(offset + length) * width),
        }
    }

    pub(crate) fn value(&self, data_type: &DataType, index: usize) -> ColumnValue {
        let bytes = &self.values;
        match data_type {
            DataType::Simple(code) => match code {
                TypeCode::Int8 => read_native::<i8>(bytes, index).into_value(),
                TypeCode::Int16 => read_native::<i16>(bytes, index).into_value(),
                TypeCode::Int32 => read_native::<i32>(bytes, index).into_value(),
                TypeCode::Int64 => read_native::<i64>(bytes, index).into_value(),
                TypeCode::UInt8 => read_native::<u8>(bytes, index).into_value(),
                TypeCode::UInt16 => {
                    read_native::<u16>(bytes, index).into_value()
                }
                TypeCode::UInt32 => {
                    read_native::<u32>(bytes, index).into_value()
                }
                TypeCode::UInt64 => {
                    read_native::<u64>(bytes, index).into_value()
                }
                TypeCode::Float32 => {
                    read_native::<f32>(bytes, index).into_value()
                }
                TypeCode::Float64 => {
                    read_native::<f64>(bytes, index).into_value()
                }
                TypeCode::Date32 => {
                    date_from_days(read_native::<i32>(bytes, index))
                        .map_or(ColumnValue::Null, ColumnValue::Date)
                }
                _ => ColumnValue::Null,
            },
            DataType::Decimal { scale, .. } => ColumnValue::Decimal {
                value: read_native::<i128>(bytes, index),
                scale: *scale,
            },
            DataType::Timestamp { unit, .. } => {
                timestamp_from(read_native::<i64>(bytes, index), *unit)
                    .map_or(ColumnValue::Null, ColumnValue::Timestamp)
            }
            _ => ColumnValue::Null,
        }
    }

    /// Row `index` read as a dictionary key, for integer index types
    pub(crate) fn key(&self, data_type: &DataType, index: usize) -> Option<usize> {
        let bytes = &self.values;
        match data_type.code() {
            TypeCode::Int8 => usize::try_from(read_native::<i8>(bytes, index)).ok(),
            TypeCode::Int16 => {
                usize::try_from(read_native::<i16>(bytes, index)).ok()
            }
            TypeCode::Int32 => {
                usize::try_from(read_native::<i32>(bytes, index)).ok()
            }
            TypeCode::Int64 => {
                usize::try_from(read_native::<i64>(bytes, index)).ok()
            }
            TypeCode::UInt8 => Some(read_native::<u8>(bytes, index) as usize),
            TypeCode::UInt16 => Some(read_native::<u16>(bytes, index) as usize),
            TypeCode::UInt32 => {
                usize::try_from(read_native::<u32>(bytes, index)).ok()
            }
            TypeCode::UInt64 => {
                usize::try_from(read_native::<u64>(bytes, index)).ok()
            }
            _ => None,
        }
    }
}

pub(crate) fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

pub(crate) fn timestamp_from(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let instant = match unit {
        TimeUnit::Second => DateTime::from_timestamp(value, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(value),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(value)),
    };
    instant.map(|instant| instant.naive_utc())
}

/// Bit-packed booleans addressed through the header offset
#[derive(Debug, Clone)]
pub struct BoolData {
    values: Bytes,
}

impl BoolData {
    pub(crate) fn new(values: Bytes) -> Self {
        Self { values }
    }

    /// The whole value bitmap; row `i` is bit `offset + i`
    pub fn values(&self) -> &Bytes {
        &self.values
    }

    pub(crate) fn value(&self, bit_index: usize) -> bool {
        bit::get_bool(&self.values, bit_index)
    }
}

impl Data {
    /// Fixed-width column over `values`, one `byte_width` slot per row
    pub fn new_flat(
        data_type: DataType,
        length: usize,
        values: Bytes,
        validity: Option<Bytes>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        let width = data_type.byte_width().ok_or_else(|| Error::TypeMismatch {
            expected: "fixed-width type".to_string(),
            actual: data_type.name(),
        })?;
        if values.len() < length * width {
            return Err(Error::Validation(format!(
                "{} values buffer holds {} bytes, need {} for {} rows",
                data_type.name(),
                values.len(),
                length * width,
                length
            )));
        }

        Data::from_parts(
            data_type,
            length,
            0,
            validity,
            null_count,
            DataKind::Flat(FlatData::new(values.slice(..length * width))),
        )
    }

    /// Boolean column over an LSB-first value bitmap
    pub fn new_bool(
        length: usize,
        values: Bytes,
        validity: Option<Bytes>,
        null_count: Option<usize>,
    ) -> Result<Data> {
        if values.len() < bit::bytes_for_bits(length) {
            return Err(Error::Validation(format!(
                "Bool values bitmap holds {} bytes, need {} for {} rows",
                values.len(),
                bit::bytes_for_bits(length),
                length
            )));
        }

        Data::from_parts(
            DataType::bool(),
            length,
            0,
            validity,
            null_count,
            DataKind::Bool(BoolData::new(values)),
        )
    }
}
