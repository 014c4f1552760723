//! Column construction from Rust values.
//!
//! The typed constructors (`from_values`, `from_strings`, ...) cover the
//! common cases; [`Data::from_column_values`] encodes any supported type from
//! decoded [`ColumnValue`]s, recursing into lists, structs and dictionaries.

use super::{
    flat::UNIX_EPOCH_DAYS_FROM_CE,
    list::OffsetBuffer,
    native::{
        encode_native,
        NativeType,
    },
    value::{
        ColumnValue,
        ValueKey,
    },
    Data,
    DataRef,
};
use crate::{
    bit::pack_bools,
    types::{
        DataType,
        TimeUnit,
        ToType,
        TypeCode,
    },
    vector::Vector,
    Error,
    Result,
};
use bytes::{
    BufMut,
    Bytes,
    BytesMut,
};
use chrono::Datelike;
use std::{
    collections::HashMap,
    sync::Arc,
};

/// Validity bitmap and null count for a sequence of validity flags.
/// Columns without nulls get no bitmap.
fn validity_of<I>(valid: I) -> (Option<Bytes>, usize)
where
    I: IntoIterator<Item = bool>,
{
    let flags: Vec<bool> = valid.into_iter().collect();
    let nulls = flags.iter().filter(|valid| !**valid).count();
    if nulls == 0 {
        (None, 0)
    } else {
        (Some(pack_bools(flags)), nulls)
    }
}

fn offsets_for<I>(lengths: I) -> Result<OffsetBuffer>
where
    I: IntoIterator<Item = usize>,
{
    let mut offsets = vec![0i32];
    let mut total = 0usize;
    for length in lengths {
        total += length;
        let offset = i32::try_from(total).map_err(|_| {
            Error::InvalidArgument(format!(
                "Column values exceed i32 offsets: {} bytes",
                total
            ))
        })?;
        offsets.push(offset);
    }
    OffsetBuffer::from_offsets(&offsets)
}

fn flat_list<S: AsRef<[u8]>>(
    data_type: DataType,
    values: &[Option<S>],
) -> Result<Data> {
    let offsets = offsets_for(
        values.iter().map(|v| v.as_ref().map_or(0, |s| s.as_ref().len())),
    )?;
    let mut bytes = BytesMut::new();
    for value in values.iter().flatten() {
        bytes.put_slice(value.as_ref());
    }
    let (validity, nulls) = validity_of(values.iter().map(Option::is_some));
    Data::new_flat_list(
        data_type,
        values.len(),
        offsets,
        bytes.freeze(),
        validity,
        Some(nulls),
    )
}

impl Data {
    /// Column of non-null native values
    pub fn from_values<T: NativeType + ToType>(values: &[T]) -> Data {
        Data {
            data_type: T::to_type(),
            length: values.len(),
            offset: 0,
            null_count: 0.into(),
            validity: None,
            kind: super::DataKind::Flat(super::FlatData::new(
                encode_native(values).freeze(),
            )),
        }
    }

    /// Column of native values where `None` is null
    pub fn from_options<T: NativeType + ToType + Default>(
        values: &[Option<T>],
    ) -> Data {
        let dense: Vec<T> = values.iter().map(|v| v.unwrap_or_default()).collect();
        let (validity, nulls) = validity_of(values.iter().map(Option::is_some));
        let mut data = Data::from_values(&dense);
        data.validity = validity;
        data.null_count = nulls.into();
        data
    }

    pub fn from_bools(values: &[bool]) -> Data {
        Data {
            data_type: DataType::bool(),
            length: values.len(),
            offset: 0,
            null_count: 0.into(),
            validity: None,
            kind: super::DataKind::Bool(super::BoolData::new(pack_bools(
                values.iter().copied(),
            ))),
        }
    }

    pub fn from_opt_bools(values: &[Option<bool>]) -> Data {
        let dense: Vec<bool> = values.iter().map(|v| v.unwrap_or(false)).collect();
        let (validity, nulls) = validity_of(values.iter().map(Option::is_some));
        let mut data = Data::from_bools(&dense);
        data.validity = validity;
        data.null_count = nulls.into();
        data
    }

    /// Utf8 column of non-null strings. Fails only when the total byte
    /// length overflows `i32` offsets.
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Result<Data> {
        let values: Vec<Option<&[u8]>> =
            values.iter().map(|s| Some(s.as_ref().as_bytes())).collect();
        flat_list(DataType::utf8(), &values)
    }

    pub fn from_opt_strings<S: AsRef<str>>(values: &[Option<S>]) -> Result<Data> {
        let values: Vec<Option<&[u8]>> = values
            .iter()
            .map(|s| s.as_ref().map(|s| s.as_ref().as_bytes()))
            .collect();
        flat_list(DataType::utf8(), &values)
    }

    pub fn from_binaries<B: AsRef<[u8]>>(values: &[Option<B>]) -> Result<Data> {
        flat_list(DataType::binary(), values)
    }

    /// Encode decoded values as a column of `data_type`.
    ///
    /// `ColumnValue::Null` entries become null rows. Unions are not
    /// supported; values that do not fit the type are rejected.
    pub fn from_column_values(
        data_type: &DataType,
        values: &[ColumnValue],
    ) -> Result<Data> {
        let (validity, nulls) =
            validity_of(values.iter().map(|value| !value.is_null()));
        let length = values.len();

        match data_type {
            DataType::Simple(TypeCode::Null) => Ok(Data::new_null(length)),
            DataType::Simple(TypeCode::Bool) => {
                let bits = values
                    .iter()
                    .map(|value| match value {
                        ColumnValue::Null => Ok(false),
                        ColumnValue::Bool(b) => Ok(*b),
                        other => Err(mismatch(data_type, other)),
                    })
                    .collect::<Result<Vec<bool>>>()?;
                Data::new_bool(length, pack_bools(bits), validity, Some(nulls))
            }
            DataType::Simple(TypeCode::Utf8 | TypeCode::Binary) => {
                let bytes = values
                    .iter()
                    .map(|value| match value {
                        ColumnValue::Null => Ok(None),
                        ColumnValue::Utf8(s) => Ok(Some(s.as_bytes())),
                        ColumnValue::Binary(b) => Ok(Some(b.as_slice())),
                        other => Err(mismatch(data_type, other)),
                    })
                    .collect::<Result<Vec<Option<&[u8]>>>>()?;
                flat_list(data_type.clone(), &bytes)
            }
            DataType::List { item_type } => {
                let mut lengths = Vec::with_capacity(length);
                let mut items = Vec::new();
                for value in values {
                    match value {
                        ColumnValue::Null => lengths.push(0),
                        ColumnValue::List(list) => {
                            lengths.push(list.len());
                            items.extend(list.iter().cloned());
                        }
                        other => return Err(mismatch(data_type, other)),
                    }
                }
                let child = Data::from_column_values(item_type, &items)?;
                Data::new_list(
                    data_type.clone(),
                    length,
                    offsets_for(lengths)?,
                    child,
                    validity,
                    Some(nulls),
                )
            }
            DataType::Struct { fields } => {
                let mut columns = vec![Vec::with_capacity(length); fields.len()];
                for value in values {
                    match value {
                        ColumnValue::Null => {
                            for column in columns.iter_mut() {
                                column.push(ColumnValue::Null);
                            }
                        }
                        ColumnValue::Struct(items) if items.len() == fields.len() => {
                            for (column, item) in columns.iter_mut().zip(items) {
                                column.push(item.clone());
                            }
                        }
                        other => return Err(mismatch(data_type, other)),
                    }
                }
                let children = fields
                    .iter()
                    .zip(columns)
                    .map(|(field, column)| {
                        Data::from_column_values(field.data_type(), &column)
                            .map(DataRef::new)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Data::new_struct(
                    data_type.clone(),
                    length,
                    children,
                    validity,
                    Some(nulls),
                )
            }
            DataType::Dictionary { index_type, value_type } => {
                // decode through the value type first so equal inputs of
                // different variants (Int(1), UInt(1)) hash alike
                let decoded = Data::from_column_values(value_type, values)?;
                let mut unique: Vec<ColumnValue> = Vec::new();
                let mut unique_map: HashMap<ValueKey, usize> = HashMap::new();
                let mut keys = Vec::with_capacity(length);
                for index in 0..length {
                    let value = decoded.value(index).unwrap_or(ColumnValue::Null);
                    if value.is_null() {
                        keys.push(ColumnValue::Null);
                        continue;
                    }
                    let key = *unique_map.entry(ValueKey(value)).or_insert_with_key(|value| {
                        unique.push(value.0.clone());
                        unique.len() - 1
                    });
                    keys.push(ColumnValue::UInt(key as u64));
                }
                let indices = Data::from_column_values(index_type, &keys)?;
                let dictionary =
                    Vector::new(Data::from_column_values(value_type, &unique)?);
                Data::new_dictionary(data_type.clone(), Arc::new(indices), dictionary)
            }
            DataType::Union { .. } => Err(Error::InvalidArgument(format!(
                "Cannot build {} from values",
                data_type.name()
            ))),
            _ => {
                let width = data_type.byte_width().unwrap_or(0);
                let mut buffer = BytesMut::with_capacity(length * width);
                for value in values {
                    if value.is_null() {
                        buffer.put_bytes(0, width);
                    } else {
                        encode_value(data_type, value, &mut buffer)?;
                    }
                }
                Data::new_flat(
                    data_type.clone(),
                    length,
                    buffer.freeze(),
                    validity,
                    Some(nulls),
                )
            }
        }
    }
}

fn mismatch(data_type: &DataType, value: &ColumnValue) -> Error {
    Error::TypeMismatch { expected: data_type.name(), actual: format!("{:?}", value) }
}

fn integral(value: &ColumnValue) -> Option<i128> {
    match value {
        ColumnValue::Int(v) => Some(*v as i128),
        ColumnValue::UInt(v) => Some(*v as i128),
        ColumnValue::Bool(b) => Some(*b as i128),
        _ => None,
    }
}

macro_rules! put_integer {
    ($buffer:expr, $data_type:expr, $value:expr, $type:ty, $put:ident) => {{
        let converted = integral($value)
            .and_then(|v| <$type>::try_from(v).ok())
            .ok_or_else(|| mismatch($data_type, $value))?;
        $buffer.$put(converted);
    }};
}

/// Append the fixed-width encoding of one non-null value
pub(crate) fn encode_value(
    data_type: &DataType,
    value: &ColumnValue,
    buffer: &mut BytesMut,
) -> Result<()> {
    match data_type {
        DataType::Simple(code) => match code {
            TypeCode::Int8 => put_integer!(buffer, data_type, value, i8, put_i8),
            TypeCode::Int16 => put_integer!(buffer, data_type, value, i16, put_i16_le),
            TypeCode::Int32 => put_integer!(buffer, data_type, value, i32, put_i32_le),
            TypeCode::Int64 => put_integer!(buffer, data_type, value, i64, put_i64_le),
            TypeCode::UInt8 => put_integer!(buffer, data_type, value, u8, put_u8),
            TypeCode::UInt16 => {
                put_integer!(buffer, data_type, value, u16, put_u16_le)
            }
            TypeCode::UInt32 => {
                put_integer!(buffer, data_type, value, u32, put_u32_le)
            }
            TypeCode::UInt64 => {
                put_integer!(buffer, data_type, value, u64, put_u64_le)
            }
            TypeCode::Float32 => {
                let v = value.as_f64().ok_or_else(|| mismatch(data_type, value))?;
                buffer.put_f32_le(v as f32);
            }
            TypeCode::Float64 => {
                let v = value.as_f64().ok_or_else(|| mismatch(data_type, value))?;
                buffer.put_f64_le(v);
            }
            TypeCode::Date32 => {
                let days = match value {
                    ColumnValue::Date(date) => {
                        date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
                    }
                    other => integral(other)
                        .and_then(|v| i32::try_from(v).ok())
                        .ok_or_else(|| mismatch(data_type, other))?,
                };
                buffer.put_i32_le(days);
            }
            _ => return Err(mismatch(data_type, value)),
        },
        DataType::Decimal { scale, .. } => {
            let unscaled = match value {
                ColumnValue::Decimal { value: v, scale: from } if from <= scale => {
                    10i128
                        .checked_pow(u32::from(scale - from))
                        .and_then(|factor| v.checked_mul(factor))
                }
                ColumnValue::Float(f) => {
                    Some((f * 10f64.powi(i32::from(*scale))).round() as i128)
                }
                other => integral(other).and_then(|v| {
                    10i128.checked_pow(u32::from(*scale))?.checked_mul(v)
                }),
            }
            .ok_or_else(|| mismatch(data_type, value))?;
            buffer.put_i128_le(unscaled);
        }
        DataType::Timestamp { unit, .. } => {
            let ticks = match value {
                ColumnValue::Timestamp(ts) => {
                    let utc = ts.and_utc();
                    match unit {
                        TimeUnit::Second => Some(utc.timestamp()),
                        TimeUnit::Millisecond => Some(utc.timestamp_millis()),
                        TimeUnit::Microsecond => Some(utc.timestamp_micros()),
                        TimeUnit::Nanosecond => utc.timestamp_nanos_opt(),
                    }
                }
                other => integral(other).and_then(|v| i64::try_from(v).ok()),
            }
            .ok_or_else(|| mismatch(data_type, value))?;
            buffer.put_i64_le(ticks);
        }
        _ => return Err(mismatch(data_type, value)),
    }
    Ok(())
}
