use super::value::ColumnValue;
use bytes::{
    Buf,
    BufMut,
    BytesMut,
};

/// Trait for types stored as fixed-width little-endian values
pub trait NativeType: Copy + Send + Sync + 'static {
    /// Width of one value in bytes
    const WIDTH: usize;

    /// Read one value from the front of `bytes`; `bytes.len() >= WIDTH`
    fn read_from(bytes: &[u8]) -> Self;

    fn write_to(&self, buffer: &mut BytesMut);

    fn into_value(self) -> ColumnValue;
}

macro_rules! impl_native_type {
    ($type:ty, $get:ident, $put:ident, $variant:ident as $cast:ty) => {
        impl NativeType for $type {
            const WIDTH: usize = std::mem::size_of::<$type>();

            #[inline]
            fn read_from(bytes: &[u8]) -> Self {
                let mut buf = bytes;
                buf.$get()
            }

            fn write_to(&self, buffer: &mut BytesMut) {
                buffer.$put(*self);
            }

            fn into_value(self) -> ColumnValue {
                ColumnValue::$variant(self as $cast)
            }
        }
    };
}

impl_native_type!(u8, get_u8, put_u8, UInt as u64);
impl_native_type!(u16, get_u16_le, put_u16_le, UInt as u64);
impl_native_type!(u32, get_u32_le, put_u32_le, UInt as u64);
impl_native_type!(u64, get_u64_le, put_u64_le, UInt as u64);
impl_native_type!(i8, get_i8, put_i8, Int as i64);
impl_native_type!(i16, get_i16_le, put_i16_le, Int as i64);
impl_native_type!(i32, get_i32_le, put_i32_le, Int as i64);
impl_native_type!(i64, get_i64_le, put_i64_le, Int as i64);
impl_native_type!(f32, get_f32_le, put_f32_le, Float as f64);
impl_native_type!(f64, get_f64_le, put_f64_le, Float as f64);

impl NativeType for i128 {
    const WIDTH: usize = 16;

    #[inline]
    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = bytes;
        buf.get_i128_le()
    }

    fn write_to(&self, buffer: &mut BytesMut) {
        buffer.put_i128_le(*self);
    }

    fn into_value(self) -> ColumnValue {
        ColumnValue::Decimal { value: self, scale: 0 }
    }
}

/// Encode a slice of native values into a little-endian byte buffer
pub fn encode_native<T: NativeType>(values: &[T]) -> BytesMut {
    let mut buffer = BytesMut::with_capacity(values.len() * T::WIDTH);
    for value in values {
        value.write_to(&mut buffer);
    }
    buffer
}

/// Read the `index`-th native value from a little-endian buffer
#[inline]
pub fn read_native<T: NativeType>(bytes: &[u8], index: usize) -> T {
    T::read_from(&bytes[index * T::WIDTH..])
}
