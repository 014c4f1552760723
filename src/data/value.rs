//! ColumnValue - a single decoded cell read from, or compared against, a column
//!
//! Values are owned and type-tagged. Numeric variants compare across widths
//! (an `Int32` cell equals the literal `3u64`), which is what predicate
//! literals rely on.

use chrono::{
    NaiveDate,
    NaiveDateTime,
};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{
    Hash,
    Hasher,
};

#[derive(Clone, Debug)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Unscaled 128-bit value; the number is `value / 10^scale`.
    Decimal { value: i128, scale: u8 },
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Utf8(String),
    Binary(Vec<u8>),
    List(Vec<ColumnValue>),
    Struct(Vec<ColumnValue>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Ordering between two values, or `None` when either side is null or
    /// the variants are not comparable.
    pub fn compare(&self, other: &ColumnValue) -> Option<Ordering> {
        use ColumnValue::*;

        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (UInt(a), UInt(b)) => Some(a.cmp(b)),
            (Int(a), UInt(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (UInt(a), Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Float(a), UInt(b)) => a.partial_cmp(&(*b as f64)),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (UInt(a), Float(b)) => (*a as f64).partial_cmp(b),
            (
                Decimal { value: a, scale: sa },
                Decimal { value: b, scale: sb },
            ) => compare_decimals(*a, *sa, *b, *sb),
            (Decimal { value, scale }, Int(b)) => {
                compare_decimals(*value, *scale, *b as i128, 0)
            }
            (Decimal { value, scale }, UInt(b)) => {
                compare_decimals(*value, *scale, *b as i128, 0)
            }
            (Int(a), Decimal { value, scale }) => {
                compare_decimals(*a as i128, 0, *value, *scale)
            }
            (UInt(a), Decimal { value, scale }) => {
                compare_decimals(*a as i128, 0, *value, *scale)
            }
            (Decimal { value, scale }, Float(b)) => {
                decimal_to_f64(*value, *scale).partial_cmp(b)
            }
            (Float(a), Decimal { value, scale }) => {
                a.partial_cmp(&decimal_to_f64(*value, *scale))
            }
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Utf8(a), Utf8(b)) => Some(a.cmp(b)),
            (Binary(a), Binary(b)) => Some(a.cmp(b)),
            (Utf8(a), Binary(b)) => Some(a.as_bytes().cmp(b.as_slice())),
            (Binary(a), Utf8(b)) => Some(a.as_slice().cmp(b.as_bytes())),
            (List(a), List(b)) | (Struct(a), Struct(b)) => {
                compare_sequences(a, b)
            }
            _ => None,
        }
    }

    /// Predicate equality: false whenever either side is null.
    pub fn matches(&self, other: &ColumnValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Interpret an integer value as a dictionary key.
    pub fn as_key(&self) -> Option<usize> {
        match self {
            ColumnValue::Int(v) if *v >= 0 => Some(*v as usize),
            ColumnValue::UInt(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(v) => Some(*v),
            ColumnValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int(v) => Some(*v as f64),
            ColumnValue::UInt(v) => Some(*v as f64),
            ColumnValue::Float(v) => Some(*v),
            ColumnValue::Decimal { value, scale } => {
                Some(decimal_to_f64(*value, *scale))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Structural equality: `Null == Null`, numerics compare across widths.
impl PartialEq for ColumnValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnValue::Null, ColumnValue::Null) => true,
            _ => self.matches(other),
        }
    }
}

impl PartialOrd for ColumnValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

/// Hash-map key for values decoded from one data type, so that equal
/// values always share a variant.
#[derive(Debug, Clone)]
pub(crate) struct ValueKey(pub(crate) ColumnValue);

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &ColumnValue, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        ColumnValue::Null => {}
        ColumnValue::Bool(b) => b.hash(state),
        ColumnValue::Int(v) => v.hash(state),
        ColumnValue::UInt(v) => v.hash(state),
        // 0.0 and -0.0 compare equal
        ColumnValue::Float(v) => {
            let bits = if *v == 0.0 { 0 } else { v.to_bits() };
            bits.hash(state);
        }
        ColumnValue::Decimal { value, scale } => {
            value.hash(state);
            scale.hash(state);
        }
        ColumnValue::Date(date) => date.hash(state),
        ColumnValue::Timestamp(timestamp) => timestamp.hash(state),
        ColumnValue::Utf8(s) => s.hash(state),
        ColumnValue::Binary(bytes) => bytes.hash(state),
        ColumnValue::List(items) | ColumnValue::Struct(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
    }
}

fn decimal_to_f64(value: i128, scale: u8) -> f64 {
    value as f64 / 10f64.powi(scale as i32)
}

fn rescale(value: i128, from: u8, to: u8) -> Option<i128> {
    let factor = 10i128.checked_pow(u32::from(to.saturating_sub(from)))?;
    value.checked_mul(factor)
}

fn compare_decimals(a: i128, sa: u8, b: i128, sb: u8) -> Option<Ordering> {
    let scale = sa.max(sb);
    match (rescale(a, sa, scale), rescale(b, sb, scale)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => decimal_to_f64(a, sa).partial_cmp(&decimal_to_f64(b, sb)),
    }
}

fn compare_sequences(a: &[ColumnValue], b: &[ColumnValue]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.compare(y)? {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(a.len().cmp(&b.len()))
}

fn fmt_decimal(
    f: &mut fmt::Formatter<'_>,
    value: i128,
    scale: u8,
) -> fmt::Result {
    if scale == 0 {
        return write!(f, "{}", value);
    }
    let digits = value.unsigned_abs().to_string();
    let scale = scale as usize;
    let sign = if value < 0 { "-" } else { "" };
    if digits.len() > scale {
        let (int, frac) = digits.split_at(digits.len() - scale);
        write!(f, "{}{}.{}", sign, int, frac)
    } else {
        write!(f, "{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
    }
}

fn fmt_nested(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    close: &str,
    items: &[ColumnValue],
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match item {
            ColumnValue::Utf8(s) => write!(f, "{:?}", s)?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str(close)
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => f.write_str("null"),
            ColumnValue::Bool(v) => write!(f, "{}", v),
            ColumnValue::Int(v) => write!(f, "{}", v),
            ColumnValue::UInt(v) => write!(f, "{}", v),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Decimal { value, scale } => {
                fmt_decimal(f, *value, *scale)
            }
            ColumnValue::Date(v) => write!(f, "{}", v),
            ColumnValue::Timestamp(v) => write!(f, "{}", v),
            ColumnValue::Utf8(v) => f.write_str(v),
            ColumnValue::Binary(bytes) => {
                let items: Vec<String> =
                    bytes.iter().map(|b| b.to_string()).collect();
                write!(f, "[{}]", items.join(","))
            }
            ColumnValue::List(items) => fmt_nested(f, "[", "]", items),
            ColumnValue::Struct(items) => fmt_nested(f, "{", "}", items),
        }
    }
}

macro_rules! impl_from_int {
    ($($type:ty => $variant:ident as $cast:ty),* $(,)?) => {
        $(
            impl From<$type> for ColumnValue {
                fn from(value: $type) -> Self {
                    ColumnValue::$variant(value as $cast)
                }
            }
        )*
    };
}

impl_from_int!(
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
);

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Utf8(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Utf8(value)
    }
}

impl From<NaiveDate> for ColumnValue {
    fn from(value: NaiveDate) -> Self {
        ColumnValue::Date(value)
    }
}

impl From<NaiveDateTime> for ColumnValue {
    fn from(value: NaiveDateTime) -> Self {
        ColumnValue::Timestamp(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ColumnValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_width_numeric_comparison() {
        assert_eq!(ColumnValue::Int(3), ColumnValue::UInt(3));
        assert_eq!(ColumnValue::Int(3), ColumnValue::Float(3.0));
        assert!(ColumnValue::Int(-1) < ColumnValue::UInt(0));
        assert!(ColumnValue::Float(2.5) > ColumnValue::Int(2));
    }

    #[test]
    fn test_null_never_matches() {
        assert!(!ColumnValue::Null.matches(&ColumnValue::Null));
        assert!(!ColumnValue::Null.matches(&ColumnValue::Int(0)));
        assert_eq!(ColumnValue::Null.compare(&ColumnValue::Int(0)), None);
        assert_eq!(ColumnValue::Null, ColumnValue::Null);
    }

    #[test]
    fn test_decimal_comparison_rescales() {
        let a = ColumnValue::Decimal { value: 150, scale: 2 };
        let b = ColumnValue::Decimal { value: 15, scale: 1 };
        assert_eq!(a, b);
        assert!(a > ColumnValue::Int(1));
        assert!(a < ColumnValue::Float(1.6));
    }

    #[test]
    fn test_string_and_binary_ordering() {
        assert!(ColumnValue::from("a") < ColumnValue::from("b"));
        assert_eq!(
            ColumnValue::from("ab"),
            ColumnValue::Binary(b"ab".to_vec())
        );
        assert_eq!(ColumnValue::from("a").compare(&ColumnValue::Int(1)), None);
    }

    #[test]
    fn test_list_comparison_is_lexicographic() {
        let a = ColumnValue::List(vec![1.into(), 2.into()]);
        let b = ColumnValue::List(vec![1.into(), 3.into()]);
        let c = ColumnValue::List(vec![1.into()]);
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn test_display() {
        assert_eq!(ColumnValue::Null.to_string(), "null");
        assert_eq!(
            ColumnValue::Decimal { value: -1234, scale: 2 }.to_string(),
            "-12.34"
        );
        assert_eq!(
            ColumnValue::Decimal { value: 5, scale: 3 }.to_string(),
            "0.005"
        );
        assert_eq!(ColumnValue::Binary(vec![1, 2]).to_string(), "[1,2]");
        assert_eq!(
            ColumnValue::List(vec!["a".into(), ColumnValue::Null]).to_string(),
            "[\"a\", null]"
        );
        let date = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert_eq!(ColumnValue::Date(date).to_string(), "2020-02-29");
    }

    #[test]
    fn test_as_key() {
        assert_eq!(ColumnValue::Int(4).as_key(), Some(4));
        assert_eq!(ColumnValue::Int(-1).as_key(), None);
        assert_eq!(ColumnValue::UInt(7).as_key(), Some(7));
        assert_eq!(ColumnValue::Utf8("x".into()).as_key(), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(ColumnValue::from(Some(3i32)), ColumnValue::Int(3));
        assert_eq!(ColumnValue::from(None::<i32>), ColumnValue::Null);
    }
}
