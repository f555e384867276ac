use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// A decoded column value or a parameter to bind
///
/// Each variant is tagged by the host type it carries. Codecs are selected by the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    /// Bytes that may be streamed to the server in chunks rather than inline
    LongData(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Signed TIME, may exceed 24 hours
    Duration(TimeDelta),
    DateTime(NaiveDateTime),
    /// Zone-aware point in time
    Timestamp(DateTime<FixedOffset>),
}

/// Tag of a `Value` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    LongData,
    Date,
    Time,
    Duration,
    DateTime,
    Timestamp,
}

impl ValueKind {
    pub const COUNT: usize = 18;

    pub const ALL: [ValueKind; Self::COUNT] = [
        ValueKind::Null,
        ValueKind::Bool,
        ValueKind::I8,
        ValueKind::I16,
        ValueKind::I32,
        ValueKind::I64,
        ValueKind::U64,
        ValueKind::F32,
        ValueKind::F64,
        ValueKind::Decimal,
        ValueKind::String,
        ValueKind::Bytes,
        ValueKind::LongData,
        ValueKind::Date,
        ValueKind::Time,
        ValueKind::Duration,
        ValueKind::DateTime,
        ValueKind::Timestamp,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::LongData(_) => ValueKind::LongData,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Duration(_) => ValueKind::Duration,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

fn mismatch(target: &str, value: &Value) -> Error {
    Error::DataConversion(format!("cannot convert {:?} to {target}", value.kind()))
}

/// Host types a column value can be read into
pub trait FromValue: Sized {
    /// The tag of the codec that produces this type
    const KIND: ValueKind;

    fn from_value(value: Value) -> Result<Self>;

    fn from_null() -> Result<Self> {
        Err(Error::DataConversion(format!(
            "NULL cannot be read as {}",
            std::any::type_name::<Self>()
        )))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Some)
    }

    fn from_null() -> Result<Self> {
        Ok(None)
    }
}

macro_rules! impl_from_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(mismatch(stringify!($ty), &other)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_value!(bool, Bool, Bool);
impl_from_value!(i8, I8, I8);
impl_from_value!(i16, I16, I16);
impl_from_value!(i32, I32, I32);
impl_from_value!(i64, I64, I64);
impl_from_value!(u64, U64, U64);
impl_from_value!(f32, F32, F32);
impl_from_value!(f64, F64, F64);
impl_from_value!(Decimal, Decimal, Decimal);
impl_from_value!(String, String, String);
impl_from_value!(Vec<u8>, Bytes, Bytes);
impl_from_value!(NaiveDate, Date, Date);
impl_from_value!(NaiveTime, Time, Time);
impl_from_value!(TimeDelta, Duration, Duration);
impl_from_value!(NaiveDateTime, DateTime, DateTime);
impl_from_value!(DateTime<FixedOffset>, Timestamp, Timestamp);

/// Unsigned host types narrower than u64 read through the 64-bit codec with a range check.
macro_rules! impl_from_value_unsigned {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::U64;

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::U64(v) => <$ty>::try_from(v).map_err(|_| {
                        Error::DataConversion(format!(
                            "value {v} is out of range of {}",
                            stringify!($ty)
                        ))
                    }),
                    other => Err(mismatch(stringify!($ty), &other)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::U64(u64::from(v))
            }
        }
    )*};
}

impl_from_value_unsigned!(u8, u16, u32);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_index_matches_table_order() {
        for (i, kind) in ValueKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn option_reads_null() {
        assert_eq!(Option::<i32>::from_null().unwrap(), None);
        assert!(i32::from_null().is_err());
        assert_eq!(Option::<i32>::from_value(Value::I32(7)).unwrap(), Some(7));
    }

    #[test]
    fn narrow_unsigned_checks_range() {
        assert_eq!(u8::from_value(Value::U64(255)).unwrap(), 255);
        assert!(matches!(
            u8::from_value(Value::U64(256)),
            Err(Error::DataConversion(_))
        ));
        assert_eq!(Value::from(7u16), Value::U64(7));
    }

    #[test]
    fn wrong_variant_is_a_conversion_error() {
        assert!(matches!(
            i64::from_value(Value::String("1".into())),
            Err(Error::DataConversion(_))
        ));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
