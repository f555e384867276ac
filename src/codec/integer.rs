use std::io::Write;

use chrono::FixedOffset;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::{Codec, CodecContext, Value, ValueKind, as_str, bit_value, unexpected_value};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Whether a column holds something an integer can be read from.
pub(crate) fn is_integer_source(col: &ColumnDefinition) -> bool {
    col.column_type.is_numeric()
        || col.column_type.is_string_like()
        || matches!(
            col.column_type,
            ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_NULL
        )
}

/// Read a field as an integer. Fractional parts are truncated toward zero.
pub(crate) fn decode_integer(data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<i128> {
    let unsigned = col.is_unsigned();
    match col.column_type {
        ColumnType::MYSQL_TYPE_BIT => return Ok(i128::from(bit_value(data)?)),
        _ if !binary => return parse_integer(as_str(data, col)?, col),
        ColumnType::MYSQL_TYPE_TINY => {
            let (v, _) = read_int_1(data)?;
            return Ok(if unsigned { i128::from(v) } else { i128::from(v as i8) });
        }
        ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
            let (v, _) = read_int_2(data)?;
            return Ok(if unsigned { i128::from(v) } else { i128::from(v as i16) });
        }
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
            let (v, _) = read_int_4(data)?;
            return Ok(if unsigned { i128::from(v) } else { i128::from(v as i32) });
        }
        ColumnType::MYSQL_TYPE_LONGLONG => {
            let (v, _) = read_int_8(data)?;
            return Ok(if unsigned { i128::from(v) } else { i128::from(v as i64) });
        }
        ColumnType::MYSQL_TYPE_FLOAT => {
            let (v, _) = read_int_4(data)?;
            return float_to_integer(f64::from(f32::from_bits(v)), col);
        }
        ColumnType::MYSQL_TYPE_DOUBLE => {
            let (v, _) = read_int_8(data)?;
            return float_to_integer(f64::from_bits(v), col);
        }
        _ => {}
    }
    // DECIMAL and string columns travel as text in both protocols.
    parse_integer(as_str(data, col)?, col)
}

fn parse_integer(text: &str, col: &ColumnDefinition) -> Result<i128> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i128>() {
        return Ok(v);
    }
    if let Ok(d) = text.parse::<Decimal>() {
        if let Some(v) = d.trunc().to_i128() {
            return Ok(v);
        }
    }
    if let Ok(f) = text.parse::<f64>() {
        return float_to_integer(f, col);
    }
    Err(Error::DataConversion(format!(
        "value '{text}' of column '{}' is not a number",
        col.name
    )))
}

fn float_to_integer(f: f64, col: &ColumnDefinition) -> Result<i128> {
    // i128::MAX is about 1.7e38
    if !f.is_finite() || f.abs() >= 1.0e38 {
        return Err(Error::DataConversion(format!(
            "value {f} of column '{}' cannot be read as an integer",
            col.name
        )));
    }
    Ok(f.trunc() as i128)
}

fn out_of_range(value: i128, col: &ColumnDefinition, sql: &str) -> Error {
    Error::DataConversion(format!(
        "value {value} of column '{}' is out of range of {sql}",
        col.name
    ))
}

macro_rules! integer_codec {
    (
        $(#[$meta:meta])*
        $codec:ident, $ty:ty, $kind:ident, $binary_type:ident, $sql:literal, unsigned = $unsigned:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $codec;

        impl $codec {
            fn narrow(&self, value: i128, col: &ColumnDefinition) -> Result<Value> {
                <$ty>::try_from(value)
                    .map(Value::$kind)
                    .map_err(|_| out_of_range(value, col, $sql))
            }

            fn get(&self, value: &Value) -> Result<$ty> {
                match value {
                    Value::$kind(v) => Ok(*v),
                    other => Err(unexpected_value(self, other)),
                }
            }
        }

        impl Codec for $codec {
            fn name(&self) -> &'static str {
                stringify!($codec)
            }

            fn kind(&self) -> ValueKind {
                ValueKind::$kind
            }

            fn can_decode(&self, col: &ColumnDefinition) -> bool {
                is_integer_source(col)
            }

            fn decode_text(
                &self,
                data: &[u8],
                col: &ColumnDefinition,
                _tz: Option<FixedOffset>,
                _ctx: &CodecContext,
            ) -> Result<Value> {
                self.narrow(decode_integer(data, col, false)?, col)
            }

            fn decode_binary(
                &self,
                data: &[u8],
                col: &ColumnDefinition,
                _tz: Option<FixedOffset>,
                _ctx: &CodecContext,
            ) -> Result<Value> {
                self.narrow(decode_integer(data, col, true)?, col)
            }

            fn encode_text(
                &self,
                out: &mut Vec<u8>,
                _ctx: &CodecContext,
                value: &Value,
                _tz: Option<FixedOffset>,
                _length: Option<usize>,
            ) -> Result<()> {
                write!(out, "{}", self.get(value)?)?;
                Ok(())
            }

            fn encode_binary(
                &self,
                out: &mut Vec<u8>,
                _ctx: &CodecContext,
                value: &Value,
                _tz: Option<FixedOffset>,
                _length: Option<usize>,
            ) -> Result<()> {
                out.extend_from_slice(&self.get(value)?.to_le_bytes());
                Ok(())
            }

            fn binary_type(&self) -> ColumnType {
                ColumnType::$binary_type
            }

            fn is_unsigned(&self) -> bool {
                $unsigned
            }
        }
    };
}

integer_codec!(
    /// TINYINT as `i8`
    ByteCodec, i8, I8, MYSQL_TYPE_TINY, "TINYINT", unsigned = false
);
integer_codec!(
    /// SMALLINT as `i16`
    ShortCodec, i16, I16, MYSQL_TYPE_SHORT, "SMALLINT", unsigned = false
);
integer_codec!(
    /// INT as `i32`
    IntCodec, i32, I32, MYSQL_TYPE_LONG, "INT", unsigned = false
);
integer_codec!(
    /// BIGINT as `i64`
    LongCodec, i64, I64, MYSQL_TYPE_LONGLONG, "BIGINT", unsigned = false
);
integer_codec!(
    /// BIGINT UNSIGNED as `u64`
    UnsignedLongCodec, u64, U64, MYSQL_TYPE_LONGLONG, "BIGINT UNSIGNED", unsigned = true
);
