use std::io::Write;

use chrono::FixedOffset;

use super::integer::is_integer_source;
use super::{Codec, CodecContext, Value, ValueKind, as_str, bit_value, unexpected_value};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Read a field as a double.
fn decode_double(data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<f64> {
    let unsigned = col.is_unsigned();
    if col.column_type == ColumnType::MYSQL_TYPE_BIT {
        return Ok(bit_value(data)? as f64);
    }
    if binary {
        match col.column_type {
            ColumnType::MYSQL_TYPE_TINY => {
                let (v, _) = read_int_1(data)?;
                return Ok(if unsigned { f64::from(v) } else { f64::from(v as i8) });
            }
            ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
                let (v, _) = read_int_2(data)?;
                return Ok(if unsigned { f64::from(v) } else { f64::from(v as i16) });
            }
            ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
                let (v, _) = read_int_4(data)?;
                return Ok(if unsigned { f64::from(v) } else { f64::from(v as i32) });
            }
            ColumnType::MYSQL_TYPE_LONGLONG => {
                let (v, _) = read_int_8(data)?;
                return Ok(if unsigned { v as f64 } else { v as i64 as f64 });
            }
            ColumnType::MYSQL_TYPE_FLOAT => {
                let (v, _) = read_int_4(data)?;
                return Ok(f64::from(f32::from_bits(v)));
            }
            ColumnType::MYSQL_TYPE_DOUBLE => {
                let (v, _) = read_int_8(data)?;
                return Ok(f64::from_bits(v));
            }
            _ => {}
        }
    }
    let text = as_str(data, col)?.trim();
    text.parse::<f64>().map_err(|_| {
        Error::DataConversion(format!(
            "value '{text}' of column '{}' is not a number",
            col.name
        ))
    })
}

macro_rules! float_codec {
    ($(#[$meta:meta])* $codec:ident, $ty:ty, $kind:ident, $binary_type:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $codec;

        impl $codec {
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
                Ok(Value::$kind(decode_double(data, col, false)? as $ty))
            }

            fn decode_binary(
                &self,
                data: &[u8],
                col: &ColumnDefinition,
                _tz: Option<FixedOffset>,
                _ctx: &CodecContext,
            ) -> Result<Value> {
                Ok(Value::$kind(decode_double(data, col, true)? as $ty))
            }

            fn encode_text(
                &self,
                out: &mut Vec<u8>,
                _ctx: &CodecContext,
                value: &Value,
                _tz: Option<FixedOffset>,
                _length: Option<usize>,
            ) -> Result<()> {
                let v = self.get(value)?;
                if !v.is_finite() {
                    return Err(Error::DataConversion(format!(
                        "{v} has no SQL literal"
                    )));
                }
                // `{:?}` keeps a decimal point or exponent so the server parses a DOUBLE.
                write!(out, "{v:?}")?;
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
        }
    };
}

float_codec!(
    /// FLOAT as `f32`
    FloatCodec, f32, F32, MYSQL_TYPE_FLOAT
);
float_codec!(
    /// DOUBLE as `f64`
    DoubleCodec, f64, F64, MYSQL_TYPE_DOUBLE
);
