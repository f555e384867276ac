use chrono::FixedOffset;
use rust_decimal::Decimal;

use super::integer::{decode_integer, is_integer_source};
use super::{Codec, CodecContext, Value, ValueKind, as_str, unexpected_value};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// DECIMAL as `rust_decimal::Decimal`
#[derive(Debug)]
pub struct DecimalCodec;

impl DecimalCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a Decimal> {
        match value {
            Value::Decimal(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }

    fn decode(&self, data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<Value> {
        let column_type = col.column_type;
        if column_type.is_integer() || column_type == ColumnType::MYSQL_TYPE_BIT {
            let v = decode_integer(data, col, binary)?;
            return Decimal::try_from_i128_with_scale(v, 0)
                .map(Value::Decimal)
                .map_err(|_| out_of_range(&v.to_string(), col));
        }
        if binary && column_type.is_float() {
            let v = if column_type == ColumnType::MYSQL_TYPE_FLOAT {
                f64::from(f32::from_bits(read_int_4(data)?.0))
            } else {
                f64::from_bits(read_int_8(data)?.0)
            };
            return Decimal::try_from(v)
                .map(Value::Decimal)
                .map_err(|_| out_of_range(&v.to_string(), col));
        }
        let text = as_str(data, col)?.trim();
        text.parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(text))
            .map(Value::Decimal)
            .map_err(|_| {
                Error::DataConversion(format!(
                    "value '{text}' of column '{}' is not a decimal",
                    col.name
                ))
            })
    }
}

fn out_of_range(text: &str, col: &ColumnDefinition) -> Error {
    Error::DataConversion(format!(
        "value {text} of column '{}' does not fit in a decimal",
        col.name
    ))
}

impl Codec for DecimalCodec {
    fn name(&self) -> &'static str {
        "DecimalCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Decimal
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
        self.decode(data, col, false)
    }

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        self.decode(data, col, true)
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        _ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        out.extend_from_slice(self.get(value)?.to_string().as_bytes());
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
        write_string_lenenc(out, &self.get(value)?.to_string());
        Ok(())
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_NEWDECIMAL
    }
}
