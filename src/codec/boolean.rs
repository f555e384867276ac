use chrono::FixedOffset;

use super::integer::{decode_integer, is_integer_source};
use super::{Codec, CodecContext, Value, ValueKind, as_str, unexpected_value};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::Result;

/// BOOLEAN (TINYINT(1)) and BIT(1) as `bool`
///
/// Numbers read as `true` when non-zero. Text reads `""`, `"0"` and `"false"` as `false`.
#[derive(Debug)]
pub struct BooleanCodec;

impl BooleanCodec {
    fn get(&self, value: &Value) -> Result<bool> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(unexpected_value(self, other)),
        }
    }

    fn decode(&self, data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<Value> {
        let column_type = col.column_type;
        if column_type.is_numeric() || column_type == ColumnType::MYSQL_TYPE_BIT {
            return Ok(Value::Bool(decode_integer(data, col, binary)? != 0));
        }
        let text = as_str(data, col)?.trim();
        let value = match text {
            "" | "0" => false,
            _ if text.eq_ignore_ascii_case("false") => false,
            _ => match text.parse::<f64>() {
                Ok(f) => f != 0.0,
                Err(_) => true,
            },
        };
        Ok(Value::Bool(value))
    }
}

impl Codec for BooleanCodec {
    fn name(&self) -> &'static str {
        "BooleanCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Bool
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
        out.push(if self.get(value)? { b'1' } else { b'0' });
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
        out.push(u8::from(self.get(value)?));
        Ok(())
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_TINY
    }
}
