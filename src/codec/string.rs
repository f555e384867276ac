use chrono::FixedOffset;

use super::temporal::{format_date_time, format_duration, format_time};
use super::{
    Codec, CodecContext, Value, ValueKind, as_str, bit_value, codec_for, natural_kind,
    unexpected_value, write_quoted,
};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::Result;
use crate::protocol::primitive::*;

/// CHAR / VARCHAR / TEXT / ENUM / SET / JSON as `String`
///
/// Any column can be read as a string. Binary-protocol numbers and temporals are rendered
/// the way the server renders them in the text protocol.
#[derive(Debug)]
pub struct StringCodec;

impl StringCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a str> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }
}

fn truncated(s: &str, length: Option<usize>) -> &str {
    match length.and_then(|len| s.char_indices().nth(len)) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

fn render(value: Value, col: &ColumnDefinition) -> String {
    match value {
        Value::Null if col.column_type.is_date_like() => {
            if col.column_type == ColumnType::MYSQL_TYPE_DATE {
                "0000-00-00".to_string()
            } else {
                "0000-00-00 00:00:00".to_string()
            }
        }
        Value::Null => String::new(),
        Value::Bool(v) => u8::from(v).to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::String(v) => v,
        Value::Bytes(v) | Value::LongData(v) => String::from_utf8_lossy(&v).into_owned(),
        Value::Date(v) => v.format("%Y-%m-%d").to_string(),
        Value::Time(v) => format_time(&v, col.decimals),
        Value::Duration(v) => format_duration(&v, col.decimals),
        Value::DateTime(v) => format_date_time(&v, col.decimals),
        Value::Timestamp(v) => format_date_time(&v.naive_local(), col.decimals),
    }
}

impl Codec for StringCodec {
    fn name(&self) -> &'static str {
        "StringCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn can_decode(&self, _col: &ColumnDefinition) -> bool {
        true
    }

    fn decode_text(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        if col.column_type == ColumnType::MYSQL_TYPE_BIT {
            return Ok(Value::String(bit_value(data)?.to_string()));
        }
        Ok(Value::String(as_str(data, col)?.to_owned()))
    }

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        tz: Option<FixedOffset>,
        ctx: &CodecContext,
    ) -> Result<Value> {
        let column_type = col.column_type;
        if column_type.is_string_like() || column_type.is_decimal() {
            return Ok(Value::String(as_str(data, col)?.to_owned()));
        }
        let kind = match natural_kind(col) {
            ValueKind::String => return Ok(Value::String(as_str(data, col)?.to_owned())),
            ValueKind::Bytes => return self.decode_text(data, col, tz, ctx),
            kind => kind,
        };
        let value = codec_for(kind).decode_binary(data, col, tz, ctx)?;
        Ok(Value::String(render(value, col)))
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        length: Option<usize>,
    ) -> Result<()> {
        let s = truncated(self.get(value)?, length);
        write_quoted(out, s.as_bytes(), ctx.no_backslash_escapes);
        Ok(())
    }

    fn encode_binary(
        &self,
        out: &mut Vec<u8>,
        _ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        length: Option<usize>,
    ) -> Result<()> {
        write_string_lenenc(out, truncated(self.get(value)?, length));
        Ok(())
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_VAR_STRING
    }
}
