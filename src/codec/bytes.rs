use chrono::FixedOffset;

use super::{Codec, CodecContext, Value, ValueKind, unexpected_value, write_quoted};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::Result;
use crate::protocol::primitive::*;

fn is_bytes_source(col: &ColumnDefinition) -> bool {
    col.column_type.is_string_like()
        || matches!(
            col.column_type,
            ColumnType::MYSQL_TYPE_BIT
                | ColumnType::MYSQL_TYPE_NULL
                | ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL
                | ColumnType::MYSQL_TYPE_UNSUPPORTED
        )
}

fn truncated(data: &[u8], length: Option<usize>) -> &[u8] {
    match length {
        Some(len) if len < data.len() => &data[..len],
        _ => data,
    }
}

fn write_binary_literal(out: &mut Vec<u8>, ctx: &CodecContext, data: &[u8]) {
    out.extend_from_slice(b"_binary ");
    write_quoted(out, data, ctx.no_backslash_escapes);
}

/// VARBINARY / BINARY / BLOB read whole as `Vec<u8>`
#[derive(Debug)]
pub struct ByteArrayCodec;

impl ByteArrayCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a [u8]> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }
}

impl Codec for ByteArrayCodec {
    fn name(&self) -> &'static str {
        "ByteArrayCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Bytes
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_bytes_source(col)
    }

    fn decode_text(
        &self,
        data: &[u8],
        _col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::Bytes(data.to_vec()))
    }

    fn decode_binary(
        &self,
        data: &[u8],
        _col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::Bytes(data.to_vec()))
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        length: Option<usize>,
    ) -> Result<()> {
        write_binary_literal(out, ctx, truncated(self.get(value)?, length));
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
        write_bytes_lenenc(out, truncated(self.get(value)?, length));
        Ok(())
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_BLOB
    }
}

/// BLOB parameters that may be streamed with COM_STMT_SEND_LONG_DATA
#[derive(Debug)]
pub struct BlobCodec;

impl BlobCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a [u8]> {
        match value {
            Value::LongData(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }
}

impl Codec for BlobCodec {
    fn name(&self) -> &'static str {
        "BlobCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::LongData
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_bytes_source(col)
    }

    fn decode_text(
        &self,
        data: &[u8],
        _col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::LongData(data.to_vec()))
    }

    fn decode_binary(
        &self,
        data: &[u8],
        _col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::LongData(data.to_vec()))
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        length: Option<usize>,
    ) -> Result<()> {
        write_binary_literal(out, ctx, truncated(self.get(value)?, length));
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
        write_bytes_lenenc(out, truncated(self.get(value)?, length));
        Ok(())
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_BLOB
    }

    fn can_encode_long_data(&self) -> bool {
        true
    }

    fn encode_long_data(&self, out: &mut Vec<u8>, value: &Value, length: Option<usize>) -> Result<()> {
        out.extend_from_slice(truncated(self.get(value)?, length));
        Ok(())
    }
}
