//! Per-type value codecs.
//!
//! One stateless codec per host value kind. Each codec decodes from both the text and the
//! binary row encodings and encodes parameters into both wire formats. Codecs are looked up
//! through a table indexed by [`ValueKind`], never by inspecting host types at runtime.

mod boolean;
mod bytes;
mod decimal;
mod float;
mod integer;
mod string;
mod temporal;
pub mod value;


use std::sync::LazyLock;

use chrono::{FixedOffset, Offset, Utc};

use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::{Error, Result};

pub use boolean::BooleanCodec;
pub use bytes::{BlobCodec, ByteArrayCodec};
pub use decimal::DecimalCodec;
pub use float::{DoubleCodec, FloatCodec};
pub use integer::{ByteCodec, IntCodec, LongCodec, ShortCodec, UnsignedLongCodec};
pub use string::StringCodec;
pub use temporal::{DateCodec, DateTimeCodec, DurationCodec, TimeCodec, TimestampCodec};
pub use value::{FromValue, Value, ValueKind};

/// Session state codecs need
#[derive(Debug, Clone, Copy)]
pub struct CodecContext {
    /// Session time zone, used when no explicit zone is given
    pub time_zone: FixedOffset,
    /// `SERVER_STATUS_NO_BACKSLASH_ESCAPES`: only quotes are escaped in string literals
    pub no_backslash_escapes: bool,
}

impl Default for CodecContext {
    fn default() -> Self {
        Self {
            time_zone: utc(),
            no_backslash_escapes: false,
        }
    }
}

impl CodecContext {
    /// The explicit zone if given, otherwise the session zone.
    #[inline]
    pub fn zone(&self, tz: Option<FixedOffset>) -> FixedOffset {
        tz.unwrap_or(self.time_zone)
    }
}

pub(crate) fn utc() -> FixedOffset {
    Utc.fix()
}

/// A value codec for one host value kind
///
/// `data` passed to the decode methods is exactly the field's bytes, without any length prefix.
pub trait Codec: std::fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// The value kind this codec decodes into and encodes from
    fn kind(&self) -> ValueKind;

    /// Whether a column can be read as this codec's kind
    fn can_decode(&self, col: &ColumnDefinition) -> bool;

    /// Whether this codec can encode `value`
    fn can_encode(&self, value: &Value) -> bool {
        value.kind() == self.kind()
    }

    fn decode_text(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        tz: Option<FixedOffset>,
        ctx: &CodecContext,
    ) -> Result<Value>;

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        tz: Option<FixedOffset>,
        ctx: &CodecContext,
    ) -> Result<Value>;

    /// Append `value` as an SQL literal for client-side parameter substitution
    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        tz: Option<FixedOffset>,
        length: Option<usize>,
    ) -> Result<()>;

    /// Append `value` in its COM_STMT_EXECUTE layout
    fn encode_binary(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        tz: Option<FixedOffset>,
        length: Option<usize>,
    ) -> Result<()>;

    /// Parameter type announced in COM_STMT_EXECUTE
    fn binary_type(&self) -> ColumnType;

    /// Whether the parameter type carries the unsigned flag
    fn is_unsigned(&self) -> bool {
        false
    }

    /// Whether values can be sent with COM_STMT_SEND_LONG_DATA
    fn can_encode_long_data(&self) -> bool {
        false
    }

    /// Append the raw bytes streamed by COM_STMT_SEND_LONG_DATA
    fn encode_long_data(&self, _out: &mut Vec<u8>, value: &Value, _length: Option<usize>) -> Result<()> {
        Err(Error::BadUsageError(format!(
            "{} does not stream {:?} as long data",
            self.name(),
            value.kind()
        )))
    }
}

/// Codec for `Value::Null`. Every column can be read as NULL.
#[derive(Debug)]
pub struct NullCodec;

impl Codec for NullCodec {
    fn name(&self) -> &'static str {
        "NullCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Null
    }

    fn can_decode(&self, _col: &ColumnDefinition) -> bool {
        true
    }

    fn decode_text(
        &self,
        _data: &[u8],
        _col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::Null)
    }

    fn decode_binary(
        &self,
        _data: &[u8],
        _col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::Null)
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        _ctx: &CodecContext,
        _value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        out.extend_from_slice(b"null");
        Ok(())
    }

    fn encode_binary(
        &self,
        _out: &mut Vec<u8>,
        _ctx: &CodecContext,
        _value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        Ok(())
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_NULL
    }
}

static CODECS: LazyLock<[&'static dyn Codec; ValueKind::COUNT]> = LazyLock::new(|| {
    let table: [&'static dyn Codec; ValueKind::COUNT] = [
        &NullCodec,
        &BooleanCodec,
        &ByteCodec,
        &ShortCodec,
        &IntCodec,
        &LongCodec,
        &UnsignedLongCodec,
        &FloatCodec,
        &DoubleCodec,
        &DecimalCodec,
        &StringCodec,
        &ByteArrayCodec,
        &BlobCodec,
        &DateCodec,
        &TimeCodec,
        &DurationCodec,
        &DateTimeCodec,
        &TimestampCodec,
    ];
    debug_assert!(
        table
            .iter()
            .zip(ValueKind::ALL)
            .all(|(codec, kind)| codec.kind() == kind)
    );
    table
});

/// The codec that produces values of `kind`.
#[inline]
pub fn codec_for(kind: ValueKind) -> &'static dyn Codec {
    CODECS[kind.index()]
}

/// The codec that encodes `value`.
pub fn codec_for_value(value: &Value) -> Result<&'static dyn Codec> {
    let codec = codec_for(value.kind());
    if codec.can_encode(value) {
        Ok(codec)
    } else {
        Err(Error::BadUsageError(format!(
            "no codec can encode {:?}",
            value.kind()
        )))
    }
}

/// The codec for reading `col` as `kind`, or a conversion error naming both.
pub fn decoder_for(col: &ColumnDefinition, kind: ValueKind) -> Result<&'static dyn Codec> {
    let codec = codec_for(kind);
    if codec.can_decode(col) {
        Ok(codec)
    } else {
        Err(Error::DataConversion(format!(
            "column '{}' of type {} cannot be read as {:?}",
            col.name,
            col.column_type.sql_name(),
            kind
        )))
    }
}

/// The kind a column decodes to when the caller does not ask for a specific host type.
pub fn natural_kind(col: &ColumnDefinition) -> ValueKind {
    let unsigned = col.is_unsigned();
    match col.column_type {
        ColumnType::MYSQL_TYPE_NULL => ValueKind::Null,
        ColumnType::MYSQL_TYPE_TINY if unsigned => ValueKind::I16,
        ColumnType::MYSQL_TYPE_TINY => ValueKind::I8,
        ColumnType::MYSQL_TYPE_SHORT if unsigned => ValueKind::I32,
        ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => ValueKind::I16,
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG if unsigned => ValueKind::I64,
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => ValueKind::I32,
        ColumnType::MYSQL_TYPE_LONGLONG if unsigned => ValueKind::U64,
        ColumnType::MYSQL_TYPE_LONGLONG => ValueKind::I64,
        ColumnType::MYSQL_TYPE_FLOAT => ValueKind::F32,
        ColumnType::MYSQL_TYPE_DOUBLE => ValueKind::F64,
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => ValueKind::Decimal,
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => ValueKind::Date,
        ColumnType::MYSQL_TYPE_TIME => ValueKind::Duration,
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => ValueKind::DateTime,
        ColumnType::MYSQL_TYPE_BIT if col.column_length == 1 => ValueKind::Bool,
        ColumnType::MYSQL_TYPE_BIT
        | ColumnType::MYSQL_TYPE_GEOMETRY
        | ColumnType::MYSQL_TYPE_UNSUPPORTED => ValueKind::Bytes,
        _ if col.is_binary() => ValueKind::Bytes,
        _ => ValueKind::String,
    }
}

/// Decode a field with the codec for `kind`.
pub fn decode(
    kind: ValueKind,
    data: &[u8],
    col: &ColumnDefinition,
    binary: bool,
    tz: Option<FixedOffset>,
    ctx: &CodecContext,
) -> Result<Value> {
    let codec = decoder_for(col, kind)?;
    if binary {
        codec.decode_binary(data, col, tz, ctx)
    } else {
        codec.decode_text(data, col, tz, ctx)
    }
}

// ─── Helpers shared by the codecs ───────────────────────────────────────────

/// Validate UTF-8 text on the fast path.
pub(crate) fn as_str<'a>(data: &'a [u8], col: &ColumnDefinition) -> Result<&'a str> {
    simdutf8::basic::from_utf8(data).map_err(|_| {
        Error::DataConversion(format!("column '{}' does not hold valid UTF-8", col.name))
    })
}

pub(crate) fn unexpected_value(codec: &dyn Codec, value: &Value) -> Error {
    Error::BadUsageError(format!("{} cannot encode {:?}", codec.name(), value.kind()))
}

/// Append `data` quoted as an SQL string literal.
pub(crate) fn write_quoted(out: &mut Vec<u8>, data: &[u8], no_backslash_escapes: bool) {
    out.push(b'\'');
    if no_backslash_escapes {
        for &byte in data {
            if byte == b'\'' {
                out.push(b'\'');
            }
            out.push(byte);
        }
    } else {
        for &byte in data {
            match byte {
                0 => out.extend_from_slice(b"\\0"),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                0x1a => out.extend_from_slice(b"\\Z"),
                b'\\' | b'\'' | b'"' => {
                    out.push(b'\\');
                    out.push(byte);
                }
                _ => out.push(byte),
            }
        }
    }
    out.push(b'\'');
}

/// Read the big-endian bytes of a BIT value.
pub(crate) fn bit_value(data: &[u8]) -> Result<u64> {
    if data.len() > 8 {
        return Err(Error::DataConversion(format!(
            "BIT value of {} bytes exceeds 64 bits",
            data.len()
        )));
    }
    Ok(data.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}
