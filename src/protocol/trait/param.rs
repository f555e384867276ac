use auto_impl::auto_impl;
use chrono::FixedOffset;

use crate::codec::{Codec, CodecContext, Value, codec_for};
use crate::constant::ColumnType;
use crate::error::{Error, Result};

/// A statement parameter bound to the codec that encodes it
///
/// The three implementations are picked by the caller, not by inspecting the value:
/// - [`Parameter`] may hold NULL
/// - [`NonNullParameter`] is known to hold a value
/// - [`TimeZoneParameter`] encodes temporal values in a fixed zone
#[auto_impl(&, Box, Arc)]
pub trait Param {
    /// Returns true if this parameter is NULL
    fn is_null(&self) -> bool;

    fn codec(&self) -> &'static dyn Codec;

    /// Parameter type sent in COM_STMT_EXECUTE
    fn binary_type(&self) -> ColumnType {
        self.codec().binary_type()
    }

    fn is_unsigned(&self) -> bool {
        self.codec().is_unsigned()
    }

    /// Append the COM_STMT_EXECUTE value. Only called if `is_null` returns false.
    fn encode_binary(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()>;

    /// Append the value as an SQL literal
    fn encode_text(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()>;

    /// Whether the value can be streamed with COM_STMT_SEND_LONG_DATA
    fn can_encode_long_data(&self) -> bool {
        !self.is_null() && self.codec().can_encode_long_data()
    }

    /// Append the raw bytes to stream with COM_STMT_SEND_LONG_DATA
    fn encode_long_data(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Rendering for logs: the SQL literal, `<TYPE>` for streamed values, or `null`.
    ///
    /// Never fails. An unencodable value renders as `null`.
    fn debug_string(&self, ctx: &CodecContext) -> String {
        if self.is_null() {
            return "null".to_string();
        }
        if self.can_encode_long_data() {
            return format!("<{}>", self.binary_type().sql_name());
        }
        let mut out = Vec::new();
        match self.encode_text(&mut out, ctx) {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => "null".to_string(),
        }
    }
}

/// Parameter that may be NULL
#[derive(Debug, Clone)]
pub struct Parameter {
    codec: &'static dyn Codec,
    value: Value,
    length: Option<usize>,
}

impl Parameter {
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            codec: codec_for(value.kind()),
            value,
            length: None,
        }
    }

    /// Encode at most `length` bytes (characters for strings) of the value.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Param for Parameter {
    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn codec(&self) -> &'static dyn Codec {
        self.codec
    }

    fn encode_binary(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        if self.value.is_null() {
            return Ok(());
        }
        self.codec
            .encode_binary(out, ctx, &self.value, None, self.length)
    }

    fn encode_text(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        if self.value.is_null() {
            out.extend_from_slice(b"null");
            return Ok(());
        }
        self.codec.encode_text(out, ctx, &self.value, None, self.length)
    }

    fn encode_long_data(&self, out: &mut Vec<u8>) -> Result<()> {
        self.codec.encode_long_data(out, &self.value, self.length)
    }
}

/// Parameter statically known to hold a value
#[derive(Debug, Clone)]
pub struct NonNullParameter {
    codec: &'static dyn Codec,
    value: Value,
    length: Option<usize>,
}

impl NonNullParameter {
    pub fn new(value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        if value.is_null() {
            return Err(Error::BadUsageError(
                "NonNullParameter cannot hold NULL".to_string(),
            ));
        }
        Ok(Self {
            codec: codec_for(value.kind()),
            value,
            length: None,
        })
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }
}

impl Param for NonNullParameter {
    fn is_null(&self) -> bool {
        false
    }

    fn codec(&self) -> &'static dyn Codec {
        self.codec
    }

    fn encode_binary(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        self.codec
            .encode_binary(out, ctx, &self.value, None, self.length)
    }

    fn encode_text(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        self.codec.encode_text(out, ctx, &self.value, None, self.length)
    }

    fn encode_long_data(&self, out: &mut Vec<u8>) -> Result<()> {
        self.codec.encode_long_data(out, &self.value, self.length)
    }
}

/// Parameter encoded in a fixed time zone, whatever the session zone is
#[derive(Debug, Clone)]
pub struct TimeZoneParameter {
    codec: &'static dyn Codec,
    value: Value,
    time_zone: FixedOffset,
}

impl TimeZoneParameter {
    pub fn new(value: impl Into<Value>, time_zone: FixedOffset) -> Self {
        let value = value.into();
        Self {
            codec: codec_for(value.kind()),
            value,
            time_zone,
        }
    }
}

impl Param for TimeZoneParameter {
    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn codec(&self) -> &'static dyn Codec {
        self.codec
    }

    fn encode_binary(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        if self.value.is_null() {
            return Ok(());
        }
        self.codec
            .encode_binary(out, ctx, &self.value, Some(self.time_zone), None)
    }

    fn encode_text(&self, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        if self.value.is_null() {
            out.extend_from_slice(b"null");
            return Ok(());
        }
        self.codec
            .encode_text(out, ctx, &self.value, Some(self.time_zone), None)
    }

    fn encode_long_data(&self, out: &mut Vec<u8>) -> Result<()> {
        self.codec.encode_long_data(out, &self.value, None)
    }
}
