use std::fmt::Write as _;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Timelike,
};
use zerocopy::FromBytes;

use super::{Codec, CodecContext, Value, ValueKind, as_str, unexpected_value, write_quoted};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::value::{
    Time8, Time12, Timestamp4, Timestamp7, Timestamp11, WireDateTime, WireTime,
};

const SECONDS_PER_DAY: i64 = 86_400;

// ─── Wire layouts ───────────────────────────────────────────────────────────

fn read_wire_date_time(data: &[u8]) -> Result<WireDateTime> {
    let wire = match data.len() {
        0 => WireDateTime::default(),
        4 => WireDateTime::from(Timestamp4::ref_from_bytes(data).map_err(Error::from_debug)?),
        7 => WireDateTime::from(Timestamp7::ref_from_bytes(data).map_err(Error::from_debug)?),
        11 => WireDateTime::from(Timestamp11::ref_from_bytes(data).map_err(Error::from_debug)?),
        len => {
            return Err(Error::ProtocolInvariant(format!(
                "invalid date-time length: {len}"
            )));
        }
    };
    Ok(wire)
}

fn read_wire_time(data: &[u8]) -> Result<WireTime> {
    let wire = match data.len() {
        0 => WireTime::default(),
        8 => WireTime::from(Time8::ref_from_bytes(data).map_err(Error::from_debug)?),
        12 => WireTime::from(Time12::ref_from_bytes(data).map_err(Error::from_debug)?),
        len => return Err(Error::ProtocolInvariant(format!("invalid time length: {len}"))),
    };
    Ok(wire)
}

fn invalid(what: &str, col: &ColumnDefinition) -> Error {
    Error::DataConversion(format!(
        "column '{}' holds an invalid {what}",
        col.name
    ))
}

/// `None` for the zero date.
fn wire_to_naive(wire: &WireDateTime, col: &ColumnDefinition) -> Result<Option<NaiveDateTime>> {
    if wire.year == 0 && wire.month == 0 && wire.day == 0 {
        return Ok(None);
    }
    let date = NaiveDate::from_ymd_opt(
        i32::from(wire.year),
        u32::from(wire.month),
        u32::from(wire.day),
    )
    .ok_or_else(|| invalid("date", col))?;
    let time = NaiveTime::from_hms_micro_opt(
        u32::from(wire.hour),
        u32::from(wire.minute),
        u32::from(wire.second),
        wire.microsecond,
    )
    .ok_or_else(|| invalid("time", col))?;
    Ok(Some(NaiveDateTime::new(date, time)))
}

fn wire_time_to_delta(wire: &WireTime) -> TimeDelta {
    let secs = i64::from(wire.days) * SECONDS_PER_DAY
        + i64::from(wire.hour) * 3600
        + i64::from(wire.minute) * 60
        + i64::from(wire.second);
    let delta = TimeDelta::seconds(secs) + TimeDelta::microseconds(i64::from(wire.microsecond));
    if wire.is_negative { -delta } else { delta }
}

fn delta_to_time(delta: TimeDelta, col: &ColumnDefinition) -> Result<NaiveTime> {
    if delta < TimeDelta::zero() || delta >= TimeDelta::seconds(SECONDS_PER_DAY) {
        return Err(Error::DataConversion(format!(
            "TIME value {} of column '{}' is not a time of day",
            format_duration(&delta, 6),
            col.name
        )));
    }
    let secs = delta.num_seconds();
    let micros = delta.subsec_nanos() / 1000;
    NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, micros as u32 * 1000)
        .ok_or_else(|| invalid("time", col))
}

// ─── Text forms ─────────────────────────────────────────────────────────────

/// Microseconds from the digits after the decimal point.
fn parse_fraction(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut micros = 0u32;
    for (i, b) in digits.bytes().take(6).enumerate() {
        micros += u32::from(b - b'0') * 10u32.pow(5 - i as u32);
    }
    Some(micros)
}

/// Parse `[-]HHH:MM:SS[.ffffff]`.
fn parse_duration_text(text: &str) -> Option<TimeDelta> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (hms, fraction) = match body.split_once('.') {
        Some((hms, fraction)) => (hms, parse_fraction(fraction)?),
        None => (body, 0),
    };
    let mut parts = hms.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some()
        || hours < 0
        || !(0..60).contains(&minutes)
        || !(0..60).contains(&seconds)
    {
        return None;
    }
    let seconds = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?;
    let delta = TimeDelta::try_seconds(seconds)?
        .checked_add(&TimeDelta::microseconds(i64::from(fraction)))?;
    Some(if negative { -delta } else { delta })
}

fn is_zero_date_text(text: &str) -> bool {
    text.starts_with("0000-00-00")
}

/// Parse `YYYY-MM-DD[( |T)HH:MM:SS[.ffffff]]`. `Ok(None)` for the zero date.
fn parse_date_time_text(text: &str, col: &ColumnDefinition) -> Result<Option<NaiveDateTime>> {
    let text = text.trim();
    if is_zero_date_text(text) {
        return Ok(None);
    }
    let (date, time) = match text.find([' ', 'T']) {
        Some(i) => (&text[..i], Some(&text[i + 1..])),
        None => (text, None),
    };
    let date =
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid("date", col))?;
    let time = match time {
        Some(time) => parse_duration_text(time)
            .and_then(|delta| delta_to_time(delta, col).ok())
            .ok_or_else(|| invalid("time", col))?,
        None => NaiveTime::MIN,
    };
    Ok(Some(NaiveDateTime::new(date, time)))
}

fn push_fraction(out: &mut String, micros: u32, decimals: u8) {
    let digits = usize::from(decimals.min(6));
    if digits > 0 {
        let _ = write!(out, ".{micros:06}");
        out.truncate(out.len() - (6 - digits));
    }
}

fn needed_decimals(micros: u32) -> u8 {
    if micros == 0 { 0 } else { 6 }
}

fn micros_of(time: &NaiveTime) -> u32 {
    (time.nanosecond() / 1000).min(999_999)
}

pub(crate) fn format_time(time: &NaiveTime, decimals: u8) -> String {
    let mut out = time.format("%H:%M:%S").to_string();
    push_fraction(&mut out, micros_of(time), decimals);
    out
}

pub(crate) fn format_date_time(dt: &NaiveDateTime, decimals: u8) -> String {
    let mut out = dt.format("%Y-%m-%d %H:%M:%S").to_string();
    push_fraction(&mut out, micros_of(&dt.time()), decimals);
    out
}

pub(crate) fn format_duration(delta: &TimeDelta, decimals: u8) -> String {
    let negative = *delta < TimeDelta::zero();
    let abs = if negative { -*delta } else { *delta };
    let secs = abs.num_seconds();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    push_fraction(&mut out, abs.subsec_nanos() as u32 / 1000, decimals);
    out
}

// ─── Binary forms ───────────────────────────────────────────────────────────

/// Years outside the 2-byte wire field cannot be sent.
fn wire_year(year: i32) -> Result<u16> {
    u16::try_from(year)
        .map_err(|_| Error::DataConversion(format!("year {year} does not fit in the wire format")))
}

fn write_date_binary(out: &mut Vec<u8>, date: &NaiveDate) -> Result<()> {
    let year = wire_year(date.year())?;
    out.push(4);
    out.extend_from_slice(&year.to_le_bytes());
    out.push(date.month() as u8);
    out.push(date.day() as u8);
    Ok(())
}

fn write_date_time_binary(out: &mut Vec<u8>, dt: &NaiveDateTime) -> Result<()> {
    let year = wire_year(dt.year())?;
    let micros = micros_of(&dt.time());
    out.push(if micros == 0 { 7 } else { 11 });
    out.extend_from_slice(&year.to_le_bytes());
    out.push(dt.month() as u8);
    out.push(dt.day() as u8);
    out.push(dt.hour() as u8);
    out.push(dt.minute() as u8);
    out.push(dt.second() as u8);
    if micros != 0 {
        out.extend_from_slice(&micros.to_le_bytes());
    }
    Ok(())
}

/// `secs` is the absolute value; the sign travels in `negative`.
fn write_time_binary(out: &mut Vec<u8>, negative: bool, secs: i64, micros: u32) -> Result<()> {
    let days = u32::try_from(secs / SECONDS_PER_DAY).map_err(|_| {
        Error::DataConversion(format!("duration of {secs} seconds does not fit in the wire format"))
    })?;
    out.push(if micros == 0 { 8 } else { 12 });
    out.push(u8::from(negative));
    out.extend_from_slice(&days.to_le_bytes());
    let secs = secs % SECONDS_PER_DAY;
    out.push((secs / 3600) as u8);
    out.push(((secs / 60) % 60) as u8);
    out.push((secs % 60) as u8);
    if micros != 0 {
        out.extend_from_slice(&micros.to_le_bytes());
    }
    Ok(())
}

// ─── Shared decoding ────────────────────────────────────────────────────────

/// Read a DATE/DATETIME/TIMESTAMP or textual column as a date-time. `None` for zero dates.
fn decode_date_time(data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<Option<NaiveDateTime>> {
    match col.column_type {
        ColumnType::MYSQL_TYPE_TIME => {
            let delta = if binary {
                wire_time_to_delta(&read_wire_time(data)?)
            } else {
                parse_duration_text(as_str(data, col)?.trim())
                    .ok_or_else(|| invalid("time", col))?
            };
            let time = delta_to_time(delta, col)?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or_else(|| invalid("date", col))?;
            Ok(Some(NaiveDateTime::new(epoch, time)))
        }
        column_type if binary && column_type.is_date_like() => {
            wire_to_naive(&read_wire_date_time(data)?, col)
        }
        _ => parse_date_time_text(as_str(data, col)?, col),
    }
}

fn decode_duration(data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<TimeDelta> {
    if binary && col.column_type == ColumnType::MYSQL_TYPE_TIME {
        return Ok(wire_time_to_delta(&read_wire_time(data)?));
    }
    let text = as_str(data, col)?.trim();
    parse_duration_text(text).ok_or_else(|| invalid("time", col))
}

fn is_date_source(col: &ColumnDefinition) -> bool {
    col.column_type.is_date_like()
        || col.column_type.is_string_like()
        || col.column_type == ColumnType::MYSQL_TYPE_NULL
}

fn is_time_source(col: &ColumnDefinition) -> bool {
    col.column_type == ColumnType::MYSQL_TYPE_TIME
        || col.column_type.is_string_like()
        || col.column_type == ColumnType::MYSQL_TYPE_NULL
}

fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    value.map(f).unwrap_or(Value::Null)
}

// ─── Codecs ─────────────────────────────────────────────────────────────────

/// DATE as `NaiveDate`
///
/// `0000-00-00` reads as NULL.
#[derive(Debug)]
pub struct DateCodec;

impl DateCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a NaiveDate> {
        match value {
            Value::Date(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }
}

impl Codec for DateCodec {
    fn name(&self) -> &'static str {
        "DateCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Date
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_date_source(col)
    }

    fn decode_text(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(or_null(decode_date_time(data, col, false)?, |dt| {
            Value::Date(dt.date())
        }))
    }

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(or_null(decode_date_time(data, col, true)?, |dt| {
            Value::Date(dt.date())
        }))
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        let text = self.get(value)?.format("%Y-%m-%d").to_string();
        write_quoted(out, text.as_bytes(), ctx.no_backslash_escapes);
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
        write_date_binary(out, self.get(value)?)
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_DATE
    }
}

/// TIME within one day as `NaiveTime`
#[derive(Debug)]
pub struct TimeCodec;

impl TimeCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a NaiveTime> {
        match value {
            Value::Time(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }

    fn decode(&self, data: &[u8], col: &ColumnDefinition, binary: bool) -> Result<Value> {
        if col.column_type.is_date_like() {
            return Ok(or_null(decode_date_time(data, col, binary)?, |dt| {
                Value::Time(dt.time())
            }));
        }
        Ok(Value::Time(delta_to_time(
            decode_duration(data, col, binary)?,
            col,
        )?))
    }
}

impl Codec for TimeCodec {
    fn name(&self) -> &'static str {
        "TimeCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Time
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_time_source(col)
            || matches!(
                col.column_type,
                ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP
            )
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
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        let time = self.get(value)?;
        let text = format_time(time, needed_decimals(micros_of(time)));
        write_quoted(out, text.as_bytes(), ctx.no_backslash_escapes);
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
        let time = self.get(value)?;
        write_time_binary(
            out,
            false,
            i64::from(time.num_seconds_from_midnight()),
            micros_of(time),
        )
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_TIME
    }
}

/// Signed TIME as `TimeDelta`, covering the full `-838:59:59` to `838:59:59` range
#[derive(Debug)]
pub struct DurationCodec;

impl DurationCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a TimeDelta> {
        match value {
            Value::Duration(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }
}

impl Codec for DurationCodec {
    fn name(&self) -> &'static str {
        "DurationCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Duration
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_time_source(col)
    }

    fn decode_text(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::Duration(decode_duration(data, col, false)?))
    }

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(Value::Duration(decode_duration(data, col, true)?))
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        let delta = self.get(value)?;
        let micros = delta.subsec_nanos().unsigned_abs() / 1000;
        let text = format_duration(delta, needed_decimals(micros));
        write_quoted(out, text.as_bytes(), ctx.no_backslash_escapes);
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
        let delta = *self.get(value)?;
        let negative = delta < TimeDelta::zero();
        let abs = if negative { -delta } else { delta };
        write_time_binary(
            out,
            negative,
            abs.num_seconds(),
            abs.subsec_nanos() as u32 / 1000,
        )
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_TIME
    }
}

/// DATETIME as `NaiveDateTime`, with no zone conversion
#[derive(Debug)]
pub struct DateTimeCodec;

impl DateTimeCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a NaiveDateTime> {
        match value {
            Value::DateTime(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }
}

impl Codec for DateTimeCodec {
    fn name(&self) -> &'static str {
        "DateTimeCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::DateTime
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_date_source(col) || col.column_type == ColumnType::MYSQL_TYPE_TIME
    }

    fn decode_text(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(or_null(decode_date_time(data, col, false)?, Value::DateTime))
    }

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        _tz: Option<FixedOffset>,
        _ctx: &CodecContext,
    ) -> Result<Value> {
        Ok(or_null(decode_date_time(data, col, true)?, Value::DateTime))
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        _tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        let dt = self.get(value)?;
        let text = format_date_time(dt, needed_decimals(micros_of(&dt.time())));
        write_quoted(out, text.as_bytes(), ctx.no_backslash_escapes);
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
        write_date_time_binary(out, self.get(value)?)
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_DATETIME
    }
}

/// TIMESTAMP / DATETIME as a zone-aware `DateTime<FixedOffset>`
///
/// Wall-clock values on the wire are interpreted in the explicit zone if one is given,
/// otherwise in the session zone. Encoding converts into that zone first.
#[derive(Debug)]
pub struct TimestampCodec;

impl TimestampCodec {
    fn get<'a>(&self, value: &'a Value) -> Result<&'a DateTime<FixedOffset>> {
        match value {
            Value::Timestamp(v) => Ok(v),
            other => Err(unexpected_value(self, other)),
        }
    }

    fn localize(
        &self,
        naive: Option<NaiveDateTime>,
        col: &ColumnDefinition,
        tz: Option<FixedOffset>,
        ctx: &CodecContext,
    ) -> Result<Value> {
        let Some(naive) = naive else {
            return Ok(Value::Null);
        };
        ctx.zone(tz)
            .from_local_datetime(&naive)
            .single()
            .map(Value::Timestamp)
            .ok_or_else(|| invalid("timestamp", col))
    }

    fn to_local(&self, value: &Value, tz: Option<FixedOffset>, ctx: &CodecContext) -> Result<NaiveDateTime> {
        Ok(self.get(value)?.with_timezone(&ctx.zone(tz)).naive_local())
    }
}

impl Codec for TimestampCodec {
    fn name(&self) -> &'static str {
        "TimestampCodec"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Timestamp
    }

    fn can_decode(&self, col: &ColumnDefinition) -> bool {
        is_date_source(col)
    }

    fn decode_text(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        tz: Option<FixedOffset>,
        ctx: &CodecContext,
    ) -> Result<Value> {
        self.localize(decode_date_time(data, col, false)?, col, tz, ctx)
    }

    fn decode_binary(
        &self,
        data: &[u8],
        col: &ColumnDefinition,
        tz: Option<FixedOffset>,
        ctx: &CodecContext,
    ) -> Result<Value> {
        self.localize(decode_date_time(data, col, true)?, col, tz, ctx)
    }

    fn encode_text(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        let local = self.to_local(value, tz, ctx)?;
        let text = format_date_time(&local, needed_decimals(micros_of(&local.time())));
        write_quoted(out, text.as_bytes(), ctx.no_backslash_escapes);
        Ok(())
    }

    fn encode_binary(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        value: &Value,
        tz: Option<FixedOffset>,
        _length: Option<usize>,
    ) -> Result<()> {
        write_date_time_binary(out, &self.to_local(value, tz, ctx)?)
    }

    fn binary_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_DATETIME
    }
}
