use chrono::{FixedOffset, NaiveDate};
use pretty_assertions::assert_eq;

use crate::codec::{CodecContext, Value};
use crate::constant::ColumnType;
use crate::error::Error;
use crate::protocol::r#trait::param::{NonNullParameter, Param, Parameter, TimeZoneParameter};
use crate::protocol::r#trait::params::Params;

fn binary(param: &dyn Param) -> Vec<u8> {
    let mut out = Vec::new();
    param
        .encode_binary(&mut out, &CodecContext::default())
        .unwrap();
    out
}

fn text(param: &dyn Param) -> String {
    let mut out = Vec::new();
    param.encode_text(&mut out, &CodecContext::default()).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_param_i32() {
    let param = Parameter::new(-42i32);
    assert_eq!(param.binary_type(), ColumnType::MYSQL_TYPE_LONG);
    assert!(!param.is_unsigned());
    assert_eq!(binary(&param), (-42i32).to_le_bytes());
    assert_eq!(text(&param), "-42");
    assert!(!param.is_null());
}

#[test]
fn test_param_u64() {
    let param = Parameter::new(12345678901234u64);
    assert_eq!(param.binary_type(), ColumnType::MYSQL_TYPE_LONGLONG);
    assert!(param.is_unsigned());
    assert_eq!(binary(&param), 12345678901234u64.to_le_bytes());
}

#[test]
fn test_param_str() {
    let param = Parameter::new("Hello, MySQL!");
    assert_eq!(param.binary_type(), ColumnType::MYSQL_TYPE_VAR_STRING);
    let out = binary(&param);
    assert_eq!(out[0], 13);
    assert_eq!(&out[1..], b"Hello, MySQL!");
    assert_eq!(text(&param), "'Hello, MySQL!'");
}

#[test]
fn test_param_with_length() {
    let param = Parameter::new("abcdef").with_length(3);
    assert_eq!(binary(&param), b"\x03abc");
}

#[test]
fn test_param_null() {
    let param = Parameter::new(None::<i32>);
    assert!(param.is_null());
    assert!(binary(&param).is_empty());
    assert_eq!(text(&param), "null");
    assert!(!param.can_encode_long_data());
    assert_eq!(param.debug_string(&CodecContext::default()), "null");
}

#[test]
fn test_non_null_parameter_rejects_null() {
    assert!(matches!(
        NonNullParameter::new(Value::Null),
        Err(Error::BadUsageError(_))
    ));
    let param = NonNullParameter::new(7i64).unwrap();
    assert!(!param.is_null());
    assert_eq!(binary(&param), 7i64.to_le_bytes());
}

#[test]
fn test_time_zone_parameter_uses_its_own_zone() {
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let instant = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
        .fixed_offset();

    // the session zone is UTC, the parameter renders in +02:00
    let param = TimeZoneParameter::new(instant, plus_two);
    assert_eq!(text(&param), "'2024-01-01 14:00:00'");

    let session = Parameter::new(instant);
    assert_eq!(text(&session), "'2024-01-01 12:00:00'");
}

#[test]
fn test_long_data_debug_string() {
    let param = Parameter::new(Value::LongData(vec![1, 2, 3]));
    assert!(param.can_encode_long_data());
    assert_eq!(param.debug_string(&CodecContext::default()), "<BLOB>");

    let mut out = Vec::new();
    param.encode_long_data(&mut out).unwrap();
    assert_eq!(out, [1, 2, 3]);

    // inline bytes are not streamed
    let inline = Parameter::new(vec![1u8, 2, 3]);
    assert!(!inline.can_encode_long_data());
    let mut out = Vec::new();
    assert!(matches!(
        inline.encode_long_data(&mut out),
        Err(Error::BadUsageError(_))
    ));
}

#[test]
fn test_params_null_bitmap_and_types() {
    let params = vec![
        Parameter::new(1i32),
        Parameter::new(Value::Null),
        Parameter::new("x"),
        Parameter::new(2u64),
        Parameter::new(Value::Null),
        Parameter::new(3i8),
        Parameter::new(4i16),
        Parameter::new(5i64),
        Parameter::new(Value::Null),
    ];
    let mut bitmap = Vec::new();
    params.write_null_bitmap(&mut bitmap);
    assert_eq!(bitmap, [0b0001_0010, 0b0000_0001]);

    let mut types = Vec::new();
    params[..4].write_types(&mut types);
    assert_eq!(
        types,
        [
            ColumnType::MYSQL_TYPE_LONG.code(),
            0x00,
            ColumnType::MYSQL_TYPE_NULL.code(),
            0x00,
            ColumnType::MYSQL_TYPE_VAR_STRING.code(),
            0x00,
            ColumnType::MYSQL_TYPE_LONGLONG.code(),
            0x80,
        ]
    );
}

#[test]
fn test_params_values_skip_nulls_and_streamed() {
    let params = [
        Parameter::new(1i16),
        Parameter::new(Value::Null),
        Parameter::new(Value::LongData(vec![9; 4])),
        Parameter::new(true),
    ];
    let ctx = CodecContext::default();
    assert!(params.has_long_data());

    let mut inline = Vec::new();
    params.write_values(&mut inline, &ctx, false).unwrap();
    assert_eq!(inline, [1, 0, 4, 9, 9, 9, 9, 1]);

    let mut streamed = Vec::new();
    params.write_values(&mut streamed, &ctx, true).unwrap();
    assert_eq!(streamed, [1, 0, 1]);

    assert_eq!(params.debug_string(&ctx), "1,null,<BLOB>,1");
}

#[test]
fn test_empty_params() {
    let mut out = Vec::new();
    ().write_null_bitmap(&mut out);
    ().write_types(&mut out);
    ().write_values(&mut out, &CodecContext::default(), false)
        .unwrap();
    assert!(out.is_empty());
    assert!(().is_empty());
    assert!(!().has_long_data());
}
