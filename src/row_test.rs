use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::codec::{CodecContext, Value};
use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::Error;
use crate::protocol::row::{write_binary_row, write_text_row};
use crate::row::{BinaryRowDecoder, FieldLength, RowDecoder, TextRowDecoder};

fn columns(types: &[ColumnType]) -> Arc<[ColumnDefinition]> {
    types
        .iter()
        .enumerate()
        .map(|(i, t)| ColumnDefinition::create(&format!("c{i}"), *t))
        .collect()
}

fn binary_decoder(types: &[ColumnType]) -> BinaryRowDecoder {
    BinaryRowDecoder::new(columns(types), CodecContext::default())
}

fn text_decoder(n: usize) -> TextRowDecoder {
    TextRowDecoder::new(
        columns(&vec![ColumnType::MYSQL_TYPE_VAR_STRING; n]),
        CodecContext::default(),
    )
}

fn binary_row(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    write_binary_row(&mut out, values, &CodecContext::default()).unwrap();
    out
}

#[test]
fn binary_row_with_null_middle_column() {
    let mut decoder = binary_decoder(&[
        ColumnType::MYSQL_TYPE_LONG,
        ColumnType::MYSQL_TYPE_VAR_STRING,
        ColumnType::MYSQL_TYPE_DOUBLE,
    ]);
    let mut row = vec![0x00, 0b0000_1000];
    row.extend_from_slice(&42i32.to_le_bytes());
    row.extend_from_slice(&3.5f64.to_le_bytes());
    decoder.set_row(&row).unwrap();

    assert_eq!(decoder.get::<i32>(0).unwrap(), 42);
    assert!(!decoder.was_null());

    assert_eq!(decoder.set_position(1).unwrap(), FieldLength::Null);
    assert!(decoder.was_null());
    assert_eq!(decoder.get::<Option<String>>(1).unwrap(), None);
    assert!(matches!(
        decoder.get::<String>(1),
        Err(Error::DataConversion(_))
    ));

    assert_eq!(decoder.get::<f64>(2).unwrap(), 3.5);
    assert!(!decoder.was_null());
    // backwards check of the bitmap after decoding a later column
    assert!(decoder.is_null(1));
}

#[test]
fn text_row_with_null_marker() {
    let mut decoder = text_decoder(3);
    let mut row = Vec::new();
    write_text_row(&mut row, &[Some(b"5"), Some(b"abc"), None]);
    assert_eq!(row, b"\x015\x03abc\xfb");
    decoder.set_row(&row).unwrap();

    assert_eq!(decoder.get::<String>(0).unwrap(), "5");
    assert_eq!(decoder.get::<i64>(0).unwrap(), 5);
    assert_eq!(decoder.get::<String>(1).unwrap(), "abc");
    assert_eq!(decoder.set_position(2).unwrap(), FieldLength::Null);
    assert!(decoder.was_null());
    assert_eq!(decoder.field_length(), Some(FieldLength::Null));
    assert_eq!(decoder.field(), None);
}

#[test]
fn empty_text_field_is_not_null() {
    let mut decoder = text_decoder(2);
    let mut row = Vec::new();
    write_text_row(&mut row, &[Some(b""), None]);
    decoder.set_row(&row).unwrap();

    assert_eq!(decoder.set_position(0).unwrap(), FieldLength::Bytes(0));
    assert!(!decoder.was_null());
    assert_eq!(decoder.field(), Some(&b""[..]));
}

#[test]
fn null_marker_with_clear_bitmap_bit_is_an_invariant_violation() {
    let mut decoder = binary_decoder(&[
        ColumnType::MYSQL_TYPE_VAR_STRING,
        ColumnType::MYSQL_TYPE_LONG,
    ]);
    let mut row = vec![0x00, 0x00, 0xFB];
    row.extend_from_slice(&1i32.to_le_bytes());
    decoder.set_row(&row).unwrap();

    assert!(matches!(
        decoder.set_position(0),
        Err(Error::ProtocolInvariant(_))
    ));
    // also when the field is only skipped over
    assert!(matches!(
        decoder.set_position(1),
        Err(Error::ProtocolInvariant(_))
    ));
}

#[test]
fn fixed_width_skips() {
    let cases = [
        (ColumnType::MYSQL_TYPE_TINY, Value::I8(-1), 1),
        (ColumnType::MYSQL_TYPE_SHORT, Value::I16(-2), 2),
        (ColumnType::MYSQL_TYPE_YEAR, Value::I16(2024), 2),
        (ColumnType::MYSQL_TYPE_INT24, Value::I32(-3), 4),
        (ColumnType::MYSQL_TYPE_LONG, Value::I32(-4), 4),
        (ColumnType::MYSQL_TYPE_FLOAT, Value::F32(1.5), 4),
        (ColumnType::MYSQL_TYPE_LONGLONG, Value::I64(-5), 8),
        (ColumnType::MYSQL_TYPE_DOUBLE, Value::F64(2.5), 8),
    ];
    for (column_type, value, width) in cases {
        let mut decoder = binary_decoder(&[column_type, ColumnType::MYSQL_TYPE_LONG]);

        decoder
            .set_row(&binary_row(&[value.clone(), Value::I32(7)]))
            .unwrap();
        assert_eq!(decoder.set_position(0).unwrap(), FieldLength::Bytes(width));
        assert_eq!(decoder.get::<i32>(1).unwrap(), 7, "{column_type:?}");
        assert_eq!(decoder.value(0).unwrap(), value, "{column_type:?}");

        // NULL fields take no bytes
        decoder
            .set_row(&binary_row(&[Value::Null, Value::I32(7)]))
            .unwrap();
        assert_eq!(decoder.get::<i32>(1).unwrap(), 7, "{column_type:?}");
        assert_eq!(decoder.set_position(0).unwrap(), FieldLength::Null);
    }
}

#[test]
fn positional_determinism() {
    let types = [
        ColumnType::MYSQL_TYPE_VAR_STRING,
        ColumnType::MYSQL_TYPE_LONGLONG,
        ColumnType::MYSQL_TYPE_DATETIME,
        ColumnType::MYSQL_TYPE_BLOB,
        ColumnType::MYSQL_TYPE_SHORT,
    ];
    let datetime = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(5, 6, 7)
        .unwrap();
    let values = [
        Value::String("first".to_string()),
        Value::I64(-9),
        Value::DateTime(datetime),
        Value::Null,
        Value::I16(11),
    ];
    let row = binary_row(&values);

    let mut fresh = Vec::new();
    for j in 0..types.len() {
        let mut decoder = binary_decoder(&types);
        decoder.set_row(&row).unwrap();
        fresh.push(decoder.value(j).unwrap());
    }
    assert_eq!(fresh, values.to_vec());

    let mut decoder = binary_decoder(&types);
    decoder.set_row(&row).unwrap();
    for order in [[0, 2, 4, 1, 3], [4, 3, 2, 1, 0], [1, 1, 0, 4, 2]] {
        for j in order {
            assert_eq!(decoder.value(j).unwrap(), fresh[j]);
        }
    }
}

#[test]
fn repositioning_is_idempotent() {
    let mut decoder = text_decoder(2);
    let mut row = Vec::new();
    write_text_row(&mut row, &[Some(b"abc"), Some(b"xyz")]);
    decoder.set_row(&row).unwrap();

    decoder.set_position(1).unwrap();
    let first = decoder.get::<String>(1).unwrap();
    let second = decoder.get::<String>(1).unwrap();
    assert_eq!(first, "xyz");
    assert_eq!(first, second);
}

#[test]
fn rows_are_reused_and_handles_go_stale() {
    let mut decoder = text_decoder(1);
    let mut row = Vec::new();
    write_text_row(&mut row, &[Some(b"one")]);
    decoder.set_row(&row).unwrap();

    decoder.set_position(0).unwrap();
    let handle = decoder.handle().unwrap();
    assert_eq!(decoder.resolve(&handle).unwrap(), Some(&b"one"[..]));

    row.clear();
    write_text_row(&mut row, &[Some(b"two")]);
    decoder.set_row(&row).unwrap();
    assert_eq!(decoder.get::<String>(0).unwrap(), "two");
    assert!(matches!(
        decoder.resolve(&handle),
        Err(Error::StaleRow {
            expected: 1,
            actual: 2
        })
    ));
}

#[test]
fn truncated_rows_fail_without_poisoning_the_decoder() {
    let mut decoder = text_decoder(2);
    decoder.set_row(b"\x05ab").unwrap();
    assert!(matches!(decoder.set_position(0), Err(Error::UnexpectedEof)));

    let mut row = Vec::new();
    write_text_row(&mut row, &[Some(b"ok"), Some(b"fine")]);
    decoder.set_row(&row).unwrap();
    assert_eq!(decoder.get::<String>(1).unwrap(), "fine");
}

/// `0xFE` prefix with the largest 8-byte length, then a valid field
const HUGE_LENGTH_FIELD: &[u8] = b"\xfe\xff\xff\xff\xff\xff\xff\xff\xff\x01a";

fn is_decode_failure<T: std::fmt::Debug>(result: crate::error::Result<T>) -> bool {
    matches!(
        result,
        Err(Error::UnexpectedEof | Error::ProtocolInvariant(_))
    )
}

#[test]
fn huge_text_length_prefix_is_a_decode_failure() {
    let mut decoder = text_decoder(2);
    decoder.set_row(HUGE_LENGTH_FIELD).unwrap();
    assert!(is_decode_failure(decoder.set_position(1)));
    assert!(is_decode_failure(decoder.set_position(0)));
    assert!(decoder.field().is_none());

    let mut row = Vec::new();
    write_text_row(&mut row, &[Some(b"x"), Some(b"y")]);
    decoder.set_row(&row).unwrap();
    assert_eq!(decoder.get::<String>(1).unwrap(), "y");
}

#[test]
fn huge_binary_length_prefix_is_a_decode_failure() {
    let mut decoder = binary_decoder(&[
        ColumnType::MYSQL_TYPE_VAR_STRING,
        ColumnType::MYSQL_TYPE_VAR_STRING,
    ]);
    let mut row = vec![0x00, 0x00];
    row.extend_from_slice(HUGE_LENGTH_FIELD);
    decoder.set_row(&row).unwrap();
    assert!(is_decode_failure(decoder.set_position(1)));
    assert!(is_decode_failure(decoder.get::<String>(0)));
}

#[test]
fn out_of_range_index() {
    let mut decoder = text_decoder(1);
    assert!(matches!(decoder.set_position(0), Err(Error::BadUsageError(_))));
    decoder.set_row(b"\x00").unwrap();
    assert!(matches!(decoder.set_position(1), Err(Error::BadUsageError(_))));
}
