use std::mem::size_of;

use pretty_assertions::assert_eq;
use zerocopy::FromBytes;

use crate::col::ColumnDefinition;
use crate::constant::{ColumnFlags, ColumnType};
use crate::protocol::command::column_definition::{
    ColumnDefinitionBytes, ColumnDefinitionTail, write_column_definition,
};

#[test]
fn test_column_definition_tail_size() {
    assert_eq!(size_of::<ColumnDefinitionTail>(), 12);
}

#[test]
fn test_column_definition_tail_parsing() {
    let data: [u8; 12] = [
        0x21, 0x00, // charset = 33
        0xFF, 0x00, 0x00, 0x00, // column_length = 255
        0xFD, // column_type = VAR_STRING
        0x00, 0x00, // flags = 0
        0x00, // decimals = 0
        0x00, 0x00, // reserved
    ];

    let tail = ColumnDefinitionTail::ref_from_bytes(&data).expect("Failed to parse");

    assert_eq!(tail.charset(), 33);
    assert_eq!(tail.column_length(), 255);
    assert!(tail.flags().is_empty());
    assert_eq!(tail.column_type(), ColumnType::MYSQL_TYPE_VAR_STRING);
}

#[test]
fn test_column_definition_tail_with_part_key_flag() {
    // flags = 0x4203 (NOT_NULL | PRI_KEY | AUTO_INCREMENT | PART_KEY)
    let data: [u8; 12] = [
        0x3f, 0x00, // charset = 63 (binary)
        0x0B, 0x00, 0x00, 0x00, // column_length = 11
        0x03, // column_type = LONG
        0x03, 0x42, // flags
        0x00, // decimals
        0x00, 0x00, // reserved
    ];

    let tail = ColumnDefinitionTail::ref_from_bytes(&data).expect("Failed to parse");
    let flags = tail.flags();
    assert!(flags.contains(ColumnFlags::NOT_NULL_FLAG));
    assert!(flags.contains(ColumnFlags::PRI_KEY_FLAG));
    assert!(flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG));
    assert!(flags.contains(ColumnFlags::PART_KEY_FLAG));
    assert_eq!(tail.column_type(), ColumnType::MYSQL_TYPE_LONG);
}

#[test]
fn test_column_definition_tail_unknown_column_type() {
    let data: [u8; 12] = [
        0x21, 0x00, 0xFF, 0x00, 0x00, 0x00, //
        0x50, // column_type = 0x50 (in the gap)
        0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    let tail = ColumnDefinitionTail::ref_from_bytes(&data).expect("Failed to parse");
    assert_eq!(tail.column_type(), ColumnType::MYSQL_TYPE_UNSUPPORTED);
}

#[test]
fn test_column_definition_bytes_too_short() {
    // six empty strings, then a fixed-fields length of 0
    let data: &[u8; 8] = &[0; 8];
    assert!(ColumnDefinition::try_from(ColumnDefinitionBytes(data)).is_err());

    // names only, the fixed fields are missing
    let data = b"\x03def\x00\x00\x00\x01a\x01a\x0c\x21\x00";
    assert!(matches!(
        ColumnDefinition::try_from(ColumnDefinitionBytes(data)),
        Err(crate::error::Error::UnexpectedEof)
    ));
}

#[test]
fn test_column_definition_try_from() {
    let mut packet = Vec::new();
    packet.push(0x03);
    packet.extend_from_slice(b"def");
    packet.push(0x04);
    packet.extend_from_slice(b"test");
    packet.push(0x01);
    packet.extend_from_slice(b"u");
    packet.push(0x05);
    packet.extend_from_slice(b"users");
    packet.push(0x02);
    packet.extend_from_slice(b"id");
    packet.push(0x02);
    packet.extend_from_slice(b"id");
    packet.push(0x0c);
    packet.extend_from_slice(&[
        0x21, 0x00, // charset = 33
        0x0B, 0x00, 0x00, 0x00, // column_length = 11
        0x03, // column_type = LONG
        0x23, 0x00, // flags = NOT_NULL | PRI_KEY | UNSIGNED
        0x00, // decimals
        0x00, 0x00, // reserved
    ]);

    let col = ColumnDefinition::try_from(ColumnDefinitionBytes(&packet)).expect("Failed to parse");

    assert_eq!(col.catalog, "def");
    assert_eq!(col.schema, "test");
    assert_eq!(col.table, "u");
    assert_eq!(col.org_table, "users");
    assert_eq!(col.name, "id");
    assert_eq!(col.org_name, "id");
    assert_eq!(col.charset, 33);
    assert_eq!(col.column_length, 11);
    assert_eq!(col.column_type, ColumnType::MYSQL_TYPE_LONG);
    assert!(col.is_unsigned());
    assert!(col.is_primary_key());
    assert!(!col.is_nullable());
}

#[test]
fn test_column_definition_encode_matches_parse() {
    let col = ColumnDefinition::create("price", ColumnType::MYSQL_TYPE_NEWDECIMAL)
        .with_flags(ColumnFlags::NOT_NULL_FLAG);
    let mut packet = Vec::new();
    write_column_definition(&mut packet, &col);
    let parsed = ColumnDefinition::try_from(ColumnDefinitionBytes(&packet)).unwrap();
    assert_eq!(parsed, col);
}

#[test]
fn test_column_definition_truncated_tail() {
    let mut packet = Vec::new();
    write_column_definition(
        &mut packet,
        &ColumnDefinition::create("x", ColumnType::MYSQL_TYPE_TINY),
    );
    packet.truncate(packet.len() - 3);
    assert!(ColumnDefinition::try_from(ColumnDefinitionBytes(&packet)).is_err());
}
