use crate::col::ColumnDefinition;
use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Payload of a ColumnDefinition41 packet
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinitionBytes<'a>(pub &'a [u8]);

impl TryFrom<ColumnDefinitionBytes<'_>> for ColumnDefinition {
    type Error = Error;

    fn try_from(bytes: ColumnDefinitionBytes<'_>) -> Result<Self> {
        let data = bytes.0;

        let (catalog, data) = read_string_lenenc(data)?;
        let (schema, data) = read_string_lenenc(data)?;
        let (table, data) = read_string_lenenc(data)?;
        let (org_table, data) = read_string_lenenc(data)?;
        let (name, data) = read_string_lenenc(data)?;
        let (org_name, data) = read_string_lenenc(data)?;

        // length of fixed fields, always 0x0c
        let (fixed_len, data) = read_int_lenenc(data)?;
        if fixed_len != 12 {
            return Err(Error::InvalidPacket);
        }
        let (tail, _rest) =
            ColumnDefinitionTail::ref_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;

        Ok(ColumnDefinition {
            catalog: lossy(catalog),
            schema: lossy(schema),
            table: lossy(table),
            org_table: lossy(org_table),
            name: lossy(name),
            org_name: lossy(org_name),
            charset: tail.charset(),
            column_length: tail.column_length(),
            column_type: tail.column_type(),
            flags: tail.flags(),
            decimals: tail.decimals,
        })
    }
}

fn lossy(bytes: &[u8]) -> String {
    match simdutf8::basic::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Fixed-size tail of Column Definition packet (12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    /// Unknown type codes map to `MYSQL_TYPE_UNSUPPORTED`.
    pub fn column_type(&self) -> ColumnType {
        ColumnType::from_code(self.column_type)
    }

    /// Bits this client does not know are dropped.
    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_truncate(self.flags.get())
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

/// Encode a column descriptor as a ColumnDefinition41 payload.
pub fn write_column_definition(out: &mut Vec<u8>, col: &ColumnDefinition) {
    write_string_lenenc(out, &col.catalog);
    write_string_lenenc(out, &col.schema);
    write_string_lenenc(out, &col.table);
    write_string_lenenc(out, &col.org_table);
    write_string_lenenc(out, &col.name);
    write_string_lenenc(out, &col.org_name);
    write_int_lenenc(out, 12);
    let tail = ColumnDefinitionTail {
        charset: U16LE::new(col.charset),
        column_length: U32LE::new(col.column_length),
        column_type: col.column_type.code(),
        flags: U16LE::new(col.flags.bits()),
        decimals: col.decimals,
        reserved: U16LE::new(0),
    };
    out.extend_from_slice(tail.as_bytes());
}
