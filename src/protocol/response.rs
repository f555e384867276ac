use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::packet::{ErrPayloadBytes, MAX_PACKET_PAYLOAD, OkPayloadBytes};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// First-byte classification of a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Ok,
    Err,
    Eof,
    LocalInfile,
    ResultSet,
}

/// Classify the first packet of a command response.
pub fn detect_packet_type(payload: &[u8]) -> Result<PacketType> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(0xFF) => Ok(PacketType::Err),
        Some(0x00) => Ok(PacketType::Ok),
        Some(0xFE) if payload.len() < 9 => Ok(PacketType::Eof),
        Some(0xFB) => Ok(PacketType::LocalInfile),
        Some(_) => Ok(PacketType::ResultSet),
    }
}

/// Whether a packet read where a row may appear is the EOF (or OK-as-EOF) terminator.
///
/// Rows can also start with 0xFE (an 8-byte length prefix) but are then at least 16MB long.
#[inline]
pub fn is_row_terminator(payload: &[u8]) -> bool {
    payload.first() == Some(&0xFE) && payload.len() < MAX_PACKET_PAYLOAD
}

/// OK packet response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
    pub info: String,
}

impl OkPayload {
    pub fn more_results_exist(&self) -> bool {
        self.status_flags
            .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS)
    }
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.bytes())?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (last_insert_id, rest) = read_int_lenenc(rest)?;
        let (status_flags, rest) = read_int_2(rest)?;
        let (warnings, rest) = read_int_2(rest)?;

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
            info: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        let (sql_state, rest) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state_bytes, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state_bytes).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

impl ErrPayload {
    /// Encode back to wire bytes, for scripted transports.
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_int_1(out, 0xFF);
        write_int_2(out, self.error_code);
        if !self.sql_state.is_empty() {
            write_int_1(out, b'#');
            write_bytes_fix(out, self.sql_state.as_bytes());
        }
        write_bytes_fix(out, self.message.as_bytes());
    }
}

impl OkPayload {
    /// Encode back to wire bytes, for scripted transports.
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_int_1(out, 0x00);
        write_int_lenenc(out, self.affected_rows);
        write_int_lenenc(out, self.last_insert_id);
        write_int_2(out, self.status_flags.bits());
        write_int_2(out, self.warnings);
        write_bytes_fix(out, self.info.as_bytes());
    }
}

/// EOF packet response (zero-copy)
///
/// Layout after header byte 0xFE:
/// - warnings: 2 bytes (little-endian)
/// - status_flags: 2 bytes (little-endian)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    pub warnings: U16LE,
    pub status_flags: U16LE,
}

impl EofPacket {
    pub fn status_flags(&self) -> ServerStatusFlags {
        ServerStatusFlags::from_bits_truncate(self.status_flags.get())
    }
}

/// Read EOF packet (header byte 0xFE, length < 9) - zero-copy
pub fn read_eof_packet(payload: &[u8]) -> Result<&EofPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }
    EofPacket::ref_from_prefix(data)
        .map(|(eof, _)| eof)
        .map_err(|_| Error::UnexpectedEof)
}

/// Status flags carried by a result-set terminator.
///
/// With `CLIENT_DEPRECATE_EOF` the terminator is an OK packet with a 0xFE header.
pub fn terminator_status(payload: &[u8], deprecate_eof: bool) -> Result<ServerStatusFlags> {
    if deprecate_eof {
        Ok(OkPayload::try_from(OkPayloadBytes(payload))?.status_flags)
    } else {
        Ok(read_eof_packet(payload)?.status_flags())
    }
}
