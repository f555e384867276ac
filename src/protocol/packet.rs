use std::io::Read;

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Largest payload a single packet can carry. Longer payloads continue in the next packet.
pub const MAX_PACKET_PAYLOAD: usize = 0xFFFFFF;

/// Size of the packet header preceding every payload chunk
pub const PACKET_HEADER_SIZE: usize = 4;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(header, _)| header)
            .map_err(|_| Error::InvalidPacket)
    }
}

#[inline]
pub fn write_packet_header(out: &mut Vec<u8>, sequence_id: u8, payload_length: usize) {
    out.extend_from_slice(PacketHeader::encode(payload_length, sequence_id).as_bytes());
}

/// Append `payload` to `out` as one or more framed packets.
///
/// A payload whose last chunk is exactly `MAX_PACKET_PAYLOAD` long is terminated by an empty packet.
/// Returns the sequence id following the last written packet.
pub fn frame_payload(out: &mut Vec<u8>, payload: &[u8], mut sequence_id: u8) -> u8 {
    let mut remaining = payload;
    loop {
        let chunk_size = remaining.len().min(MAX_PACKET_PAYLOAD);
        let (chunk, rest) = remaining.split_at(chunk_size);
        write_packet_header(out, sequence_id, chunk_size);
        out.extend_from_slice(chunk);
        sequence_id = sequence_id.wrapping_add(1);
        remaining = rest;
        if chunk_size < MAX_PACKET_PAYLOAD {
            return sequence_id;
        }
    }
}

/// Number of bytes `frame_payload` produces for a payload of `payload_len` bytes.
pub fn framed_len(payload_len: usize) -> usize {
    let packets = payload_len / MAX_PACKET_PAYLOAD + 1;
    payload_len + packets * PACKET_HEADER_SIZE
}

/// Reserve a packet header at the end of `out`, to be completed by `finish_framed`.
pub fn reserve_header(out: &mut Vec<u8>) -> usize {
    let offset = out.len();
    out.extend_from_slice(&[0; PACKET_HEADER_SIZE]);
    offset
}

/// Complete a packet whose payload was written directly after a `reserve_header` call.
///
/// Payloads that turned out longer than one packet are re-split in place.
pub fn finish_framed(out: &mut Vec<u8>, header_offset: usize, sequence_id: u8) -> u8 {
    let payload_start = header_offset + PACKET_HEADER_SIZE;
    let payload_len = out.len() - payload_start;
    if payload_len < MAX_PACKET_PAYLOAD {
        let header = PacketHeader::encode(payload_len, sequence_id);
        out[header_offset..payload_start].copy_from_slice(header.as_bytes());
        return sequence_id.wrapping_add(1);
    }
    let payload = out.split_off(payload_start);
    out.truncate(header_offset);
    frame_payload(out, &payload, sequence_id)
}

/// Read a complete MySQL payload, concatenating packets if they span multiple 16MB chunks
/// Returns the sequence_id of the last packet read.
#[tracing::instrument(skip_all)]
pub fn read_payload<R: Read + ?Sized>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = PacketHeader::new_zeroed();
    let mut sequence_id;
    loop {
        reader.read_exact(header.as_mut_bytes())?;
        let length = header.length();
        sequence_id = header.sequence_id;

        let start = buffer.len();
        buffer.resize(start + length, 0);
        reader.read_exact(&mut buffer[start..])?;

        if length < MAX_PACKET_PAYLOAD {
            return Ok(sequence_id);
        }
    }
}

/// OK packet payload, not yet parsed
///
/// Layout: 0x00 (or 0xFE when it replaces EOF) followed by variable-length fields:
/// - affected_rows: length-encoded integer
/// - last_insert_id: length-encoded integer
/// - status_flags: 2 bytes
/// - warnings: 2 bytes
/// - info: variable-length string
#[derive(Debug)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

impl<'a> OkPayloadBytes<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// ERR packet payload, not yet parsed
#[derive(Debug)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);
