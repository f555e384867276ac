//! MariaDB COM_MULTI framing
//!
//! Layout: `0xFE` followed by one `lenenc length + command payload` per sub-command.
//! Lengths are reserved as 9-byte length-encoded integers and patched once the sub-command
//! has been written, so a sub-command can be encoded directly into the output buffer.

use crate::constant::CommandByte;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Bytes a sub-command adds on top of its own payload
pub const SUB_COMMAND_OVERHEAD: usize = 9;

pub fn write_multi_header(out: &mut Vec<u8>) {
    write_int_1(out, CommandByte::Multi as u8);
}

/// Reserve the length of the next sub-command. Returns the offset for `end_sub_command`.
pub fn begin_sub_command(out: &mut Vec<u8>) -> usize {
    reserve_lenenc_8(out)
}

/// Patch the length of the sub-command started at `offset`.
pub fn end_sub_command(out: &mut [u8], offset: usize) {
    let len = out.len() - offset - SUB_COMMAND_OVERHEAD;
    patch_reserved_lenenc(out, offset, len as u64);
}

/// Split a COM_MULTI payload into its sub-command payloads.
pub fn split_multi(payload: &[u8]) -> Result<Vec<&[u8]>> {
    let (header, mut data) = read_int_1(payload)?;
    if header != CommandByte::Multi as u8 {
        return Err(Error::InvalidPacket);
    }
    let mut commands = Vec::new();
    while !data.is_empty() {
        let (command, rest) = read_string_lenenc(data)?;
        commands.push(command);
        data = rest;
    }
    Ok(commands)
}
