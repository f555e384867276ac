use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE, U64 as U64LE};

/// Read 1-byte integer
pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&first, rest)) => Ok((first, rest)),
        None => Err(Error::UnexpectedEof),
    }
}

/// Read 2-byte little-endian integer
pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    let (value, rest) = U16LE::read_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;
    Ok((value.get(), rest))
}

/// Read 3-byte little-endian integer
pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 3 {
        return Err(Error::UnexpectedEof);
    }
    let value = u32::from_le_bytes([data[0], data[1], data[2], 0]);
    Ok((value, &data[3..]))
}

/// Read 4-byte little-endian integer
pub fn read_int_4(data: &[u8]) -> Result<(u32, &[u8])> {
    let (value, rest) = U32LE::read_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;
    Ok((value.get(), rest))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    let (value, rest) = U64LE::read_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;
    Ok((value.get(), rest))
}

/// Read a length-encoded prefix that may stand for SQL NULL.
///
/// Returns `None` for the 0xFB marker.
pub fn read_length_lenenc(data: &[u8]) -> Result<(Option<u64>, &[u8])> {
    let (first, rest) = read_int_1(data)?;
    match first {
        0..=0xFA => Ok((Some(u64::from(first)), rest)),
        0xFB => Ok((None, rest)),
        0xFC => {
            let (val, rest) = read_int_2(rest)?;
            Ok((Some(u64::from(val)), rest))
        }
        0xFD => {
            let (val, rest) = read_int_3(rest)?;
            Ok((Some(u64::from(val)), rest))
        }
        0xFE => {
            let (val, rest) = read_int_8(rest)?;
            Ok((Some(val), rest))
        }
        0xFF => Err(Error::InvalidPacket),
    }
}

/// Read length-encoded integer
///
/// 0xFB (NULL) is not a valid integer here and is reported as an invalid packet.
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    match read_length_lenenc(data)? {
        (Some(value), rest) => Ok((value, rest)),
        (None, _) => Err(Error::InvalidPacket),
    }
}

/// Number of bytes a length-encoded integer occupies, judged from its first byte.
#[inline]
pub fn lenenc_prefix_size(first: u8) -> usize {
    match first {
        0xFC => 3,
        0xFD => 4,
        0xFE => 9,
        _ => 1,
    }
}

/// Number of bytes `write_int_lenenc` produces for `value`.
#[inline]
pub fn lenenc_int_size(value: u64) -> usize {
    if value < 251 {
        1
    } else if value < (1 << 16) {
        3
    } else if value < (1 << 24) {
        4
    } else {
        9
    }
}

/// Narrow a wire length to `usize`. Lengths beyond the address space are a defect, not a wrap.
#[inline]
pub fn lenenc_to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::ProtocolInvariant(format!("length {value} does not fit in memory")))
}

/// Read fixed-length string
pub fn read_string_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::UnexpectedEof);
    }
    Ok(data.split_at(len))
}

/// Read null-terminated string
pub fn read_string_null(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match data.iter().position(|&byte| byte == 0) {
        Some(i) => Ok((&data[..i], &data[i + 1..])),
        None => Err(Error::UnexpectedEof),
    }
}

/// Read length-encoded string
pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    read_string_fix(rest, lenenc_to_usize(len)?)
}

/// Write 1-byte integer
pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 3-byte little-endian integer
pub fn write_int_3(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-encoded integer using the smallest form that fits
pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xfc);
        write_int_2(out, value as u16);
    } else if value < (1 << 24) {
        out.push(0xfd);
        write_int_3(out, value as u32);
    } else {
        out.push(0xfe);
        write_int_8(out, value);
    }
}

/// Reserve a 9-byte length-encoded integer to be patched by `patch_reserved_lenenc`.
///
/// Returns the offset of the reservation.
pub fn reserve_lenenc_8(out: &mut Vec<u8>) -> usize {
    let offset = out.len();
    out.push(0xfe);
    out.extend_from_slice(&[0; 8]);
    offset
}

/// Fill in a reservation made by `reserve_lenenc_8`.
pub fn patch_reserved_lenenc(out: &mut [u8], offset: usize, value: u64) {
    out[offset + 1..offset + 9].copy_from_slice(&value.to_le_bytes());
}

/// Write fixed-length bytes
pub fn write_bytes_fix(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
}

/// Write null-terminated string
pub fn write_string_null(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Write length-encoded string
pub fn write_string_lenenc(out: &mut Vec<u8>, s: &str) {
    write_bytes_lenenc(out, s.as_bytes());
}

/// Write length-encoded bytes
pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenenc_escape_two_bytes() {
        let (value, rest) = read_int_lenenc(b"\xfc\x00\x01").unwrap();
        assert_eq!(value, 256);
        assert!(rest.is_empty());
    }

    #[test]
    fn lenenc_size_class_boundaries() {
        let cases: [(u64, usize); 8] = [
            (0, 1),
            (250, 1),
            (251, 3),
            (65535, 3),
            (65536, 4),
            ((1 << 24) - 1, 4),
            (1 << 24, 9),
            (u64::MAX, 9),
        ];
        for (value, width) in cases {
            let mut out = Vec::new();
            write_int_lenenc(&mut out, value);
            assert_eq!(out.len(), width, "width of {value}");
            assert_eq!(lenenc_int_size(value), width);
            assert_eq!(lenenc_prefix_size(out[0]), width);
            let (decoded, rest) = read_int_lenenc(&out).unwrap();
            assert_eq!(decoded, value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn lenenc_null_marker_is_only_a_length() {
        let (len, rest) = read_length_lenenc(b"\xfbxyz").unwrap();
        assert_eq!(len, None);
        assert_eq!(rest, b"xyz");
        assert!(matches!(read_int_lenenc(b"\xfb"), Err(Error::InvalidPacket)));
        assert!(matches!(read_int_lenenc(b"\xff"), Err(Error::InvalidPacket)));
    }

    #[test]
    fn lenenc_truncated_is_eof() {
        assert!(matches!(read_int_lenenc(b""), Err(Error::UnexpectedEof)));
        assert!(matches!(read_int_lenenc(b"\xfc\x01"), Err(Error::UnexpectedEof)));
        assert!(matches!(read_int_lenenc(b"\xfd\x01\x02"), Err(Error::UnexpectedEof)));
        assert!(matches!(
            read_int_lenenc(b"\xfe\x01\x02\x03\x04\x05\x06\x07"),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn reserved_lenenc_is_patched_in_place() {
        let mut out = vec![0xAA];
        let offset = reserve_lenenc_8(&mut out);
        out.extend_from_slice(b"tail");
        patch_reserved_lenenc(&mut out, offset, 300);
        let (value, rest) = read_int_lenenc(&out[1..]).unwrap();
        assert_eq!(value, 300);
        assert_eq!(rest, b"tail");
    }

    #[test]
    fn strings() {
        let (s, rest) = read_string_lenenc(b"\x03abcd").unwrap();
        assert_eq!(s, b"abc");
        assert_eq!(rest, b"d");
        let (s, rest) = read_string_null(b"root\0x").unwrap();
        assert_eq!(s, b"root");
        assert_eq!(rest, b"x");
        assert!(read_string_null(b"no terminator").is_err());
        assert!(read_string_lenenc(b"\x05ab").is_err());
    }
}
