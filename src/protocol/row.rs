use crate::codec::{CodecContext, Value, codec_for_value};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::value::{NullBitmap, row_null_bitmap_len, set_row_null_bit};

/// First byte of every binary result row
pub const BINARY_ROW_HEADER: u8 = 0x00;

/// Bytes before the first value of a binary row: the header byte and the NULL bitmap.
#[inline]
pub fn binary_row_prefix_len(num_columns: usize) -> usize {
    1 + row_null_bitmap_len(num_columns)
}

/// Split a binary protocol row into its NULL bitmap and value bytes.
pub fn split_binary_row(payload: &[u8], num_columns: usize) -> Result<(NullBitmap<'_>, &[u8])> {
    let (header, data) = read_int_1(payload)?;
    if header != BINARY_ROW_HEADER {
        return Err(Error::InvalidPacket);
    }
    let (null_bitmap, values) = read_string_fix(data, row_null_bitmap_len(num_columns))?;
    Ok((NullBitmap::for_result_set(null_bitmap), values))
}

/// Append a binary protocol row. NULL values only set their bitmap bit.
pub fn write_binary_row(out: &mut Vec<u8>, values: &[Value], ctx: &CodecContext) -> Result<()> {
    write_int_1(out, BINARY_ROW_HEADER);
    let bitmap_start = out.len();
    out.resize(bitmap_start + row_null_bitmap_len(values.len()), 0);
    for (idx, value) in values.iter().enumerate() {
        if value.is_null() {
            set_row_null_bit(&mut out[bitmap_start..], idx);
        } else {
            codec_for_value(value)?.encode_binary(out, ctx, value, None, None)?;
        }
    }
    Ok(())
}

/// Append a text protocol row. `None` is written as the NULL length marker.
pub fn write_text_row(out: &mut Vec<u8>, fields: &[Option<&[u8]>]) {
    for field in fields {
        match field {
            Some(data) => write_bytes_lenenc(out, data),
            None => write_int_1(out, crate::constant::NULL_LENGTH_MARKER),
        }
    }
}
