/// Binary protocol wire layouts shared by the temporal codecs and the row decoder
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// DATE/DATETIME/TIMESTAMP - 4 bytes (date only)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Timestamp4 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
}

/// DATE/DATETIME/TIMESTAMP - 7 bytes (without microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Timestamp7 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// DATE/DATETIME/TIMESTAMP - 11 bytes (with microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Timestamp11 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// TIME - 8 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Time8 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIME - 12 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Time12 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// Broken-down date-time as carried by the binary protocol, whichever length was sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl WireDateTime {
    /// `0000-00-00 00:00:00`
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&Timestamp4> for WireDateTime {
    fn from(ts: &Timestamp4) -> Self {
        Self {
            year: ts.year.get(),
            month: ts.month,
            day: ts.day,
            ..Self::default()
        }
    }
}

impl From<&Timestamp7> for WireDateTime {
    fn from(ts: &Timestamp7) -> Self {
        Self {
            year: ts.year.get(),
            month: ts.month,
            day: ts.day,
            hour: ts.hour,
            minute: ts.minute,
            second: ts.second,
            microsecond: 0,
        }
    }
}

impl From<&Timestamp11> for WireDateTime {
    fn from(ts: &Timestamp11) -> Self {
        Self {
            year: ts.year.get(),
            month: ts.month,
            day: ts.day,
            hour: ts.hour,
            minute: ts.minute,
            second: ts.second,
            microsecond: ts.microsecond.get(),
        }
    }
}

/// Broken-down TIME value as carried by the binary protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireTime {
    pub is_negative: bool,
    pub days: u32,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl From<&Time8> for WireTime {
    fn from(t: &Time8) -> Self {
        Self {
            is_negative: t.is_negative != 0,
            days: t.days.get(),
            hour: t.hour,
            minute: t.minute,
            second: t.second,
            microsecond: 0,
        }
    }
}

impl From<&Time12> for WireTime {
    fn from(t: &Time12) -> Self {
        Self {
            is_negative: t.is_negative != 0,
            days: t.days.get(),
            hour: t.hour,
            minute: t.minute,
            second: t.second,
            microsecond: t.microsecond.get(),
        }
    }
}

/// Bits reserved at the start of a result-row NULL bitmap.
const RESULT_ROW_BITMAP_OFFSET: usize = 2;

/// Length of the NULL bitmap in a binary result row.
#[inline]
pub fn row_null_bitmap_len(num_columns: usize) -> usize {
    (num_columns + 7 + RESULT_ROW_BITMAP_OFFSET) / 8
}

/// Length of the NULL bitmap in COM_STMT_EXECUTE.
#[inline]
pub fn param_null_bitmap_len(num_params: usize) -> usize {
    num_params.div_ceil(8)
}

/// NULL bitmap for binary protocol
///
/// Each bit marks whether a column is NULL (1 = NULL, 0 = not NULL).
/// Result rows reserve the first two bits; parameter bitmaps start at bit 0.
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
    offset: usize,
}

impl<'a> NullBitmap<'a> {
    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self {
            bitmap,
            offset: RESULT_ROW_BITMAP_OFFSET,
        }
    }

    pub fn for_parameters(bitmap: &'a [u8]) -> Self {
        Self { bitmap, offset: 0 }
    }

    /// Check if the column at the given index is NULL
    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + self.offset;
        match self.bitmap.get(bit_pos >> 3) {
            Some(byte) => byte & (1 << (bit_pos & 7)) != 0,
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bitmap
    }
}

/// Set bit `idx` of a result-row NULL bitmap.
pub fn set_row_null_bit(bitmap: &mut [u8], idx: usize) {
    let bit_pos = idx + RESULT_ROW_BITMAP_OFFSET;
    bitmap[bit_pos >> 3] |= 1 << (bit_pos & 7);
}
