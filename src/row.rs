//! Positional row decoders.
//!
//! One decoder is reused for every row of a result set. `set_row` copies the row into the
//! decoder's own buffer and bumps its generation; `set_position` moves a cursor over the
//! fields, skipping the ones in between without decoding them.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::codec::{self, CodecContext, FromValue, Value, ValueKind, natural_kind};
use crate::col::ColumnDefinition;
use crate::error::{Error, Result};
use crate::protocol::primitive::{lenenc_prefix_size, lenenc_to_usize, read_length_lenenc};
use crate::protocol::row::{binary_row_prefix_len, split_binary_row};
use crate::protocol::value::NullBitmap;

/// Length of the field under the cursor
///
/// `Null` is distinct from every wire length, including zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLength {
    Null,
    Bytes(usize),
}

impl FieldLength {
    #[inline]
    fn byte_len(self) -> usize {
        match self {
            FieldLength::Null => 0,
            FieldLength::Bytes(len) => len,
        }
    }
}

/// A field located in one particular row
///
/// Resolving it after the decoder moved on to another row fails with `Error::StaleRow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHandle {
    generation: u64,
    index: usize,
    start: usize,
    length: FieldLength,
}

impl FieldHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn length(&self) -> FieldLength {
        self.length
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared access contract of the binary and text row decoders
pub trait RowDecoder {
    fn columns(&self) -> &[ColumnDefinition];

    fn context(&self) -> &CodecContext;

    /// Whether rows use the binary protocol encoding
    fn is_binary(&self) -> bool;

    /// Load the next row. Every earlier position and handle is invalidated.
    fn set_row(&mut self, payload: &[u8]) -> Result<()>;

    /// Move the cursor to field `index` and record its length.
    ///
    /// Moving backwards rewinds to the start of the row. Positioning on the current field
    /// again does not move the cursor.
    fn set_position(&mut self, index: usize) -> Result<FieldLength>;

    /// Whether the field under the cursor is NULL
    fn was_null(&self) -> bool;

    /// Length recorded by the last `set_position`
    fn field_length(&self) -> Option<FieldLength>;

    /// Bytes of the field under the cursor, `None` when NULL or not positioned
    fn field(&self) -> Option<&[u8]>;

    /// Incremented by every `set_row`
    fn generation(&self) -> u64;

    /// Handle to the field under the cursor
    fn handle(&self) -> Option<FieldHandle>;

    /// Bytes of a field located earlier, if it belongs to the current row.
    fn resolve(&self, handle: &FieldHandle) -> Result<Option<&[u8]>>;

    /// Decode field `index` as `kind`. NULL fields and zero dates yield `Value::Null`.
    fn decode(&mut self, index: usize, kind: ValueKind, tz: Option<FixedOffset>) -> Result<Value> {
        if let FieldLength::Null = self.set_position(index)? {
            return Ok(Value::Null);
        }
        let col = &self.columns()[index];
        let data = self.field().unwrap_or_default();
        codec::decode(kind, data, col, self.is_binary(), tz, self.context())
    }

    /// Decode field `index` as the kind its column naturally maps to.
    fn value(&mut self, index: usize) -> Result<Value> {
        let col = self
            .columns()
            .get(index)
            .ok_or_else(|| out_of_bounds(index, self.columns().len()))?;
        let kind = natural_kind(col);
        self.decode(index, kind, None)
    }

    /// Read field `index` into a host type.
    fn get<T: FromValue>(&mut self, index: usize) -> Result<T> {
        self.get_in_zone(index, None)
    }

    /// Read field `index` into a host type, interpreting temporal values in `tz`.
    fn get_in_zone<T: FromValue>(&mut self, index: usize, tz: Option<FixedOffset>) -> Result<T> {
        match self.decode(index, T::KIND, tz)? {
            Value::Null => T::from_null(),
            value => T::from_value(value),
        }
    }
}

fn out_of_bounds(index: usize, num_columns: usize) -> Error {
    Error::BadUsageError(format!(
        "column index {index} out of bounds for a row of {num_columns} columns"
    ))
}

/// Reusable row storage plus the cursor state both decoders share
#[derive(Debug, Default)]
struct RowBuffer {
    buf: Vec<u8>,
    /// Start of the first field
    body_start: usize,
    /// Start of field `next`
    pos: usize,
    next: usize,
    /// Field under the cursor, with its data start and length
    current: Option<(usize, usize, FieldLength)>,
    generation: u64,
    loaded: bool,
}

impl RowBuffer {
    fn load(&mut self, payload: &[u8], body_start: usize) {
        self.buf.clear();
        self.buf.extend_from_slice(payload);
        self.body_start = body_start;
        self.rewind();
        self.current = None;
        self.generation += 1;
        self.loaded = true;
    }

    fn rewind(&mut self) {
        self.pos = self.body_start;
        self.next = 0;
    }

    /// Length prefix at `pos`: data start and length, `None` for the NULL marker.
    fn lenenc_at(&self, pos: usize) -> Result<(usize, Option<usize>)> {
        let rest = self.buf.get(pos..).ok_or(Error::UnexpectedEof)?;
        let (len, _) = read_length_lenenc(rest)?;
        let start = pos + lenenc_prefix_size(rest[0]);
        match len {
            Some(len) => Ok((start, Some(lenenc_to_usize(len)?))),
            None => Ok((start, None)),
        }
    }

    /// Move to field `target`. `measure(buf, index, pos)` returns the data start and length
    /// of field `index` beginning at `pos`.
    fn seek(
        &mut self,
        target: usize,
        num_columns: usize,
        measure: impl Fn(&Self, usize, usize) -> Result<(usize, FieldLength)>,
    ) -> Result<FieldLength> {
        if !self.loaded {
            return Err(Error::BadUsageError("no row loaded".to_string()));
        }
        if target >= num_columns {
            return Err(out_of_bounds(target, num_columns));
        }
        if let Some((index, _, length)) = self.current {
            if index == target {
                return Ok(length);
            }
        }
        if target < self.next {
            self.rewind();
        }
        self.current = None;
        while self.next < target {
            let (start, length) = measure(self, self.next, self.pos)?;
            self.pos = self.end_of(start, length)?;
            self.next += 1;
        }
        let (start, length) = measure(self, target, self.pos)?;
        self.pos = self.end_of(start, length)?;
        self.next = target + 1;
        self.current = Some((target, start, length));
        Ok(length)
    }

    /// End offset of a field, which must lie inside the row.
    fn end_of(&self, start: usize, length: FieldLength) -> Result<usize> {
        start
            .checked_add(length.byte_len())
            .filter(|end| *end <= self.buf.len())
            .ok_or(Error::UnexpectedEof)
    }

    fn checked(&self, start: usize, length: FieldLength) -> Result<(usize, FieldLength)> {
        self.end_of(start, length)?;
        Ok((start, length))
    }

    fn slice(&self, start: usize, len: usize) -> Option<&[u8]> {
        self.buf.get(start..start.checked_add(len)?)
    }

    fn field(&self) -> Option<&[u8]> {
        match self.current {
            Some((_, start, FieldLength::Bytes(len))) => self.slice(start, len),
            _ => None,
        }
    }

    fn handle(&self) -> Option<FieldHandle> {
        self.current.map(|(index, start, length)| FieldHandle {
            generation: self.generation,
            index,
            start,
            length,
        })
    }

    fn resolve(&self, handle: &FieldHandle) -> Result<Option<&[u8]>> {
        if handle.generation != self.generation {
            return Err(Error::StaleRow {
                expected: handle.generation,
                actual: self.generation,
            });
        }
        match handle.length {
            FieldLength::Null => Ok(None),
            FieldLength::Bytes(len) => self
                .slice(handle.start, len)
                .map(Some)
                .ok_or(Error::UnexpectedEof),
        }
    }
}

/// Decoder for binary protocol rows (COM_STMT_EXECUTE results)
///
/// The NULL bitmap is checked when the row is loaded, so `was_null` never touches the row body.
#[derive(Debug)]
pub struct BinaryRowDecoder {
    columns: Arc<[ColumnDefinition]>,
    ctx: CodecContext,
    row: RowBuffer,
}

impl BinaryRowDecoder {
    pub fn new(columns: Arc<[ColumnDefinition]>, ctx: CodecContext) -> Self {
        Self {
            columns,
            ctx,
            row: RowBuffer::default(),
        }
    }

    /// Whether field `index` of the current row is NULL, without moving the cursor.
    pub fn is_null(&self, index: usize) -> bool {
        row_null_bitmap(&self.row).is_null(index)
    }
}

fn row_null_bitmap(row: &RowBuffer) -> NullBitmap<'_> {
    let end = row.body_start.min(row.buf.len());
    NullBitmap::for_result_set(row.buf.get(1..end).unwrap_or_default())
}

fn measure_binary(
    columns: &[ColumnDefinition],
    row: &RowBuffer,
    index: usize,
    pos: usize,
) -> Result<(usize, FieldLength)> {
    if row_null_bitmap(row).is_null(index) {
        return Ok((pos, FieldLength::Null));
    }
    if let Some(width) = columns[index].column_type.fixed_binary_width() {
        return row.checked(pos, FieldLength::Bytes(width));
    }
    match row.lenenc_at(pos)? {
        (start, Some(len)) => row.checked(start, FieldLength::Bytes(len)),
        (_, None) => Err(Error::ProtocolInvariant(format!(
            "NULL length marker for column {index} ('{}') whose NULL bit is clear",
            columns[index].name
        ))),
    }
}

impl RowDecoder for BinaryRowDecoder {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn context(&self) -> &CodecContext {
        &self.ctx
    }

    fn is_binary(&self) -> bool {
        true
    }

    fn set_row(&mut self, payload: &[u8]) -> Result<()> {
        let num_columns = self.columns.len();
        split_binary_row(payload, num_columns)?;
        self.row.load(payload, binary_row_prefix_len(num_columns));
        Ok(())
    }

    fn set_position(&mut self, index: usize) -> Result<FieldLength> {
        let columns = &self.columns;
        self.row
            .seek(index, columns.len(), |row, idx, pos| measure_binary(columns, row, idx, pos))
    }

    fn was_null(&self) -> bool {
        match self.row.current {
            Some((index, _, _)) => self.is_null(index),
            None => false,
        }
    }

    fn field_length(&self) -> Option<FieldLength> {
        self.row.current.map(|(_, _, length)| length)
    }

    fn field(&self) -> Option<&[u8]> {
        self.row.field()
    }

    fn generation(&self) -> u64 {
        self.row.generation
    }

    fn handle(&self) -> Option<FieldHandle> {
        self.row.handle()
    }

    fn resolve(&self, handle: &FieldHandle) -> Result<Option<&[u8]>> {
        self.row.resolve(handle)
    }
}

/// Decoder for text protocol rows (COM_QUERY results)
///
/// NULL is only discovered by seeking to a field and finding the 0xFB marker.
#[derive(Debug)]
pub struct TextRowDecoder {
    columns: Arc<[ColumnDefinition]>,
    ctx: CodecContext,
    row: RowBuffer,
}

impl TextRowDecoder {
    pub fn new(columns: Arc<[ColumnDefinition]>, ctx: CodecContext) -> Self {
        Self {
            columns,
            ctx,
            row: RowBuffer::default(),
        }
    }
}

fn measure_text(row: &RowBuffer, _index: usize, pos: usize) -> Result<(usize, FieldLength)> {
    match row.lenenc_at(pos)? {
        (start, Some(len)) => row.checked(start, FieldLength::Bytes(len)),
        (start, None) => Ok((start, FieldLength::Null)),
    }
}

impl RowDecoder for TextRowDecoder {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn context(&self) -> &CodecContext {
        &self.ctx
    }

    fn is_binary(&self) -> bool {
        false
    }

    fn set_row(&mut self, payload: &[u8]) -> Result<()> {
        self.row.load(payload, 0);
        Ok(())
    }

    fn set_position(&mut self, index: usize) -> Result<FieldLength> {
        self.row.seek(index, self.columns.len(), measure_text)
    }

    fn was_null(&self) -> bool {
        matches!(self.row.current, Some((_, _, FieldLength::Null)))
    }

    fn field_length(&self) -> Option<FieldLength> {
        self.row.current.map(|(_, _, length)| length)
    }

    fn field(&self) -> Option<&[u8]> {
        self.row.field()
    }

    fn generation(&self) -> u64 {
        self.row.generation
    }

    fn handle(&self) -> Option<FieldHandle> {
        self.row.handle()
    }

    fn resolve(&self, handle: &FieldHandle) -> Result<Option<&[u8]>> {
        self.row.resolve(handle)
    }
}

/// Either decoder, chosen by the protocol a result set was read with
#[derive(Debug)]
pub enum AnyRowDecoder {
    Binary(BinaryRowDecoder),
    Text(TextRowDecoder),
}

impl AnyRowDecoder {
    pub fn new(columns: Arc<[ColumnDefinition]>, ctx: CodecContext, binary: bool) -> Self {
        if binary {
            AnyRowDecoder::Binary(BinaryRowDecoder::new(columns, ctx))
        } else {
            AnyRowDecoder::Text(TextRowDecoder::new(columns, ctx))
        }
    }
}

macro_rules! delegate {
    ($self:ident, $d:ident => $e:expr) => {
        match $self {
            AnyRowDecoder::Binary($d) => $e,
            AnyRowDecoder::Text($d) => $e,
        }
    };
}

impl RowDecoder for AnyRowDecoder {
    fn columns(&self) -> &[ColumnDefinition] {
        delegate!(self, d => d.columns())
    }

    fn context(&self) -> &CodecContext {
        delegate!(self, d => d.context())
    }

    fn is_binary(&self) -> bool {
        matches!(self, AnyRowDecoder::Binary(_))
    }

    fn set_row(&mut self, payload: &[u8]) -> Result<()> {
        delegate!(self, d => d.set_row(payload))
    }

    fn set_position(&mut self, index: usize) -> Result<FieldLength> {
        delegate!(self, d => d.set_position(index))
    }

    fn was_null(&self) -> bool {
        delegate!(self, d => d.was_null())
    }

    fn field_length(&self) -> Option<FieldLength> {
        delegate!(self, d => d.field_length())
    }

    fn field(&self) -> Option<&[u8]> {
        delegate!(self, d => d.field())
    }

    fn generation(&self) -> u64 {
        delegate!(self, d => d.generation())
    }

    fn handle(&self) -> Option<FieldHandle> {
        delegate!(self, d => d.handle())
    }

    fn resolve(&self, handle: &FieldHandle) -> Result<Option<&[u8]>> {
        delegate!(self, d => d.resolve(handle))
    }
}
