//! Buffered results of a command.

use std::io::Read;
use std::sync::Arc;

use crate::codec::{CodecContext, Value};
use crate::col::ColumnDefinition;
use crate::constant::ServerStatusFlags;
use crate::error::Result;
use crate::protocol::command::Action;
use crate::protocol::command::resultset::{ReadResult, ResultEvent};
use crate::protocol::packet::read_payload;
use crate::protocol::response::OkPayload;
use crate::row::{AnyRowDecoder, RowDecoder};

/// Rows of one result set with their column descriptors
///
/// Row payloads are stored back to back in one buffer.
#[derive(Debug, Clone)]
pub struct ResultSet {
    columns: Arc<[ColumnDefinition]>,
    binary: bool,
    ctx: CodecContext,
    data: Vec<u8>,
    row_ends: Vec<usize>,
    status: ServerStatusFlags,
}

impl ResultSet {
    pub fn new(columns: Arc<[ColumnDefinition]>, binary: bool, ctx: CodecContext) -> Self {
        Self {
            columns,
            binary,
            ctx,
            data: Vec::new(),
            row_ends: Vec::new(),
            status: ServerStatusFlags::empty(),
        }
    }

    pub fn push_row(&mut self, payload: &[u8]) {
        self.data.extend_from_slice(payload);
        self.row_ends.push(self.data.len());
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Status flags of the terminating packet
    pub fn status(&self) -> ServerStatusFlags {
        self.status
    }

    pub fn len(&self) -> usize {
        self.row_ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ends.is_empty()
    }

    /// Raw payload of row `index`
    pub fn row_payload(&self, index: usize) -> Option<&[u8]> {
        let end = *self.row_ends.get(index)?;
        let start = match index {
            0 => 0,
            _ => self.row_ends[index - 1],
        };
        Some(&self.data[start..end])
    }

    /// Cursor over the rows, reusing one decoder
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            set: self,
            decoder: AnyRowDecoder::new(Arc::clone(&self.columns), self.ctx, self.binary),
            next: 0,
        }
    }

    /// Decode every field with its column's natural kind
    pub fn collect_values(&self) -> Result<Vec<Vec<Value>>> {
        let mut rows = self.rows();
        let mut out = Vec::with_capacity(self.len());
        while let Some(row) = rows.next_row()? {
            let values = (0..row.columns().len())
                .map(|idx| row.value(idx))
                .collect::<Result<Vec<_>>>()?;
            out.push(values);
        }
        Ok(out)
    }
}

/// Cursor over a [`ResultSet`]
///
/// The decoder returned by `next_row` is loaded with the next row and invalidates the
/// previous one.
#[derive(Debug)]
pub struct Rows<'a> {
    set: &'a ResultSet,
    decoder: AnyRowDecoder,
    next: usize,
}

impl Rows<'_> {
    pub fn next_row(&mut self) -> Result<Option<&mut AnyRowDecoder>> {
        let Some(payload) = self.set.row_payload(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        self.decoder.set_row(payload)?;
        Ok(Some(&mut self.decoder))
    }
}

/// One result of a command
#[derive(Debug, Clone)]
pub enum QueryResult {
    Ok(OkPayload),
    Rows(ResultSet),
}

impl QueryResult {
    pub fn affected_rows(&self) -> u64 {
        match self {
            QueryResult::Ok(ok) => ok.affected_rows,
            QueryResult::Rows(_) => 0,
        }
    }

    pub fn result_set(&self) -> Option<&ResultSet> {
        match self {
            QueryResult::Ok(_) => None,
            QueryResult::Rows(rs) => Some(rs),
        }
    }
}

/// Collects the events of a [`ReadResult`] into [`QueryResult`]s
#[derive(Debug)]
pub struct ResultCollector {
    reader: ReadResult,
    ctx: CodecContext,
    columns: Vec<ColumnDefinition>,
    current: Option<ResultSet>,
    results: Vec<QueryResult>,
}

impl ResultCollector {
    pub fn new(binary: bool, deprecate_eof: bool, ctx: CodecContext) -> Self {
        Self {
            reader: ReadResult::new(binary, deprecate_eof),
            ctx,
            columns: Vec::new(),
            current: None,
            results: Vec::new(),
        }
    }

    pub fn feed(&mut self, payload: &[u8]) -> Result<Action> {
        match self.reader.drive(payload)? {
            ResultEvent::NoResultSet(ok) => self.results.push(QueryResult::Ok(ok)),
            ResultEvent::ResultSetStart { num_columns } => {
                self.columns.clear();
                self.columns.reserve(num_columns);
            }
            ResultEvent::Column(bytes) => {
                self.columns.push(ColumnDefinition::try_from(bytes)?);
                if self.reader.columns_complete() {
                    self.start_rows();
                }
            }
            ResultEvent::ColumnsEnd => {
                if self.current.is_none() {
                    self.start_rows();
                }
            }
            ResultEvent::Row(row) => {
                if let Some(rs) = self.current.as_mut() {
                    rs.push_row(row);
                }
            }
            ResultEvent::ResultSetEnd { status } => {
                if let Some(mut rs) = self.current.take() {
                    rs.status = status;
                    self.results.push(QueryResult::Rows(rs));
                }
            }
        }
        Ok(if self.reader.is_finished() {
            Action::Finished
        } else {
            Action::NeedPayload
        })
    }

    fn start_rows(&mut self) {
        let columns: Arc<[ColumnDefinition]> = std::mem::take(&mut self.columns).into();
        self.current = Some(ResultSet::new(columns, self.reader.is_binary(), self.ctx));
    }

    pub fn finish(self) -> Vec<QueryResult> {
        self.results
    }
}

/// Read a complete command response from `reader`.
pub fn read_response<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    binary: bool,
    deprecate_eof: bool,
    ctx: CodecContext,
) -> Result<Vec<QueryResult>> {
    let mut collector = ResultCollector::new(binary, deprecate_eof, ctx);
    loop {
        read_payload(reader, buffer)?;
        if collector.feed(buffer)? == Action::Finished {
            return Ok(collector.finish());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ColumnType;
    use crate::protocol::command::column_definition::write_column_definition;
    use crate::protocol::packet::frame_payload;
    use crate::protocol::row::{write_binary_row, write_text_row};
    use pretty_assertions::assert_eq;

    fn framed(payloads: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut seq = 1;
        for payload in payloads {
            seq = frame_payload(&mut out, payload, seq);
        }
        out
    }

    fn column(name: &str, column_type: ColumnType) -> Vec<u8> {
        let mut out = Vec::new();
        write_column_definition(&mut out, &ColumnDefinition::create(name, column_type));
        out
    }

    #[test]
    fn text_rows_through_cursor() {
        let mut rows = Vec::new();
        for (id, name) in [(b"1", Some(&b"one"[..])), (b"2", None)] {
            let mut row = Vec::new();
            write_text_row(&mut row, &[Some(&id[..]), name]);
            rows.push(row);
        }
        let wire = framed(&[
            vec![0x02],
            column("id", ColumnType::MYSQL_TYPE_LONG),
            column("name", ColumnType::MYSQL_TYPE_VAR_STRING),
            rows[0].clone(),
            rows[1].clone(),
            b"\xfe\x00\x00\x02\x00\x00\x00".to_vec(),
        ]);

        let mut buffer = Vec::new();
        let results = read_response(
            &mut wire.as_slice(),
            &mut buffer,
            false,
            true,
            CodecContext::default(),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        let rs = results[0].result_set().unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.columns()[1].name, "name");

        let mut cursor = rs.rows();
        let row = cursor.next_row().unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
        assert_eq!(row.get::<String>(1).unwrap(), "one");
        let row = cursor.next_row().unwrap().unwrap();
        assert_eq!(row.get::<Option<String>>(1).unwrap(), None);
        assert!(cursor.next_row().unwrap().is_none());
    }

    #[test]
    fn binary_rows_collect_values() {
        let ctx = CodecContext::default();
        let mut row = Vec::new();
        write_binary_row(&mut row, &[Value::I64(-1), Value::Null], &ctx).unwrap();
        let wire = framed(&[
            vec![0x02],
            column("a", ColumnType::MYSQL_TYPE_LONGLONG),
            column("b", ColumnType::MYSQL_TYPE_DOUBLE),
            b"\xfe\x00\x00\x02\x00".to_vec(),
            row,
            b"\xfe\x00\x00\x02\x00".to_vec(),
        ]);

        let mut buffer = Vec::new();
        let results = read_response(&mut wire.as_slice(), &mut buffer, true, false, ctx).unwrap();
        let values = results[0].result_set().unwrap().collect_values().unwrap();
        assert_eq!(values, vec![vec![Value::I64(-1), Value::Null]]);
    }

    #[test]
    fn ok_response() {
        let ok = OkPayload {
            affected_rows: 3,
            last_insert_id: 10,
            status_flags: ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
            info: String::new(),
        };
        let mut payload = Vec::new();
        ok.encode(&mut payload);
        let wire = framed(&[payload]);

        let mut buffer = Vec::new();
        let results = read_response(
            &mut wire.as_slice(),
            &mut buffer,
            false,
            true,
            CodecContext::default(),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].affected_rows(), 3);
    }
}
