use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::packet::{ErrPayloadBytes, OkPayloadBytes};
use crate::protocol::primitive::*;
use crate::protocol::response::{OkPayload, is_row_terminator, terminator_status};
use crate::protocol::row::BINARY_ROW_HEADER;

/// Event produced by one step of [`ReadResult`]
#[derive(Debug)]
pub enum ResultEvent<'a> {
    /// The statement returned OK without a result set
    NoResultSet(OkPayload),
    ResultSetStart { num_columns: usize },
    /// Column definition packet (raw bytes)
    Column(ColumnDefinitionBytes<'a>),
    /// Columns are complete and rows follow
    ColumnsEnd,
    /// Row payload, in the binary or the text layout
    Row(&'a [u8]),
    ResultSetEnd { status: ServerStatusFlags },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Start,
    Columns {
        remaining: usize,
    },
    ColumnsEof,
    Rows,
    Finished,
}

/// State machine for the response to COM_QUERY (text rows) or COM_STMT_EXECUTE (binary rows)
///
/// Each call to `drive()` consumes one payload and yields one event. Multiple results
/// (`SERVER_MORE_RESULTS_EXISTS`) are read until the last one. An ERR packet ends the
/// response and is returned as `Error::ServerError`.
#[derive(Debug, Default)]
pub struct ReadResult {
    state: State,
    binary: bool,
    deprecate_eof: bool,
}

impl ReadResult {
    pub fn new(binary: bool, deprecate_eof: bool) -> Self {
        Self {
            state: State::Start,
            binary,
            deprecate_eof,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn drive<'a>(&mut self, payload: &'a [u8]) -> Result<ResultEvent<'a>> {
        match &mut self.state {
            State::Start => match payload.first() {
                None => Err(Error::InvalidPacket),
                Some(0xFF) => {
                    self.state = State::Finished;
                    Err(ErrPayloadBytes(payload).into())
                }
                Some(0x00) => {
                    let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
                    self.state = self.next_result(ok.status_flags);
                    Ok(ResultEvent::NoResultSet(ok))
                }
                Some(0xFB) => {
                    self.state = State::Finished;
                    Err(Error::BadUsageError(
                        "LOCAL INFILE requests are not supported".to_string(),
                    ))
                }
                Some(_) => {
                    let (column_count, _rest) = read_int_lenenc(payload)?;
                    let num_columns = lenenc_to_usize(column_count)?;
                    if num_columns == 0 {
                        return Err(Error::InvalidPacket);
                    }
                    self.state = State::Columns {
                        remaining: num_columns,
                    };
                    Ok(ResultEvent::ResultSetStart { num_columns })
                }
            },

            State::Columns { remaining } => {
                *remaining -= 1;
                if *remaining == 0 {
                    self.state = if self.deprecate_eof {
                        State::Rows
                    } else {
                        State::ColumnsEof
                    };
                }
                Ok(ResultEvent::Column(ColumnDefinitionBytes(payload)))
            }

            State::ColumnsEof => {
                terminator_status(payload, false)?;
                self.state = State::Rows;
                Ok(ResultEvent::ColumnsEnd)
            }

            State::Rows => match payload.first() {
                None => Err(Error::InvalidPacket),
                // A text row starts with a length prefix, which is never 0xFF
                Some(0xFF) => {
                    self.state = State::Finished;
                    Err(ErrPayloadBytes(payload).into())
                }
                Some(_) if is_row_terminator(payload) => {
                    let status = terminator_status(payload, self.deprecate_eof)?;
                    self.state = self.next_result(status);
                    Ok(ResultEvent::ResultSetEnd { status })
                }
                Some(&header) if self.binary && header != BINARY_ROW_HEADER => {
                    Err(Error::InvalidPacket)
                }
                Some(_) => Ok(ResultEvent::Row(payload)),
            },

            State::Finished => Err(Error::InvalidPacket),
        }
    }

    fn next_result(&self, status: ServerStatusFlags) -> State {
        if status.contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS) {
            State::Start
        } else {
            State::Finished
        }
    }

    /// Whether the next event is the end of the column list.
    ///
    /// With `CLIENT_DEPRECATE_EOF` there is no packet for it, so callers emit it themselves
    /// after the last column.
    pub fn columns_complete(&self) -> bool {
        self.state == State::Rows || self.state == State::ColumnsEof
    }
}
