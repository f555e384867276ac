use crate::col::ColumnDefinition;
use crate::codec::CodecContext;
use crate::constant::CommandByte;
use crate::error::{Error, Result, eyre};
use crate::protocol::command::{Action, ColumnDefinitionBytes};
use crate::protocol::packet::ErrPayloadBytes;
use crate::protocol::primitive::*;
use crate::protocol::response::terminator_status;
use crate::protocol::r#trait::params::Params;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Prepared statement OK response (zero-copy)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct PrepareOk {
    statement_id: U32LE,
    num_columns: U16LE,
    num_params: U16LE,
    _reserved: u8,
    warning_count: U16LE,
}

impl PrepareOk {
    /// Get the statement ID
    pub fn statement_id(&self) -> u32 {
        self.statement_id.get()
    }

    /// Get the number of columns in the result set
    pub fn num_columns(&self) -> u16 {
        self.num_columns.get()
    }

    /// Get the number of parameters in the prepared statement
    pub fn num_params(&self) -> u16 {
        self.num_params.get()
    }

    /// Get the warning count
    pub fn warning_count(&self) -> u16 {
        self.warning_count.get()
    }
}

/// Write COM_STMT_PREPARE command
pub fn write_prepare(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::StmtPrepare as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Read the first packet of a COM_STMT_PREPARE response
pub fn read_prepare_ok(payload: &[u8]) -> Result<&PrepareOk> {
    match payload.first() {
        Some(0x00) => {}
        Some(0xFF) => return Err(ErrPayloadBytes(payload).into()),
        _ => return Err(Error::InvalidPacket),
    }
    let (ok, _rest) = PrepareOk::ref_from_prefix(&payload[1..]).map_err(|_| Error::UnexpectedEof)?;
    Ok(ok)
}

/// Write COM_STMT_EXECUTE command
///
/// With `streamed_long_data`, long-data parameters are left out of the value block;
/// they must have been sent with COM_STMT_SEND_LONG_DATA beforehand.
pub fn write_execute<P: Params + ?Sized>(
    out: &mut Vec<u8>,
    statement_id: u32,
    params: &P,
    ctx: &CodecContext,
    streamed_long_data: bool,
) -> Result<()> {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);

    // flags (1 byte) - CURSOR_TYPE_NO_CURSOR
    write_int_1(out, 0x00);

    // iteration count (4 bytes) - always 1
    write_int_4(out, 1);

    if !params.is_empty() {
        params.write_null_bitmap(out);

        // new-params-bound-flag
        write_int_1(out, 0x01);
        params.write_types(out);

        params.write_values(out, ctx, streamed_long_data)?;
    }
    Ok(())
}

/// Write COM_STMT_SEND_LONG_DATA command. The server sends no response.
pub fn write_send_long_data(out: &mut Vec<u8>, statement_id: u32, param_index: u16, chunk: &[u8]) {
    write_int_1(out, CommandByte::StmtSendLongData as u8);
    write_int_4(out, statement_id);
    write_int_2(out, param_index);
    out.extend_from_slice(chunk);
}

/// Write COM_STMT_CLOSE command. The server sends no response.
pub fn write_close_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtClose as u8);
    write_int_4(out, statement_id);
}

/// Write COM_STMT_RESET command
pub fn write_reset_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtReset as u8);
    write_int_4(out, statement_id);
}

/// Statement id and metadata returned by COM_STMT_PREPARE
#[derive(Debug, Clone, Default)]
pub struct StatementMetadata {
    pub statement_id: u32,
    pub params: Vec<ColumnDefinition>,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Default)]
enum PrepareState {
    #[default]
    Start,
    Params {
        remaining: usize,
    },
    ParamsEof,
    Columns {
        remaining: usize,
    },
    ColumnsEof,
    Finished,
}

/// State machine for the COM_STMT_PREPARE response
///
/// Each call to `drive()` consumes one payload.
#[derive(Debug, Default)]
pub struct Prepare {
    state: PrepareState,
    deprecate_eof: bool,
    num_columns: usize,
    metadata: StatementMetadata,
}

impl Prepare {
    pub fn new(deprecate_eof: bool) -> Self {
        Self {
            deprecate_eof,
            ..Default::default()
        }
    }

    pub fn drive(&mut self, payload: &[u8]) -> Result<Action> {
        match &mut self.state {
            PrepareState::Start => {
                let ok = read_prepare_ok(payload)?;
                self.metadata.statement_id = ok.statement_id();
                self.num_columns = usize::from(ok.num_columns());
                let num_params = usize::from(ok.num_params());
                self.metadata.params.reserve(num_params);
                self.metadata.columns.reserve(self.num_columns);
                self.state = if num_params > 0 {
                    PrepareState::Params {
                        remaining: num_params,
                    }
                } else {
                    self.columns_state()
                };
            }

            PrepareState::Params { remaining } => {
                *remaining -= 1;
                let done = *remaining == 0;
                self.metadata
                    .params
                    .push(ColumnDefinition::try_from(ColumnDefinitionBytes(payload))?);
                if done {
                    self.state = if self.deprecate_eof {
                        self.columns_state()
                    } else {
                        PrepareState::ParamsEof
                    };
                }
            }

            PrepareState::ParamsEof => {
                terminator_status(payload, false)?;
                self.state = self.columns_state();
            }

            PrepareState::Columns { remaining } => {
                *remaining -= 1;
                let done = *remaining == 0;
                self.metadata
                    .columns
                    .push(ColumnDefinition::try_from(ColumnDefinitionBytes(payload))?);
                if done {
                    self.state = if self.deprecate_eof {
                        PrepareState::Finished
                    } else {
                        PrepareState::ColumnsEof
                    };
                }
            }

            PrepareState::ColumnsEof => {
                terminator_status(payload, false)?;
                self.state = PrepareState::Finished;
            }

            PrepareState::Finished => return Err(Error::InvalidPacket),
        }

        Ok(match self.state {
            PrepareState::Finished => Action::Finished,
            _ => Action::NeedPayload,
        })
    }

    fn columns_state(&self) -> PrepareState {
        if self.num_columns > 0 {
            PrepareState::Columns {
                remaining: self.num_columns,
            }
        } else {
            PrepareState::Finished
        }
    }

    /// The parsed metadata, once `drive` returned `Action::Finished`.
    pub fn finish(self) -> Result<StatementMetadata> {
        match self.state {
            PrepareState::Finished => Ok(self.metadata),
            state => Err(Error::LibraryBug(eyre!(
                "prepare response read incompletely: {state:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use crate::constant::ColumnType;
    use crate::protocol::command::column_definition::write_column_definition;
    use crate::protocol::r#trait::param::Parameter;
    use pretty_assertions::assert_eq;

    fn prepare_ok(statement_id: u32, num_columns: u16, num_params: u16) -> Vec<u8> {
        let mut out = vec![0x00];
        write_int_4(&mut out, statement_id);
        write_int_2(&mut out, num_columns);
        write_int_2(&mut out, num_params);
        write_int_1(&mut out, 0);
        write_int_2(&mut out, 0);
        out
    }

    fn column(name: &str, column_type: ColumnType) -> Vec<u8> {
        let mut out = Vec::new();
        write_column_definition(&mut out, &ColumnDefinition::create(name, column_type));
        out
    }

    #[test]
    fn prepare_response_with_eof_packets() {
        let eof = b"\xfe\x00\x00\x02\x00".to_vec();
        let payloads = [
            prepare_ok(7, 1, 2),
            column("?", ColumnType::MYSQL_TYPE_VAR_STRING),
            column("?", ColumnType::MYSQL_TYPE_VAR_STRING),
            eof.clone(),
            column("id", ColumnType::MYSQL_TYPE_LONG),
            eof,
        ];
        let mut prepare = Prepare::new(false);
        let mut actions = Vec::new();
        for payload in &payloads {
            actions.push(prepare.drive(payload).unwrap());
        }
        assert_eq!(actions.last(), Some(&Action::Finished));
        assert!(actions[..5].iter().all(|a| *a == Action::NeedPayload));

        let metadata = prepare.finish().unwrap();
        assert_eq!(metadata.statement_id, 7);
        assert_eq!(metadata.params.len(), 2);
        assert_eq!(metadata.columns[0].name, "id");
    }

    #[test]
    fn prepare_response_without_metadata() {
        let mut prepare = Prepare::new(true);
        assert_eq!(prepare.drive(&prepare_ok(3, 0, 0)).unwrap(), Action::Finished);
        assert_eq!(prepare.finish().unwrap().statement_id, 3);
    }

    #[test]
    fn prepare_error() {
        let mut prepare = Prepare::new(true);
        let err = prepare
            .drive(b"\xff\x28\x04#42000You have an error")
            .unwrap_err();
        assert!(matches!(err, Error::ServerError(e) if e.error_code == 1064));
    }

    #[test]
    fn execute_layout() {
        let params = [Parameter::new(5i32), Parameter::new(Value::Null)];
        let mut out = Vec::new();
        write_execute(&mut out, 9, &params, &CodecContext::default(), false).unwrap();
        assert_eq!(
            out,
            [
                0x17, 9, 0, 0, 0, // command, statement id
                0x00, 1, 0, 0, 0, // flags, iteration count
                0b0000_0010, // NULL bitmap
                0x01, // new params bound
                0x03, 0x00, 0x06, 0x00, // types
                5, 0, 0, 0, // values
            ]
        );
    }

    #[test]
    fn execute_without_params() {
        let mut out = Vec::new();
        write_execute(&mut out, 1, &(), &CodecContext::default(), false).unwrap();
        assert_eq!(out, [0x17, 1, 0, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn long_data_and_close() {
        let mut out = Vec::new();
        write_send_long_data(&mut out, 2, 1, b"abc");
        assert_eq!(out, [0x18, 2, 0, 0, 0, 1, 0, b'a', b'b', b'c']);

        out.clear();
        write_close_statement(&mut out, 2);
        assert_eq!(out, [0x19, 2, 0, 0, 0]);
    }
}
