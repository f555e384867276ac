//! A client session on an established connection.


use chrono::FixedOffset;

use crate::batch::{
    BatchCommands, BatchConfig, BatchResult, ExecuteCommands, Framing, Pipeline, QueryCommands,
    TextCommands,
};
use crate::buffer::BufferSet;
use crate::cache::{PrepareCache, PrepareHandle};
use crate::codec::{CodecContext, utc};
use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::command::Action;
use crate::protocol::command::prepared::{
    Prepare, write_close_statement, write_execute, write_prepare, write_send_long_data,
};
use crate::protocol::command::query::{split_placeholders, write_query, write_text_query};
use crate::protocol::command::utility::{
    write_init_db, write_kill_query, write_ping, write_quit, write_reset_connection,
};
use crate::protocol::packet::{
    ErrPayloadBytes, MAX_PACKET_PAYLOAD, OkPayloadBytes, frame_payload, read_payload,
};
use crate::protocol::response::OkPayload;
use crate::protocol::r#trait::params::Params;
use crate::resultset::{QueryResult, read_response};
use crate::transport::Transport;

/// COM_STMT_SEND_LONG_DATA bytes before the data: command, statement id, parameter index
const LONG_DATA_HEADER: usize = 7;

/// Connection state negotiated by the handshake
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub capabilities: CapabilityFlags,
    /// Server thread id of the connection, used to cancel its queries
    pub thread_id: u32,
    pub max_allowed_packet: usize,
    /// Current database
    pub db: Option<String>,
    pub time_zone: FixedOffset,
    /// Status flags of the last response
    pub status: ServerStatusFlags,
}

impl SessionInfo {
    /// Session state right after a handshake that negotiated `capabilities`.
    pub fn new(opts: &Opts, capabilities: CapabilityFlags, thread_id: u32) -> Self {
        Self {
            capabilities,
            thread_id,
            max_allowed_packet: opts.max_allowed_packet,
            db: opts.db.clone(),
            time_zone: utc(),
            status: ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT,
        }
    }

    pub fn deprecate_eof(&self) -> bool {
        self.capabilities
            .contains(CapabilityFlags::CLIENT_DEPRECATE_EOF)
    }

    pub fn supports_com_multi(&self) -> bool {
        self.capabilities
            .contains(CapabilityFlags::MARIADB_CLIENT_COM_MULTI)
    }

    pub fn codec_context(&self) -> CodecContext {
        CodecContext {
            time_zone: self.time_zone,
            no_backslash_escapes: self
                .status
                .contains(ServerStatusFlags::SERVER_STATUS_NO_BACKSLASH_ESCAPES),
        }
    }
}

/// A session on one connection
///
/// Commands run one at a time. An error that leaves the connection unusable marks the
/// session broken, and every later command fails with `ConnectionClosed`.
pub struct Session<T: Transport> {
    transport: T,
    opts: Opts,
    info: SessionInfo,
    buffers: BufferSet,
    cache: PrepareCache,
    broken: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, opts: Opts, info: SessionInfo) -> Self {
        let cache = PrepareCache::new(opts.prep_stmt_cache_size);
        Self {
            transport,
            opts,
            info,
            buffers: BufferSet::new(),
            cache,
            broken: false,
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn cache(&self) -> &PrepareCache {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn thread_id(&self) -> u32 {
        self.info.thread_id
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Write the COM_QUERY payload that cancels the query running on this session.
    ///
    /// The payload must be sent on a second connection.
    pub fn kill_query_command(&self, out: &mut Vec<u8>) {
        write_kill_query(out, self.info.thread_id);
    }

    /// Run a text query and read all of its results.
    pub fn query(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        self.ensure_usable()?;
        let result = self.query_inner(sql);
        self.track(result)
    }

    fn query_inner(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        self.send_pending_closes()?;
        write_query(self.buffers.new_write_buffer(), sql);
        self.write_payload()?;
        self.read_results(false)
    }

    /// Run a text query with `?` placeholders replaced by the literal values of `params`.
    pub fn query_with<P: Params + ?Sized>(
        &mut self,
        sql: &str,
        params: &P,
    ) -> Result<Vec<QueryResult>> {
        self.ensure_usable()?;
        let result = self.query_with_inner(sql, params);
        self.track(result)
    }

    fn query_with_inner<P: Params + ?Sized>(
        &mut self,
        sql: &str,
        params: &P,
    ) -> Result<Vec<QueryResult>> {
        self.send_pending_closes()?;
        let ctx = self.info.codec_context();
        let parts = split_placeholders(sql);
        write_text_query(self.buffers.new_write_buffer(), &parts, params, &ctx)?;
        self.write_payload()?;
        self.read_results(false)
    }

    /// Prepare `sql`, reusing the cached statement for the current database if there is one.
    pub fn prepare(&mut self, sql: &str) -> Result<PrepareHandle> {
        self.ensure_usable()?;
        let result = self.prepare_inner(sql);
        self.track(result)
    }

    fn prepare_inner(&mut self, sql: &str) -> Result<PrepareHandle> {
        if let Some(handle) = self.cache.get(self.info.db.as_deref(), sql) {
            return Ok(handle);
        }

        self.send_pending_closes()?;
        write_prepare(self.buffers.new_write_buffer(), sql);
        self.write_payload()?;

        let mut prepare = Prepare::new(self.info.deprecate_eof());
        let (reader, _) = self.transport.halves();
        loop {
            read_payload(&mut *reader, &mut self.buffers.read_buffer)?;
            if prepare.drive(&self.buffers.read_buffer)? == Action::Finished {
                break;
            }
        }
        let metadata = prepare.finish()?;
        tracing::debug!(
            statement_id = metadata.statement_id,
            params = metadata.params.len(),
            "statement prepared"
        );
        Ok(self.cache.insert(self.info.db.as_deref(), sql, metadata))
    }

    /// Execute a prepared statement and read its binary results.
    ///
    /// Long-data parameters are streamed with COM_STMT_SEND_LONG_DATA first.
    pub fn execute<P: Params + ?Sized>(
        &mut self,
        stmt: &PrepareHandle,
        params: &P,
    ) -> Result<Vec<QueryResult>> {
        self.ensure_usable()?;
        let result = self.execute_inner(stmt, params);
        self.track(result)
    }

    fn execute_inner<P: Params + ?Sized>(
        &mut self,
        stmt: &PrepareHandle,
        params: &P,
    ) -> Result<Vec<QueryResult>> {
        if params.len() != stmt.params().len() {
            return Err(Error::BadUsageError(format!(
                "statement expects {} parameters but {} were given",
                stmt.params().len(),
                params.len()
            )));
        }
        self.send_pending_closes()?;

        let ctx = self.info.codec_context();
        let streamed = params.has_long_data();
        if streamed {
            self.send_long_data(stmt.statement_id(), params)?;
        }
        tracing::trace!(
            statement_id = stmt.statement_id(),
            params = %params.debug_string(&ctx),
            "execute"
        );
        write_execute(
            self.buffers.new_write_buffer(),
            stmt.statement_id(),
            params,
            &ctx,
            streamed,
        )?;
        self.write_payload()?;
        self.read_results(true)
    }

    fn send_long_data<P: Params + ?Sized>(&mut self, statement_id: u32, params: &P) -> Result<()> {
        let mut data = std::mem::take(&mut self.buffers.long_data_buffer);
        let result = self.send_long_data_with(statement_id, params, &mut data);
        self.buffers.long_data_buffer = data;
        result
    }

    fn send_long_data_with<P: Params + ?Sized>(
        &mut self,
        statement_id: u32,
        params: &P,
        data: &mut Vec<u8>,
    ) -> Result<()> {
        let chunk_size = self
            .info
            .max_allowed_packet
            .min(MAX_PACKET_PAYLOAD)
            .saturating_sub(LONG_DATA_HEADER)
            .max(1);

        for idx in 0..params.len() {
            let Some(param) = params.param(idx) else {
                continue;
            };
            if param.is_null() || !param.can_encode_long_data() {
                continue;
            }
            let param_index = u16::try_from(idx).map_err(|_| {
                Error::BadUsageError(format!("parameter index {idx} out of range"))
            })?;
            data.clear();
            param.encode_long_data(data)?;

            if data.is_empty() {
                write_send_long_data(self.buffers.new_write_buffer(), statement_id, param_index, &[]);
                self.write_payload()?;
            }
            for chunk in data.chunks(chunk_size) {
                write_send_long_data(self.buffers.new_write_buffer(), statement_id, param_index, chunk);
                self.write_payload()?;
            }
            tracing::debug!(statement_id, param_index, bytes = data.len(), "long data sent");
        }
        Ok(())
    }

    /// Close a statement now, unless it is still cached or has other handles.
    pub fn close_statement(&mut self, stmt: PrepareHandle) -> Result<()> {
        drop(stmt);
        self.ensure_usable()?;
        let result = self.send_pending_closes();
        self.track(result)
    }

    /// Execute `sql` once per parameter set in as few round trips as possible.
    ///
    /// With server prepared statements the statement is prepared through the cache and
    /// executed with each set. Otherwise each set is substituted into the query text.
    pub fn execute_batch<P: Params>(&mut self, sql: &str, param_sets: &[P]) -> Result<BatchResult> {
        if param_sets.is_empty() {
            return Ok(BatchResult::default());
        }
        self.ensure_usable()?;
        let result = self.execute_batch_inner(sql, param_sets);
        self.track(result)
    }

    fn execute_batch_inner<P: Params>(&mut self, sql: &str, param_sets: &[P]) -> Result<BatchResult> {
        if self.opts.use_server_prep_stmts {
            let stmt = self.prepare_inner(sql)?;
            if let Some(params) = param_sets.iter().find(|p| p.len() != stmt.params().len()) {
                return Err(Error::BadUsageError(format!(
                    "statement expects {} parameters but {} were given",
                    stmt.params().len(),
                    params.len()
                )));
            }
            self.run_batch(&ExecuteCommands {
                statement_id: stmt.statement_id(),
                param_sets,
            })
        } else {
            let parts = split_placeholders(sql);
            self.run_batch(&TextCommands {
                parts: &parts,
                param_sets,
            })
        }
    }

    /// Run distinct query texts in as few round trips as possible.
    pub fn execute_batch_queries<S: AsRef<str>>(&mut self, queries: &[S]) -> Result<BatchResult> {
        if queries.is_empty() {
            return Ok(BatchResult::default());
        }
        self.ensure_usable()?;
        let result = self.run_batch(&QueryCommands { queries });
        self.track(result)
    }

    fn run_batch<C: BatchCommands>(&mut self, commands: &C) -> Result<BatchResult> {
        self.send_pending_closes()?;
        let pipeline = Pipeline::new(
            self.batch_config(),
            self.info.codec_context(),
            self.info.deprecate_eof(),
        );
        pipeline.run(&mut self.transport, &mut self.buffers, commands)
    }

    fn batch_config(&self) -> BatchConfig {
        let framing = if self.opts.use_com_multi && self.info.supports_com_multi() {
            Framing::ComMulti
        } else {
            Framing::Pipelined
        };
        BatchConfig {
            max_batch_commands: self.opts.max_batch_commands,
            max_allowed_packet: self.info.max_allowed_packet,
            continue_on_error: self.opts.continue_batch_on_error,
            async_read: self.opts.use_batch_multi_send,
            framing,
        }
    }

    /// Change the current database. Cached statements are looked up per database.
    pub fn select_db(&mut self, db: &str) -> Result<()> {
        self.ensure_usable()?;
        let result = self.simple_command(|out| write_init_db(out, db));
        if result.is_ok() {
            self.info.db = Some(db.to_string());
        }
        self.track(result.map(drop))
    }

    pub fn ping(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let result = self.simple_command(write_ping);
        self.track(result.map(drop))
    }

    /// Reset session state on the server. Prepared statements are gone afterwards.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let result = self.simple_command(write_reset_connection);
        if result.is_ok() {
            self.cache.clear();
            self.cache.discard_pending_closes();
        }
        self.track(result.map(drop))
    }

    /// Send COM_QUIT and give back the transport.
    pub fn close(mut self) -> Result<T> {
        if !self.broken {
            write_quit(self.buffers.new_write_buffer());
            self.write_payload()?;
        }
        Ok(self.transport)
    }

    fn simple_command(&mut self, write: impl FnOnce(&mut Vec<u8>)) -> Result<OkPayload> {
        self.send_pending_closes()?;
        write(self.buffers.new_write_buffer());
        self.write_payload()?;
        let (reader, _) = self.transport.halves();
        read_payload(reader, &mut self.buffers.read_buffer)?;
        let payload = &self.buffers.read_buffer;
        match payload.first() {
            Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
            Some(0x00) => {
                let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
                self.info.status = ok.status_flags;
                Ok(ok)
            }
            _ => Err(Error::InvalidPacket),
        }
    }

    fn read_results(&mut self, binary: bool) -> Result<Vec<QueryResult>> {
        let (reader, _) = self.transport.halves();
        let results = read_response(
            reader,
            &mut self.buffers.read_buffer,
            binary,
            self.info.deprecate_eof(),
            self.info.codec_context(),
        )?;
        if let Some(last) = results.last() {
            self.info.status = match last {
                QueryResult::Ok(ok) => ok.status_flags,
                QueryResult::Rows(rs) => rs.status(),
            };
        }
        Ok(results)
    }

    /// Send the write buffer as one command, starting at sequence id 0.
    #[tracing::instrument(skip_all)]
    fn write_payload(&mut self) -> Result<()> {
        let payload_len = self.buffers.payload_len();
        if payload_len > self.info.max_allowed_packet {
            return Err(Error::MaxPacketExceeded {
                size: payload_len,
                max: self.info.max_allowed_packet,
                must_reconnect: false,
            });
        }
        self.buffers.frame_write_buffer(0);
        let (_, writer) = self.transport.halves();
        writer.write_all(self.buffers.write_buffer())?;
        writer.flush()?;
        Ok(())
    }

    /// Close statements released since the last command. The server does not answer these.
    fn send_pending_closes(&mut self) -> Result<()> {
        let ids = self.cache.take_pending_closes();
        if ids.is_empty() {
            return Ok(());
        }
        let packets = &mut self.buffers.batch_buffer;
        packets.clear();
        let mut payload = Vec::with_capacity(5);
        for &id in &ids {
            payload.clear();
            write_close_statement(&mut payload, id);
            frame_payload(packets, &payload, 0);
        }
        let (_, writer) = self.transport.halves();
        writer.write_all(packets)?;
        writer.flush()?;
        tracing::debug!(statements = ids.len(), "statements closed");
        Ok(())
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.broken {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    /// Mark the session broken when `result` says the connection is unusable.
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        match &result {
            Err(err) if err.is_conn_broken() => {
                tracing::warn!(error = %err, "connection marked broken");
                self.broken = true;
                self.cache.clear();
                self.cache.discard_pending_closes();
            }
            Err(Error::MaxPacketExceeded {
                must_reconnect: true,
                ..
            }) => {
                // the reconnected server has none of our statements
                self.cache.clear();
                self.cache.discard_pending_closes();
            }
            _ => {}
        }
        result
    }
}
