use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, sync_channel};
use std::thread;

use crate::batch::commands::BatchCommands;
use crate::batch::result::{BatchResult, Outcome};
use crate::batch::status::BulkStatus;
use crate::buffer::BufferSet;
use crate::codec::CodecContext;
use crate::error::{ER_NET_PACKET_TOO_LARGE, Error, Result, eyre};
use crate::protocol::command::Action;
use crate::protocol::command::multi::{begin_sub_command, end_sub_command, write_multi_header};
use crate::protocol::packet::{finish_framed, read_payload, reserve_header};
use crate::resultset::ResultCollector;
use crate::transport::Transport;

/// How the sub-commands of one packet are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Each sub-command is its own packet; the packets are written together
    Pipelined,
    /// All sub-commands are wrapped in one COM_MULTI command
    ComMulti,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Maximum number of sub-commands in one packet
    pub max_batch_commands: usize,
    /// Maximum byte length of one packet
    pub max_allowed_packet: usize,
    pub continue_on_error: bool,
    /// Read results on a background thread while later packets are sent
    pub async_read: bool,
    pub framing: Framing,
}

/// Sends the sub-commands of a batch in as few packets as possible and reads their results
/// back in order
#[derive(Debug)]
pub struct Pipeline {
    config: BatchConfig,
    ctx: CodecContext,
    deprecate_eof: bool,
}

impl Pipeline {
    pub fn new(config: BatchConfig, ctx: CodecContext, deprecate_eof: bool) -> Self {
        Self {
            config,
            ctx,
            deprecate_eof,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Execute every command of `commands`.
    ///
    /// A server error on a sub-command is recorded as its outcome. Whether the batch goes on
    /// and how failures are reported depends on `continue_on_error`, see
    /// [`BatchResult::into_result`]. When the server dropped the connection because a packet
    /// was too large, the transport is reconnected and `MaxPacketExceeded` is returned with
    /// `must_reconnect` set.
    #[tracing::instrument(skip_all)]
    pub fn run<T, C>(
        &self,
        transport: &mut T,
        buffers: &mut BufferSet,
        commands: &C,
    ) -> Result<BatchResult>
    where
        T: Transport + ?Sized,
        C: BatchCommands + ?Sized,
    {
        if commands.is_empty() {
            return Ok(BatchResult::default());
        }

        let mut status = BulkStatus::new(commands.len());
        let outcomes = if self.config.async_read {
            self.run_async(transport, buffers, commands, &mut status)
        } else {
            self.run_sync(transport, buffers, commands, &mut status)
        };

        match outcomes {
            Ok(outcomes) => BatchResult::new(outcomes, status.packets())
                .into_result(self.config.continue_on_error),
            Err(Error::ServerError(err)) if err.error_code == ER_NET_PACKET_TOO_LARGE => {
                tracing::warn!(
                    packet = status.largest_packet(),
                    max = self.config.max_allowed_packet,
                    "server closed the connection on a too large packet, reconnecting"
                );
                transport.reconnect()?;
                Err(Error::MaxPacketExceeded {
                    size: status.largest_packet(),
                    max: self.config.max_allowed_packet,
                    must_reconnect: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn run_sync<T, C>(
        &self,
        transport: &mut T,
        buffers: &mut BufferSet,
        commands: &C,
        status: &mut BulkStatus,
    ) -> Result<Vec<Outcome>>
    where
        T: Transport + ?Sized,
        C: BatchCommands + ?Sized,
    {
        let BufferSet {
            read_buffer,
            batch_buffer,
            ..
        } = buffers;
        let (reader, writer) = transport.halves();
        let mut read_back = ReadBack::new(reader, read_buffer, commands.is_binary(), self);

        while !status.is_done() {
            self.fill_packet(status, batch_buffer, commands)?;
            let count = send_packet(writer, status, batch_buffer)?;
            let failed = read_back.read_packet(count)?;
            if failed && !self.config.continue_on_error {
                break;
            }
        }
        Ok(read_back.outcomes)
    }

    fn run_async<T, C>(
        &self,
        transport: &mut T,
        buffers: &mut BufferSet,
        commands: &C,
        status: &mut BulkStatus,
    ) -> Result<Vec<Outcome>>
    where
        T: Transport + ?Sized,
        C: BatchCommands + ?Sized,
    {
        let BufferSet {
            read_buffer,
            batch_buffer,
            ..
        } = buffers;
        let (reader, writer) = transport.halves();
        let read_back = ReadBack::new(reader, read_buffer, commands.is_binary(), self);
        let continue_on_error = self.config.continue_on_error;
        let stop = AtomicBool::new(false);

        thread::scope(|scope| {
            // Carries the number of commands of each sent packet
            // a packet is handed over only after the reader is done with the previous one
            let (tx, rx) = sync_channel::<usize>(0);
            let stop = &stop;
            let handle = scope.spawn(move || {
                tracing::debug!("batch reader started");
                let mut read_back = read_back;
                let result = read_back.read_packets(rx, stop, continue_on_error);
                if result.is_err() {
                    stop.store(true, Ordering::Release);
                }
                tracing::debug!(outcomes = read_back.outcomes.len(), "batch reader stopped");
                result.map(|()| read_back.outcomes)
            });

            let mut send_result = Ok(());
            while !status.is_done() && !stop.load(Ordering::Acquire) {
                let count = match self
                    .fill_packet(status, batch_buffer, commands)
                    .and_then(|()| send_packet(writer, status, batch_buffer))
                {
                    Ok(count) => count,
                    Err(err) => {
                        send_result = Err(err);
                        break;
                    }
                };
                if tx.send(count).is_err() {
                    // reader is gone and reports why
                    break;
                }
            }
            drop(tx);

            let outcomes = handle
                .join()
                .map_err(|_| Error::LibraryBug(eyre!("batch reader thread panicked")))??;
            send_result?;
            Ok(outcomes)
        })
    }

    /// Fill `buffer` with the next packet.
    ///
    /// A sub-command that does not fit is rolled back and kept in `status` for the next
    /// packet.
    fn fill_packet<C>(&self, status: &mut BulkStatus, buffer: &mut Vec<u8>, commands: &C) -> Result<()>
    where
        C: BatchCommands + ?Sized,
    {
        buffer.clear();
        let outer = match self.config.framing {
            Framing::ComMulti => {
                let offset = reserve_header(buffer);
                write_multi_header(buffer);
                Some(offset)
            }
            Framing::Pipelined => None,
        };

        let max_commands = self.config.max_batch_commands.max(1);
        while !status.all_appended() && status.in_packet() < max_commands {
            status.mark(buffer.len());
            match status.take_deferred() {
                Some(deferred) => buffer.extend_from_slice(&deferred),
                None => self.append_command(buffer, commands, status.next_index())?,
            }

            if buffer.len() > self.config.max_allowed_packet {
                if status.in_packet() == 0 {
                    return Err(Error::MaxPacketExceeded {
                        size: buffer.len(),
                        max: self.config.max_allowed_packet,
                        must_reconnect: false,
                    });
                }
                tracing::debug!(
                    index = status.next_index(),
                    "sub-command deferred to the next packet"
                );
                status.defer(buffer);
                break;
            }
            status.commit();
        }

        if let Some(offset) = outer {
            finish_framed(buffer, offset, 0);
        }
        Ok(())
    }

    fn append_command<C>(&self, buffer: &mut Vec<u8>, commands: &C, index: usize) -> Result<()>
    where
        C: BatchCommands + ?Sized,
    {
        tracing::trace!(index, command = %commands.describe(index, &self.ctx), "batch sub-command");
        match self.config.framing {
            Framing::Pipelined => {
                let offset = reserve_header(buffer);
                commands.write_command(index, buffer, &self.ctx)?;
                finish_framed(buffer, offset, 0);
            }
            Framing::ComMulti => {
                let offset = begin_sub_command(buffer);
                commands.write_command(index, buffer, &self.ctx)?;
                end_sub_command(buffer, offset);
            }
        }
        Ok(())
    }
}

fn send_packet(writer: &mut dyn Write, status: &mut BulkStatus, packet: &[u8]) -> Result<usize> {
    writer.write_all(packet)?;
    writer.flush()?;
    let count = status.packet_sent(packet.len());
    tracing::debug!(commands = count, bytes = packet.len(), "batch packet flushed");
    Ok(count)
}

/// Reads the responses of sent sub-commands, one outcome each
struct ReadBack<'a> {
    reader: &'a mut (dyn Read + Send),
    buffer: &'a mut Vec<u8>,
    binary: bool,
    deprecate_eof: bool,
    ctx: CodecContext,
    outcomes: Vec<Outcome>,
}

impl<'a> ReadBack<'a> {
    fn new(
        reader: &'a mut (dyn Read + Send),
        buffer: &'a mut Vec<u8>,
        binary: bool,
        pipeline: &Pipeline,
    ) -> Self {
        Self {
            reader,
            buffer,
            binary,
            deprecate_eof: pipeline.deprecate_eof,
            ctx: pipeline.ctx,
            outcomes: Vec::new(),
        }
    }

    /// Read `count` responses. Returns whether any of them failed.
    fn read_packet(&mut self, count: usize) -> Result<bool> {
        let mut failed = false;
        for _ in 0..count {
            let outcome = self.read_one()?;
            failed |= !outcome.is_success();
            self.outcomes.push(outcome);
        }
        Ok(failed)
    }

    /// Read the responses of every packet announced on `packets`.
    ///
    /// After a failure without `continue_on_error`, `stop` is raised so no further packets
    /// are sent, and the packets already in flight are still read.
    fn read_packets(
        &mut self,
        packets: Receiver<usize>,
        stop: &AtomicBool,
        continue_on_error: bool,
    ) -> Result<()> {
        for count in packets {
            if self.read_packet(count)? && !continue_on_error {
                stop.store(true, Ordering::Release);
            }
        }
        Ok(())
    }

    fn read_one(&mut self) -> Result<Outcome> {
        let mut collector = ResultCollector::new(self.binary, self.deprecate_eof, self.ctx);
        loop {
            read_payload(&mut *self.reader, self.buffer)?;
            match collector.feed(self.buffer) {
                Ok(Action::NeedPayload) => {}
                Ok(Action::Finished) => return Ok(Outcome::Success(collector.finish())),
                Err(Error::ServerError(err)) if err.error_code != ER_NET_PACKET_TOO_LARGE => {
                    return Ok(Outcome::Failed(err));
                }
                Err(err) => return Err(err),
            }
        }
    }
}
