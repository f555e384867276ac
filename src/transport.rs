//! Byte transports a [`Session`](crate::Session) runs on.
//!
//! Connection establishment and authentication happen before a transport is handed to a
//! session. A transport only moves bytes and can reopen its socket.

use std::io::{self, BufReader, Cursor, Read, Write};
use std::net::TcpStream;

use auto_impl::auto_impl;

use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::packet::{frame_payload, read_payload};
use crate::protocol::response::{ErrPayload, OkPayload};

/// A bidirectional byte stream to the server
///
/// The reader and writer halves are borrowed separately so that results can be read on a
/// background thread while the next packet is written.
#[auto_impl(&mut, Box)]
pub trait Transport {
    fn halves(&mut self) -> (&mut (dyn Read + Send), &mut dyn Write);

    /// Reopen the underlying connection after the server dropped it.
    fn reconnect(&mut self) -> Result<()>;
}

/// TCP transport over `std::net::TcpStream`
#[derive(Debug)]
pub struct TcpTransport {
    addr: String,
    opts: Opts,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TcpTransport {
    pub fn connect(opts: &Opts) -> Result<Self> {
        if opts.host.is_empty() {
            return Err(Error::BadConfigError(
                "Missing host in connection options".to_string(),
            ));
        }
        let addr = format!("{}:{}", opts.host, opts.port);
        let (reader, writer) = Self::open(&addr, opts)?;
        Ok(Self {
            addr,
            opts: opts.clone(),
            reader,
            writer,
        })
    }

    fn open(addr: &str, opts: &Opts) -> Result<(BufReader<TcpStream>, TcpStream)> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(opts.tcp_nodelay)?;
        stream.set_read_timeout(opts.socket_timeout)?;
        let writer = stream.try_clone()?;
        Ok((BufReader::new(stream), writer))
    }
}

impl Transport for TcpTransport {
    fn halves(&mut self) -> (&mut (dyn Read + Send), &mut dyn Write) {
        (&mut self.reader, &mut self.writer)
    }

    fn reconnect(&mut self) -> Result<()> {
        tracing::warn!(addr = %self.addr, "reconnecting");
        let (reader, writer) = Self::open(&self.addr, &self.opts)?;
        self.reader = reader;
        self.writer = writer;
        Ok(())
    }
}

/// Server bytes played back by a [`MemoryTransport`]
#[derive(Debug, Default)]
struct Script {
    data: Cursor<Vec<u8>>,
    timeout_when_drained: bool,
}

impl Read for Script {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        if n == 0 && !buf.is_empty() && self.timeout_when_drained {
            return Err(io::ErrorKind::TimedOut.into());
        }
        Ok(n)
    }
}

/// Client bytes, one entry per flush
#[derive(Debug, Default)]
struct Recorder {
    flushed: Vec<Vec<u8>>,
    pending: Vec<u8>,
}

impl Write for Recorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.flushed.push(std::mem::take(&mut self.pending));
        }
        Ok(())
    }
}

/// In-memory transport that replays scripted server packets and records what the client
/// writes
///
/// Every flush is recorded as one network write, so a batch flush shows up as one entry.
/// Once the script is drained, reads fail with `UnexpectedEof`, or with `TimedOut` after
/// [`MemoryTransport::timeout_when_drained`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    script: Script,
    recorder: Recorder,
    sequence_id: u8,
    reconnects: usize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a server payload.
    pub fn push_payload(&mut self, payload: &[u8]) -> &mut Self {
        self.sequence_id = frame_payload(self.script.data.get_mut(), payload, self.sequence_id);
        self
    }

    pub fn push_ok(&mut self, affected_rows: u64) -> &mut Self {
        let mut payload = Vec::new();
        OkPayload {
            affected_rows,
            last_insert_id: 0,
            status_flags: ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
            info: String::new(),
        }
        .encode(&mut payload);
        self.push_payload(&payload)
    }

    pub fn push_err(&mut self, error_code: u16, sql_state: &str, message: &str) -> &mut Self {
        let mut payload = Vec::new();
        ErrPayload {
            error_code,
            sql_state: sql_state.to_string(),
            message: message.to_string(),
        }
        .encode(&mut payload);
        self.push_payload(&payload)
    }

    /// Make reads past the end of the script time out instead of hitting end of file.
    pub fn timeout_when_drained(&mut self) -> &mut Self {
        self.script.timeout_when_drained = true;
        self
    }

    /// Bytes of each flushed write
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.recorder.flushed
    }

    /// Client payloads of every flushed write, with packet headers removed
    pub fn sent_payloads(&self) -> Result<Vec<Vec<u8>>> {
        let mut payloads = Vec::new();
        for write in &self.recorder.flushed {
            let mut reader = write.as_slice();
            while !reader.is_empty() {
                let mut payload = Vec::new();
                read_payload(&mut reader, &mut payload)?;
                payloads.push(payload);
            }
        }
        Ok(payloads)
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects
    }

    /// Scripted bytes not yet read by the client
    pub fn remaining(&self) -> usize {
        let data = &self.script.data;
        data.get_ref().len().saturating_sub(data.position() as usize)
    }
}

impl Transport for MemoryTransport {
    fn halves(&mut self) -> (&mut (dyn Read + Send), &mut dyn Write) {
        (&mut self.script, &mut self.recorder)
    }

    fn reconnect(&mut self) -> Result<()> {
        self.reconnects += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flushes_are_recorded_separately() {
        let mut transport = MemoryTransport::new();
        {
            let (_, writer) = transport.halves();
            writer.write_all(b"\x01\x00\x00\x00\x0e").unwrap();
            writer.flush().unwrap();
            writer.write_all(b"\x01\x00\x00\x00\x0e").unwrap();
            writer.write_all(b"\x01\x00\x00\x00\x01").unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(transport.writes().len(), 2);
        assert_eq!(
            transport.sent_payloads().unwrap(),
            vec![vec![0x0e], vec![0x0e], vec![0x01]]
        );
    }

    #[test]
    fn scripted_reads() {
        let mut transport = MemoryTransport::new();
        transport.push_ok(2).push_err(1146, "42S02", "missing");
        let mut buffer = Vec::new();
        let (reader, _) = transport.halves();
        assert_eq!(read_payload(&mut *reader, &mut buffer).unwrap(), 0);
        assert_eq!(buffer[0], 0x00);
        assert_eq!(read_payload(&mut *reader, &mut buffer).unwrap(), 1);
        assert_eq!(buffer[0], 0xFF);
        assert!(matches!(
            read_payload(&mut *reader, &mut buffer),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn drained_script_times_out() {
        let mut transport = MemoryTransport::new();
        transport.timeout_when_drained();
        let mut buffer = Vec::new();
        let (reader, _) = transport.halves();
        assert!(matches!(
            read_payload(&mut *reader, &mut buffer),
            Err(Error::ConnectionTimeout)
        ));
    }
}
