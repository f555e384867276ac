use crate::protocol::packet::{PACKET_HEADER_SIZE, finish_framed};

/// Reusable byte buffers of one session
///
/// Contents are only meaningful during the command that filled them.
#[derive(Debug)]
pub struct BufferSet {
    /// Last payload read from the server
    pub read_buffer: Vec<u8>,

    /// One outgoing command: `[4-byte header space][payload]`.
    /// The payload may exceed 16MB until it is framed.
    write_buffer: Vec<u8>,

    /// Encoded long-data parameter, before it is cut into COM_STMT_SEND_LONG_DATA chunks
    pub long_data_buffer: Vec<u8>,

    /// Framed packets of one batch flush
    pub batch_buffer: Vec<u8>,
}

impl BufferSet {
    /// Create a new empty buffer set
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::new(),
            write_buffer: vec![0; PACKET_HEADER_SIZE],
            long_data_buffer: Vec::new(),
            batch_buffer: Vec::new(),
        }
    }

    /// Clear the write buffer, reserve 4 bytes for the header, and return mutable access.
    #[inline]
    pub fn new_write_buffer(&mut self) -> &mut Vec<u8> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(&[0u8; PACKET_HEADER_SIZE]);
        &mut self.write_buffer
    }

    /// Get mutable access to the write buffer.
    #[inline]
    pub fn write_buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.write_buffer
    }

    /// Get the write buffer for reading.
    #[inline]
    pub fn write_buffer(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Get the payload length (total buffer length minus 4-byte header).
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.write_buffer.len().saturating_sub(PACKET_HEADER_SIZE)
    }

    /// Fill in the reserved header, splitting the payload into 16MB packets if needed.
    ///
    /// Returns the sequence id following the last packet.
    pub fn frame_write_buffer(&mut self, sequence_id: u8) -> u8 {
        finish_framed(&mut self.write_buffer, 0, sequence_id)
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}
