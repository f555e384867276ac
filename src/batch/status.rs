/// Counters of one batch execution
///
/// Lives for a single `execute_batch` call.
#[derive(Debug, Default)]
pub struct BulkStatus {
    total: usize,
    /// Commands in packets already flushed
    sent: usize,
    /// Commands in the packet being filled
    in_packet: usize,
    /// Offset of the sub-command being appended, for rollback
    mark: usize,
    /// A sub-command rolled back out of a full packet, already framed
    deferred: Option<Vec<u8>>,
    packets: usize,
    largest_packet: usize,
}

impl BulkStatus {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn in_packet(&self) -> usize {
        self.in_packet
    }

    pub fn packets(&self) -> usize {
        self.packets
    }

    /// Byte length of the largest packet flushed so far
    pub fn largest_packet(&self) -> usize {
        self.largest_packet
    }

    /// Index of the next command to append
    pub fn next_index(&self) -> usize {
        self.sent + self.in_packet
    }

    /// Whether every command has been appended to some packet
    pub fn all_appended(&self) -> bool {
        self.next_index() >= self.total
    }

    pub fn is_done(&self) -> bool {
        self.sent >= self.total
    }

    /// Remember where the next sub-command starts.
    pub fn mark(&mut self, offset: usize) {
        self.mark = offset;
    }

    /// Count the sub-command appended since the last `mark`.
    pub fn commit(&mut self) {
        self.in_packet += 1;
    }

    /// Move the sub-command appended since the last `mark` out of `buffer`.
    pub fn defer(&mut self, buffer: &mut Vec<u8>) {
        self.deferred = Some(buffer.split_off(self.mark));
    }

    pub fn take_deferred(&mut self) -> Option<Vec<u8>> {
        self.deferred.take()
    }

    /// Account the current packet of `bytes` bytes as sent. Returns its number of commands.
    pub fn packet_sent(&mut self, bytes: usize) -> usize {
        let count = self.in_packet;
        self.sent += count;
        self.in_packet = 0;
        self.packets += 1;
        self.largest_packet = self.largest_packet.max(bytes);
        debug_assert!(self.sent <= self.total, "sent more commands than the batch has");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defer_moves_the_last_sub_command() {
        let mut status = BulkStatus::new(3);
        let mut buffer = b"one".to_vec();
        status.mark(0);
        status.commit();
        status.mark(buffer.len());
        buffer.extend_from_slice(b"two");
        status.defer(&mut buffer);

        assert_eq!(buffer, b"one");
        assert_eq!(status.next_index(), 1);
        assert_eq!(status.packet_sent(buffer.len()), 1);
        assert_eq!(status.largest_packet(), 3);
        assert_eq!(status.take_deferred().as_deref(), Some(&b"two"[..]));
        assert!(status.take_deferred().is_none());
        assert_eq!(status.sent(), 1);
        assert!(!status.is_done());
    }

    #[test]
    fn empty_batch_is_done() {
        let status = BulkStatus::new(0);
        assert!(status.is_done());
        assert!(status.all_appended());
    }
}
