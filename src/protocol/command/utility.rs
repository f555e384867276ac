use crate::constant::CommandByte;
use crate::protocol::primitive::*;

/// Write COM_QUIT command
pub fn write_quit(out: &mut Vec<u8>) {
    write_int_1(out, CommandByte::Quit as u8);
}

/// Write COM_PING command
pub fn write_ping(out: &mut Vec<u8>) {
    write_int_1(out, CommandByte::Ping as u8);
}

/// Write COM_INIT_DB command
pub fn write_init_db(out: &mut Vec<u8>, database: &str) {
    write_int_1(out, CommandByte::InitDb as u8);
    out.extend_from_slice(database.as_bytes());
}

/// Write COM_RESET_CONNECTION command
pub fn write_reset_connection(out: &mut Vec<u8>) {
    write_int_1(out, CommandByte::ResetConnection as u8);
}

/// Write the COM_QUERY that cancels the statement running on connection `thread_id`
///
/// It must be sent from a different connection than the one being cancelled.
pub fn write_kill_query(out: &mut Vec<u8>, thread_id: u32) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(format!("KILL QUERY {thread_id}").as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_query() {
        let mut out = Vec::new();
        write_kill_query(&mut out, 42);
        assert_eq!(out, b"\x03KILL QUERY 42");
    }

    #[test]
    fn single_byte_commands() {
        let mut out = Vec::new();
        write_ping(&mut out);
        write_quit(&mut out);
        write_reset_connection(&mut out);
        assert_eq!(out, [0x0e, 0x01, 0x1f]);
    }
}
