//! Batched execution through a session.

use pretty_assertions::assert_eq;
use zero_mysql_core::col::ColumnDefinition;
use zero_mysql_core::constant::{CapabilityFlags, ColumnType};
use zero_mysql_core::protocol::command::column_definition::write_column_definition;
use zero_mysql_core::protocol::command::multi::split_multi;
use zero_mysql_core::{Error, MemoryTransport, Opts, Parameter, Session, SessionInfo};

const INSERT: &str = "INSERT INTO t (a) VALUES (?)";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn session_with(opts: Opts, capabilities: CapabilityFlags) -> Session<MemoryTransport> {
    init_tracing();
    let capabilities =
        capabilities | CapabilityFlags::CLIENT_PROTOCOL_41 | CapabilityFlags::CLIENT_DEPRECATE_EOF;
    let info = SessionInfo::new(&opts, capabilities, 11);
    Session::new(MemoryTransport::new(), opts, info)
}

fn session(opts: Opts) -> Session<MemoryTransport> {
    session_with(opts, CapabilityFlags::empty())
}

fn push_prepare_ok(transport: &mut MemoryTransport, statement_id: u32) {
    let mut ok = vec![0x00];
    ok.extend_from_slice(&statement_id.to_le_bytes());
    ok.extend_from_slice(&0_u16.to_le_bytes());
    ok.extend_from_slice(&1_u16.to_le_bytes());
    ok.push(0);
    ok.extend_from_slice(&0_u16.to_le_bytes());
    transport.push_payload(&ok);

    let mut def = Vec::new();
    write_column_definition(
        &mut def,
        &ColumnDefinition::create("?", ColumnType::MYSQL_TYPE_LONGLONG),
    );
    transport.push_payload(&def);
}

fn param_sets(count: i32) -> Vec<Vec<Parameter>> {
    (1..=count).map(|i| vec![Parameter::new(i)]).collect()
}

fn prepared_batch(use_batch_multi_send: bool) {
    let mut session = session(Opts {
        max_batch_commands: 2,
        use_batch_multi_send,
        ..Opts::default()
    });
    push_prepare_ok(session.transport_mut(), 3);
    for _ in 0..5 {
        session.transport_mut().push_ok(1);
    }

    let result = session.execute_batch(INSERT, &param_sets(5)).unwrap();
    assert_eq!(result.len(), 5);
    assert_eq!(result.packets_sent(), 3);
    assert_eq!(result.affected_rows(), 5);

    let transport = session.transport();
    // the prepare, then one write per packet
    assert_eq!(transport.writes().len(), 4);
    let payloads = transport.sent_payloads().unwrap();
    assert_eq!(payloads[0][0], 0x16);
    assert!(payloads[1..].iter().all(|p| p[..5] == [0x17, 3, 0, 0, 0]));
    assert_eq!(payloads.len(), 6);
    assert_eq!(transport.remaining(), 0);

    // the statement stays cached for the next batch
    assert_eq!(session.cache().len(), 1);
}

#[test]
fn test_prepared_batch_sync() {
    prepared_batch(false);
}

#[test]
fn test_prepared_batch_async() {
    prepared_batch(true);
}

#[test]
fn test_text_batch_without_server_prepare() {
    let mut session = session(Opts {
        use_server_prep_stmts: false,
        ..Opts::default()
    });
    session.transport_mut().push_ok(1).push_ok(1);

    let sets = vec![
        vec![Parameter::new(1_i32), Parameter::new("a")],
        vec![Parameter::new(2_i32), Parameter::new(None::<&str>)],
    ];
    let result = session
        .execute_batch("INSERT INTO t VALUES (?, ?)", &sets)
        .unwrap();
    assert_eq!(result.len(), 2);

    let payloads = session.transport().sent_payloads().unwrap();
    assert_eq!(
        payloads,
        vec![
            b"\x03INSERT INTO t VALUES (1, 'a')".to_vec(),
            b"\x03INSERT INTO t VALUES (2, null)".to_vec(),
        ]
    );
    // both commands went out in one write
    assert_eq!(session.transport().writes().len(), 1);
}

#[test]
fn test_com_multi_when_negotiated() {
    let opts = Opts {
        use_com_multi: true,
        ..Opts::default()
    };
    let queries = ["DELETE FROM a", "DELETE FROM b", "DELETE FROM c"];

    let mut multi = session_with(opts.clone(), CapabilityFlags::MARIADB_CLIENT_COM_MULTI);
    multi.transport_mut().push_ok(1).push_ok(2).push_ok(3);
    let result = multi.execute_batch_queries(&queries).unwrap();
    assert_eq!(result.affected_rows(), 6);
    let payloads = multi.transport().sent_payloads().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0][0], 0xfe);
    let sub_commands = split_multi(&payloads[0]).unwrap();
    assert_eq!(sub_commands.len(), 3);
    assert_eq!(&sub_commands[2][1..], b"DELETE FROM c");

    // a server without COM_MULTI gets plain pipelined packets
    let mut plain = session(opts);
    plain.transport_mut().push_ok(1).push_ok(2).push_ok(3);
    plain.execute_batch_queries(&queries).unwrap();
    assert_eq!(plain.transport().sent_payloads().unwrap().len(), 3);
}

#[test]
fn test_continue_on_error_collects_failures() {
    let mut session = session(Opts::default());
    session
        .transport_mut()
        .push_ok(1)
        .push_err(1062, "23000", "Duplicate entry '2' for key 'PRIMARY'")
        .push_ok(1)
        .push_err(1452, "23000", "Cannot add or update a child row")
        .push_ok(0);

    let queries = ["q1", "q2", "q3", "q4"];
    let err = session.execute_batch_queries(&queries).unwrap_err();
    assert_eq!(err.to_string(), "2 of 4 batch commands failed");
    let Error::BatchPartialFailure(result) = err else {
        panic!("expected a partial failure");
    };
    let failed: Vec<usize> = result.failures().map(|(idx, _)| idx).collect();
    assert_eq!(failed, vec![1, 3]);
    assert_eq!(result.first_failure().map(|(_, e)| e.error_code), Some(1062));

    // the connection is still in sync
    assert!(!session.is_broken());
    session.ping().unwrap();
}

#[test]
fn test_stop_on_error_reports_first_failure() {
    let mut session = session(Opts {
        continue_batch_on_error: false,
        use_batch_multi_send: false,
        max_batch_commands: 1,
        ..Opts::default()
    });
    session
        .transport_mut()
        .push_ok(1)
        .push_err(1062, "23000", "Duplicate entry")
        .push_ok(1);

    let err = session.execute_batch_queries(&["q1", "q2", "q3"]).unwrap_err();
    assert!(matches!(err, Error::ServerError(ref e) if e.error_code == 1062));
    assert_eq!(session.transport().writes().len(), 2);
    assert!(!session.is_broken());
}

#[test]
fn test_oversized_command_is_rejected_before_sending() {
    let mut session = session(Opts {
        max_allowed_packet: 64,
        use_server_prep_stmts: false,
        ..Opts::default()
    });
    let long = "x".repeat(100);

    let err = session
        .execute_batch("INSERT INTO t VALUES (?)", &[vec![Parameter::new(long.as_str())]])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MaxPacketExceeded {
            max: 64,
            must_reconnect: false,
            ..
        }
    ));
    assert!(!err.is_retryable());
    assert!(session.transport().writes().is_empty());
    assert!(!session.is_broken());
}

#[test]
fn test_packet_too_large_reconnects_and_drops_statements() {
    let mut session = session(Opts::default());
    push_prepare_ok(session.transport_mut(), 8);
    drop(session.prepare(INSERT).unwrap());
    assert_eq!(session.cache().len(), 1);

    session
        .transport_mut()
        .push_err(1153, "08S01", "Got a packet bigger than 'max_allowed_packet' bytes");
    let err = session
        .execute_batch_queries(&["INSERT INTO big VALUES ('...')"])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MaxPacketExceeded {
            must_reconnect: true,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(session.transport().reconnect_count(), 1);
    assert!(session.cache().is_empty());
    assert!(!session.is_broken());

    // the reconnected session does not close statements of the old connection
    session.transport_mut().push_ok(0);
    session.ping().unwrap();
    let last = session.transport().sent_payloads().unwrap().pop();
    assert_eq!(last, Some(vec![0x0e]));
    assert_eq!(session.transport().writes().len(), 3);
}

#[test]
fn test_empty_batch_sends_nothing() {
    let mut session = session(Opts::default());
    let sets: Vec<Vec<Parameter>> = Vec::new();
    let result = session.execute_batch(INSERT, &sets).unwrap();
    assert!(result.is_empty());
    assert!(session.transport().writes().is_empty());
}
