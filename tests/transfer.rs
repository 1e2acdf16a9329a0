//! End-to-end transfers against a live server on loopback
mod common;

use std::time::Duration;

use common::{MAX_RETRIES, TIMEOUT_MS, TestServer, pattern, wait_for_file};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tftpd::protocol::{BLOCK_SIZE, ErrorCode, Packet, RequestKind};

const QUIET: Duration = Duration::from_millis(3 * TIMEOUT_MS);

fn code(c: ErrorCode) -> u16 {
    c.as_u16()
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(511)]
#[case(512)]
#[case(513)]
#[case(1024)]
#[case(1025)]
#[tokio::test]
async fn read_sends_expected_blocks(#[case] size: usize) {
    let server = TestServer::start().await;
    let content = pattern(size);
    server.add_file("f.bin", &content);

    let received = server.client().await.read_file("f.bin").await.unwrap();

    let count = size / BLOCK_SIZE + 1;
    let expected: Vec<u16> = (1..=u16::try_from(count).unwrap()).collect();
    assert_eq!(received.blocks, expected);
    assert_eq!(received.content, content);
    assert_ne!(received.tid, server.addr);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(511)]
#[case(512)]
#[case(513)]
#[case(1024)]
#[case(1025)]
#[tokio::test]
async fn write_then_read_round_trip(#[case] size: usize) {
    let server = TestServer::start_with(|c| c.write_root = c.read_root.clone()).await;
    let content = pattern(size);
    let mut client = server.client().await;

    let tid = client.write_file("rt.bin", &content).await.unwrap();
    assert_ne!(tid, server.addr);
    let stored = wait_for_file(&server.read_dir.path().join("rt.bin")).await;
    assert_eq!(stored, content);

    let received = client.read_file("rt.bin").await.unwrap();
    assert_eq!(received.content, content);
}

#[rstest]
#[case::below_cap(MAX_RETRIES - 1, true)]
#[case::at_cap(MAX_RETRIES, false)]
#[tokio::test]
async fn read_retransmits_unacknowledged_data(#[case] drops: u32, #[case] completes: bool) {
    let server = TestServer::start().await;
    let content = pattern(700);
    server.add_file("f", &content);
    let first = Packet::Data {
        block: 1,
        payload: content[..BLOCK_SIZE].to_vec(),
    };

    let mut client = server.client().await;
    client.request(RequestKind::Read, "f", "octet").await;
    let mut tid = None;
    for _ in 0..drops {
        let (packet, from) = client.recv().await;
        assert_eq!(packet, first);
        tid = Some(from);
    }

    let (packet, from) = client.recv().await;
    assert_eq!(Some(from), tid);
    if completes {
        assert_eq!(packet, first);
        client.send_to(&Packet::encode_ack(1), from).await;
        let (packet, _) = client.recv().await;
        assert_eq!(
            packet,
            Packet::Data {
                block: 2,
                payload: content[BLOCK_SIZE..].to_vec()
            }
        );
        client.send_to(&Packet::encode_ack(2), from).await;
    } else {
        assert_eq!(
            packet,
            Packet::error(
                ErrorCode::NotDefined,
                "Maximum number of retransmissions reached."
            )
        );
    }
    assert!(client.recv_within(QUIET).await.is_none());
}

#[rstest]
#[case::below_cap(MAX_RETRIES - 1, true)]
#[case::at_cap(MAX_RETRIES, false)]
#[tokio::test]
async fn write_retransmits_unanswered_ack(#[case] drops: u32, #[case] completes: bool) {
    let server = TestServer::start().await;
    let mut client = server.client().await;
    client.request(RequestKind::Write, "w", "octet").await;
    for _ in 0..drops {
        assert_eq!(client.recv().await.0, Packet::Ack { block: 0 });
    }

    let (packet, tid) = client.recv().await;
    if completes {
        assert_eq!(packet, Packet::Ack { block: 0 });
        client.send_to(&Packet::encode_data(1, b"hello"), tid).await;
        assert_eq!(client.recv().await.0, Packet::Ack { block: 1 });
        assert_eq!(wait_for_file(&server.written("w")).await, b"hello");
    } else {
        assert_eq!(
            packet,
            Packet::error(
                ErrorCode::NotDefined,
                "Maximum number of retransmissions reached."
            )
        );
        assert!(client.recv_within(QUIET).await.is_none());
        assert!(!server.written("w").exists());
    }
}

#[tokio::test]
async fn duplicate_and_out_of_order_data_repeat_the_ack() {
    let server = TestServer::start().await;
    let mut client = server.client().await;
    client.request(RequestKind::Write, "dup", "octet").await;
    let (packet, tid) = client.recv().await;
    assert_eq!(packet, Packet::Ack { block: 0 });

    client
        .send_to(&Packet::encode_data(1, &[b'a'; BLOCK_SIZE]), tid)
        .await;
    assert_eq!(client.recv().await.0, Packet::Ack { block: 1 });
    // a duplicate with different content must not be appended
    client
        .send_to(&Packet::encode_data(1, &[b'b'; BLOCK_SIZE]), tid)
        .await;
    assert_eq!(client.recv().await.0, Packet::Ack { block: 1 });
    client.send_to(&Packet::encode_data(3, b"zzz"), tid).await;
    assert_eq!(client.recv().await.0, Packet::Ack { block: 1 });
    client.send_to(&Packet::encode_data(2, b"end"), tid).await;
    assert_eq!(client.recv().await.0, Packet::Ack { block: 2 });

    let mut expected = vec![b'a'; BLOCK_SIZE];
    expected.extend_from_slice(b"end");
    assert_eq!(wait_for_file(&server.written("dup")).await, expected);
}

#[tokio::test]
async fn existing_file_is_not_overwritten() {
    let server = TestServer::start().await;
    std::fs::write(server.written("x"), b"original").unwrap();
    let result = server.client().await.write_file("x", b"new").await;
    assert_eq!(result, Err(code(ErrorCode::FileAlreadyExists)));
    assert_eq!(std::fs::read(server.written("x")).unwrap(), b"original");
}

#[tokio::test]
async fn only_octet_mode_is_served() {
    let server = TestServer::start().await;
    server.add_file("f", b"text");
    let mut client = server.client().await;

    client.request(RequestKind::Read, "f", "netascii").await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::NotDefined), server.addr)
    );

    client.request(RequestKind::Write, "g", "mail").await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::NotDefined), server.addr)
    );
    assert!(client.recv_within(QUIET).await.is_none());
    assert!(!server.written("g").exists());

    // mode names are case-insensitive
    client.request(RequestKind::Read, "f", "OcTeT").await;
    let (packet, tid) = client.recv().await;
    assert_eq!(
        packet,
        Packet::Data {
            block: 1,
            payload: b"text".to_vec()
        }
    );
    client.send_to(&Packet::encode_ack(1), tid).await;
}

#[tokio::test]
async fn paths_cannot_escape_the_roots() {
    let server = TestServer::start().await;
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret"), b"hush").unwrap();
    let name = outside.path().file_name().unwrap().to_str().unwrap();
    let mut client = server.client().await;

    let result = client.read_file(&format!("../{name}/secret")).await;
    assert_eq!(result.unwrap_err(), code(ErrorCode::AccessViolation));

    let result = client.write_file(&format!("../{name}/planted"), b"x").await;
    assert_eq!(result, Err(code(ErrorCode::AccessViolation)));
    assert!(!outside.path().join("planted").exists());
}

#[tokio::test]
async fn missing_files_and_directories_are_not_found() {
    let server = TestServer::start().await;
    std::fs::create_dir(server.read_dir.path().join("sub")).unwrap();
    let mut client = server.client().await;
    assert_eq!(
        client.read_file("nope").await.unwrap_err(),
        code(ErrorCode::FileNotFound)
    );
    assert_eq!(
        client.read_file("sub").await.unwrap_err(),
        code(ErrorCode::FileNotFound)
    );
}

#[tokio::test]
async fn write_into_missing_directory_is_an_access_violation() {
    let server = TestServer::start().await;
    let result = server.client().await.write_file("no/such/dir", b"x").await;
    assert_eq!(result, Err(code(ErrorCode::AccessViolation)));
}

#[tokio::test]
async fn listener_classifies_stray_packets() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    client.send_to(&Packet::encode_ack(1), server.addr).await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::UnknownTransferId), server.addr)
    );
    client
        .send_to(&Packet::encode_data(1, b"x"), server.addr)
        .await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::UnknownTransferId), server.addr)
    );

    client.send_to(&[0, 9, 0, 0], server.addr).await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::IllegalOperation), server.addr)
    );
    // request without its terminators
    client.send_to(b"\x00\x01file", server.addr).await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::IllegalOperation), server.addr)
    );

    // classified by opcode alone, however mangled the rest
    client.send_to(&[0, 4, 0], server.addr).await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::UnknownTransferId), server.addr)
    );
    client
        .send_to(&Packet::encode_data(1, &[0u8; BLOCK_SIZE + 1]), server.addr)
        .await;
    assert_eq!(
        client.expect_error().await,
        (code(ErrorCode::UnknownTransferId), server.addr)
    );

    // errors from unconnected peers get no answer
    client
        .send_to(&Packet::encode_error(0, "whatever"), server.addr)
        .await;
    assert!(client.recv_within(QUIET).await.is_none());
    client.send_to(&[0, 5], server.addr).await;
    assert!(client.recv_within(QUIET).await.is_none());
}

#[tokio::test]
async fn foreign_transfer_id_is_rejected_without_disturbing_the_session() {
    let server = TestServer::start().await;
    let content = pattern(1500);
    server.add_file("f", &content);
    let mut client = server.client().await;
    let mut stranger = server.client().await;

    client.request(RequestKind::Read, "f", "octet").await;
    let (packet, tid) = client.recv().await;
    assert!(matches!(packet, Packet::Data { block: 1, .. }));

    stranger.send_to(&Packet::encode_ack(1), tid).await;
    assert_eq!(
        stranger.expect_error().await,
        (code(ErrorCode::UnknownTransferId), tid)
    );

    let mut received = Vec::new();
    let mut packet = packet;
    loop {
        let (block, payload) = match packet {
            Packet::Data { block, payload } => (block, payload),
            other => panic!("expected DATA, got {other}"),
        };
        received.extend_from_slice(&payload);
        client.send_to(&Packet::encode_ack(block), tid).await;
        if payload.len() < BLOCK_SIZE {
            break;
        }
        packet = client.recv().await.0;
    }
    assert_eq!(received, content);
}

#[tokio::test]
async fn peer_error_aborts_silently() {
    let server = TestServer::start().await;
    server.add_file("f", &pattern(2000));
    let mut client = server.client().await;
    client.request(RequestKind::Read, "f", "octet").await;
    let (_, tid) = client.recv().await;
    client
        .send_to(&Packet::encode_error(0, "cancelled"), tid)
        .await;
    assert!(client.recv_within(QUIET).await.is_none());
}

#[rstest]
#[case::before_any_data(false)]
#[case::after_first_block(true)]
#[tokio::test]
async fn peer_error_abandons_write(#[case] send_block: bool) {
    let server = TestServer::start().await;
    let mut client = server.client().await;
    client.request(RequestKind::Write, "w", "octet").await;
    let (packet, tid) = client.recv().await;
    assert_eq!(packet, Packet::Ack { block: 0 });
    if send_block {
        client
            .send_to(&Packet::encode_data(1, &pattern(BLOCK_SIZE)), tid)
            .await;
        assert_eq!(client.recv().await.0, Packet::Ack { block: 1 });
    }
    client
        .send_to(&Packet::encode_error(0, "cancelled"), tid)
        .await;
    assert!(client.recv_within(QUIET).await.is_none());
    assert!(!server.written("w").exists());
}

#[tokio::test]
async fn wrong_ack_resends_data() {
    let server = TestServer::start().await;
    let content = pattern(700);
    server.add_file("f", &content);
    let first = Packet::Data {
        block: 1,
        payload: content[..BLOCK_SIZE].to_vec(),
    };

    let mut client = server.client().await;
    client.request(RequestKind::Read, "f", "octet").await;
    let (packet, tid) = client.recv().await;
    assert_eq!(packet, first);

    client.send_to(&Packet::encode_ack(0), tid).await;
    let (packet, from) = client.recv().await;
    assert_eq!(from, tid);
    assert_eq!(packet, first);

    client.send_to(&Packet::encode_ack(1), tid).await;
    let (packet, _) = client.recv().await;
    assert_eq!(
        packet,
        Packet::Data {
            block: 2,
            payload: content[BLOCK_SIZE..].to_vec()
        }
    );
    client.send_to(&Packet::encode_ack(2), tid).await;
    assert!(client.recv_within(QUIET).await.is_none());
}

#[tokio::test]
async fn repeated_wrong_acks_exhaust_retries() {
    let server = TestServer::start().await;
    let content = pattern(700);
    server.add_file("f", &content);

    let mut client = server.client().await;
    client.request(RequestKind::Read, "f", "octet").await;
    let (packet, tid) = client.recv().await;
    assert!(matches!(packet, Packet::Data { block: 1, .. }));

    for _ in 1..MAX_RETRIES {
        client.send_to(&Packet::encode_ack(0), tid).await;
        let (packet, _) = client.recv().await;
        assert!(matches!(packet, Packet::Data { block: 1, .. }));
    }
    client.send_to(&Packet::encode_ack(0), tid).await;
    assert_eq!(
        client.recv().await.0,
        Packet::error(
            ErrorCode::NotDefined,
            "Maximum number of retransmissions reached."
        )
    );
    assert!(client.recv_within(QUIET).await.is_none());
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let server = TestServer::start().await;
    let a = pattern(5000);
    let b = vec![7u8; 3000];
    let c = pattern(2049);
    server.add_file("a", &a);
    server.add_file("b", &b);
    let mut ca = server.client().await;
    let mut cb = server.client().await;
    let mut cc = server.client().await;

    let (ra, rb, rc) = tokio::join!(
        ca.read_file("a"),
        cb.read_file("b"),
        cc.write_file("c", &c)
    );
    let (ra, rb, rc) = (ra.unwrap(), rb.unwrap(), rc.unwrap());
    assert_eq!(ra.content, a);
    assert_eq!(rb.content, b);
    assert_ne!(ra.tid, rb.tid);
    assert_ne!(ra.tid, rc);
    assert_eq!(wait_for_file(&server.written("c")).await, c);
}

#[tokio::test]
async fn session_limit_turns_requests_away() {
    let server = TestServer::start_with(|c| c.max_sessions = 1).await;
    server.add_file("f", b"x");
    let mut first = server.client().await;
    let mut second = server.client().await;

    first.request(RequestKind::Read, "f", "octet").await;
    let _ = first.recv().await;
    second.request(RequestKind::Read, "f", "octet").await;
    assert_eq!(
        second.expect_error().await,
        (code(ErrorCode::NotDefined), server.addr)
    );
}

#[tokio::test]
async fn quota_is_enforced_while_receiving() {
    let server = TestServer::start_with(|c| c.write_quota = 1000).await;
    let result = server.client().await.write_file("big", &pattern(2000)).await;
    assert_eq!(result, Err(code(ErrorCode::DiskFull)));
    assert_eq!(std::fs::read_dir(server.write_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn quota_is_enforced_before_commit() {
    let server = TestServer::start_with(|c| c.write_quota = 1000).await;
    std::fs::write(server.written("old"), [0u8; 600]).unwrap();
    let mut client = server.client().await;

    let tid = client.write_file("new", &pattern(500)).await.unwrap();
    assert_eq!(client.expect_error().await, (code(ErrorCode::DiskFull), tid));
    assert!(!server.written("new").exists());
}
