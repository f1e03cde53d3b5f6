//! Socket-level tests for the accept loop and session protocol

use std::sync::Arc;
use std::time::Duration;

use beamtail_config::ListenAddr;
use beamtail_mux::{
    Acceptor, BusReceiver, Event, EventBus, HandshakeError, LabelRegistry, MuxError, Shutdown,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    addr: String,
    receiver: BusReceiver,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

async fn start_tcp() -> Harness {
    let (bus, receiver) = EventBus::new(64);
    let acceptor = Acceptor::bind(
        &ListenAddr::Tcp("127.0.0.1:0".to_string()),
        Arc::new(LabelRegistry::new()),
        bus,
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    let addr = match acceptor.local_addr().unwrap() {
        ListenAddr::Tcp(addr) => addr,
        other => panic!("expected tcp address, got {}", other),
    };

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(acceptor.run(shutdown.clone()));
    Harness {
        addr,
        receiver,
        shutdown,
        handle,
    }
}

async fn next(receiver: &mut BusReceiver) -> Event {
    tokio::time::timeout(WAIT, receiver.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("bus closed")
}

async fn connect(addr: &str, handshake: &[u8]) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(handshake).await.unwrap();
    stream
}

async fn assert_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(WAIT, stream.read(&mut buf))
        .await
        .expect("connection left open");
    assert!(matches!(read, Ok(0) | Err(_)));
}

fn message_text(event: Event) -> (String, String) {
    match event {
        Event::Message(m) => (
            m.label.to_string(),
            String::from_utf8_lossy(&m.data).into_owned(),
        ),
        other => panic!("expected message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_lifecycle() {
    let mut h = start_tcp().await;

    let stream = connect(&h.addr, b"label=svcA\nhello\nworld\n").await;
    drop(stream);

    assert!(matches!(next(&mut h.receiver).await, Event::Subscribe(l) if l == "svcA"));
    assert_eq!(
        message_text(next(&mut h.receiver).await),
        ("svcA".to_string(), "hello".to_string())
    );
    assert_eq!(
        message_text(next(&mut h.receiver).await),
        ("svcA".to_string(), "world".to_string())
    );
    assert!(matches!(next(&mut h.receiver).await, Event::Unsubscribe(l) if l == "svcA"));

    h.shutdown.trigger();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_extra_handshake_keys_ignored() {
    let mut h = start_tcp().await;

    let _stream = connect(&h.addr, b"label=svcA;x=y\n").await;
    assert!(matches!(next(&mut h.receiver).await, Event::Subscribe(l) if l == "svcA"));

    h.shutdown.trigger();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_malformed_handshake_closes_connection() {
    let mut h = start_tcp().await;

    let mut stream = connect(&h.addr, b"nope\n").await;
    match next(&mut h.receiver).await {
        Event::Error(MuxError::Handshake { source, .. }) => {
            assert!(matches!(source, HandshakeError::MalformedSegment(_)));
        }
        other => panic!("expected handshake error, got {:?}", other),
    }
    assert_closed(&mut stream).await;

    h.shutdown.trigger();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_duplicate_label_rejected() {
    let mut h = start_tcp().await;

    let mut first = connect(&h.addr, b"label=svcA\n").await;
    assert!(matches!(next(&mut h.receiver).await, Event::Subscribe(l) if l == "svcA"));

    let mut second = connect(&h.addr, b"label=svcA\n").await;
    assert!(matches!(
        next(&mut h.receiver).await,
        Event::Error(MuxError::DuplicateLabel { label, .. }) if label == "svcA"
    ));
    assert_closed(&mut second).await;

    // first connection is untouched
    first.write_all(b"still here\n").await.unwrap();
    assert_eq!(
        message_text(next(&mut h.receiver).await),
        ("svcA".to_string(), "still here".to_string())
    );

    h.shutdown.trigger();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_duplicate_single_winner() {
    let mut h = start_tcp().await;

    let (a, b) = tokio::join!(
        connect(&h.addr, b"label=race\n"),
        connect(&h.addr, b"label=race\n")
    );

    let mut subscribes = 0;
    let mut duplicates = 0;
    for _ in 0..2 {
        match next(&mut h.receiver).await {
            Event::Subscribe(l) if l == "race" => subscribes += 1,
            Event::Error(MuxError::DuplicateLabel { label, .. }) if label == "race" => {
                duplicates += 1
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!((subscribes, duplicates), (1, 1));

    drop((a, b));
    h.shutdown.trigger();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_label_reusable_after_disconnect() {
    let mut h = start_tcp().await;

    let stream = connect(&h.addr, b"label=svcA\n").await;
    assert!(matches!(next(&mut h.receiver).await, Event::Subscribe(l) if l == "svcA"));
    drop(stream);
    assert!(matches!(next(&mut h.receiver).await, Event::Unsubscribe(l) if l == "svcA"));

    let _again = connect(&h.addr, b"label=svcA\n").await;
    assert!(matches!(next(&mut h.receiver).await, Event::Subscribe(l) if l == "svcA"));

    h.shutdown.trigger();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_accepting_but_keeps_sessions() {
    let mut h = start_tcp().await;

    let mut live = connect(&h.addr, b"label=svcA\n").await;
    assert!(matches!(next(&mut h.receiver).await, Event::Subscribe(_)));

    h.shutdown.trigger();
    tokio::time::timeout(WAIT, h.handle)
        .await
        .expect("accept loop did not stop")
        .unwrap();

    assert!(TcpStream::connect(&h.addr).await.is_err());

    live.write_all(b"after shutdown\n").await.unwrap();
    assert_eq!(
        message_text(next(&mut h.receiver).await).1,
        "after shutdown"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_unix_socket_roundtrip() {
    use tokio::net::UnixStream;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beams.sock");
    // stale socket left by a previous run
    drop(std::os::unix::net::UnixListener::bind(&path).unwrap());

    let (bus, mut receiver) = EventBus::new(8);
    let acceptor = Acceptor::bind(
        &ListenAddr::Unix(path.clone()),
        Arc::new(LabelRegistry::new()),
        bus,
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(acceptor.run(shutdown.clone()));

    let mut stream = UnixStream::connect(&path).await.unwrap();
    stream.write_all(b"label=local\nhi\n").await.unwrap();

    assert!(matches!(next(&mut receiver).await, Event::Subscribe(l) if l == "local"));
    assert_eq!(message_text(next(&mut receiver).await).1, "hi");

    shutdown.trigger();
    handle.await.unwrap();
    assert!(!path.exists());
}
