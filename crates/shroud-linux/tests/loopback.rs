use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use shroud_core::{ShroudError, CONTENT_TYPE_APPLICATION_DATA};
use shroud_flow::FillerConfig;
use shroud_hal::SessionAdapter;
use shroud_inject::{enable, Controller};
use shroud_linux::relay::{client_write_keys, drain};
use shroud_linux::{RecordReader, TcpSession};

const SECRET: &[u8] = b"loopback secret";

fn spawn_peer() -> (std::net::SocketAddr, thread::JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let keys = client_write_keys(SECRET).unwrap();
        let mut reader = RecordReader::new(stream, &keys);
        let mut contents = Vec::new();
        drain(&mut reader, |content_type, content| {
            assert_eq!(content_type, CONTENT_TYPE_APPLICATION_DATA);
            contents.push(content.to_vec());
        })
        .unwrap();
        contents
    });
    (addr, handle)
}

#[test]
fn test_filler_interleaves_with_genuine_traffic() {
    let (addr, peer) = spawn_peer();

    let session = Arc::new(TcpSession::connect(addr).unwrap());
    session.install_cipher(&client_write_keys(SECRET).unwrap());

    let adapter: Arc<dyn SessionAdapter> = session.clone();
    let config = FillerConfig::new(200, 600, Duration::from_millis(1), Duration::ZERO).unwrap();
    let ctl = Controller::new(adapter, config, Box::new(ChaCha20Rng::seed_from_u64(21))).unwrap();

    for window in 0..3 {
        ctl.start().unwrap();
        thread::sleep(Duration::from_millis(15));
        ctl.stop();
        session.send(format!("response-{}", window).as_bytes()).unwrap();
    }
    let filler = ctl.records_sent();
    drop(ctl);
    session.shutdown().unwrap();

    let contents = peer.join().unwrap();
    assert_eq!(contents.len() as u64, filler + 3);
    assert_eq!(session.write_sequence(), contents.len() as u64);

    // stop() returned before each send, so every response trails its window's filler.
    let genuine: Vec<_> = contents.iter().filter(|c| c.starts_with(b"response-")).collect();
    assert_eq!(genuine.len(), 3);
    for (i, content) in genuine.iter().enumerate() {
        assert_eq!(content.as_slice(), format!("response-{}", i).as_bytes());
    }
    assert_eq!(contents.last().unwrap().as_slice(), b"response-2");
    for content in contents.iter().filter(|c| !c.starts_with(b"response-")) {
        assert!((200..=600).contains(&content.len()));
    }
}

#[test]
fn test_enable_before_handshake_fails() {
    let (addr, peer) = spawn_peer();
    let session = Arc::new(TcpSession::connect(addr).unwrap());

    let adapter: Arc<dyn SessionAdapter> = session.clone();
    assert!(matches!(enable(adapter, FillerConfig::default()), Err(ShroudError::CipherUnavailable)));
    assert_eq!(session.send(b"early"), Err(ShroudError::CipherUnavailable));

    session.shutdown().unwrap();
    assert!(peer.join().unwrap().is_empty());
}

#[test]
fn test_teardown_ends_run() {
    let (addr, peer) = spawn_peer();
    let session = Arc::new(TcpSession::connect(addr).unwrap());
    session.install_cipher(&client_write_keys(SECRET).unwrap());

    let adapter: Arc<dyn SessionAdapter> = session.clone();
    let ctl = enable(adapter, FillerConfig::new(32, 32, Duration::from_millis(1), Duration::ZERO).unwrap()).unwrap();
    ctl.start().unwrap();
    thread::sleep(Duration::from_millis(10));
    session.clear_cipher();

    let mut waited = 0;
    while ctl.is_running() && waited < 5_000 {
        thread::sleep(Duration::from_millis(1));
        waited += 1;
    }
    assert!(!ctl.is_running());
    assert_eq!(ctl.last_error(), Some(ShroudError::CipherUnavailable));

    let sent = ctl.records_sent();
    drop(ctl);
    session.shutdown().unwrap();
    assert_eq!(peer.join().unwrap().len() as u64, sent);
}
