//! Shared fixtures for integration tests: a server on loopback and a raw UDP client
#![allow(dead_code)]

use std::{net::SocketAddr, path::Path, time::Duration};

use tempfile::TempDir;
use tftpd::{
    Configuration, Server,
    protocol::{BLOCK_SIZE, Packet, Request, RequestKind},
};
use tokio::{net::UdpSocket, task::JoinHandle};

/// Retransmission timeout used by test servers
pub const TIMEOUT_MS: u64 = 100;
/// Retry cap used by test servers
pub const MAX_RETRIES: u32 = 4;
/// How long a client waits before deciding nothing is coming
const PATIENCE: Duration = Duration::from_secs(5);

/// A server bound to `127.0.0.1:0`, serving temporary directories
pub struct TestServer {
    pub addr: SocketAddr,
    pub config: Configuration,
    pub read_dir: TempDir,
    pub write_dir: TempDir,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| ()).await
    }

    /// Starts a server after letting the caller adjust its configuration.
    /// The roots are filled in before `adjust` runs.
    pub async fn start_with<F: FnOnce(&mut Configuration)>(adjust: F) -> Self {
        let read_dir = tempfile::tempdir().unwrap();
        let write_dir = tempfile::tempdir().unwrap();
        let mut config = Configuration::system_default().clone();
        config.address = "127.0.0.1".parse().unwrap();
        config.port = 0;
        config.read_root = read_dir.path().to_path_buf();
        config.write_root = write_dir.path().to_path_buf();
        config.timeout_ms = TIMEOUT_MS;
        config.max_retries = MAX_RETRIES;
        adjust(&mut config);

        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let task = tokio::spawn(async move { server.run().await });
        Self {
            addr,
            config,
            read_dir,
            write_dir,
            task,
        }
    }

    /// Places a file in the read directory
    pub fn add_file(&self, name: &str, content: &[u8]) {
        std::fs::write(self.read_dir.path().join(name), content).unwrap();
    }

    /// Path of a file in the write directory
    pub fn written(&self, name: &str) -> std::path::PathBuf {
        self.write_dir.path().join(name)
    }

    pub async fn client(&self) -> Client {
        Client::new(self.addr).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Content with a recognisable pattern
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| u8::try_from(i % 251).unwrap()).collect()
}

/// Splits content the way a sender must: every block full until a short one
pub fn chunks(content: &[u8]) -> Vec<&[u8]> {
    let mut out: Vec<&[u8]> = content.chunks(BLOCK_SIZE).collect();
    if content.len() % BLOCK_SIZE == 0 {
        out.push(&[]);
    }
    out
}

/// Waits for a file to appear (writes are committed after the final ACK)
pub async fn wait_for_file(path: &Path) -> Vec<u8> {
    let deadline = tokio::time::Instant::now() + PATIENCE;
    loop {
        if let Ok(content) = std::fs::read(path) {
            return content;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} never appeared",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Outcome of a successful read
#[derive(Debug)]
pub struct Received {
    pub content: Vec<u8>,
    pub blocks: Vec<u16>,
    pub tid: SocketAddr,
}

/// A deliberately simple TFTP client that speaks raw datagrams
pub struct Client {
    pub socket: UdpSocket,
    pub server: SocketAddr,
    buf: Vec<u8>,
}

impl Client {
    pub async fn new(server: SocketAddr) -> Self {
        Self {
            socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            server,
            buf: vec![0u8; 2048],
        }
    }

    pub async fn send_to(&self, datagram: &[u8], to: SocketAddr) {
        let _ = self.socket.send_to(datagram, to).await.unwrap();
    }

    pub async fn request(&self, kind: RequestKind, filename: &str, mode: &str) {
        let datagram = Packet::Request(Request::new(kind, filename, mode)).encode();
        self.send_to(&datagram, self.server).await;
    }

    /// Next packet, or `None` if nothing arrives within `wait`
    pub async fn recv_within(&mut self, wait: Duration) -> Option<(Packet, SocketAddr)> {
        let (len, from) = tokio::time::timeout(wait, self.socket.recv_from(&mut self.buf))
            .await
            .ok()?
            .unwrap();
        Some((Packet::decode(&self.buf[..len]).unwrap(), from))
    }

    pub async fn recv(&mut self) -> (Packet, SocketAddr) {
        self.recv_within(PATIENCE)
            .await
            .expect("no packet from server")
    }

    /// Expects an ERROR packet; returns its code and sender
    pub async fn expect_error(&mut self) -> (u16, SocketAddr) {
        match self.recv().await {
            (Packet::Error { code, .. }, from) => (code, from),
            (other, _) => panic!("expected ERROR, got {other}"),
        }
    }

    /// Reads a whole file. An ERROR from the server is returned as its code.
    pub async fn read_file(&mut self, filename: &str) -> Result<Received, u16> {
        self.request(RequestKind::Read, filename, "octet").await;
        let mut content = Vec::new();
        let mut blocks = Vec::new();
        let mut tid = None;
        let mut expected: u16 = 1;
        loop {
            let (packet, from) = self.recv().await;
            match packet {
                Packet::Data { block, payload } => {
                    let tid = *tid.get_or_insert(from);
                    assert_eq!(from, tid, "DATA from a different transfer ID");
                    self.send_to(&Packet::encode_ack(block), tid).await;
                    if block != expected {
                        continue;
                    }
                    content.extend_from_slice(&payload);
                    blocks.push(block);
                    expected = expected.wrapping_add(1);
                    if payload.len() < BLOCK_SIZE {
                        return Ok(Received {
                            content,
                            blocks,
                            tid,
                        });
                    }
                }
                Packet::Error { code, .. } => return Err(code),
                other => panic!("unexpected {other}"),
            }
        }
    }

    /// Writes a whole file. Returns the transfer ID the server used.
    pub async fn write_file(&mut self, filename: &str, content: &[u8]) -> Result<SocketAddr, u16> {
        self.request(RequestKind::Write, filename, "octet").await;
        let tid = match self.recv().await {
            (Packet::Ack { block: 0 }, from) => from,
            (Packet::Error { code, .. }, _) => return Err(code),
            (other, _) => panic!("unexpected {other}"),
        };
        for (i, chunk) in chunks(content).into_iter().enumerate() {
            let block = u16::try_from((i + 1) % 65536).unwrap();
            let datagram = Packet::encode_data(block, chunk);
            self.send_to(&datagram, tid).await;
            loop {
                match self.recv().await.0 {
                    Packet::Ack { block: acked } if acked == block => break,
                    // a stale ACK means the server is waiting for us again
                    Packet::Ack { .. } => self.send_to(&datagram, tid).await,
                    Packet::Error { code, .. } => return Err(code),
                    other => panic!("unexpected {other}"),
                }
            }
        }
        Ok(tid)
    }
}
