//! Read-path worker: sends a file to the peer
// (c) 2026 tftpd contributors

use std::{io, path::Path};

use tokio::time::Instant;
use tracing::debug;

use super::{Session, TransferError, TransferStats};
use crate::{
    guard::resolve_within,
    protocol::{BLOCK_SIZE, Packet},
};

/// Splits file content into numbered DATA payloads.
///
/// Iteration ends after the first payload shorter than [`BLOCK_SIZE`]. Content
/// whose length is a multiple of the block size (including empty content)
/// therefore ends with an empty payload.
#[derive(Debug)]
pub(super) struct Blocks<'a> {
    remaining: Option<&'a [u8]>,
    block: u16,
}

impl<'a> Blocks<'a> {
    pub(super) fn new(content: &'a [u8]) -> Self {
        Self {
            remaining: Some(content),
            block: 0,
        }
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.remaining?;
        let (chunk, tail) = rest.split_at(rest.len().min(BLOCK_SIZE));
        self.remaining = (chunk.len() == BLOCK_SIZE).then_some(tail);
        self.block = self.block.wrapping_add(1);
        Some((self.block, chunk))
    }
}

async fn load(path: &Path) -> Result<Vec<u8>, TransferError> {
    let opened = async {
        if tokio::fs::metadata(path).await?.is_dir() {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        tokio::fs::read(path).await
    };
    opened.await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TransferError::FileNotFound,
        io::ErrorKind::PermissionDenied => TransferError::AccessViolation(e.to_string()),
        _ => TransferError::Io(e),
    })
}

/// Serves `filename` from `root` to the session peer.
pub(super) async fn serve(
    session: &mut Session,
    root: &Path,
    filename: &str,
) -> Result<TransferStats, TransferError> {
    let path = resolve_within(root, filename)?;
    let content = load(&path).await?;
    debug!("sending {} bytes", content.len());

    let started = Instant::now();
    let mut stats = TransferStats::default();
    for (block, payload) in Blocks::new(&content) {
        let datagram = Packet::encode_data(block, payload);
        let mut retries = session.retries();
        session.send(&datagram).await?;
        loop {
            match session.recv().await? {
                Some(Packet::Ack { block: acked }) if acked == block => break,
                Some(Packet::Error { code, message }) => {
                    return Err(TransferError::PeerAborted { code, message });
                }
                other => {
                    if let Some(p) = other {
                        debug!("expected ACK {block}, got {p}");
                    }
                    if !retries.fail() {
                        return Err(TransferError::RetriesExhausted { block });
                    }
                    debug!("resending block {block}");
                    stats.retransmissions += 1;
                    session.send(&datagram).await?;
                }
            }
        }
        stats.record_block(payload.len());
    }
    stats.elapsed = started.elapsed();
    Ok(stats)
}
