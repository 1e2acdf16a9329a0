//! Write-path worker: receives a file from the peer
// (c) 2026 tftpd contributors

use std::io;

use tokio::time::Instant;
use tracing::debug;

use super::{Session, TransferError, TransferStats};
use crate::{
    guard::{GuardError, QuotaGuard, probe_create, resolve_within},
    protocol::{BLOCK_SIZE, Packet},
};

/// Receives `filename` from the session peer and stores it under the quota's root.
pub(super) async fn serve(
    session: &mut Session,
    quota: &QuotaGuard,
    filename: &str,
) -> Result<TransferStats, TransferError> {
    let path = resolve_within(quota.root(), filename)?;
    if tokio::fs::symlink_metadata(&path).await.is_ok() {
        return Err(TransferError::FileExists);
    }
    probe_create(&path).await.map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            TransferError::FileExists
        } else {
            TransferError::NotCreatable(e)
        }
    })?;

    let started = Instant::now();
    let mut stats = TransferStats::default();
    let mut content = Vec::new();
    let mut current: u16 = 0;
    let mut ack = Packet::encode_ack(current);
    let mut retries = session.retries();
    session.send(&ack).await?;

    loop {
        let expected = current.wrapping_add(1);
        match session.recv().await? {
            Some(Packet::Data { block, payload }) if block == expected => {
                content.extend_from_slice(&payload);
                let size = u64::try_from(content.len()).map_err(io::Error::other)?;
                if size > quota.limit() {
                    return Err(TransferError::DiskFull {
                        size,
                        limit: quota.limit(),
                    });
                }
                current = block;
                ack = Packet::encode_ack(current);
                session.send(&ack).await?;
                retries.reset();
                stats.record_block(payload.len());
                if payload.len() < BLOCK_SIZE {
                    break;
                }
            }
            Some(Packet::Data { block, .. }) => {
                debug!("got block {block} while expecting {expected}; repeating ACK {current}");
                session.send(&ack).await?;
            }
            Some(Packet::Error { code, message }) => {
                return Err(TransferError::PeerAborted { code, message });
            }
            Some(other) => debug!("ignoring {other}"),
            None => {
                if !retries.fail() {
                    return Err(TransferError::RetriesExhausted { block: expected });
                }
                debug!("resending ACK {current}");
                stats.retransmissions += 1;
                session.send(&ack).await?;
            }
        }
    }

    let _ = quota
        .commit(path, content)
        .await
        .map_err(|e| match e {
            GuardError::Io(e) => TransferError::Commit(e),
            other => other.into(),
        })?;
    stats.elapsed = started.elapsed();
    Ok(stats)
}
