//! Per-transfer socket handling
// (c) 2026 tftpd contributors

use std::{
    io,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use tokio::{net::UdpSocket, time::Instant};
use tracing::{debug, trace};

use super::{RECV_BUFFER, reporter};
use crate::protocol::{ErrorCode, Packet};

/// Retransmission parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timing {
    /// How long to wait for each reply
    pub(crate) timeout: Duration,
    /// Consecutive failed waits after which we give up
    pub(crate) max_retries: u32,
}

/// Counts consecutive failed waits for one block
#[derive(Debug, Clone, Copy)]
pub(super) struct Retries {
    failed: u32,
    cap: u32,
}

impl Retries {
    /// Records a failed wait. Returns whether we may send again.
    #[must_use]
    pub(super) fn fail(&mut self) -> bool {
        self.failed += 1;
        self.failed < self.cap
    }

    pub(super) fn reset(&mut self) {
        self.failed = 0;
    }
}

/// One side of a transfer: an exclusive socket on a fresh port, talking to one peer.
///
/// The (address, port) of the peer is the transfer ID. Datagrams from anyone
/// else are answered with an "unknown transfer ID" error and otherwise ignored.
#[derive(Debug)]
pub(crate) struct Session {
    socket: UdpSocket,
    peer: SocketAddr,
    timing: Timing,
    buf: Vec<u8>,
}

impl Session {
    /// Binds a new ephemeral port on `local` for talking to `peer`
    pub(crate) async fn open(local: IpAddr, peer: SocketAddr, timing: Timing) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(local, 0)).await?;
        debug!("session port is {}", socket.local_addr()?);
        Ok(Self {
            socket,
            peer,
            timing,
            buf: vec![0u8; RECV_BUFFER],
        })
    }

    #[must_use]
    pub(super) fn retries(&self) -> Retries {
        Retries {
            failed: 0,
            cap: self.timing.max_retries,
        }
    }

    /// Sends a datagram to the peer
    pub(super) async fn send(&self, datagram: &[u8]) -> io::Result<()> {
        trace!("send {} bytes", datagram.len());
        let _ = self.socket.send_to(datagram, self.peer).await?;
        Ok(())
    }

    /// Waits for the next well-formed packet from the peer.
    ///
    /// Returns `None` if the timeout passes first. Stray datagrams do not
    /// extend the wait.
    pub(super) async fn recv(&mut self) -> io::Result<Option<Packet>> {
        let deadline = Instant::now()
            .checked_add(self.timing.timeout)
            .ok_or_else(|| io::Error::other("retransmission timeout out of range"))?;
        loop {
            let Ok(received) =
                tokio::time::timeout_at(deadline, self.socket.recv_from(&mut self.buf)).await
            else {
                trace!("timed out");
                return Ok(None);
            };
            let (len, from) = received?;
            if from != self.peer {
                debug!(%from, "datagram from unknown transfer ID");
                let _ = reporter::send_error(
                    &self.socket,
                    from,
                    ErrorCode::UnknownTransferId,
                    None,
                )
                .await;
                continue;
            }
            match Packet::decode(&self.buf[..len]) {
                Ok(packet) => {
                    trace!("received {packet}");
                    return Ok(Some(packet));
                }
                Err(e) => debug!("ignoring malformed packet: {e}"),
            }
        }
    }

    /// Sends an ERROR packet to the peer
    pub(super) async fn send_error(&self, code: ErrorCode, message: &str) -> io::Result<()> {
        reporter::send_error(&self.socket, self.peer, code, Some(message)).await
    }
}
