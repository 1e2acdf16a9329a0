//! Error reporting
// (c) 2026 tftpd contributors

use std::{io, net::SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::protocol::{ErrorCode, Packet};

/// Sends a single ERROR packet to `peer`.
///
/// If `message` is `None`, the canonical message for `code` is used.
/// Delivery is best-effort: a send failure is logged and returned, never retried.
pub async fn send_error(
    socket: &UdpSocket,
    peer: SocketAddr,
    code: ErrorCode,
    message: Option<&str>,
) -> io::Result<()> {
    let message = message.map_or_else(|| code.default_message(), str::to_string);
    debug!(%peer, "sending error {} \"{message}\"", code.as_u16());
    let datagram = Packet::encode_error(code.as_u16(), &message);
    match socket.send_to(&datagram, peer).await {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(%peer, "failed to send error packet: {e}");
            Err(e)
        }
    }
}
