// (c) 2026 tftpd contributors

//! # Listener, dispatcher and transfer workers
//!
//! The [`Server`] owns the well-known port. It runs a single receive loop
//! and never waits on a transfer: each accepted request gets a worker task
//! of its own with a fresh socket, whose port becomes the transfer ID.
//!
//! | First packet from a peer | Response (sent from the well-known port) |
//! |---|---|
//! | RRQ/WRQ, octet mode | worker started |
//! | RRQ/WRQ, any other mode | ERROR 0 |
//! | RRQ/WRQ while at the session limit | ERROR 0 |
//! | DATA or ACK | ERROR 5 |
//! | ERROR | none |
//! | anything else | ERROR 4 |

use std::{
    io,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};
use tokio::{net::UdpSocket, sync::Semaphore};
use tracing::{Instrument as _, debug, error, info, info_span, trace, warn};

use crate::{
    config::Configuration,
    guard::QuotaGuard,
    protocol::{ErrorCode, MAX_DATAGRAM, Opcode, Packet, Request, RequestKind, TransferMode},
};

mod error;
pub use error::TransferError;
mod read;
mod reporter;
pub use reporter::send_error;
mod session;
use session::{Session, Timing};
mod stats;
pub use stats::TransferStats;
mod write;

/// One spare byte so that oversized datagrams are seen as such rather than truncated
const RECV_BUFFER: usize = MAX_DATAGRAM + 1;

/// State shared by all workers
#[derive(Debug)]
struct Context {
    /// Address the session sockets bind to
    local_ip: IpAddr,
    read_root: PathBuf,
    quota: QuotaGuard,
    timing: Timing,
}

/// A TFTP server bound to its well-known port
#[derive(Debug)]
pub struct Server {
    socket: UdpSocket,
    context: Arc<Context>,
    sessions: Option<Arc<Semaphore>>,
}

fn canonical_dir(path: &Path, what: &str) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("{what} {} is not accessible", path.display()))?;
    if !canonical.is_dir() {
        anyhow::bail!("{what} {} is not a directory", path.display());
    }
    Ok(canonical)
}

impl Server {
    /// Checks the served directories and binds the well-known port.
    pub async fn bind(config: &Configuration) -> Result<Self> {
        config.try_validate()?;
        let read_root = canonical_dir(&config.read_root, "read root")?;
        let write_root = canonical_dir(&config.write_root, "write root")?;

        let socket = UdpSocket::bind(SocketAddr::new(config.address, config.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", config.address, config.port))?;
        let sessions = match config.max_sessions {
            0 => None,
            n => Some(Arc::new(Semaphore::new(usize::try_from(n)?))),
        };
        info!(
            "listening on {}, serving {} (read) and {} (write)",
            socket.local_addr()?,
            read_root.display(),
            write_root.display()
        );

        Ok(Self {
            socket,
            context: Arc::new(Context {
                local_ip: config.address,
                read_root,
                quota: QuotaGuard::new(write_root, config.write_quota),
                timing: Timing {
                    timeout: config.timeout(),
                    max_retries: config.max_retries,
                },
            }),
            sessions,
        })
    }

    /// The address of the well-known port
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives and dispatches requests. Runs until the task is dropped.
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; RECV_BUFFER];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(r) => r,
                Err(e) => {
                    // ICMP errors from earlier replies can surface here on some platforms
                    warn!("receive failed: {e}");
                    continue;
                }
            };
            self.dispatch(&buf[..len], peer).await;
        }
    }

    async fn dispatch(&self, datagram: &[u8], peer: SocketAddr) {
        // Classify on the opcode alone so that a mangled ERROR never provokes a reply
        let opcode = match Opcode::of(datagram) {
            Ok(op) => op,
            Err(e) => {
                debug!(%peer, "bad request: {e}");
                self.reply(peer, ErrorCode::IllegalOperation, None).await;
                return;
            }
        };
        match opcode {
            Opcode::Error => {
                debug!(%peer, "discarding ERROR from unconnected peer");
            }
            Opcode::Data | Opcode::Ack => {
                trace!(%peer, "{opcode} outside any transfer");
                self.reply(peer, ErrorCode::UnknownTransferId, None).await;
            }
            Opcode::ReadRequest | Opcode::WriteRequest => match Packet::decode(datagram) {
                Ok(Packet::Request(request)) => self.accept(request, peer).await,
                Ok(other) => debug!(%peer, "unexpected {other}"),
                Err(e) => {
                    debug!(%peer, "bad request: {e}");
                    self.reply(peer, ErrorCode::IllegalOperation, None).await;
                }
            },
        }
    }

    async fn accept(&self, request: Request, peer: SocketAddr) {
        if !request.transfer_mode().is_some_and(TransferMode::is_supported) {
            let refusal = TransferError::UnsupportedMode(request.mode.clone());
            info!(%peer, "refusing {request}: {refusal}");
            if let Some((code, message)) = refusal.reply() {
                self.reply(peer, code, Some(&message)).await;
            }
            return;
        }
        let permit = match &self.sessions {
            None => None,
            Some(limit) => {
                if let Ok(p) = limit.clone().try_acquire_owned() {
                    Some(p)
                } else {
                    warn!(%peer, "refusing {request}: session limit reached");
                    self.reply(peer, ErrorCode::NotDefined, Some("Server busy."))
                        .await;
                    return;
                }
            }
        };

        info!(%peer, "accepted {request}");
        let context = self.context.clone();
        let span = info_span!("session", %peer, kind = %request.kind, file = %request.filename);
        let _ = tokio::spawn(
            async move {
                run_session(&context, &request, peer).await;
                drop(permit);
            }
            .instrument(span),
        );
    }

    async fn reply(&self, peer: SocketAddr, code: ErrorCode, message: Option<&str>) {
        let _ = send_error(&self.socket, peer, code, message).await;
    }
}

async fn run_session(context: &Context, request: &Request, peer: SocketAddr) {
    let mut session = match Session::open(context.local_ip, peer, context.timing).await {
        Ok(s) => s,
        Err(e) => {
            error!("could not open session socket: {e}");
            return;
        }
    };
    let result = match request.kind {
        RequestKind::Read => read::serve(&mut session, &context.read_root, &request.filename).await,
        RequestKind::Write => write::serve(&mut session, &context.quota, &request.filename).await,
    };
    match result {
        Ok(stats) => info!("{} complete: {stats}", request.kind),
        Err(e) => {
            warn!("{} failed: {e}", request.kind);
            if let Some((code, message)) = e.reply() {
                let _ = session.send_error(code, &message).await;
            }
        }
    }
}
