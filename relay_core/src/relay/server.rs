use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::SinkExt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use super::constants::ACCEPT_BACKOFF_MS;
use super::dispatcher::Dispatcher;
use super::state::RelayState;
use crate::config::RelayConfig;
use crate::error::RegistryError;
use crate::protocol::{Frame, RelayCodec};
use crate::registry::{ClientRegistry, Connection, ConnectionId};

/// Accepts clients and runs one dispatcher task per connection
pub struct RelayServer {
    listener: TcpListener,
    state: Arc<RelayState>,
}

impl RelayServer {
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind relay listener on {}", addr))?;

        Ok(Self {
            listener,
            state: Arc::new(RelayState::new(config)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.state.registry.clone()
    }

    /// Server-originated message to every client
    pub async fn announce(&self, text: &str) -> usize {
        self.state
            .broadcaster
            .broadcast(Bytes::copy_from_slice(text.as_bytes()), None)
            .await
    }

    /// Run the accept loop until `shutdown` fires or the listener fails
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Relay listening on {}", self.local_addr()?);
        tracing::info!("Storage index: {}", self.state.index.index_path().display());

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Relay shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, addr, state).await {
                            tracing::error!("Client {} rejected: {}", addr, e);
                        }
                    });
                }
                Err(e) if is_listener_broken(&e) => {
                    tracing::error!("Relay listener failed: {}", e);
                    return Err(e).context("Relay listener is no longer usable");
                }
                Err(e) => {
                    tracing::warn!("Error accepting client: {}", e);
                    if is_resource_exhaustion(&e) {
                        tokio::time::sleep(Duration::from_millis(ACCEPT_BACKOFF_MS)).await;
                    }
                }
            }
        }
    }
}

/// Register a connection and drive it until it closes.
///
/// The read side feeds the dispatcher; the write side is owned by a writer task
/// draining the connection's outbox, so responses and relayed chat never
/// interleave within a frame.
pub async fn serve_connection<S>(
    stream: S,
    addr: SocketAddr,
    state: Arc<RelayState>,
) -> Result<(), RegistryError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (outbox, outbox_rx) = mpsc::channel(state.outbound_queue);
    let conn = Connection::new(ConnectionId::next(), addr, outbox);

    state.registry.register(conn.clone()).await?;
    tracing::info!("Client {} connected ({})", addr, conn.id);

    tokio::spawn(write_frames(
        FramedWrite::new(write_half, state.codec()),
        outbox_rx,
        addr,
    ));

    let frames = FramedRead::new(read_half, state.codec());
    Dispatcher::new(conn, state).run(frames).await;
    Ok(())
}

async fn write_frames<W>(
    mut sink: FramedWrite<W, RelayCodec>,
    mut outbox: mpsc::Receiver<Frame>,
    addr: SocketAddr,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbox.recv().await {
        match sink.send(frame).await {
            Ok(()) => {}
            // Rejected by the encoder before anything reached the socket
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::warn!("Dropping frame for {}: {}", addr, e);
            }
            Err(e) => {
                tracing::warn!("Failed to write to {}: {}", addr, e);
                return;
            }
        }
    }

    // Every sender is gone: the dispatcher exited and the registry let go
    if let Err(e) = sink.close().await {
        tracing::debug!("Error closing connection to {}: {}", addr, e);
    }
}

/// Accept failures that mean the listening socket itself is unusable.
///
/// Everything else (aborted handshakes, network errors surfaced by accept,
/// resource exhaustion) concerns a single pending connection.
fn is_listener_broken(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::InvalidInput || is_bad_socket(e)
}

/// EBADF, plus ENOTSOCK where its number is known
#[cfg(unix)]
fn is_bad_socket(e: &io::Error) -> bool {
    const EBADF: i32 = 9;
    #[cfg(target_os = "linux")]
    const ENOTSOCK: i32 = 88;
    #[cfg(not(target_os = "linux"))]
    const ENOTSOCK: i32 = 38;
    matches!(e.raw_os_error(), Some(EBADF) | Some(ENOTSOCK))
}

#[cfg(not(unix))]
fn is_bad_socket(_e: &io::Error) -> bool {
    false
}

/// EMFILE / ENFILE / ENOBUFS / ENOMEM: the listener is fine, the process is
/// short of descriptors or memory
fn is_resource_exhaustion(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::OutOfMemory || is_descriptor_exhaustion(e)
}

#[cfg(unix)]
fn is_descriptor_exhaustion(e: &io::Error) -> bool {
    #[cfg(target_os = "linux")]
    const ENOBUFS: i32 = 105;
    #[cfg(not(target_os = "linux"))]
    const ENOBUFS: i32 = 55;
    matches!(e.raw_os_error(), Some(23) | Some(24) | Some(ENOBUFS))
}

#[cfg(not(unix))]
fn is_descriptor_exhaustion(_e: &io::Error) -> bool {
    false
}
