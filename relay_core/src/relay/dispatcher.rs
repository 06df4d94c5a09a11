//! Per-connection protocol loop.
//!
//! Reads frames from one client, relays chat text to everyone else and answers
//! control requests on the client's own outbox. Runs until the client goes away
//! or its connection fails, then removes itself from the registry.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io;
use std::sync::Arc;

use super::state::RelayState;
use crate::protocol::{Frame, Inbound, Request, Response, TransferStatus};
use crate::registry::Connection;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Transferring { hash: String },
    Closed,
}

/// The connection's writer has shut down; nothing more can be sent
struct WriterGone;

pub struct Dispatcher {
    conn: Connection,
    state: Arc<RelayState>,
}

impl Dispatcher {
    pub fn new(conn: Connection, state: Arc<RelayState>) -> Self {
        Self { conn, state }
    }

    /// Drive the connection until it closes.
    ///
    /// `frames` yields one payload per wire frame.
    pub async fn run<S>(self, mut frames: S)
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => {
                    tokio::select! {
                        frame = frames.next() => match frame {
                            Some(Ok(payload)) => self.on_frame(payload).await,
                            Some(Err(e)) => {
                                tracing::warn!("Client {} read error: {}", self.conn.addr, e);
                                State::Closed
                            }
                            None => {
                                tracing::info!("Client {} disconnected", self.conn.addr);
                                State::Closed
                            }
                        },
                        _ = self.conn.closed() => {
                            tracing::warn!("Client {} writer stopped", self.conn.addr);
                            State::Closed
                        }
                    }
                }
                // Inbound frames wait in the socket until the transfer ends
                State::Transferring { hash } => match self.stream_file(&hash).await {
                    Ok(status) => {
                        tracing::info!(
                            "File {} requested by {} finished: {:?}",
                            hash,
                            self.conn.addr,
                            status
                        );
                        State::Idle
                    }
                    Err(WriterGone) => State::Closed,
                },
                State::Closed => break,
            };
        }

        self.close().await;
    }

    async fn on_frame(&self, payload: Bytes) -> State {
        match Inbound::classify(payload) {
            Inbound::Chat(text) => {
                tracing::debug!(
                    "[CLIENT {}]: {}",
                    self.conn.addr,
                    String::from_utf8_lossy(&text)
                );
                self.state
                    .broadcaster
                    .broadcast(text, Some(self.conn.addr))
                    .await;
                State::Idle
            }
            Inbound::Request(request) => {
                tracing::debug!("[CLIENT {}] request: {:?}", self.conn.addr, request);
                match request {
                    Request::ListFiles => self.list_files().await,
                    Request::ListPeers => {
                        let peers = self.state.registry.peer_list().await;
                        self.reply_then_idle(Response::PeerList { peers }).await
                    }
                    Request::RequestFile { hash } => State::Transferring { hash },
                }
            }
        }
    }

    async fn list_files(&self) -> State {
        let files = match self.state.index.list_files().await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Answering file list with nothing: {}", e);
                Vec::new()
            }
        };
        self.reply_then_idle(Response::FileList { files }).await
    }

    /// Stream the chunk references of `hash`, always ending with one `FILE_END`
    async fn stream_file(&self, hash: &str) -> Result<TransferStatus, WriterGone> {
        let entry = match self.state.index.lookup(hash).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return self.finish(hash, TransferStatus::NotFound, 0).await;
            }
            Err(e) => {
                tracing::warn!("Cannot serve {} to {}: {}", hash, self.conn.addr, e);
                return self.finish(hash, TransferStatus::ChunkMissing, 0).await;
            }
        };

        let last = entry.chunks.len().saturating_sub(1);
        for (i, chunk) in entry.chunks.iter().enumerate() {
            if !self.state.index.chunk_exists(chunk).await {
                tracing::warn!("Chunk {} of {} is missing from the store", chunk, hash);
                return self
                    .finish(hash, TransferStatus::ChunkMissing, entry.size)
                    .await;
            }

            self.reply(Response::FileChunk {
                hash: hash.to_string(),
                data: chunk.clone(),
                eof: i == last,
            })
            .await?;
        }

        self.finish(hash, TransferStatus::Ok, entry.size).await
    }

    async fn finish(
        &self,
        hash: &str,
        status: TransferStatus,
        size: u64,
    ) -> Result<TransferStatus, WriterGone> {
        self.reply(Response::FileEnd {
            hash: hash.to_string(),
            status,
            size,
        })
        .await?;
        Ok(status)
    }

    async fn reply(&self, response: Response) -> Result<(), WriterGone> {
        self.conn
            .send(Frame::Response(response))
            .await
            .map_err(|_| WriterGone)
    }

    async fn reply_then_idle(&self, response: Response) -> State {
        match self.reply(response).await {
            Ok(()) => State::Idle,
            Err(WriterGone) => State::Closed,
        }
    }

    async fn close(self) {
        let registry = &self.state.registry;
        registry.unregister(self.conn.id).await;
        tracing::info!(
            "Client {} removed. Active clients: {}",
            self.conn.addr,
            registry.len().await
        );
    }
}
