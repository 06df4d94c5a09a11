//! Client side of the relay protocol.

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::protocol::{Frame, RelayCodec, Request, ServerFrame};

/// Connected relay client; split it to read and write from separate tasks
pub struct RelayClient {
    sender: RelaySender,
    receiver: RelayReceiver,
}

pub struct RelaySender {
    sink: FramedWrite<OwnedWriteHalf, RelayCodec>,
}

pub struct RelayReceiver {
    frames: FramedRead<OwnedReadHalf, RelayCodec>,
}

impl RelayClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("Could not connect to relay server")?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            sender: RelaySender {
                sink: FramedWrite::new(write_half, RelayCodec::client()),
            },
            receiver: RelayReceiver {
                frames: FramedRead::new(read_half, RelayCodec::client()),
            },
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.sender.sink.get_ref().local_addr()?)
    }

    pub async fn send_chat(&mut self, text: impl Into<Bytes>) -> Result<()> {
        self.sender.send_chat(text).await
    }

    pub async fn send_request(&mut self, request: Request) -> Result<()> {
        self.sender.send_request(request).await
    }

    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>> {
        self.receiver.next_frame().await
    }

    pub fn split(self) -> (RelaySender, RelayReceiver) {
        (self.sender, self.receiver)
    }
}

impl RelaySender {
    /// Send a payload verbatim; the server decides whether it is chat or a request
    pub async fn send_chat(&mut self, text: impl Into<Bytes>) -> Result<()> {
        self.sink
            .send(Frame::Chat(text.into()))
            .await
            .context("Failed to send message")
    }

    pub async fn send_request(&mut self, request: Request) -> Result<()> {
        self.sink
            .send(Frame::Request(request))
            .await
            .context("Failed to send request")
    }

    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

impl RelayReceiver {
    /// Next frame from the server, `None` once it hangs up
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>> {
        match self.frames.next().await {
            Some(Ok(payload)) => Ok(Some(ServerFrame::classify(payload))),
            Some(Err(e)) => Err(e).context("Failed to read from relay server"),
            None => Ok(None),
        }
    }
}
