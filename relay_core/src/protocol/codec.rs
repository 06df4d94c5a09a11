//! Length-prefixed framing: `<len u32 BE><payload>`.
//!
//! Every chat line and every structured message occupies exactly one frame, so
//! message boundaries never depend on how the stream happens to be read.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use super::messages::Frame;
use crate::relay::constants::{MAX_FRAME_LEN, MAX_RESPONSE_LEN};

/// Frame codec with separate limits per direction.
///
/// Clients only ever send short chat lines and requests, while a server reply
/// such as `FILE_LIST` grows with the index, so the two sides of a connection
/// cap different directions.
#[derive(Debug)]
pub struct RelayCodec {
    decoder: LengthDelimitedCodec,
    encoder: LengthDelimitedCodec,
    max_inbound_len: usize,
    max_outbound_len: usize,
}

fn length_delimited(max_frame_len: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(max_frame_len)
        .new_codec()
}

impl RelayCodec {
    pub fn new() -> Self {
        Self::with_limits(MAX_FRAME_LEN, MAX_FRAME_LEN)
    }

    /// Server side of a connection: small frames in, large responses out
    pub fn server(max_frame_len: usize) -> Self {
        Self::with_limits(max_frame_len, MAX_RESPONSE_LEN)
    }

    /// Client side: the mirror image of [`RelayCodec::server`]
    pub fn client() -> Self {
        Self::with_limits(MAX_RESPONSE_LEN, MAX_FRAME_LEN)
    }

    pub fn with_limits(max_inbound_len: usize, max_outbound_len: usize) -> Self {
        Self {
            decoder: length_delimited(max_inbound_len),
            encoder: length_delimited(max_outbound_len),
            max_inbound_len,
            max_outbound_len,
        }
    }

    fn too_large(len: usize, max: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes (max {})", len, max),
        )
    }
}

impl Default for RelayCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RelayCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decoder.decode(src) {
            Ok(frame) => Ok(frame.map(BytesMut::freeze)),
            // The inner codec only reports InvalidData for oversized length headers
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                let announced = src
                    .get(..4)
                    .map(|h| u32::from_be_bytes([h[0], h[1], h[2], h[3]]) as usize)
                    .unwrap_or(0);
                Err(Self::too_large(announced, self.max_inbound_len))
            }
            Err(e) => Err(e),
        }
    }
}

impl Encoder<Frame> for RelayCodec {
    type Error = io::Error;

    /// Nothing is written to `dst` when the frame is rejected
    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = match item {
            Frame::Chat(text) => text,
            Frame::Request(request) => Bytes::from(serde_json::to_vec(&request)?),
            Frame::Response(response) => Bytes::from(serde_json::to_vec(&response)?),
        };
        if payload.len() > self.max_outbound_len {
            return Err(Self::too_large(payload.len(), self.max_outbound_len));
        }
        self.encoder.encode(payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{FileSummary, Inbound, Request, Response, ServerFrame};
    use bytes::BufMut;

    #[test]
    fn test_frames_split_across_reads() {
        let mut codec = RelayCodec::new();
        let mut wire = BytesMut::new();
        codec
            .encode(Frame::Request(Request::ListFiles), &mut wire)
            .unwrap();

        // Feed the header and body in two pieces
        let mut src = BytesMut::new();
        src.extend_from_slice(&wire[..3]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&wire[3..]);
        let payload = codec.decode(&mut src).unwrap().expect("complete frame");

        assert_eq!(Inbound::classify(payload), Inbound::Request(Request::ListFiles));
    }

    #[test]
    fn test_coalesced_frames_decode_separately() {
        let mut codec = RelayCodec::new();
        let mut src = BytesMut::new();
        codec
            .encode(Frame::Chat(Bytes::from_static(b"first")), &mut src)
            .unwrap();
        codec
            .encode(Frame::Chat(Bytes::from_static(b"second")), &mut src)
            .unwrap();

        assert_eq!(codec.decode(&mut src).unwrap().unwrap(), "first");
        assert_eq!(codec.decode(&mut src).unwrap().unwrap(), "second");
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let mut codec = RelayCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(Frame::Chat(Bytes::from_static(b"hi")), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut codec = RelayCodec::with_limits(16, 16);
        let mut src = BytesMut::new();
        src.put_u32(17);
        src.extend_from_slice(&[0u8; 17]);

        let err = codec.decode(&mut src).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("Message too large"), "{}", err);

        let mut dst = BytesMut::new();
        let err = codec
            .encode(Frame::Chat(Bytes::from(vec![b'x'; 17])), &mut dst)
            .unwrap_err();
        assert!(err.to_string().contains("Message too large"), "{}", err);
    }

    #[test]
    fn test_large_response_passes_between_server_and_client() {
        let files = (0..2000)
            .map(|i| FileSummary {
                name: Some(format!("file-{}.bin", i)),
                hash: format!("{:064x}", i),
                size: i,
            })
            .collect::<Vec<_>>();
        let response = Response::FileList { files };

        let mut wire = BytesMut::new();
        RelayCodec::server(MAX_FRAME_LEN)
            .encode(Frame::Response(response.clone()), &mut wire)
            .unwrap();
        assert!(wire.len() > MAX_FRAME_LEN);

        let payload = RelayCodec::client().decode(&mut wire).unwrap().unwrap();
        assert_eq!(
            ServerFrame::classify(payload),
            ServerFrame::Response(response)
        );

        // Past the response cap the frame is refused and the buffer left untouched
        let mut wire = BytesMut::new();
        let err = RelayCodec::server(MAX_FRAME_LEN)
            .encode(Frame::Chat(Bytes::from(vec![b'x'; MAX_RESPONSE_LEN + 1])), &mut wire)
            .unwrap_err();
        assert!(err.to_string().contains("Message too large"), "{}", err);
        assert!(wire.is_empty());
    }
}
