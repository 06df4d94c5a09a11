//! Structured message shapes exchanged over the relay connection

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One file known to the storage index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Original file name, when the store recorded one
    pub name: Option<String>,
    pub hash: String,
    pub size: u64,
}

/// Remote address of a connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub ip: String,
    pub port: u16,
}

/// Outcome reported by the single `FILE_END` closing a file request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Ok,
    NotFound,
    ChunkMissing,
}

/// Messages from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    ListFiles,
    ListPeers,
    RequestFile { hash: String },
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    FileList {
        files: Vec<FileSummary>,
    },
    PeerList {
        peers: Vec<PeerInfo>,
    },
    /// `data` is the chunk's content hash, not its bytes
    FileChunk {
        hash: String,
        data: String,
        eof: bool,
    },
    FileEnd {
        hash: String,
        status: TransferStatus,
        size: u64,
    },
}

/// A frame received by the server: either a control request or chat text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Request(Request),
    Chat(Bytes),
}

impl Inbound {
    /// Anything that does not decode as a request is relayed verbatim as chat.
    pub fn classify(payload: Bytes) -> Self {
        match serde_json::from_slice::<Request>(&payload) {
            Ok(request) => Inbound::Request(request),
            Err(_) => Inbound::Chat(payload),
        }
    }
}

/// A frame received by a client: either a control response or relayed chat text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Response(Response),
    Chat(Bytes),
}

impl ServerFrame {
    pub fn classify(payload: Bytes) -> Self {
        match serde_json::from_slice::<Response>(&payload) {
            Ok(response) => ServerFrame::Response(response),
            Err(_) => ServerFrame::Chat(payload),
        }
    }
}

/// Anything that can be written as one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Chat(Bytes),
    Request(Request),
    Response(Response),
}

impl From<Request> for Frame {
    fn from(request: Request) -> Self {
        Frame::Request(request)
    }
}

impl From<Response> for Frame {
    fn from(response: Response) -> Self {
        Frame::Response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(Request::RequestFile {
            hash: "h1".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"type": "REQUEST_FILE", "hash": "h1"}));

        let json = serde_json::to_value(Request::ListFiles).unwrap();
        assert_eq!(json, json!({"type": "LIST_FILES"}));
    }

    #[test]
    fn test_file_end_status_names() {
        let json = serde_json::to_value(Response::FileEnd {
            hash: "h1".to_string(),
            status: TransferStatus::ChunkMissing,
            size: 30,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({"type": "FILE_END", "hash": "h1", "status": "CHUNK_MISSING", "size": 30})
        );
        assert_eq!(
            serde_json::to_value(TransferStatus::NotFound).unwrap(),
            json!("NOT_FOUND")
        );
        assert_eq!(serde_json::to_value(TransferStatus::Ok).unwrap(), json!("OK"));
    }

    #[test]
    fn test_peer_list_shape() {
        let json = serde_json::to_value(Response::PeerList {
            peers: vec![PeerInfo {
                ip: "10.0.0.2".to_string(),
                port: 5555,
            }],
        })
        .unwrap();
        assert_eq!(
            json,
            json!({"type": "PEER_LIST", "peers": [{"ip": "10.0.0.2", "port": 5555}]})
        );
    }

    #[test]
    fn test_classify_requests() {
        let inbound = Inbound::classify(Bytes::from_static(br#"{"type":"LIST_PEERS"}"#));
        assert_eq!(inbound, Inbound::Request(Request::ListPeers));

        let inbound =
            Inbound::classify(Bytes::from_static(br#"{"type":"REQUEST_FILE","hash":"abc"}"#));
        assert_eq!(
            inbound,
            Inbound::Request(Request::RequestFile {
                hash: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_classify_falls_back_to_chat() {
        let cases: [&[u8]; 6] = [
            b"hello everyone",
            br#"{"type":"UNKNOWN"}"#,
            br#"{"type":"REQUEST_FILE"}"#,
            br#"{"type":"FILE_LIST","files":[]}"#,
            b"[1, 2, 3]",
            &[0xff, 0xfe, 0x00],
        ];
        for payload in cases {
            let bytes = Bytes::copy_from_slice(payload);
            assert_eq!(Inbound::classify(bytes.clone()), Inbound::Chat(bytes));
        }
    }

    #[test]
    fn test_client_classifies_responses() {
        let frame = ServerFrame::classify(Bytes::from_static(
            br#"{"type":"FILE_CHUNK","hash":"h","data":"c1","eof":true}"#,
        ));
        assert_eq!(
            frame,
            ServerFrame::Response(Response::FileChunk {
                hash: "h".to_string(),
                data: "c1".to_string(),
                eof: true,
            })
        );

        let frame = ServerFrame::classify(Bytes::from_static(b"server says hi"));
        assert_eq!(frame, ServerFrame::Chat(Bytes::from_static(b"server says hi")));
    }
}
