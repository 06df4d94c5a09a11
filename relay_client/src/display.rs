//! Renders frames received from the relay for the terminal.

use relay_core::{Response, ServerFrame, TransferStatus};

pub fn render(frame: &ServerFrame) -> String {
    match frame {
        ServerFrame::Chat(text) => String::from_utf8_lossy(text).into_owned(),
        ServerFrame::Response(response) => render_response(response),
    }
}

fn render_response(response: &Response) -> String {
    match response {
        Response::FileList { files } if files.is_empty() => "No files stored".to_string(),
        Response::FileList { files } => {
            let mut out = format!("{} file(s):", files.len());
            for file in files {
                out.push_str(&format!(
                    "\n  {}  {} ({} bytes)",
                    file.hash,
                    file.name.as_deref().unwrap_or("<unnamed>"),
                    file.size
                ));
            }
            out
        }
        Response::PeerList { peers } => {
            let mut out = format!("{} peer(s) connected:", peers.len());
            for peer in peers {
                out.push_str(&format!("\n  {}:{}", peer.ip, peer.port));
            }
            out
        }
        Response::FileChunk { hash, data, eof } => {
            let marker = if *eof { " (last)" } else { "" };
            format!("[{}] chunk {}{}", short(hash), data, marker)
        }
        Response::FileEnd { hash, status, size } => match status {
            TransferStatus::Ok => format!("[{}] complete, {} bytes", short(hash), size),
            TransferStatus::NotFound => format!("[{}] not found on server", short(hash)),
            TransferStatus::ChunkMissing => {
                format!("[{}] aborted: a chunk is missing from the store", short(hash))
            }
        },
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
