//! Operator console: every stdin line is broadcast to all connected clients.

use relay_core::RelayServer;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

pub async fn run(server: Arc<RelayServer>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => match parse_line(&line) {
                ConsoleInput::Quit => {
                    tracing::info!("Server shutting down...");
                    shutdown.cancel();
                    return;
                }
                ConsoleInput::Broadcast(text) => {
                    let delivered = server.announce(text).await;
                    tracing::debug!("Broadcast delivered to {} clients", delivered);
                }
                ConsoleInput::Empty => {}
            },
            Ok(None) => {
                // stdin closed (e.g. running detached): keep serving
                tracing::info!("Console input closed; server keeps running");
                return;
            }
            Err(e) => {
                tracing::error!("Server input: {}", e);
                return;
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput<'a> {
    Quit,
    Broadcast(&'a str),
    Empty,
}

fn parse_line(line: &str) -> ConsoleInput<'_> {
    if line.trim().eq_ignore_ascii_case("quit") {
        ConsoleInput::Quit
    } else if line.trim().is_empty() {
        ConsoleInput::Empty
    } else {
        ConsoleInput::Broadcast(line)
    }
}
