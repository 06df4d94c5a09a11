use anyhow::Result;
use relay_core::client::{RelayReceiver, RelaySender};
use relay_core::config::{HOST_ENV, PORT_ENV};
use relay_core::relay::DEFAULT_PORT;
use relay_core::RelayClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::{HELP, Input, parse_input};

const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let addr = server_addr();
    println!("[INFO] Connecting to server at {}...", addr);
    let client = match RelayClient::connect(&addr).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("[ERROR] {:#}. Make sure the server is running.", e);
            return Ok(());
        }
    };
    println!("[INFO] Connected to server!");
    println!("[INFO] {}", HELP);
    println!("[INFO] Type 'quit' to exit\n");

    let (sender, receiver) = client.split();
    let mut receive = tokio::spawn(receive_messages(receiver));

    tokio::select! {
        res = send_messages(sender) => {
            if let Err(e) = res {
                eprintln!("\n[ERROR] Sending message: {:#}", e);
            }
            receive.abort();
        }
        _ = &mut receive => {}
    }

    Ok(())
}

/// `host:port` from the first argument, else `RELAY_HOST`/`RELAY_PORT`
fn server_addr() -> String {
    if let Some(addr) = std::env::args().nth(1) {
        return addr;
    }
    let host = std::env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string());
    let port = std::env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    format!("{}:{}", host, port)
}

async fn receive_messages(mut receiver: RelayReceiver) {
    loop {
        match receiver.next_frame().await {
            Ok(Some(frame)) => {
                println!("\n{}", display::render(&frame));
            }
            Ok(None) => {
                println!("\n[INFO] Server disconnected");
                return;
            }
            Err(e) => {
                eprintln!("\n[ERROR] Receiving message: {:#}", e);
                return;
            }
        }
    }
}

async fn send_messages(mut sender: RelaySender) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Quit => {
                println!("[INFO] Closing connection...");
                break;
            }
            Input::Request(request) => sender.send_request(request).await?,
            Input::Text(text) => sender.send_chat(text).await?,
            Input::Usage(usage) => println!("{}", usage),
            Input::Empty => {}
        }
    }

    sender.close().await
}
