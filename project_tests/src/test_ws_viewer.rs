//! # Viewer Smoke Client
//!
//! Connects to a running gateway, prints the initial snapshot, requests the
//! full history, then echoes every broadcast frame until interrupted.
//!
//! Usage: `test_ws_viewer [ws://host:port/ws]`

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9100/ws".to_string());

    println!("[*] Connecting to {} ...", url);
    let (ws, _) = connect_async(&url).await?;
    let (mut tx, mut rx) = ws.split();

    tx.send(Message::Text(r#"{"type":"REQUEST_ALL_DATA"}"#.into()))
        .await?;

    while let Some(frame) = rx.next().await {
        match frame? {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text)?;
                println!("----------------------------------------------");
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            Message::Close(_) => {
                println!("[*] Server closed the connection.");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
