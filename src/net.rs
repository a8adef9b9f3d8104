use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::state::{Command, ServerMessage, SharedSession};
use crate::vehicle::types::{ControlInput, ShiftRequest};

/// Client → server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Input {
        #[serde(default)]
        throttle: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        steer: f32,
        #[serde(default)]
        shift: ShiftRequest,
    },
    Start,
    Pause,
    Resume,
    Stop,
    Ping,
}

impl ClientMessage {
    fn from_json(txt: &str) -> Option<Self> {
        serde_json::from_str(txt).ok()
    }
}

pub async fn start_websocket_server(addr: String, session: Arc<Mutex<SharedSession>>) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind WebSocket port on {addr}"))?;

    println!("🌐 WebSocket listening on ws://{addr}");

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!("⚠️ accept failed: {e}");
                continue;
            }
        };

        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = handle_client(raw, session).await {
                eprintln!("⚠️ client {peer}: {e:#}");
            }
        });
    }
}

async fn handle_client(raw: TcpStream, session: Arc<Mutex<SharedSession>>) -> Result<()> {
    let ws = accept_async(raw).await.context("websocket handshake")?;
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel + send-loop task
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Register + welcome
    // -------------------------------
    let client_id = {
        let mut s = session.lock().await;
        let id = s.register_client(tx.clone());
        if let Some(welcome) = (ServerMessage::Welcome { client_id: id, vehicle: &s.vehicle }).to_json() {
            let _ = tx.send(welcome);
        }
        id
    };

    println!("🟢 Driver connected: {client_id}");

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        if msg.is_close() {
            break;
        }
        let text = match msg.to_text() {
            Ok(t) if msg.is_text() => t,
            _ => continue,
        };

        let Some(parsed) = ClientMessage::from_json(text) else {
            continue;
        };

        let mut s = session.lock().await;
        match parsed {
            ClientMessage::Input { throttle, brake, steer, shift } => {
                s.update_input(ControlInput { throttle, brake, steer, shift });
            }
            ClientMessage::Start => s.push_command(Command::Start),
            ClientMessage::Pause => s.push_command(Command::Pause),
            ClientMessage::Resume => s.push_command(Command::Resume),
            ClientMessage::Stop => s.push_command(Command::Stop),
            ClientMessage::Ping => {
                if let Some(pong) = ServerMessage::Pong.to_json() {
                    let _ = tx.send(pong);
                }
            }
        }
    }

    println!("🔴 Driver disconnected: {client_id}");
    session.lock().await.remove_client(&client_id);
    Ok(())
}
