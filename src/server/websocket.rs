// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! WebSocket notification stream

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::core::{EventBus, ThingEvent};

const WILDCARD: &str = "*";

/// Pushes every property change and event of the thing to its clients
pub struct NotificationServer {
    addr: SocketAddr,
    max_clients: usize,
    bus: Arc<EventBus>,
    clients: Arc<RwLock<HashMap<String, ClientHandle>>>,
    broadcast_tx: broadcast::Sender<Outgoing>,
}

struct ClientHandle {
    addr: SocketAddr,
    subscriptions: HashSet<String>,
}

impl ClientHandle {
    fn wants(&self, topic: &str) -> bool {
        self.subscriptions.contains(WILDCARD) || self.subscriptions.contains(topic)
    }
}

/// Serialized notification, encoded once for all clients
#[derive(Clone, Debug)]
struct Outgoing {
    topic: &'static str,
    json: String,
}

impl Outgoing {
    fn encode(event: &ThingEvent) -> Result<Self> {
        Ok(Self {
            topic: event.notification.topic(),
            json: serde_json::to_string(event)?,
        })
    }
}

impl NotificationServer {
    pub fn new(addr: SocketAddr, max_clients: usize, bus: Arc<EventBus>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(1000);

        Self {
            addr,
            max_clients,
            bus,
            clients: Arc::new(RwLock::new(HashMap::new())),
            broadcast_tx,
        }
    }

    /// Bind and start accepting clients; returns the bound address
    pub async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.addr).await?;
        let local = listener.local_addr()?;

        info!("Notification stream listening on ws://{}", local);

        self.spawn_pump(shutdown.resubscribe());

        let clients = self.clients.clone();
        let max_clients = self.max_clients;
        let broadcast_tx = self.broadcast_tx.clone();
        let mut shutdown = shutdown;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                let client_count = clients.read().await.len();
                                if client_count >= max_clients {
                                    warn!("Max clients reached, rejecting connection from {}", addr);
                                    continue;
                                }

                                let clients = clients.clone();
                                let broadcast_rx = broadcast_tx.subscribe();
                                let shutdown = shutdown.resubscribe();

                                tokio::spawn(handle_connection(stream, addr, clients, broadcast_rx, shutdown));
                            }
                            Err(e) => {
                                error!("Accept error: {}", e);
                            }
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("Notification stream shutting down");
                        break;
                    }
                }
            }
        });

        Ok(local)
    }

    /// Forward bus traffic to connected clients
    fn spawn_pump(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut bus_rx = self.bus.subscribe();
        let broadcast_tx = self.broadcast_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = bus_rx.recv() => {
                        match received {
                            Ok(event) => match Outgoing::encode(&event) {
                                Ok(out) => {
                                    // No connected clients is not an error
                                    let _ = broadcast_tx.send(out);
                                }
                                Err(e) => warn!("Failed to encode notification {}: {}", event.id, e),
                            },
                            Err(RecvError::Lagged(n)) => warn!("Notification stream lagged by {} messages", n),
                            Err(RecvError::Closed) => break,
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn client_addrs(&self) -> Vec<SocketAddr> {
        self.clients.read().await.values().map(|c| c.addr).collect()
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    clients: Arc<RwLock<HashMap<String, ClientHandle>>>,
    mut broadcast_rx: broadcast::Receiver<Outgoing>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let client_id = uuid::Uuid::new_v4().to_string();

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    info!("New stream client {} (id: {})", addr, client_id);

    clients.write().await.insert(
        client_id.clone(),
        ClientHandle {
            addr,
            subscriptions: HashSet::from([WILDCARD.to_string()]),
        },
    );

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let welcome = serde_json::json!({
        "type": "welcome",
        "client_id": client_id,
        "server": crate::NAME,
        "version": crate::VERSION,
    });

    if let Err(e) = ws_sender.send(Message::Text(welcome.to_string())).await {
        warn!("Failed to send welcome: {}", e);
    }

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from {}: {}", addr, text);
                        if let Some(reply) = handle_command(&text, &client_id, &clients).await {
                            let _ = ws_sender.send(Message::Text(reply.to_string())).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Stream closed by client {}", addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sender.send(Message::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            msg = broadcast_rx.recv() => {
                match msg {
                    Ok(out) => {
                        let wanted = clients
                            .read()
                            .await
                            .get(&client_id)
                            .map(|c| c.wants(out.topic))
                            .unwrap_or(false);
                        if !wanted {
                            continue;
                        }
                        if let Err(e) = ws_sender.send(Message::Text(out.json)).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!("Client {} lagged, {} notifications dropped", addr, n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            _ = shutdown.recv() => {
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    clients.write().await.remove(&client_id);

    info!("Stream client {} disconnected", addr);
}

/// Apply a client command, returning the reply to send if any
async fn handle_command(
    text: &str,
    client_id: &str,
    clients: &RwLock<HashMap<String, ClientHandle>>,
) -> Option<serde_json::Value> {
    let cmd: serde_json::Value = serde_json::from_str(text).ok()?;
    let cmd_type = cmd.get("type").and_then(|v| v.as_str())?;
    let topic = cmd.get("topic").and_then(|v| v.as_str());

    match (cmd_type, topic) {
        ("ping", _) => Some(serde_json::json!({"type": "pong"})),
        ("subscribe", Some(topic)) => {
            let mut clients = clients.write().await;
            let client = clients.get_mut(client_id)?;
            // An explicit topic narrows the default subscribe-all
            client.subscriptions.remove(WILDCARD);
            client.subscriptions.insert(topic.to_string());
            Some(serde_json::json!({"type": "subscribed", "topic": topic}))
        }
        ("unsubscribe", Some(topic)) => {
            let mut clients = clients.write().await;
            let client = clients.get_mut(client_id)?;
            client.subscriptions.remove(topic);
            Some(serde_json::json!({"type": "unsubscribed", "topic": topic}))
        }
        _ => None,
    }
}
