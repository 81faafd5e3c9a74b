//! The server that delivers events to connected users in real time.
//!
//! Clients connect over TCP and stay anonymous until their first line, a
//! JSON `{"token": ...}` frame, resolves to a user; from then on the
//! connection receives every event addressed to that user, one JSON object
//! per line. A second listener accepts the internal bus from API processes
//! and fans frames out to the bound connections. When a bound connection
//! drops, the API is notified once over HTTP; anonymous drops are not
//! reported.

use super::api_client::EventsApiClient;
use crate::auth::AuthService;
use crate::store::Store;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tuicub::error::Error;
use tuicub::user::UserToken;
use uuid::Uuid;

/// Resolves connect-frame tokens to user tokens.
pub trait TokenResolver: Send + Sync + 'static {
    fn resolve(&self, token: &str) -> Result<UserToken, Error>;
}

impl TokenResolver for Arc<Store> {
    fn resolve(&self, token: &str) -> Result<UserToken, Error> {
        self.session().get_user_token(token)
    }
}

/// The first frame a client sends to bind its connection to a user.
#[derive(Debug, Deserialize)]
struct ConnectRequest {
    token: String,
}

/// One frame from the API over the bus.
#[derive(Debug, Deserialize)]
struct IncomingEnvelope {
    token: String,
    message: IncomingMessage,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    recipents: Vec<Uuid>,
    event: Value,
}

/// A bound client connection: the writer-task handle events are queued on.
struct ClientHandle {
    connection_id: Uuid,
    sender: UnboundedSender<String>,
}

pub struct EventsServer<R> {
    resolver: R,
    auth: AuthService,
    api: EventsApiClient,
    connections: Mutex<HashMap<Uuid, ClientHandle>>,
}

impl<R: TokenResolver> EventsServer<R> {
    pub fn new(resolver: R, auth: AuthService, api: EventsApiClient) -> Arc<Self> {
        Arc::new(Self {
            resolver,
            auth,
            api,
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// Accepts game-client connections forever.
    pub async fn listen_clients(self: Arc<Self>, listener: TcpListener) {
        info!(addr = ?listener.local_addr(), "Events server listening for clients");
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(server.handle_client(stream));
                }
                Err(err) => warn!(%err, "Failed to accept client connection"),
            }
        }
    }

    /// Accepts bus connections from API processes forever.
    pub async fn listen_bus(self: Arc<Self>, listener: TcpListener) {
        info!(addr = ?listener.local_addr(), "Events server listening for the bus");
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(server.handle_bus(stream));
                }
                Err(err) => warn!(%err, "Failed to accept bus connection"),
            }
        }
    }

    /// Drives one client connection from accept to loss.
    async fn handle_client(self: Arc<Self>, stream: TcpStream) {
        let connection_id = Uuid::new_v4();
        info!(%connection_id, "Client connected");

        let (read_half, mut write_half) = stream.into_split();
        let (sender, mut queue) = mpsc::unbounded_channel::<String>();

        // The writer owns the write half; it ends on the first failed write,
        // which marks the connection lost.
        let mut writer = tokio::spawn(async move {
            while let Some(line) = queue.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        let mut lines = BufReader::new(read_half).lines();
        let mut bound: Option<Uuid> = None;
        loop {
            tokio::select! {
                _ = &mut writer => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        // Only the first frame means anything; everything a
                        // bound client sends afterwards is ignored.
                        if bound.is_none() && !line.trim().is_empty() {
                            bound = self
                                .bind_connection(connection_id, line.trim(), sender.clone())
                                .await;
                        }
                    }
                    _ => break,
                },
            }
        }
        writer.abort();

        match bound {
            Some(user_id) => self.connection_lost(connection_id, user_id).await,
            None => info!(%connection_id, "Anonymous connection closed"),
        }
    }

    /// Reads authenticated frames off one bus connection and fans them out.
    async fn handle_bus(self: Arc<Self>, stream: TcpStream) {
        info!("Bus connection established");

        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let envelope: IncomingEnvelope = match serde_json::from_str(&line) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(%err, "Malformed bus frame");
                    continue;
                }
            };
            if self.auth.authorize_message(&envelope.token).is_err() {
                warn!("Bus frame with an invalid token rejected");
                continue;
            }
            self.dispatch(&envelope.message.recipents, &envelope.message.event)
                .await;
        }

        info!("Bus connection closed");
    }

    /// Queues the event on every bound recipient connection. Each recipient
    /// has its own writer task, so one slow client never stalls the frame
    /// loop or the other recipients; per recipient, events keep bus order.
    async fn dispatch(&self, recipents: &[Uuid], event: &Value) {
        let line = format!("{event}\n");
        let event_name = event
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("NONE")
            .to_string();

        let connections = self.connections.lock().await;
        for user_id in recipents {
            let Some(handle) = connections.get(user_id) else {
                continue;
            };
            if handle.sender.send(line.clone()).is_ok() {
                debug!(%user_id, %event_name, "Event sent");
            } else {
                warn!(%user_id, %event_name, "Recipient connection is gone");
            }
        }
    }

    async fn bind_connection(
        &self,
        connection_id: Uuid,
        line: &str,
        sender: UnboundedSender<String>,
    ) -> Option<Uuid> {
        let request: ConnectRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                warn!(%connection_id, %err, "Malformed connect request");
                return None;
            }
        };

        match self.resolver.resolve(&request.token) {
            Ok(user_token) => {
                let user_id = user_token.user_id;
                info!(%connection_id, %user_id, "Connection bound to user");
                self.connections.lock().await.insert(
                    user_id,
                    ClientHandle {
                        connection_id,
                        sender,
                    },
                );
                Some(user_id)
            }
            Err(err) => {
                warn!(%connection_id, error_name = err.error_name(),
                    "Connect request with an unknown token");
                None
            }
        }
    }

    /// Unbinds a lost connection and notifies the API, unless a newer
    /// connection has already taken over the user's binding.
    async fn connection_lost(&self, connection_id: Uuid, user_id: Uuid) {
        let unbound = {
            let mut connections = self.connections.lock().await;
            match connections.get(&user_id) {
                Some(handle) if handle.connection_id == connection_id => {
                    connections.remove(&user_id);
                    true
                }
                _ => false,
            }
        };
        if !unbound {
            info!(%connection_id, "Superseded connection closed");
            return;
        }

        info!(%connection_id, %user_id, "User disconnected");
        if let Err(err) = self.api.notify_user_disconnected(user_id).await {
            warn!(%err, %user_id, "Disconnect callback to the API failed");
        }
    }
}
