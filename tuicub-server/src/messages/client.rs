//! The line-framed TCP client carrying events to the events process.

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::warn;
use tuicub::events::Message;

/// The envelope wrapping every frame with the bus secret.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    token: &'a str,
    message: &'a Message,
}

/// A lazily connected client for the events process's bus listener.
///
/// Delivery is best-effort: the first send opens the connection, a failed
/// write drops it (the next send reconnects), and errors are logged rather
/// than surfaced, since the mutation that produced the events has already
/// committed.
pub struct MessagesClient {
    host: String,
    port: u16,
    token: String,
    stream: Mutex<Option<TcpStream>>,
}

impl MessagesClient {
    pub fn new(host: impl Into<String>, port: u16, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            token: token.into(),
            stream: Mutex::new(None),
        }
    }

    /// Sends one frame per message, each a JSON line.
    pub async fn send(&self, messages: &[Message]) {
        let mut stream = self.stream.lock().await;

        for message in messages {
            let frame = match self.encode(message) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(%err, "Failed to encode bus frame");
                    return;
                }
            };

            if stream.is_none() {
                *stream = self.connect().await;
            }
            let Some(connection) = stream.as_mut() else {
                return;
            };

            if let Err(err) = connection.write_all(frame.as_bytes()).await {
                warn!(%err, "Failed to write to the events process, dropping connection");
                *stream = None;
                return;
            }
        }
    }

    async fn connect(&self) -> Option<TcpStream> {
        match TcpStream::connect((self.host.as_str(), self.port)).await {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!(%err, host = %self.host, port = self.port,
                    "Failed to connect to the events process");
                None
            }
        }
    }

    fn encode(&self, message: &Message) -> Result<String, serde_json::Error> {
        let envelope = Envelope {
            token: &self.token,
            message,
        };
        Ok(format!("{}\n", serde_json::to_string(&envelope)?))
    }
}
