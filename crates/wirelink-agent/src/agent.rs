//! The agent connection loop.

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

use wirelink_codec::encode;
use wirelink_relay::protocol::{CommandResult, RemoteAttach, RemoteInbound};

use crate::handler::CommandHandler;
use crate::store::SessionCodeStore;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Agent connection error.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Transport-level failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    /// A message could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The server refused the attach.
    #[error("connect refused: {0}")]
    ConnectRefused(String),
}

/// A remote agent: joins a session and serves relayed commands.
pub struct Agent<H> {
    url: String,
    handler: H,
    store: Option<SessionCodeStore>,
}

impl<H: CommandHandler> Agent<H> {
    /// Create an agent for the relay server at `url` (a `ws://` endpoint).
    #[must_use]
    pub fn new(url: impl Into<String>, handler: H) -> Self {
        Self {
            url: url.into(),
            handler,
            store: None,
        }
    }

    /// Remember the session code across restarts via `store`.
    #[must_use]
    pub fn with_code_store(mut self, store: SessionCodeStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Connect, attach (rejoining a remembered session if one is stored),
    /// and serve commands until the server closes the connection.
    ///
    /// # Errors
    /// Returns transport and serialization failures, and
    /// [`AgentError::ConnectRefused`] when the server answers the attach
    /// with an error payload.
    pub async fn run(&self) -> Result<(), AgentError> {
        let (ws, _) = connect_async(&self.url).await?;
        let (mut sink, mut stream) = ws.split();

        let remembered = self.store.as_ref().and_then(SessionCodeStore::load);
        send_json(
            &mut sink,
            &RemoteAttach {
                connect_remote: remembered,
            },
        )
        .await?;

        while let Some(frame) = stream.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let msg: RemoteInbound = match serde_json::from_str(text.as_str()) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("discarding unparseable server message: {e}");
                    continue;
                }
            };

            if msg.connect_error == Some(true) {
                return Err(AgentError::ConnectRefused(
                    msg.message.unwrap_or_default(),
                ));
            }
            if let Some(code) = msg.session_id {
                tracing::info!(code, "session confirmed");
                if let Some(store) = &self.store {
                    if let Err(e) = store.save(code) {
                        tracing::warn!("could not persist session code: {e}");
                    }
                }
            }
            if let Some(message) = &msg.message {
                tracing::info!(%message, "server status");
            }

            if let (Some(id), Some(command)) = (msg.id, msg.command.as_deref()) {
                // Give the host application one scheduling tick before user
                // code runs; a courtesy, not a correctness requirement.
                tokio::task::yield_now().await;

                tracing::debug!(id, %command, "evaluating command");
                let value = self.handler.eval(command).await;
                send_json(
                    &mut sink,
                    &CommandResult {
                        id,
                        response: encode(&value),
                    },
                )
                .await?;
            }
        }
        Ok(())
    }
}

async fn send_json<T: Serialize>(sink: &mut WsSink, msg: &T) -> Result<(), AgentError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json.into())).await?;
    Ok(())
}
