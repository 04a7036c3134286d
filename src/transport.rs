use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::TransportError;
use crate::messages::{ClientEvent, JoinChat, SendMessage, ServerEvent};

/// Opens event-channel connections. One connection per mounted chat view.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;
}

/// A live event-channel connection.
///
/// The connection owns the only receiver for inbound events, so exactly one
/// consumer exists per connection. Dropping it stops the reader task and lets
/// the writer flush a close frame.
pub struct Connection {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    inbound: mpsc::UnboundedReceiver<ServerEvent>,
    joined: Option<JoinChat>,
    tasks: Vec<JoinHandle<()>>,
}

/// The far side of an in-process connection.
pub struct ChannelPeer {
    pub outbound: mpsc::UnboundedReceiver<ClientEvent>,
    pub inbound: mpsc::UnboundedSender<ServerEvent>,
}

impl ChannelPeer {
    pub fn deliver(&self, event: ServerEvent) -> bool {
        self.inbound.send(event).is_ok()
    }
}

/// Builds a connection wired to in-process channels instead of a socket.
pub fn channel_pair() -> (Connection, ChannelPeer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    (
        Connection::new(out_tx, in_rx, Vec::new()),
        ChannelPeer {
            outbound: out_rx,
            inbound: in_tx,
        },
    )
}

impl Connection {
    fn new(
        outbound: mpsc::UnboundedSender<ClientEvent>,
        inbound: mpsc::UnboundedReceiver<ServerEvent>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Connection {
            outbound,
            inbound,
            joined: None,
            tasks,
        }
    }

    /// Announces the conversation. Allowed once per connection.
    pub fn join(&mut self, local_user_id: &str, peer_user_id: &str) -> Result<(), TransportError> {
        if self.joined.is_some() {
            return Err(TransportError::AlreadyJoined);
        }
        let join = JoinChat {
            user_id: local_user_id.to_string(),
            target_user_id: peer_user_id.to_string(),
        };
        self.emit(ClientEvent::JoinChat(join.clone()))?;
        info!("joined chat {} <-> {}", local_user_id, peer_user_id);
        self.joined = Some(join);
        Ok(())
    }

    /// Fire-and-forget send to the joined peer.
    pub fn send(&self, text: &str) -> Result<(), TransportError> {
        let joined = self.joined.as_ref().ok_or(TransportError::NotJoined)?;
        self.emit(ClientEvent::SendMessage(SendMessage {
            user_id: joined.user_id.clone(),
            target_user_id: joined.target_user_id.clone(),
            text: text.to_string(),
        }))?;
        debug!("sent message to {}", joined.target_user_id);
        Ok(())
    }

    /// Next inbound event, or `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.inbound.recv().await
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.joined.as_ref().map(|j| j.target_user_id.as_str())
    }

    pub fn close(self) {
        if let Some(joined) = &self.joined {
            info!("closing chat connection with {}", joined.target_user_id);
        }
    }

    fn emit(&self, event: ClientEvent) -> Result<(), TransportError> {
        self.outbound.send(event).map_err(|_| TransportError::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inbound.close();
        for task in &self.tasks {
            task.abort();
        }
    }
}

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Websocket connector for the chat event channel.
pub struct WsConnector {
    url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl WsConnector {
    pub fn new(url: Url, token: Option<String>) -> Self {
        WsConnector {
            url,
            token,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Bounds the websocket handshake, TCP connect included.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        if let Some(token) = &self.token {
            let cookie = HeaderValue::from_str(&format!("token={token}"))
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            request.headers_mut().insert(COOKIE, cookie);
        }

        let (ws, _) = tokio::time::timeout(self.timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Connect(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!("event channel connected to {}", self.url);

        let (mut ws_tx, mut ws_rx) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerEvent>();

        // Ends when the connection drops its sender, then closes the socket.
        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("failed to encode outbound event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(WsMessage::Text(text.into())).await {
                    error!("failed to send websocket frame: {}", e);
                    break;
                }
            }
            let _ = ws_tx.close().await;
            debug!("event channel writer finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(result) = ws_rx.next().await {
                match result {
                    Ok(WsMessage::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(event) => {
                                if in_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("ignoring inbound frame {}: {}", text.as_str(), e),
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        info!("event channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("websocket error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Connection::new(out_tx, in_rx, vec![reader]))
    }
}
