use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("failed to encode message: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("connection closed by server")]
    ConnectionClosed,
}
