use thiserror::Error;

/// Rejected lobby requests. The display text is sent back to the requester
/// as the `error` message payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("Track {0} already exists")]
    RoomExists(String),
    #[error("Track {0} does not exist")]
    RoomNotFound(String),
    #[error("Track {0} is full")]
    RoomFull(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("sync rate must be between 1 and {max} Hz, got {got}")]
    SyncRate { got: u32, max: u32 },
    #[error("room capacity must be at least 1")]
    RoomCapacity,
    #[error("laps to win must be at least 1")]
    LapsToWin,
}
