//! JSON wire protocol. Every text frame carries one object discriminated by
//! its `type` field.

use serde::{Deserialize, Serialize};

use crate::{InputState, Sequence, SessionId};

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "input")]
    Input {
        sequence: Sequence,
        payload: InputState,
    },
    #[serde(rename = "track:create")]
    TrackCreate {
        #[serde(default)]
        payload: Option<TrackCreate>,
    },
    #[serde(rename = "track:join")]
    TrackJoin { payload: TrackJoin },
    #[serde(rename = "track:leave")]
    TrackLeave,
    #[serde(rename = "race:start")]
    RaceStart,
    #[serde(rename = "race:restart")]
    RaceRestart,
    #[serde(rename = "session:hello")]
    SessionHello { payload: SessionHello },
}

impl ClientMessage {
    /// Parses one text frame. Anything outside the known message set fails.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCreate {
    #[serde(default)]
    pub track_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackJoin {
    pub track_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHello {
    pub browser_name: String,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "state")]
    State(StatePayload),
    #[serde(rename = "lobby:state")]
    LobbyState(LobbyStatePayload),
    #[serde(rename = "track:state")]
    TrackState(TrackRoomView),
    #[serde(rename = "session:info")]
    SessionInfo(SessionInfo),
    #[serde(rename = "race:countdown")]
    RaceCountdown(Countdown),
    #[serde(rename = "race:started")]
    RaceStarted,
    #[serde(rename = "race:finished")]
    RaceFinished(RaceFinished),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    /// Last input sequence applied for the recipient of this packet.
    pub last_processed_input_sequence: Sequence,
    pub race_finished: bool,
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: SessionId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub speed: f32,
    pub lap_count: u32,
    pub next_checkpoint: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub id: SessionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: SessionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub session_id: SessionId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRoomView {
    pub id: String,
    pub members: Vec<MemberView>,
    pub capacity: usize,
    pub host_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStatePayload {
    pub users: Vec<UserView>,
    pub tracks: Vec<TrackRoomView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub seconds_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceFinished {
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}
