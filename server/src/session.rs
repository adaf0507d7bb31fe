//! Session registry for live connections
//!
//! This module maps each transport connection to a stable session identity:
//! - Session lifecycle (register on connect, unregister on disconnect)
//! - Display names, either a default or derived from the client's hello
//! - Connection capacity enforcement
//!
//! Room membership is tracked by the lobby; sessions only remember which
//! track they are on for reporting.

use log::info;
use race_shared::protocol::UserView;
use race_shared::SessionId;
use rand::Rng;
use std::collections::HashMap;
use std::time::Instant;

use crate::lobby::RoomId;

/// Opaque identifier the transport assigns to each socket.
pub type ConnectionId = u64;

/// Identity of one connected player
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier assigned by the server
    pub id: SessionId,
    pub display_name: String,
    /// When the connection was registered
    pub joined_at: Instant,
    /// Track room the session is currently on
    pub current_track: Option<RoomId>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            display_name: format!("Racer-{}", id),
            joined_at: Instant::now(),
            current_track: None,
        }
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.display_name.clone(),
        }
    }
}

/// Manages all connected sessions
///
/// Sessions are keyed by connection id so the transport never has to hand
/// its socket handles to the game layers, and enforces the server's
/// connection limit.
pub struct SessionRegistry {
    /// Live sessions indexed by connection
    sessions: HashMap<ConnectionId, Session>,
    /// Reverse lookup for addressing messages to a session
    connections: HashMap<SessionId, ConnectionId>,
    /// Next available session ID
    next_session_id: SessionId,
    /// Maximum number of concurrent sessions, 0 for unbounded
    max_sessions: usize,
}

impl SessionRegistry {
    /// Creates an empty registry. Session IDs start from 1.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            connections: HashMap::new(),
            next_session_id: 1,
            max_sessions,
        }
    }

    /// Registers a new connection
    ///
    /// Returns None if the server is at capacity or the connection is
    /// already registered.
    pub fn register(&mut self, connection: ConnectionId) -> Option<&Session> {
        if self.max_sessions > 0 && self.sessions.len() >= self.max_sessions {
            return None;
        }
        if self.sessions.contains_key(&connection) {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        info!("Connection {} registered as session {}", connection, session_id);
        self.connections.insert(session_id, connection);
        self.sessions.insert(connection, Session::new(session_id));
        self.sessions.get(&connection)
    }

    /// Removes a connection's session and returns it.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection)?;
        self.connections.remove(&session.id);
        info!("Session {} disconnected", session.id);
        Some(session)
    }

    pub fn session_id_for(&self, connection: ConnectionId) -> Option<SessionId> {
        self.sessions.get(&connection).map(|s| s.id)
    }

    pub fn connection_for(&self, session_id: SessionId) -> Option<ConnectionId> {
        self.connections.get(&session_id).copied()
    }

    pub fn get(&self, connection: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection)
    }

    pub fn by_session(&self, session_id: SessionId) -> Option<&Session> {
        self.connection_for(session_id)
            .and_then(|connection| self.sessions.get(&connection))
    }

    pub fn display_name(&self, session_id: SessionId) -> String {
        self.by_session(session_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_else(|| format!("Racer-{}", session_id))
    }

    /// Sets the display name from a hello message and returns it.
    pub fn apply_hello(&mut self, connection: ConnectionId, browser_name: &str) -> Option<String> {
        let session = self.sessions.get_mut(&connection)?;
        session.display_name = derive_display_name(browser_name);
        info!("Session {} is now {}", session.id, session.display_name);
        Some(session.display_name.clone())
    }

    pub fn set_current_track(&mut self, session_id: SessionId, track: Option<RoomId>) {
        if let Some(connection) = self.connection_for(session_id) {
            if let Some(session) = self.sessions.get_mut(&connection) {
                session.current_track = track;
            }
        }
    }

    /// All connections, for lobby-wide broadcasts.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.sessions.keys().copied().collect()
    }

    /// Users ordered by session id.
    pub fn users(&self) -> Vec<UserView> {
        let mut users: Vec<UserView> = self.sessions.values().map(Session::view).collect();
        users.sort_by_key(|u| u.id);
        users
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Builds `browserName-XXXX` with a random four digit suffix.
pub fn derive_display_name(browser_name: &str) -> String {
    let browser = browser_name.trim();
    let browser = if browser.is_empty() { "Racer" } else { browser };
    let suffix = rand::thread_rng().gen_range(0..10_000);
    format!("{}-{:04}", browser, suffix)
}
