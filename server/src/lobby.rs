//! Registry of track rooms: capacity, membership in join order and host
//! succession. A session is a member of at most one room at a time.

use log::info;
use race_shared::protocol::{MemberView, TrackRoomView};
use race_shared::SessionId;
use std::collections::{BTreeMap, HashMap};

use crate::error::LobbyError;

pub type RoomId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMember {
    pub session_id: SessionId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRoom {
    pub id: RoomId,
    /// Members in join order.
    pub members: Vec<RoomMember>,
    pub capacity: usize,
    pub host_id: SessionId,
}

impl TrackRoom {
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.members.iter().any(|m| m.session_id == session_id)
    }

    pub fn member_ids(&self) -> Vec<SessionId> {
        self.members.iter().map(|m| m.session_id).collect()
    }

    pub fn view(&self) -> TrackRoomView {
        TrackRoomView {
            id: self.id.clone(),
            members: self
                .members
                .iter()
                .map(|m| MemberView {
                    session_id: m.session_id,
                    display_name: m.display_name.clone(),
                })
                .collect(),
            capacity: self.capacity,
            host_id: self.host_id,
        }
    }
}

/// What happened to a room when a member left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room_id: RoomId,
    pub session_id: SessionId,
    /// True if the room became empty and was removed.
    pub destroyed: bool,
    /// Set when the leaving member was host and someone took over.
    pub new_host: Option<SessionId>,
}

/// Result of a successful create or join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    /// The room the session had to leave first, if any.
    pub left: Option<LeaveOutcome>,
}

#[derive(Debug)]
pub struct LobbyDirectory {
    rooms: BTreeMap<RoomId, TrackRoom>,
    membership: HashMap<SessionId, RoomId>,
    capacity: usize,
    next_room_number: u64,
}

impl LobbyDirectory {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: BTreeMap::new(),
            membership: HashMap::new(),
            capacity,
            next_room_number: 1,
        }
    }

    /// Creates a room with the requester as sole member and host.
    ///
    /// `requested_id` is used verbatim when given; a taken id is rejected.
    /// Without one a fresh `track-N` id is allocated.
    pub fn create_room(
        &mut self,
        session_id: SessionId,
        display_name: &str,
        requested_id: Option<&str>,
    ) -> Result<JoinOutcome, LobbyError> {
        let room_id = match requested_id {
            Some(id) if self.rooms.contains_key(id) => {
                return Err(LobbyError::RoomExists(id.to_string()));
            }
            Some(id) => id.to_string(),
            None => self.allocate_id(),
        };

        let left = self.leave_room(session_id);

        let room = TrackRoom {
            id: room_id.clone(),
            members: vec![RoomMember {
                session_id,
                display_name: display_name.to_string(),
            }],
            capacity: self.capacity,
            host_id: session_id,
        };
        self.rooms.insert(room_id.clone(), room);
        self.membership.insert(session_id, room_id.clone());
        info!("Session {} created track {}", session_id, room_id);

        Ok(JoinOutcome { room_id, left })
    }

    /// Adds a session to an existing room. Joining the room the session is
    /// already in changes nothing.
    pub fn join_room(
        &mut self,
        session_id: SessionId,
        display_name: &str,
        room_id: &str,
    ) -> Result<JoinOutcome, LobbyError> {
        let room = self
            .rooms
            .get(room_id)
            .ok_or_else(|| LobbyError::RoomNotFound(room_id.to_string()))?;

        if room.contains(session_id) {
            return Ok(JoinOutcome {
                room_id: room_id.to_string(),
                left: None,
            });
        }
        if room.is_full() {
            return Err(LobbyError::RoomFull(room_id.to_string()));
        }

        let left = self.leave_room(session_id);

        if let Some(room) = self.rooms.get_mut(room_id) {
            room.members.push(RoomMember {
                session_id,
                display_name: display_name.to_string(),
            });
        }
        self.membership.insert(session_id, room_id.to_string());
        info!("Session {} joined track {}", session_id, room_id);

        Ok(JoinOutcome {
            room_id: room_id.to_string(),
            left,
        })
    }

    /// Removes a session from its room. The earliest-joined remaining member
    /// inherits the host role; an emptied room is destroyed.
    pub fn leave_room(&mut self, session_id: SessionId) -> Option<LeaveOutcome> {
        let room_id = self.membership.remove(&session_id)?;
        let room = self.rooms.get_mut(&room_id)?;

        room.members.retain(|m| m.session_id != session_id);

        if room.members.is_empty() {
            self.rooms.remove(&room_id);
            info!("Track {} destroyed", room_id);
            return Some(LeaveOutcome {
                room_id,
                session_id,
                destroyed: true,
                new_host: None,
            });
        }

        let mut new_host = None;
        if room.host_id == session_id {
            room.host_id = room.members[0].session_id;
            new_host = Some(room.host_id);
            info!("Track {} host is now session {}", room_id, room.host_id);
        }

        Some(LeaveOutcome {
            room_id,
            session_id,
            destroyed: false,
            new_host,
        })
    }

    /// Updates a member's display name in its room. Returns the affected room.
    pub fn rename(&mut self, session_id: SessionId, display_name: &str) -> Option<RoomId> {
        let room_id = self.membership.get(&session_id)?;
        let room = self.rooms.get_mut(room_id)?;
        for member in room.members.iter_mut().filter(|m| m.session_id == session_id) {
            member.display_name = display_name.to_string();
        }
        Some(room_id.clone())
    }

    pub fn room(&self, room_id: &str) -> Option<&TrackRoom> {
        self.rooms.get(room_id)
    }

    pub fn room_of(&self, session_id: SessionId) -> Option<&TrackRoom> {
        self.membership
            .get(&session_id)
            .and_then(|room_id| self.rooms.get(room_id))
    }

    pub fn is_host(&self, session_id: SessionId) -> bool {
        self.room_of(session_id)
            .map(|room| room.host_id == session_id)
            .unwrap_or(false)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &TrackRoom> {
        self.rooms.values()
    }

    pub fn room_views(&self) -> Vec<TrackRoomView> {
        self.rooms.values().map(TrackRoom::view).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn allocate_id(&mut self) -> RoomId {
        loop {
            let candidate = format!("track-{}", self.next_room_number);
            self.next_room_number += 1;
            if !self.rooms.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}
