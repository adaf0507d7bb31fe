//! Transport-free core of the race server.
//!
//! The hub owns every registry and room. The network layer feeds it
//! connection events and decoded frames, calls [`RaceHub::tick`] at the
//! fixed simulation rate and delivers whatever lands in the outbox. Nothing
//! in here holds a socket; messages are addressed by connection id.

use log::{debug, info, warn};
use race_shared::physics::CarTuning;
use race_shared::protocol::{
    ClientMessage, Countdown, LobbyStatePayload, RaceFinished, ServerMessage, SessionInfo,
    StatePayload, Winner,
};
use race_shared::track::TrackGeometry;
use race_shared::{fixed_dt, InputState, Sequence, SessionId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::game::RaceSimulation;
use crate::lobby::{JoinOutcome, LeaveOutcome, LobbyDirectory, RoomId};
use crate::race::{RaceController, RaceEvent, RacePhase, RaceTimer};
use crate::scheduler::Scheduler;
use crate::session::{ConnectionId, SessionRegistry};

/// A message waiting to be sent to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub connection: ConnectionId,
    pub message: ServerMessage,
}

pub struct RaceHub {
    config: ServerConfig,
    track: Arc<TrackGeometry>,
    tuning: CarTuning,
    sessions: SessionRegistry,
    lobby: LobbyDirectory,
    races: HashMap<RoomId, RaceController>,
    scheduler: Scheduler<RaceTimer>,
    tick: u64,
    sync_interval: u64,
    outbox: Vec<Outgoing>,
}

impl RaceHub {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_track(config, TrackGeometry::default_circuit())
    }

    pub fn with_track(config: ServerConfig, track: TrackGeometry) -> Self {
        let sync_interval = config.sync_interval_ticks();
        Self {
            sessions: SessionRegistry::new(config.max_connections),
            lobby: LobbyDirectory::new(config.room_capacity),
            config,
            track: Arc::new(track),
            tuning: CarTuning::default(),
            races: HashMap::new(),
            scheduler: Scheduler::new(),
            tick: 0,
            sync_interval,
            outbox: Vec::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn lobby(&self) -> &LobbyDirectory {
        &self.lobby
    }

    pub fn race(&self, room_id: &str) -> Option<&RaceController> {
        self.races.get(room_id)
    }

    pub fn race_mut(&mut self, room_id: &str) -> Option<&mut RaceController> {
        self.races.get_mut(room_id)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Takes every message queued since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    /// Registers a new connection. Returns false when the server is full;
    /// the caller should close the connection.
    pub fn connect(&mut self, connection: ConnectionId) -> bool {
        let session_id = match self.sessions.register(connection) {
            Some(session) => session.id,
            None => {
                warn!("Rejecting connection {}: server full", connection);
                return false;
            }
        };

        self.send(connection, ServerMessage::SessionInfo(SessionInfo { id: session_id }));
        self.broadcast_lobby();
        true
    }

    /// Tears down a connection's session, leaving its room first.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(session_id) = self.sessions.session_id_for(connection) else {
            return;
        };

        if let Some(outcome) = self.lobby.leave_room(session_id) {
            self.after_leave(outcome);
        }
        self.sessions.unregister(connection);
        self.broadcast_lobby();
    }

    /// Decodes and dispatches one text frame. Frames that do not parse into
    /// a known message are dropped without a reply.
    pub fn handle_frame(&mut self, connection: ConnectionId, text: &str) {
        match ClientMessage::parse(text) {
            Ok(message) => self.handle_message(connection, message),
            Err(e) => debug!("Dropping malformed frame from {}: {}", connection, e),
        }
    }

    pub fn handle_message(&mut self, connection: ConnectionId, message: ClientMessage) {
        let Some(session_id) = self.sessions.session_id_for(connection) else {
            debug!("Dropping message from unregistered connection {}", connection);
            return;
        };

        match message {
            ClientMessage::Input { sequence, payload } => {
                self.handle_input(session_id, sequence, payload);
            }
            ClientMessage::TrackCreate { payload } => {
                let requested = payload.and_then(|p| p.track_id);
                let name = self.sessions.display_name(session_id);
                let result = self
                    .lobby
                    .create_room(session_id, &name, requested.as_deref());
                self.after_join(connection, session_id, result);
            }
            ClientMessage::TrackJoin { payload } => {
                let name = self.sessions.display_name(session_id);
                let result = self.lobby.join_room(session_id, &name, &payload.track_id);
                self.after_join(connection, session_id, result);
            }
            ClientMessage::TrackLeave => {
                if let Some(outcome) = self.lobby.leave_room(session_id) {
                    self.after_leave(outcome);
                    self.broadcast_lobby();
                }
            }
            ClientMessage::RaceStart => self.handle_start(session_id),
            ClientMessage::RaceRestart => self.handle_restart(session_id),
            ClientMessage::SessionHello { payload } => {
                if let Some(name) = self.sessions.apply_hello(connection, &payload.browser_name) {
                    if let Some(room_id) = self.lobby.rename(session_id, &name) {
                        self.broadcast_track(&room_id);
                    }
                    self.broadcast_lobby();
                }
            }
        }
    }

    /// Advances the authoritative world by one fixed tick.
    pub fn tick(&mut self) {
        self.tick += 1;

        for timer in self.scheduler.advance() {
            match timer {
                RaceTimer::CountdownElapsed { room_id } => {
                    let event = match self.races.get_mut(&room_id) {
                        Some(race) => race.on_countdown_elapsed(&mut self.scheduler),
                        None => None,
                    };
                    if let Some(event) = event {
                        self.announce(&room_id, event);
                    }
                }
            }
        }

        let dt = fixed_dt();
        let mut events = Vec::new();
        for (room_id, race) in self.races.iter_mut() {
            if let Some(event) = race.tick(dt) {
                events.push((room_id.clone(), event));
            }
        }
        for (room_id, event) in events {
            self.announce(&room_id, event);
        }

        if self.tick % self.sync_interval == 0 {
            self.sync_state();
        }
    }

    fn handle_input(&mut self, session_id: SessionId, sequence: Sequence, input: InputState) {
        let Some(room) = self.lobby.room_of(session_id) else {
            return;
        };
        if let Some(race) = self.races.get_mut(&room.id) {
            if !race.simulation_mut().queue_input(session_id, sequence, input) {
                debug!("Duplicate input {} from session {}", sequence, session_id);
            }
        }
    }

    fn handle_start(&mut self, session_id: SessionId) {
        let Some(room) = self.lobby.room_of(session_id) else {
            debug!("Ignoring start from session {} outside a track", session_id);
            return;
        };
        let room_id = room.id.clone();
        let is_host = room.host_id == session_id;

        let event = match self.races.get_mut(&room_id) {
            Some(race) => race.request_start(is_host, &mut self.scheduler),
            None => None,
        };
        if let Some(event) = event {
            self.announce(&room_id, event);
        }
    }

    fn handle_restart(&mut self, session_id: SessionId) {
        let Some(room) = self.lobby.room_of(session_id) else {
            debug!("Ignoring restart from session {} outside a track", session_id);
            return;
        };
        let room_id = room.id.clone();
        let is_host = room.host_id == session_id;

        let event = self
            .races
            .get_mut(&room_id)
            .and_then(|race| race.request_restart(is_host));
        if let Some(event) = event {
            self.announce(&room_id, event);
        }
    }

    fn after_join(
        &mut self,
        connection: ConnectionId,
        session_id: SessionId,
        result: Result<JoinOutcome, crate::error::LobbyError>,
    ) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                info!("Session {} request rejected: {}", session_id, e);
                self.send(connection, ServerMessage::error(e.to_string()));
                return;
            }
        };

        if let Some(left) = outcome.left {
            self.after_leave(left);
        }

        let room_id = outcome.room_id;
        let race = self.races.entry(room_id.clone()).or_insert_with(|| {
            let simulation =
                RaceSimulation::new(Arc::clone(&self.track), self.tuning, self.config.laps_to_win);
            RaceController::new(room_id.clone(), simulation)
        });
        race.simulation_mut().add_player(session_id);

        self.sessions.set_current_track(session_id, Some(room_id.clone()));
        self.broadcast_track(&room_id);
        self.broadcast_lobby();
    }

    /// Drops the leaving player from the simulation and tears the room down
    /// if it emptied.
    fn after_leave(&mut self, outcome: LeaveOutcome) {
        self.sessions.set_current_track(outcome.session_id, None);

        if outcome.destroyed {
            if let Some(mut race) = self.races.remove(&outcome.room_id) {
                race.abort(&mut self.scheduler);
            }
            return;
        }

        if let Some(race) = self.races.get_mut(&outcome.room_id) {
            race.simulation_mut().remove_player(outcome.session_id);
        }
        self.broadcast_track(&outcome.room_id);
    }

    fn announce(&mut self, room_id: &str, event: RaceEvent) {
        let message = match event {
            RaceEvent::Countdown { seconds_left } => {
                ServerMessage::RaceCountdown(Countdown { seconds_left })
            }
            RaceEvent::Started => ServerMessage::RaceStarted,
            RaceEvent::Finished { winner } => ServerMessage::RaceFinished(RaceFinished {
                winner: winner.map(|id| self.winner(id)),
            }),
            RaceEvent::Reset => {
                self.broadcast_track(room_id);
                return;
            }
        };
        self.broadcast_room(room_id, message);
    }

    fn winner(&self, session_id: SessionId) -> Winner {
        Winner {
            id: session_id,
            name: self.sessions.display_name(session_id),
        }
    }

    /// Sends each room member its own snapshot carrying that member's
    /// input acknowledgement.
    fn sync_state(&mut self) {
        let mut outgoing = Vec::new();

        for room in self.lobby.rooms() {
            let Some(race) = self.races.get(&room.id) else {
                continue;
            };
            let simulation = race.simulation();
            let result = simulation.result();
            let players: Vec<_> = simulation
                .players()
                .iter()
                .map(|p| p.snapshot(self.sessions.display_name(p.session_id)))
                .collect();
            let winner = result.winner.map(|id| self.winner(id));

            for member in &room.members {
                let Some(connection) = self.sessions.connection_for(member.session_id) else {
                    continue;
                };
                outgoing.push(Outgoing {
                    connection,
                    message: ServerMessage::State(StatePayload {
                        tick: simulation.tick,
                        players: players.clone(),
                        last_processed_input_sequence: simulation
                            .last_processed_input(member.session_id),
                        race_finished: result.finished,
                        winner: winner.clone(),
                    }),
                });
            }
        }

        self.outbox.extend(outgoing);
    }

    fn broadcast_lobby(&mut self) {
        let payload = LobbyStatePayload {
            users: self.sessions.users(),
            tracks: self.lobby.room_views(),
        };
        for connection in self.sessions.connections() {
            self.send(connection, ServerMessage::LobbyState(payload.clone()));
        }
    }

    fn broadcast_track(&mut self, room_id: &str) {
        if let Some(view) = self.lobby.room(room_id).map(|room| room.view()) {
            self.broadcast_room(room_id, ServerMessage::TrackState(view));
        }
    }

    fn broadcast_room(&mut self, room_id: &str, message: ServerMessage) {
        let members = match self.lobby.room(room_id) {
            Some(room) => room.member_ids(),
            None => return,
        };
        for session_id in members {
            if let Some(connection) = self.sessions.connection_for(session_id) {
                self.send(connection, message.clone());
            }
        }
    }

    fn send(&mut self, connection: ConnectionId, message: ServerMessage) {
        self.outbox.push(Outgoing {
            connection,
            message,
        });
    }

    /// Phase of the room a session is in, if any.
    pub fn phase_of(&self, session_id: SessionId) -> Option<RacePhase> {
        let room = self.lobby.room_of(session_id)?;
        self.races.get(&room.id).map(RaceController::phase)
    }
}
