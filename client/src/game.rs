use log::debug;
use race_shared::physics::{angle_delta, CarState, CarTuning, Vector2};
use race_shared::protocol::{PlayerSnapshot, StatePayload, Winner};
use race_shared::track::TrackGeometry;
use race_shared::{InputState, Sequence, SessionId};
use std::collections::HashMap;

/// Squared distance between local echo and server truth above which the
/// local car is pulled toward the server.
pub const RECONCILE_DISTANCE_SQ: f32 = 100.0;
/// Fraction of the divergence removed per accepted snapshot.
pub const RECONCILE_BLEND: f32 = 0.2;
/// Fraction of the gap to its target a remote car closes per client tick.
pub const REMOTE_EASE: f32 = 0.25;

fn car_from_snapshot(snapshot: &PlayerSnapshot) -> CarState {
    CarState {
        position: Vector2::new(snapshot.x, snapshot.y),
        heading: snapshot.heading,
        speed: snapshot.speed,
    }
}

/// Another player's car, shown eased toward its latest snapshot.
#[derive(Debug, Clone)]
pub struct RemoteCar {
    pub id: SessionId,
    pub name: String,
    pub car: CarState,
    pub target: CarState,
    pub lap_count: u32,
}

impl RemoteCar {
    fn spawn(snapshot: &PlayerSnapshot) -> Self {
        let car = car_from_snapshot(snapshot);
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            car,
            target: car,
            lap_count: snapshot.lap_count,
        }
    }

    fn retarget(&mut self, snapshot: &PlayerSnapshot) {
        self.name = snapshot.name.clone();
        self.target = car_from_snapshot(snapshot);
        self.lap_count = snapshot.lap_count;
    }

    fn ease(&mut self) {
        self.car.position = self.car.position.lerp(&self.target.position, REMOTE_EASE);
        self.car.heading += angle_delta(self.car.heading, self.target.heading) * REMOTE_EASE;
        self.car.speed += (self.target.speed - self.car.speed) * REMOTE_EASE;
    }
}

/// Client view of the race: the locally echoed car plus remote cars
pub struct ClientGameState {
    session_id: Option<SessionId>,
    track: TrackGeometry,
    tuning: CarTuning,
    /// Locally echoed car, nudged toward the server when it drifts
    pub local: CarState,
    pub lap_count: u32,
    pub next_checkpoint: usize,
    racing: bool,
    last_ack: Sequence,
    remotes: HashMap<SessionId, RemoteCar>,
    pub server_tick: u64,
    pub race_finished: bool,
    pub winner: Option<Winner>,
}

impl ClientGameState {
    pub fn new(track: TrackGeometry) -> Self {
        Self {
            session_id: None,
            local: CarState::at_spawn(&track),
            track,
            tuning: CarTuning::default(),
            lap_count: 0,
            next_checkpoint: 1,
            racing: false,
            last_ack: -1,
            remotes: HashMap::new(),
            server_tick: 0,
            race_finished: false,
            winner: None,
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn last_ack(&self) -> Sequence {
        self.last_ack
    }

    pub fn remotes(&self) -> &HashMap<SessionId, RemoteCar> {
        &self.remotes
    }

    pub fn is_racing(&self) -> bool {
        self.racing
    }

    /// A fresh identity from the server. Everything learned under the
    /// previous session is dropped, including the acknowledgement watermark.
    pub fn on_session_info(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
        self.last_ack = -1;
        self.racing = false;
        self.remotes.clear();
        self.local = CarState::at_spawn(&self.track);
        self.lap_count = 0;
        self.next_checkpoint = 1;
        self.race_finished = false;
        self.winner = None;
    }

    /// Puts the local car back at spawn and clears the previous result for a
    /// new race. The acknowledgement watermark is kept.
    pub fn reset_race(&mut self) {
        self.racing = false;
        self.local = CarState::at_spawn(&self.track);
        self.lap_count = 0;
        self.next_checkpoint = 1;
        self.race_finished = false;
        self.winner = None;
    }

    pub fn set_racing(&mut self, racing: bool) {
        self.racing = racing;
        if racing {
            self.race_finished = false;
            self.winner = None;
        }
    }

    /// Echoes an input on the local car for immediate feedback. The car only
    /// moves while a race is live, matching the server.
    pub fn apply_local_input(&mut self, input: &InputState, dt: f32) {
        if !self.racing {
            return;
        }
        if input.reset {
            self.local = CarState::at_spawn(&self.track);
            return;
        }
        self.local.integrate(input, &self.tuning, &self.track, dt);
    }

    /// Folds an authoritative snapshot into the local view.
    ///
    /// Returns false when the snapshot acknowledges nothing new and was
    /// ignored.
    pub fn apply_server_state(&mut self, state: &StatePayload) -> bool {
        if state.last_processed_input_sequence <= self.last_ack {
            debug!(
                "Ignoring stale snapshot (ack {} <= {})",
                state.last_processed_input_sequence, self.last_ack
            );
            return false;
        }
        self.last_ack = state.last_processed_input_sequence;
        self.server_tick = state.tick;
        self.race_finished = state.race_finished;
        self.winner = state.winner.clone();

        for snapshot in &state.players {
            if Some(snapshot.id) == self.session_id {
                self.reconcile_local(snapshot);
            } else {
                self.remotes
                    .entry(snapshot.id)
                    .and_modify(|remote| remote.retarget(snapshot))
                    .or_insert_with(|| RemoteCar::spawn(snapshot));
            }
        }

        self.remotes
            .retain(|id, _| state.players.iter().any(|p| p.id == *id));
        true
    }

    fn reconcile_local(&mut self, snapshot: &PlayerSnapshot) {
        self.lap_count = snapshot.lap_count;
        self.next_checkpoint = snapshot.next_checkpoint;

        let server = car_from_snapshot(snapshot);
        let divergence = self.local.position.distance_squared(&server.position);
        if divergence <= RECONCILE_DISTANCE_SQ {
            return;
        }

        debug!("Reconciling local car, squared divergence {:.1}", divergence);
        self.local.position = self.local.position.lerp(&server.position, RECONCILE_BLEND);
        self.local.heading += angle_delta(self.local.heading, server.heading) * RECONCILE_BLEND;
        self.local.speed += (server.speed - self.local.speed) * RECONCILE_BLEND;
    }

    /// Eases every remote car toward its latest snapshot. Called once per
    /// client tick.
    pub fn update_remotes(&mut self) {
        for remote in self.remotes.values_mut() {
            remote.ease();
        }
    }
}
