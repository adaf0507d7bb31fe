use log::{debug, info};
use race_shared::physics::{CarState, CarTuning};
use race_shared::protocol::PlayerSnapshot;
use race_shared::track::TrackGeometry;
use race_shared::{InputState, Sequence, SessionId};
use std::sync::Arc;

use crate::input::InputQueue;

/// Whether a car is currently inside a checkpoint rectangle. Transitions
/// fire only on `Off -> On`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointContact {
    Off,
    On,
}

/// Authoritative state of one player in a race.
#[derive(Debug, Clone)]
pub struct PlayerSimState {
    pub session_id: SessionId,
    pub car: CarState,
    pub lap_count: u32,
    pub next_checkpoint: usize,
    pub contact: CheckpointContact,
    pub lap_active: bool,
    pub last_processed_input: Sequence,
    /// Last applied input, reapplied on ticks with nothing new buffered.
    pub current_input: InputState,
    pub inputs: InputQueue,
}

impl PlayerSimState {
    pub fn new(session_id: SessionId, track: &TrackGeometry) -> Self {
        Self {
            session_id,
            car: CarState::at_spawn(track),
            lap_count: 0,
            next_checkpoint: 1,
            contact: CheckpointContact::Off,
            lap_active: false,
            last_processed_input: -1,
            current_input: InputState::default(),
            inputs: InputQueue::new(),
        }
    }

    /// Back to the spawn point with checkpoint progress re-armed. Laps and
    /// the input watermark are kept.
    fn return_to_spawn(&mut self, track: &TrackGeometry) {
        self.car = CarState::at_spawn(track);
        self.next_checkpoint = 1;
        self.contact = CheckpointContact::Off;
        self.lap_active = false;
    }

    pub fn snapshot(&self, name: String) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.session_id,
            name,
            x: self.car.position.x,
            y: self.car.position.y,
            heading: self.car.heading,
            speed: self.car.speed,
            lap_count: self.lap_count,
            next_checkpoint: self.next_checkpoint,
        }
    }
}

/// Outcome of a race. Set at most once until the simulation is restarted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaceResult {
    pub finished: bool,
    pub winner: Option<SessionId>,
}

/// The authoritative world of one track room.
#[derive(Debug, Clone)]
pub struct RaceSimulation {
    pub tick: u64,
    track: Arc<TrackGeometry>,
    tuning: CarTuning,
    laps_to_win: u32,
    /// Players in join order.
    players: Vec<PlayerSimState>,
    result: RaceResult,
    /// Physics and lap tracking only run while the race is live.
    running: bool,
}

impl RaceSimulation {
    pub fn new(track: Arc<TrackGeometry>, tuning: CarTuning, laps_to_win: u32) -> Self {
        Self {
            tick: 0,
            track,
            tuning,
            laps_to_win,
            players: Vec::new(),
            result: RaceResult::default(),
            running: false,
        }
    }

    pub fn add_player(&mut self, session_id: SessionId) {
        if self.player(session_id).is_some() {
            return;
        }
        let player = PlayerSimState::new(session_id, &self.track);
        info!(
            "Added player {} at ({}, {})",
            session_id, player.car.position.x, player.car.position.y
        );
        self.players.push(player);
    }

    pub fn remove_player(&mut self, session_id: SessionId) {
        self.players.retain(|p| p.session_id != session_id);
        info!("Removed player {}", session_id);
    }

    pub fn player(&self, session_id: SessionId) -> Option<&PlayerSimState> {
        self.players.iter().find(|p| p.session_id == session_id)
    }

    pub fn player_mut(&mut self, session_id: SessionId) -> Option<&mut PlayerSimState> {
        self.players.iter_mut().find(|p| p.session_id == session_id)
    }

    pub fn players(&self) -> &[PlayerSimState] {
        &self.players
    }

    pub fn result(&self) -> RaceResult {
        self.result
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Buffers an input for a player. Returns false for unknown players and
    /// duplicate sequences.
    pub fn queue_input(&mut self, session_id: SessionId, sequence: Sequence, input: InputState) -> bool {
        match self.player_mut(session_id) {
            Some(player) => player.inputs.queue(sequence, input),
            None => false,
        }
    }

    pub fn last_processed_input(&self, session_id: SessionId) -> Sequence {
        self.player(session_id)
            .map(|p| p.last_processed_input)
            .unwrap_or(-1)
    }

    /// Advances the world by one fixed tick.
    ///
    /// Each player consumes at most one buffered input. Outside a live race,
    /// or once the race has a result, inputs are still acknowledged but cars
    /// and laps stay frozen.
    pub fn step(&mut self, dt: f32) {
        self.tick += 1;
        let simulate = self.running && !self.result.finished;

        for index in 0..self.players.len() {
            let player = &mut self.players[index];
            if let Some((sequence, input)) = player.inputs.consume_next(player.last_processed_input) {
                player.last_processed_input = sequence;
                player.current_input = input;
            }

            if !simulate || self.result.finished {
                continue;
            }

            if player.current_input.reset {
                player.return_to_spawn(&self.track);
                player.current_input.reset = false;
            } else {
                player.car.integrate(&player.current_input, &self.tuning, &self.track, dt);
            }

            self.evaluate_checkpoints(index);
        }
    }

    fn evaluate_checkpoints(&mut self, index: usize) {
        let checkpoint_count = self.track.checkpoints.len();
        let player = &mut self.players[index];

        let occupied = match self.track.checkpoint_index_at(player.car.position) {
            Some(occupied) => occupied,
            None => {
                player.contact = CheckpointContact::Off;
                return;
            }
        };

        if player.contact == CheckpointContact::On {
            return;
        }
        player.contact = CheckpointContact::On;

        if occupied != player.next_checkpoint {
            return;
        }

        if occupied == 0 && player.lap_active {
            player.lap_count += 1;
            player.lap_active = false;
            player.next_checkpoint = 1;
            info!("Player {} completed lap {}", player.session_id, player.lap_count);

            if !self.result.finished && player.lap_count >= self.laps_to_win {
                self.result = RaceResult {
                    finished: true,
                    winner: Some(player.session_id),
                };
                info!("Player {} won the race", player.session_id);
            }
        } else {
            player.next_checkpoint = (player.next_checkpoint + 1) % checkpoint_count;
            if occupied == 1 {
                player.lap_active = true;
            }
            debug!(
                "Player {} reached checkpoint {}, next {}",
                player.session_id, occupied, player.next_checkpoint
            );
        }
    }

    /// Clears the result and puts every player back at spawn with a fresh
    /// input stream.
    pub fn restart(&mut self) {
        self.result = RaceResult::default();
        self.running = false;
        for player in &mut self.players {
            *player = PlayerSimState::new(player.session_id, &self.track);
        }
        info!("Race simulation reset with {} players", self.players.len());
    }
}
