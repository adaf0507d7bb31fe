//! Types and rules shared by the race server and its clients.
//!
//! The server owns the authoritative simulation; clients run the same
//! kinematics for their local echo, so everything that must agree between
//! the two (wire protocol, tuning constants, car integration, track
//! geometry) lives here.

pub mod physics;
pub mod protocol;
pub mod track;

use serde::{Deserialize, Serialize};

/// Authoritative simulation rate in Hz.
pub const TICK_RATE: u32 = 60;
/// Default state sync rate in Hz.
pub const DEFAULT_SYNC_RATE: u32 = 20;
pub const DEFAULT_ROOM_CAPACITY: usize = 2;
pub const DEFAULT_LAPS_TO_WIN: u32 = 5;
/// Seconds counted down between `race:start` and `race:started`.
pub const COUNTDOWN_SECONDS: u32 = 3;

/// Fixed timestep of one tick in seconds.
pub fn fixed_dt() -> f32 {
    1.0 / TICK_RATE as f32
}

/// Identity of a connected session, unique for the lifetime of the process.
pub type SessionId = u32;

/// Per-player input sequence number. `-1` means nothing processed yet.
pub type Sequence = i64;

/// Controls held by a player during one input sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub accelerate: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
    pub handbrake: bool,
    pub reset: bool,
}

impl InputState {
    /// Returns the steering direction: -1 for left, 1 for right, 0 for none or both.
    pub fn steering(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}
