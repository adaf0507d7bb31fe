//! Race lifecycle of one track room: lobby, countdown, racing, finished.

use log::{debug, info};
use race_shared::{SessionId, COUNTDOWN_SECONDS, TICK_RATE};

use crate::game::RaceSimulation;
use crate::lobby::RoomId;
use crate::scheduler::{Scheduler, TimerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    Lobby,
    Countdown { seconds_left: u32 },
    Racing,
    Finished,
}

/// Timer events the hub's scheduler delivers back to controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceTimer {
    CountdownElapsed { room_id: RoomId },
}

/// Lifecycle events to announce to a room's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEvent {
    Countdown { seconds_left: u32 },
    Started,
    Finished { winner: Option<SessionId> },
    Reset,
}

#[derive(Debug)]
pub struct RaceController {
    room_id: RoomId,
    phase: RacePhase,
    countdown_timer: Option<TimerHandle>,
    simulation: RaceSimulation,
}

impl RaceController {
    pub fn new(room_id: RoomId, simulation: RaceSimulation) -> Self {
        Self {
            room_id,
            phase: RacePhase::Lobby,
            countdown_timer: None,
            simulation,
        }
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn simulation(&self) -> &RaceSimulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut RaceSimulation {
        &mut self.simulation
    }

    /// Starts the countdown. Ignored unless the requester is host and the
    /// room is idle in the lobby.
    pub fn request_start(
        &mut self,
        is_host: bool,
        scheduler: &mut Scheduler<RaceTimer>,
    ) -> Option<RaceEvent> {
        if !is_host || self.phase != RacePhase::Lobby {
            debug!(
                "Ignoring start on track {} (host: {}, phase: {:?})",
                self.room_id, is_host, self.phase
            );
            return None;
        }

        info!("Countdown started on track {}", self.room_id);
        self.phase = RacePhase::Countdown {
            seconds_left: COUNTDOWN_SECONDS,
        };
        self.arm_countdown(scheduler);
        Some(RaceEvent::Countdown {
            seconds_left: COUNTDOWN_SECONDS,
        })
    }

    /// Handles one elapsed countdown second.
    pub fn on_countdown_elapsed(&mut self, scheduler: &mut Scheduler<RaceTimer>) -> Option<RaceEvent> {
        self.countdown_timer = None;

        let seconds_left = match self.phase {
            RacePhase::Countdown { seconds_left } => seconds_left.saturating_sub(1),
            _ => return None,
        };

        if seconds_left == 0 {
            self.phase = RacePhase::Racing;
            self.simulation.set_running(true);
            info!("Race started on track {}", self.room_id);
            Some(RaceEvent::Started)
        } else {
            self.phase = RacePhase::Countdown { seconds_left };
            self.arm_countdown(scheduler);
            Some(RaceEvent::Countdown { seconds_left })
        }
    }

    /// Steps the simulation one tick and reports the finish if it happened
    /// during this tick.
    pub fn tick(&mut self, dt: f32) -> Option<RaceEvent> {
        self.simulation.step(dt);

        let result = self.simulation.result();
        if self.phase == RacePhase::Racing && result.finished {
            self.phase = RacePhase::Finished;
            self.simulation.set_running(false);
            info!("Race finished on track {}", self.room_id);
            return Some(RaceEvent::Finished {
                winner: result.winner,
            });
        }
        None
    }

    /// Resets the finished race back to the lobby. Host only.
    pub fn request_restart(&mut self, is_host: bool) -> Option<RaceEvent> {
        if !is_host || self.phase != RacePhase::Finished {
            debug!(
                "Ignoring restart on track {} (host: {}, phase: {:?})",
                self.room_id, is_host, self.phase
            );
            return None;
        }

        self.simulation.restart();
        self.phase = RacePhase::Lobby;
        info!("Track {} restarted", self.room_id);
        Some(RaceEvent::Reset)
    }

    /// Cancels any pending countdown. Used when the room is destroyed.
    pub fn abort(&mut self, scheduler: &mut Scheduler<RaceTimer>) {
        if let Some(handle) = self.countdown_timer.take() {
            scheduler.cancel(handle);
            debug!("Countdown on track {} cancelled", self.room_id);
        }
    }

    fn arm_countdown(&mut self, scheduler: &mut Scheduler<RaceTimer>) {
        let handle = scheduler.schedule_in(
            TICK_RATE as u64,
            RaceTimer::CountdownElapsed {
                room_id: self.room_id.clone(),
            },
        );
        self.countdown_timer = Some(handle);
    }
}
