use crate::error::ClientError;
use crate::game::ClientGameState;
use crate::input::InputManager;
use crate::reconnect::Backoff;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use race_shared::protocol::{ClientMessage, ServerMessage, SessionHello, TrackCreate, TrackJoin};
use race_shared::track::TrackGeometry;
use race_shared::{fixed_dt, InputState, TICK_RATE};
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Which room to enter once the server has assigned a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    Stay,
    Create(Option<String>),
    Join(String),
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub server_url: String,
    pub browser_name: Option<String>,
    pub room: RoomRequest,
    /// Start the race as host once the room is full.
    pub auto_start: bool,
    pub controls: InputState,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080".to_string(),
            browser_name: None,
            room: RoomRequest::Stay,
            auto_start: false,
            controls: InputState::default(),
        }
    }
}

pub struct Client {
    options: ClientOptions,
    game_state: ClientGameState,
    input_manager: InputManager,
    backoff: Backoff,
    start_requested: bool,
}

impl Client {
    pub fn new(options: ClientOptions) -> Self {
        let mut input_manager = InputManager::new();
        input_manager.hold(options.controls);

        Client {
            options,
            game_state: ClientGameState::new(TrackGeometry::default_circuit()),
            input_manager,
            backoff: Backoff::default(),
            start_requested: false,
        }
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    /// Applies one server message and returns the replies it calls for.
    pub fn handle_server_message(&mut self, message: ServerMessage) -> Vec<ClientMessage> {
        let mut replies = Vec::new();

        match message {
            ServerMessage::SessionInfo(info) => {
                info!("Connected! Session ID: {}", info.id);
                self.game_state.on_session_info(info.id);
                self.start_requested = false;

                if let Some(browser_name) = &self.options.browser_name {
                    replies.push(ClientMessage::SessionHello {
                        payload: SessionHello {
                            browser_name: browser_name.clone(),
                        },
                    });
                }
                match &self.options.room {
                    RoomRequest::Stay => {}
                    RoomRequest::Create(track_id) => replies.push(ClientMessage::TrackCreate {
                        payload: Some(TrackCreate {
                            track_id: track_id.clone(),
                        }),
                    }),
                    RoomRequest::Join(track_id) => replies.push(ClientMessage::TrackJoin {
                        payload: TrackJoin {
                            track_id: track_id.clone(),
                        },
                    }),
                }
            }
            ServerMessage::LobbyState(lobby) => {
                debug!(
                    "Lobby: {} users, {} tracks",
                    lobby.users.len(),
                    lobby.tracks.len()
                );
            }
            ServerMessage::TrackState(track) => {
                info!(
                    "Track {}: {}/{} racers, host {}",
                    track.id,
                    track.members.len(),
                    track.capacity,
                    track.host_id
                );
                let is_host = self.game_state.session_id() == Some(track.host_id);
                if self.options.auto_start
                    && is_host
                    && !self.start_requested
                    && track.members.len() >= track.capacity
                {
                    self.start_requested = true;
                    replies.push(ClientMessage::RaceStart);
                }
            }
            ServerMessage::RaceCountdown(countdown) => {
                info!("Race starts in {}...", countdown.seconds_left);
                self.game_state.reset_race();
            }
            ServerMessage::RaceStarted => {
                info!("Go!");
                self.game_state.set_racing(true);
            }
            ServerMessage::RaceFinished(finished) => {
                match finished.winner {
                    Some(winner) => info!("Race finished, winner: {}", winner.name),
                    None => info!("Race finished without a winner"),
                }
                self.game_state.set_racing(false);
            }
            ServerMessage::State(state) => {
                self.game_state.apply_server_state(&state);
            }
            ServerMessage::Error(error) => {
                warn!("Server error: {}", error.message);
            }
        }

        replies
    }

    /// Connects and reconnects forever with exponential backoff.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        loop {
            match self.run_session().await {
                Ok(()) => info!("Disconnected"),
                Err(e) => warn!("Connection lost: {}", e),
            }

            let delay = self.backoff.next_delay();
            info!("Reconnecting in {:?}", delay);
            sleep(delay).await;
        }
    }

    /// Runs one connection until it drops.
    pub async fn run_session(&mut self) -> Result<(), ClientError> {
        info!("Connecting to {}...", self.options.server_url);
        let (socket, _) = connect_async(self.options.server_url.as_str()).await?;
        self.backoff.reset();

        let (mut writer, mut reader) = socket.split();

        let mut input_interval = interval(Duration::from_secs_f64(1.0 / TICK_RATE as f64));
        input_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                frame = reader.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let message: ServerMessage = match serde_json::from_str(text.as_str()) {
                                Ok(message) => message,
                                Err(e) => {
                                    debug!("Ignoring unknown server frame: {}", e);
                                    continue;
                                }
                            };
                            for reply in self.handle_server_message(message) {
                                let json = serde_json::to_string(&reply)?;
                                writer.send(Message::text(json)).await?;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Err(ClientError::ConnectionClosed),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                },

                _ = input_interval.tick() => {
                    if self.game_state.session_id().is_none() {
                        continue;
                    }

                    let (sequence, input) = self.input_manager.capture();
                    self.game_state.apply_local_input(&input, fixed_dt());
                    self.game_state.update_remotes();

                    let json = serde_json::to_string(&ClientMessage::Input { sequence, payload: input })?;
                    writer.send(Message::text(json)).await?;
                    self.input_manager.commit();
                },
            }
        }
    }
}
