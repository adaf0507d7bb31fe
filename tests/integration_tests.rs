//! Integration tests for the race server and client
//!
//! These tests drive the server core through JSON frames exactly as a socket
//! would, and run one real WebSocket round trip.

use race_client::game::ClientGameState;
use race_server::config::ServerConfig;
use race_server::hub::{Outgoing, RaceHub};
use race_server::race::RacePhase;
use race_server::session::ConnectionId;
use race_shared::protocol::{ServerMessage, Winner};
use race_shared::track::TrackGeometry;

fn messages_for(outbox: &[Outgoing], connection: ConnectionId) -> Vec<ServerMessage> {
    outbox
        .iter()
        .filter(|o| o.connection == connection)
        .map(|o| o.message.clone())
        .collect()
}

fn input_frame(sequence: i64, accelerate: bool) -> String {
    format!(
        r#"{{"type":"input","sequence":{},"payload":{{"accelerate":{},"brake":false,"left":false,"right":false,"handbrake":false,"reset":false}}}}"#,
        sequence, accelerate
    )
}

/// RACE LIFECYCLE TESTS
mod race_tests {
    use super::*;

    fn two_player_hub(laps_to_win: u32) -> RaceHub {
        let mut hub = RaceHub::new(ServerConfig {
            room_capacity: 2,
            laps_to_win,
            ..Default::default()
        });
        hub.connect(1);
        hub.connect(2);
        hub.handle_frame(1, r#"{"type":"track:create","payload":{"trackId":"r1"}}"#);
        hub.handle_frame(2, r#"{"type":"track:join","payload":{"trackId":"r1"}}"#);
        hub.drain_outbox();
        hub
    }

    /// Moves session 1's car onto a checkpoint for a tick and back off it.
    fn cross_checkpoint(hub: &mut RaceHub, index: usize) -> Vec<Outgoing> {
        let track = TrackGeometry::default_circuit();
        let mut outbox = Vec::new();

        for position in [track.checkpoints[index].center(), track.spawn] {
            let race = hub.race_mut("r1").unwrap();
            let player = race.simulation_mut().player_mut(1).unwrap();
            player.car.position = position;
            player.car.speed = 0.0;
            hub.tick();
            outbox.extend(hub.drain_outbox());
        }
        outbox
    }

    #[test]
    fn full_race_from_countdown_to_restart() {
        let mut hub = two_player_hub(2);

        hub.handle_frame(1, r#"{"type":"race:start"}"#);
        let mut events: Vec<ServerMessage> = messages_for(&hub.drain_outbox(), 2);

        for _ in 0..180 {
            hub.tick();
            events.extend(
                messages_for(&hub.drain_outbox(), 2)
                    .into_iter()
                    .filter(|m| !matches!(m, ServerMessage::State(_))),
            );
        }

        let countdown: Vec<String> = events
            .iter()
            .map(|m| match m {
                ServerMessage::RaceCountdown(c) => c.seconds_left.to_string(),
                ServerMessage::RaceStarted => "go".to_string(),
                other => panic!("Unexpected message: {:?}", other),
            })
            .collect();
        assert_eq!(countdown, vec!["3", "2", "1", "go"]);
        assert_eq!(hub.phase_of(1), Some(RacePhase::Racing));

        let mut finished = Vec::new();
        for _ in 0..2 {
            for index in [1, 2, 3, 0] {
                for outgoing in cross_checkpoint(&mut hub, index) {
                    if let ServerMessage::RaceFinished(result) = outgoing.message {
                        finished.push((outgoing.connection, result.winner));
                    }
                }
            }
        }

        let winner = Some(Winner {
            id: 1,
            name: "Racer-1".to_string(),
        });
        assert_eq!(finished.len(), 2);
        assert!(finished.contains(&(1, winner.clone())));
        assert!(finished.contains(&(2, winner.clone())));
        assert_eq!(hub.phase_of(1), Some(RacePhase::Finished));

        // Cars stay frozen after the finish even with throttle held.
        hub.handle_frame(1, &input_frame(0, true));
        let before = hub.race("r1").unwrap().simulation().player(1).unwrap().car;
        for _ in 0..30 {
            hub.tick();
        }
        let after = hub.race("r1").unwrap().simulation().player(1).unwrap().car;
        assert_eq!(before, after);

        let snapshots: Vec<_> = messages_for(&hub.drain_outbox(), 1)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::State(state) => Some(state),
                _ => None,
            })
            .collect();
        assert!(!snapshots.is_empty());
        for state in &snapshots {
            assert!(state.race_finished);
            assert_eq!(state.winner, winner);
            assert_eq!(state.last_processed_input_sequence, 0);
        }

        // Only the host can restart.
        hub.handle_frame(2, r#"{"type":"race:restart"}"#);
        assert_eq!(hub.phase_of(1), Some(RacePhase::Finished));

        hub.handle_frame(1, r#"{"type":"race:restart"}"#);
        assert_eq!(hub.phase_of(1), Some(RacePhase::Lobby));
        let outbox = hub.drain_outbox();
        assert!(messages_for(&outbox, 2)
            .iter()
            .any(|m| matches!(m, ServerMessage::TrackState(_))));
        let player = hub.race("r1").unwrap().simulation().player(1).unwrap();
        assert_eq!(player.lap_count, 0);
        assert_eq!(player.last_processed_input, -1);
        assert!(!hub.race("r1").unwrap().simulation().result().finished);
    }

    #[test]
    fn no_lap_credit_before_the_race_starts() {
        let mut hub = two_player_hub(1);

        for index in [1, 2, 3, 0] {
            cross_checkpoint(&mut hub, index);
        }

        let player = hub.race("r1").unwrap().simulation().player(1).unwrap();
        assert_eq!(player.lap_count, 0);
        assert_eq!(player.next_checkpoint, 1);
        assert!(!hub.race("r1").unwrap().simulation().result().finished);
    }

    #[test]
    fn host_leaving_mid_countdown_passes_host_and_keeps_counting() {
        let mut hub = two_player_hub(2);
        hub.handle_frame(1, r#"{"type":"race:start"}"#);
        hub.disconnect(1);

        let room = hub.lobby().room("r1").unwrap();
        assert_eq!(room.host_id, 2);

        for _ in 0..180 {
            hub.tick();
        }
        assert_eq!(hub.phase_of(2), Some(RacePhase::Racing));
    }
}

/// INPUT RECONCILIATION TESTS
mod input_tests {
    use super::*;

    fn solo_hub() -> RaceHub {
        let mut hub = RaceHub::new(ServerConfig::default());
        hub.connect(1);
        hub.handle_frame(1, r#"{"type":"track:create","payload":{"trackId":"solo"}}"#);
        hub.drain_outbox();
        hub
    }

    #[test]
    fn out_of_order_inputs_apply_in_sequence() {
        let mut hub = solo_hub();
        for sequence in [5, 3, 4] {
            hub.handle_frame(1, &input_frame(sequence, false));
        }

        let mut applied = Vec::new();
        for _ in 0..3 {
            hub.tick();
            applied.push(hub.race("solo").unwrap().simulation().last_processed_input(1));
        }
        assert_eq!(applied, vec![3, 4, 5]);

        // The first snapshot goes out on the third tick, after all three.
        let snapshots: Vec<_> = messages_for(&hub.drain_outbox(), 1)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::State(state) => Some(state.last_processed_input_sequence),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots, vec![5]);
    }

    #[test]
    fn acknowledgements_never_move_backwards() {
        let mut hub = solo_hub();
        let arrivals = [3, 1, 1, 2, 9, 4, 2, 10, 7, 8, 8, 11, 0, 12];

        let mut acks = Vec::new();
        for sequence in arrivals {
            hub.handle_frame(1, &input_frame(sequence, false));
            hub.tick();
            acks.push(hub.race("solo").unwrap().simulation().last_processed_input(1));
        }
        for _ in 0..20 {
            hub.tick();
            acks.push(hub.race("solo").unwrap().simulation().last_processed_input(1));
        }

        assert!(acks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*acks.last().unwrap(), 12);
    }
}

/// LOBBY TESTS
mod lobby_tests {
    use super::*;

    #[test]
    fn full_room_always_rejects() {
        let mut hub = RaceHub::new(ServerConfig {
            room_capacity: 2,
            ..Default::default()
        });
        for connection in 1..=5 {
            hub.connect(connection);
        }
        hub.handle_frame(1, r#"{"type":"track:create","payload":{"trackId":"r1"}}"#);
        hub.drain_outbox();

        for connection in 2..=5 {
            hub.handle_frame(connection, r#"{"type":"track:join","payload":{"trackId":"r1"}}"#);
        }
        let outbox = hub.drain_outbox();

        for connection in 3..=5 {
            assert!(messages_for(&outbox, connection)
                .contains(&ServerMessage::error("Track r1 is full")));
        }
        assert_eq!(hub.lobby().room("r1").unwrap().members.len(), 2);
    }

    #[test]
    fn host_passes_to_earliest_remaining_member() {
        let mut hub = RaceHub::new(ServerConfig {
            room_capacity: 4,
            ..Default::default()
        });
        for connection in 1..=4 {
            hub.connect(connection);
        }
        hub.handle_frame(1, r#"{"type":"track:create","payload":{"trackId":"r1"}}"#);
        for connection in [3, 2, 4] {
            hub.handle_frame(connection, r#"{"type":"track:join","payload":{"trackId":"r1"}}"#);
        }

        hub.handle_frame(1, r#"{"type":"track:leave"}"#);
        assert_eq!(hub.lobby().room("r1").unwrap().host_id, 3);

        hub.disconnect(3);
        assert_eq!(hub.lobby().room("r1").unwrap().host_id, 2);

        hub.disconnect(2);
        hub.disconnect(4);
        assert!(hub.lobby().room("r1").is_none());
    }

    #[test]
    fn lobby_state_lists_users_and_tracks() {
        let mut hub = RaceHub::new(ServerConfig::default());
        hub.connect(1);
        hub.connect(2);
        hub.handle_frame(2, r#"{"type":"track:create"}"#);

        let lobby = messages_for(&hub.drain_outbox(), 1)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::LobbyState(lobby) => Some(lobby),
                _ => None,
            })
            .last()
            .unwrap();

        assert_eq!(lobby.users.len(), 2);
        assert_eq!(lobby.tracks.len(), 1);
        assert_eq!(lobby.tracks[0].host_id, 2);
    }
}

/// WEBSOCKET TESTS
mod websocket_tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use futures_util::{SinkExt, Stream, StreamExt};
    use race_server::network::Server;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::{self, Message};

    async fn wait_for<S, F>(socket: &mut S, mut matches: F) -> ServerMessage
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
        F: FnMut(&ServerMessage) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let frame = socket.next().await.unwrap().unwrap();
                if let Message::Text(text) = frame {
                    let message: ServerMessage = serde_json::from_str(text.as_str()).unwrap();
                    if matches(&message) {
                        return message;
                    }
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn websocket_round_trip() {
        let server = Server::bind(ServerConfig {
            port: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(server.run());

        let (mut socket, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let ServerMessage::SessionInfo(info) =
            wait_for(&mut socket, |m| matches!(m, ServerMessage::SessionInfo(_))).await
        else {
            unreachable!()
        };
        let mut client_state = ClientGameState::new(TrackGeometry::default_circuit());
        client_state.on_session_info(info.id);

        socket
            .send(Message::text(
                r#"{"type":"track:create","payload":{"trackId":"ws"}}"#.to_string(),
            ))
            .await
            .unwrap();
        let ServerMessage::TrackState(track) =
            wait_for(&mut socket, |m| matches!(m, ServerMessage::TrackState(_))).await
        else {
            unreachable!()
        };
        assert_eq!(track.id, "ws");
        assert_eq!(track.host_id, info.id);

        socket.send(Message::text(input_frame(0, false))).await.unwrap();
        let ServerMessage::State(state) = wait_for(&mut socket, |m| {
            matches!(m, ServerMessage::State(s) if s.last_processed_input_sequence == 0)
        })
        .await
        else {
            unreachable!()
        };
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.players[0].id, info.id);

        assert!(client_state.apply_server_state(&state));
        assert!(!client_state.apply_server_state(&state));
        assert_eq!(client_state.last_ack(), 0);
        assert_approx_eq!(client_state.local.position.x, state.players[0].x);
        assert_approx_eq!(client_state.local.position.y, state.players[0].y);

        socket.send(Message::text("not json".to_string())).await.unwrap();
        socket
            .send(Message::text(r#"{"type":"track:leave"}"#.to_string()))
            .await
            .unwrap();
        let ServerMessage::LobbyState(lobby) = wait_for(&mut socket, |m| {
            matches!(m, ServerMessage::LobbyState(l) if l.tracks.is_empty())
        })
        .await
        else {
            unreachable!()
        };
        assert_eq!(lobby.users.len(), 1);

        handle.abort();
    }
}
