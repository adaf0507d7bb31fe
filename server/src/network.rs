//! Server network layer handling WebSocket connections and game loop coordination

use crate::config::ServerConfig;
use crate::hub::RaceHub;
use crate::session::ConnectionId;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use race_shared::TICK_RATE;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        connection: ConnectionId,
        sender: mpsc::UnboundedSender<Message>,
    },
    Frame {
        connection: ConnectionId,
        text: String,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Main server coordinating networking and the race hub
pub struct Server {
    listener: TcpListener,
    hub: RaceHub,
    tick_duration: Duration,
    /// Outgoing queue of every live socket
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,

    // Communication channels
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            hub: RaceHub::new(config),
            tick_duration: Duration::from_secs_f64(1.0 / TICK_RATE as f64),
            connections: HashMap::new(),
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop. Runs until the event channel closes.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Server {
            listener,
            mut hub,
            tick_duration,
            mut connections,
            event_tx,
            mut event_rx,
        } = self;

        spawn_acceptor(listener, event_tx);

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => handle_event(&mut hub, &mut connections, event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    hub.tick();

                    if hub.current_tick() % (TICK_RATE as u64 * 10) == 0 && !connections.is_empty() {
                        debug!(
                            "Tick {}: {} connections, {} tracks",
                            hub.current_tick(),
                            connections.len(),
                            hub.lobby().len()
                        );
                    }
                },
            }

            flush_outbox(&mut hub, &connections);
        }

        Ok(())
    }
}

fn handle_event(
    hub: &mut RaceHub,
    connections: &mut HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    event: NetworkEvent,
) {
    match event {
        NetworkEvent::Connected { connection, sender } => {
            if hub.connect(connection) {
                connections.insert(connection, sender);
            } else {
                let _ = sender.send(Message::Close(None));
            }
        }
        NetworkEvent::Frame { connection, text } => {
            hub.handle_frame(connection, &text);
        }
        NetworkEvent::Disconnected { connection } => {
            connections.remove(&connection);
            hub.disconnect(connection);
        }
    }
}

/// Sends everything the hub queued. Delivery is fire-and-forget; a closed
/// socket surfaces later as a disconnect event.
fn flush_outbox(
    hub: &mut RaceHub,
    connections: &HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
) {
    for outgoing in hub.drain_outbox() {
        let Some(sender) = connections.get(&outgoing.connection) else {
            continue;
        };
        match outgoing.message.to_json() {
            Ok(json) => {
                if sender.send(Message::text(json)).is_err() {
                    debug!("Connection {} already closed", outgoing.connection);
                }
            }
            Err(e) => error!("Failed to serialize message: {}", e),
        }
    }
}

/// Spawns task that accepts sockets and hands each one its own task
fn spawn_acceptor(listener: TcpListener, event_tx: mpsc::UnboundedSender<NetworkEvent>) {
    tokio::spawn(async move {
        let mut next_connection: ConnectionId = 1;

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let connection = next_connection;
                    next_connection += 1;
                    debug!("Accepted {} as connection {}", addr, connection);
                    tokio::spawn(handle_connection(stream, connection, event_tx.clone()));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    });
}

async fn handle_connection(
    stream: TcpStream,
    connection: ConnectionId,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) {
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("WebSocket handshake failed for connection {}: {}", connection, e);
            return;
        }
    };

    let (mut writer, mut reader) = socket.split();
    let (sender, mut outgoing) = mpsc::unbounded_channel::<Message>();

    if event_tx
        .send(NetworkEvent::Connected { connection, sender })
        .is_err()
    {
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            let closing = matches!(message, Message::Close(_));
            if writer.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = writer.close().await;
    });

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let event = NetworkEvent::Frame {
                    connection,
                    text: text.as_str().to_string(),
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} read error: {}", connection, e);
                break;
            }
        }
    }

    let _ = event_tx.send(NetworkEvent::Disconnected { connection });
    send_task.abort();
}
