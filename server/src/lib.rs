//! # Race Server Library
//!
//! This library provides the authoritative server for the multiplayer top-down
//! racing game. It owns every car, lap counter and race result, consumes client
//! inputs in sequence order, and streams per-player snapshots back so clients
//! can reconcile their locally predicted car.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Each track room runs its own fixed-step simulation at 60 Hz. Car physics
//! comes from the shared crate, so the client's local echo integrates with
//! exactly the same rules as the server.
//!
//! ### Sessions and Lobby
//! Handles the complete lifecycle of a connection:
//! - Session assignment and display names
//! - Creating, joining and leaving track rooms
//! - Host succession when the host leaves
//! - Cleanup of empty rooms on disconnect
//!
//! ### Race Lifecycle
//! A room moves from lobby to a three second countdown, then racing, then
//! finished. Only the host can start or restart a race.
//!
//! ### State Broadcasting
//! At the configured sync rate every room member receives a snapshot of all
//! cars in that room, tagged with the last input sequence the server consumed
//! for that member.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Core
//! All game state lives in [`hub::RaceHub`], a plain synchronous struct. The
//! network layer feeds it connection events and decoded frames and calls
//! [`hub::RaceHub::tick`] once per fixed tick; the hub answers through an
//! outbox addressed by connection id. Countdown timers run on a logical clock
//! ([`scheduler::Scheduler`]) that advances with the tick, so the whole core is
//! testable without sockets or wall-clock time.
//!
//! ### WebSocket Transport
//! Clients speak JSON text frames over WebSocket. Each socket gets a reader
//! task and a writer task; sends are fire-and-forget and a closed socket
//! surfaces as a disconnect event.
//!
//! ## Module Organization
//!
//! - `config`: server settings and validation
//! - `error`: lobby and configuration errors
//! - `game`: per-room race simulation and lap tracking
//! - `hub`: message routing, broadcasts and state sync
//! - `input`: per-player ordered input queue
//! - `lobby`: track rooms, membership and host assignment
//! - `network`: WebSocket listener and the main loop
//! - `race`: countdown and race phase controller
//! - `scheduler`: tick-driven timers
//! - `session`: connection to session mapping
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use race_server::config::ServerConfig;
//! use race_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!
//!     // Accepts connections, ticks every room at 60 Hz and broadcasts
//!     // snapshots until the process is stopped.
//!     if let Err(e) = server.run().await {
//!         eprintln!("Server stopped: {}", e);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod hub;
pub mod input;
pub mod lobby;
pub mod network;
pub mod race;
pub mod scheduler;
pub mod session;
