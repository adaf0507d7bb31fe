//! # Race Client Library
//!
//! This library provides the client side of the multiplayer racing protocol:
//! input sequencing, a local echo of the player's car, reconciliation against
//! the server's snapshots and a reconnecting WebSocket transport.
//!
//! ## Architecture Overview
//!
//! The server is authoritative. The client never decides laps or winners; it
//! only makes its own car feel responsive while waiting for the server.
//!
//! ### Local Echo
//! Every client tick the held controls are applied to a local copy of the car
//! using the shared kinematics, and the same input is sent to the server with
//! a strictly increasing sequence number. A failed send leaves the sequence
//! counter where it was so the stream never has gaps.
//!
//! ### Reconciliation
//! Each snapshot carries the last input sequence the server consumed for this
//! player. Snapshots that acknowledge nothing new are ignored. Otherwise, if
//! the local car has drifted too far from the server's, it is blended a fifth
//! of the way back per snapshot instead of snapping.
//!
//! ### Remote Cars
//! Other players' cars are eased toward their latest snapshot every tick and
//! removed when a snapshot no longer lists them.
//!
//! ### Reconnection
//! A dropped connection is retried with exponential backoff, starting at one
//! second and doubling up to eight. A new session resets the acknowledgement
//! watermark.
//!
//! ## Module Organization
//!
//! - `error`: transport errors
//! - `game`: local echo, reconciliation and remote cars
//! - `input`: held controls and sequence numbering
//! - `network`: connection loop and server message handling
//! - `reconnect`: backoff timing
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use race_client::network::{Client, ClientOptions, RoomRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ClientOptions {
//!         room: RoomRequest::Join("track-1".to_string()),
//!         ..Default::default()
//!     });
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod reconnect;
