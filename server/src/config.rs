use race_shared::{DEFAULT_LAPS_TO_WIN, DEFAULT_ROOM_CAPACITY, DEFAULT_SYNC_RATE, TICK_RATE};

use crate::error::ConfigError;

/// Runtime settings of a race server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum concurrent connections, 0 for unbounded.
    pub max_connections: usize,
    /// State snapshots per second.
    pub sync_rate: u32,
    pub room_capacity: usize,
    pub laps_to_win: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_connections: 0,
            sync_rate: DEFAULT_SYNC_RATE,
            room_capacity: DEFAULT_ROOM_CAPACITY,
            laps_to_win: DEFAULT_LAPS_TO_WIN,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_rate == 0 || self.sync_rate > TICK_RATE {
            return Err(ConfigError::SyncRate {
                got: self.sync_rate,
                max: TICK_RATE,
            });
        }
        if self.room_capacity == 0 {
            return Err(ConfigError::RoomCapacity);
        }
        if self.laps_to_win == 0 {
            return Err(ConfigError::LapsToWin);
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Number of ticks between two state snapshots, at least 1.
    pub fn sync_interval_ticks(&self) -> u64 {
        let rate = self.sync_rate.max(1) as f64;
        ((TICK_RATE as f64 / rate).round() as u64).max(1)
    }
}
