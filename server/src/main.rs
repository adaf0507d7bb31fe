use clap::Parser;
use log::{error, info};
use race_server::config::ServerConfig;
use race_server::network::Server;
use race_shared::{DEFAULT_LAPS_TO_WIN, DEFAULT_ROOM_CAPACITY, DEFAULT_SYNC_RATE};

/// Main-method of the application.
/// Parses command-line arguments, binds the listener and runs the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, env = "RACE_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, env = "RACE_PORT", default_value = "8080")]
        port: u16,
        /// Maximum concurrent connections (0 for unlimited)
        #[clap(short, long, env = "RACE_MAX_CONNECTIONS", default_value = "0")]
        max_connections: usize,
        /// State snapshots per second
        #[clap(short, long, env = "RACE_SYNC_RATE", default_value_t = DEFAULT_SYNC_RATE)]
        sync_rate: u32,
        /// Players per track room
        #[clap(long, env = "RACE_ROOM_CAPACITY", default_value_t = DEFAULT_ROOM_CAPACITY)]
        room_capacity: usize,
        /// Laps needed to win a race
        #[clap(long, env = "RACE_LAPS_TO_WIN", default_value_t = DEFAULT_LAPS_TO_WIN)]
        laps_to_win: u32,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        max_connections: args.max_connections,
        sync_rate: args.sync_rate,
        room_capacity: args.room_capacity,
        laps_to_win: args.laps_to_win,
    };

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    info!(
        "Starting race server on {} ({} Hz sync, {} per room, {} laps)",
        config.address(),
        config.sync_rate,
        config.room_capacity,
        config.laps_to_win
    );

    let server = Server::bind(config).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
