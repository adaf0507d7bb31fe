use clap::{Parser, ValueEnum};
use log::info;
use race_client::network::{Client, ClientOptions, RoomRequest};
use race_shared::InputState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Steer {
    None,
    Left,
    Right,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL to connect to
    #[arg(short = 's', long, env = "RACE_SERVER_URL", default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Browser name announced to the server; the display name is derived from it
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Create a track room, optionally with a fixed id
    #[arg(long, num_args = 0..=1, conflicts_with = "join")]
    create: Option<Option<String>>,

    /// Join an existing track room
    #[arg(long)]
    join: Option<String>,

    /// Start the race as host once the room is full
    #[arg(long)]
    start: bool,

    /// Hold the accelerator every tick
    #[arg(long)]
    throttle: bool,

    /// Hold a steering direction every tick
    #[arg(long, value_enum, default_value = "none")]
    steer: Steer,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let room = match (args.create, args.join) {
        (Some(track_id), _) => RoomRequest::Create(track_id),
        (None, Some(track_id)) => RoomRequest::Join(track_id),
        (None, None) => RoomRequest::Stay,
    };

    let controls = InputState {
        accelerate: args.throttle,
        left: args.steer == Steer::Left,
        right: args.steer == Steer::Right,
        ..Default::default()
    };

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Room: {:?}, controls: {:?}", room, controls);

    let mut client = Client::new(ClientOptions {
        server_url: args.server,
        browser_name: args.name,
        room,
        auto_start: args.start,
        controls,
    });

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    Ok(())
}
