use clap::Parser;
use log::info;
use server::config::EngineConfig;
use server::dispatch::LogDispatcher;
use server::registry::ConnectionRegistry;
use server::service::GameService;
use server::store::{MatchStore, MemoryBackend, UserDirectory, UserProfile};
use shared::{ClientCommand, ConnectionId, GameMode, UserId};
use std::sync::Arc;
use std::time::Duration;

/// Runs one complete custom match between two seeded users and prints the
/// persisted result. Useful for smoke-testing the engine without a
/// transport gateway in front of it.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Simulation tick interval in milliseconds
    #[clap(long, default_value = "20")]
    tick_ms: u64,
    /// Countdown before the first tick in milliseconds
    #[clap(long, default_value = "3000")]
    countdown_ms: u64,
    /// Score required to win
    #[clap(long, default_value = "5")]
    win_score: u8,
    /// Wall rule for the demo match
    #[clap(long, value_enum, default_value = "classic")]
    mode: WallMode,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum WallMode {
    Classic,
    Wrap,
}

impl From<WallMode> for GameMode {
    fn from(mode: WallMode) -> Self {
        match mode {
            WallMode::Classic => GameMode::Classic,
            WallMode::Wrap => GameMode::Wrap,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = EngineConfig {
        tick_interval: Duration::from_millis(args.tick_ms),
        countdown: Duration::from_millis(args.countdown_ms),
        win_score: args.win_score,
        ..EngineConfig::default()
    };

    let backend = Arc::new(MemoryBackend::new());
    backend.insert_user(UserProfile::new(UserId(1), "alice", 1000));
    backend.insert_user(UserProfile::new(UserId(2), "bob", 1000));

    let registry = Arc::new(ConnectionRegistry::new());
    let service = GameService::new(
        config,
        registry,
        Arc::new(LogDispatcher),
        backend.clone() as Arc<dyn UserDirectory>,
        backend.clone() as Arc<dyn MatchStore>,
    );
    let matchmaking = service.spawn_matchmaking();

    service.on_connect(ConnectionId(1), UserId(1)).await;
    service.on_connect(ConnectionId(2), UserId(2)).await;

    let room = match service
        .handle_command(
            ConnectionId(1),
            ClientCommand::RoomCreate {
                title: "demo match".to_string(),
                password: None,
            },
        )
        .await?
    {
        server::service::CommandReply::Room(room) => room,
        other => return Err(format!("unexpected reply: {:?}", other).into()),
    };
    service
        .handle_command(
            ConnectionId(2),
            ClientCommand::RoomJoin {
                room_id: room.room_id,
                password: None,
            },
        )
        .await?;
    service
        .handle_command(
            ConnectionId(1),
            ClientCommand::RoomStart {
                room_id: room.room_id,
                mode: args.mode.into(),
            },
        )
        .await?;
    info!("demo match started, waiting for it to finish");

    while service.engine().active_sessions().await > 0 {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    // Let the fire-and-forget persistence land.
    tokio::time::sleep(Duration::from_millis(100)).await;
    matchmaking.abort();

    for user in [UserId(1), UserId(2)] {
        let profile = backend.find_user(user)?;
        println!(
            "{}: rating {} ({}W/{}L)",
            profile.nickname, profile.rating, profile.wins, profile.losses
        );
    }
    for record in backend.matches_for(UserId(1))? {
        println!(
            "session {}: user {} beat user {} {}-{}",
            record.outcome.session_id,
            record.outcome.winner,
            record.outcome.loser,
            record.outcome.winner_score,
            record.outcome.loser_score
        );
    }
    Ok(())
}
