use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use seabattle::{
    standard_fleet, AttackOutcome, Coordinates, Parameters, Phase, SessionEvent, SessionHandle,
    SessionLink, Side, DEFAULT_HEIGHT, DEFAULT_PORT, DEFAULT_WIDTH,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a game and wait for a guest to connect.
    Host {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u16,
        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: u16,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Join a game hosted at the given address.
    Join {
        #[arg(long, default_value = "127.0.0.1:49152")]
        connect: String,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    seabattle::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Host {
            port,
            width,
            height,
            seed,
        } => {
            println!("Hosting a {}x{} game on port {}...", width, height, port);
            let params = Parameters {
                width,
                height,
                fleet: standard_fleet(),
            };
            let link = seabattle::host(port, params).await?;
            println!("Waiting for a guest to connect...");
            play(link, make_rng(seed)).await
        }
        Commands::Join { connect, seed } => {
            println!("Joining the game at {}...", connect);
            let link = seabattle::join(connect.as_str()).await?;
            play(link, make_rng(seed)).await
        }
    }
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => {
            println!("Using fixed seed: {} (game will be reproducible)", s);
            SmallRng::seed_from_u64(s)
        }
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

/// Drive the session to completion: place the fleet randomly, then answer
/// every turn with a random attack on a cell not tried before.
async fn play(mut link: SessionLink, mut rng: SmallRng) -> anyhow::Result<()> {
    if link.handle.phase() == Phase::Positioning {
        link.handle
            .place_fleet_randomly(&mut rng)
            .map_err(|e| anyhow::anyhow!(e))?;
        println!("Fleet positioned.");
    }

    let mut candidates: Vec<Coordinates> = Vec::new();
    while let Some(event) = link.events.recv().await {
        match event {
            SessionEvent::Connected => println!("Opponent connected."),
            SessionEvent::ParametersReady(params) => {
                println!(
                    "Parameters received: {}x{} grid, {} boats.",
                    params.width,
                    params.height,
                    params.fleet.len()
                );
                link.handle
                    .place_fleet_randomly(&mut rng)
                    .map_err(|e| anyhow::anyhow!(e))?;
                println!("Fleet positioned.");
            }
            SessionEvent::PositioningComplete { first_turn } => {
                let params = link
                    .handle
                    .parameters()
                    .ok_or_else(|| anyhow::anyhow!("parameters missing"))?;
                candidates = (0..params.height)
                    .flat_map(|y| (0..params.width).map(move |x| Coordinates::new(x, y)))
                    .collect();
                candidates.shuffle(&mut rng);
                println!("Both fleets ready, the game begins.");
                if first_turn == Side::Local {
                    fire(&link.handle, &mut candidates)?;
                }
            }
            SessionEvent::AttackResult { target, outcome } => {
                println!("Attack on {}: {}.", target, describe(outcome));
            }
            SessionEvent::OpponentAttacked { target, outcome } => {
                println!("Opponent attacked {}: {}.", target, describe(outcome));
                if link.handle.phase() == Phase::InProgress {
                    fire(&link.handle, &mut candidates)?;
                }
            }
            SessionEvent::GameFinished { winner } => {
                match winner {
                    Side::Local => println!("Victory! The enemy fleet is destroyed."),
                    Side::Peer => println!("Defeat. Your fleet is destroyed."),
                }
                break;
            }
            SessionEvent::Aborted(error) => return Err(anyhow::anyhow!(error)),
        }
    }

    link.task.await??;
    Ok(())
}

fn fire(handle: &SessionHandle, candidates: &mut Vec<Coordinates>) -> anyhow::Result<()> {
    let target = candidates
        .pop()
        .ok_or_else(|| anyhow::anyhow!("no cells left to attack"))?;
    handle.attack(target).map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

fn describe(outcome: AttackOutcome) -> String {
    match outcome {
        AttackOutcome::Miss => "miss".to_string(),
        AttackOutcome::Hit => "hit".to_string(),
        AttackOutcome::Sunk(kind) => format!("hit and sunk ({})", kind.name()),
    }
}
