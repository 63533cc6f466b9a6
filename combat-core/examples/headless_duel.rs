//! Play one fighter vs. goblin duel and print the narrative log.
//!
//! Run with: `RUST_LOG=combat_core=debug cargo run -p combat-core --example headless_duel [seed]`

use combat_core::headless::{HeadlessConfig, HeadlessDuel};
use combat_core::state::Actor;
use combat_core::testing::{sample_fighter, sample_goblin};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = HeadlessConfig::quick_start();
    if let Some(seed) = std::env::args().nth(1).and_then(|s| s.parse().ok()) {
        config = config.with_seed(seed);
    }

    let mut duel = HeadlessDuel::new(config, sample_fighter(), sample_goblin());
    let report = match duel.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Duel aborted: {e}");
            std::process::exit(1);
        }
    };

    let mut turn = 0;
    for entry in &report.log {
        if entry.turn != turn {
            turn = entry.turn;
            println!("\n--- Turn {turn} ---");
        }
        let who = match entry.actor {
            Actor::Player => "PLAYER",
            Actor::Enemy => "ENEMY ",
            Actor::System => "      ",
        };
        println!("{who} {}", entry.message);
        if let Some(taunt) = &entry.taunt {
            println!("       \"{taunt}\"");
        }
    }

    println!("\n{}", duel.state().summary());
    match report.winner {
        Some(side) => println!("{side} wins after {} rounds.", report.rounds),
        None => println!("No winner after {} rounds.", report.rounds),
    }
}
