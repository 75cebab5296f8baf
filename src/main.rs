//! Loop Racer headless runner
//!
//! Runs one autopiloted race and prints the final snapshot as JSON.

mod runner {
    use std::path::PathBuf;

    use clap::Parser;

    use loop_racer::sim::{CompetitorId, RaceState, TickInput, tick};
    use loop_racer::{LevelUnlocks, RaceConfig};

    /// Run a single autopiloted race without a window
    #[derive(Parser, Debug, Clone)]
    #[command(author, version, about, long_about = None)]
    pub struct Cli {
        /// Circuit to race on (1-10, out of range values are clamped)
        #[arg(short, long, default_value_t = 1)]
        pub level: u32,

        /// Seed for obstacle placement and opponent tuning
        #[arg(short, long, default_value_t = 12345)]
        pub seed: u64,

        /// Race config JSON (defaults when missing or malformed)
        #[arg(short, long)]
        pub config: Option<PathBuf>,

        /// Give up after this many steps (10 minutes at 60 steps/s)
        #[arg(long, default_value_t = 36_000)]
        pub max_ticks: u64,

        /// Level unlock file to update when the player wins
        #[arg(long)]
        pub unlocks: Option<PathBuf>,
    }

    pub fn run(cli: Cli) {
        let mut config = cli
            .config
            .as_deref()
            .map(RaceConfig::load)
            .unwrap_or_default();
        config.autopilot = true;

        let mut state = RaceState::new(cli.level, cli.seed, config);
        let input = TickInput::default();
        while !state.is_finished() && state.time_ticks < cli.max_ticks {
            tick(&mut state, &input);
        }

        match state.winner() {
            Some(CompetitorId::Player) => {
                log::info!("Player won level {}", state.level);
                if let Some(path) = cli.unlocks.as_deref() {
                    let mut unlocks = LevelUnlocks::load(path);
                    unlocks.record_win(state.level);
                    unlocks.save(path);
                }
            }
            Some(CompetitorId::Opponent(i)) => log::info!("Opponent {} won level {}", i, state.level),
            None => log::warn!("No winner after {} ticks", state.time_ticks),
        }

        match serde_json::to_string_pretty(&state.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Could not encode race summary: {}", e),
        }
    }

}

fn main() {
    use clap::Parser;

    env_logger::init();
    log::info!("Loop Racer (headless) starting...");
    runner::run(runner::Cli::parse());
}
