use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "drift-cli", version, about = "Drift CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a doom session today
    Doom {
        /// Duration in minutes
        minutes: u32,
        /// Activity name (e.g. "TikTok")
        activity: String,
    },
    /// Log a good session today, redeeming doom minutes
    Good {
        /// Duration in minutes
        minutes: u32,
        /// Activity name (e.g. "Gym")
        activity: String,
        /// Coins to grant (defaults to the log2 reward for the duration)
        #[arg(long)]
        coins: Option<u32>,
    },
    /// Activity type management
    Activity {
        #[command(subcommand)]
        action: commands::activity::ActivityAction,
    },
    /// Clear counters, history and daily totals (activity types are kept)
    Reset,
    /// Replace history with a synthetic 30-day month
    Simulate {
        /// RNG seed for a reproducible month
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the full state
    Show,
    /// Print today's totals
    Today,
    /// Print all-time totals
    Summary,
    /// Verify daily totals against history
    Check,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("DRIFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Doom { minutes, activity } => commands::log::doom(minutes, &activity),
        Commands::Good {
            minutes,
            activity,
            coins,
        } => commands::log::good(minutes, &activity, coins),
        Commands::Activity { action } => commands::activity::run(action),
        Commands::Reset => commands::state::reset(),
        Commands::Simulate { seed } => commands::state::simulate(seed),
        Commands::Show => commands::state::show(),
        Commands::Today => commands::state::today(),
        Commands::Summary => commands::state::summary(),
        Commands::Check => commands::state::check(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
