use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "restcue", version, about = "Work/break, eye-rest, posture and hydration reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive reminder session driven by the system clock
    Run(commands::run::RunArgs),
    /// Run a session on a simulated clock and print its events as JSON lines
    Simulate(commands::simulate::SimulateArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// List the work/break profiles
    Profiles {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Log to stderr, filtered by RESTCUE_LOG (defaults to warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RESTCUE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Profiles { json } => commands::profiles::run(json),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
