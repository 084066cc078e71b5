pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "farecast",
    about = "Farecast operator CLI",
    long_about = "Operate the fare advisory engine: migrations, one-off predictions, historical collection runs, and backtests.",
    after_help = "Examples:\n  farecast migrate\n  farecast predict --origin LHR --destination JFK --departure 2026-07-10\n  farecast collect --routes LHR-JFK,SIN-SYD --from 2026-01-01 --to 2026-03-31\n  farecast backtest --days 90"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Produce a buy-now / wait advisory for one route and departure date")]
    Predict {
        #[arg(long, help = "Origin airport code, e.g. LHR")]
        origin: String,
        #[arg(long, help = "Destination airport code, e.g. JFK")]
        destination: String,
        #[arg(long, help = "Departure date (YYYY-MM-DD)")]
        departure: NaiveDate,
    },
    #[command(about = "Sample provider fares across a date range into the historical series")]
    Collect {
        #[arg(
            long,
            value_delimiter = ',',
            help = "Comma-separated route list, e.g. LHR-JFK,SIN-SYD"
        )]
        routes: Vec<String>,
        #[arg(long, help = "First observation date (YYYY-MM-DD)")]
        from: NaiveDate,
        #[arg(long, help = "Last observation date (YYYY-MM-DD)")]
        to: NaiveDate,
    },
    #[command(about = "Replay the model against recorded history and cache validation statistics")]
    Backtest {
        #[arg(long, default_value_t = 90, help = "Trailing test window in days")]
        days: i64,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Predict { origin, destination, departure } => {
            commands::predict::run(&origin, &destination, departure)
        }
        Command::Collect { routes, from, to } => commands::collect::run(&routes, from, to),
        Command::Backtest { days } => commands::backtest::run(days),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
