pub mod commands;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::process::ExitCode;

use commands::availability::AvailabilityArgs;
use commands::financials::FinancialsArgs;
use commands::suggest::SuggestArgs;

#[derive(Debug, Parser)]
#[command(
    name = "toolshare",
    about = "Toolshare operator CLI",
    long_about = "Operate the Toolshare rental store: migrations, reference data, config inspection, and readiness checks.",
    after_help = "Examples:\n  toolshare doctor --json\n  toolshare financials --category ladders --tier 3\n  toolshare availability --listing L-1 --start 2024-07-01 --end 2024-07-03\n  toolshare suggest \"cordless drill\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the category catalog and platform settings (idempotent)")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, schema, and seeded reference data")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show Peace Fund tier, fee, and deductible for a category")]
    Financials {
        #[arg(long, help = "Category id, e.g. `power-tools`")]
        category: String,
        #[arg(long, help = "Tier override (1-3); must not be below the category default")]
        tier: Option<u8>,
        #[arg(long, requires = "days", help = "Daily rental price to quote")]
        daily_price: Option<Decimal>,
        #[arg(long, requires = "daily_price", help = "Number of rental days to quote")]
        days: Option<u32>,
    },
    #[command(about = "List blocked days for a listing and optionally test a date range")]
    Availability {
        #[arg(long, help = "Listing id")]
        listing: String,
        #[arg(long, requires = "end", help = "First day of the range (YYYY-MM-DD)")]
        start: Option<String>,
        #[arg(long, requires = "start", help = "Last day of the range, inclusive")]
        end: Option<String>,
    },
    #[command(about = "Run the debounced category picker over one or more listing titles")]
    Suggest {
        #[arg(
            required = true,
            num_args = 1..,
            help = "Title as typed; later values replace earlier ones"
        )]
        titles: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Financials { category, tier, daily_price, days } => {
            commands::financials::run(FinancialsArgs { category, tier, daily_price, days })
        }
        Command::Availability { listing, start, end } => {
            commands::availability::run(AvailabilityArgs { listing, start, end })
        }
        Command::Suggest { titles } => commands::suggest::run(SuggestArgs { titles }),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
