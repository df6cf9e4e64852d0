mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::facility::{AllocateArgs, AvailabilityArgs};
use commands::portfolio::PortfolioArgs;
use commands::prorate::ProrateArgs;

/// Pro-rata allocation of loan facilities across fund vehicles
#[derive(Parser)]
#[command(
    name = "prorata",
    version,
    about = "Pro-rata allocation of loan facilities across fund vehicles",
    long_about = "Splits Term Loan, Revolver and DDTL facilities across fund vehicles \
                  in proportion to availability (cash + unfunded commitments + uncalled \
                  capital), and distributes portfolio value across asset classes by \
                  target weight with cap/floor rules."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug detail to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Availability per vehicle
    Availability(AvailabilityArgs),
    /// Allocate deal facilities across vehicles
    Allocate(AllocateArgs),
    /// Prorate a single total across named weights
    Prorate(ProrateArgs),
    /// Weight-based portfolio allocation with cap/floor rules
    Portfolio(PortfolioArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Availability(args) => commands::facility::run_availability(args),
        Commands::Allocate(args) => commands::facility::run_allocate(args),
        Commands::Prorate(args) => commands::prorate::run_prorate(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Version => {
            println!("prorata {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
