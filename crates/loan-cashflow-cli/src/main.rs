mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::loan::{LoanArgs, ScheduleArgs};
use commands::portfolio::{PortfolioArgs, SweepArgs};

/// Loan and portfolio cash flow projections
#[derive(Parser)]
#[command(
    name = "lcf",
    version,
    about = "Loan and portfolio cash flow projections",
    long_about = "Projects monthly cash flows for amortising loans (fixed instalment, \
                  vector or bullet) under CPR/CDR/recovery assumptions, aggregates \
                  them across a pool and reports weighted average life."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Project one loan under a scenario
    Loan(LoanArgs),
    /// Scheduled cash flows of one loan (no defaults, no prepayments)
    Schedule(ScheduleArgs),
    /// Project and aggregate a pool of loans
    Portfolio(PortfolioArgs),
    /// Sweep one scenario parameter across a pool
    Sweep(SweepArgs),
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

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Loan(args) => commands::loan::run_loan(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Sweep(args) => commands::portfolio::run_sweep(args),
        Commands::Version => {
            println!("lcf {}", env!("CARGO_PKG_VERSION"));
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
