mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::bond::{BondArgs, ScheduleArgs};
use commands::cash_flows::{IrrArgs, NpvArgs};

/// Bond amortization schedules and issuer/investor yield analytics
#[derive(Parser)]
#[command(
    name = "bondcalc",
    version,
    about = "Bond amortization schedules and issuer/investor yield analytics",
    long_about = "A CLI for level-installment bond schedules with total and partial grace, \
                  computed with decimal precision. Reports issuer NPV, IRR, TCEA and \
                  convexity, investor IRR and TREA, and the price-yield curve with its \
                  duration tangent."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver and schedule details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Period-by-period amortization schedule (issuer or investor view)
    Schedule(ScheduleArgs),
    /// Issuer summary: NPV, IRR, TCEA, convexity and totals
    Summary(BondArgs),
    /// Investor NPV, IRR and TREA for a purchase at market value
    Investor(BondArgs),
    /// Price-yield curve with Macaulay/modified duration tangent
    PriceYield(BondArgs),
    /// Schedule, issuer summary, investor metrics and price-yield curve
    Analyze(BondArgs),
    /// NPV of a cash flow vector at a periodic rate
    Npv(NpvArgs),
    /// IRR of a cash flow vector (Newton-Raphson)
    Irr(IrrArgs),
    /// Print version information
    Version,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "bondcalc=debug" } else { "bondcalc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::bond::run_schedule(args),
        Commands::Summary(args) => commands::bond::run_summary(args),
        Commands::Investor(args) => commands::bond::run_investor(args),
        Commands::PriceYield(args) => commands::bond::run_price_yield(args),
        Commands::Analyze(args) => commands::bond::run_analyze(args),
        Commands::Npv(args) => commands::cash_flows::run_npv(args),
        Commands::Irr(args) => commands::cash_flows::run_irr(args),
        Commands::Version => {
            println!("bondcalc {}", env!("CARGO_PKG_VERSION"));
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
