use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use bondcalc_core::time_value::{self, IrrConfig};
use bondcalc_core::{with_metadata, Money, Rate};

use crate::input;

/// Cash flow vector as read from `--input` or stdin.
#[derive(Debug, Deserialize)]
struct CashFlowInput {
    #[serde(default)]
    rate: Option<Rate>,
    cash_flows: Vec<Money>,
}

/// Arguments for NPV of an arbitrary cash flow vector
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct NpvArgs {
    /// Periodic discount rate (e.g. 0.05 for 5% per period)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Comma-separated cash flows, t = 0 first (e.g. -1000,300,400,500)
    #[arg(long, value_delimiter = ',')]
    pub cash_flows: Vec<Decimal>,

    /// Path to JSON or YAML input file with `rate` and `cash_flows`
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for IRR of an arbitrary cash flow vector
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct IrrArgs {
    /// Comma-separated cash flows, t = 0 first
    #[arg(long, value_delimiter = ',')]
    pub cash_flows: Vec<Decimal>,

    /// Starting periodic rate for Newton-Raphson
    #[arg(long, default_value = "0.1")]
    pub guess: Decimal,

    /// Iteration cap
    #[arg(long, default_value_t = 100)]
    pub max_iterations: u32,

    /// Periods per year, to report nominal and effective annual rates
    #[arg(long, default_value_t = 1)]
    pub periods_per_year: u32,

    /// Path to JSON or YAML input file with `cash_flows`
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
struct NpvOutput {
    rate: Rate,
    npv: Money,
    periods: usize,
}

#[derive(Debug, Serialize)]
struct IrrOutput {
    /// Rate per period; null when the solver did not converge
    periodic_irr: Option<Rate>,
    /// periodic_irr * periods_per_year
    irr: Option<Rate>,
    effective_annual_rate: Option<Rate>,
    periods_per_year: u32,
}

fn read_flows(
    path: &Option<String>,
    flags: &[Decimal],
) -> Result<Option<CashFlowInput>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(input::file::read_input(path)?));
    }
    if !flags.is_empty() {
        return Ok(None);
    }
    match input::stdin::read_stdin()? {
        Some(data) => Ok(Some(serde_json::from_value(data)?)),
        None => Err("--cash-flows a,b,c or --input <file> is required".into()),
    }
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let (rate, cash_flows) = match read_flows(&args.input, &args.cash_flows)? {
        Some(doc) => (
            args.rate
                .or(doc.rate)
                .ok_or("--rate is required (or provide `rate` in the input)")?,
            doc.cash_flows,
        ),
        None => (
            args.rate.ok_or("--rate is required (or provide --input)")?,
            args.cash_flows,
        ),
    };

    let result = NpvOutput {
        rate,
        npv: time_value::npv(rate, &cash_flows),
        periods: cash_flows.len(),
    };
    let out = with_metadata(
        "Net Present Value (index 0 undiscounted)",
        &serde_json::json!({ "rate_floor": "-0.99999999" }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        result,
    );
    Ok(serde_json::to_value(out)?)
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let cash_flows = match read_flows(&args.input, &args.cash_flows)? {
        Some(doc) => doc.cash_flows,
        None => args.cash_flows,
    };
    if args.periods_per_year == 0 {
        return Err("--periods-per-year must be at least 1".into());
    }

    let config = IrrConfig {
        guess: args.guess,
        max_iterations: args.max_iterations,
        ..IrrConfig::default()
    };

    let mut warnings = Vec::new();
    let periodic_irr = match time_value::irr(&cash_flows, &config) {
        Ok(rate) => Some(rate),
        Err(e) => {
            warnings.push(format!("IRR not available: {e}"));
            None
        }
    };
    let ppy = args.periods_per_year;
    let result = IrrOutput {
        periodic_irr,
        irr: periodic_irr.and_then(|r| time_value::nominal_annual_rate(r, ppy)),
        effective_annual_rate: periodic_irr
            .and_then(|r| time_value::effective_annual_rate(r, ppy)),
        periods_per_year: ppy,
    };

    let out = with_metadata(
        "Internal Rate of Return (Newton-Raphson)",
        &config,
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    );
    Ok(serde_json::to_value(out)?)
}
