use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use bondcalc_core::amortization::schedule::{AmortizationSchedule, PeriodKind, ScheduleTotals};
use bondcalc_core::amortization::{self, InstrumentParameters, PaymentFrequency};
use bondcalc_core::{ComputationOutput, Currency, Money, Rate};

use crate::input;

/// Instrument description shared by every bond command.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct InstrumentArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Nominal (face) value of the bond
    #[arg(long)]
    pub face_value: Option<Decimal>,

    /// Price paid by the investor (defaults to face value)
    #[arg(long)]
    pub market_value: Option<Decimal>,

    /// Annual coupon rate (e.g. 0.08 for 8%)
    #[arg(long)]
    pub coupon_rate: Option<Decimal>,

    /// Annual cost of capital used for NPV (e.g. 0.10 for 10%)
    #[arg(long, alias = "cok")]
    pub cost_of_capital: Option<Decimal>,

    /// Term in whole years
    #[arg(long, alias = "years")]
    pub term_in_years: Option<u32>,

    /// Payment frequency: annually, semi-annually, quadrimester, quarterly,
    /// bimonthly, monthly
    #[arg(long, default_value = "annually")]
    pub frequency: PaymentFrequency,

    /// Issuance costs as a fraction of market value (e.g. 0.015)
    #[arg(long, default_value = "0")]
    pub issuer_costs: Decimal,

    /// Redemption premium as a fraction of face value, paid at maturity
    #[arg(long, default_value = "0")]
    pub premium: Decimal,

    /// Leading periods with no payment; interest is capitalized
    #[arg(long, default_value_t = 0)]
    pub total_grace: u32,

    /// Periods after total grace that pay interest only
    #[arg(long, default_value_t = 0)]
    pub partial_grace: u32,

    /// Currency code (USD, EUR, PEN, ...)
    #[arg(long, default_value = "USD")]
    pub currency: Currency,

    /// Issuer name, carried through for labelling
    #[arg(long)]
    pub issuer_name: Option<String>,

    /// Issue date (YYYY-MM-DD); enables payment dates on the schedule
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

impl InstrumentArgs {
    /// File, then stdin, then flags. The result is validated before any
    /// computation runs.
    pub fn resolve(&self) -> Result<InstrumentParameters, Box<dyn std::error::Error>> {
        let (params, source): (InstrumentParameters, &str) = if let Some(ref path) = self.input {
            (input::file::read_input(path)?, "file")
        } else if let Some(data) = input::stdin::read_stdin()? {
            (serde_json::from_value(data)?, "stdin")
        } else {
            (self.params_from_flags()?, "flags")
        };
        params.validate()?;
        debug!(
            source,
            periods = params.total_periods(),
            frequency = %params.payment_frequency,
            "instrument resolved"
        );
        Ok(params)
    }

    fn params_from_flags(&self) -> Result<InstrumentParameters, Box<dyn std::error::Error>> {
        let face_value = self
            .face_value
            .ok_or("--face-value is required (or provide --input)")?;
        Ok(InstrumentParameters {
            face_value,
            market_value: self.market_value.unwrap_or(face_value),
            coupon_rate: self
                .coupon_rate
                .ok_or("--coupon-rate is required (or provide --input)")?,
            cost_of_capital: self
                .cost_of_capital
                .ok_or("--cost-of-capital is required (or provide --input)")?,
            term_in_years: self
                .term_in_years
                .ok_or("--term-in-years is required (or provide --input)")?,
            payment_frequency: self.frequency,
            issuer_initial_costs: self.issuer_costs,
            redemption_premium: self.premium,
            total_grace_periods: self.total_grace,
            partial_grace_periods: self.partial_grace,
            currency: self.currency.clone(),
            issuer_name: self.issuer_name.clone(),
            start_date: self.start_date,
        })
    }
}

/// Whose cash flow column the schedule export carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum View {
    Issuer,
    Investor,
}

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub instrument: InstrumentArgs,

    /// Cash flow column to export
    #[arg(long, value_enum, default_value = "issuer")]
    pub view: View,
}

/// Arguments for the issuer summary, investor metrics, price-yield curve and
/// full analysis
#[derive(Args)]
pub struct BondArgs {
    #[command(flatten)]
    pub instrument: InstrumentArgs,
}

// ---------------------------------------------------------------------------
// Export rows
// ---------------------------------------------------------------------------

/// One schedule row with a single cash flow column for the chosen view.
#[derive(Debug, Serialize)]
struct ScheduleRow {
    period: u32,
    kind: PeriodKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_date: Option<NaiveDate>,
    initial_balance: Money,
    interest: Money,
    principal: Money,
    payment: Money,
    final_balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer_cash_flow: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    investor_cash_flow: Option<Money>,
}

#[derive(Debug, Serialize)]
struct ScheduleExport {
    periods: Vec<ScheduleRow>,
    periods_per_year: u32,
    periodic_coupon_rate: Rate,
    installment: Option<Money>,
    grace_periods_applied: u32,
    redemption_premium: Money,
    totals: ScheduleTotals,
}

fn schedule_export(schedule: AmortizationSchedule, view: View) -> ScheduleExport {
    let periods = schedule
        .periods
        .iter()
        .map(|p| ScheduleRow {
            period: p.period,
            kind: p.kind,
            payment_date: p.payment_date,
            initial_balance: p.initial_balance,
            interest: p.interest,
            principal: p.principal,
            payment: p.payment,
            final_balance: p.final_balance,
            issuer_cash_flow: (view == View::Issuer).then_some(p.issuer_cash_flow),
            investor_cash_flow: (view == View::Investor).then(|| p.investor_cash_flow()),
        })
        .collect();

    ScheduleExport {
        periods,
        periods_per_year: schedule.periods_per_year,
        periodic_coupon_rate: schedule.periodic_coupon_rate,
        installment: schedule.installment,
        grace_periods_applied: schedule.grace_periods_applied,
        redemption_premium: schedule.redemption_premium,
        totals: schedule.totals,
    }
}

/// Swap the envelope's payload, keeping methodology, warnings and metadata.
fn reframe<T: Serialize, U: Serialize>(
    out: ComputationOutput<T>,
    f: impl FnOnce(T) -> U,
) -> ComputationOutput<U> {
    ComputationOutput {
        result: f(out.result),
        methodology: out.methodology,
        assumptions: out.assumptions,
        warnings: out.warnings,
        metadata: out.metadata,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.instrument.resolve()?;
    let out = amortization::calculate_amortization(&params)?;
    let view = args.view;
    let export = reframe(out, |o| schedule_export(o.schedule, view));
    Ok(serde_json::to_value(export)?)
}

pub fn run_summary(args: BondArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.instrument.resolve()?;
    let out = amortization::calculate_amortization(&params)?;
    Ok(serde_json::to_value(reframe(out, |o| o.summary))?)
}

pub fn run_investor(args: BondArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.instrument.resolve()?;
    let result = amortization::calculate_investor_metrics(&params)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_price_yield(args: BondArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.instrument.resolve()?;
    let result = amortization::calculate_price_yield_curve(&params)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze(args: BondArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.instrument.resolve()?;
    let result = amortization::analyze_bond(&params)?;
    Ok(serde_json::to_value(result)?)
}
