use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::metrics::{investor_metrics, issuer_summary, InvestorMetrics, SummaryMetrics};
use crate::amortization::parameters::InstrumentParameters;
use crate::amortization::schedule::{generate_schedule, AmortizationSchedule};
use crate::time_value::IrrConfig;
use crate::types::{with_metadata, ComputationOutput};
use crate::BondCalcResult;

#[cfg(feature = "price_yield")]
use crate::amortization::cash_flows::investor_cash_flows;
#[cfg(feature = "price_yield")]
use crate::amortization::price_yield::{price_yield_curve, PriceYieldCurve};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Schedule plus the issuer summary built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub schedule: AmortizationSchedule,
    pub summary: SummaryMetrics,
}

/// Everything the engine derives from one set of parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondAnalysis {
    pub schedule: AmortizationSchedule,
    pub summary: SummaryMetrics,
    pub investor: InvestorMetrics,
    #[cfg(feature = "price_yield")]
    pub price_yield: PriceYieldCurve,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Amortisation schedule and issuer metrics (NPV, IRR, TCEA, convexity).
pub fn calculate_amortization(
    params: &InstrumentParameters,
) -> BondCalcResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings = grace_warnings(params);

    let schedule = generate_schedule(params)?;
    let summary = issuer_summary(params, &schedule, &IrrConfig::default(), &mut warnings);

    Ok(with_metadata(
        "Bond Amortization Schedule (level installment with total/partial grace)",
        &assumptions(params),
        warnings,
        start.elapsed().as_micros() as u64,
        AmortizationOutput { schedule, summary },
    ))
}

/// Investor NPV, IRR and TREA for a purchase at market value.
pub fn calculate_investor_metrics(
    params: &InstrumentParameters,
) -> BondCalcResult<ComputationOutput<InvestorMetrics>> {
    let start = Instant::now();
    let mut warnings = grace_warnings(params);

    let schedule = generate_schedule(params)?;
    let investor = investor_metrics(params, &schedule, &IrrConfig::default(), &mut warnings);

    Ok(with_metadata(
        "Bond Investor Return (purchase at market value)",
        &assumptions(params),
        warnings,
        start.elapsed().as_micros() as u64,
        investor,
    ))
}

/// Price-yield curve and duration tangent around the investor's yield.
#[cfg(feature = "price_yield")]
pub fn calculate_price_yield_curve(
    params: &InstrumentParameters,
) -> BondCalcResult<ComputationOutput<PriceYieldCurve>> {
    let start = Instant::now();
    let mut warnings = grace_warnings(params);

    let schedule = generate_schedule(params)?;
    let investor = investor_metrics(params, &schedule, &IrrConfig::default(), &mut warnings);
    let curve = curve_for(params, &schedule, &investor, &mut warnings);

    Ok(with_metadata(
        "Bond Price-Yield Curve (Macaulay/modified duration tangent)",
        &assumptions(params),
        warnings,
        start.elapsed().as_micros() as u64,
        curve,
    ))
}

/// Schedule, issuer summary, investor metrics and (with the `price_yield`
/// feature) the price-yield curve in one pass.
pub fn analyze_bond(params: &InstrumentParameters) -> BondCalcResult<ComputationOutput<BondAnalysis>> {
    let start = Instant::now();
    let mut warnings = grace_warnings(params);
    let config = IrrConfig::default();

    let schedule = generate_schedule(params)?;
    let summary = issuer_summary(params, &schedule, &config, &mut warnings);
    let investor = investor_metrics(params, &schedule, &config, &mut warnings);

    #[cfg(feature = "price_yield")]
    let price_yield = curve_for(params, &schedule, &investor, &mut warnings);

    let analysis = BondAnalysis {
        schedule,
        summary,
        investor,
        #[cfg(feature = "price_yield")]
        price_yield,
    };

    Ok(with_metadata(
        "Bond Issuer/Investor Analysis",
        &assumptions(params),
        warnings,
        start.elapsed().as_micros() as u64,
        analysis,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

#[cfg(feature = "price_yield")]
fn curve_for(
    params: &InstrumentParameters,
    schedule: &AmortizationSchedule,
    investor: &InvestorMetrics,
    warnings: &mut Vec<String>,
) -> PriceYieldCurve {
    let flows = investor_cash_flows(params, schedule);
    let future = flows.get(1..).unwrap_or_default();
    let curve = price_yield_curve(
        investor.periodic_irr,
        future,
        params.market_value,
        schedule.periods_per_year,
    );
    if curve.is_empty() && !schedule.is_empty() {
        warnings.push("Price-yield curve not available (investor IRR or price missing)".into());
    }
    curve
}

fn grace_warnings(params: &InstrumentParameters) -> Vec<String> {
    let mut warnings = Vec::new();
    let total_periods = params.total_periods();
    if total_periods == 0 {
        warnings.push("Term yields no payment periods; schedule is empty".into());
        return warnings;
    }
    let requested = params
        .total_grace_periods
        .saturating_add(params.partial_grace_periods);
    if requested > total_periods {
        warnings.push(format!(
            "Requested {requested} grace periods over a {total_periods}-period term; \
             grace clamped to {total_periods}"
        ));
    }
    if requested >= total_periods {
        warnings.push(
            "Grace covers the whole term; no amortizing phase, balance is not repaid by the schedule"
                .into(),
        );
    }
    warnings
}

fn assumptions(params: &InstrumentParameters) -> serde_json::Value {
    serde_json::json!({
        "payment_frequency": params.payment_frequency.as_str(),
        "periods_per_year": params.periods_per_year(),
        "total_periods": params.total_periods(),
        "currency": params.currency.code(),
        "rates": "decimal fractions (0.08 = 8%), annual rates divided by periods per year",
        "annualisation": "IRR simple (x periods per year); TCEA/TREA compounded",
        "irr_solver": "Newton-Raphson, guess 10%, 100 iterations, |NPV| < 1e-7",
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
