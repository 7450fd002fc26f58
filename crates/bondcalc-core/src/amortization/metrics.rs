use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::amortization::cash_flows::{
    investor_cash_flows, issuer_cash_flows, issuer_initial_cash_flow,
};
use crate::amortization::parameters::InstrumentParameters;
use crate::amortization::schedule::AmortizationSchedule;
use crate::time_value::{self, compound, effective_annual_rate, nominal_annual_rate, IrrConfig};
use crate::types::{Currency, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Issuer-side summary. `None` means "not available" (IRR did not converge
/// or the schedule is empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// NPV of the issuer vector at the periodic cost of capital
    pub npv: Money,
    /// Rate per payment period that zeroes the issuer vector
    pub periodic_irr: Option<Rate>,
    /// periodic_irr * periods_per_year
    pub irr: Option<Rate>,
    /// Effective annual cost rate: (1 + periodic_irr)^ppy - 1
    pub tcea: Option<Rate>,
    /// Annualised convexity of the issuer's obligations
    pub convexity: Option<Decimal>,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_payment: Money,
    pub currency: Currency,
}

/// The same schedule seen by a holder who bought at market value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorMetrics {
    /// NPV of the investor vector at the periodic cost of capital
    pub npv: Money,
    pub periodic_irr: Option<Rate>,
    pub irr: Option<Rate>,
    /// Effective annual yield rate: (1 + periodic_irr)^ppy - 1
    pub trea: Option<Rate>,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Issuer summary: NPV at cost of capital, IRR/TCEA, convexity and totals.
///
/// Solver failures are pushed to `warnings` and reported as `None`.
pub fn issuer_summary(
    params: &InstrumentParameters,
    schedule: &AmortizationSchedule,
    config: &IrrConfig,
    warnings: &mut Vec<String>,
) -> SummaryMetrics {
    let totals = &schedule.totals;

    if schedule.is_empty() {
        return SummaryMetrics {
            npv: Decimal::ZERO,
            periodic_irr: None,
            irr: None,
            tcea: None,
            convexity: None,
            total_interest: Decimal::ZERO,
            total_principal: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            currency: params.currency.clone(),
        };
    }

    let ppy = schedule.periods_per_year;
    let cash_flows = issuer_cash_flows(params, schedule);
    let npv = time_value::npv(params.periodic_cost_of_capital(), &cash_flows);
    let periodic_irr = solve_irr("Issuer", &cash_flows, config, warnings);

    let convexity = periodic_irr.and_then(|r| annualized_convexity(&cash_flows, r, ppy));
    if periodic_irr.is_some() && convexity.is_none() {
        warnings.push("Convexity not available: issuer net proceeds must be positive".into());
    }

    SummaryMetrics {
        npv,
        periodic_irr,
        irr: periodic_irr.and_then(|r| nominal_annual_rate(r, ppy)),
        tcea: periodic_irr.and_then(|r| effective_annual_rate(r, ppy)),
        convexity,
        total_interest: totals.total_interest,
        total_principal: totals.total_principal,
        total_payment: totals.total_payment,
        currency: params.currency.clone(),
    }
}

/// Investor view: purchase at market value, receive every issuer payment.
pub fn investor_metrics(
    params: &InstrumentParameters,
    schedule: &AmortizationSchedule,
    config: &IrrConfig,
    warnings: &mut Vec<String>,
) -> InvestorMetrics {
    if schedule.is_empty() {
        return InvestorMetrics {
            npv: Decimal::ZERO,
            periodic_irr: None,
            irr: None,
            trea: None,
            currency: params.currency.clone(),
        };
    }

    let ppy = schedule.periods_per_year;
    let cash_flows = investor_cash_flows(params, schedule);
    let npv = time_value::npv(params.periodic_cost_of_capital(), &cash_flows);
    let periodic_irr = solve_irr("Investor", &cash_flows, config, warnings);

    InvestorMetrics {
        npv,
        periodic_irr,
        irr: periodic_irr.and_then(|r| nominal_annual_rate(r, ppy)),
        trea: periodic_irr.and_then(|r| effective_annual_rate(r, ppy)),
        currency: params.currency.clone(),
    }
}

/// Annualised convexity of an issuer vector around its periodic IRR.
///
/// sum_{t>=1} [-cf_t / (1+y)^t] * (t^2 + t) / (cf_0 * (1+y)^2) / ppy^2.
/// None when the t=0 proceeds are not positive or the arithmetic overflows.
pub fn annualized_convexity(
    cash_flows: &[Money],
    periodic_irr: Rate,
    periods_per_year: u32,
) -> Option<Decimal> {
    let initial = *cash_flows.first()?;
    if initial <= Decimal::ZERO {
        return None;
    }

    let one_plus_y = Decimal::ONE.checked_add(periodic_irr)?;
    if one_plus_y <= Decimal::ZERO {
        return None;
    }
    let v = Decimal::ONE / one_plus_y;

    let mut df = Decimal::ONE;
    let mut weighted = Decimal::ZERO;
    for (t, cf) in cash_flows.iter().enumerate().skip(1) {
        df = df.checked_mul(v)?;
        let t = Decimal::from(t as u64);
        let term = (-*cf).checked_mul(df)?.checked_mul(t * t + t)?;
        weighted = weighted.checked_add(term)?;
    }

    let denominator = initial.checked_mul(compound(one_plus_y, 2)?)?;
    let ppy_sq = Decimal::from(periods_per_year * periods_per_year);
    weighted.checked_div(denominator)?.checked_div(ppy_sq)
}

/// Run the solver and translate any failure into `None` plus a warning.
fn solve_irr(
    side: &str,
    cash_flows: &[Money],
    config: &IrrConfig,
    warnings: &mut Vec<String>,
) -> Option<Rate> {
    match time_value::irr(cash_flows, config) {
        Ok(rate) => Some(rate),
        Err(e) => {
            warn!(side, error = %e, "IRR not available");
            warnings.push(format!("{side} IRR not available: {e}"));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::parameters::PaymentFrequency;
    use crate::amortization::schedule::generate_schedule;
    use rust_decimal_macros::dec;

    fn scenario_a() -> InstrumentParameters {
        InstrumentParameters {
            face_value: dec!(100000),
            market_value: dec!(100000),
            coupon_rate: dec!(0.08),
            cost_of_capital: dec!(0.10),
            term_in_years: 5,
            payment_frequency: PaymentFrequency::Annually,
            issuer_initial_costs: Decimal::ZERO,
            redemption_premium: Decimal::ZERO,
            total_grace_periods: 0,
            partial_grace_periods: 0,
            currency: Currency::USD,
            issuer_name: None,
            start_date: None,
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, label: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "{label}: expected ~{expected}, got {actual} (diff {diff} > tolerance {tolerance})"
        );
    }

    #[test]
    fn test_issuer_irr_equals_coupon_at_par_without_costs() {
        let p = scenario_a();
        let s = generate_schedule(&p).unwrap();
        let mut warnings = Vec::new();
        let m = issuer_summary(&p, &s, &IrrConfig::default(), &mut warnings);

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_close(m.periodic_irr.unwrap(), dec!(0.08), dec!(0.000001), "periodic IRR");
        assert_close(m.irr.unwrap(), dec!(0.08), dec!(0.000001), "annual IRR");
        assert_close(m.tcea.unwrap(), dec!(0.08), dec!(0.000001), "TCEA");
        // 100000 - 25045.65 * 3.790787 ≈ 5057.30
        assert_close(m.npv, dec!(5057.30), dec!(0.5), "issuer NPV at 10%");
    }

    #[test]
    fn test_issuer_costs_raise_effective_cost() {
        let p = InstrumentParameters {
            issuer_initial_costs: dec!(0.02),
            payment_frequency: PaymentFrequency::SemiAnnually,
            ..scenario_a()
        };
        let s = generate_schedule(&p).unwrap();
        let mut warnings = Vec::new();
        let m = issuer_summary(&p, &s, &IrrConfig::default(), &mut warnings);

        // Semi-annual compounding of a ~4%+ periodic cost exceeds the nominal rate
        assert!(m.periodic_irr.unwrap() > dec!(0.04));
        assert!(m.tcea.unwrap() > m.irr.unwrap());
    }

    #[test]
    fn test_convexity_positive_for_plain_bond() {
        let p = scenario_a();
        let s = generate_schedule(&p).unwrap();
        let mut warnings = Vec::new();
        let m = issuer_summary(&p, &s, &IrrConfig::default(), &mut warnings);

        let c = m.convexity.unwrap();
        assert!(c > Decimal::ZERO && c < dec!(30), "convexity out of range: {c}");
    }

    #[test]
    fn test_convexity_unavailable_without_proceeds() {
        let cfs = vec![Decimal::ZERO, dec!(-50), dec!(-1050)];
        assert_eq!(annualized_convexity(&cfs, dec!(0.05), 1), None);
    }

    #[test]
    fn test_convexity_single_flow_closed_form() {
        // One payment at t=1: (1/1.1) * 2 / (cf0 * 1.1^2) with cf0 = 1000/1.1
        let cfs = vec![dec!(1000) / dec!(1.1), dec!(-1000)];
        let c = annualized_convexity(&cfs, dec!(0.1), 1).unwrap();
        assert_close(c, dec!(2) / dec!(1.21), dec!(0.0000001), "single-flow convexity");
    }

    #[test]
    fn test_investor_mirrors_issuer_at_par() {
        let p = scenario_a();
        let s = generate_schedule(&p).unwrap();
        let mut warnings = Vec::new();
        let issuer = issuer_summary(&p, &s, &IrrConfig::default(), &mut warnings);
        let investor = investor_metrics(&p, &s, &IrrConfig::default(), &mut warnings);

        assert_close(investor.npv, -issuer.npv, dec!(0.0000001), "investor NPV");
        assert_close(
            investor.periodic_irr.unwrap(),
            issuer.periodic_irr.unwrap(),
            dec!(0.000001),
            "IRR",
        );
        assert_close(investor.trea.unwrap(), dec!(0.08), dec!(0.000001), "TREA");
    }

    #[test]
    fn test_discount_purchase_raises_investor_yield() {
        let p = InstrumentParameters {
            market_value: dec!(95000),
            ..scenario_a()
        };
        let s = generate_schedule(&p).unwrap();
        let mut warnings = Vec::new();
        let investor = investor_metrics(&p, &s, &IrrConfig::default(), &mut warnings);
        assert!(investor.irr.unwrap() > dec!(0.08));
    }

    #[test]
    fn test_non_convergence_surfaces_as_unavailable() {
        let p = scenario_a();
        let s = generate_schedule(&p).unwrap();
        let config = IrrConfig {
            max_iterations: 0,
            ..IrrConfig::default()
        };
        let mut warnings = Vec::new();
        let m = issuer_summary(&p, &s, &config, &mut warnings);

        assert_eq!(m.periodic_irr, None);
        assert_eq!(m.irr, None);
        assert_eq!(m.tcea, None);
        assert_eq!(m.convexity, None);
        // NPV does not depend on the solver
        assert_close(m.npv, dec!(5057.30), dec!(0.5), "NPV still computed");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Issuer IRR not available"));
    }

    #[test]
    fn test_empty_schedule_summary() {
        let p = InstrumentParameters {
            term_in_years: 0,
            ..scenario_a()
        };
        let s = generate_schedule(&p).unwrap();
        let mut warnings = Vec::new();
        let m = issuer_summary(&p, &s, &IrrConfig::default(), &mut warnings);
        let inv = investor_metrics(&p, &s, &IrrConfig::default(), &mut warnings);

        assert_eq!(m.npv, Decimal::ZERO);
        assert_eq!(m.irr, None);
        assert_eq!(m.total_payment, Decimal::ZERO);
        assert_eq!(inv.trea, None);
        assert!(warnings.is_empty());
    }
}
