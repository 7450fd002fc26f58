use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BondCalcError;
use crate::types::{Money, Rate};
use crate::BondCalcResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const FLAT_DERIVATIVE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const DEFAULT_IRR_GUESS: Rate = dec!(0.1);

/// Substitute for any rate at or below -100%, which has no discount factor.
const RATE_FLOOR: Rate = dec!(-0.99999999);

/// Newton-Raphson settings for [`irr`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrConfig {
    /// Starting periodic rate (0.1 = 10% per period)
    pub guess: Rate,
    /// Iteration cap; the solver gives up after this many Newton steps
    pub max_iterations: u32,
    /// |NPV| below which the rate is accepted
    pub tolerance: Decimal,
}

impl Default for IrrConfig {
    fn default() -> Self {
        Self {
            guess: DEFAULT_IRR_GUESS,
            max_iterations: MAX_IRR_ITERATIONS,
            tolerance: CONVERGENCE_THRESHOLD,
        }
    }
}

/// Net Present Value of a series of cash flows, index 0 undiscounted.
///
/// Total: rates at or below -100% are clamped to -99.999999%, and extreme
/// discount factors saturate at `Decimal::MAX` instead of overflowing.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> Money {
    let v = discount_base(rate);
    let mut factor = Decimal::ONE;
    let mut total = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            factor = factor.saturating_mul(v);
        }
        total = total.saturating_add(cf.saturating_mul(factor));
    }

    total
}

/// d(NPV)/d(rate) = sum_{t>=1} -t * cf_t / (1+rate)^(t+1)
pub fn npv_derivative(rate: Rate, cash_flows: &[Money]) -> Decimal {
    let v = discount_base(rate);
    let mut factor = v;
    let mut total = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t == 0 {
            continue;
        }
        factor = factor.saturating_mul(v);
        let term = Decimal::from(t as u64)
            .saturating_mul(*cf)
            .saturating_mul(factor);
        total = total.saturating_sub(term);
    }

    total
}

/// Internal Rate of Return using Newton-Raphson.
///
/// There is no bracketing or bisection fallback: cash-flow vectors with
/// several sign changes may diverge or land on an economically meaningless
/// root.
pub fn irr(cash_flows: &[Money], config: &IrrConfig) -> BondCalcResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(BondCalcError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = config.guess;

    for i in 0..config.max_iterations {
        let npv_val = npv(rate, cash_flows);
        if npv_val.abs() < config.tolerance {
            debug!(iterations = i, %rate, "IRR converged");
            return Ok(rate);
        }

        let dnpv = npv_derivative(rate, cash_flows);
        if dnpv.abs() < FLAT_DERIVATIVE_THRESHOLD {
            return Err(BondCalcError::ConvergenceFailure {
                function: "IRR (flat derivative)".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        let step = npv_val
            .checked_div(dnpv)
            .ok_or_else(|| BondCalcError::NumericalOverflow {
                context: format!("IRR Newton step at iteration {i}"),
            })?;
        rate = rate
            .checked_sub(step)
            .ok_or_else(|| BondCalcError::NumericalOverflow {
                context: format!("IRR rate update at iteration {i}"),
            })?;
    }

    Err(BondCalcError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: config.max_iterations,
        last_delta: npv(rate, cash_flows),
    })
}

/// Level payment that amortises `principal` over `nper` periods at `rate`.
///
/// principal * r / (1 - (1+r)^-n), or an even split when the rate is zero.
pub fn level_installment(rate: Rate, nper: u32, principal: Money) -> BondCalcResult<Money> {
    if nper == 0 {
        return Err(BondCalcError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return Err(BondCalcError::InvalidInput {
            field: "rate".into(),
            reason: "Periodic rate must be greater than -100%".into(),
        });
    }

    let v = Decimal::ONE / one_plus_r;
    let v_n = compound(v, nper).ok_or_else(|| BondCalcError::NumericalOverflow {
        context: "annuity discount factor".into(),
    })?;
    let annuity_factor = Decimal::ONE - v_n;

    if annuity_factor.is_zero() {
        return Err(BondCalcError::DivisionByZero {
            context: "level installment annuity factor".into(),
        });
    }

    Ok(principal * rate / annuity_factor)
}

/// base^n by iterative multiplication; None on overflow.
pub fn compound(base: Decimal, n: u32) -> Option<Decimal> {
    (0..n).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(base))
}

/// (1 + periodic)^periods_per_year - 1
pub fn effective_annual_rate(periodic: Rate, periods_per_year: u32) -> Option<Rate> {
    let one_plus = Decimal::ONE.checked_add(periodic)?;
    compound(one_plus, periods_per_year)?.checked_sub(Decimal::ONE)
}

/// periodic * periods_per_year (simple, not compounded)
pub fn nominal_annual_rate(periodic: Rate, periods_per_year: u32) -> Option<Rate> {
    periodic.checked_mul(Decimal::from(periods_per_year))
}

/// 1 / (1 + rate), after flooring the rate just above -100%.
fn discount_base(rate: Rate) -> Decimal {
    let rate = if rate <= dec!(-1) { RATE_FLOOR } else { rate };
    match Decimal::ONE.checked_add(rate) {
        Some(one_plus_r) => Decimal::ONE / one_plus_r,
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, label: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "{label}: expected ~{expected}, got {actual} (diff {diff} > tolerance {tolerance})"
        );
    }

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs);
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert_close(result, dec!(-21.04), dec!(0.01), "NPV at 10%");
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs), dec!(50));
    }

    #[test]
    fn test_npv_empty_is_zero() {
        assert_eq!(npv(dec!(0.05), &[]), Decimal::ZERO);
    }

    #[test]
    fn test_npv_rate_at_minus_one_is_clamped() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50), dec!(50), dec!(50)];
        let at_minus_one = npv(dec!(-1), &cfs);
        let below = npv(dec!(-3), &cfs);
        assert_eq!(at_minus_one, below);
        assert!(at_minus_one > Decimal::ZERO);
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, &IrrConfig::default()).unwrap();
        // ~9.70%
        assert_close(result, dec!(0.0970), dec!(0.0001), "IRR");
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let cfs = vec![dec!(-950), dec!(60), dec!(60), dec!(60), dec!(1060)];
        let config = IrrConfig::default();
        let rate = irr(&cfs, &config).unwrap();
        assert!(npv(rate, &cfs).abs() < config.tolerance);
    }

    #[test]
    fn test_irr_requires_two_flows() {
        let err = irr(&[dec!(-100)], &IrrConfig::default()).unwrap_err();
        assert!(matches!(err, BondCalcError::InsufficientData(_)));
    }

    #[test]
    fn test_irr_no_sign_change_fails() {
        let cfs = vec![dec!(100), dec!(50), dec!(50)];
        assert!(irr(&cfs, &IrrConfig::default()).is_err());
    }

    #[test]
    fn test_irr_iteration_cap() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let config = IrrConfig {
            max_iterations: 1,
            guess: dec!(0.5),
            ..IrrConfig::default()
        };
        match irr(&cfs, &config).unwrap_err() {
            BondCalcError::ConvergenceFailure { iterations, .. } => assert_eq!(iterations, 1),
            other => panic!("Expected ConvergenceFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_level_installment_annuity() {
        let pmt = level_installment(dec!(0.08), 5, dec!(100000)).unwrap();
        assert_close(pmt, dec!(25045.65), dec!(0.01), "5y 8% annuity");
    }

    #[test]
    fn test_level_installment_zero_rate_even_split() {
        let pmt = level_installment(Decimal::ZERO, 4, dec!(100000)).unwrap();
        assert_eq!(pmt, dec!(25000));
    }

    #[test]
    fn test_level_installment_zero_periods_rejected() {
        assert!(level_installment(dec!(0.05), 0, dec!(100)).is_err());
    }

    #[test]
    fn test_effective_annual_rate() {
        let ear = effective_annual_rate(dec!(0.01), 12).unwrap();
        assert_close(ear, dec!(0.126825), dec!(0.000001), "EAR of 1% monthly");
        assert_eq!(effective_annual_rate(dec!(0.08), 1).unwrap(), dec!(0.08));
    }

    #[test]
    fn test_nominal_annual_rate() {
        assert_eq!(nominal_annual_rate(dec!(0.01), 12).unwrap(), dec!(0.12));
    }
}
