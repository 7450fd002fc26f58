use rust_decimal::Decimal;

use crate::amortization::parameters::InstrumentParameters;
use crate::amortization::schedule::AmortizationSchedule;
use crate::types::Money;

/// Net proceeds the issuer receives at t=0, after placement costs.
pub fn issuer_initial_cash_flow(params: &InstrumentParameters) -> Money {
    params.market_value * (Decimal::ONE - params.issuer_initial_costs)
}

/// Issuer-side vector: net proceeds at t=0 (positive), then each period's
/// signed issuer cash flow. The final entry already carries the redemption
/// premium.
pub fn issuer_cash_flows(params: &InstrumentParameters, schedule: &AmortizationSchedule) -> Vec<Money> {
    std::iter::once(issuer_initial_cash_flow(params))
        .chain(schedule.periods.iter().map(|p| p.issuer_cash_flow))
        .collect()
}

/// Investor-side vector: the purchase outlay at t=0 (negative), then what the
/// issuer pays each period, received.
pub fn investor_cash_flows(
    params: &InstrumentParameters,
    schedule: &AmortizationSchedule,
) -> Vec<Money> {
    std::iter::once(-params.market_value)
        .chain(schedule.periods.iter().map(|p| p.investor_cash_flow()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::parameters::PaymentFrequency;
    use crate::amortization::schedule::generate_schedule;
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn params() -> InstrumentParameters {
        InstrumentParameters {
            face_value: dec!(1000),
            market_value: dec!(1010),
            coupon_rate: dec!(0.06),
            cost_of_capital: dec!(0.08),
            term_in_years: 2,
            payment_frequency: PaymentFrequency::SemiAnnually,
            issuer_initial_costs: dec!(0.02),
            redemption_premium: dec!(0.01),
            total_grace_periods: 0,
            partial_grace_periods: 1,
            currency: Currency::EUR,
            issuer_name: None,
            start_date: None,
        }
    }

    #[test]
    fn test_issuer_vector_shape() {
        let p = params();
        let s = generate_schedule(&p).unwrap();
        let cfs = issuer_cash_flows(&p, &s);

        assert_eq!(cfs.len(), s.len() + 1);
        // 1010 * (1 - 0.02)
        assert_eq!(cfs[0], dec!(989.8));
        // partial grace: interest only, 1000 * 0.03
        assert_eq!(cfs[1], dec!(-30));
        assert!(cfs[1..].iter().all(|cf| *cf < Decimal::ZERO));
        assert_eq!(*cfs.last().unwrap(), s.periods.last().unwrap().issuer_cash_flow);
    }

    #[test]
    fn test_investor_vector_mirrors_issuer() {
        let p = params();
        let s = generate_schedule(&p).unwrap();
        let issuer = issuer_cash_flows(&p, &s);
        let investor = investor_cash_flows(&p, &s);

        assert_eq!(investor.len(), issuer.len());
        assert_eq!(investor[0], dec!(-1010));
        for (i, inv) in investor.iter().enumerate().skip(1) {
            assert_eq!(*inv, -issuer[i]);
        }
    }

    #[test]
    fn test_empty_schedule_leaves_only_time_zero() {
        let p = InstrumentParameters {
            term_in_years: 0,
            ..params()
        };
        let s = generate_schedule(&p).unwrap();
        assert_eq!(issuer_cash_flows(&p, &s), vec![dec!(989.8)]);
        assert_eq!(investor_cash_flows(&p, &s), vec![dec!(-1010)]);
    }
}
