//! Price-yield curve around the solved yield, with the duration tangent.
//!
//! The purchase price stands in for the theoretical price at the solved
//! yield, so the curve and its tangent touch at the centre sample.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::time_value;
use crate::types::{Money, Rate};

/// Samples on each side of the solved yield.
const CURVE_HALF_WIDTH: i64 = 10;

/// Spacing between samples: 0.25 percentage points of periodic yield.
const CURVE_STEP: Rate = dec!(0.0025);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationMeasures {
    /// Periodic yield the curve is centred on
    pub periodic_yield: Rate,
    /// Purchase price used as the price at `periodic_yield`
    pub price: Money,
    /// In payment periods
    pub macaulay_duration: Decimal,
    /// macaulay / (1 + periodic_yield), in payment periods
    pub modified_duration: Decimal,
    pub macaulay_duration_years: Decimal,
    pub modified_duration_years: Decimal,
    /// dP/dy of the tangent line: -price * modified_duration
    pub slope: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceYieldPoint {
    /// Sampled periodic yield, in percent
    pub yield_pct: Decimal,
    /// Future cash flows re-discounted at the sampled yield
    pub true_price: Money,
    /// First-order (duration) approximation at the sampled yield
    pub tangent_price: Money,
}

/// Parallel series for charting. Empty (and `duration` None) when no yield
/// is available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceYieldCurve {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationMeasures>,
    pub points: Vec<PriceYieldPoint>,
}

impl PriceYieldCurve {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the curve from the holder's future cash flows (t = 1..N, without
/// the purchase outlay).
pub fn price_yield_curve(
    periodic_yield: Option<Rate>,
    future_cash_flows: &[Money],
    price: Money,
    periods_per_year: u32,
) -> PriceYieldCurve {
    let Some(y) = periodic_yield else {
        return PriceYieldCurve::default();
    };
    let Some(duration) = duration_measures(y, future_cash_flows, price, periods_per_year) else {
        return PriceYieldCurve::default();
    };

    // Leading zero puts cf_1 at t=1 for the NPV evaluator.
    let discounted: Vec<Money> = std::iter::once(Decimal::ZERO)
        .chain(future_cash_flows.iter().copied())
        .collect();

    let points = (-CURVE_HALF_WIDTH..=CURVE_HALF_WIDTH)
        .map(|i| {
            let shift = CURVE_STEP * Decimal::from(i);
            let rate = y + shift;
            PriceYieldPoint {
                yield_pct: rate * dec!(100),
                true_price: time_value::npv(rate, &discounted),
                tangent_price: price + duration.slope * shift,
            }
        })
        .collect();

    PriceYieldCurve {
        duration: Some(duration),
        points,
    }
}

/// Macaulay/modified duration and tangent slope at `y`.
///
/// None when the price is zero or the yield has no discount factor.
pub fn duration_measures(
    y: Rate,
    future_cash_flows: &[Money],
    price: Money,
    periods_per_year: u32,
) -> Option<DurationMeasures> {
    if price.is_zero() {
        return None;
    }
    let one_plus_y = Decimal::ONE.checked_add(y)?;
    if one_plus_y <= Decimal::ZERO {
        return None;
    }
    let v = Decimal::ONE / one_plus_y;

    let mut df = Decimal::ONE;
    let mut weighted = Decimal::ZERO;
    for (idx, cf) in future_cash_flows.iter().enumerate() {
        df = df.checked_mul(v)?;
        let t = Decimal::from(idx as u64 + 1);
        weighted = weighted.checked_add(t.checked_mul(cf.checked_mul(df)?)?)?;
    }

    let macaulay = weighted.checked_div(price)?;
    let modified = macaulay.checked_div(one_plus_y)?;
    let ppy = Decimal::from(periods_per_year);

    Some(DurationMeasures {
        periodic_yield: y,
        price,
        macaulay_duration: macaulay,
        modified_duration: modified,
        macaulay_duration_years: macaulay / ppy,
        modified_duration_years: modified / ppy,
        slope: (-price).checked_mul(modified)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
