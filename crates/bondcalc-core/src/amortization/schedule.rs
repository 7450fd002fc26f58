//! Period generator: grace phases followed by level-installment amortisation.
//!
//! Each period is a pure step `(opening balance, index) -> (Period, closing
//! balance)`; the schedule is the fold of those steps. Totals are accumulated
//! inside the same fold so they always match the rows exactly.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::amortization::parameters::{check_term, InstrumentParameters};
use crate::error::BondCalcError;
use crate::time_value::level_installment;
use crate::types::{Money, Rate};
use crate::BondCalcResult;

/// Balances closer to zero than this are reported as zero.
const BALANCE_EPSILON: Decimal = dec!(0.005);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    /// No payment; interest capitalises into the balance
    TotalGrace,
    /// Interest-only payment; principal untouched
    PartialGrace,
    /// Level installment of interest plus principal
    Amortizing,
}

/// One row of the amortisation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// 1-based, contiguous
    pub period: u32,
    pub kind: PeriodKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    pub initial_balance: Money,
    pub interest: Money,
    pub principal: Money,
    /// Installment (cuota) actually paid this period
    pub payment: Money,
    pub final_balance: Money,
    /// Signed from the issuer's side: payments are negative
    pub issuer_cash_flow: Money,
}

impl Period {
    /// What the holder receives this period.
    pub fn investor_cash_flow(&self) -> Money {
        -self.issuer_cash_flow
    }
}

/// Totals accumulated while the schedule is generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTotals {
    /// Interest accrued over all periods, capitalised or paid
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_payment: Money,
    /// Interest accrued during total grace and added to the balance
    pub total_capitalized_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub periods: Vec<Period>,
    pub periods_per_year: u32,
    pub periodic_coupon_rate: Rate,
    /// Level installment of the amortising phase, if there is one
    pub installment: Option<Money>,
    /// Total plus partial grace periods after clamping to the term
    pub grace_periods_applied: u32,
    /// Extra amount paid by the issuer at maturity
    pub redemption_premium: Money,
    pub totals: ScheduleTotals,
}

impl AmortizationSchedule {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }
}

/// Grace boundaries after clamping the requested counts to the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracePlan {
    pub total_grace: u32,
    pub grace_duration: u32,
}

impl GracePlan {
    /// Grace may cover the whole term, in which case nothing amortises.
    pub fn clamp(total_grace: u32, partial_grace: u32, total_periods: u32) -> Self {
        let grace_duration = total_grace.saturating_add(partial_grace).min(total_periods);
        Self {
            total_grace: total_grace.min(grace_duration),
            grace_duration,
        }
    }

    pub fn kind_of(&self, period: u32) -> PeriodKind {
        if period <= self.total_grace {
            PeriodKind::TotalGrace
        } else if period <= self.grace_duration {
            PeriodKind::PartialGrace
        } else {
            PeriodKind::Amortizing
        }
    }
}

/// Fold state: closing balance carried forward plus everything produced.
struct Accumulator {
    balance: Money,
    periods: Vec<Period>,
    totals: ScheduleTotals,
}

impl Accumulator {
    fn push(mut self, period: Period, closing: Money) -> Self {
        self.totals.total_interest += period.interest;
        self.totals.total_principal += period.principal;
        self.totals.total_payment += period.payment;
        if period.kind == PeriodKind::TotalGrace {
            self.totals.total_capitalized_interest += period.interest;
        }
        self.periods.push(period);
        self.balance = closing;
        self
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the period-by-period schedule for an instrument.
///
/// A term that yields no periods produces an empty schedule, not an error;
/// a term beyond `MAX_TERM_IN_YEARS` is rejected.
pub fn generate_schedule(params: &InstrumentParameters) -> BondCalcResult<AmortizationSchedule> {
    check_term(params.term_in_years)?;
    let periods_per_year = params.periods_per_year();
    let total_periods = params.total_periods();
    let rate = params.periodic_coupon_rate();
    let premium = params.face_value * params.redemption_premium;

    if total_periods == 0 {
        return Ok(AmortizationSchedule {
            periods: Vec::new(),
            periods_per_year,
            periodic_coupon_rate: rate,
            installment: None,
            grace_periods_applied: 0,
            redemption_premium: Decimal::ZERO,
            totals: ScheduleTotals::default(),
        });
    }

    let plan = GracePlan::clamp(
        params.total_grace_periods,
        params.partial_grace_periods,
        total_periods,
    );
    if plan.grace_duration < params.total_grace_periods.saturating_add(params.partial_grace_periods)
    {
        warn!(
            requested_total = params.total_grace_periods,
            requested_partial = params.partial_grace_periods,
            applied = plan.grace_duration,
            "grace periods clamped to term"
        );
    }

    let start = Accumulator {
        balance: params.face_value,
        periods: Vec::with_capacity(total_periods as usize),
        totals: ScheduleTotals::default(),
    };

    let after_grace = (1..=plan.grace_duration).try_fold(start, |acc, index| {
        let date = payment_date(params, index)?;
        let (period, closing) = grace_step(acc.balance, index, plan.kind_of(index), rate, date);
        Ok::<_, BondCalcError>(acc.push(period, closing))
    })?;

    let remaining = total_periods - plan.grace_duration;
    let (mut done, installment) = if remaining == 0 {
        (after_grace, None)
    } else {
        let installment = level_installment(rate, remaining, after_grace.balance)?;
        let done = (plan.grace_duration + 1..=total_periods).try_fold(after_grace, |acc, index| {
            let date = payment_date(params, index)?;
            let step = if index == total_periods {
                redemption_step(acc.balance, index, rate, date)
            } else {
                amortizing_step(acc.balance, index, installment, rate, date)
            };
            Ok::<_, BondCalcError>(acc.push(step.0, step.1))
        })?;
        (done, Some(installment))
    };

    // Premium is paid with the last row, grace or not.
    if let Some(last) = done.periods.last_mut() {
        last.issuer_cash_flow -= premium;
    }

    debug!(
        periods = done.periods.len(),
        grace = plan.grace_duration,
        installment = ?installment,
        "schedule generated"
    );

    Ok(AmortizationSchedule {
        periods: done.periods,
        periods_per_year,
        periodic_coupon_rate: rate,
        installment,
        grace_periods_applied: plan.grace_duration,
        redemption_premium: premium,
        totals: done.totals,
    })
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Total grace capitalises interest; partial grace pays it out.
fn grace_step(
    opening: Money,
    index: u32,
    kind: PeriodKind,
    rate: Rate,
    payment_date: Option<NaiveDate>,
) -> (Period, Money) {
    let interest = opening * rate;
    let (payment, closing) = match kind {
        PeriodKind::TotalGrace => (Decimal::ZERO, opening + interest),
        _ => (interest, opening),
    };
    let closing = snap(closing);

    let period = Period {
        period: index,
        kind,
        payment_date,
        initial_balance: opening,
        interest,
        principal: Decimal::ZERO,
        payment,
        final_balance: closing,
        issuer_cash_flow: -payment,
    };
    (period, closing)
}

fn amortizing_step(
    opening: Money,
    index: u32,
    installment: Money,
    rate: Rate,
    payment_date: Option<NaiveDate>,
) -> (Period, Money) {
    let interest = opening * rate;
    let principal = installment - interest;
    let closing = snap(opening - principal);

    let period = Period {
        period: index,
        kind: PeriodKind::Amortizing,
        payment_date,
        initial_balance: opening,
        interest,
        principal,
        payment: installment,
        final_balance: closing,
        issuer_cash_flow: -installment,
    };
    (period, closing)
}

/// Final period: repays exactly what is left, so the balance closes at zero.
fn redemption_step(
    opening: Money,
    index: u32,
    rate: Rate,
    payment_date: Option<NaiveDate>,
) -> (Period, Money) {
    let interest = opening * rate;
    let principal = opening;
    let payment = principal + interest;

    let period = Period {
        period: index,
        kind: PeriodKind::Amortizing,
        payment_date,
        initial_balance: opening,
        interest,
        principal,
        payment,
        final_balance: Decimal::ZERO,
        issuer_cash_flow: -payment,
    };
    (period, Decimal::ZERO)
}

fn snap(balance: Money) -> Money {
    if balance.abs() < BALANCE_EPSILON {
        Decimal::ZERO
    } else {
        balance
    }
}

fn payment_date(params: &InstrumentParameters, index: u32) -> BondCalcResult<Option<NaiveDate>> {
    let Some(start) = params.start_date else {
        return Ok(None);
    };
    let months = params.payment_frequency.months_per_period() * index;
    start
        .checked_add_months(Months::new(months))
        .map(Some)
        .ok_or_else(|| {
            BondCalcError::DateError(format!(
                "payment date for period {index} is out of range ({start} + {months} months)"
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
