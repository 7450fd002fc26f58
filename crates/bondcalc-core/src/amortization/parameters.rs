use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BondCalcError;
use crate::types::{Currency, Money, Rate};
use crate::BondCalcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How often the instrument pays. Each variant maps to a fixed number of
/// periods per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentFrequency {
    Annually,
    SemiAnnually,
    Quadrimester,
    Quarterly,
    Bimonthly,
    Monthly,
}

impl PaymentFrequency {
    pub const ALL: [PaymentFrequency; 6] = [
        PaymentFrequency::Annually,
        PaymentFrequency::SemiAnnually,
        PaymentFrequency::Quadrimester,
        PaymentFrequency::Quarterly,
        PaymentFrequency::Bimonthly,
        PaymentFrequency::Monthly,
    ];

    pub fn periods_per_year(self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::Bimonthly => 6,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::Quadrimester => 3,
            PaymentFrequency::SemiAnnually => 2,
            PaymentFrequency::Annually => 1,
        }
    }

    /// Calendar months between two consecutive payments.
    pub fn months_per_period(self) -> u32 {
        12 / self.periods_per_year()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentFrequency::Annually => "annually",
            PaymentFrequency::SemiAnnually => "semi-annually",
            PaymentFrequency::Quadrimester => "quadrimester",
            PaymentFrequency::Quarterly => "quarterly",
            PaymentFrequency::Bimonthly => "bimonthly",
            PaymentFrequency::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentFrequency {
    type Err = BondCalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase().replace('_', "-");
        PaymentFrequency::ALL
            .into_iter()
            .find(|f| f.as_str() == normalised)
            .ok_or_else(|| BondCalcError::InvalidInput {
                field: "payment_frequency".into(),
                reason: format!(
                    "Unknown frequency '{s}'; expected one of annually, semi-annually, \
                     quadrimester, quarterly, bimonthly, monthly"
                ),
            })
    }
}

/// Everything the engine needs to build a schedule. Immutable once handed
/// over; the engine trusts it and does not re-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentParameters {
    /// Nominal amount to be amortised (e.g. 100000)
    pub face_value: Money,
    /// Issue / purchase price. Issuer proceeds and investor outlay derive from it.
    pub market_value: Money,
    /// Annual coupon rate as a decimal (0.08 = 8%)
    pub coupon_rate: Rate,
    /// Annual cost of capital (COK) used to discount for NPV, as a decimal
    pub cost_of_capital: Rate,
    /// Term in whole years
    pub term_in_years: u32,
    pub payment_frequency: PaymentFrequency,
    /// Issuer flotation / placement costs as a fraction of market value
    #[serde(default)]
    pub issuer_initial_costs: Rate,
    /// Extra repayment at maturity as a fraction of face value
    #[serde(default)]
    pub redemption_premium: Rate,
    /// Periods with no payment; interest capitalises into the balance
    #[serde(default)]
    pub total_grace_periods: u32,
    /// Interest-only periods following the total-grace periods
    #[serde(default)]
    pub partial_grace_periods: u32,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
    /// Issue date; when present each period is labelled with a payment date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl InstrumentParameters {
    pub fn periods_per_year(&self) -> u32 {
        self.payment_frequency.periods_per_year()
    }

    /// Saturates instead of overflowing; terms past [`MAX_TERM_IN_YEARS`]
    /// are refused by `validate` and by the schedule generator.
    pub fn total_periods(&self) -> u32 {
        self.term_in_years.saturating_mul(self.periods_per_year())
    }

    /// Annual coupon rate scaled to one payment period.
    pub fn periodic_coupon_rate(&self) -> Rate {
        self.coupon_rate / Decimal::from(self.periods_per_year())
    }

    /// Annual cost of capital scaled to one payment period.
    pub fn periodic_cost_of_capital(&self) -> Rate {
        self.cost_of_capital / Decimal::from(self.periods_per_year())
    }

    /// Opt-in check for input collaborators. The engine never calls this.
    ///
    /// Grace counts that exceed the term are deliberately accepted; the
    /// schedule clamps them.
    pub fn validate(&self) -> BondCalcResult<()> {
        if self.face_value <= Decimal::ZERO {
            return Err(BondCalcError::InvalidInput {
                field: "face_value".into(),
                reason: "Face value must be positive.".into(),
            });
        }
        if self.market_value < Decimal::ZERO {
            return Err(BondCalcError::InvalidInput {
                field: "market_value".into(),
                reason: "Market value must be non-negative.".into(),
            });
        }
        if self.coupon_rate < Decimal::ZERO {
            return Err(BondCalcError::InvalidInput {
                field: "coupon_rate".into(),
                reason: "Coupon rate must be non-negative.".into(),
            });
        }
        if self.cost_of_capital < Decimal::ZERO {
            return Err(BondCalcError::InvalidInput {
                field: "cost_of_capital".into(),
                reason: "Cost of capital must be non-negative.".into(),
            });
        }
        for (field, value) in [
            ("issuer_initial_costs", self.issuer_initial_costs),
            ("redemption_premium", self.redemption_premium),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(BondCalcError::InvalidInput {
                    field: field.into(),
                    reason: "Must be a fraction between 0 and 1 (0.02 = 2%).".into(),
                });
            }
        }
        if self.term_in_years == 0 {
            return Err(BondCalcError::InvalidInput {
                field: "term_in_years".into(),
                reason: "Term must be at least one year.".into(),
            });
        }
        check_term(self.term_in_years)
    }
}

/// Upper bound on the term; 100 years of monthly payments is 1200 periods.
pub const MAX_TERM_IN_YEARS: u32 = 100;

pub(crate) fn check_term(term_in_years: u32) -> BondCalcResult<()> {
    if term_in_years > MAX_TERM_IN_YEARS {
        return Err(BondCalcError::InvalidInput {
            field: "term_in_years".into(),
            reason: format!("Term must not exceed {MAX_TERM_IN_YEARS} years."),
        });
    }
    Ok(())
}
