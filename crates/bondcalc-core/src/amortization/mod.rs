pub mod analysis;
pub mod cash_flows;
pub mod metrics;
pub mod parameters;
pub mod schedule;

#[cfg(feature = "price_yield")]
pub mod price_yield;

pub use analysis::{
    analyze_bond, calculate_amortization, calculate_investor_metrics, AmortizationOutput,
    BondAnalysis,
};
pub use parameters::{InstrumentParameters, PaymentFrequency};

#[cfg(feature = "price_yield")]
pub use analysis::calculate_price_yield_curve;
