//! Amortisation schedules and issuer/investor yield analytics for bonds and
//! loans, computed in `rust_decimal` throughout.
//!
//! The engine is a pure function of [`InstrumentParameters`]: it holds no
//! state between calls and performs no I/O.

pub mod amortization;
pub mod error;
pub mod time_value;
pub mod types;

pub use amortization::{InstrumentParameters, PaymentFrequency};
pub use error::BondCalcError;
pub use types::*;

/// Standard result type for all bondcalc operations
pub type BondCalcResult<T> = Result<T, BondCalcError>;
