use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BondCalcError {
    /// Rejected by `InstrumentParameters::validate`
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Newton-Raphson hit its iteration cap or a flat derivative
    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    /// A decimal operation left the 96-bit mantissa range
    #[error("Numerical overflow in {context}")]
    NumericalOverflow { context: String },

    /// Payment date beyond the calendar range chrono can represent
    #[error("Date error: {0}")]
    DateError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_messages_name_the_failing_piece() {
        let err = BondCalcError::InvalidInput {
            field: "face_value".into(),
            reason: "must be positive".into(),
        };
        assert_eq!(err.to_string(), "Invalid input: face_value: must be positive");

        let err = BondCalcError::ConvergenceFailure {
            function: "irr".into(),
            iterations: 100,
            last_delta: dec!(0.5),
        };
        assert!(err.to_string().contains("after 100 iterations"));
    }
}
