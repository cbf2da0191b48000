//! Error type shared by every calculator.

use std::fmt;

/// Error returned when a calculator precondition is violated.
///
/// Never caught inside the crate: it always reaches the caller so the
/// presentation layer can surface a message naming the offending input.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// An input is outside its valid domain or would produce NaN/Inf.
    InvalidInput {
        /// Name of the offending input (e.g., `"irradiance_kwh_m2_day"`).
        field: &'static str,
        /// Human-readable constraint description.
        message: String,
    },
}

impl ForecastError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Name of the input that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidInput { field, .. } => field,
        }
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, message } => {
                write!(f, "invalid input: {field} {message}")
            }
        }
    }
}

impl std::error::Error for ForecastError {}

/// Checks that `value` is finite and `> 0`.
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<f64, ForecastError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ForecastError::invalid(field, format!("must be > 0, got {value}")))
    }
}

/// Checks that `value` is finite and `>= 0`.
pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> Result<f64, ForecastError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ForecastError::invalid(field, format!("must be >= 0, got {value}")))
    }
}

/// Checks that `value` lies in the half-open unit interval `(0, 1]`.
pub(crate) fn ensure_unit_fraction(field: &'static str, value: f64) -> Result<f64, ForecastError> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ForecastError::invalid(
            field,
            format!("must be in (0, 1], got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_field() {
        let err = ForecastError::invalid("capex", "must be >= 0, got -1");
        assert_eq!(err.to_string(), "invalid input: capex must be >= 0, got -1");
        assert_eq!(err.field(), "capex");
    }

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(ensure_positive("x", 0.0).is_err());
        assert!(ensure_positive("x", f64::NAN).is_err());
        assert!(ensure_positive("x", f64::INFINITY).is_err());
        assert_eq!(ensure_positive("x", 2.5), Ok(2.5));
    }

    #[test]
    fn unit_fraction_bounds() {
        assert!(ensure_unit_fraction("x", 0.0).is_err());
        assert!(ensure_unit_fraction("x", 1.01).is_err());
        assert!(ensure_unit_fraction("x", f64::NAN).is_err());
        assert_eq!(ensure_unit_fraction("x", 1.0), Ok(1.0));
    }
}
