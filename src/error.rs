use std::fmt;

use wasm_bindgen::JsValue;

/// Everything that can stop a donation from turning into a claw cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DonationError {
    /// The amount field did not hold a whole number.
    InvalidAmount { raw: String, minimum: u32 },
    BelowMinimum { amount: u32, minimum: u32 },
    /// No payment widget could be reached.
    PaymentUnavailable,
    PaymentFailed { reason: String },
    Config(String),
}

impl DonationError {
    /// Text shown to the visitor in a notice. `None` for errors that stay in the console.
    pub fn notice(&self) -> Option<String> {
        match self {
            DonationError::InvalidAmount { minimum, .. } | DonationError::BelowMinimum { minimum, .. } => {
                Some(format!("Минимальная сумма доната — {minimum} ₽"))
            }
            DonationError::PaymentUnavailable => Some("Платёжный виджет недоступен, попробуйте позже".to_string()),
            DonationError::PaymentFailed { .. } => Some("Платёж не прошёл".to_string()),
            DonationError::Config(_) => None,
        }
    }
}

impl fmt::Display for DonationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DonationError::InvalidAmount { raw, .. } => write!(f, "donation amount {raw:?} is not a number"),
            DonationError::BelowMinimum { amount, minimum } => {
                write!(f, "donation amount {amount} is below the minimum of {minimum}")
            }
            DonationError::PaymentUnavailable => f.write_str("payment widget unavailable"),
            DonationError::PaymentFailed { reason } => write!(f, "payment failed: {reason}"),
            DonationError::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for DonationError {}

impl From<DonationError> for JsValue {
    fn from(err: DonationError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_carry_minimum_in_notice() {
        let err = DonationError::BelowMinimum { amount: 50, minimum: 100 };
        assert_eq!(err.notice().unwrap(), "Минимальная сумма доната — 100 ₽");
        assert!(err.to_string().contains("50"));
        let err = DonationError::InvalidAmount { raw: "abc".into(), minimum: 100 };
        assert!(err.notice().is_some());
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_config_errors_are_silent() {
        assert!(DonationError::Config("bad".into()).notice().is_none());
    }
}
