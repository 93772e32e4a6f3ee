use crate::error::DonationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strictly positive donation amount.
///
/// Wraps `rust_decimal::Decimal` so that a zero or negative donation can never
/// reach a subscription. The amount doubles as the subscription quantity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a new `Amount`.
    ///
    /// # Errors
    ///
    /// Returns `DonationError::ValidationError` if `value` is zero or negative.
    pub fn new(value: Decimal) -> Result<Self, DonationError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(DonationError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Returns the underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DonationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = DonationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| {
            DonationError::ValidationError(format!("Invalid amount '{}': {}", s, e))
        })?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
