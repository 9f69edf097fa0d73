//! Fixed-point money and minor-unit conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::MoneyError;

/// Nanos per whole currency unit.
pub const NANOS_PER_UNIT: i32 = 1_000_000_000;

/// Nanos per minor unit (cent).
pub const NANOS_PER_MINOR_UNIT: i32 = 10_000_000;

/// Minor units per whole currency unit.
pub const MINOR_UNITS_PER_UNIT: i64 = 100;

/// Count of the smallest currency subunit (cents for USD).
pub type MinorUnits = i64;

/// Money as whole units plus billionths of a unit.
///
/// `nanos` lies in `[-999_999_999, 999_999_999]` and carries the same sign as
/// `units` (or is zero). Only validated on conversion, so a request can still
/// carry an inconsistent value up to the point where it is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    /// Whole units of the currency
    #[schema(example = 100)]
    pub units: i64,
    /// Fractional part in billionths of a unit
    #[serde(default)]
    #[schema(example = 500000000)]
    pub nanos: i32,
    /// ISO 4217 currency code
    #[schema(example = "USD")]
    pub currency_code: String,
}

impl Money {
    /// Creates a Money value without validating it.
    pub fn new(units: i64, nanos: i32, currency_code: impl Into<String>) -> Self {
        Self {
            units,
            nanos,
            currency_code: currency_code.into(),
        }
    }

    /// Checks the nanos range and sign invariant.
    pub fn validate(&self) -> Result<(), MoneyError> {
        if self.nanos <= -NANOS_PER_UNIT || self.nanos >= NANOS_PER_UNIT {
            return Err(MoneyError::NanosOutOfRange(self.nanos));
        }
        if (self.units > 0 && self.nanos < 0) || (self.units < 0 && self.nanos > 0) {
            return Err(MoneyError::SignMismatch {
                units: self.units,
                nanos: self.nanos,
            });
        }
        Ok(())
    }

    /// Converts to minor units, truncating sub-cent fractions toward zero.
    pub fn to_minor_units(&self) -> Result<MinorUnits, MoneyError> {
        self.validate()?;

        let whole = self
            .units
            .checked_mul(MINOR_UNITS_PER_UNIT)
            .ok_or(MoneyError::Overflow)?;
        let fraction = i64::from(self.nanos / NANOS_PER_MINOR_UNIT);

        whole.checked_add(fraction).ok_or(MoneyError::Overflow)
    }

    /// Builds Money from minor units.
    ///
    /// Integer division and remainder both truncate toward zero, so `units`
    /// and `nanos` always share the sign of `minor` (`-5` becomes
    /// `{0, -50_000_000}`).
    pub fn from_minor_units(minor: MinorUnits, currency_code: impl Into<String>) -> Self {
        let units = minor / MINOR_UNITS_PER_UNIT;
        // |remainder| < 100, so the product always fits in an i32.
        let nanos = (minor % MINOR_UNITS_PER_UNIT) as i32 * NANOS_PER_MINOR_UNIT;

        Self {
            units,
            nanos,
            currency_code: currency_code.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_minor_units() {
            Ok(minor) => {
                let sign = if minor < 0 { "-" } else { "" };
                let abs = minor.unsigned_abs();
                write!(
                    f,
                    "{} {}{}.{:02}",
                    self.currency_code,
                    sign,
                    abs / MINOR_UNITS_PER_UNIT as u64,
                    abs % MINOR_UNITS_PER_UNIT as u64
                )
            }
            Err(_) => write!(f, "invalid"),
        }
    }
}

/// Converts optional money to minor units; an absent amount is an error.
pub fn to_minor_units(money: Option<&Money>) -> Result<MinorUnits, MoneyError> {
    money.ok_or(MoneyError::Missing)?.to_minor_units()
}

/// Human-readable rendering: `"USD 10.50"`, `"$0.00"` when absent and
/// `"invalid"` when the value cannot be converted.
pub fn format_money(money: Option<&Money>) -> String {
    match money {
        Some(m) => m.to_string(),
        None => "$0.00".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(units: i64, nanos: i32) -> Money {
        Money::new(units, nanos, "USD")
    }

    #[test]
    fn test_whole_units() {
        assert_eq!(usd(10, 0).to_minor_units().unwrap(), 1000);
    }

    #[test]
    fn test_units_and_nanos() {
        assert_eq!(usd(15, 500_000_000).to_minor_units().unwrap(), 1550);
    }

    #[test]
    fn test_nanos_only() {
        assert_eq!(usd(0, 990_000_000).to_minor_units().unwrap(), 99);
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(usd(-5, -250_000_000).to_minor_units().unwrap(), -525);
    }

    #[test]
    fn test_sub_cent_fraction_truncated() {
        assert_eq!(usd(1, 999_999_999).to_minor_units().unwrap(), 199);
        assert_eq!(usd(0, 9_999_999).to_minor_units().unwrap(), 0);
    }

    #[test]
    fn test_missing_amount_fails() {
        assert!(matches!(to_minor_units(None), Err(MoneyError::Missing)));
    }

    #[test]
    fn test_overflow_detected() {
        let result = usd(i64::MAX / 10, 0).to_minor_units();
        assert!(matches!(result, Err(MoneyError::Overflow)));

        let result = usd(i64::MAX / 100, 990_000_000).to_minor_units();
        assert!(matches!(result, Err(MoneyError::Overflow)));
    }

    #[test]
    fn test_sign_mismatch_rejected() {
        let result = usd(5, -250_000_000).to_minor_units();
        assert!(matches!(result, Err(MoneyError::SignMismatch { .. })));
    }

    #[test]
    fn test_nanos_out_of_range_rejected() {
        let result = usd(1, 1_000_000_000).to_minor_units();
        assert!(matches!(result, Err(MoneyError::NanosOutOfRange(_))));
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(Money::from_minor_units(1550, "USD"), usd(15, 500_000_000));
        assert_eq!(Money::from_minor_units(-525, "USD"), usd(-5, -250_000_000));
    }

    #[test]
    fn test_from_minor_units_negative_below_one_unit() {
        let money = Money::from_minor_units(-5, "USD");
        assert_eq!(money.units, 0);
        assert_eq!(money.nanos, -50_000_000);
        assert!(money.validate().is_ok());
    }

    #[test]
    fn test_round_trip_preserves_cent_precision() {
        for (units, nanos) in [
            (0, 0),
            (1, 10_000_000),
            (42, 990_000_000),
            (-3, -70_000_000),
            (0, -10_000_000),
            (1_000_000, 0),
        ] {
            let money = usd(units, nanos);
            let minor = money.to_minor_units().unwrap();
            assert_eq!(Money::from_minor_units(minor, "USD"), money);
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Some(&usd(10, 500_000_000))), "USD 10.50");
        assert_eq!(format_money(Some(&usd(0, -50_000_000))), "USD -0.05");
        assert_eq!(format_money(None), "$0.00");
        assert_eq!(format_money(Some(&usd(1, -1))), "invalid");
    }
}
