//! Fixed-point money amounts.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::expense::schema::{AMOUNT_MAX_DECIMAL_PLACES, AMOUNT_MAX_INTEGER_DIGITS, FieldError};

/// An amount of money stored as a whole number of cents.
///
/// Amounts are written out as a decimal string with exactly two decimal places,
/// e.g. `"12.50"`, both in JSON and in the database. Keeping the value as an
/// integer means sums never pick up floating-point error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    cents: i64,
}

impl Amount {
    /// An amount of zero, e.g. the total of no expenses.
    pub const ZERO: Amount = Amount { cents: 0 };

    /// Create an amount from a number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// The amount as a number of cents.
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Add two amounts, returning `None` on overflow.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.cents.checked_add(other.cents).map(Amount::from_cents)
    }

    /// Subtract `other` from this amount, returning `None` on overflow.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.cents.checked_sub(other.cents).map(Amount::from_cents)
    }

    /// Parse a non-negative decimal string such as `"12"`, `"12.5"` or `"12.50"`.
    ///
    /// This only checks the syntax of the number. Whether zero is allowed is
    /// up to the caller, see [crate::expense::validate_amount].
    ///
    /// # Errors
    ///
    /// Returns a [FieldError] describing the first problem found with `text`.
    pub fn parse_decimal(text: &str) -> Result<Self, FieldError> {
        let text = text.trim();

        if text.is_empty() {
            return Err(FieldError::Required);
        }

        if let Some(rest) = text.strip_prefix('-') {
            return match Self::parse_decimal(rest) {
                Ok(_) => Err(FieldError::NotPositive),
                Err(error) => Err(error),
            };
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => {
                if fraction.is_empty() {
                    return Err(FieldError::NotANumber);
                }

                (whole, fraction)
            }
            None => (text, ""),
        };

        let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());

        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
            return Err(FieldError::NotANumber);
        }

        if fraction.len() > AMOUNT_MAX_DECIMAL_PLACES {
            return Err(FieldError::TooManyDecimalPlaces {
                max: AMOUNT_MAX_DECIMAL_PLACES,
            });
        }

        let whole = whole.trim_start_matches('0');

        if whole.len() > AMOUNT_MAX_INTEGER_DIGITS {
            return Err(FieldError::TooLarge);
        }

        // At most ten digits, so this fits in an i64 with room for the cents.
        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| FieldError::NotANumber)?
        };

        let fraction_value: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| FieldError::NotANumber)? * 10,
            _ => fraction.parse().map_err(|_| FieldError::NotANumber)?,
        };

        Ok(Self::from_cents(whole_value * 100 + fraction_value))
    }
}

impl FromStr for Amount {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse_decimal(s)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let cents = self.cents.unsigned_abs();

        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}
