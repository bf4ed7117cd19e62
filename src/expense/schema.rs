//! The rules that every expense must follow.
//!
//! [ExpenseSchema] is shared by the form in [crate::client] and the API
//! handlers, so a field that passes in the form passes on the server and vice
//! versa. The server always validates again and never trusts the client.

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{
    Date, OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use unicode_segmentation::UnicodeSegmentation;

use crate::expense::Amount;

/// The fewest characters allowed in an expense title.
pub const TITLE_MIN_LENGTH: usize = 3;
/// The most characters allowed in an expense title.
pub const TITLE_MAX_LENGTH: usize = 100;
/// The most digits allowed after the decimal point of an amount.
pub const AMOUNT_MAX_DECIMAL_PLACES: usize = 2;
/// The most digits allowed before the decimal point of an amount.
pub const AMOUNT_MAX_INTEGER_DIGITS: usize = 10;

/// Calendar date format accepted as a shorthand for midnight UTC, e.g. "2024-01-31".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The fields of an expense that a user fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// What the money was spent on.
    Title,
    /// How much was spent.
    Amount,
    /// When the money was spent.
    Date,
}

impl Field {
    /// All fields in the order they appear in a form.
    pub const ALL: [Field; 3] = [Field::Title, Field::Amount, Field::Date];
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Amount => "amount",
            Field::Date => "date",
        };

        f.write_str(name)
    }
}

/// Why a single field failed validation.
///
/// The display text is shown to users as is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The field was left empty.
    #[error("This field is required")]
    Required,

    /// The text is shorter than allowed.
    #[error("Must be at least {min} characters")]
    TooShort {
        /// The minimum number of characters.
        min: usize,
    },

    /// The text is longer than allowed.
    #[error("Must be at most {max} characters")]
    TooLong {
        /// The maximum number of characters.
        max: usize,
    },

    /// The text is not a plain decimal number.
    #[error("Must be a number, e.g. 12.50")]
    NotANumber,

    /// The number is zero or negative.
    #[error("Must be greater than zero")]
    NotPositive,

    /// The number has too many digits after the decimal point.
    #[error("Must have at most {max} decimal places")]
    TooManyDecimalPlaces {
        /// The maximum number of decimal places.
        max: usize,
    },

    /// The number is larger than can be stored.
    #[error("Must be less than 10,000,000,000")]
    TooLarge,

    /// The text is neither a calendar date nor an RFC 3339 date-time.
    #[error("Must be a date such as 2024-01-31 or 2024-01-31T12:00:00Z")]
    InvalidDate,
}

impl Serialize for FieldError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Every field error found in one expense, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, Vec<FieldError>>);

impl ValidationErrors {
    /// Record that `field` failed with `error`.
    pub fn add(&mut self, field: Field, error: FieldError) {
        self.0.entry(field).or_default().push(error);
    }

    /// The errors recorded for `field`, if any.
    pub fn get(&self, field: Field) -> &[FieldError] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The fields that failed validation.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for (field, errors) in &self.0 {
            for error in errors {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {error}")?;
                first = false;
            }
        }

        Ok(())
    }
}

/// A validated expense title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseTitle(String);

impl ExpenseTitle {
    /// Create a title without validation.
    ///
    /// The caller should ensure the title is between [TITLE_MIN_LENGTH] and
    /// [TITLE_MAX_LENGTH] characters, e.g. because it was read back from the
    /// database.
    pub fn new_unchecked(title: &str) -> Self {
        Self(title.to_owned())
    }
}

impl AsRef<str> for ExpenseTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ExpenseTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// When the money for an expense was spent, always in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpenseDate(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl ExpenseDate {
    /// Wrap a date-time, converting it to UTC.
    pub fn new(date_time: OffsetDateTime) -> Self {
        Self(date_time.to_offset(UtcOffset::UTC))
    }

    /// The date-time in UTC.
    pub fn as_offset_date_time(&self) -> OffsetDateTime {
        self.0
    }
}

/// Check that `title` is between [TITLE_MIN_LENGTH] and [TITLE_MAX_LENGTH]
/// characters once surrounding whitespace is removed.
///
/// Characters are counted as the user sees them (grapheme clusters), so an
/// emoji with a skin tone modifier counts once.
///
/// # Errors
///
/// Returns [FieldError::Required], [FieldError::TooShort] or [FieldError::TooLong].
pub fn validate_title(title: &str) -> Result<ExpenseTitle, FieldError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(FieldError::Required);
    }

    let length = title.graphemes(true).count();

    if length < TITLE_MIN_LENGTH {
        Err(FieldError::TooShort {
            min: TITLE_MIN_LENGTH,
        })
    } else if length > TITLE_MAX_LENGTH {
        Err(FieldError::TooLong {
            max: TITLE_MAX_LENGTH,
        })
    } else {
        Ok(ExpenseTitle(title.to_owned()))
    }
}

/// Check that `amount` is a positive decimal with at most two decimal places.
///
/// # Errors
///
/// Returns a [FieldError] from [Amount::parse_decimal], or
/// [FieldError::NotPositive] for zero.
pub fn validate_amount(amount: &str) -> Result<Amount, FieldError> {
    let amount = Amount::parse_decimal(amount)?;

    if amount.cents() <= 0 {
        return Err(FieldError::NotPositive);
    }

    Ok(amount)
}

/// Check that `date` is an RFC 3339 date-time or a calendar date.
///
/// A calendar date such as "2024-01-31" means midnight UTC on that day.
///
/// # Errors
///
/// Returns [FieldError::Required] or [FieldError::InvalidDate].
pub fn validate_date(date: &str) -> Result<ExpenseDate, FieldError> {
    let date = date.trim();

    if date.is_empty() {
        return Err(FieldError::Required);
    }

    if let Ok(date_time) = OffsetDateTime::parse(date, &Rfc3339) {
        return Ok(ExpenseDate::new(date_time));
    }

    Date::parse(date, DATE_FORMAT)
        .map(|date| ExpenseDate::new(date.midnight().assume_utc()))
        .map_err(|_| FieldError::InvalidDate)
}

/// An expense as submitted by a client, before validation.
///
/// Missing and null fields default to empty strings so that they are
/// reported as field errors instead of failing the whole request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateExpense {
    /// What the money was spent on.
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    /// How much was spent. Accepts a JSON string or number.
    #[serde(default, deserialize_with = "string_number_or_null")]
    pub amount: String,
    /// When the money was spent.
    #[serde(default, deserialize_with = "string_or_null")]
    pub date: String,
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_number_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

/// An expense that has passed validation and is ready to be stored.
///
/// The owner is deliberately absent: it always comes from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewExpense {
    /// What the money was spent on.
    pub title: ExpenseTitle,
    /// How much was spent.
    pub amount: Amount,
    /// When the money was spent.
    pub date: ExpenseDate,
}

/// The shape of an expense: the single place field rules are defined.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseSchema;

impl ExpenseSchema {
    /// Validate the raw text of a single field.
    ///
    /// # Errors
    ///
    /// Returns the [FieldError] for `field` if `value` breaks its rules.
    pub fn validate_field(field: Field, value: &str) -> Result<(), FieldError> {
        match field {
            Field::Title => validate_title(value).map(|_| ()),
            Field::Amount => validate_amount(value).map(|_| ()),
            Field::Date => validate_date(value).map(|_| ()),
        }
    }

    /// Validate every field of `expense`.
    ///
    /// # Errors
    ///
    /// Returns every field error found, not just the first.
    pub fn validate(expense: &CreateExpense) -> Result<NewExpense, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = validate_title(&expense.title)
            .map_err(|error| errors.add(Field::Title, error))
            .ok();
        let amount = validate_amount(&expense.amount)
            .map_err(|error| errors.add(Field::Amount, error))
            .ok();
        let date = validate_date(&expense.date)
            .map_err(|error| errors.add(Field::Date, error))
            .ok();

        match (title, amount, date) {
            (Some(title), Some(amount), Some(date)) => Ok(NewExpense {
                title,
                amount,
                date,
            }),
            _ => Err(errors),
        }
    }
}
