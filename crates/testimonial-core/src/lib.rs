use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::{datetime, format_description};
use time::{Date, Duration, OffsetDateTime, UtcOffset};

/// Storage key the widget has always used for submitted recommendations.
pub const DEFAULT_STORAGE_KEY: &str = "staticRecommendations";

#[derive(Debug, Clone, Copy, thiserror::Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Please fill in both fields.")]
    EmptyName,
    #[error("Please fill in both fields.")]
    EmptyText,
}

/// Why a persisted record was rejected while reading the store.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum RecordError {
    #[error("stored record has an empty name")]
    EmptyName,
    #[error("stored record has an empty text")]
    EmptyText,
    #[error("stored record date `{0}` is not a timestamp")]
    InvalidDate(String),
    #[error("record date cannot be formatted: {0}")]
    Format(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Builtin,
    Submitted,
}

impl Origin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Submitted => "submitted",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "builtin" => Some(Self::Builtin),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Recommendation {
    pub name: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub origin: Origin,
}

impl Recommendation {
    /// Build a visitor submission from already validated input.
    #[must_use]
    pub fn submitted(submission: ValidatedSubmission, date: OffsetDateTime) -> Self {
        Self {
            name: submission.name,
            text: submission.text,
            date: round_up_to_millis(date),
            origin: Origin::Submitted,
        }
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.origin == Origin::Builtin
    }
}

/// A testimonial compiled into the widget.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BuiltinRecommendation {
    pub name: &'static str,
    pub text: &'static str,
    pub date: OffsetDateTime,
}

impl BuiltinRecommendation {
    #[must_use]
    pub fn to_recommendation(&self) -> Recommendation {
        Recommendation {
            name: self.name.to_string(),
            text: self.text.to_string(),
            date: self.date,
            origin: Origin::Builtin,
        }
    }
}

pub const BUILTIN_RECOMMENDATIONS: &[BuiltinRecommendation] = &[
    BuiltinRecommendation {
        name: "Alex R.",
        text: "Nishant's expertise in React and system design is unparalleled. He's a true asset to any complex project.",
        date: datetime!(2025-01-15 0:00 UTC),
    },
    BuiltinRecommendation {
        name: "Sarah K.",
        text: "The architectural solutions Nishant provided significantly improved our application's performance and scalability. Highly recommend!",
        date: datetime!(2025-02-28 0:00 UTC),
    },
    BuiltinRecommendation {
        name: "J. Miller (CTO)",
        text: "A dedicated engineer who consistently delivers clean, efficient, and well-tested code. A pleasure to work with.",
        date: datetime!(2025-03-10 0:00 UTC),
    },
];

/// Persisted shape of a submitted recommendation. Dates are kept as text
/// because the backing store only holds strings.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StoredRecommendation {
    pub name: String,
    pub text: String,
    pub date: String,
}

impl StoredRecommendation {
    /// # Errors
    /// Returns [`RecordError::Format`] when the date falls outside the
    /// representable timestamp range.
    pub fn from_recommendation(record: &Recommendation) -> Result<Self, RecordError> {
        Ok(Self {
            name: record.name.clone(),
            text: record.text.clone(),
            date: format_timestamp(record.date)?,
        })
    }

    /// Check the record against the persisted schema.
    ///
    /// # Errors
    /// Returns a [`RecordError`] for blank fields or an unparseable date.
    pub fn validate(&self) -> Result<OffsetDateTime, RecordError> {
        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }
        if self.text.trim().is_empty() {
            return Err(RecordError::EmptyText);
        }
        parse_timestamp(&self.date).ok_or_else(|| RecordError::InvalidDate(self.date.clone()))
    }

    /// # Errors
    /// Returns a [`RecordError`] when [`StoredRecommendation::validate`] fails.
    pub fn into_recommendation(self) -> Result<Recommendation, RecordError> {
        let date = self.validate()?;
        Ok(Recommendation { name: self.name, text: self.text, date, origin: Origin::Submitted })
    }
}

/// Trimmed, non-empty form input ready to become a recommendation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValidatedSubmission {
    name: String,
    text: String,
}

impl ValidatedSubmission {
    /// # Errors
    /// Returns [`ValidationError`] when either field is blank after trimming.
    pub fn parse(name: &str, text: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let text = text.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Self { name: name.to_string(), text: text.to_string() })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Format a timestamp the way it is persisted: UTC, millisecond precision.
///
/// # Errors
/// Returns [`RecordError::Format`] when the year cannot be written.
pub fn format_timestamp(value: OffsetDateTime) -> Result<String, RecordError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .map_err(|err| RecordError::Format(err.to_string()))
}

/// Parse a persisted timestamp. Accepts RFC 3339 and bare calendar dates,
/// the latter read as midnight UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed.to_offset(UtcOffset::UTC));
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Advance to the next whole millisecond, so the result is never earlier
/// than `value` and survives [`format_timestamp`] unchanged.
#[must_use]
pub fn round_up_to_millis(value: OffsetDateTime) -> OffsetDateTime {
    match value.nanosecond() % 1_000_000 {
        0 => value,
        sub_millis => value + Duration::nanoseconds(i64::from(1_000_000 - sub_millis)),
    }
}

/// Stable newest-first ordering; equal dates keep their input order.
pub fn sort_newest_first(records: &mut [Recommendation]) {
    records.sort_by(|left, right| right.date.cmp(&left.date));
}

/// Concatenate built-ins and stored records (in that order) and sort.
#[must_use]
pub fn merge_recommendations(
    builtins: &[BuiltinRecommendation],
    stored: Vec<Recommendation>,
) -> Vec<Recommendation> {
    let mut merged =
        builtins.iter().map(BuiltinRecommendation::to_recommendation).collect::<Vec<_>>();
    merged.extend(stored);
    sort_newest_first(&mut merged);
    merged
}

/// Parse a raw stored value into submitted recommendations, in storage
/// order. Any shape or field mismatch rejects the whole value.
///
/// # Errors
/// Returns [`StoredValueError`] describing the first problem found.
pub fn parse_stored_value(raw: &str) -> Result<Vec<Recommendation>, StoredValueError> {
    let records: Vec<StoredRecommendation> =
        serde_json::from_str(raw).map_err(|err| StoredValueError::Shape(err.to_string()))?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record.into_recommendation().map_err(|source| StoredValueError::Record { index, source })
        })
        .collect()
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum StoredValueError {
    #[error("stored value is not a list of recommendations: {0}")]
    Shape(String),
    #[error("stored recommendation {index} is invalid: {source}")]
    Record { index: usize, source: RecordError },
}
