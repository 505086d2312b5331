use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::brew_method::BrewMethod;
use crate::error::{FieldError, ValidationError};

pub const MIN_WATER_TEMP: i32 = 80;
pub const MAX_WATER_TEMP: i32 = 212;
pub const MIN_BREW_TIME: i32 = 30;
pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// The user-editable part of a brew entry.
///
/// This is what a form produces: an entry that has not been persisted yet
/// and so has no id or timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrewFields {
    pub coffee_type: String,
    pub brew_method: BrewMethod,
    pub grind_size: String,
    /// Degrees Fahrenheit
    pub water_temp: i32,
    /// Seconds
    pub brew_time: i32,
    pub ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub rating: i32,
}

impl BrewFields {
    /// Creates fields with the form defaults: 200°F, 4 minutes, 1:15, three stars.
    pub fn new(
        coffee_type: impl Into<String>,
        brew_method: BrewMethod,
        grind_size: impl Into<String>,
    ) -> Self {
        Self {
            coffee_type: coffee_type.into(),
            brew_method,
            grind_size: grind_size.into(),
            water_temp: 200,
            brew_time: 240,
            ratio: "1:15".to_string(),
            notes: None,
            rating: 3,
        }
    }

    pub fn with_water_temp(mut self, fahrenheit: i32) -> Self {
        self.water_temp = fahrenheit;
        self
    }

    pub fn with_brew_time(mut self, seconds: i32) -> Self {
        self.brew_time = seconds;
        self
    }

    pub fn with_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.ratio = ratio.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }

    /// Checks every field and reports all failures at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.coffee_type.trim().is_empty() {
            errors.push(FieldError::new("coffee_type", "Coffee type is required"));
        }
        if self.grind_size.trim().is_empty() {
            errors.push(FieldError::new("grind_size", "Grind size is required"));
        }
        if self.ratio.trim().is_empty() {
            errors.push(FieldError::new("ratio", "Ratio is required"));
        }
        if !(MIN_WATER_TEMP..=MAX_WATER_TEMP).contains(&self.water_temp) {
            errors.push(FieldError::new(
                "water_temp",
                format!(
                    "Water temperature must be between {}°F and {}°F",
                    MIN_WATER_TEMP, MAX_WATER_TEMP
                ),
            ));
        }
        if self.brew_time < MIN_BREW_TIME {
            errors.push(FieldError::new(
                "brew_time",
                format!("Brew time must be at least {} seconds", MIN_BREW_TIME),
            ));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            errors.push(FieldError::new(
                "rating",
                format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(errors))
        }
    }
}

/// A persisted brew entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrewEntry {
    pub id: String,
    #[serde(flatten)]
    pub fields: BrewFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrewEntry {
    /// Stamps a draft with its id; both timestamps are set to `now`.
    pub fn new(id: impl Into<String>, fields: BrewFields, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the editable fields, keeping `id` and `created_at`.
    ///
    /// `updated_at` never moves backwards, even if the clock does.
    pub fn updated(mut self, fields: BrewFields, now: DateTime<Utc>) -> Self {
        self.fields = fields;
        self.updated_at = now.max(self.updated_at);
        self
    }
}

/// Formats seconds the way the journal shows them: "4m 0s" or "45s".
pub fn format_brew_time(seconds: i32) -> String {
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, remaining)
    } else {
        format!("{}s", seconds)
    }
}

impl fmt::Display for BrewEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = &self.fields;
        writeln!(f, "{} ({})", fields.coffee_type, fields.brew_method)?;
        writeln!(f, "{}", "=".repeat(30))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Grind: {}", fields.grind_size)?;
        writeln!(f, "Water: {}°F", fields.water_temp)?;
        writeln!(f, "Time: {}", format_brew_time(fields.brew_time))?;
        writeln!(f, "Ratio: {}", fields.ratio)?;

        let stars = fields.rating.clamp(0, MAX_RATING) as usize;
        writeln!(
            f,
            "Rating: {}{}",
            "★".repeat(stars),
            "☆".repeat(MAX_RATING as usize - stars)
        )?;

        if let Some(notes) = fields.notes.as_deref().filter(|n| !n.is_empty()) {
            writeln!(f, "\nNotes: {}", notes)?;
        }

        write!(
            f,
            "\nBrewed on {}",
            self.created_at.format("%b %-d, %Y %H:%M")
        )
    }
}

/// Narrows a listing to one brew method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrewFilter {
    #[default]
    All,
    Method(BrewMethod),
}

impl BrewFilter {
    pub fn matches(&self, entry: &BrewEntry) -> bool {
        match self {
            BrewFilter::All => true,
            BrewFilter::Method(method) => entry.fields.brew_method == *method,
        }
    }
}

impl From<Option<BrewMethod>> for BrewFilter {
    fn from(method: Option<BrewMethod>) -> Self {
        method.map_or(BrewFilter::All, BrewFilter::Method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn yirgacheffe() -> BrewFields {
        BrewFields::new("Ethiopian Yirgacheffe", BrewMethod::PourOver, "Medium-Fine")
            .with_water_temp(200)
            .with_brew_time(240)
            .with_ratio("1:15")
            .with_rating(4)
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 7, 30, 0).unwrap()
    }

    #[test]
    fn test_fields_defaults() {
        let fields = BrewFields::new("House Blend", BrewMethod::Chemex, "Medium");
        assert_eq!(fields.water_temp, 200);
        assert_eq!(fields.brew_time, 240);
        assert_eq!(fields.ratio, "1:15");
        assert_eq!(fields.rating, 3);
        assert!(fields.notes.is_none());
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let low = yirgacheffe().with_water_temp(80).with_brew_time(30).with_rating(1);
        assert!(low.validate().is_ok());

        let high = yirgacheffe().with_water_temp(212).with_rating(5);
        assert!(high.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_every_field() {
        let fields = BrewFields {
            coffee_type: "  ".to_string(),
            brew_method: BrewMethod::Espresso,
            grind_size: String::new(),
            water_temp: 75,
            brew_time: 29,
            ratio: String::new(),
            notes: None,
            rating: 6,
        };

        let err = fields.validate().unwrap_err();
        let names: Vec<&str> = err.errors().iter().map(|e| e.field).collect();
        assert_eq!(
            names,
            vec!["coffee_type", "grind_size", "ratio", "water_temp", "brew_time", "rating"]
        );
    }

    #[test]
    fn test_validate_rejects_boiling_over() {
        let err = yirgacheffe().with_water_temp(213).validate().unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert!(err.to_string().contains("between 80°F and 212°F"));
    }

    #[test]
    fn test_new_entry_has_equal_timestamps() {
        let entry = BrewEntry::new("1", yirgacheffe(), fixed_time());
        assert_eq!(entry.created_at, entry.updated_at);
        assert_eq!(entry.id, "1");
    }

    #[test]
    fn test_updated_keeps_identity() {
        let created = fixed_time();
        let entry = BrewEntry::new("abc", yirgacheffe(), created);

        let later = created + Duration::minutes(5);
        let updated = entry.updated(yirgacheffe().with_rating(5), later);

        assert_eq!(updated.id, "abc");
        assert_eq!(updated.created_at, created);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.fields.rating, 5);
    }

    #[test]
    fn test_updated_never_moves_backwards() {
        let created = fixed_time();
        let entry = BrewEntry::new("abc", yirgacheffe(), created);

        let earlier = created - Duration::hours(1);
        let updated = entry.updated(yirgacheffe(), earlier);
        assert_eq!(updated.updated_at, created);
    }

    #[test]
    fn test_entry_json_is_flat() {
        let entry = BrewEntry::new("1700000000000", yirgacheffe(), fixed_time());
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["id"], "1700000000000");
        assert_eq!(json["coffee_type"], "Ethiopian Yirgacheffe");
        assert_eq!(json["brew_method"], "Pour Over");
        assert_eq!(json["water_temp"], 200);
        assert_eq!(json["created_at"], "2025-03-14T07:30:00Z");
        assert!(json.get("notes").is_none());
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_entry_without_id_does_not_decode() {
        let json = r#"{"coffee_type":"Kenya AA","brew_method":"V60","grind_size":"Fine",
            "water_temp":205,"brew_time":180,"ratio":"1:16","rating":5,
            "created_at":"2025-01-01T00:00:00Z","updated_at":"2025-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<BrewEntry>(json).is_err());
    }

    #[test]
    fn test_format_brew_time() {
        assert_eq!(format_brew_time(240), "4m 0s");
        assert_eq!(format_brew_time(95), "1m 35s");
        assert_eq!(format_brew_time(45), "45s");
    }

    #[test]
    fn test_entry_display() {
        let entry = BrewEntry::new("42", yirgacheffe().with_notes("Bright, floral"), fixed_time());
        let output = format!("{}", entry);

        assert!(output.contains("Ethiopian Yirgacheffe (Pour Over)"));
        assert!(output.contains("Time: 4m 0s"));
        assert!(output.contains("Rating: ★★★★☆"));
        assert!(output.contains("Notes: Bright, floral"));
        assert!(output.contains("Brewed on Mar 14, 2025 07:30"));
    }

    #[test]
    fn test_filter_matches() {
        let entry = BrewEntry::new("1", yirgacheffe(), fixed_time());
        assert!(BrewFilter::All.matches(&entry));
        assert!(BrewFilter::Method(BrewMethod::PourOver).matches(&entry));
        assert!(!BrewFilter::Method(BrewMethod::Espresso).matches(&entry));
        assert_eq!(BrewFilter::from(None), BrewFilter::All);
    }
}
