//! Field derivation rules applied to create/update payloads
//!
//! Pure functions over a mutable payload. The quantity guard runs before
//! any mutation; the overdue markers are idempotent.

use crate::record::Record;
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const NUMBER_OF_SAMPLES: &str = "numberOfSamples";
pub const DUE_DATE: &str = "dueDate";
pub const OVERDUE_STATUS_ICON: &str = "overdueStatusIcon";
pub const SAMPLE_NAME: &str = "sampleName";

#[derive(Debug, Error, PartialEq)]
pub enum DerivationError {
    #[error("Number of Samples must be greater than zero")]
    NonPositiveQuantity(f64),
}

/// Source of "today" for the overdue rules.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A fixed date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Values written by the overdue rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub overdue: String,
    pub on_time: String,
    /// Suffix glyph for the name-marker variant
    pub name_glyph: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            overdue: "sap-icon://alert".to_string(),
            on_time: "sap-icon://accept".to_string(),
            name_glyph: "🔴".to_string(),
        }
    }
}

/// Which overdue mutation to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// Set `overdueStatusIcon`
    #[default]
    Icon,
    /// Append/strip a glyph on `sampleName`
    NameSuffix,
    Both,
}

/// When and how derivation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationPolicy {
    pub marker: MarkerStyle,
    /// Also run the rules on update payloads
    pub apply_on_update: bool,
    pub markers: Markers,
}

impl DerivationPolicy {
    /// Run every rule against a payload: guard first, then markers.
    pub fn apply(&self, payload: &mut Record, today: NaiveDate) -> Result<(), DerivationError> {
        validate_quantity(payload)?;
        if matches!(self.marker, MarkerStyle::Icon | MarkerStyle::Both) {
            apply_overdue_icon(payload, today, &self.markers);
        }
        if matches!(self.marker, MarkerStyle::NameSuffix | MarkerStyle::Both) {
            apply_name_marker(payload, today, &self.markers.name_glyph);
        }
        Ok(())
    }
}

/// Reject a payload whose `numberOfSamples.content` is present and ≤ 0.
pub fn validate_quantity(payload: &Record) -> Result<(), DerivationError> {
    let content = payload
        .reference(NUMBER_OF_SAMPLES)
        .and_then(|q| q.get("content"));

    let quantity = match content {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match quantity {
        Some(q) if q <= 0.0 => Err(DerivationError::NonPositiveQuantity(q)),
        _ => Ok(()),
    }
}

/// Set the status icon from the due date. Returns whether the rule ran.
pub fn apply_overdue_icon(payload: &mut Record, today: NaiveDate, markers: &Markers) -> bool {
    let Some(overdue) = is_overdue(payload, today) else {
        return false;
    };
    let icon = if overdue {
        &markers.overdue
    } else {
        &markers.on_time
    };
    payload.insert(OVERDUE_STATUS_ICON, icon.clone());
    true
}

/// Append `glyph` to the sample name when overdue, strip it otherwise.
/// Returns whether the name changed.
pub fn apply_name_marker(payload: &mut Record, today: NaiveDate, glyph: &str) -> bool {
    let Some(overdue) = is_overdue(payload, today) else {
        return false;
    };
    let Some(name) = payload.get_str(SAMPLE_NAME).filter(|n| !n.is_empty()) else {
        return false;
    };

    let suffix = format!(" {}", glyph);
    let renamed = match (overdue, name.strip_suffix(&suffix)) {
        (true, None) => format!("{}{}", name, suffix),
        (false, Some(stripped)) => stripped.to_string(),
        _ => return false,
    };
    payload.insert(SAMPLE_NAME, renamed);
    true
}

/// `Some(true)` when the payload's due date is strictly before `today`;
/// `None` when there is no usable due date.
fn is_overdue(payload: &Record, today: NaiveDate) -> Option<bool> {
    let raw = payload.get_str(DUE_DATE).filter(|s| !s.is_empty())?;
    match parse_due_date(raw) {
        Some(due) => Some(due < today),
        None => {
            tracing::warn!(due_date = raw, "unparseable due date, skipping overdue rule");
            None
        }
    }
}

/// Calendar date of a `YYYY-MM-DD` or RFC 3339 value.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
