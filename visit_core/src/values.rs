//! Runtime answers for one visit-filling session.
//!
//! [`FormValues`] maps a field key to its current answer. Keys are the bare
//! activity id for whole-field answers (repeated measurements are stored as an
//! array under that id), or derived `{id}_date[_{index}]` / `{id}_time[_{index}]`
//! keys for split date/time answers.
//!
//! Entries are reference counted: a snapshot taken with `clone` shares every
//! unchanged answer with the live store, and writes always install a new
//! value instead of mutating one in place. A snapshot handed to validation or
//! adherence code can never observe a later edit.

use crate::schema::{Activity, FieldKind};
use crate::time_codec;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Field values
// ============================================================================

/// A single answer: primitive, repeated (array) or compound (object)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Whether the answer counts as not given
    ///
    /// Missing, blank text, `false`, NaN, and empty arrays/objects are empty.
    /// Zero is a real measurement and is not.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Bool(b) => !b,
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Map(fields) => fields.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the answer, parsing text the way form inputs are read
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if !n.is_nan() => Some(*n),
            FieldValue::Text(s) => parse_float(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => s == "true",
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Map(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn at(&self, index: usize) -> Option<&FieldValue> {
        match self {
            FieldValue::List(items) => items.get(index),
            _ => None,
        }
    }

    /// The answer as it would appear in a text input
    pub fn to_input_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str(""),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(_) | FieldValue::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.into())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Parse the leading decimal number of a string
///
/// Leading whitespace is skipped and parsing stops at the first character
/// that cannot continue the number, so `"12.5 mg"` reads as 12.5.
/// Returns `None` when no digits lead the string.
pub fn parse_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when followed by at least one digit
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

// ============================================================================
// Medication sub-answers
// ============================================================================

/// Sub-answers of a medication-tracking field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MedicationField {
    LastVisitDate,
    UnitsDelivered,
    UnitsReturned,
    TookMedicationToday,
}

impl MedicationField {
    pub const ALL: [MedicationField; 4] = [
        MedicationField::LastVisitDate,
        MedicationField::UnitsDelivered,
        MedicationField::UnitsReturned,
        MedicationField::TookMedicationToday,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MedicationField::LastVisitDate => "lastVisitDate",
            MedicationField::UnitsDelivered => "unitsDelivered",
            MedicationField::UnitsReturned => "unitsReturned",
            MedicationField::TookMedicationToday => "tookMedicationToday",
        }
    }
}

/// Typed view of a medication-tracking answer
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MedicationAnswer {
    pub last_visit_date: String,
    pub units_delivered: String,
    pub units_returned: String,
    pub took_medication_today: bool,
}

impl MedicationAnswer {
    /// No input has been given yet
    pub fn is_blank(&self) -> bool {
        self.last_visit_date.trim().is_empty()
            && self.units_delivered.trim().is_empty()
            && self.units_returned.trim().is_empty()
            && !self.took_medication_today
    }

    /// Read the sub-answers from a stored object, missing ones as empty
    pub fn from_value(value: Option<&FieldValue>) -> Self {
        let read = |field: MedicationField| {
            value
                .and_then(|v| v.get(field.key()))
                .map(FieldValue::to_input_string)
                .unwrap_or_default()
        };

        Self {
            last_visit_date: read(MedicationField::LastVisitDate),
            units_delivered: read(MedicationField::UnitsDelivered),
            units_returned: read(MedicationField::UnitsReturned),
            took_medication_today: value
                .and_then(|v| v.get(MedicationField::TookMedicationToday.key()))
                .map(FieldValue::as_bool)
                .unwrap_or(false),
        }
    }
}

// ============================================================================
// Form value store
// ============================================================================

/// Keyed answers for one visit
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FormValues {
    entries: BTreeMap<String, Arc<FieldValue>>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Current answer under `key`, if one was ever set
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key).map(Arc::as_ref)
    }

    /// Whether two stores hold the same allocation for `key`
    pub fn shares_entry(&self, other: &FormValues, key: &str) -> bool {
        match (self.entries.get(key), other.entries.get(key)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Answer for an activity's bare key, or its type-appropriate empty value
    pub fn value_or_default(&self, activity: &Activity) -> FieldValue {
        self.get(&activity.id)
            .cloned()
            .unwrap_or_else(|| empty_value(activity))
    }

    /// Overwrite the answer under `key`
    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.entries
            .remove(key)
            .map(|value| Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Set one sub-field of a compound answer, keeping its siblings
    pub fn set_compound_field(&mut self, id: &str, subfield: &str, value: FieldValue) {
        let merged = merge_field(self.get(id), subfield, value);
        self.set(id, merged);
    }

    /// Answer of repetition `index` of a repeated measurement
    pub fn repetition(&self, id: &str, index: usize) -> Option<&FieldValue> {
        self.get(id).and_then(|v| v.at(index))
    }

    /// Set repetition `index` of a repeated measurement
    ///
    /// The stored array is copied, written at `index` (padding skipped slots
    /// with nulls) and stored back whole under `id`.
    pub fn set_repetition(&mut self, id: &str, index: usize, value: FieldValue) {
        let mut items = match self.get(id) {
            Some(FieldValue::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        if items.len() <= index {
            items.resize(index + 1, FieldValue::Null);
        }
        items[index] = value;
        self.set(id, FieldValue::List(items));
    }

    /// Set one sub-field of a compound answer inside a repeated measurement
    pub fn set_repeated_compound_field(
        &mut self,
        id: &str,
        index: usize,
        subfield: &str,
        value: FieldValue,
    ) {
        let merged = merge_field(self.repetition(id, index), subfield, value);
        self.set_repetition(id, index, merged);
    }

    /// Date answer of a repetition (shared or per measurement)
    pub fn date(&self, activity: &Activity, index: usize) -> String {
        self.get(&activity.date_key(index))
            .map(FieldValue::to_input_string)
            .unwrap_or_default()
    }

    pub fn set_date(&mut self, activity: &Activity, index: usize, date: &str) {
        self.set(activity.date_key(index), FieldValue::text(date));
    }

    /// Time answer of a repetition
    ///
    /// Derived repetitions report the first repetition's time shifted by
    /// `timeIntervalMinutes × index`, whatever is stored under their key.
    pub fn time(&self, activity: &Activity, index: usize) -> String {
        if let (true, Some(interval)) = (index > 0, activity.derived_time_interval()) {
            let first = self.time(activity, 0);
            return time_codec::add_minutes(&first, i64::from(interval) * index as i64);
        }

        self.get(&activity.time_key(index))
            .map(|v| time_codec::normalize(&v.to_input_string()))
            .unwrap_or_default()
    }

    /// Store a time answer, normalized to `HH:MM`
    ///
    /// Writes to derived repetitions are ignored. Setting the first
    /// repetition of an interval-scheduled activity also stores the derived
    /// times of every later repetition.
    pub fn set_time(&mut self, activity: &Activity, index: usize, raw: &str) {
        if activity.is_time_read_only(index) {
            tracing::debug!(
                "Ignoring time for derived repetition {} of '{}'",
                index,
                activity.id
            );
            return;
        }

        let time = time_codec::normalize(raw);
        self.set(activity.time_key(index), FieldValue::text(time.clone()));

        if let (0, Some(interval)) = (index, activity.derived_time_interval()) {
            for slot in 1..activity.repetition_slots() {
                let derived = time_codec::add_minutes(&time, i64::from(interval) * slot as i64);
                tracing::debug!(
                    "Derived time {} for repetition {} of '{}'",
                    derived,
                    slot,
                    activity.id
                );
                self.set(activity.time_key(slot), FieldValue::text(derived));
            }
        }
    }

    /// Typed medication sub-answers of an activity
    pub fn medication(&self, id: &str) -> MedicationAnswer {
        MedicationAnswer::from_value(self.get(id))
    }

    /// Set a medication sub-answer
    ///
    /// Returned units larger than the delivered units are clamped to the
    /// delivered amount, so over-return is never stored.
    pub fn set_medication_field(&mut self, id: &str, field: MedicationField, value: FieldValue) {
        let value = match field {
            MedicationField::UnitsReturned => {
                let delivered = self.medication(id).units_delivered;
                match (value.as_f64(), parse_float(&delivered)) {
                    (Some(returned), Some(limit)) if returned > limit => {
                        tracing::debug!(
                            "Clamping returned units {} to delivered {} for '{}'",
                            returned,
                            limit,
                            id
                        );
                        FieldValue::Text(delivered)
                    }
                    _ => value,
                }
            }
            _ => value,
        };

        self.set_compound_field(id, field.key(), value);
    }

    /// Parse a JSON values snapshot
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON values snapshot from a file
    ///
    /// A missing file is an empty session.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No values file at {:?}, starting empty", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }
}

fn merge_field(existing: Option<&FieldValue>, subfield: &str, value: FieldValue) -> FieldValue {
    let mut fields = match existing {
        Some(FieldValue::Map(fields)) => fields.clone(),
        _ => BTreeMap::new(),
    };
    fields.insert(subfield.to_string(), value);
    FieldValue::Map(fields)
}

/// Empty answer matching the storage shape of an activity's bare key
pub fn empty_value(activity: &Activity) -> FieldValue {
    if activity.allow_multiple {
        return FieldValue::List(Vec::new());
    }

    match &activity.field {
        FieldKind::Boolean => FieldValue::Bool(false),
        FieldKind::NumberCompound { .. } | FieldKind::MedicationTracking { .. } => {
            FieldValue::Map(BTreeMap::new())
        }
        FieldKind::SelectSingle {
            select_multiple: true,
            ..
        } => FieldValue::List(Vec::new()),
        _ => FieldValue::Text(String::new()),
    }
}
