//! Per-field validation of a visit's answers.
//!
//! Every activity is checked on its own: required fields must hold a value,
//! compound fields need every sub-field, and date/time fields need each part
//! they collect. Range rules are evaluated by whoever owns them; the engine
//! only folds those already-evaluated errors into the matching numeric fields.

use crate::schema::{sort_activities, Activity, FieldKind};
use crate::values::{FieldValue, FormValues, MedicationField};
use serde::{Deserialize, Serialize};

const REQUIRED_MESSAGE: &str = "This field is required";

/// How strongly a rule violation should be treated
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Kind of check a rule performs
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    Required,
    Range,
    #[serde(other)]
    Other,
}

/// A rule attached to an activity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivityRule {
    pub condition: RuleCondition,
    pub severity: Severity,
    pub message: String,
}

impl ActivityRule {
    pub fn required(message: impl Into<String>) -> Self {
        Self {
            condition: RuleCondition::Required,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// One violated rule for one activity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub activity_id: String,
    pub activity_name: String,
    /// Store key (or `{id}-{index}` / `{key}.{subfield}` address) that failed
    #[serde(default)]
    pub field_key: String,
    pub rule: ActivityRule,
    #[serde(default)]
    pub current_value: FieldValue,
}

impl ValidationError {
    fn required(
        activity: &Activity,
        field_key: String,
        message: impl Into<String>,
        current_value: Option<&FieldValue>,
    ) -> Self {
        Self {
            activity_id: activity.id.clone(),
            activity_name: activity.name.clone(),
            field_key,
            rule: ActivityRule::required(message),
            current_value: current_value.cloned().unwrap_or_default(),
        }
    }
}

/// Validate every activity against the current answers
///
/// Errors come out grouped by activity, in display order. `external`
/// holds already-evaluated rule results (e.g. range checks); those that
/// belong to a numeric activity in the schema are merged in after its
/// required-field errors, the rest are dropped.
pub fn evaluate(
    activities: &[Activity],
    values: &FormValues,
    external: &[ValidationError],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for activity in sort_activities(activities) {
        errors.extend(required_errors(activity, values));

        if activity.field.is_numeric() {
            errors.extend(
                external
                    .iter()
                    .filter(|e| e.activity_id == activity.id)
                    .cloned(),
            );
        }
    }

    tracing::debug!(
        "Validated {} activities: {} errors",
        activities.len(),
        errors.len()
    );
    errors
}

/// Errors belonging to one activity
pub fn errors_for<'a>(
    errors: &'a [ValidationError],
    activity_id: &'a str,
) -> impl Iterator<Item = &'a ValidationError> + 'a {
    errors.iter().filter(move |e| e.activity_id == activity_id)
}

/// Whether the errors should block submission
///
/// Errors always block; warnings only when the caller's policy says so.
pub fn blocks_submission(errors: &[ValidationError], warnings_block: bool) -> bool {
    errors
        .iter()
        .any(|e| e.rule.severity == Severity::Error || warnings_block)
}

/// Required-field violations of a single activity
pub fn required_errors(activity: &Activity, values: &FormValues) -> Vec<ValidationError> {
    if !activity.required {
        return Vec::new();
    }

    match &activity.field {
        FieldKind::TextShort
        | FieldKind::TextLong
        | FieldKind::NumberSimple
        | FieldKind::Boolean
        | FieldKind::File
        | FieldKind::SelectSingle { .. } => scalar_errors(activity, values),
        FieldKind::NumberCompound { compound_config } => {
            let mut errors = Vec::new();
            for slot in 0..activity.repetition_slots() {
                let (slot_key, slot_value) = slot_entry(activity, values, slot);
                for sub in &compound_config.fields {
                    let current = slot_value.and_then(|v| v.get(&sub.name));
                    if current.map_or(true, FieldValue::is_empty) {
                        errors.push(ValidationError::required(
                            activity,
                            format!("{}.{}", slot_key, sub.name),
                            format!("{} is required", sub.label),
                            current,
                        ));
                    }
                }
            }
            errors
        }
        FieldKind::Datetime { .. } | FieldKind::Date | FieldKind::Time => {
            datetime_errors(activity, values)
        }
        FieldKind::MedicationTracking { .. } => medication_errors(activity, values),
        FieldKind::Calculated { .. } | FieldKind::Conditional | FieldKind::Unknown { .. } => {
            Vec::new()
        }
    }
}

/// Key and stored answer of one repetition slot
fn slot_entry<'a>(
    activity: &Activity,
    values: &'a FormValues,
    slot: usize,
) -> (String, Option<&'a FieldValue>) {
    if activity.allow_multiple {
        (
            format!("{}-{}", activity.id, slot),
            values.repetition(&activity.id, slot),
        )
    } else {
        (activity.id.clone(), values.get(&activity.id))
    }
}

fn scalar_errors(activity: &Activity, values: &FormValues) -> Vec<ValidationError> {
    (0..activity.repetition_slots())
        .filter_map(|slot| {
            let (key, current) = slot_entry(activity, values, slot);
            current
                .map_or(true, FieldValue::is_empty)
                .then(|| ValidationError::required(activity, key, REQUIRED_MESSAGE, current))
        })
        .collect()
}

fn datetime_errors(activity: &Activity, values: &FormValues) -> Vec<ValidationError> {
    let Some(parts) = activity.datetime_parts() else {
        return Vec::new();
    };

    let mut errors = Vec::new();
    let mut checked: Vec<String> = Vec::new();

    for slot in 0..activity.repetition_slots() {
        if parts.include_date && parts.require_date {
            let key = activity.date_key(slot);
            if !checked.contains(&key) {
                if values.date(activity, slot).trim().is_empty() {
                    errors.push(ValidationError::required(
                        activity,
                        key.clone(),
                        "Date is required",
                        values.get(&key),
                    ));
                }
                checked.push(key);
            }
        }

        if parts.include_time && parts.require_time {
            let key = activity.time_key(slot);
            if !checked.contains(&key) {
                if values.time(activity, slot).trim().is_empty() {
                    errors.push(ValidationError::required(
                        activity,
                        key.clone(),
                        "Time is required",
                        values.get(&key),
                    ));
                }
                checked.push(key);
            }
        }
    }

    errors
}

fn medication_errors(activity: &Activity, values: &FormValues) -> Vec<ValidationError> {
    let stored = values.get(&activity.id);
    let answer = values.medication(&activity.id);

    let inputs = [
        (
            MedicationField::LastVisitDate,
            answer.last_visit_date.as_str(),
            "Last visit date is required",
        ),
        (
            MedicationField::UnitsDelivered,
            answer.units_delivered.as_str(),
            "Delivered units are required",
        ),
        (
            MedicationField::UnitsReturned,
            answer.units_returned.as_str(),
            "Returned units are required",
        ),
    ];

    inputs
        .into_iter()
        .filter(|(_, input, _)| input.trim().is_empty())
        .map(|(field, _, message)| {
            ValidationError::required(
                activity,
                format!("{}.{}", activity.id, field.key()),
                message,
                stored.and_then(|v| v.get(field.key())),
            )
        })
        .collect()
}
