//! Activity schema: the field definitions collected during a visit.
//!
//! An [`Activity`] carries the attributes every field shares (identity,
//! ordering, repetition) plus a [`FieldKind`] holding only the configuration
//! of its own field type. On the wire the schema is a flat camelCase JSON
//! array with a `fieldType` tag, matching what the schema editor stores.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Repetitions offered when `allowMultiple` is set without a `repeatCount`.
pub const DEFAULT_REPEAT_COUNT: u32 = 3;

/// Decimal places for calculated values without an explicit setting.
pub const DEFAULT_DECIMAL_PLACES: u32 = 2;

fn default_dosage_unit() -> String {
    "comprimidos".into()
}

// ============================================================================
// Field Types
// ============================================================================

/// Field type tag, without configuration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    TextShort,
    TextLong,
    NumberSimple,
    NumberCompound,
    SelectSingle,
    Boolean,
    Datetime,
    /// Legacy date-only field
    Date,
    /// Legacy time-only field
    Time,
    File,
    Calculated,
    MedicationTracking,
    Conditional,
    Unknown,
}

/// Ancillary configuration a field type needs in the schema editor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldRequirements {
    pub needs_options: bool,
    pub needs_unit: bool,
    pub needs_compound_fields: bool,
    pub needs_medication_config: bool,
}

impl FieldType {
    /// Which ancillary configuration applies to this field type
    pub fn requirements(self) -> FieldRequirements {
        FieldRequirements {
            needs_options: self == FieldType::SelectSingle,
            needs_unit: matches!(self, FieldType::NumberSimple | FieldType::Calculated),
            needs_compound_fields: self == FieldType::NumberCompound,
            needs_medication_config: self == FieldType::MedicationTracking,
        }
    }

    /// Wire name of the type (`fieldType` value)
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::TextShort => "text_short",
            FieldType::TextLong => "text_long",
            FieldType::NumberSimple => "number_simple",
            FieldType::NumberCompound => "number_compound",
            FieldType::SelectSingle => "select_single",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::File => "file",
            FieldType::Calculated => "calculated",
            FieldType::MedicationTracking => "medication_tracking",
            FieldType::Conditional => "conditional",
            FieldType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Field type plus the configuration that only that type carries
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "fieldType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FieldKind {
    TextShort,
    TextLong,
    NumberSimple,
    NumberCompound {
        #[serde(default)]
        compound_config: CompoundConfig,
    },
    SelectSingle {
        #[serde(default)]
        options: Vec<SelectOption>,
        #[serde(default)]
        select_multiple: bool,
    },
    Boolean,
    Datetime {
        datetime_include_date: Option<bool>,
        datetime_include_time: Option<bool>,
        require_date: Option<bool>,
        require_time: Option<bool>,
    },
    /// Older schemas stored date-only fields under their own tag
    Date,
    /// Older schemas stored time-only fields under their own tag
    Time,
    /// Only the selected file's name is stored as the value
    File,
    Calculated {
        calculation_formula: Option<String>,
        decimal_places: Option<u32>,
    },
    MedicationTracking {
        medication_tracking_config: Option<MedicationTrackingConfig>,
    },
    /// Declared by the schema editor but without trigger semantics yet.
    /// Renders and validates as a no-op.
    Conditional,
    /// A field type newer than this reader, kept verbatim so the schema
    /// serializes back unchanged
    #[serde(untagged)]
    Unknown {
        field_type: String,
        #[serde(flatten)]
        config: serde_json::Map<String, serde_json::Value>,
    },
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::TextShort => FieldType::TextShort,
            FieldKind::TextLong => FieldType::TextLong,
            FieldKind::NumberSimple => FieldType::NumberSimple,
            FieldKind::NumberCompound { .. } => FieldType::NumberCompound,
            FieldKind::SelectSingle { .. } => FieldType::SelectSingle,
            FieldKind::Boolean => FieldType::Boolean,
            FieldKind::Datetime { .. } => FieldType::Datetime,
            FieldKind::Date => FieldType::Date,
            FieldKind::Time => FieldType::Time,
            FieldKind::File => FieldType::File,
            FieldKind::Calculated { .. } => FieldType::Calculated,
            FieldKind::MedicationTracking { .. } => FieldType::MedicationTracking,
            FieldKind::Conditional => FieldType::Conditional,
            FieldKind::Unknown { .. } => FieldType::Unknown,
        }
    }

    /// A datetime field including both parts, required by default
    pub fn datetime() -> Self {
        FieldKind::Datetime {
            datetime_include_date: None,
            datetime_include_time: None,
            require_date: None,
            require_time: None,
        }
    }

    /// Numeric fields accept externally evaluated range rules
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::NumberSimple | FieldKind::NumberCompound { .. } | FieldKind::Calculated { .. }
        )
    }
}

/// One choice of a select field
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawSelectOption")]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Stored options may omit `value`, in which case it equals the label
#[derive(Deserialize)]
struct RawSelectOption {
    value: Option<String>,
    label: Option<String>,
}

impl From<RawSelectOption> for SelectOption {
    fn from(raw: RawSelectOption) -> Self {
        let label = raw.label.or_else(|| raw.value.clone()).unwrap_or_default();
        let value = raw.value.unwrap_or_else(|| label.clone());
        SelectOption { value, label }
    }
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Sub-fields of a compound numeric field (e.g. systolic/diastolic)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CompoundConfig {
    #[serde(default)]
    pub fields: Vec<CompoundSubField>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompoundSubField {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

// ============================================================================
// Medication Tracking
// ============================================================================

/// Prescribed dosing frequency
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyType {
    OnceDaily,
    TwiceDaily,
    ThreeDaily,
    EveryXHours,
    OnceWeekly,
}

impl FrequencyType {
    /// Doses per day for the frequencies with a fixed daily count
    pub fn doses_per_day(self) -> Option<u32> {
        match self {
            FrequencyType::OnceDaily => Some(1),
            FrequencyType::TwiceDaily => Some(2),
            FrequencyType::ThreeDaily => Some(3),
            FrequencyType::EveryXHours | FrequencyType::OnceWeekly => None,
        }
    }
}

/// Configuration of a medication-adherence field
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationTrackingConfig {
    pub medication_name: String,
    #[serde(default = "default_dosage_unit")]
    pub dosage_unit: String,
    pub quantity_per_dose: f64,
    pub frequency_type: FrequencyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_hours_interval: Option<u32>,
    /// Explicit override; derived from the frequency when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_daily_dose: Option<f64>,
    #[serde(default)]
    pub should_consume_on_delivery_day: bool,
    #[serde(default)]
    pub should_take_on_visit_day: bool,
}

impl MedicationTrackingConfig {
    pub fn new(
        medication_name: impl Into<String>,
        quantity_per_dose: f64,
        frequency_type: FrequencyType,
    ) -> Self {
        Self {
            medication_name: medication_name.into(),
            dosage_unit: default_dosage_unit(),
            quantity_per_dose,
            frequency_type,
            custom_hours_interval: None,
            expected_daily_dose: None,
            should_consume_on_delivery_day: false,
            should_take_on_visit_day: false,
        }
    }

    /// Units the patient should take per day, if it can be known.
    ///
    /// Uses the explicit override when present, otherwise
    /// `quantityPerDose × doses per day` for the fixed daily frequencies.
    /// `None` means adherence cannot be computed for this field.
    pub fn daily_dose(&self) -> Option<f64> {
        let dose = match self.expected_daily_dose {
            Some(dose) => dose,
            None => {
                let per_day = self.frequency_type.doses_per_day()?;
                self.quantity_per_dose * f64::from(per_day)
            }
        };
        (dose > 0.0).then_some(dose)
    }
}

// ============================================================================
// Activity
// ============================================================================

/// One field definition within a visit's data-collection schema
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub visit_id: String,
    pub order: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_date_per_measurement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_time_per_measurement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_interval_minutes: Option<u32>,
    #[serde(flatten)]
    pub field: FieldKind,
}

/// Which parts of a date/time answer a field collects and requires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateTimeParts {
    pub include_date: bool,
    pub include_time: bool,
    pub require_date: bool,
    pub require_time: bool,
}

impl Activity {
    /// Create an activity with a fresh id, ordered first until placed with [`push_activity`]
    pub fn new(visit_id: impl Into<String>, name: impl Into<String>, field: FieldKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            visit_id: visit_id.into(),
            order: 0,
            name: name.into(),
            description: None,
            required: false,
            measurement_unit: None,
            help_text: None,
            allow_multiple: false,
            repeat_count: None,
            require_date_per_measurement: None,
            require_time_per_measurement: None,
            time_interval_minutes: None,
            field,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field.field_type()
    }

    /// Number of repetition slots to render and iterate
    ///
    /// Repeatable activities always get exactly `repeatCount` slots (default 3),
    /// however many already hold values.
    pub fn repetition_slots(&self) -> usize {
        if self.allow_multiple {
            self.repeat_count.unwrap_or(DEFAULT_REPEAT_COUNT).max(1) as usize
        } else {
            1
        }
    }

    /// Whether each repetition has its own date answer
    pub fn date_per_measurement(&self) -> bool {
        self.allow_multiple && self.require_date_per_measurement.unwrap_or(true)
    }

    /// Whether each repetition has its own time answer
    pub fn time_per_measurement(&self) -> bool {
        self.allow_multiple && self.require_time_per_measurement.unwrap_or(true)
    }

    /// Store key of the date answer for a repetition
    ///
    /// `{id}_date_{index}` per measurement, `{id}_date` when shared.
    pub fn date_key(&self, index: usize) -> String {
        if self.date_per_measurement() {
            format!("{}_date_{}", self.id, index)
        } else {
            format!("{}_date", self.id)
        }
    }

    /// Store key of the time answer for a repetition
    pub fn time_key(&self, index: usize) -> String {
        if self.time_per_measurement() {
            format!("{}_time_{}", self.id, index)
        } else {
            format!("{}_time", self.id)
        }
    }

    /// Minute interval between repetitions, when times are derived
    pub fn derived_time_interval(&self) -> Option<u32> {
        if self.allow_multiple && self.time_per_measurement() {
            self.time_interval_minutes.filter(|m| *m > 0)
        } else {
            None
        }
    }

    /// Repetitions after the first are read-only when their time is derived
    pub fn is_time_read_only(&self, index: usize) -> bool {
        index > 0 && self.derived_time_interval().is_some()
    }

    /// Date/time parts for datetime-like fields, `None` for everything else
    pub fn datetime_parts(&self) -> Option<DateTimeParts> {
        match &self.field {
            FieldKind::Datetime {
                datetime_include_date,
                datetime_include_time,
                require_date,
                require_time,
            } => Some(DateTimeParts {
                include_date: datetime_include_date.unwrap_or(true),
                include_time: datetime_include_time.unwrap_or(true),
                require_date: require_date.unwrap_or(true),
                require_time: require_time.unwrap_or(true),
            }),
            FieldKind::Date => Some(DateTimeParts {
                include_date: true,
                include_time: false,
                require_date: true,
                require_time: false,
            }),
            FieldKind::Time => Some(DateTimeParts {
                include_date: false,
                include_time: true,
                require_date: false,
                require_time: true,
            }),
            _ => None,
        }
    }

    /// Medication configuration, for medication-tracking fields that have one
    pub fn medication_config(&self) -> Option<&MedicationTrackingConfig> {
        match &self.field {
            FieldKind::MedicationTracking {
                medication_tracking_config,
            } => medication_tracking_config.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Schema helpers
// ============================================================================

/// Activities in display order
///
/// Sorted by `order`; equal orders keep their insertion order.
pub fn sort_activities(activities: &[Activity]) -> Vec<&Activity> {
    let mut sorted: Vec<&Activity> = activities.iter().collect();
    sorted.sort_by_key(|a| a.order);
    sorted
}

/// Order value that places a new activity after every existing one
pub fn next_order(activities: &[Activity]) -> i64 {
    activities.iter().map(|a| a.order).max().map_or(0, |max| max + 1)
}

/// Append an activity at the end of the schema
pub fn push_activity(activities: &mut Vec<Activity>, mut activity: Activity) {
    activity.order = next_order(activities);
    activities.push(activity);
}

/// Parse a schema document (a JSON array of activities)
///
/// Anomalies from [`schema_warnings`] are logged once here, not on every
/// evaluation.
pub fn parse_schema(json: &str) -> Result<Vec<Activity>> {
    let activities: Vec<Activity> = serde_json::from_str(json)?;
    for warning in schema_warnings(&activities) {
        tracing::warn!("{}", warning);
    }
    Ok(activities)
}

/// Anomalies that leave a schema usable but limit what it can compute
pub fn schema_warnings(activities: &[Activity]) -> Vec<String> {
    let mut warnings = Vec::new();

    for activity in activities {
        match &activity.field {
            FieldKind::Unknown { field_type, .. } => {
                warnings.push(format!(
                    "Activity '{}': field type '{}' is not understood by this reader",
                    activity.id, field_type
                ));
            }
            FieldKind::MedicationTracking {
                medication_tracking_config: Some(config),
            } if config.daily_dose().is_none() => {
                warnings.push(format!(
                    "Activity '{}': no computable daily dose for {:?}, adherence will not be calculated",
                    activity.id, config.frequency_type
                ));
            }
            _ => {}
        }
    }

    warnings
}

/// Whether an unknown-kind tag names a known field type whose
/// configuration failed to parse
fn is_known_tag(field_type: &str) -> bool {
    serde_json::from_value::<FieldType>(serde_json::Value::String(field_type.to_string()))
        .map_or(false, |t| t != FieldType::Unknown)
}

/// Load a schema document from a file
pub fn load_schema(path: &Path) -> Result<Vec<Activity>> {
    let contents = std::fs::read_to_string(path)?;
    let activities = parse_schema(&contents)
        .map_err(|e| Error::Schema(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded {} activities from {:?}", activities.len(), path);
    Ok(activities)
}

/// Report structural problems in a schema
///
/// Returns an empty list for a usable schema. Problems are reported,
/// never fatal: the schema editor decides what to do with them.
pub fn check_schema(activities: &[Activity]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for activity in activities {
        let id = &activity.id;

        if !seen.insert(id.as_str()) {
            errors.push(format!("Activity '{}': duplicate id", id));
        }

        if activity.allow_multiple && activity.repeat_count == Some(0) {
            errors.push(format!(
                "Activity '{}': repeatCount must be at least 1",
                id
            ));
        }

        match &activity.field {
            FieldKind::SelectSingle { options, .. } if options.is_empty() => {
                errors.push(format!("Activity '{}': select field has no options", id));
            }
            FieldKind::NumberCompound { compound_config } if compound_config.fields.is_empty() => {
                errors.push(format!(
                    "Activity '{}': compound field has no sub-fields",
                    id
                ));
            }
            FieldKind::MedicationTracking {
                medication_tracking_config: None,
            } => {
                errors.push(format!(
                    "Activity '{}': medication field has no configuration",
                    id
                ));
            }
            FieldKind::MedicationTracking {
                medication_tracking_config: Some(config),
            } if config.quantity_per_dose <= 0.0 => {
                errors.push(format!(
                    "Activity '{}': quantityPerDose must be greater than 0",
                    id
                ));
            }
            FieldKind::Unknown { field_type, .. } if is_known_tag(field_type) => {
                errors.push(format!(
                    "Activity '{}': malformed configuration for field type '{}'",
                    id, field_type
                ));
            }
            FieldKind::Unknown { field_type, .. } => {
                errors.push(format!(
                    "Activity '{}': unknown field type '{}'",
                    id, field_type
                ));
            }
            _ => {}
        }
    }

    errors
}
