#![forbid(unsafe_code)]

//! Core schema and computation engine for clinical visit data capture.
//!
//! This crate provides:
//! - The activity schema (field types and their configuration)
//! - The runtime answer store, with split date/time keys and repetitions
//! - Per-field validation
//! - Medication adherence calculation and protocol-deviation detection
//!
//! Everything here is synchronous and in-memory. A presentation layer calls
//! in after each edit and re-derives validation and adherence from the
//! current snapshot of answers.

pub mod error;
pub mod config;
pub mod logging;
pub mod time_codec;
pub mod schema;
pub mod options;
pub mod values;
pub mod validation;
pub mod clock;
pub mod adherence;
pub mod problems;
pub mod calculated;
pub mod review;
pub mod visit;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use config::Config;
pub use schema::{
    check_schema, load_schema, parse_schema, schema_warnings, sort_activities, Activity, FieldKind,
    FieldType, FrequencyType, MedicationTrackingConfig, SelectOption,
};
pub use values::{FieldValue, FormValues, MedicationAnswer, MedicationField};
pub use validation::{ActivityRule, Severity, ValidationError};
pub use clock::{Clock, SystemClock};
pub use adherence::AdherenceResult;
pub use problems::{Problem, ProblemDetector, ProblemId};
pub use review::{ProblemReview, ReviewLog};
pub use visit::{evaluate_visit, MedicationReport, VisitReport};
