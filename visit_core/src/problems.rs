//! Protocol-deviation detection for medication fields.
//!
//! Rules are evaluated in a fixed order and every applicable rule fires:
//!
//! 1. Dose due on the visit day but not taken (error)
//! 2. Dose taken on the visit day against protocol (error)
//! 3. Adherence below the low threshold (warning)
//! 4. Adherence between the low threshold and the expected level (warning)
//! 5. Adherence above the expected level (warning)
//! 6. More units returned than delivered (error)
//!
//! Rules 3–6 need an adherence result; without one only 1–2 can fire.

use crate::adherence::AdherenceResult;
use crate::config::AdherenceConfig;
use crate::schema::MedicationTrackingConfig;
use crate::validation::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a deviation rule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProblemId {
    ShouldTakeTodayNotTaken,
    ShouldNotTakeTodayTaken,
    LowAdherence,
    AdherenceBelowExpected,
    HighAdherence,
    ReturnedExceedsDelivered,
}

impl ProblemId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemId::ShouldTakeTodayNotTaken => "should_take_today_not_taken",
            ProblemId::ShouldNotTakeTodayTaken => "should_not_take_today_taken",
            ProblemId::LowAdherence => "low_adherence",
            ProblemId::AdherenceBelowExpected => "adherence_below_expected",
            ProblemId::HighAdherence => "high_adherence",
            ProblemId::ReturnedExceedsDelivered => "returned_exceeds_delivered",
        }
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A detected deviation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub id: ProblemId,
    pub message: String,
    pub severity: Severity,
}

impl Problem {
    fn new(id: ProblemId, severity: Severity, message: String) -> Self {
        Self {
            id,
            message,
            severity,
        }
    }
}

/// Classifies medication answers into deviation findings
#[derive(Clone, Debug, Default)]
pub struct ProblemDetector {
    thresholds: AdherenceConfig,
}

impl ProblemDetector {
    pub fn new(thresholds: AdherenceConfig) -> Self {
        Self { thresholds }
    }

    /// Detect every deviation that applies, in rule order
    pub fn detect(
        &self,
        config: &MedicationTrackingConfig,
        took_medication_today: bool,
        adherence: Option<&AdherenceResult>,
    ) -> Vec<Problem> {
        let mut problems = Vec::new();
        let medication = &config.medication_name;

        if config.should_take_on_visit_day && !took_medication_today {
            problems.push(Problem::new(
                ProblemId::ShouldTakeTodayNotTaken,
                Severity::Error,
                format!(
                    "{} should have been taken on the visit day but was not",
                    medication
                ),
            ));
        }

        if !config.should_take_on_visit_day && took_medication_today {
            problems.push(Problem::new(
                ProblemId::ShouldNotTakeTodayTaken,
                Severity::Error,
                format!(
                    "{} was taken on the visit day although the protocol says not to",
                    medication
                ),
            ));
        }

        let Some(result) = adherence else {
            return problems;
        };

        let pct = result.adherence_percentage;
        let low = self.thresholds.low_threshold;
        let expected = self.thresholds.expected_threshold;

        if pct < low {
            problems.push(Problem::new(
                ProblemId::LowAdherence,
                Severity::Warning,
                format!(
                    "Low adherence: {:.1}% (below {:.1}%). Consumed {:.1} of {:.1} expected {}",
                    pct,
                    low,
                    result.adjusted_consumption,
                    result.expected_total_dose,
                    config.dosage_unit
                ),
            ));
        } else if pct < expected {
            problems.push(Problem::new(
                ProblemId::AdherenceBelowExpected,
                Severity::Warning,
                format!(
                    "Adherence below expected: {:.1}% (expected {:.1}%). \
                     Consumed {:.1} of {:.1} expected {}",
                    pct,
                    expected,
                    result.adjusted_consumption,
                    result.expected_total_dose,
                    config.dosage_unit
                ),
            ));
        }

        if pct > expected {
            problems.push(Problem::new(
                ProblemId::HighAdherence,
                Severity::Warning,
                format!(
                    "Adherence above expected: {:.1}%. Consumed {:.1} of {:.1} expected {}",
                    pct,
                    result.adjusted_consumption,
                    result.expected_total_dose,
                    config.dosage_unit
                ),
            ));
        }

        if result.real_consumption < 0.0 {
            problems.push(Problem::new(
                ProblemId::ReturnedExceedsDelivered,
                Severity::Error,
                format!(
                    "Returned units ({}) exceed delivered units ({}) by {} {}",
                    result.returned,
                    result.delivered,
                    -result.real_consumption,
                    config.dosage_unit
                ),
            ));
        }

        problems
    }
}

/// Detect deviations with the default adherence thresholds
pub fn detect(
    config: &MedicationTrackingConfig,
    took_medication_today: bool,
    adherence: Option<&AdherenceResult>,
) -> Vec<Problem> {
    ProblemDetector::default().detect(config, took_medication_today, adherence)
}
