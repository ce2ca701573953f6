//! Whole-visit evaluation.
//!
//! Runs validation over every activity and adherence plus problem detection
//! over every medication field, from one snapshot of the answers. Nothing is
//! cached: callers re-run this after each edit.

use crate::adherence::{self, AdherenceResult};
use crate::clock::Clock;
use crate::problems::{Problem, ProblemDetector};
use crate::schema::{sort_activities, Activity};
use crate::validation::{self, ValidationError};
use crate::values::FormValues;
use serde::Serialize;

/// Adherence outcome of one medication field
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationReport {
    pub activity_id: String,
    pub activity_name: String,
    pub medication_name: String,
    pub dosage_unit: String,
    pub took_medication_today: bool,
    /// `None` until the answers allow a computation
    pub adherence: Option<AdherenceResult>,
    pub problems: Vec<Problem>,
}

/// Everything derived from one snapshot of a visit's answers
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitReport {
    pub errors: Vec<ValidationError>,
    pub medications: Vec<MedicationReport>,
}

impl VisitReport {
    /// Whether submission should be blocked under the given warning policy
    pub fn blocks_submission(&self, warnings_block: bool) -> bool {
        validation::blocks_submission(&self.errors, warnings_block)
    }

    pub fn problem_count(&self) -> usize {
        self.medications.iter().map(|m| m.problems.len()).sum()
    }
}

/// Evaluate one medication activity
///
/// `None` for activities that are not medication fields or have no
/// configuration yet. Problems are only detected once the answer has at
/// least one input.
pub fn evaluate_medication(
    activity: &Activity,
    values: &FormValues,
    clock: &dyn Clock,
    detector: &ProblemDetector,
) -> Option<MedicationReport> {
    let config = activity.medication_config()?;
    let answer = values.medication(&activity.id);

    if config.daily_dose().is_none() {
        tracing::debug!(
            "Medication field '{}' has no computable daily dose ({:?})",
            activity.id,
            config.frequency_type
        );
    }

    let adherence = adherence::compute(&answer, config, clock);

    // Nothing to judge until the reviewer has started on this field
    let problems = if answer.is_blank() {
        Vec::new()
    } else {
        detector.detect(config, answer.took_medication_today, adherence.as_ref())
    };

    Some(MedicationReport {
        activity_id: activity.id.clone(),
        activity_name: activity.name.clone(),
        medication_name: config.medication_name.clone(),
        dosage_unit: config.dosage_unit.clone(),
        took_medication_today: answer.took_medication_today,
        adherence,
        problems,
    })
}

/// Evaluate every activity of a visit against a snapshot of its answers
pub fn evaluate_visit(
    activities: &[Activity],
    values: &FormValues,
    external_errors: &[ValidationError],
    clock: &dyn Clock,
    detector: &ProblemDetector,
) -> VisitReport {
    let errors = validation::evaluate(activities, values, external_errors);

    let medications = sort_activities(activities)
        .into_iter()
        .filter_map(|activity| evaluate_medication(activity, values, clock, detector))
        .collect();

    VisitReport {
        errors,
        medications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::ProblemId;
    use crate::schema::{FieldKind, FrequencyType, MedicationTrackingConfig};
    use crate::values::MedicationField;
    use chrono::NaiveDate;

    fn medication_activity(id: &str, order: i64, frequency: FrequencyType) -> Activity {
        let mut config = MedicationTrackingConfig::new("Drug A", 1.0, frequency);
        config.should_consume_on_delivery_day = true;

        let mut activity = Activity::new(
            "visit-1",
            "Study drug",
            FieldKind::MedicationTracking {
                medication_tracking_config: Some(config),
            },
        );
        activity.id = id.into();
        activity.order = order;
        activity.required = true;
        activity
    }

    fn answered(values: &mut FormValues, id: &str, returned: &str, took_today: bool) {
        values.set_medication_field(id, MedicationField::LastVisitDate, "2024-01-01".into());
        values.set_medication_field(id, MedicationField::UnitsDelivered, "20".into());
        values.set_medication_field(id, MedicationField::UnitsReturned, returned.into());
        values.set_medication_field(id, MedicationField::TookMedicationToday, took_today.into());
    }

    #[test]
    fn test_visit_report_combines_validation_and_adherence() {
        crate::logging::init_test();

        let activities = vec![
            medication_activity("med-b", 2, FrequencyType::TwiceDaily),
            medication_activity("med-a", 1, FrequencyType::TwiceDaily),
        ];

        let mut values = FormValues::new();
        answered(&mut values, "med-b", "4", true);

        let visit_day = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let report = evaluate_visit(
            &activities,
            &values,
            &[],
            &visit_day,
            &ProblemDetector::default(),
        );

        // med-a has no answers: three required inputs missing, no adherence yet
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.medications[0].activity_id, "med-a");
        assert!(report.medications[0].adherence.is_none());
        assert!(report.medications[0].problems.is_empty());

        let med_b = &report.medications[1];
        assert_eq!(med_b.adherence.as_ref().unwrap().adherence_percentage, 70.0);
        let ids: Vec<ProblemId> = med_b.problems.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![ProblemId::ShouldNotTakeTodayTaken, ProblemId::LowAdherence]
        );
        assert_eq!(report.problem_count(), 2);
        assert!(report.blocks_submission(false));
    }

    #[test]
    fn test_medication_without_daily_dose_reports_no_adherence() {
        let activity = medication_activity("med", 0, FrequencyType::EveryXHours);
        let mut values = FormValues::new();
        answered(&mut values, "med", "4", false);

        let report = evaluate_medication(
            &activity,
            &values,
            &NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            &ProblemDetector::default(),
        )
        .unwrap();

        assert!(report.adherence.is_none());
        assert!(report.problems.is_empty());
    }

    #[test]
    fn test_visit_day_rules_wait_for_first_input() {
        let mut activity = medication_activity("med", 0, FrequencyType::OnceDaily);
        if let FieldKind::MedicationTracking {
            medication_tracking_config: Some(config),
        } = &mut activity.field
        {
            config.should_take_on_visit_day = true;
        }
        let visit_day = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let detector = ProblemDetector::default();

        let mut values = FormValues::new();
        let untouched = evaluate_medication(&activity, &values, &visit_day, &detector).unwrap();
        assert!(untouched.problems.is_empty());

        values.set_medication_field("med", MedicationField::UnitsDelivered, "10".into());
        let started = evaluate_medication(&activity, &values, &visit_day, &detector).unwrap();
        let ids: Vec<ProblemId> = started.problems.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProblemId::ShouldTakeTodayNotTaken]);
    }

    #[test]
    fn test_non_medication_activity_is_skipped() {
        let activity = Activity::new("visit-1", "Weight", FieldKind::NumberSimple);
        assert!(evaluate_medication(
            &activity,
            &FormValues::new(),
            &NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            &ProblemDetector::default(),
        )
        .is_none());
    }
}
