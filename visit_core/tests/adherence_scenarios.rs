//! End-to-end medication scenarios: answers go through the store, then
//! adherence and problem detection run against a fixed visit date.

use chrono::NaiveDate;
use visit_core::adherence;
use visit_core::problems::{detect, ProblemId};
use visit_core::{
    evaluate_visit, parse_schema, Activity, FieldValue, FormValues, FrequencyType,
    MedicationField, MedicationTrackingConfig, ProblemDetector,
};

const SCHEMA: &str = r#"[
    {
        "id": "study-drug",
        "visitId": "week-2",
        "order": 1,
        "name": "Study drug accountability",
        "fieldType": "medication_tracking",
        "required": true,
        "medicationTrackingConfig": {
            "medicationName": "Drug A",
            "quantityPerDose": 1,
            "frequencyType": "twice_daily",
            "shouldConsumeOnDeliveryDay": true,
            "shouldTakeOnVisitDay": false
        }
    }
]"#;

fn visit_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()
}

fn schema() -> Vec<Activity> {
    parse_schema(SCHEMA).unwrap()
}

fn answers(delivered: &str, returned: &str, took_today: bool) -> FormValues {
    let mut values = FormValues::new();
    values.set_medication_field("study-drug", MedicationField::LastVisitDate, "2024-01-01".into());
    values.set_medication_field("study-drug", MedicationField::UnitsDelivered, delivered.into());
    values.set_medication_field("study-drug", MedicationField::UnitsReturned, returned.into());
    values.set_medication_field(
        "study-drug",
        MedicationField::TookMedicationToday,
        FieldValue::Bool(took_today),
    );
    values
}

fn problem_ids(values: &FormValues) -> Vec<ProblemId> {
    let report = evaluate_visit(
        &schema(),
        values,
        &[],
        &visit_day(),
        &ProblemDetector::default(),
    );
    report.medications[0].problems.iter().map(|p| p.id).collect()
}

#[test]
fn eighty_percent_is_below_expected_not_low() {
    let values = answers("20", "4", false);
    let report = evaluate_visit(
        &schema(),
        &values,
        &[],
        &visit_day(),
        &ProblemDetector::default(),
    );

    let result = report.medications[0].adherence.clone().unwrap();
    assert_eq!(result.days_elapsed, 9);
    assert_eq!(result.expected_consumption_days, 10);
    assert_eq!(result.expected_total_dose, 20.0);
    assert_eq!(result.real_consumption, 16.0);
    assert_eq!(result.adjusted_consumption, 16.0);
    assert_eq!(result.adherence_percentage, 80.0);

    assert_eq!(problem_ids(&values), vec![ProblemId::AdherenceBelowExpected]);
    assert!(report.errors.is_empty());
}

#[test]
fn unplanned_visit_day_dose() {
    let values = answers("20", "4", true);
    assert_eq!(
        problem_ids(&values),
        vec![ProblemId::ShouldNotTakeTodayTaken, ProblemId::LowAdherence]
    );
}

#[test]
fn over_return_is_clamped_at_entry() {
    let values = answers("20", "25", false);
    assert_eq!(values.medication("study-drug").units_returned, "20");
    assert!(!problem_ids(&values).contains(&ProblemId::ReturnedExceedsDelivered));
}

#[test]
fn over_return_passed_directly_is_flagged() {
    let mut config = MedicationTrackingConfig::new("Drug A", 1.0, FrequencyType::TwiceDaily);
    config.should_consume_on_delivery_day = true;

    let answer = visit_core::MedicationAnswer {
        last_visit_date: "2024-01-01".into(),
        units_delivered: "20".into(),
        units_returned: "25".into(),
        took_medication_today: false,
    };

    let result = adherence::compute(&answer, &config, &visit_day()).unwrap();
    assert_eq!(result.real_consumption, -5.0);

    let ids: Vec<ProblemId> = detect(&config, false, Some(&result))
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(ids.contains(&ProblemId::ReturnedExceedsDelivered));
}

#[test]
fn every_x_hours_without_override_is_not_computable() {
    let mut config = MedicationTrackingConfig::new("Drug B", 1.0, FrequencyType::EveryXHours);
    config.custom_hours_interval = Some(8);
    config.should_consume_on_delivery_day = true;

    for (delivered, returned, took) in [("20", "4", false), ("100", "0", true), ("1", "1", false)] {
        let answer = visit_core::MedicationAnswer {
            last_visit_date: "2024-01-01".into(),
            units_delivered: delivered.into(),
            units_returned: returned.into(),
            took_medication_today: took,
        };
        assert!(adherence::compute(&answer, &config, &visit_day()).is_none());
    }
}

#[test]
fn snapshot_results_do_not_change_after_later_edits() {
    let mut values = answers("20", "4", false);
    let snapshot = values.clone();

    values.set_medication_field("study-drug", MedicationField::UnitsReturned, "0".into());

    assert_eq!(problem_ids(&snapshot), vec![ProblemId::AdherenceBelowExpected]);
    assert!(problem_ids(&values).is_empty());
}
