//! Schema fixtures as a schema editor would store them.

use visit_core::schema::FieldRequirements;
use visit_core::validation::evaluate;
use visit_core::{check_schema, parse_schema, sort_activities, FieldType, FormValues};

const VISIT_SCHEMA: &str = r#"[
    {"id": "vitals-time", "visitId": "v1", "order": 3, "name": "Vitals time",
     "fieldType": "datetime", "required": true, "allowMultiple": true, "repeatCount": 3,
     "requireDatePerMeasurement": false, "timeIntervalMinutes": 5},
    {"id": "weight", "visitId": "v1", "order": 1, "name": "Weight",
     "fieldType": "number_simple", "measurementUnit": "kg", "required": true},
    {"id": "hr", "visitId": "v1", "order": 2, "name": "Heart rate",
     "fieldType": "number_simple", "allowMultiple": true, "repeatCount": 4},
    {"id": "visit-date", "visitId": "v1", "order": 0, "name": "Visit date",
     "fieldType": "date", "required": true},
    {"id": "eligibility", "visitId": "v1", "order": 2, "name": "Eligibility branch",
     "fieldType": "conditional", "required": true},
    {"id": "ecg-file", "visitId": "v1", "order": 4, "name": "ECG tracing",
     "fieldType": "file"}
]"#;

#[test]
fn fixture_is_well_formed() {
    let activities = parse_schema(VISIT_SCHEMA).unwrap();
    assert!(check_schema(&activities).is_empty());
}

#[test]
fn display_order_breaks_ties_by_position() {
    let activities = parse_schema(VISIT_SCHEMA).unwrap();
    let ids: Vec<&str> = sort_activities(&activities)
        .iter()
        .map(|a| a.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["visit-date", "weight", "hr", "eligibility", "vitals-time", "ecg-file"]
    );
}

#[test]
fn repetition_slots_ignore_stored_values() {
    let activities = parse_schema(VISIT_SCHEMA).unwrap();
    let hr = activities.iter().find(|a| a.id == "hr").unwrap();

    let mut values = FormValues::new();
    for i in 0..6 {
        values.set_repetition("hr", i, visit_core::FieldValue::Number(70.0 + i as f64));
    }
    assert_eq!(hr.repetition_slots(), 4);
}

#[test]
fn legacy_date_field_maps_to_date_only() {
    let activities = parse_schema(VISIT_SCHEMA).unwrap();
    let date = activities.iter().find(|a| a.id == "visit-date").unwrap();
    assert_eq!(date.field_type(), FieldType::Date);
    assert_eq!(date.field_type().requirements(), FieldRequirements::default());
}

#[test]
fn filling_the_visit_clears_required_errors() {
    let activities = parse_schema(VISIT_SCHEMA).unwrap();
    let find = |id: &str| activities.iter().find(|a| a.id == id).unwrap();

    let mut values = FormValues::new();
    let keys: Vec<String> = evaluate(&activities, &values, &[])
        .into_iter()
        .map(|e| e.field_key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "visit-date_date",
            "weight",
            "vitals-time_date",
            "vitals-time_time_0",
            "vitals-time_time_1",
            "vitals-time_time_2",
        ]
    );

    values.set_date(find("visit-date"), 0, "2024-05-01");
    values.set("weight", "72.5".into());
    values.set_date(find("vitals-time"), 0, "2024-05-01");
    values.set_time(find("vitals-time"), 0, "09:58:30");

    assert!(evaluate(&activities, &values, &[]).is_empty());
    assert_eq!(values.time(find("vitals-time"), 2), "10:08");
}
