//! CSV export of medication problems.
//!
//! One row per detected problem, joined with the reviewer's decision for it.

use crate::problems::ProblemId;
use crate::review::ReviewLog;
use crate::validation::Severity;
use crate::visit::VisitReport;
use crate::Result;
use std::io::Write;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct ProblemRow<'a> {
    activity_id: &'a str,
    medication: &'a str,
    problem_id: ProblemId,
    severity: Severity,
    message: &'a str,
    adherence_percentage: Option<String>,
    include_in_history: bool,
    comment: &'a str,
}

/// Write every problem of a visit report as CSV
///
/// Returns the number of rows written.
pub fn write_problem_csv<W: Write>(
    report: &VisitReport,
    reviews: &ReviewLog,
    writer: W,
) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut count = 0;

    for medication in &report.medications {
        let adherence_percentage = medication
            .adherence
            .as_ref()
            .map(|a| format!("{:.1}", a.adherence_percentage));

        for problem in &medication.problems {
            let review = reviews.get(&medication.activity_id, problem.id);
            writer.serialize(ProblemRow {
                activity_id: &medication.activity_id,
                medication: &medication.medication_name,
                problem_id: problem.id,
                severity: problem.severity,
                message: &problem.message,
                adherence_percentage: adherence_percentage.clone(),
                include_in_history: review.map_or(false, |r| r.include_in_history),
                comment: review.map_or("", |r| r.comment.as_str()),
            })?;
            count += 1;
        }
    }

    writer.flush()?;
    tracing::debug!("Wrote {} problem rows", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adherence::AdherenceResult;
    use crate::problems::Problem;
    use crate::visit::MedicationReport;

    fn report() -> VisitReport {
        VisitReport {
            errors: vec![],
            medications: vec![MedicationReport {
                activity_id: "med".into(),
                activity_name: "Study drug".into(),
                medication_name: "Drug A".into(),
                dosage_unit: "comprimidos".into(),
                took_medication_today: true,
                adherence: Some(AdherenceResult {
                    days_elapsed: 9,
                    expected_consumption_days: 10,
                    expected_total_dose: 20.0,
                    real_consumption: 16.0,
                    adjusted_consumption: 14.0,
                    adherence_percentage: 70.0,
                    delivered: 20.0,
                    returned: 4.0,
                }),
                problems: vec![
                    Problem {
                        id: ProblemId::ShouldNotTakeTodayTaken,
                        message: "taken, against protocol".into(),
                        severity: Severity::Error,
                    },
                    Problem {
                        id: ProblemId::LowAdherence,
                        message: "Low adherence: 70.0%".into(),
                        severity: Severity::Warning,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_problem_rows_include_reviews() {
        let reviews = ReviewLog::new()
            .with_include_in_history("med", ProblemId::LowAdherence, true)
            .with_comment("med", ProblemId::LowAdherence, "Lost one blister");

        let mut out = Vec::new();
        let count = write_problem_csv(&report(), &reviews, &mut out).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "activity_id,medication,problem_id,severity,message,adherence_percentage,include_in_history,comment"
        );
        assert_eq!(
            lines[1],
            "med,Drug A,should_not_take_today_taken,error,\"taken, against protocol\",70.0,false,"
        );
        assert_eq!(
            lines[2],
            "med,Drug A,low_adherence,warning,Low adherence: 70.0%,70.0,true,Lost one blister"
        );
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        let mut out = Vec::new();
        let count =
            write_problem_csv(&VisitReport::default(), &ReviewLog::new(), &mut out).unwrap();
        assert_eq!(count, 0);
        assert!(out.is_empty());
    }
}
