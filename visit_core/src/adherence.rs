//! Medication adherence calculation.
//!
//! Adherence compares the units the patient actually consumed (delivered
//! minus returned) against the units they should have taken since the
//! previous visit:
//!
//! 1. **Elapsed days**: full days strictly between the delivery day (the
//!    previous visit) and the current visit.
//! 2. **Consumption days**: elapsed days, plus the delivery day and the visit
//!    day when the protocol says a dose is due on them.
//! 3. **Adjustment**: a dose taken on the visit day when the protocol says not
//!    to is removed from the consumed units.
//!
//! Every intermediate quantity is kept in [`AdherenceResult`] for audit display.

use crate::clock::Clock;
use crate::schema::MedicationTrackingConfig;
use crate::values::{parse_float, MedicationAnswer};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Adherence figures for one medication field
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceResult {
    pub days_elapsed: i64,
    pub expected_consumption_days: i64,
    pub expected_total_dose: f64,
    /// Delivered minus returned; negative when more came back than went out
    pub real_consumption: f64,
    pub adjusted_consumption: f64,
    pub adherence_percentage: f64,
    pub delivered: f64,
    pub returned: f64,
}

/// Compute adherence from a medication answer
///
/// Returns `None` while the answer is incomplete (no last visit date, no
/// delivered or returned units), when the configuration has no daily dose,
/// or when no dose was expected over the period. `None` means "not yet
/// computable", not a failure.
pub fn compute(
    answer: &MedicationAnswer,
    config: &MedicationTrackingConfig,
    clock: &dyn Clock,
) -> Option<AdherenceResult> {
    if answer.last_visit_date.is_empty()
        || answer.units_delivered.is_empty()
        || answer.units_returned.is_empty()
    {
        return None;
    }

    let Some(daily_dose) = config.daily_dose() else {
        tracing::debug!(
            "No daily dose for '{}', adherence not computable",
            config.medication_name
        );
        return None;
    };

    let last_visit = parse_visit_date(&answer.last_visit_date)?;
    let current_visit = clock.today();

    let total_days = (current_visit - last_visit).num_days();
    let days_elapsed = if total_days > 0 { total_days - 1 } else { 0 };

    let expected_consumption_days = days_elapsed
        + i64::from(config.should_consume_on_delivery_day)
        + i64::from(config.should_take_on_visit_day);

    let expected_total_dose = expected_consumption_days as f64 * daily_dose;
    if expected_total_dose <= 0.0 {
        return None;
    }

    let delivered = parse_float(&answer.units_delivered).unwrap_or(0.0);
    let returned = parse_float(&answer.units_returned).unwrap_or(0.0);
    let real_consumption = delivered - returned;

    let mut adjusted_consumption = real_consumption;
    if !config.should_take_on_visit_day && answer.took_medication_today {
        adjusted_consumption -= daily_dose;
    }

    let adherence_percentage = adjusted_consumption / expected_total_dose * 100.0;

    tracing::debug!(
        "Adherence for '{}': {} days elapsed, {} expected days, {:.1} of {:.1} units ({:.1}%)",
        config.medication_name,
        days_elapsed,
        expected_consumption_days,
        adjusted_consumption,
        expected_total_dose,
        adherence_percentage
    );

    Some(AdherenceResult {
        days_elapsed,
        expected_consumption_days,
        expected_total_dose,
        real_consumption,
        adjusted_consumption,
        adherence_percentage,
        delivered,
        returned,
    })
}

/// Parse a `YYYY-MM-DD` calendar date, ignoring any time suffix
fn parse_visit_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!("Unreadable last visit date {:?}: {}", raw, e);
            None
        }
    }
}
