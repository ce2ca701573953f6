//! Display of calculated fields.
//!
//! Formulas are evaluated outside this crate; the core only hands the
//! evaluator the formula and the current answers, then formats the number.

use crate::schema::{Activity, FieldKind, DEFAULT_DECIMAL_PLACES};
use crate::values::FormValues;

/// Evaluates a calculated field's formula against the current answers
pub trait FormulaEvaluator {
    fn evaluate(&self, formula: &str, values: &FormValues) -> Option<f64>;
}

impl<F> FormulaEvaluator for F
where
    F: Fn(&str, &FormValues) -> Option<f64>,
{
    fn evaluate(&self, formula: &str, values: &FormValues) -> Option<f64> {
        self(formula, values)
    }
}

/// Format a computed value, or the placeholder when there is none
pub fn format_calculated(result: Option<f64>, decimal_places: u32, placeholder: &str) -> String {
    match result {
        Some(value) if value.is_finite() => format!("{:.*}", decimal_places as usize, value),
        _ => placeholder.to_string(),
    }
}

/// Display text of a calculated activity
///
/// `None` for activities that are not calculated fields. Calculated fields
/// without a formula or evaluator show the placeholder.
pub fn display_value(
    activity: &Activity,
    values: &FormValues,
    evaluator: Option<&dyn FormulaEvaluator>,
    placeholder: &str,
) -> Option<String> {
    let FieldKind::Calculated {
        calculation_formula,
        decimal_places,
    } = &activity.field
    else {
        return None;
    };

    let result = match (calculation_formula, evaluator) {
        (Some(formula), Some(evaluator)) => evaluator.evaluate(formula, values),
        _ => None,
    };

    Some(format_calculated(
        result,
        decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES),
        placeholder,
    ))
}
