//! Option list input for select fields.
//!
//! The schema editor collects options as plain text, one per line, written as
//! `value|label`. A line without a pipe uses the same text for both.

use crate::schema::SelectOption;

/// Parse a newline-delimited option list
///
/// Both sides of the pipe are trimmed. Blank lines are dropped, and a line
/// with only one non-empty side uses it as both value and label.
pub fn parse_options(text: &str) -> Vec<SelectOption> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }

            let (value, label) = match line.split_once('|') {
                Some((value, label)) => (value.trim(), label.trim()),
                None => (line, line),
            };

            match (value.is_empty(), label.is_empty()) {
                (true, true) => None,
                (false, true) => Some(SelectOption::new(value, value)),
                (true, false) => Some(SelectOption::new(label, label)),
                (false, false) => Some(SelectOption::new(value, label)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_delimited_options() {
        let options = parse_options("l|Left arm\n r | Right arm \n");
        assert_eq!(
            options,
            vec![
                SelectOption::new("l", "Left arm"),
                SelectOption::new("r", "Right arm"),
            ]
        );
    }

    #[test]
    fn test_single_side_is_both_value_and_label() {
        let options = parse_options("Sitting\nStanding|\n|Supine");
        assert_eq!(
            options,
            vec![
                SelectOption::new("Sitting", "Sitting"),
                SelectOption::new("Standing", "Standing"),
                SelectOption::new("Supine", "Supine"),
            ]
        );
    }

    #[test]
    fn test_blank_lines_dropped() {
        assert!(parse_options("").is_empty());
        assert!(parse_options("\n   \n|\n").is_empty());
        assert_eq!(parse_options("\n\nYes\n\nNo\n").len(), 2);
    }
}
