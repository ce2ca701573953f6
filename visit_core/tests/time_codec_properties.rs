//! Property tests for `HH:MM` time handling.

use proptest::prelude::*;
use visit_core::time_codec::{add_minutes, format_while_typing, is_valid, normalize};

fn valid_time() -> impl Strategy<Value = String> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{:02}:{:02}", h, m))
}

fn valid_time_with_seconds() -> impl Strategy<Value = String> {
    (valid_time(), proptest::option::of(0u32..60)).prop_map(|(t, s)| match s {
        Some(s) => format!("{}:{:02}", t, s),
        None => t,
    })
}

proptest! {
    #[test]
    fn normalized_times_are_valid(t in valid_time_with_seconds()) {
        prop_assert!(is_valid(&normalize(&t)));
    }

    #[test]
    fn add_minutes_composes(t in valid_time(), a in -5000i64..5000, b in -5000i64..5000) {
        prop_assert_eq!(add_minutes(&add_minutes(&t, a), b), add_minutes(&t, a + b));
    }

    #[test]
    fn add_minutes_composes_for_any_delta(t in valid_time(), a in any::<i64>(), b in any::<i64>()) {
        // a + b taken modulo one day, without overflowing i64
        let sum = (i128::from(a) + i128::from(b)).rem_euclid(1440) as i64;
        prop_assert_eq!(add_minutes(&add_minutes(&t, a), b), add_minutes(&t, sum));
    }

    #[test]
    fn add_minutes_stays_valid(t in valid_time(), delta in any::<i64>()) {
        prop_assert!(is_valid(&add_minutes(&t, delta)));
    }

    #[test]
    fn full_day_is_identity(t in valid_time(), days in -10i64..10) {
        prop_assert_eq!(add_minutes(&t, days * 1440), t);
    }

    #[test]
    fn formatting_is_idempotent_from_four_digits(raw in "[0-9]{4,8}") {
        let once = format_while_typing(&raw);
        prop_assert_eq!(format_while_typing(&once), once.clone());
        prop_assert_eq!(once.len(), 5);
    }

    #[test]
    fn formatting_never_panics(raw in ".*") {
        let formatted = format_while_typing(&raw);
        prop_assert!(formatted.len() <= 5);
    }
}
