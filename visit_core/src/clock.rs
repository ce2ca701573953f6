//! Source of "today" for date arithmetic.
//!
//! Adherence math counts days up to the visit date. The caller supplies
//! that date through a [`Clock`]; a plain `NaiveDate` is a fixed clock, and
//! [`SystemClock`] reads the local wall clock.

use chrono::{Local, NaiveDate};

/// Supplies the current visit date
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A fixed visit date
impl Clock for NaiveDate {
    fn today(&self) -> NaiveDate {
        *self
    }
}
