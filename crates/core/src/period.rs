use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expense::{parse_date, ValidationError};

/// Calendar date range, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Both ends must be `YYYY-MM-DD`. A start after the end is allowed and
    /// simply matches nothing.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Ok(DateRange::new(parse_date(start)?, parse_date(end)?))
    }

    /// January 1 through December 31 of `year`.
    pub fn tax_year(year: i32) -> Option<Self> {
        Some(DateRange {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
