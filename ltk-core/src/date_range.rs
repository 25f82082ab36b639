use chrono::NaiveDate;
use ltk_utils::dates::{month_start, next_month_start};

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 > self.1 {
            return None;
        }
        let current = self.0;
        match current.succ_opt() {
            Some(next) => self.0 = next,
            // end of the representable calendar, stop after this date
            None => self.1 = current.pred_opt().unwrap_or(current),
        }
        Some(current)
    }
}

/// Yields the first day of every month from the month containing the start
/// date through the month containing the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct MonthRange {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl MonthRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        MonthRange {
            next: Some(month_start(&start)),
            last: month_start(&end),
        }
    }
}

impl Iterator for MonthRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|d| *d <= self.last)?;
        self.next = next_month_start(&current);
        Some(current)
    }
}
