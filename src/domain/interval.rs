use chrono::NaiveDate;

use crate::error::AppError;

/// Half-open range of calendar days `[start, end)`.
///
/// The end date is not occupied, so a booking ending on the 5th and another
/// starting on the 5th do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::InvalidInterval(format!(
                "start_date {start} must be before end_date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of rental days. Always at least 1.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Same-day pickup is allowed; anything earlier than `today` is not.
    pub fn ensure_not_past(&self, today: NaiveDate) -> Result<(), AppError> {
        if self.start < today {
            return Err(AppError::InvalidInterval(format!(
                "start_date {} is in the past",
                self.start
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(matches!(
            DateRange::new(day(5), day(5)),
            Err(AppError::InvalidInterval(_))
        ));
        assert!(matches!(
            DateRange::new(day(6), day(5)),
            Err(AppError::InvalidInterval(_))
        ));
    }

    #[test]
    fn counts_days_exclusive_of_end() {
        let range = DateRange::new(day(1), day(5)).unwrap();
        assert_eq!(range.days(), 4);
    }

    #[test]
    fn same_day_start_is_not_past() {
        let range = DateRange::new(day(10), day(12)).unwrap();
        assert!(range.ensure_not_past(day(10)).is_ok());
        assert!(matches!(
            range.ensure_not_past(day(11)),
            Err(AppError::InvalidInterval(_))
        ));
    }
}
