use rust_decimal::{Decimal, RoundingStrategy};

use crate::{domain::DateRange, error::AppError};

pub const MONTHLY_TIER_DAYS: i64 = 30;
pub const WEEKLY_TIER_DAYS: i64 = 7;
pub const SHORT_TIER_DAYS: i64 = 3;

/// Largest amount a `NUMERIC(12, 2)` money column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2); // 9_999_999_999.99

/// Per-vehicle rates. Weekly and monthly rates are optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    pub daily: Decimal,
    pub weekly: Option<Decimal>,
    pub monthly: Option<Decimal>,
}

impl RateTable {
    pub fn new(daily: Decimal, weekly: Option<Decimal>, monthly: Option<Decimal>) -> Self {
        Self {
            daily,
            weekly,
            monthly,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let rates = [
            ("daily_rate", Some(self.daily)),
            ("weekly_rate", self.weekly),
            ("monthly_rate", self.monthly),
        ];
        for (name, rate) in rates {
            match rate {
                Some(r) if r <= Decimal::ZERO => {
                    return Err(AppError::BadRequest(format!("{name} must be positive")));
                }
                Some(r) if r > MAX_AMOUNT => {
                    return Err(AppError::BadRequest(format!(
                        "{name} must not exceed {MAX_AMOUNT}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Daily rate after the length-of-rental discount ladder.
    pub fn effective_daily_rate(&self, days: i64) -> Decimal {
        match (days, self.weekly, self.monthly) {
            (d, _, Some(monthly)) if d >= MONTHLY_TIER_DAYS => monthly / Decimal::from(30),
            (d, Some(weekly), _) if d >= WEEKLY_TIER_DAYS => weekly / Decimal::from(7),
            (d, None, _) if d >= WEEKLY_TIER_DAYS => self.daily * Decimal::new(85, 2),
            (d, _, _) if d >= SHORT_TIER_DAYS => self.daily * Decimal::new(90, 2),
            _ => self.daily,
        }
    }

    /// Total for the range, rounded half-up to whole currency units.
    pub fn quote(&self, range: &DateRange) -> Decimal {
        let days = range.days();
        (Decimal::from(days) * self.effective_daily_rate(days))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }

    /// [`quote`](Self::quote), refused when the total does not fit the
    /// `total_price` column.
    pub fn storable_quote(&self, range: &DateRange) -> Result<Decimal, AppError> {
        let total = self.quote(range);
        if total > MAX_AMOUNT {
            return Err(AppError::BadRequest(format!(
                "total price {total} exceeds the maximum of {MAX_AMOUNT}"
            )));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};

    use super::*;

    fn rates() -> RateTable {
        RateTable::new(
            Decimal::from(100),
            Some(Decimal::from(600)),
            Some(Decimal::from(2400)),
        )
    }

    fn range_of(days: u64) -> DateRange {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        DateRange::new(start, start.checked_add_days(Days::new(days)).unwrap()).unwrap()
    }

    #[test]
    fn short_rental_uses_plain_daily_rate() {
        assert_eq!(rates().quote(&range_of(2)), Decimal::from(200));
    }

    #[test]
    fn three_to_six_days_get_ten_percent_off() {
        assert_eq!(rates().quote(&range_of(5)), Decimal::from(450));
        assert_eq!(rates().quote(&range_of(3)), Decimal::from(270));
    }

    #[test]
    fn week_or_longer_uses_weekly_rate_when_present() {
        // 8 * 600 / 7 = 685.71
        assert_eq!(rates().quote(&range_of(8)), Decimal::from(686));
        assert_eq!(rates().quote(&range_of(7)), Decimal::from(600));
    }

    #[test]
    fn week_or_longer_without_weekly_rate_gets_fifteen_percent_off() {
        let table = RateTable::new(Decimal::from(100), None, None);
        assert_eq!(table.quote(&range_of(8)), Decimal::from(680));
    }

    #[test]
    fn month_or_longer_uses_monthly_rate() {
        assert_eq!(rates().quote(&range_of(30)), Decimal::from(2400));
        assert_eq!(rates().quote(&range_of(45)), Decimal::from(3600));
    }

    #[test]
    fn month_without_monthly_rate_falls_back_to_weekly() {
        let table = RateTable::new(Decimal::from(100), Some(Decimal::from(600)), None);
        // 30 * 600 / 7 = 2571.43
        assert_eq!(table.quote(&range_of(30)), Decimal::from(2571));
    }

    #[test]
    fn rounds_half_up() {
        let table = RateTable::new(Decimal::new(1025, 1), None, None);
        // 102.5 * 1 day
        assert_eq!(table.quote(&range_of(1)), Decimal::from(103));
    }

    #[test]
    fn rejects_non_positive_rates() {
        assert!(RateTable::new(Decimal::ZERO, None, None).validate().is_err());
        assert!(
            RateTable::new(Decimal::from(10), Some(Decimal::from(-1)), None)
                .validate()
                .is_err()
        );
        assert!(rates().validate().is_ok());
    }

    #[test]
    fn rejects_rates_beyond_the_money_column() {
        let huge = MAX_AMOUNT + Decimal::ONE;
        assert!(RateTable::new(huge, None, None).validate().is_err());
        assert!(
            RateTable::new(Decimal::from(10), None, Some(huge))
                .validate()
                .is_err()
        );
        assert!(RateTable::new(MAX_AMOUNT, None, None).validate().is_ok());
    }

    #[test]
    fn oversized_quote_is_a_validation_error() {
        let table = RateTable::new(Decimal::from(9_000_000_000_i64), None, None);
        assert!(matches!(
            table.storable_quote(&range_of(2)),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            table.storable_quote(&range_of(1)).unwrap(),
            Decimal::from(9_000_000_000_i64)
        );
        assert_eq!(rates().storable_quote(&range_of(5)).unwrap(), Decimal::from(450));
    }
}
