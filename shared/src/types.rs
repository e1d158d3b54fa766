//! Common types used across the simulator

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive calendar range of the harvest season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days covered, zero when the range is inverted
    pub fn len_days(&self) -> usize {
        let span = (self.end - self.start).num_days();
        usize::try_from(span + 1).unwrap_or(0)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day from start to end, both included
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days()).map(move |offset| start + Duration::days(offset as i64))
    }
}

/// Serialize booleans as `1`/`0` table flags
pub mod flag {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(D::Error::custom(format!("flag must be 0 or 1, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_days_are_inclusive() {
        let range = DateRange::new(date(8, 30), date(9, 2));
        let days: Vec<_> = range.days().collect();
        assert_eq!(days, vec![date(8, 30), date(8, 31), date(9, 1), date(9, 2)]);
        assert_eq!(range.len_days(), 4);
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date(9, 1), date(9, 1));
        assert_eq!(range.days().count(), 1);
        assert!(range.contains(date(9, 1)));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = DateRange::new(date(9, 2), date(9, 1));
        assert_eq!(range.len_days(), 0);
        assert_eq!(range.days().count(), 0);
    }

    #[test]
    fn test_corradino_season_length() {
        let range = DateRange::new(date(8, 25), date(10, 15));
        assert_eq!(range.len_days(), 52);
    }
}
