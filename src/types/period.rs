use std::fmt::Display;

use chrono::{Days, NaiveDate};

/// One reporting interval as the statistics API spells it: `2024`, `2024-03`,
/// `2024-Q1`, `2024-03-15` or `2024-03-15T05`.
///
/// Every format the API emits sorts chronologically as plain text, so the
/// ordering is the string ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(String);

impl Period {
    pub fn new(token: impl Display) -> Self {
        Period(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First calendar day covered by this period, if the token is recognised.
    pub fn first_day(&self) -> Option<NaiveDate> {
        let token = self.0.trim();
        // Hourly tokens carry a `T<hour>` suffix; the day is what matters here.
        let date_part = token.split('T').next().unwrap_or(token);
        let mut parts = date_part.split('-');

        let year: i32 = parts.next()?.parse().ok()?;
        let second = parts.next();
        let third = parts.next();
        if parts.next().is_some() {
            return None;
        }

        match (second, third) {
            (None, None) => NaiveDate::from_ymd_opt(year, 1, 1),
            (Some(q), None) if q.starts_with('Q') => {
                let quarter: u32 = q[1..].parse().ok()?;
                if !(1..=4).contains(&quarter) {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
            }
            (Some(m), None) => NaiveDate::from_ymd_opt(year, m.parse().ok()?, 1),
            (Some(m), Some(d)) => NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?),
            (None, Some(_)) => None,
        }
    }

    /// Value for the API's `start` parameter. The API treats `start` as
    /// exclusive, so the day before the period's first day is sent.
    pub fn start_param(&self) -> Option<String> {
        let first = self.first_day()?;
        let shifted = first.checked_sub_days(Days::new(1))?;
        Some(shifted.format("%Y-%m-%d").to_string())
    }

    /// Value for the API's `end` parameter: the period's first day.
    pub fn end_param(&self) -> Option<String> {
        self.first_day().map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Period {
    fn from(value: &str) -> Self {
        Period(value.to_string())
    }
}

impl From<String> for Period {
    fn from(value: String) -> Self {
        Period(value)
    }
}

/// Default date-range bounds for a discovered, ascending period list: the end
/// is the latest period, the start is the twelfth most recent one when at
/// least twelve exist, otherwise the earliest.
pub fn default_bounds(periods: &[Period]) -> Option<(Period, Period)> {
    let end = periods.last()?.clone();
    let start = if periods.len() >= 12 {
        periods[periods.len() - 12].clone()
    } else {
        periods[0].clone()
    };
    Some((start, end))
}
