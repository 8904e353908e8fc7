// 📅 Analysis Period - One calendar month, named like "November2025"

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    /// 1-based
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(AnalysisError::InvalidPeriod(format!("{}-{}", year, month)));
        }
        Ok(Period { year, month })
    }

    /// Accepts "November2025", "Nov2025", "November 2025" and "2025-11"
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let invalid = || AnalysisError::InvalidPeriod(value.to_string());

        if let Some((y, m)) = trimmed.split_once('-') {
            let year: i32 = y.parse().map_err(|_| invalid())?;
            let month: u32 = m.parse().map_err(|_| invalid())?;
            return Period::new(year, month).map_err(|_| invalid());
        }

        let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        let split = compact
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (name, year) = compact.split_at(split);

        if name.len() < 3 || year.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;

        let name_lower = name.to_lowercase();
        let month = MONTH_NAMES
            .iter()
            .position(|m| {
                let m = m.to_lowercase();
                m == name_lower || m[..3] == name_lower
            })
            .ok_or_else(invalid)?;

        Period::new(year, month as u32 + 1)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.first_day()..=self.last_day()).contains(&date)
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn month_abbrev(&self) -> &'static str {
        &self.month_name()[..3]
    }

    /// Label used for batch rows, e.g. "November2025"
    pub fn label(&self) -> String {
        format!("{}{}", self.month_name(), self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let expected = Period { year: 2025, month: 11 };
        assert_eq!(Period::parse("November2025").unwrap(), expected);
        assert_eq!(Period::parse("nov2025").unwrap(), expected);
        assert_eq!(Period::parse("November 2025").unwrap(), expected);
        assert_eq!(Period::parse("2025-11").unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Period::parse("Smarch2025").is_err());
        assert!(Period::parse("2025-13").is_err());
        assert!(Period::parse("November").is_err());
        assert!(Period::parse("No2025").is_err());
    }

    #[test]
    fn test_month_bounds() {
        let feb = Period::parse("2024-02").unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = Period::parse("December2025").unwrap();
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(dec.contains(NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()));
        assert!(!dec.contains(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn test_names() {
        let p = Period::parse("2025-09").unwrap();
        assert_eq!(p.month_name(), "September");
        assert_eq!(p.month_abbrev(), "Sep");
        assert_eq!(p.to_string(), "September2025");
    }
}
