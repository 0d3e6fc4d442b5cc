//! Date Partitioning
//!
//! Gazette rows carry `year`, `month` and `day` columns derived from the
//! edition's publication date, and paths can be organized with Hive-style
//! partition segments:
//!
//! ```text
//! Year  → year=2024
//! Month → year=2024/month=03
//! Day   → year=2024/month=03/day=05
//! ```
//!
//! Publication dates come from the crawler as text. They are parsed with the
//! strict `YYYY-MM-DD` format; callers decide what to do when parsing fails.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Strict publication date format.
pub const PUBLICATION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Depth of a date partition path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Month,
    #[default]
    Day,
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "year" => Ok(Granularity::Year),
            "month" => Ok(Granularity::Month),
            "day" => Ok(Granularity::Day),
            other => Err(Error::Config(format!("unknown partition granularity: '{}'", other))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Granularity::Year => "year",
            Granularity::Month => "month",
            Granularity::Day => "day",
        };
        f.write_str(s)
    }
}

/// Build the partition path segment for `date`.
pub fn date_partition(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Year => format!("year={}", date.year()),
        Granularity::Month => format!("year={}/month={:02}", date.year(), date.month()),
        Granularity::Day => format!(
            "year={}/month={:02}/day={:02}",
            date.year(),
            date.month(),
            date.day()
        ),
    }
}

/// Parse a publication date with the strict `YYYY-MM-DD` format.
pub fn parse_publication_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, PUBLICATION_DATE_FORMAT).map_err(|_| Error::DateParseFailure {
        value: value.to_string(),
    })
}

/// Year/month/day partition components of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

impl From<NaiveDate> for DateParts {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month() as i32,
            day: date.day() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_5() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_date_partition_levels() {
        assert_eq!(
            date_partition(march_5(), Granularity::Day),
            "year=2024/month=03/day=05"
        );
        assert_eq!(date_partition(march_5(), Granularity::Month), "year=2024/month=03");
        assert_eq!(date_partition(march_5(), Granularity::Year), "year=2024");
    }

    #[test]
    fn test_default_granularity_is_day() {
        assert_eq!(
            date_partition(march_5(), Granularity::default()),
            "year=2024/month=03/day=05"
        );
    }

    #[test]
    fn test_two_digit_components_not_padded_further() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(date_partition(date, Granularity::Day), "year=2023/month=12/day=31");
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("year".parse::<Granularity>().unwrap(), Granularity::Year);
        assert_eq!("MONTH".parse::<Granularity>().unwrap(), Granularity::Month);
        assert_eq!("Day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert!("week".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_parse_publication_date_strict() {
        assert_eq!(parse_publication_date("2024-03-05").unwrap(), march_5());
        assert!(matches!(
            parse_publication_date("05/03/2024"),
            Err(Error::DateParseFailure { .. })
        ));
        assert!(parse_publication_date("2024-02-30").is_err());
        assert!(parse_publication_date("").is_err());
    }

    #[test]
    fn test_date_parts() {
        let parts = DateParts::from(march_5());
        assert_eq!(
            parts,
            DateParts {
                year: 2024,
                month: 3,
                day: 5
            }
        );
    }
}
