// 📅 Period tokens and fiscal calendar
// Month columns are "YYYY/MM"; the fiscal-year-end column is "YYYY.MM settlement"

use crate::error::{PlannerError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Substring that identifies a fiscal-year-end column
pub const SETTLEMENT_MARKER: &str = "settlement";

/// Default closing month of the fiscal year
pub const DEFAULT_SETTLEMENT_MONTH: u32 = 3;

// ============================================================================
// YEAR-MONTH
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PlannerError::InvalidPeriod {
                token: format!("{}/{}", year, month),
            });
        }
        Ok(YearMonth { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Shift by a (possibly negative) number of months
    pub fn add_months(&self, months: i32) -> YearMonth {
        let index = self.year * 12 + self.month as i32 - 1 + months;
        YearMonth {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Months from `self` to `other` (negative when `other` is earlier)
    pub fn months_until(&self, other: &YearMonth) -> i32 {
        (other.year - self.year) * 12 + other.month as i32 - self.month as i32
    }

    /// Parse `YYYY/M`, `YYYY/MM` or `YYYYMM`
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let invalid = || PlannerError::InvalidPeriod {
            token: token.to_string(),
        };

        let (year, month) = match token.split_once('/') {
            Some((y, m)) => (y, m),
            None if token.len() == 6 && token.is_ascii() => token.split_at(4),
            None => return Err(invalid()),
        };
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

// ============================================================================
// PERIOD (column token)
// ============================================================================

/// A report column: an ordinary month, or the fiscal-year-end rollup column
/// that closes the fiscal year at that month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Month(YearMonth),
    FiscalYearEnd(YearMonth),
}

impl Period {
    pub fn year_month(&self) -> YearMonth {
        match self {
            Period::Month(ym) | Period::FiscalYearEnd(ym) => *ym,
        }
    }

    pub fn is_fiscal_year_end(&self) -> bool {
        matches!(self, Period::FiscalYearEnd(_))
    }

    /// Cheap check on a raw header token, without parsing it
    pub fn is_settlement_token(token: &str) -> bool {
        token.contains(SETTLEMENT_MARKER)
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year_month(), self.is_fiscal_year_end())
            .cmp(&(other.year_month(), other.is_fiscal_year_end()))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month(ym) => write!(f, "{}", ym),
            Period::FiscalYearEnd(ym) => {
                write!(f, "{}.{:02} {}", ym.year, ym.month, SETTLEMENT_MARKER)
            }
        }
    }
}

impl FromStr for Period {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        if Period::is_settlement_token(s) {
            let invalid = || PlannerError::InvalidPeriod {
                token: s.to_string(),
            };
            let head = s.replace(SETTLEMENT_MARKER, "");
            let (year, month) = head.trim().split_once('.').ok_or_else(invalid)?;
            let year: i32 = year.trim().parse().map_err(|_| invalid())?;
            let month: u32 = month.trim().parse().map_err(|_| invalid())?;
            return Ok(Period::FiscalYearEnd(
                YearMonth::new(year, month).map_err(|_| invalid())?,
            ));
        }
        Ok(Period::Month(YearMonth::parse(s)?))
    }
}

impl TryFrom<String> for Period {
    type Error = PlannerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

// ============================================================================
// FISCAL CALENDAR
// ============================================================================

/// First month of the fiscal year containing `ym`.
///
/// The settlement month itself closes its fiscal year, so with settlement in
/// March both 2024/03 and 2023/04 map to 2023/04.
pub fn term_start(ym: YearMonth, settlement_month: u32) -> YearMonth {
    let closing = YearMonth {
        year: ym.year,
        month: settlement_month,
    };
    if ym <= closing {
        closing.add_months(-11)
    } else {
        closing.add_months(1)
    }
}

/// Settlement month of the fiscal year containing `ym`
pub fn term_end(ym: YearMonth, settlement_month: u32) -> YearMonth {
    let closing = YearMonth {
        year: ym.year,
        month: settlement_month,
    };
    if ym > closing {
        closing.add_months(12)
    } else {
        closing
    }
}

/// Column tokens from `start` to `end` inclusive, with a fiscal-year-end
/// column right after every settlement month
pub fn header_periods(start: YearMonth, end: YearMonth, settlement_month: u32) -> Vec<Period> {
    let mut periods = Vec::new();
    let count = start.months_until(&end);
    for offset in 0..=count.max(-1) {
        let ym = start.add_months(offset);
        periods.push(Period::Month(ym));
        if ym.month == settlement_month {
            periods.push(Period::FiscalYearEnd(ym));
        }
    }
    periods
}

/// Reporting window widened to whole fiscal years.
///
/// Without an explicit start the current fiscal year is used; without an
/// explicit end the window runs to the fiscal year twelve months from today.
pub fn reporting_window(
    start: Option<YearMonth>,
    end: Option<YearMonth>,
    today: NaiveDate,
    settlement_month: u32,
) -> (YearMonth, YearMonth) {
    let now = YearMonth::from_date(today);
    let start = term_start(start.unwrap_or(now), settlement_month);
    let end = match end {
        Some(end) => term_end(end, settlement_month),
        None => term_end(now.add_months(12), settlement_month),
    };
    (start, end)
}

// ============================================================================
// TESTS
// ============================================================================
