use super::{Candle, Granularity};
use serde::Serialize;
use std::fmt;

/// Symbolic display-range request from the chart client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeToken {
    /// Today's 5-minute candles
    Intraday,
    /// Trailing 5 calendar days, rolled up to 30-minute candles
    FiveDay,
    /// Trailing 30 days of daily candles
    OneMonth,
    /// Trailing 182 days of daily candles
    SixMonth,
    /// Trailing 365 days of daily candles
    OneYear,
    /// Trailing 5 years of daily candles, rolled up by ISO week
    FiveYear,
}

impl RangeToken {
    /// Parse a range token string. Unknown tokens return `None`; the
    /// resolver treats that as "full coarse history" rather than an error.
    pub fn parse(s: &str) -> Option<RangeToken> {
        match s {
            "intraday" => Some(RangeToken::Intraday),
            "5-day" => Some(RangeToken::FiveDay),
            "1-month" => Some(RangeToken::OneMonth),
            "6-month" => Some(RangeToken::SixMonth),
            "1-year" => Some(RangeToken::OneYear),
            "5-year" => Some(RangeToken::FiveYear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeToken::Intraday => "intraday",
            RangeToken::FiveDay => "5-day",
            RangeToken::OneMonth => "1-month",
            RangeToken::SixMonth => "6-month",
            RangeToken::OneYear => "1-year",
            RangeToken::FiveYear => "5-year",
        }
    }

    /// The fixed query + aggregation plan for this token
    pub fn plan(&self) -> RangePlan {
        match self {
            RangeToken::Intraday => RangePlan {
                granularity: Granularity::Fine,
                lookback_days: Some(0),
                aggregation: Aggregation::None,
            },
            RangeToken::FiveDay => RangePlan {
                granularity: Granularity::Fine,
                lookback_days: Some(5),
                aggregation: Aggregation::ByCount(crate::constants::FIVE_DAY_GROUP_SIZE),
            },
            RangeToken::OneMonth => RangePlan {
                granularity: Granularity::Coarse,
                lookback_days: Some(30),
                aggregation: Aggregation::None,
            },
            RangeToken::SixMonth => RangePlan {
                granularity: Granularity::Coarse,
                lookback_days: Some(182),
                aggregation: Aggregation::None,
            },
            RangeToken::OneYear => RangePlan {
                granularity: Granularity::Coarse,
                lookback_days: Some(365),
                aggregation: Aggregation::None,
            },
            RangeToken::FiveYear => RangePlan {
                granularity: Granularity::Coarse,
                lookback_days: Some(365 * 5),
                aggregation: Aggregation::IsoWeek,
            },
        }
    }

    pub fn all() -> Vec<RangeToken> {
        vec![
            RangeToken::Intraday,
            RangeToken::FiveDay,
            RangeToken::OneMonth,
            RangeToken::SixMonth,
            RangeToken::OneYear,
            RangeToken::FiveYear,
        ]
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How to roll up queried candles before returning them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    None,
    /// Consecutive fixed-size chunks (e.g. 6 five-minute candles -> 30m)
    ByCount(usize),
    /// Calendar grouping by ISO year + ISO week
    IsoWeek,
}

/// Concrete query + aggregation plan derived from a range token
#[derive(Debug, Clone, Copy)]
pub struct RangePlan {
    pub granularity: Granularity,
    /// Trailing window in calendar days; `Some(0)` means "today only",
    /// `None` means unwindowed
    pub lookback_days: Option<i64>,
    pub aggregation: Aggregation,
}

impl RangePlan {
    /// Fallback plan for unrecognized tokens: raw coarse history, no bound
    pub fn fallback() -> RangePlan {
        RangePlan {
            granularity: Granularity::Coarse,
            lookback_days: None,
            aggregation: Aggregation::None,
        }
    }
}

/// Chart-ready OHLCV series for one symbol and range
#[derive(Debug, Serialize)]
pub struct ChartData {
    pub symbol: String,
    pub range: String,
    pub count: usize,
    pub data: Vec<Candle>,
}
