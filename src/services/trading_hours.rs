use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::time::Duration;

/// Market session configuration for US equities
pub struct MarketHours {
    pub open_hour: u32,        // 9 for 9am (session opens 9:30)
    pub open_minute: u32,      // 30
    pub close_hour: u32,       // 16 for 4pm
    pub timezone: &'static str, // "America/New_York"
    pub weekdays_only: bool,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            open_minute: 30,
            close_hour: 16,
            timezone: "America/New_York",
            weekdays_only: true,
        }
    }
}

/// Check if the market is currently within its regular session
pub fn is_market_open() -> bool {
    let config = MarketHours::default();

    let tz: Tz = match config.timezone.parse() {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!("Failed to parse timezone '{}': {}", config.timezone, e);
            return false; // Treat as closed if the timezone is unusable
        }
    };

    let now_local = Utc::now().with_timezone(&tz);

    if config.weekdays_only {
        match now_local.weekday() {
            Weekday::Sat | Weekday::Sun => return false,
            _ => {}
        }
    }

    let minutes = now_local.hour() * 60 + now_local.minute();
    let open = config.open_hour * 60 + config.open_minute;
    let close = config.close_hour * 60;
    minutes >= open && minutes < close
}

/// Today's date in the market timezone, for intraday range queries
pub fn market_local_date() -> chrono::NaiveDate {
    let config = MarketHours::default();
    match config.timezone.parse::<Tz>() {
        Ok(tz) => Utc::now().with_timezone(&tz).date_naive(),
        Err(_) => Utc::now().date_naive(),
    }
}

/// Midnight of today's market-timezone date, as a UTC instant.
///
/// Intraday bucket keys are UTC strings, so bounding "today" by the local
/// date string alone would also pick up early-UTC candles that belong to the
/// previous market evening. This is the tight lower bound.
pub fn market_day_start_utc() -> DateTime<Utc> {
    let config = MarketHours::default();
    let today = market_local_date();
    let midnight = today.and_hms_opt(0, 0, 0).unwrap_or_default();

    match config.timezone.parse::<Tz>() {
        // US DST transitions happen at 02:00, so local midnight is never
        // skipped or ambiguous; the fallbacks only guard the type
        Ok(tz) => match tz.from_local_datetime(&midnight).single() {
            Some(local) => local.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&midnight),
        },
        Err(_) => Utc.from_utc_datetime(&midnight),
    }
}

/// Pick the refresh period based on whether the market is open.
///
/// During the session quotes move, so the refresh worker runs tight;
/// outside it the period relaxes to spare the provider.
pub fn get_refresh_interval(trading_interval: Duration, non_trading_interval: Duration) -> Duration {
    if is_market_open() {
        trading_interval
    } else {
        non_trading_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_hours_config() {
        let config = MarketHours::default();
        assert_eq!(config.open_hour, 9);
        assert_eq!(config.open_minute, 30);
        assert_eq!(config.close_hour, 16);
        assert_eq!(config.timezone, "America/New_York");
        assert!(config.weekdays_only);
    }

    #[test]
    fn test_market_day_start_is_local_midnight_of_today() {
        let start = market_day_start_utc();
        let tz: Tz = MarketHours::default().timezone.parse().unwrap();
        let local = start.with_timezone(&tz);

        assert_eq!(local.hour(), 0);
        assert_eq!(local.minute(), 0);
        assert_eq!(local.date_naive(), market_local_date());
        assert!(start <= Utc::now());
    }

    #[test]
    fn test_refresh_interval_is_one_of_the_inputs() {
        let fast = Duration::from_secs(60);
        let slow = Duration::from_secs(900);
        let picked = get_refresh_interval(fast, slow);
        assert!(picked == fast || picked == slow);
    }
}
