//! 时间工具函数 (业务时区转换)
//!
//! 所有本地时间 → UTC 的换算统一走这里 (chrono-tz)，
//! repository 层只接收 `i64` Unix millis。

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";
pub const DEFAULT_OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
pub const DEFAULT_CLOSE: NaiveTime = NaiveTime::from_hms_opt(23, 0, 0).unwrap();

/// 解析 IANA 时区名，失败回退到 Asia/Seoul
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse timezone '{}': {}, falling back to {}",
            name,
            e,
            DEFAULT_TIMEZONE
        );
        chrono_tz::Asia::Seoul
    })
}

/// 解析 HH:MM，失败返回 fallback
pub fn parse_clock(value: &str, fallback: NaiveTime) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse time '{}': {}, falling back to {}",
            value,
            e,
            fallback
        );
        fallback
    })
}

/// 夏令时跳跃最长一整天 (如 Pacific/Apia 2011-12-30)
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// 本地时间 → UTC (业务时区)
///
/// - 重复时刻 (夏令时结束): 取较早的一次
/// - 不存在的时刻 (夏令时跳跃): 顺延到之后第一个有效的本地分钟
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        if let Some(dt) = candidate.and_local_timezone(tz).earliest() {
            return dt.with_timezone(&Utc);
        }
        candidate += Duration::minutes(1);
    }
    naive.and_utc()
}

/// 日期开始 (00:00:00) → UTC (业务时区)
pub fn day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_to_utc(date.and_time(NaiveTime::MIN), tz)
}

/// UTC → 本地时刻 (业务时区)
pub fn local_time_of_day(instant: DateTime<Utc>, tz: Tz) -> NaiveTime {
    instant.with_timezone(&tz).time()
}

/// Unix millis → UTC instant
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timezone_fallback() {
        assert_eq!(parse_timezone("Europe/Madrid"), chrono_tz::Europe::Madrid);
        assert_eq!(parse_timezone("Mars/Olympus"), chrono_tz::Asia::Seoul);
    }

    #[test]
    fn test_parse_clock_fallback() {
        assert_eq!(
            parse_clock("10:30", DEFAULT_OPEN),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap()
        );
        assert_eq!(parse_clock("25:99", DEFAULT_OPEN), DEFAULT_OPEN);
    }

    #[test]
    fn test_day_start_uses_business_timezone() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        // Seoul is UTC+9 without DST
        assert_eq!(
            day_start(date, chrono_tz::Asia::Seoul),
            Utc.with_ymd_and_hms(2024, 1, 31, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_day_start_at_ambiguous_midnight_takes_earliest() {
        // Havana 2023-11-05: 01:00 CDT falls back to 00:00 CST, midnight occurs twice
        let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        assert_eq!(
            day_start(date, chrono_tz::America::Havana),
            Utc.with_ymd_and_hms(2023, 11, 5, 4, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_day_start_in_gap_moves_to_first_valid_instant() {
        // Havana 2024-03-10: 00:00 CST jumps to 01:00 CDT
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let start = day_start(date, chrono_tz::America::Havana);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());
        assert_eq!(
            local_time_of_day(start, chrono_tz::America::Havana),
            NaiveTime::from_hms_opt(1, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_local_time_of_day() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 4, 0, 30, 0).unwrap();
        assert_eq!(
            local_time_of_day(instant, chrono_tz::Asia::Seoul),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
    }
}
