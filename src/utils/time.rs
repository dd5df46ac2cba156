use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Standard way of turning a date into a string in dayreview. Also the key of daily summaries.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Renders minutes as `2h 5m`, `2h` or `45m`.
pub fn format_minutes(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{hours}h")
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.).round() / 10.
}

/// First moment strictly after `now` that falls on `at`.
pub fn next_daily_fire(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// First moment strictly after `now` that falls on `weekday` at `at`.
pub fn next_weekly_fire(now: NaiveDateTime, weekday: Weekday, at: NaiveTime) -> NaiveDateTime {
    let days_ahead = (7 + weekday.num_days_from_monday() as i64
        - now.weekday().num_days_from_monday() as i64)
        % 7;
    let candidate = (now.date() + Duration::days(days_ahead)).and_time(at);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}
