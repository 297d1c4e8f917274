use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

/// Shown wherever a timestamp is missing.
pub const MISSING_TIMESTAMP: &str = "—";

/// Render an absolute timestamp as e.g. `Oct 16, 2026, 3:04:05 PM` in `tz`.
pub fn format_timestamp<Tz>(ts: Option<&DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match ts {
        Some(ts) => ts
            .with_timezone(tz)
            .format("%b %-d, %Y, %-I:%M:%S %p")
            .to_string(),
        None => MISSING_TIMESTAMP.to_string(),
    }
}

/// Human distance between `ts` and `now` with a direction suffix.
///
/// Example: three days before `now` → "3 days ago"; two hours after → "in about 2 hours"
pub fn format_distance(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - ts).num_seconds();
    let phrase = distance_phrase(seconds.unsigned_abs());
    if seconds >= 0 {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}

const MINUTES_IN_DAY: u64 = 1440;
const MINUTES_IN_MONTH: u64 = 43_200;
const MINUTES_IN_TWO_MONTHS: u64 = 86_400;

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn rounded_div(n: u64, d: u64) -> u64 {
    (n + d / 2) / d
}

fn distance_phrase(seconds: u64) -> String {
    let minutes = rounded_div(seconds, 60);

    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        return format!("about {}", plural(rounded_div(minutes, 60), "hour"));
    }
    if minutes < 2520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        return plural(rounded_div(minutes, MINUTES_IN_DAY), "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        return format!("about {}", plural(rounded_div(minutes, MINUTES_IN_MONTH), "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        return plural(rounded_div(minutes, MINUTES_IN_MONTH), "month");
    }
    let years = months / 12;
    match months % 12 {
        0..=2 => format!("about {}", plural(years, "year")),
        3..=8 => format!("over {}", plural(years, "year")),
        _ => format!("almost {}", plural(years + 1, "year")),
    }
}

/// Upper-case the first character, leaving the rest untouched.
///
/// Example: "ai question" → "Ai question"
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Derive a display name from an email address (best-effort).
///
/// Example: "dana.reyes@school.org" → "Dana Reyes"
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    local
        .split(|c: char| c == '.' || c == '_' || c == '-' || c == '+')
        .filter(|s| !s.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a display name to a dotted, lower-case email local part.
///
/// Example: "Amara O'Neil" → "amara.o.neil"
pub fn email_local_part(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '.' })
        .collect::<String>()
        .split('.')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 16, 15, 4, 5).single();
        assert_eq!(format_timestamp(ts.as_ref(), &Utc), "Oct 16, 2026, 3:04:05 PM");
        assert_eq!(format_timestamp(None, &Utc), "—");
    }

    #[test]
    fn test_format_distance_buckets() {
        let now = Utc::now();
        assert_eq!(format_distance(now - Duration::seconds(10), now), "less than a minute ago");
        assert_eq!(format_distance(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_distance(now - Duration::minutes(20), now), "20 minutes ago");
        assert_eq!(format_distance(now - Duration::minutes(60), now), "about 1 hour ago");
        assert_eq!(format_distance(now - Duration::hours(5), now), "about 5 hours ago");
        assert_eq!(format_distance(now - Duration::hours(30), now), "1 day ago");
        assert_eq!(format_distance(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_distance(now - Duration::days(40), now), "about 1 month ago");
        assert_eq!(format_distance(now - Duration::days(150), now), "5 months ago");
        assert_eq!(format_distance(now - Duration::days(400), now), "about 1 year ago");
        assert_eq!(format_distance(now - Duration::days(365 * 2 + 200), now), "over 2 years ago");
    }

    #[test]
    fn test_format_distance_future() {
        let now = Utc::now();
        assert_eq!(format_distance(now + Duration::days(2), now), "in 2 days");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("ai question"), "Ai question");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_name_from_email() {
        assert_eq!(name_from_email("dana.reyes@school.org"), "Dana Reyes");
        assert_eq!(name_from_email("admin@school.org"), "Admin");
    }

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("Amara O'Neil"), "amara.o.neil");
        assert_eq!(email_local_part("  Li  Wei "), "li.wei");
    }
}
