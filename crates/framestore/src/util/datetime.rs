//! RFC 3339 timestamp parsing and formatting at any column precision.
//!
//! Timestamps are held as ticks of a [`TimeUnit`] since the Unix epoch
//! (1970-01-01T00:00:00 UTC). Formatting always renders UTC without an
//! offset suffix; parsing accepts an optional `Z` or `+HH:MM` offset and
//! normalizes to UTC.

use crate::model::TimeUnit;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DateTimeParseError {}

/// Parses a timezone offset string (Z, +HH:MM, -HH:MM) and returns offset in minutes.
fn parse_timezone_offset(offset: &str) -> Result<i64, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }
    let invalid = || DateTimeParseError::new(format!("Invalid timezone offset: {offset}"));

    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(invalid());
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(invalid()),
    };
    let hours: i64 = offset[1..3].parse().map_err(|_| invalid())?;
    let minutes: i64 = offset[4..6].parse().map_err(|_| invalid())?;
    if hours > 24 || (hours == 24 && minutes != 0) || minutes > 59 {
        return Err(invalid());
    }
    Ok(sign * (hours * 60 + minutes))
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Calculates days since Unix epoch for a given date (Howard Hinnant's algorithm).
fn date_to_days(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let m = i64::from(if month <= 2 { month + 9 } else { month - 3 });
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Formats `ticks` of `unit` since the Unix epoch as an RFC 3339 datetime
/// without offset, e.g. `2024-03-15T14:30:00.123`.
///
/// Trailing zeros of the fractional part are dropped, and the fraction is
/// omitted entirely when zero.
pub fn format_timestamp_rfc3339(ticks: i64, unit: TimeUnit) -> String {
    let per_second = unit.ticks_per_second();
    let seconds = ticks.div_euclid(per_second);
    let fraction = ticks.rem_euclid(per_second);

    let days = seconds.div_euclid(SECONDS_PER_DAY);
    let time = seconds.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = days_to_date(days);

    let hours = time / SECONDS_PER_HOUR;
    let minutes = time % SECONDS_PER_HOUR / SECONDS_PER_MINUTE;
    let secs = time % SECONDS_PER_MINUTE;

    let mut out = format!("{year:04}-{month:02}-{day:02}T{hours:02}:{minutes:02}:{secs:02}");
    if fraction != 0 {
        let digits = format!("{:0width$}", fraction, width = unit.fraction_digits());
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// Parses an RFC 3339 datetime into ticks of `unit` since the Unix epoch.
///
/// The offset is optional and defaults to UTC. Fractional digits beyond the
/// unit's resolution are rejected unless they are all zero, so a parse never
/// silently truncates.
pub fn parse_timestamp_rfc3339(s: &str, unit: TimeUnit) -> Result<i64, DateTimeParseError> {
    let invalid = || DateTimeParseError::new(format!("Invalid RFC 3339 datetime: {s}"));

    // Minimum length is 19 (YYYY-MM-DDTHH:MM:SS)
    let bytes = s.as_bytes();
    if bytes.len() < 19
        || !s.is_char_boundary(19)
        || bytes[4] != b'-'
        || bytes[7] != b'-'
        || !matches!(bytes[10], b'T' | b't' | b' ')
        || bytes[13] != b':'
        || bytes[16] != b':'
    {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>, name: &str| -> Result<i64, DateTimeParseError> {
        let part = &s[range];
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateTimeParseError::new(format!("Invalid {name} in datetime: {s}")));
        }
        part.parse()
            .map_err(|_| DateTimeParseError::new(format!("Invalid {name} in datetime: {s}")))
    };
    let year = field(0..4, "year")?;
    let month = field(5..7, "month")? as u32;
    let day = field(8..10, "day")? as u32;
    let hours = field(11..13, "hours")?;
    let minutes = field(14..16, "minutes")?;
    let seconds = field(17..19, "seconds")?;

    if !(1..=12).contains(&month) {
        return Err(DateTimeParseError::new(format!("Invalid month in datetime: {s}")));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(DateTimeParseError::new(format!("Invalid day in datetime: {s}")));
    }
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(DateTimeParseError::new(format!("Invalid time of day in datetime: {s}")));
    }

    let rest = &s[19..];
    let (fraction, offset) = match rest.strip_prefix('.') {
        Some(tail) => {
            let end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
            if end == 0 {
                return Err(invalid());
            }
            (&tail[..end], &tail[end..])
        }
        None => ("", rest),
    };
    let offset_min = if offset.is_empty() {
        0
    } else {
        parse_timezone_offset(offset)?
    };

    let digits = unit.fraction_digits();
    let (kept, dropped) = fraction.split_at(fraction.len().min(digits));
    if dropped.bytes().any(|b| b != b'0') {
        return Err(DateTimeParseError::new(format!(
            "Datetime {s} has more precision than datetime64[{}] holds",
            unit.suffix()
        )));
    }
    let sub_ticks: i64 = if kept.is_empty() {
        0
    } else {
        let padded = format!("{kept:0<digits$}");
        padded.parse().map_err(|_| invalid())?
    };

    let out_of_range = || {
        DateTimeParseError::new(format!(
            "Datetime {s} is out of range for datetime64[{}]",
            unit.suffix()
        ))
    };
    let epoch_seconds = date_to_days(year, month, day) * SECONDS_PER_DAY
        + hours * SECONDS_PER_HOUR
        + minutes * SECONDS_PER_MINUTE
        + seconds
        - offset_min * SECONDS_PER_MINUTE;
    epoch_seconds
        .checked_mul(unit.ticks_per_second())
        .and_then(|t| t.checked_add(sub_ticks))
        .ok_or_else(out_of_range)
}
