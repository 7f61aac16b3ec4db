//! Parsing of the timestamps written into IRIS headers.

use hifitime::Epoch;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TimeParseError {
    #[error("Couldn't parse '{0}' as a date and time")]
    Format(String),

    #[error("Couldn't parse '{field}' of '{time}' as a number")]
    Number { time: String, field: String },
}

/// Parse an IRIS timestamp (UTC), e.g. `2014-09-10T11:44:11.660`. Slashes may
/// separate the date parts, a space may separate the date from the time, and a
/// trailing `Z` is ignored.
pub fn parse_iris_time(time: &str) -> Result<Epoch, TimeParseError> {
    let trimmed = time.trim().trim_end_matches('Z');
    let (date, clock) = trimmed
        .split_once(|c: char| c == 'T' || c == ' ')
        .ok_or_else(|| TimeParseError::Format(time.to_string()))?;

    let number = |field: &str| TimeParseError::Number {
        time: time.to_string(),
        field: field.to_string(),
    };

    let date_parts: Vec<&str> = date.split(|c: char| c == '-' || c == '/').collect();
    let clock_parts: Vec<&str> = clock.trim().split(':').collect();
    let (year, month, day, hour, minute, seconds) =
        match (date_parts.as_slice(), clock_parts.as_slice()) {
            ([y, mo, d], [h, mi, s]) => (*y, *mo, *d, *h, *mi, *s),
            // Seconds are sometimes left off.
            ([y, mo, d], [h, mi]) => (*y, *mo, *d, *h, *mi, "0"),
            _ => return Err(TimeParseError::Format(time.to_string())),
        };

    let year: i32 = year.parse().map_err(|_| number(year))?;
    let month: u8 = month.parse().map_err(|_| number(month))?;
    let day: u8 = day.parse().map_err(|_| number(day))?;
    let hour: u8 = hour.parse().map_err(|_| number(hour))?;
    let minute: u8 = minute.parse().map_err(|_| number(minute))?;

    let (whole_seconds, nanos) = match seconds.split_once('.') {
        Some((whole, frac)) => {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(number(seconds));
            }
            // Keep nanosecond precision; pad or truncate the fraction.
            let digits: String = frac.chars().chain(std::iter::repeat('0')).take(9).collect();
            let nanos: u32 = digits.parse().map_err(|_| number(seconds))?;
            (whole, nanos)
        }
        None => (seconds, 0),
    };
    let second: u8 = whole_seconds.parse().map_err(|_| number(seconds))?;

    Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos)
        .map_err(|_| TimeParseError::Format(time.to_string()))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use hifitime::Duration;

    use super::*;

    #[test]
    fn test_parse_iso() {
        let e = parse_iris_time("2014-09-10T11:44:11.660").unwrap();
        let expected = Epoch::from_gregorian_utc(2014, 9, 10, 11, 44, 11, 660_000_000);
        assert_eq!(e, expected);

        assert_eq!(parse_iris_time("2014-09-10T11:44:11.660Z").unwrap(), expected);
        assert_eq!(parse_iris_time("2014/09/10 11:44:11.66").unwrap(), expected);
    }

    #[test]
    fn test_parse_without_seconds() {
        let e = parse_iris_time("2014-09-10T11:44").unwrap();
        assert_eq!(e, Epoch::from_gregorian_utc_hms(2014, 9, 10, 11, 44, 0));
    }

    #[test]
    fn test_offsets_add() {
        let e = parse_iris_time("2014-09-10T11:44:11").unwrap();
        let later = e + Duration::from_seconds(12.5);
        assert_abs_diff_eq!((later - e).to_seconds(), 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_bad_times() {
        assert!(matches!(
            parse_iris_time("yesterday"),
            Err(TimeParseError::Format(_))
        ));
        assert!(matches!(
            parse_iris_time("2014-13-10T11:44:11"),
            Err(TimeParseError::Format(_))
        ));
        assert!(matches!(
            parse_iris_time("2014-09-xxT11:44:11"),
            Err(TimeParseError::Number { .. })
        ));
        assert!(matches!(
            parse_iris_time("2014-09-10T11:44:11.6a"),
            Err(TimeParseError::Number { .. })
        ));
    }
}
