//! Human-friendly size and duration parsing for command-line filters

use std::time::Duration;

const KIB: f64 = 1024.0;

/// Errors parsing size or duration strings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("empty {0}")]
    Empty(&'static str),

    #[error("invalid {kind} format: {input}")]
    Malformed { kind: &'static str, input: String },

    #[error("unknown unit in byte size: {0} (valid units: B, KB, MB, GB, TB)")]
    UnknownSizeUnit(String),

    #[error("unknown unit in duration: {0} (valid units: ns, us, ms, s, m, h, d, w)")]
    UnknownDurationUnit(String),
}

/// Parse a byte size such as `500MB`, `1.5G` or `4096`.
///
/// Units are 1024-based and case-insensitive; a bare number is bytes.
pub fn parse_byte_size(input: &str) -> Result<u64, UnitError> {
    let s = input.trim().to_ascii_uppercase();
    if s.is_empty() {
        return Err(UnitError::Empty("byte size"));
    }

    let (number, unit) = split_number(&s);
    let value: f64 = number.parse().map_err(|_| UnitError::Malformed {
        kind: "byte size",
        input: input.to_string(),
    })?;

    let multiplier = match unit.trim() {
        "" | "B" => 1.0,
        "K" | "KB" => KIB,
        "M" | "MB" => KIB * KIB,
        "G" | "GB" => KIB * KIB * KIB,
        "T" | "TB" => KIB * KIB * KIB * KIB,
        other => return Err(UnitError::UnknownSizeUnit(other.to_string())),
    };

    Ok((value * multiplier) as u64)
}

/// Parse a duration such as `30d`, `2w`, `1h30m` or `90s`.
///
/// Accepts `ns`, `us`/`µs`, `ms`, `s`, `m`, `h` plus `d`/`day`/`days` and
/// `w`/`week`/`weeks`. Groups may be chained.
pub fn parse_duration(input: &str) -> Result<Duration, UnitError> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return Err(UnitError::Empty("duration"));
    }

    let malformed = || UnitError::Malformed {
        kind: "duration",
        input: input.to_string(),
    };

    let mut total = 0.0_f64;
    let mut rest = s.as_str();
    while !rest.is_empty() {
        let (number, after) = split_number(rest);
        if number.is_empty() {
            return Err(malformed());
        }
        let value: f64 = number.parse().map_err(|_| malformed())?;

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, next) = after.split_at(unit_len);

        let nanos = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3_600.0 * 1e9,
            "d" | "day" | "days" => 86_400.0 * 1e9,
            "w" | "week" | "weeks" => 604_800.0 * 1e9,
            "" => return Err(malformed()),
            other => return Err(UnitError::UnknownDurationUnit(other.to_string())),
        };

        total += value * nanos;
        rest = next;
    }

    Ok(Duration::from_nanos(total.round() as u64))
}

/// Split a leading decimal number from its unit suffix.
fn split_number(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_size_units() {
        assert_eq!(parse_byte_size("4096").unwrap(), 4096);
        assert_eq!(parse_byte_size("1KB").unwrap(), 1024);
        assert_eq!(parse_byte_size("500mb").unwrap(), 500 * 1024 * 1024);
        assert_eq!(parse_byte_size("1GB").unwrap(), 1_073_741_824);
        assert_eq!(parse_byte_size("1.5G").unwrap(), 1_610_612_736);
        assert_eq!(parse_byte_size(" 2 T ").unwrap(), 2 * 1024_u64.pow(4));
    }

    #[test]
    fn test_parse_byte_size_errors() {
        assert_eq!(parse_byte_size(""), Err(UnitError::Empty("byte size")));
        assert!(matches!(parse_byte_size("GB"), Err(UnitError::Malformed { .. })));
        assert!(matches!(parse_byte_size("1.2.3G"), Err(UnitError::Malformed { .. })));
        assert_eq!(
            parse_byte_size("10PB"),
            Err(UnitError::UnknownSizeUnit("PB".to_string()))
        );
    }

    #[test]
    fn test_parse_duration_standard_units() {
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_duration_days_and_weeks() {
        assert_eq!(parse_duration("30d").unwrap(), Duration::from_secs(30 * 86_400));
        assert_eq!(parse_duration("1w").unwrap(), Duration::from_secs(604_800));
        assert_eq!(parse_duration("2weeks").unwrap(), Duration::from_secs(2 * 604_800));
        assert_eq!(parse_duration("1DAY").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert_eq!(parse_duration("  "), Err(UnitError::Empty("duration")));
        assert!(matches!(parse_duration("d"), Err(UnitError::Malformed { .. })));
        assert!(matches!(parse_duration("10"), Err(UnitError::Malformed { .. })));
        assert_eq!(
            parse_duration("3fortnights"),
            Err(UnitError::UnknownDurationUnit("fortnights".to_string()))
        );
    }
}
