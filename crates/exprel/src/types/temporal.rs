//! Timestamp and Duration values.

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

use super::traits::{Comparer, Converter, Equaler, Negater};
use super::{
    ConversionError, ErrorValue, Kind, NativeType, NativeValue, Type, Value, no_such_overload,
    not_equal,
};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Parse an RFC 3339 timestamp, normalized to UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339)
        .ok()
        .map(|timestamp| timestamp.to_offset(UtcOffset::UTC))
}

pub(crate) fn format_timestamp(timestamp: &OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Parse a duration such as `1h30m`, `-1.5s` or `250ms`.
///
/// Accepted units are `h`, `m`, `s`, `ms`, `us` (or `µs`) and `ns`; a bare
/// `0` is also accepted.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];
        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale: i128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3_600 * NANOS_PER_SECOND,
            _ => return None,
        };
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut nanos = whole.checked_mul(scale)?;
        let mut place = scale;
        for digit in fraction.chars() {
            let digit = digit.to_digit(10)?;
            place /= 10;
            nanos += i128::from(digit) * place;
        }
        total = total.checked_add(nanos)?;
    }

    if negative {
        total = -total;
    }
    let seconds = i64::try_from(total / NANOS_PER_SECOND).ok()?;
    let nanos = (total % NANOS_PER_SECOND) as i32;
    Some(Duration::new(seconds, nanos))
}

/// Render a duration in seconds, e.g. `90s` or `-1.5s`.
pub fn format_duration(duration: &Duration) -> String {
    let total = duration.whole_nanoseconds();
    let sign = if total < 0 { "-" } else { "" };
    let magnitude = total.unsigned_abs();
    let seconds = magnitude / NANOS_PER_SECOND as u128;
    let nanos = magnitude % NANOS_PER_SECOND as u128;
    if nanos == 0 {
        format!("{sign}{seconds}s")
    } else {
        let fraction = format!("{nanos:09}");
        format!("{sign}{seconds}.{}s", fraction.trim_end_matches('0'))
    }
}

// =============================================================================
// Timestamp
// =============================================================================

impl Comparer for OffsetDateTime {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Timestamp(other) => Value::from(self.cmp(other)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for OffsetDateTime {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Timestamp(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Converter for OffsetDateTime {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Timestamp | Kind::Dyn => Value::Timestamp(*self),
            Kind::Int => Value::Int(self.unix_timestamp()),
            Kind::String => Value::string(format_timestamp(self)),
            Kind::Type => Value::Type(Type::Timestamp),
            _ => Value::Error(ErrorValue::conversion(&Type::Timestamp, target)),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::String => Ok(NativeValue::String(format_timestamp(self))),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::String(
                format_timestamp(self),
            ))),
            NativeType::Value => Ok(NativeValue::Value(Value::Timestamp(*self))),
            _ => Err(ConversionError::new(Kind::Timestamp, target)),
        }
    }
}

// =============================================================================
// Duration
// =============================================================================

impl Comparer for Duration {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Duration(other) => Value::from(self.cmp(other)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for Duration {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Duration(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Negater for Duration {
    fn negate(&self) -> Value {
        match self.checked_neg() {
            Some(negated) => Value::Duration(negated),
            None => Value::error("duration overflow"),
        }
    }
}

impl Converter for Duration {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Duration | Kind::Dyn => Value::Duration(*self),
            Kind::Int => Value::Int(self.whole_seconds()),
            Kind::String => Value::string(format_duration(self)),
            Kind::Type => Value::Type(Type::Duration),
            _ => Value::Error(ErrorValue::conversion(&Type::Duration, target)),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::String => Ok(NativeValue::String(format_duration(self))),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::String(
                format_duration(self),
            ))),
            NativeType::Value => Ok(NativeValue::Value(Value::Duration(*self))),
            _ => Err(ConversionError::new(Kind::Duration, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("1h30m"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("-1.5s"), Some(Duration::milliseconds(-1500)));
        assert_eq!(parse_duration("250ms"), Some(Duration::milliseconds(250)));
        assert_eq!(parse_duration("3us"), Some(Duration::microseconds(3)));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5"), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration(".s"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::minutes(90)), "5400s");
        assert_eq!(format_duration(&Duration::milliseconds(-1500)), "-1.5s");
        assert_eq!(format_duration(&Duration::nanoseconds(1)), "0.000000001s");
    }

    #[test]
    fn test_timestamp_round_trips_through_string() {
        let timestamp = parse_timestamp("2024-02-29T12:30:00+02:00").unwrap();
        assert_eq!(timestamp.offset(), UtcOffset::UTC);
        assert_eq!(format_timestamp(&timestamp), "2024-02-29T10:30:00Z");
        assert_eq!(
            Value::Timestamp(timestamp).convert_to_type(&Type::Int),
            Value::Int(1_709_202_600)
        );
    }

    #[test]
    fn test_compare_across_kinds_is_error() {
        let duration = Value::Duration(Duration::SECOND);
        assert_eq!(duration.compare(&Value::Duration(Duration::ZERO)), Value::Int(1));
        assert!(duration.compare(&Value::Int(1)).is_error());
        assert_eq!(duration.negate(), Value::Duration(-Duration::SECOND));
    }
}
