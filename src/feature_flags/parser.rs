// ABOUTME: Lenient `key: value` flag file parser producing raw, unvalidated values
// ABOUTME: Scalars follow JavaScript Number() rules so existing flag files keep their meaning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::types::{FeatureFlagRecord, RawFlagValue};
use tracing::warn;

/// Parse flag file contents into a record
///
/// Never fails: blank lines and `#` comments are ignored, malformed lines are
/// skipped with a warning, and a repeated key keeps its last value.
#[must_use]
pub fn parse_flags(contents: &str) -> FeatureFlagRecord {
    let mut record = FeatureFlagRecord::new();

    // `lines` also strips the `\r` of CRLF endings
    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, raw_value)) = trimmed.split_once(':') else {
            warn!(line = index + 1, content = %trimmed, "Skipping flag line without ':' separator");
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            warn!(line = index + 1, content = %trimmed, "Skipping flag line with empty key");
            continue;
        }

        let value = raw_value
            .split_once('#')
            .map_or(raw_value, |(before_comment, _)| before_comment);

        record.insert(key.to_owned(), parse_scalar(value));
    }

    record
}

/// Parse one scalar value
///
/// Empty input yields an empty string. One pair of matching surrounding quotes
/// is removed, then `true`/`false`/`null` (any case) and numbers are recognized.
#[must_use]
pub fn parse_scalar(value: &str) -> RawFlagValue {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return RawFlagValue::Text(String::new());
    }

    let unquoted = strip_quotes(trimmed);

    match unquoted.to_lowercase().as_str() {
        "true" => return RawFlagValue::Bool(true),
        "false" => return RawFlagValue::Bool(false),
        "null" => return RawFlagValue::Null,
        _ => {}
    }

    if !unquoted.is_empty() {
        if let Some(number) = parse_js_number(unquoted) {
            return RawFlagValue::Number(number);
        }
    }

    RawFlagValue::Text(unquoted.to_owned())
}

/// Remove one pair of surrounding `"` or `'`; a lone quote becomes empty
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.starts_with(quote) && value.ends_with(quote) {
            return value.get(1..value.len().saturating_sub(1)).unwrap_or("");
        }
    }
    value
}

/// Numeric conversion with JavaScript `Number()` semantics
///
/// Accepts surrounding whitespace, decimal literals with optional sign, dot and
/// exponent, `Infinity` with optional sign, and unsigned `0x`/`0o`/`0b` integers.
/// Returns `None` where `Number()` would produce `NaN`. Whitespace-only input
/// is `0`, as in JavaScript.
#[must_use]
pub fn parse_js_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }

    if let Some(number) = parse_radix_literal(text) {
        return number;
    }

    let (sign, unsigned) = match text.as_bytes()[0] {
        b'-' => (-1.0, &text[1..]),
        b'+' => (1.0, &text[1..]),
        _ => (1.0, text),
    };

    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    if !is_decimal_literal(unsigned) {
        return None;
    }
    unsigned.parse::<f64>().ok().map(|value| sign * value)
}

/// `Some(result)` when `text` has a radix prefix, `None` otherwise
fn parse_radix_literal(text: &str) -> Option<Option<f64>> {
    let prefix = text.get(..2)?.to_ascii_lowercase();
    let radix = match prefix.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };

    let digits = &text[2..];
    if digits.is_empty() {
        return Some(None);
    }
    Some(digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix)
            .map(|digit| acc.mul_add(f64::from(radix), f64::from(digit)))
    }))
}

/// `digits [. digits] [e [sign] digits]` with at least one mantissa digit
fn is_decimal_literal(text: &str) -> bool {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(position) => (&text[..position], Some(&text[position + 1..])),
        None => (text, None),
    };

    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if integer.is_empty() && fraction.is_empty() {
        return false;
    }
    if !all_digits(integer) || !all_digits(fraction) {
        return false;
    }

    exponent.is_none_or(|exponent| {
        let digits = exponent
            .strip_prefix(['+', '-'])
            .unwrap_or(exponent);
        !digits.is_empty() && all_digits(digits)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_basic_file() {
        let record = parse_flags(
            "# comment\n\
             STREAMING_ENABLED: false\r\n\
             \n\
             PAGINATION_LIMIT: 15 # inline comment\n\
             NAME: \"quoted value\"\n\
             EMPTY:\n\
             URL: http://example.com\n",
        );

        assert_eq!(record.get("STREAMING_ENABLED"), Some(&RawFlagValue::Bool(false)));
        assert_eq!(record.get("PAGINATION_LIMIT"), Some(&RawFlagValue::Number(15.0)));
        assert_eq!(
            record.get("NAME"),
            Some(&RawFlagValue::Text("quoted value".to_owned()))
        );
        assert_eq!(record.get("EMPTY"), Some(&RawFlagValue::Text(String::new())));
        assert_eq!(
            record.get("URL"),
            Some(&RawFlagValue::Text("http://example.com".to_owned()))
        );
    }

    #[test]
    fn test_parse_flags_skips_malformed_lines() {
        let record = parse_flags("no separator here\n: missing key\nOK: 1\n");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("OK"), Some(&RawFlagValue::Number(1.0)));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let record = parse_flags("A: 1\nA: 2\n");
        assert_eq!(record.get("A"), Some(&RawFlagValue::Number(2.0)));
    }

    #[test]
    fn test_parse_scalar_keywords_case_insensitive() {
        assert_eq!(parse_scalar("TRUE"), RawFlagValue::Bool(true));
        assert_eq!(parse_scalar("'False'"), RawFlagValue::Bool(false));
        assert_eq!(parse_scalar("Null"), RawFlagValue::Null);
        assert_eq!(parse_scalar("yes"), RawFlagValue::Text("yes".to_owned()));
    }

    #[test]
    fn test_parse_scalar_quotes() {
        assert_eq!(parse_scalar("\"\""), RawFlagValue::Text(String::new()));
        assert_eq!(parse_scalar("\""), RawFlagValue::Text(String::new()));
        assert_eq!(parse_scalar("'42'"), RawFlagValue::Number(42.0));
        assert_eq!(parse_scalar("\"abc'"), RawFlagValue::Text("\"abc'".to_owned()));
    }

    #[test]
    fn test_js_number_semantics() {
        assert_eq!(parse_js_number("42"), Some(42.0));
        assert_eq!(parse_js_number(" -3.5 "), Some(-3.5));
        assert_eq!(parse_js_number("+.5"), Some(0.5));
        assert_eq!(parse_js_number("5."), Some(5.0));
        assert_eq!(parse_js_number("1e3"), Some(1000.0));
        assert_eq!(parse_js_number("2E-2"), Some(0.02));
        assert_eq!(parse_js_number("0x1F"), Some(31.0));
        assert_eq!(parse_js_number("0b101"), Some(5.0));
        assert_eq!(parse_js_number("0o17"), Some(15.0));
        assert_eq!(parse_js_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_js_number("Infinity"), Some(f64::INFINITY));

        assert_eq!(parse_js_number("NaN"), None);
        assert_eq!(parse_js_number("inf"), None);
        assert_eq!(parse_js_number("."), None);
        assert_eq!(parse_js_number("1e"), None);
        assert_eq!(parse_js_number("-0x10"), None);
        assert_eq!(parse_js_number("0x"), None);
        assert_eq!(parse_js_number("12abc"), None);
        assert_eq!(parse_js_number("1_000"), None);
    }
}
