// Lenient money coercion for formatted currency strings ("$1,234.50", "¥ 980").

use serde_json::Value;

/// Strip everything except ASCII digits, `-` and `.`, then parse the longest
/// numeric prefix of what is left.
///
/// Leftovers after the number are ignored, so "$5.00/mo." reads as 5.0. A
/// string with no leading number becomes `0.0`.
pub fn parse_lenient_amount(raw: &str) -> f64 {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    numeric_prefix(&kept)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// `-?digits(.digits)?` from the start of an ASCII string.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        start
            + bytes[start..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count()
    };

    let mut end = usize::from(bytes.first() == Some(&b'-'));
    end = digits_from(end);
    if bytes.get(end) == Some(&b'.') {
        end = digits_from(end + 1);
    }
    &s[..end]
}

/// Apply the same coercion to a JSON value: numbers are taken as-is, strings
/// go through `parse_lenient_amount`, anything else (including absence) is zero.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => parse_lenient_amount(s),
        _ => 0.0,
    }
}
