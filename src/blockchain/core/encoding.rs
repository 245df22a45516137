//! Canonical JSON encoding for block hashing.
//!
//! Nodes only agree on a block hash if they feed byte-identical text into
//! SHA-256, so the encoding is pinned down completely: object keys sorted,
//! `", "` between items, `": "` after keys, and everything outside printable
//! ASCII escaped as `\uXXXX` UTF-16 code units. This is the form peers on the
//! network already produce for `GET /get_chain` payloads.

use serde_json::Value;

pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => write_float(f, out),
            // Integers keep their exact digits, however wide.
            _ => out.push_str(&n.to_string()),
        },
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(key, out);
                out.push_str(": ");
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

/// Shortest round-trip digits, laid out the way `repr` prints a double:
/// positional for decimal exponents in `-4..16` (always with a fractional
/// part), otherwise `d.ddde+XX` with a signed exponent of at least two digits.
fn write_float(f: f64, out: &mut String) {
    if f.is_sign_negative() {
        out.push('-');
    }

    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exponent) {
        if exponent < 0 {
            out.push_str("0.");
            out.push_str(&"0".repeat((-exponent - 1) as usize));
            out.push_str(&digits);
        } else {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                out.push_str(&digits);
                out.push_str(&"0".repeat(int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        out.push_str(&format!("e{}{:02}", sign, exponent.abs()));
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_with_spaced_separators() {
        let value = json!({"b": 1, "a": [1, 2], "c": {"z": null, "y": true}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a": [1, 2], "b": 1, "c": {"y": true, "z": null}}"#
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(canonical_json(&json!([])), "[]");
        assert_eq!(canonical_json(&json!({})), "{}");
    }

    #[test]
    fn test_non_ascii_and_control_escapes() {
        let value = json!({"sender": "Zoë", "receiver": "\u{7f}\n", "amount": 2.5});
        assert_eq!(
            canonical_json(&value),
            r#"{"amount": 2.5, "receiver": "\u007f\n", "sender": "Zo\u00eb"}"#
        );
    }

    #[test]
    fn test_astral_chars_use_surrogate_pairs() {
        assert_eq!(canonical_json(&json!("😀")), r#""\ud83d\ude00""#);
    }

    #[test]
    fn test_quotes_and_backslashes() {
        assert_eq!(canonical_json(&json!("a\"b\\c")), r#""a\"b\\c""#);
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(canonical_json(&json!(10)), "10");
        assert_eq!(canonical_json(&json!(-3)), "-3");
        assert_eq!(canonical_json(&json!(10.0)), "10.0");
        assert_eq!(canonical_json(&json!(0.1)), "0.1");
        assert_eq!(canonical_json(&json!(-0.0)), "-0.0");
    }

    #[test]
    fn test_float_layout_matches_repr() {
        let cases = [
            (0.00001, "1e-05"),
            (0.0001, "0.0001"),
            (1.5e-7, "1.5e-07"),
            (123.456, "123.456"),
            (1e15, "1000000000000000.0"),
            (1e16, "1e+16"),
            (1.5e16, "1.5e+16"),
            (-2.5e-300, "-2.5e-300"),
            (1.7976931348623157e308, "1.7976931348623157e+308"),
        ];
        for (value, expected) in cases {
            assert_eq!(canonical_json(&json!(value)), expected, "{}", value);
        }
    }

    #[test]
    fn test_wide_integers_keep_their_digits() {
        let value: Value =
            serde_json::from_str("[100000000000000000000, -100000000000000000000]").unwrap();
        assert_eq!(
            canonical_json(&value),
            "[100000000000000000000, -100000000000000000000]"
        );
    }
}
