//! Positional message formatting for pending-wait diagnostics
//!
//! Templates use printf-style placeholders in the manner of Node's
//! `util.format`:
//!
//! | placeholder | rendering                                   |
//! |-------------|---------------------------------------------|
//! | `%s`        | strings verbatim, everything else as JSON    |
//! | `%d`        | numeric value (`NaN` when not numeric)       |
//! | `%i`        | integer part of the numeric value            |
//! | `%f`        | floating point value                         |
//! | `%j` `%o` `%O` | compact JSON                              |
//! | `%%`        | a literal `%`                                |
//!
//! A placeholder with no argument left is kept verbatim, and arguments left
//! over after the template is exhausted are appended separated by spaces.

use serde_json::Value;

/// Render `template` with positional `args`.
pub fn format_message(template: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut remaining = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O')) => {
                chars.next();
                match remaining.next() {
                    Some(arg) => out.push_str(&render(spec, arg)),
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            _ => out.push('%'),
        }
    }

    for arg in remaining {
        out.push(' ');
        out.push_str(&render('s', arg));
    }

    out
}

fn render(spec: char, arg: &Value) -> String {
    match spec {
        's' => match arg {
            Value::String(s) => s.clone(),
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            Value::Number(n) => js_number(n.as_f64().unwrap_or(f64::NAN)),
            other => other.to_string(),
        },
        'd' | 'f' => js_number(to_number(arg)),
        'i' => js_number(to_number(arg).trunc()),
        _ => arg.to_string(),
    }
}

/// Numeric coercion with JavaScript `Number()` semantics.
fn to_number(arg: &Value) -> f64 {
    match arg {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Display a number the way JavaScript stringifies it for common values.
fn js_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_and_number_substitution() {
        let msg = format_message("Waiting for %s to equal %d", &[json!("count"), json!(5)]);
        assert_eq!(msg, "Waiting for count to equal 5");
    }

    #[test]
    fn test_json_placeholder() {
        let msg = format_message(
            "Element %j does not exist",
            &[json!(["#file-list", "li.table-row"])],
        );
        assert_eq!(msg, r##"Element ["#file-list","li.table-row"] does not exist"##);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(format_message("%d", &[json!("42")]), "42");
        assert_eq!(format_message("%d", &[json!("abc")]), "NaN");
        assert_eq!(format_message("%i", &[json!(7.9)]), "7");
        assert_eq!(format_message("%f", &[json!(2.5)]), "2.5");
        assert_eq!(format_message("%d", &[json!(true)]), "1");
        assert_eq!(format_message("%d", &[json!({"a": 1})]), "NaN");
    }

    #[test]
    fn test_float_without_fraction_prints_as_integer() {
        assert_eq!(format_message("%d rows", &[json!(3.0)]), "3 rows");
        assert_eq!(format_message("%s rows", &[json!(3.0)]), "3 rows");
    }

    #[test]
    fn test_percent_escape() {
        assert_eq!(format_message("100%% done", &[]), "100% done");
        assert_eq!(format_message("50% off", &[]), "50% off");
    }

    #[test]
    fn test_missing_args_keep_placeholder() {
        assert_eq!(
            format_message("expected %s got %s", &[json!("a")]),
            "expected a got %s"
        );
    }

    #[test]
    fn test_extra_args_are_appended() {
        assert_eq!(
            format_message("files:", &[json!("a.txt"), json!(2), json!(null)]),
            "files: a.txt 2 null"
        );
    }

    #[test]
    fn test_non_string_with_s_placeholder() {
        assert_eq!(format_message("%s", &[json!({"k": "v"})]), r#"{"k":"v"}"#);
        assert_eq!(format_message("%s", &[json!(null)]), "null");
    }
}
