//! Canonical, locale-independent string forms for fixture values.
//!
//! Every value the fixture writes goes through one of these functions so two
//! seeders produce byte-identical cells.

/// Shortest decimal string that parses back to `v`, in plain notation and
/// always with a fractional part (`2.0`, never `2` or `2e0`).
pub fn format_double(v: f64) -> String {
    if !v.is_finite() {
        if v.is_nan() {
            return "NaN".to_string();
        }
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut s = format!("{}", v);
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

/// Base-10 integer with a leading '-' for negatives and no grouping.
pub fn format_long(v: i64) -> String {
    v.to_string()
}

/// `"true"` or `"false"`.
pub fn format_bool(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}
