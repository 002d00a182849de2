//! Fixed scientific-notation number format of the spectrum files.
//!
//! Every field is written as sign-aware scientific notation with ten
//! decimal digits and a signed, zero-padded two-digit exponent, e.g.
//! ` 1.2345678901e-13` or `-4.3950000000e+00`. Non-negative values carry a
//! leading space where the minus sign would sit, keeping columns aligned.

/// Format a finite value in the fixed spectrum-file notation.
pub fn format_field(value: f64) -> String {
    assert!(value.is_finite(), "spectrum files never carry {}", value);
    let plain = format!("{:.10e}", value);
    // `{:e}` emits a bare exponent ("e2", "e-13"); rebuild it signed and
    // zero-padded.
    let (mantissa, exponent) = plain
        .split_once('e')
        .unwrap_or((plain.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if value.is_sign_negative() { "" } else { " " };
    if exponent < 0 {
        format!("{}{}e-{:02}", sign, mantissa, -exponent)
    } else {
        format!("{}{}e+{:02}", sign, mantissa, exponent)
    }
}

/// Format one row of fields separated by single spaces.
pub fn format_row(fields: &[f64]) -> String {
    fields
        .iter()
        .map(|&v| format_field(v))
        .collect::<Vec<_>>()
        .join(" ")
}
