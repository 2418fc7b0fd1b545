//! Rounding and display of uncertainties
//!
//! Uncertainties are reported to a few significant digits. Two rules are
//! supported: round half up, or the 5 % rule, which truncates unless the
//! dropped part exceeds 5 % of the value, in which case the last kept digit is
//! bumped.

use serde::{Deserialize, Serialize};

/// How the last significant digit of an uncertainty is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    #[serde(rename = "5_percent")]
    FivePercent,
    #[serde(rename = "round_up")]
    RoundUp,
}

impl std::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingMode::FivePercent => write!(f, "5_percent"),
            RoundingMode::RoundUp => write!(f, "round_up"),
        }
    }
}

/// Guard against `1.2 * 10 = 11.999...` style representation error
const DIGIT_EPSILON: f64 = 1e-9;

/// Round an uncertainty to `significant_digits` digits
pub fn round_uncertainty(value: f64, significant_digits: u32, mode: RoundingMode) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let digits = significant_digits.max(1) as i32;
    let mut magnitude = value.abs().log10().floor() as i32;
    // Mantissa scaled so the kept digits are the integer part
    let mut scaled = value.abs() * 10f64.powi(digits - 1 - magnitude);
    if scaled >= 10f64.powi(digits) {
        scaled /= 10.0;
        magnitude += 1;
    } else if scaled < 10f64.powi(digits - 1) {
        scaled *= 10.0;
        magnitude -= 1;
    }

    let truncated = (scaled + DIGIT_EPSILON).floor();
    let units = match mode {
        RoundingMode::RoundUp => (scaled + 0.5 + DIGIT_EPSILON).floor(),
        RoundingMode::FivePercent => {
            if (scaled - truncated) / scaled <= 0.05 {
                truncated
            } else {
                truncated + 1.0
            }
        }
    };

    // Rebuild through decimal text so the result is the nearest double
    let exponent = magnitude - (digits - 1);
    let rounded = format!("{}e{}", units as i64, exponent)
        .parse::<f64>()
        .unwrap_or(units * 10f64.powi(exponent));
    if value < 0.0 {
        -rounded
    } else {
        rounded
    }
}

/// Split into a mantissa in [1, 1000) and an exponent that is a multiple of 3
pub fn engineering_parts(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let mut mantissa = value.abs();
    let mut exponent = 0;
    while mantissa >= 1000.0 {
        mantissa /= 1000.0;
        exponent += 3;
    }
    while mantissa < 1.0 {
        mantissa *= 1000.0;
        exponent -= 3;
    }
    (mantissa.copysign(value), exponent)
}

/// Engineering notation with a 6-decimal mantissa, e.g. `1.234567E3`
pub fn format_engineering(value: f64) -> String {
    let (mantissa, exponent) = engineering_parts(value);
    let mantissa = (mantissa * 1e6).round() / 1e6;
    if exponent == 0 {
        format!("{}", mantissa)
    } else {
        format!("{}E{}", mantissa, exponent)
    }
}

/// Rounded uncertainty in engineering notation, e.g. `12E-3` for 0.01234
pub fn format_uncertainty(value: f64, significant_digits: u32, mode: RoundingMode) -> String {
    let rounded = round_uncertainty(value, significant_digits, mode);
    let (mantissa, exponent) = engineering_parts(rounded);
    // Digits before the point are already significant; keep the rest
    let int_digits = if mantissa.abs() >= 100.0 {
        3
    } else if mantissa.abs() >= 10.0 {
        2
    } else {
        1
    };
    let decimals = (significant_digits.max(1) as usize).saturating_sub(int_digits);
    if exponent == 0 {
        format!("{:.*}", decimals, mantissa)
    } else {
        format!("{:.*}E{}", decimals, mantissa, exponent)
    }
}
