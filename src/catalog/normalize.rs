//! Normalizers for raw advisory, score and vote-count text
//!
//! These map the free-form strings found on title pages to the bounded
//! numeric codes stored in the catalog.

use crate::catalog::record::SEVERITY_UNKNOWN;

/// Maps an advisory severity label to its code
///
/// | Label | Code |
/// |-------|------|
/// | None | 0 |
/// | Mild | 1 |
/// | Moderate | 2 |
/// | Severe | 3 |
/// | anything else | 4 |
pub fn normalize_severity(label: &str) -> u8 {
    match label.trim() {
        "None" => 0,
        "Mild" => 1,
        "Moderate" => 2,
        "Severe" => 3,
        _ => SEVERITY_UNKNOWN,
    }
}

/// Maps an aggregate score (e.g. "8.1") to a rating tier
///
/// Returns 3 above 8.8, 2 above 7.7, and 1 otherwise. Returns None when the
/// text is not a decimal number; callers reject the extraction in that case.
pub fn normalize_rating(score_text: &str) -> Option<u8> {
    let score: f64 = score_text.trim().parse().ok()?;
    if !score.is_finite() {
        return None;
    }

    let tier = if score > 8.8 {
        3
    } else if score > 7.7 {
        2
    } else {
        1
    };
    Some(tier)
}

/// Expands a vote-count string such as "1.2M", "850K" or "12,345"
///
/// The numeric prefix is everything before the first letter; a trailing
/// K/M/B (any case) multiplies by a thousand, million or billion. Returns
/// None if there is no usable number.
pub fn normalize_popularity(vote_text: &str) -> Option<u64> {
    let text = vote_text.trim();
    let numeric: String = text
        .chars()
        .take_while(|c| !c.is_ascii_alphabetic())
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    let exponent = match text.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => 3,
        Some('M') => 6,
        Some('B') => 9,
        _ => 0,
    };

    scale_decimal(&numeric, exponent)
}

/// Multiplies a plain decimal string by 10^exponent without float rounding
///
/// Digits past the scaled integer part are truncated.
fn scale_decimal(numeric: &str, exponent: u32) -> Option<u64> {
    let (whole, fraction) = match numeric.split_once('.') {
        Some((w, f)) => (w, f),
        None => (numeric, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let whole_value: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole_value.checked_mul(10u64.checked_pow(exponent)?)?;

    for (i, digit) in fraction.chars().take(exponent as usize).enumerate() {
        let place = 10u64.pow(exponent - 1 - i as u32);
        value = value.checked_add(u64::from(digit.to_digit(10)?) * place)?;
    }

    Some(value)
}
