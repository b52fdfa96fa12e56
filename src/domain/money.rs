use thiserror::Error;

/// Money is represented as integer cents so that splits never lose a minor unit.
/// For EUR/USD, 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Percentages are hundredths of a percent: 33.33% = 3333, 100% = 10_000.
pub type BasisPoints = i64;

/// One whole (100%) expressed in basis points.
pub const FULL_PERCENTAGE: BasisPoints = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format: '{0}'")]
    InvalidFormat(String),

    #[error("amount out of range: '{0}'")]
    OutOfRange(String),
}

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    format_fixed2(cents)
}

/// Format basis points as a percentage without the sign.
/// Example: 3333 -> "33.33", 10000 -> "100.00"
pub fn format_percentage(basis_points: BasisPoints) -> String {
    format_fixed2(basis_points)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    parse_fixed2(input)
}

/// Parse a percentage string ("33.33", "50", "12.5%") into basis points.
pub fn parse_percentage(input: &str) -> Result<BasisPoints, ParseCentsError> {
    parse_fixed2(input.trim().trim_end_matches('%'))
}

fn format_fixed2(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

// Two fraction digits; extra digits are truncated, never rounded up.
fn parse_fixed2(input: &str) -> Result<i64, ParseCentsError> {
    let raw = input.trim();
    let invalid = || ParseCentsError::InvalidFormat(raw.to_string());

    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let (whole, fraction) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };

    if (whole.is_empty() && fraction.is_empty())
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseCentsError::OutOfRange(raw.to_string()))?
    };

    let hundredths: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => fraction[..2].parse().map_err(|_| invalid())?,
    };

    let value = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(hundredths))
        .ok_or_else(|| ParseCentsError::OutOfRange(raw.to_string()))?;

    Ok(if negative { -value } else { value })
}
