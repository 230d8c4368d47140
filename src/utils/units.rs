//! Decimal amount <-> integer base unit conversion
//!
//! Amounts arrive as plain decimal strings (`"0.001"`, `"12"`, `".5"`).
//! Digits beyond the asset's precision are truncated, never rounded.

use crate::error::{EngineError, EngineResult};

/// Split a decimal string into integer and fraction digits.
fn split_decimal(amount: &str) -> EngineResult<(&str, &str)> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid_input("Amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(EngineError::invalid_input("Amount cannot be negative"));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(EngineError::invalid_input(format!("Invalid amount: {}", trimmed)));
    }
    Ok((int_part, frac_part))
}

/// Decimal string to base units, truncating extra precision.
pub fn to_base_units(amount: &str, decimals: u8) -> EngineResult<u128> {
    let (int_part, frac_part) = split_decimal(amount)?;
    let precision = decimals as usize;

    let kept = &frac_part[..frac_part.len().min(precision)];
    let padded = format!("{:0<width$}", kept, width = precision);

    let overflow = || EngineError::invalid_input(format!("Amount too large: {}", amount.trim()));
    let multiplier = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;
    let integer: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| overflow())?
    };

    integer
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Parse a decimal amount as a float for comparisons against display balances.
pub fn parse_decimal(amount: &str) -> EngineResult<f64> {
    split_decimal(amount)?;
    amount
        .trim()
        .parse::<f64>()
        .map_err(|_| EngineError::invalid_input(format!("Invalid amount: {}", amount.trim())))
}

/// Base units to a trimmed decimal string (`100000, 8` -> `"0.001"`)
pub fn format_units(raw: u128, decimals: u8) -> String {
    let multiplier = 10u128.pow(decimals as u32);
    let integer = raw / multiplier;
    let fraction = raw % multiplier;
    if fraction == 0 {
        return integer.to_string();
    }
    let digits = format!("{:0>width$}", fraction, width = decimals as usize);
    format!("{}.{}", integer, digits.trim_end_matches('0'))
}

pub fn from_base_units(raw: u128, decimals: u8) -> f64 {
    format_units(raw, decimals).parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_known_pairs() {
        assert_eq!(to_base_units("0.001", 8).unwrap(), 100_000);
        assert_eq!(to_base_units("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(to_base_units("25.5", 6).unwrap(), 25_500_000);
        assert_eq!(to_base_units(".5", 9).unwrap(), 500_000_000);
        assert_eq!(to_base_units("3.", 6).unwrap(), 3_000_000);
        assert_eq!(to_base_units("0", 8).unwrap(), 0);
    }

    #[test]
    fn test_truncates_extra_precision() {
        assert_eq!(to_base_units("0.123456789", 6).unwrap(), 123_456);
        assert_eq!(to_base_units("0.000000009", 8).unwrap(), 0);
        assert_eq!(to_base_units("1.99999999999", 0).unwrap(), 1);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "  ", "-1", "abc", "1.2.3", "1e5", ".", "+1", "1,5"] {
            let err = to_base_units(bad, 8).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidInput, "input {:?}", bad);
        }
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(to_base_units("999999999999999999999999", 18).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(100_000, 8), "0.001");
        assert_eq!(format_units(98_600, 8), "0.000986");
        assert_eq!(format_units(5_000_000_000, 9), "5");
        assert_eq!(from_base_units(1_500_000, 6), 1.5);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 0.5 ").unwrap(), 0.5);
        assert!(parse_decimal("1e3").is_err());
        assert!(parse_decimal("NaN").is_err());
    }
}
