//! Decimal-string construction.
//!
//! Grounded in the original's `Int::set_val`: an optional sign, then digits.
//! Leading whitespace and a leading zero (when not the only digit) are
//! tolerated with a `tracing::warn!`, never an error — only a missing digit
//! sequence or a non-digit character is rejected.

use crate::{BigInt, BigIntError};

pub fn parse_decimal(s: &str) -> Result<BigInt, BigIntError> {
    let trimmed = s.trim_start();
    if trimmed.len() != s.len() {
        tracing::warn!(input = s, "leading whitespace in integer literal");
    }

    let mut chars = trimmed.chars().peekable();
    let negative = match chars.peek() {
        Some('+') => {
            chars.next();
            false
        }
        Some('-') => {
            chars.next();
            true
        }
        _ => false,
    };

    let digits: String = chars.clone().collect();
    if digits.is_empty() {
        return Err(if trimmed.is_empty() {
            BigIntError::Empty
        } else {
            BigIntError::SignOnly
        });
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
        return Err(BigIntError::InvalidDigit(bad));
    }

    if digits.len() > 1 && digits.starts_with('0') {
        tracing::warn!(input = s, "leading zero in integer literal");
    }

    let mut acc = BigInt::ZERO;
    let ten = BigInt::Native(10);
    for c in digits.chars() {
        let digit = BigInt::Native((c as u8 - b'0') as i64);
        acc = acc.mul(&ten).add(&digit);
    }
    Ok(if negative { acc.neg() } else { acc })
}

/// Parse a hexadecimal string (optional leading sign, then hex digits,
/// upper or lower case accepted) into a `BigInt`. Same sign/whitespace
/// tolerance as `parse_decimal`; an optional `0x`/`0X` prefix is accepted
/// and stripped before the digit scan.
pub fn parse_hex(s: &str) -> Result<BigInt, BigIntError> {
    let trimmed = s.trim_start();
    if trimmed.len() != s.len() {
        tracing::warn!(input = s, "leading whitespace in hex integer literal");
    }

    let mut chars = trimmed.chars().peekable();
    let negative = match chars.peek() {
        Some('+') => {
            chars.next();
            false
        }
        Some('-') => {
            chars.next();
            true
        }
        _ => false,
    };

    let mut rest: String = chars.collect();
    if rest.starts_with("0x") || rest.starts_with("0X") {
        rest = rest[2..].to_string();
    }

    if rest.is_empty() {
        return Err(if trimmed.is_empty() { BigIntError::Empty } else { BigIntError::SignOnly });
    }
    if let Some(bad) = rest.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(BigIntError::InvalidDigit(bad));
    }

    let mut acc = BigInt::ZERO;
    let sixteen = BigInt::Native(16);
    for c in rest.chars() {
        let digit = BigInt::Native(c.to_digit(16).expect("already validated as a hex digit") as i64);
        acc = acc.mul(&sixteen).add(&digit);
    }
    Ok(if negative { acc.neg() } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_upper_and_lower_case() {
        assert_eq!(parse_hex("1a").unwrap(), BigInt::Native(26));
        assert_eq!(parse_hex("1A").unwrap(), BigInt::Native(26));
    }

    #[test]
    fn parse_hex_accepts_an_0x_prefix_and_a_sign() {
        assert_eq!(parse_hex("0x10").unwrap(), BigInt::Native(16));
        assert_eq!(parse_hex("-0x10").unwrap(), BigInt::Native(-16));
    }

    #[test]
    fn parse_hex_rejects_non_hex_digits() {
        assert!(parse_hex("1g").is_err());
    }
}
