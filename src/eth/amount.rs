//! Exact conversion between human decimal amounts and raw on-chain integers.
//!
//! Every money-valued quantity crossing the chain boundary exists in both
//! representations. Decimal -> raw truncates toward zero when the amount has
//! more fractional digits than the token carries; it never rounds up.
//! Floating point is forbidden here.

use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, RoundingMode};

use crate::error::WalletError;

/// Scales `amount` by `10^decimals`, truncating excess fractional digits
/// toward zero.
pub fn to_raw(amount: &BigDecimal, decimals: u8) -> BigInt {
    let (digits, _) = amount
        .with_scale_round(decimals as i64, RoundingMode::Down)
        .into_bigint_and_exponent();
    digits
}

/// Divides `raw` by `10^decimals`. Exact; no precision is lost.
pub fn from_raw(raw: &BigInt, decimals: u8) -> BigDecimal {
    BigDecimal::new(raw.clone(), decimals as i64)
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}

pub fn bigint_to_u256(value: &BigInt) -> Result<U256, WalletError> {
    if value.sign() == Sign::Minus {
        return Err(WalletError::InvalidInput(
            "amount must not be negative".to_string(),
        ));
    }
    U256::from_str_radix(&value.to_str_radix(10), 10)
        .map_err(|_| WalletError::InvalidInput("amount exceeds uint256".to_string()))
}

/// `to_raw` composed with the `U256` bridge, for calldata encoding.
pub fn to_raw_u256(amount: &BigDecimal, decimals: u8) -> Result<U256, WalletError> {
    bigint_to_u256(&to_raw(amount, decimals))
}

pub fn from_raw_u256(value: U256, decimals: u8) -> BigDecimal {
    from_raw(&u256_to_bigint(value), decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_raw_truncates_never_rounds() {
        assert_eq!(to_raw(&dec("1.23456789"), 6), BigInt::from(1_234_567));
        assert_eq!(to_raw(&dec("1.2345"), 6), BigInt::from(1_234_500));
        assert_eq!(to_raw(&dec("0.9999999"), 6), BigInt::from(999_999));
    }

    #[test]
    fn test_from_raw_is_exact() {
        assert_eq!(from_raw(&BigInt::from(1_234_500), 6), dec("1.2345"));
        assert_eq!(from_raw(&BigInt::from(1), 18), dec("0.000000000000000001"));
        assert_eq!(from_raw(&BigInt::from(0), 6), dec("0"));
    }

    #[test]
    fn test_roundtrip_equals_truncation() {
        for (amount, decimals) in [
            ("1.23456789", 6u8),
            ("0.1", 0),
            ("42", 30),
            ("123456.654321", 4),
        ] {
            let amount = dec(amount);
            let truncated = amount.with_scale_round(decimals as i64, RoundingMode::Down);
            assert_eq!(from_raw(&to_raw(&amount, decimals), decimals), truncated);
        }
    }

    #[test]
    fn test_zero_decimals() {
        assert_eq!(to_raw(&dec("7.9"), 0), BigInt::from(7));
        assert_eq!(from_raw(&BigInt::from(7), 0), dec("7"));
    }

    #[test]
    fn test_u256_bridge() {
        let wei = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(from_raw_u256(wei, 18), dec("1.5"));
        assert_eq!(to_raw_u256(&dec("1.5"), 18).unwrap(), wei);
    }

    #[test]
    fn test_negative_amount_rejected_at_u256_boundary() {
        let err = to_raw_u256(&dec("-1"), 6).unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
    }

    #[test]
    fn test_u256_max_survives_the_bridge() {
        let max = U256::MAX;
        let back = bigint_to_u256(&u256_to_bigint(max)).unwrap();
        assert_eq!(back, max);
    }
}
