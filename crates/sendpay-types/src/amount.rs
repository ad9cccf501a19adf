//! Exact conversion between human-unit decimals and integer smallest units.

pub use bigdecimal::num_bigint::BigUint;
pub use bigdecimal::BigDecimal;

use bigdecimal::num_bigint::{BigInt, Sign};

use crate::{Result, SendError};

/// Largest number of decimal digits a uint256 can hold.
const UINT256_MAX_DIGITS: u64 = 78;

/// Convert a human-unit amount into the token's smallest unit
/// (`amount × 10^decimals`).
///
/// The conversion is exact: an amount with more fractional digits than the
/// token supports, or a negative amount, is rejected.
pub fn token_amount_in_smallest_unit(amount: &BigDecimal, decimals: u8) -> Result<BigUint> {
    // Trailing zeros removed, so any remaining negative shift is a real fraction.
    let (digits, scale) = amount.normalized().as_bigint_and_exponent();
    match digits.sign() {
        Sign::Minus => {
            return Err(SendError::InvalidAmount(format!("negative amount: {}", amount)));
        }
        Sign::NoSign => return Ok(BigUint::default()),
        Sign::Plus => {}
    }

    let shift = i64::from(decimals).saturating_sub(scale);
    if shift < 0 {
        return Err(SendError::NonIntegralAmount {
            amount: amount.to_string(),
            decimals,
        });
    }

    let digit_count = digits.to_string().len() as u64;
    if digit_count.saturating_add(shift.unsigned_abs()) > UINT256_MAX_DIGITS {
        return Err(SendError::InvalidAmount(format!("amount out of range: {}", amount)));
    }
    let factor = BigInt::from(10u8).pow(shift.unsigned_abs() as u32);

    (digits * factor)
        .to_biguint()
        .ok_or_else(|| SendError::InvalidAmount(format!("negative amount: {}", amount)))
}

/// Convert an integral decimal (gas, gas price) to an integer.
pub fn decimal_to_integer(value: &BigDecimal, field: &str) -> Result<BigUint> {
    token_amount_in_smallest_unit(value, 0).map_err(|e| match e {
        SendError::NonIntegralAmount { amount, .. } => {
            SendError::InvalidAmount(format!("{} must be an integer, got {}", field, amount))
        }
        other => other,
    })
}

pub(crate) fn biguint_to_u64(value: &BigUint, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| SendError::InvalidAmount(format!("{} does not fit in 64 bits: {}", field, value)))
}

pub(crate) fn biguint_to_u128(value: &BigUint, field: &str) -> Result<u128> {
    u128::try_from(value)
        .map_err(|_| SendError::InvalidAmount(format!("{} does not fit in 128 bits: {}", field, value)))
}

/// Gas limit from a decimal quote.
pub fn decimal_to_u64(value: &BigDecimal, field: &str) -> Result<u64> {
    biguint_to_u64(&decimal_to_integer(value, field)?, field)
}

/// Per-gas price from a decimal quote.
pub fn decimal_to_u128(value: &BigDecimal, field: &str) -> Result<u128> {
    biguint_to_u128(&decimal_to_integer(value, field)?, field)
}
