//! Fixed two-decimal monetary amounts.

use rust_decimal::Decimal;

use crate::DomainError;

/// Number of fractional digits carried by every stored amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Validates that `amount` is positive and representable with two decimals,
/// returning it rescaled to exactly two fractional digits.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::NonPositiveAmount(amount.to_string()));
    }
    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(DomainError::AmountPrecision(amount.to_string()));
    }
    let mut scaled = normalized;
    scaled.rescale(AMOUNT_SCALE);
    Ok(scaled)
}
