//! Purchase totals derived from the selection and the unit price.

use super::value_object::Money;

/// Tax rate applied by the ticket service, in basis points (12%).
pub const TAX_RATE_BASIS_POINTS: i64 = 1_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PricingTotals {
    pub unit_price: Money,
    pub quantity: usize,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl PricingTotals {
    /// Compute totals with the purchase flow's fixed tax rate.
    pub fn compute(unit_price: Money, quantity: usize) -> Self {
        Self::with_rate(unit_price, quantity, TAX_RATE_BASIS_POINTS)
    }

    /// Compute totals; tax is rounded half-up to the cent.
    pub fn with_rate(unit_price: Money, quantity: usize, rate_basis_points: i64) -> Self {
        let count = i64::try_from(quantity).unwrap_or(i64::MAX);
        let subtotal = unit_price.cents().saturating_mul(count);
        let tax = (subtotal.saturating_mul(rate_basis_points) + 5_000).div_euclid(10_000);
        Self {
            unit_price,
            quantity,
            subtotal: Money::from_cents(subtotal),
            tax: Money::from_cents(tax),
            total: Money::from_cents(subtotal + tax),
        }
    }
}
