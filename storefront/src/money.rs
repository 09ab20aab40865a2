// storefront/src/money.rs

//! Conversion between major currency units (naira) and the gateway's minor
//! units (kobo). Every amount that leaves the service goes through here.

use crate::errors::{AppError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

const MINOR_PER_MAJOR: Decimal = dec!(100);

/// `round(amount * 100)`, half away from zero. Exact for amounts with at most
/// two fractional digits.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
  amount
    .checked_mul(MINOR_PER_MAJOR)
    .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    .and_then(|rounded| rounded.to_i64())
    .ok_or_else(|| AppError::Validation(format!("Amount {} is out of range", amount)))
}

pub fn to_major_units(minor: i64) -> Decimal {
  Decimal::new(minor, 2)
}

/// Largest amount a NUMERIC(12, 2) column holds.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Prices and payment amounts: non-negative, at most two fractional digits,
/// within the storable range.
pub fn check_amount(label: &str, amount: Decimal) -> Result<()> {
  if amount.is_sign_negative() && !amount.is_zero() {
    return Err(AppError::Validation(format!("{} cannot be negative", label)));
  }
  if amount.normalize().scale() > 2 {
    return Err(AppError::Validation(format!(
      "{} {} has more than two decimal places",
      label, amount
    )));
  }
  if amount > MAX_AMOUNT {
    return Err(AppError::Validation(format!("{} {} is out of range", label, amount)));
  }
  Ok(())
}

pub fn check_quantity(quantity: i32) -> Result<()> {
  if quantity <= 0 {
    return Err(AppError::Validation("Quantity must be a positive number".to_string()));
  }
  if quantity > MAX_LINE_QUANTITY {
    return Err(AppError::Validation(format!(
      "Quantity {} exceeds the limit of {}",
      quantity, MAX_LINE_QUANTITY
    )));
  }
  Ok(())
}

/// `price * quantity`, bounded by `MAX_AMOUNT`.
pub fn line_total(price: Decimal, quantity: i32) -> Result<Decimal> {
  price
    .checked_mul(Decimal::from(quantity))
    .filter(|total| *total <= MAX_AMOUNT)
    .ok_or_else(|| AppError::Validation(format!("Line total for {} x {} is out of range", quantity, price)))
}

/// Sum of line totals, bounded by `MAX_AMOUNT`.
pub fn sum_amounts<I>(amounts: I) -> Result<Decimal>
where
  I: IntoIterator<Item = Result<Decimal>>,
{
  amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
    acc
      .checked_add(amount?)
      .filter(|total| *total <= MAX_AMOUNT)
      .ok_or_else(|| AppError::Validation("Order total is out of range".to_string()))
  })
}
