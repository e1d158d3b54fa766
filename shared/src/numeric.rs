//! Small numeric helpers for the draw, clip and default-on-missing idioms

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Clamp `value` into `[lo, hi]`
pub fn clip(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Mean of the finite values, or `fallback` when there are none
pub fn mean_or_default<I>(values: I, fallback: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        fallback
    } else {
        sum / count as f64
    }
}

/// Convert a model amount to euro with cent precision
pub fn to_currency(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}
