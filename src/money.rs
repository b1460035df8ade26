use rust_decimal::Decimal;

/// Renders an amount held in minor currency units as a two-decimal amount.
///
/// Minor units are the canonical representation everywhere inside the system;
/// this conversion happens only when building response payloads, so the
/// rendered amounts always reconstruct the stored integers exactly.
pub fn minor_to_decimal(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
