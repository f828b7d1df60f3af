//! Quotation pricing engine
//!
//! Pure currency arithmetic over quotation lines. Every stage is rounded to
//! two decimals, half-up, before it feeds the next one: line subtotals are
//! rounded individually, then the global discount amount is rounded against
//! the rounded subtotal sum. Reconciliation reports add the stored figures
//! back together, so the final total must equal that sum exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency precision in decimal places
pub const CURRENCY_SCALE: u32 = 2;

/// Pricing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("invalid discount: {0}")]
    InvalidDiscount(String),

    #[error("computed total is negative: {0}")]
    NegativeTotal(Decimal),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// A line as seen by the pricing engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingLine {
    #[serde(rename = "precio_unitario")]
    pub unit_price: Decimal,
    #[serde(rename = "descuento_linea", default)]
    pub line_discount: Decimal,
}

impl PricingLine {
    pub fn new(unit_price: Decimal, line_discount: Decimal) -> Self {
        Self {
            unit_price,
            line_discount,
        }
    }
}

/// Result of pricing a set of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationTotals {
    /// Rounded subtotal per input line, in input order
    #[serde(rename = "subtotales")]
    pub line_subtotals: Vec<Decimal>,
    /// Sum of unit prices before any discount
    #[serde(rename = "total_original")]
    pub original_total: Decimal,
    #[serde(rename = "subtotal")]
    pub subtotal_sum: Decimal,
    #[serde(rename = "descuento_global_monto")]
    pub global_discount_amount: Decimal,
    #[serde(rename = "total")]
    pub final_total: Decimal,
}

/// Round to currency precision, half-up
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Largest unit price a line may carry
pub fn max_unit_price() -> Decimal {
    Decimal::new(9_999_999_999_99, CURRENCY_SCALE)
}

/// True when `amount` needs no more than two decimals
pub fn has_currency_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= CURRENCY_SCALE
}

/// Check that a percentage lies in [0, 100] with at most two decimals
pub fn validate_percentage(percent: Decimal) -> Result<(), PricingError> {
    if percent < Decimal::ZERO || percent > Decimal::from(100) {
        return Err(PricingError::InvalidDiscount(format!(
            "percentage {} is outside [0, 100]",
            percent
        )));
    }
    if !has_currency_scale(percent) {
        return Err(PricingError::InvalidDiscount(format!(
            "percentage {} has more than two decimals",
            percent
        )));
    }
    Ok(())
}

/// Check a line's unit price: positive, two decimals, bounded
pub fn validate_unit_price(unit_price: Decimal) -> Result<(), PricingError> {
    if unit_price <= Decimal::ZERO {
        return Err(PricingError::InvalidDiscount(format!(
            "unit price {} must be positive",
            unit_price
        )));
    }
    if !has_currency_scale(unit_price) {
        return Err(PricingError::InvalidAmount(format!(
            "unit price {} has more than two decimals",
            unit_price
        )));
    }
    if unit_price > max_unit_price() {
        return Err(PricingError::InvalidAmount(format!(
            "unit price {} exceeds {}",
            unit_price,
            max_unit_price()
        )));
    }
    Ok(())
}

fn overflow(stage: &str) -> PricingError {
    PricingError::InvalidAmount(format!("{} is out of range", stage))
}

fn checked_sum(mut amounts: impl Iterator<Item = Decimal>, stage: &str) -> Result<Decimal, PricingError> {
    amounts.try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount).ok_or_else(|| overflow(stage))
    })
}

/// Subtotal of a single line after its own discount
pub fn line_subtotal(unit_price: Decimal, line_discount: Decimal) -> Result<Decimal, PricingError> {
    validate_unit_price(unit_price)?;
    validate_percentage(line_discount)?;

    let hundred = Decimal::from(100);
    let discounted = unit_price
        .checked_mul(hundred - line_discount)
        .ok_or_else(|| overflow("line subtotal"))?;
    Ok(round2(discounted / hundred))
}

/// Global discount amount applied over the sum of line subtotals
pub fn global_discount_amount(
    subtotal_sum: Decimal,
    global_discount: Decimal,
) -> Result<Decimal, PricingError> {
    validate_percentage(global_discount)?;
    let scaled = subtotal_sum
        .checked_mul(global_discount)
        .ok_or_else(|| overflow("global discount"))?;
    Ok(round2(scaled / Decimal::from(100)))
}

/// Price a full set of lines with a global discount
pub fn compute_totals(
    lines: &[PricingLine],
    global_discount: Decimal,
) -> Result<QuotationTotals, PricingError> {
    let line_subtotals = lines
        .iter()
        .map(|line| line_subtotal(line.unit_price, line.line_discount))
        .collect::<Result<Vec<_>, _>>()?;

    let original_total = round2(checked_sum(
        lines.iter().map(|line| line.unit_price),
        "original total",
    )?);
    let subtotal_sum = checked_sum(line_subtotals.iter().copied(), "subtotal")?;
    let discount = global_discount_amount(subtotal_sum, global_discount)?;
    let final_total = subtotal_sum - discount;

    if final_total < Decimal::ZERO {
        return Err(PricingError::NegativeTotal(final_total));
    }

    Ok(QuotationTotals {
        line_subtotals,
        original_total,
        subtotal_sum,
        global_discount_amount: discount,
        final_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_reference_example() {
        let lines = [
            PricingLine::new(dec("500"), dec("0")),
            PricingLine::new(dec("500"), dec("10")),
        ];
        let totals = compute_totals(&lines, dec("5")).unwrap();

        assert_eq!(totals.line_subtotals, vec![dec("500"), dec("450")]);
        assert_eq!(totals.subtotal_sum, dec("950"));
        assert_eq!(totals.global_discount_amount, dec("47.50"));
        assert_eq!(totals.final_total, dec("902.50"));
        assert_eq!(totals.original_total, dec("1000"));
    }

    #[test]
    fn test_line_rounding_half_up() {
        // 0.05 * 0.5 = 0.025 -> 0.03
        assert_eq!(line_subtotal(dec("0.05"), dec("50")).unwrap(), dec("0.03"));
        // 99.99 * 0.85 = 84.9915 -> 84.99
        assert_eq!(line_subtotal(dec("99.99"), dec("15")).unwrap(), dec("84.99"));
    }

    #[test]
    fn test_rounding_is_per_stage() {
        // Two lines of 0.025 each round to 0.03 individually
        let lines = [
            PricingLine::new(dec("0.05"), dec("50")),
            PricingLine::new(dec("0.05"), dec("50")),
        ];
        let totals = compute_totals(&lines, Decimal::ZERO).unwrap();
        assert_eq!(totals.final_total, dec("0.06"));
    }

    #[test]
    fn test_full_line_discount_is_zero() {
        assert_eq!(line_subtotal(dec("120"), dec("100")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_invalid_line_discount() {
        assert!(matches!(
            line_subtotal(dec("100"), dec("100.01")),
            Err(PricingError::InvalidDiscount(_))
        ));
        assert!(matches!(
            line_subtotal(dec("100"), dec("-1")),
            Err(PricingError::InvalidDiscount(_))
        ));
    }

    #[test]
    fn test_non_positive_unit_price() {
        assert!(line_subtotal(Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(line_subtotal(dec("-5"), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_invalid_global_discount() {
        let lines = [PricingLine::new(dec("10"), Decimal::ZERO)];
        assert!(matches!(
            compute_totals(&lines, dec("101")),
            Err(PricingError::InvalidDiscount(_))
        ));
    }

    #[test]
    fn test_sub_cent_amounts_rejected() {
        assert!(matches!(
            line_subtotal(dec("10.005"), dec("10")),
            Err(PricingError::InvalidAmount(_))
        ));
        assert!(matches!(
            line_subtotal(dec("10"), dec("7.125")),
            Err(PricingError::InvalidDiscount(_))
        ));
        // Trailing zeros are not extra precision
        assert_eq!(line_subtotal(dec("10.500"), dec("10.00")).unwrap(), dec("9.45"));
    }

    #[test]
    fn test_huge_price_is_an_error_not_a_panic() {
        let lines = [PricingLine::new(dec("1000000000000000000000000000"), Decimal::ZERO)];
        assert!(matches!(
            compute_totals(&lines, Decimal::ZERO),
            Err(PricingError::InvalidAmount(_))
        ));
        assert!(line_subtotal(max_unit_price(), dec("0.01")).is_ok());
    }

    #[test]
    fn test_empty_lines_price_to_zero() {
        let totals = compute_totals(&[], Decimal::ZERO).unwrap();
        assert_eq!(totals.final_total, Decimal::ZERO);
    }

    #[test]
    fn test_idempotent() {
        let lines = [
            PricingLine::new(dec("333.33"), dec("7.5")),
            PricingLine::new(dec("80"), dec("12")),
        ];
        let first = compute_totals(&lines, dec("3")).unwrap();
        let second = compute_totals(&lines, dec("3")).unwrap();
        assert_eq!(first, second);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn line_strategy() -> impl Strategy<Value = PricingLine> {
        (1i64..=100_000_000i64, 0i64..=10_000i64)
            .prop_map(|(cents, basis)| PricingLine::new(Decimal::new(cents, 2), Decimal::new(basis, 2)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Discounts never raise a total, and every figure stays at cent precision
        #[test]
        fn prop_totals_bounded_and_cent_precise(
            lines in prop::collection::vec(line_strategy(), 1..8),
            global in (0i64..=10_000i64).prop_map(|basis| Decimal::new(basis, 2)),
        ) {
            let totals = compute_totals(&lines, global).unwrap();

            prop_assert!(totals.final_total <= totals.subtotal_sum);
            prop_assert!(totals.subtotal_sum <= totals.original_total);
            prop_assert!(totals.final_total >= Decimal::ZERO);
            prop_assert!(has_currency_scale(totals.final_total));
            for (line, subtotal) in lines.iter().zip(&totals.line_subtotals) {
                prop_assert!(*subtotal <= line.unit_price);
            }
        }
    }
}
