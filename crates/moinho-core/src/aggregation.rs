//! # Sale Aggregation
//!
//! Derives a sale's totals from its line items, and the dashboard footer
//! from a list of sales.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  items ──► for each: subtotal = quantity × unit_price                   │
//! │                      commission = subtotal × percent / 100              │
//! │        ──► SaleTotals { Σ subtotal, Σ commission }                      │
//! │                                                                         │
//! │  sales ──► SalesSummary { count, Σ total_value, Σ total_commission }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here rounds. Formatting for display is [`Money::format`].
//!
//! Every step is checked: a sum that would overflow comes back as
//! [`CoreError::AmountOverflow`] instead of panicking the caller.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;
use crate::types::{LineItem, Sale};

fn overflow(what: &str) -> CoreError {
    CoreError::AmountOverflow {
        what: what.to_string(),
    }
}

/// Totals of one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleTotals {
    pub total_value: Money,
    pub total_commission: Money,
}

/// Sums value and commission over `items` in a single pass.
///
/// An empty slice gives zero totals.
///
/// ## Errors
/// `AmountOverflow` when a line or a running total does not fit.
///
/// ## Example
/// ```rust
/// use moinho_core::aggregation::aggregate;
/// use moinho_core::money::{CommissionRate, Money};
/// use moinho_core::types::LineItem;
///
/// let totals = aggregate(&[
///     LineItem::new("A", 2, Money::from_cents(1000), CommissionRate::from_percent_int(5)),
///     LineItem::new("B", 1, Money::from_cents(2000), CommissionRate::zero()),
/// ]).unwrap();
/// assert_eq!(totals.total_value, Money::from_cents(4000));
/// assert_eq!(totals.total_commission, Money::from_cents(100));
/// ```
pub fn aggregate(items: &[LineItem]) -> Result<SaleTotals, CoreError> {
    items.iter().try_fold(SaleTotals::default(), |acc, item| {
        let subtotal = item
            .unit_price
            .checked_multiply_quantity(item.quantity)
            .ok_or_else(|| overflow("sale items"))?;
        let commission = subtotal
            .checked_commission(item.commission_percent)
            .ok_or_else(|| overflow("sale items"))?;

        Ok(SaleTotals {
            total_value: acc
                .total_value
                .checked_add(subtotal)
                .ok_or_else(|| overflow("sale items"))?,
            total_commission: acc
                .total_commission
                .checked_add(commission)
                .ok_or_else(|| overflow("sale items"))?,
        })
    })
}

/// Footer of the sales dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub count: usize,
    pub total_value: Money,
    pub total_commission: Money,
}

/// Sums the stored totals of `sales`.
pub fn summarize(sales: &[Sale]) -> Result<SalesSummary, CoreError> {
    sales.iter().try_fold(SalesSummary::default(), |acc, sale| {
        Ok(SalesSummary {
            count: acc.count + 1,
            total_value: acc
                .total_value
                .checked_add(sale.total_value)
                .ok_or_else(|| overflow("the sales list"))?,
            total_commission: acc
                .total_commission
                .checked_add(sale.total_commission)
                .ok_or_else(|| overflow("the sales list"))?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CommissionRate;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn item(qty: i64, price: rust_decimal::Decimal, pct: rust_decimal::Decimal) -> LineItem {
        LineItem::new("Farinha", qty, Money::new(price), CommissionRate::from_percent(pct))
    }

    #[test]
    fn test_two_items_example() {
        let totals = aggregate(&[item(2, dec!(10), dec!(5)), item(1, dec!(20), dec!(0))]).unwrap();
        assert_eq!(totals.total_value.amount(), dec!(40));
        assert_eq!(totals.total_commission.amount(), dec!(1.0));
    }

    #[test]
    fn test_empty_items_give_zero() {
        let totals = aggregate(&[]).unwrap();
        assert!(totals.total_value.is_zero());
        assert!(totals.total_commission.is_zero());
    }

    #[test]
    fn test_no_rounding_while_aggregating() {
        // 3 × 0.33 at 33.3% = 0.99 value, 0.32967 commission
        let totals = aggregate(&[item(3, dec!(0.33), dec!(33.3))]).unwrap();
        assert_eq!(totals.total_value.amount(), dec!(0.99));
        assert_eq!(totals.total_commission.amount(), dec!(0.32967));
    }

    #[test]
    fn test_totals_equal_sum_of_lines() {
        let items = vec![
            item(7, dec!(12.34), dec!(2.5)),
            item(1, dec!(0.01), dec!(100)),
            item(100, dec!(99.99), dec!(0)),
        ];
        let totals = aggregate(&items).unwrap();
        let value: Money = items.iter().map(LineItem::subtotal).sum();
        let commission: Money = items.iter().map(LineItem::commission).sum();
        assert_eq!(totals.total_value, value);
        assert_eq!(totals.total_commission, commission);
    }

    fn sale(value: Money, commission: Money) -> Sale {
        let now = Utc::now();
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: "u1".to_string(),
            bakery_id: None,
            buyer_name: "Padaria".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            items: vec![],
            total_value: value,
            total_commission: commission,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&[
            sale(Money::from_cents(4000), Money::from_cents(100)),
            sale(Money::from_cents(500), Money::from_cents(50)),
        ])
        .unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_value, Money::from_cents(4500));
        assert_eq!(summary.total_commission, Money::from_cents(150));

        assert_eq!(summarize(&[]).unwrap(), SalesSummary::default());
    }

    #[test]
    fn test_aggregate_overflow_is_an_error() {
        let max = rust_decimal::Decimal::MAX;
        assert!(matches!(
            aggregate(&[item(2, max, dec!(0))]),
            Err(CoreError::AmountOverflow { .. })
        ));
        assert!(matches!(
            aggregate(&[item(1, max, dec!(0)), item(1, max, dec!(0))]),
            Err(CoreError::AmountOverflow { .. })
        ));
        assert!(matches!(
            aggregate(&[item(1, max, dec!(100))]),
            Err(CoreError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn test_summarize_overflow_is_an_error() {
        let half = Money::new(dec!(50000000000000000000000000000));
        let err = summarize(&[sale(half, Money::zero()), sale(half, Money::zero())]).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }
}
