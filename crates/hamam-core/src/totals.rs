//! # Session Totals
//!
//! Derived amounts of a session: items total, payments total and balance.
//!
//! ## Zero-Balance Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  items_total    = Σ round_half_even(unit_price × quantity)              │
//! │  payments_total = Σ amount                                              │
//! │  balance        = items_total - payments_total                          │
//! │                                                                         │
//! │  balance  > 0  → money still owed      → close refused                 │
//! │  balance  < 0  → over-paid             → close refused                 │
//! │  balance == 0  → settled               → close allowed                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are always recomputed from the raw rows. Nothing here is persisted.
//! Every sum is checked: a total that leaves `i64` is `AmountOverflow`, never
//! a wrapped or panicking value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Payment, SessionItem};

/// Totals computed from a session's items and payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionTotals {
    pub items_total: Money,
    pub payments_total: Money,
    pub balance: Money,
}

impl SessionTotals {
    /// Computes totals from raw rows.
    pub fn compute(items: &[SessionItem], payments: &[Payment]) -> CoreResult<Self> {
        let line_totals = items
            .iter()
            .map(SessionItem::line_total)
            .collect::<CoreResult<Vec<_>>>()?;

        Self::from_amounts(line_totals, payments.iter().map(Payment::amount))
    }

    /// Sums already-computed line totals and payment amounts.
    pub fn from_amounts(
        line_totals: impl IntoIterator<Item = Money>,
        payment_amounts: impl IntoIterator<Item = Money>,
    ) -> CoreResult<Self> {
        let items_total = checked_sum(line_totals, "items total")?;
        let payments_total = checked_sum(payment_amounts, "payments total")?;
        let balance = items_total
            .checked_sub(payments_total)
            .ok_or_else(|| overflow("balance"))?;

        Ok(SessionTotals {
            items_total,
            payments_total,
            balance,
        })
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.balance.is_zero()
    }

    /// Fails with `BalanceNotZero` unless the balance is exactly zero.
    pub fn ensure_settled(&self) -> CoreResult<()> {
        if self.is_settled() {
            return Ok(());
        }

        Err(CoreError::BalanceNotZero {
            items_total: self.items_total,
            payments_total: self.payments_total,
            balance: self.balance,
        })
    }
}

fn checked_sum(amounts: impl IntoIterator<Item = Money>, field: &str) -> CoreResult<Money> {
    amounts
        .into_iter()
        .try_fold(Money::zero(), Money::checked_add)
        .ok_or_else(|| overflow(field))
}

fn overflow(field: &str) -> CoreError {
    CoreError::AmountOverflow {
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(name: &str, quantity_thousandths: i64, unit_price_cents: i64) -> SessionItem {
        SessionItem {
            id: format!("item-{}", name),
            session_id: "s-1".to_string(),
            service_name: name.to_string(),
            quantity_thousandths,
            unit_price_cents,
            added_at: Utc::now(),
        }
    }

    fn payment(method: &str, amount_cents: i64) -> Payment {
        Payment {
            id: format!("pay-{}", method),
            session_id: "s-1".to_string(),
            method: method.to_string(),
            amount_cents,
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn test_massage_and_tea() {
        let items = vec![item("Massage", 1000, 30_000), item("Tea", 2000, 1_000)];

        let unpaid = SessionTotals::compute(&items, &[]).unwrap();
        assert_eq!(unpaid.items_total.cents(), 32_000);
        assert_eq!(unpaid.payments_total, Money::zero());
        assert_eq!(unpaid.balance.cents(), 32_000);

        let err = unpaid.ensure_settled().unwrap_err();
        assert_eq!(
            err,
            CoreError::BalanceNotZero {
                items_total: Money::from_cents(32_000),
                payments_total: Money::zero(),
                balance: Money::from_cents(32_000),
            }
        );

        let paid = SessionTotals::compute(&items, &[payment("cash", 32_000)]).unwrap();
        assert!(paid.is_settled());
        assert!(paid.ensure_settled().is_ok());
    }

    #[test]
    fn test_split_tender_and_overpayment() {
        let items = vec![item("Sauna", 1500, 20_000)]; // 1.5 × 200.00 = 300.00

        let split = SessionTotals::compute(
            &items,
            &[payment("cash", 10_000), payment("card", 20_000)],
        )
        .unwrap();
        assert!(split.is_settled());

        let over = SessionTotals::compute(&items, &[payment("card", 30_001)]).unwrap();
        assert_eq!(over.balance.cents(), -1);
        assert!(over.ensure_settled().is_err());
    }

    #[test]
    fn test_empty_session_is_settled() {
        let totals = SessionTotals::compute(&[], &[]).unwrap();
        assert_eq!(totals, SessionTotals::default());
        assert!(totals.is_settled());
    }

    #[test]
    fn test_payments_past_i64_max_are_an_error() {
        let payments = vec![payment("cash", i64::MAX), payment("card", 1)];
        let err = SessionTotals::compute(&[], &payments).unwrap_err();
        assert_eq!(
            err,
            CoreError::AmountOverflow {
                field: "payments total".to_string()
            }
        );
    }

    #[test]
    fn test_overflowing_items_and_balance_are_errors() {
        let items = vec![item("Suite", 2000, i64::MAX / 2 + 10)];
        assert!(matches!(
            SessionTotals::compute(&items, &[]),
            Err(CoreError::AmountOverflow { field }) if field == "line total"
        ));

        let items = vec![item("A", 1000, i64::MAX), item("B", 1000, 1)];
        assert!(matches!(
            SessionTotals::compute(&items, &[]),
            Err(CoreError::AmountOverflow { field }) if field == "items total"
        ));

        // 0 - i64::MIN does not fit
        let err = SessionTotals::from_amounts(
            std::iter::empty::<Money>(),
            [Money::from_cents(i64::MIN)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::AmountOverflow {
                field: "balance".to_string()
            }
        );
    }

    #[test]
    fn test_capped_amounts_never_overflow() {
        let items: Vec<_> = (0..1000)
            .map(|i| {
                item(
                    &format!("Line {}", i),
                    crate::MAX_ITEM_QUANTITY_THOUSANDTHS,
                    crate::MAX_UNIT_PRICE_CENTS,
                )
            })
            .collect();
        let payments: Vec<_> = (0..1000)
            .map(|_| payment("card", crate::MAX_PAYMENT_CENTS))
            .collect();

        let totals = SessionTotals::compute(&items, &payments).unwrap();
        assert_eq!(totals.items_total.cents(), 999_000_000_000_000);
        assert_eq!(totals.payments_total.cents(), 1_000_000_000_000_000);
        assert_eq!(totals.balance.cents(), -1_000_000_000_000);
    }
}
