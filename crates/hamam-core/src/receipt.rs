//! # Receipt Snapshot
//!
//! The frozen picture of a session handed to the receipt consumer when the
//! session closes.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Kurna 1                session 7f3c...  │
//! │  Ayse K.                                 │
//! │  14:02 → 15:31                           │
//! │  ──────────────────────────────────────  │
//! │  Massage     1    × 300.00   = 300.00    │
//! │  Tea         2    ×  10.00   =  20.00    │
//! │  ──────────────────────────────────────  │
//! │  Items total                   320.00    │
//! │  cash                          320.00    │
//! │  Payments total                320.00    │
//! │  Balance                         0.00    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Every number in the snapshot is derived from the same rows, so the
//! snapshot is internally consistent by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::totals::SessionTotals;
use crate::types::{Payment, Session, SessionItem};

/// One item line on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLine {
    pub service_name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
}

/// One payment line on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptPayment {
    pub method: String,
    pub amount: Money,
}

/// Frozen receipt data for a closed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptSnapshot {
    pub session_id: String,
    /// Absent if the room row could not be read at close time.
    pub room_name: Option<String>,
    pub customer_label: Option<String>,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub ended_at: Option<DateTime<Utc>>,
    pub lines: Vec<ReceiptLine>,
    pub items_total: Money,
    pub payments: Vec<ReceiptPayment>,
    pub payments_total: Money,
    pub balance: Money,
}

impl ReceiptSnapshot {
    /// Builds a snapshot from a session and the rows read alongside it.
    pub fn build(
        room_name: Option<String>,
        session: &Session,
        items: &[SessionItem],
        payments: &[Payment],
    ) -> CoreResult<Self> {
        let totals = SessionTotals::compute(items, payments)?;

        let lines = items
            .iter()
            .map(|item| {
                Ok(ReceiptLine {
                    service_name: item.service_name.clone(),
                    quantity: item.quantity(),
                    unit_price: item.unit_price(),
                    line_total: item.line_total()?,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let payments = payments
            .iter()
            .map(|payment| ReceiptPayment {
                method: payment.method.clone(),
                amount: payment.amount(),
            })
            .collect();

        Ok(ReceiptSnapshot {
            session_id: session.id.clone(),
            room_name,
            customer_label: session.customer_label.clone(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            lines,
            items_total: totals.items_total,
            payments,
            payments_total: totals.payments_total,
            balance: totals.balance,
        })
    }

    /// Recomputes the totals from the snapshot's own lines.
    pub fn totals(&self) -> CoreResult<SessionTotals> {
        SessionTotals::from_amounts(
            self.lines.iter().map(|l| l.line_total),
            self.payments.iter().map(|p| p.amount),
        )
    }
}
