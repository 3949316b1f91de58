//! # Cash Drawer Reconciliation
//!
//! Closing a session compares what the drawer *should* hold against what
//! the operator counted.
//!
//! ```text
//! expected   = opening_amount + cash_sales_accumulated
//! difference = counted - expected
//!
//!   difference == 0  →  Balanced
//!   difference  < 0  →  Shortage  (money missing)
//!   difference  > 0  →  Overage   (extra money)
//! ```
//!
//! Only `Cash` sales feed `cash_sales_accumulated`; card and transfer
//! payments never touch the drawer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

/// Outcome of a drawer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Balanced,
    Shortage,
    Overage,
}

impl Verdict {
    pub fn from_difference(difference: Money) -> Self {
        if difference.is_zero() {
            Verdict::Balanced
        } else if difference.is_negative() {
            Verdict::Shortage
        } else {
            Verdict::Overage
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Balanced => write!(f, "balanced"),
            Verdict::Shortage => write!(f, "shortage"),
            Verdict::Overage => write!(f, "overage"),
        }
    }
}

/// Result of closing a cash session.
///
/// `difference` and `verdict` are always derived from the other fields,
/// even when the backend sends its own, so the report is self-consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingReport {
    pub opening_amount: Money,
    pub cash_sales_accumulated: Money,
    pub expected_amount: Money,
    pub counted_amount: Money,
    pub difference: Money,
    pub verdict: Verdict,
}

impl ClosingReport {
    /// Builds a report from the backend's expected figure.
    pub fn new(
        opening_amount: Money,
        cash_sales_accumulated: Money,
        expected_amount: Money,
        counted_amount: Money,
    ) -> Self {
        let difference = counted_amount - expected_amount;
        ClosingReport {
            opening_amount,
            cash_sales_accumulated,
            expected_amount,
            counted_amount,
            difference,
            verdict: Verdict::from_difference(difference),
        }
    }

    /// Computes `expected` locally from opening + cash sales.
    pub fn reconcile(
        opening_amount: Money,
        cash_sales_accumulated: Money,
        counted_amount: Money,
    ) -> Self {
        Self::new(
            opening_amount,
            cash_sales_accumulated,
            opening_amount + cash_sales_accumulated,
            counted_amount,
        )
    }

    /// One-line summary for the operator, e.g. `shortage of $5.00`.
    pub fn summary(&self) -> String {
        match self.verdict {
            Verdict::Balanced => format!("balanced at {}", self.expected_amount),
            Verdict::Shortage => format!("shortage of {}", self.difference.abs()),
            Verdict::Overage => format!("overage of {}", self.difference),
        }
    }
}
