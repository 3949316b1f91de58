//! # Cash Register Session Manager
//!
//! Tracks whether the operator's drawer is open and closes it with a
//! counted amount.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────┐  refresh_status()   ┌──────────┐                          │
//! │   │ Unknown │────────────────────►│  Closed  │◄──────────┐              │
//! │   └────┬────┘                     └────┬─────┘           │              │
//! │        │ refresh_status()              │ open(amount)    │ close(count) │
//! │        │ (session exists)              ▼                 │              │
//! │        │                          ┌──────────┐           │              │
//! │        └─────────────────────────►│   Open   │───────────┘              │
//! │                                   └──────────┘                          │
//! │                                                                         │
//! │  open() while Open  → SessionAlreadyActive (backend message verbatim)   │
//! │  negative / empty / non-numeric amount → InvalidAmount, no request      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The local view only moves after the backend confirms.

use tracing::{debug, info, warn};

use tienda_core::validation::{parse_amount, validate_non_negative};
use tienda_core::{CashSession, ClosingReport, CoreError, Money};

use crate::backend::PosBackend;
use crate::error::ClientResult;

/// Local view of the drawer.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterState {
    /// Not queried yet.
    Unknown,
    Closed,
    Open(CashSession),
}

pub struct CashRegister<B> {
    backend: B,
    state: RegisterState,
    last_report: Option<ClosingReport>,
}

impl<B: PosBackend> CashRegister<B> {
    pub fn new(backend: B) -> Self {
        CashRegister {
            backend,
            state: RegisterState::Unknown,
            last_report: None,
        }
    }

    pub fn state(&self) -> &RegisterState {
        &self.state
    }

    pub fn session(&self) -> Option<&CashSession> {
        match &self.state {
            RegisterState::Open(session) => Some(session),
            _ => None,
        }
    }

    /// Report from the most recent close, if any.
    pub fn last_report(&self) -> Option<&ClosingReport> {
        self.last_report.as_ref()
    }

    /// UI gating only: the backend is what actually refuses sales without
    /// an open drawer.
    pub fn can_sell(&self) -> bool {
        matches!(self.state, RegisterState::Open(_))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Queries the backend for the operator's open session.
    pub async fn refresh_status(&mut self) -> ClientResult<Option<&CashSession>> {
        let current = self.backend.current_session().await?;
        self.state = match current {
            Some(session) => {
                debug!(session_id = %session.id, expected = %session.expected_amount, "Cash session open");
                RegisterState::Open(session)
            }
            None => {
                debug!("No open cash session");
                RegisterState::Closed
            }
        };
        Ok(self.session())
    }

    /// Opens the drawer with `opening_amount` (zero allowed).
    pub async fn open(&mut self, opening_amount: Money) -> ClientResult<CashSession> {
        validate_non_negative(opening_amount, "opening amount").map_err(CoreError::InvalidAmount)?;

        let session = self.backend.open_session(opening_amount).await.map_err(|e| {
            warn!(error = %e, "Open cash session refused");
            e
        })?;

        info!(
            session_id = %session.id,
            operator_id = %session.operator_id,
            opening_amount = %session.opening_amount,
            "Cash session opened"
        );
        self.state = RegisterState::Open(session.clone());
        self.last_report = None;
        Ok(session)
    }

    /// Parses operator-typed text, then opens.
    pub async fn open_from_input(&mut self, raw: &str) -> ClientResult<CashSession> {
        let amount = parse_amount(raw, "opening amount").map_err(CoreError::InvalidAmount)?;
        self.open(amount).await
    }

    /// Closes the drawer with the counted cash (zero allowed).
    pub async fn close(&mut self, counted_amount: Money) -> ClientResult<ClosingReport> {
        validate_non_negative(counted_amount, "counted amount").map_err(CoreError::InvalidAmount)?;

        let report = self.backend.close_session(counted_amount).await.map_err(|e| {
            warn!(error = %e, "Close cash session refused");
            e
        })?;

        info!(
            expected = %report.expected_amount,
            counted = %report.counted_amount,
            difference = %report.difference,
            verdict = %report.verdict,
            "Cash session closed"
        );
        self.state = RegisterState::Closed;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Parses operator-typed text, then closes.
    pub async fn close_from_input(&mut self, raw: &str) -> ClientResult<ClosingReport> {
        let amount = parse_amount(raw, "counted amount").map_err(CoreError::InvalidAmount)?;
        self.close(amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::memory::InMemoryBackend;
    use tienda_core::{Customer, PaymentMethod, Product, SaleRequest, SaleRequestLine, Verdict};

    fn register() -> CashRegister<InMemoryBackend> {
        CashRegister::new(InMemoryBackend::new("op1"))
    }

    fn assert_invalid_amount<T: std::fmt::Debug>(result: ClientResult<T>) {
        assert!(
            matches!(result, Err(ClientError::Core(CoreError::InvalidAmount(_)))),
            "expected InvalidAmount, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_status_starts_unknown_then_closed() {
        let mut register = register();
        assert_eq!(register.state(), &RegisterState::Unknown);
        assert!(!register.can_sell());

        assert!(register.refresh_status().await.unwrap().is_none());
        assert_eq!(register.state(), &RegisterState::Closed);
    }

    #[tokio::test]
    async fn test_open_then_second_open_is_refused() {
        let mut register = register();
        let session = register.open(Money::from_cents(5000)).await.unwrap();
        assert_eq!(session.opening_amount, Money::from_cents(5000));
        assert!(register.can_sell());

        let err = register.open(Money::from_cents(9900)).await.unwrap_err();
        assert!(matches!(err, ClientError::SessionAlreadyActive(_)));

        let current = register.backend().current_session().await.unwrap().unwrap();
        assert_eq!(current.opening_amount, Money::from_cents(5000));
        assert_eq!(
            register.session().map(|s| s.opening_amount),
            Some(Money::from_cents(5000))
        );
    }

    #[tokio::test]
    async fn test_invalid_amounts_never_reach_backend() {
        let mut register = register();

        assert_invalid_amount(register.open(Money::from_cents(-100)).await);
        assert_invalid_amount(register.open_from_input("").await);
        assert_invalid_amount(register.open_from_input("-1").await);
        assert_invalid_amount(register.open_from_input("1e3").await);
        assert_invalid_amount(register.open_from_input("abc").await);
        assert_invalid_amount(register.close(Money::from_cents(-1)).await);
        assert_invalid_amount(register.close_from_input("-0.01").await);
        assert_invalid_amount(register.close_from_input("   ").await);

        assert_eq!(register.backend().calls(), 0);
        assert_eq!(register.state(), &RegisterState::Unknown);
    }

    #[tokio::test]
    async fn test_zero_amounts_are_valid() {
        let mut register = register();
        register.open_from_input("0").await.unwrap();
        let report = register.close_from_input("0.00").await.unwrap();
        assert_eq!(report.verdict, Verdict::Balanced);
        assert_eq!(register.state(), &RegisterState::Closed);
    }

    #[tokio::test]
    async fn test_close_reconciles_cash_sales() {
        let backend = InMemoryBackend::new("op1")
            .with_products([Product {
                id: "p1".into(),
                name: "Pantalón".into(),
                code: None,
                price: Money::from_cents(12050),
                available_stock: 10,
            }])
            .with_customers([Customer {
                id: "c1".into(),
                name: "Consumidor Final".into(),
                document: None,
                email: None,
                phone: None,
            }]);
        let mut register = CashRegister::new(backend.clone());
        register.open_from_input("50").await.unwrap();

        // 120.50 before IVA; build the request directly to control the total.
        let sale = backend
            .submit_sale(
                &SaleRequest {
                    customer_id: "c1".into(),
                    operator_id: "op1".into(),
                    payment_method: PaymentMethod::Cash,
                    lines: vec![SaleRequestLine {
                        product_id: "p1".into(),
                        quantity: 1,
                    }],
                },
                "k1",
            )
            .await
            .unwrap();
        let expected = Money::from_cents(5000) + sale.total;

        let report = register.close(expected - Money::from_cents(500)).await.unwrap();
        assert_eq!(report.expected_amount, expected);
        assert_eq!(report.difference, Money::from_cents(-500));
        assert_eq!(report.verdict, Verdict::Shortage);
        assert!(!register.can_sell());
        assert!(register.last_report().is_some());
    }

    #[tokio::test]
    async fn test_close_without_session_keeps_view() {
        let mut register = register();
        register.refresh_status().await.unwrap();

        let err = register.close(Money::zero()).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict(_)));
        assert_eq!(register.state(), &RegisterState::Closed);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_session_opened_elsewhere() {
        let backend = InMemoryBackend::new("op1");
        backend.open_session(Money::from_cents(2000)).await.unwrap();

        let mut register = CashRegister::new(backend);
        let session = register.refresh_status().await.unwrap().unwrap();
        assert_eq!(session.opening_amount, Money::from_cents(2000));
        assert!(register.can_sell());
    }
}
