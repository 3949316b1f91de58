//! # Backend Abstraction
//!
//! The checkout engine and the cash register only know this trait.
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │ CheckoutEngine   │   │ CashRegister     │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └──────────┬───────────┘
//!                     ▼
//!            ┌─────────────────┐
//!            │   PosBackend    │
//!            └───┬─────────┬───┘
//!                ▼         ▼
//!        HttpBackend   InMemoryBackend
//!        (REST API)    (tests, demos)
//! ```
//!
//! Cash-session calls are scoped to the operator the backend associates
//! with the current credentials; the client never passes an operator ID
//! for them.

use std::future::Future;

use tienda_core::{
    CashSession, ClosingReport, Customer, Money, Page, PageQuery, Product, Sale, SaleRequest,
};

use crate::error::ClientResult;

/// Operations the POS performs against its backend.
pub trait PosBackend: Send + Sync {
    /// `GET /products`
    fn list_products(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = ClientResult<Page<Product>>> + Send;

    /// `GET /customers`
    fn list_customers(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = ClientResult<Page<Customer>>> + Send;

    /// `POST /sales`
    ///
    /// Stock decrement and the sale record are one atomic operation on the
    /// backend. Submissions carrying an already-seen `idempotency_key`
    /// return the original sale instead of creating a second one.
    fn submit_sale(
        &self,
        request: &SaleRequest,
        idempotency_key: &str,
    ) -> impl Future<Output = ClientResult<Sale>> + Send;

    /// `GET /cash-sessions/current`; `None` when the drawer is closed.
    fn current_session(&self) -> impl Future<Output = ClientResult<Option<CashSession>>> + Send;

    /// `POST /cash-sessions/open`
    fn open_session(
        &self,
        opening_amount: Money,
    ) -> impl Future<Output = ClientResult<CashSession>> + Send;

    /// `POST /cash-sessions/close`
    fn close_session(
        &self,
        counted_amount: Money,
    ) -> impl Future<Output = ClientResult<ClosingReport>> + Send;
}
