//! # tienda-client: Backend Client for Tienda POS
//!
//! Checkout and cash-drawer flows over the store's REST backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     tienda-client                                       │
//! │                                                                         │
//! │  ┌──────────────────────┐          ┌──────────────────────┐            │
//! │  │  CheckoutEngine      │          │  CashRegister        │            │
//! │  │  cart → POST /sales  │          │  open / close drawer │            │
//! │  └──────────┬───────────┘          └──────────┬───────────┘            │
//! │             │      (never call each other)    │                        │
//! │             └───────────────┬─────────────────┘                        │
//! │                             ▼                                          │
//! │                  ┌─────────────────────┐      ┌─────────────────┐     │
//! │                  │  PosBackend         │◄─────│  TokenStore     │     │
//! │                  │  Http │ InMemory    │      │  bearer token   │     │
//! │                  └─────────────────────┘      └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//! ```rust,no_run
//! use tienda_client::{CashRegister, CheckoutEngine, ClientConfig, HttpBackend, LogReceiptSink, TokenStore};
//!
//! # async fn run() -> tienda_client::ClientResult<()> {
//! let config = ClientConfig::load_or_default(None);
//! let tokens = TokenStore::new();
//! let backend = HttpBackend::new(&config, tokens.clone())?;
//!
//! let mut register = CashRegister::new(backend.clone());
//! register.open_from_input("50.00").await?;
//!
//! let mut checkout = CheckoutEngine::new(backend, LogReceiptSink::new(&config.store));
//! checkout.refresh_catalog(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod checkout;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod receipt;
pub mod register;

pub use auth::{Credentials, Role, TokenStore};
pub use backend::PosBackend;
pub use checkout::CheckoutEngine;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use receipt::{LogReceiptSink, ReceiptError, ReceiptSink};
pub use register::{CashRegister, RegisterState};
