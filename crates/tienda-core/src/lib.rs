//! # tienda-core: Pure Business Logic for Tienda POS
//!
//! Cart math, drawer reconciliation and input rules for the point of sale.
//! Nothing in this crate performs I/O; the backend client lives in
//! `tienda-client`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tienda POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tienda-cli / UI shell                        │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Receipt ──► Drawer close   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tienda-client                                │   │
//! │  │    CheckoutEngine, CashRegister, PosBackend (REST / memory)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tienda-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │  cash   │ │validation│ │   │
//! │  │   │ Product │ │  Money  │ │  Cart   │ │ Closing │ │  amounts │ │   │
//! │  │   │  Sale   │ │ TaxRate │ │ Totals  │ │ Report  │ │  limits  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: amounts are cents (i64); floats only exist on the wire
//! 2. **Tax once**: IVA is applied to the subtotal, never per line
//! 3. **Explicit Errors**: every rejected action has a typed error
//!
//! ## Example Usage
//!
//! ```rust
//! use tienda_core::{Cart, Money, Product};
//!
//! let shirt = Product {
//!     id: "p1".into(),
//!     name: "Camisa".into(),
//!     code: None,
//!     price: Money::from_cents(1000),
//!     available_stock: 5,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_product(&shirt).unwrap();
//! cart.add_product(&shirt).unwrap();
//!
//! let totals = cart.totals();
//! assert_eq!(totals.subtotal.cents(), 2000);
//! assert_eq!(totals.tax.cents(), 300);
//! assert_eq!(totals.total.cents(), 2300);
//! ```

pub mod cart;
pub mod cash;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use cart::{compute_totals, Cart, CartTotals, LineItem};
pub use cash::{ClosingReport, Verdict};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// IVA (value-added tax) applied to every sale: 15%.
pub const IVA_RATE: TaxRate = TaxRate::from_bps(1500);

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typos like 1000 instead of 10 before the backend does.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest page the catalog endpoints are asked for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when configuration doesn't say otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
