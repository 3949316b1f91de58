//! # Error Types
//!
//! Domain-specific error types for tienda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tienda-core errors (this file)                                        │
//! │  ├── CoreError        - Cart / checkout / drawer rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tienda-client errors (separate crate)                                 │
//! │  └── ClientError      - Backend rejections, transport, auth            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → UI message          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is a *validation* failure in the sense of the
//! checkout flow: it is detected locally, nothing is sent to the backend,
//! and the cart / form state stays as the operator left it.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Adding one more unit would exceed the last-known stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Click product (stock: 2, in cart: 2)
    ///      │
    ///      ▼
    /// StockExceeded { name: "Camisa", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Only 2 Camisa in stock"; cart unchanged
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    StockExceeded {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Product is not in the current catalog snapshot.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer id matches no known customer.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// No operator is signed in.
    #[error("An operator must be signed in to sell")]
    AuthRequired,

    /// Checkout attempted without selecting a customer.
    #[error("Select a customer before completing the sale")]
    CustomerRequired,

    /// Checkout attempted with no line items.
    #[error("The cart is empty")]
    EmptyCart,

    /// A monetary input was empty, negative or not a number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(ValidationError),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g. letters in an amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
