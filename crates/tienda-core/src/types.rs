//! # Domain Types
//!
//! Core domain types used throughout Tienda POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │   CashSession   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name           │   │  customer_id    │   │  opening_amount │       │
//! │  │  price          │   │  lines[]        │   │  cash_sales     │       │
//! │  │  available_stock│   │  total          │   │  expected       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  PaymentMethod  │   │    Page<T>      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Cash           │   │  data: Vec<T>   │       │
//! │  │  1500 = 15%     │   │  Transfer       │   │  total          │       │
//! │  └─────────────────┘   │  Card           │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! `Sale` and `CashSession` are server-authoritative: the client only
//! deserializes them. `SaleRequest` is the one body the client builds.
//! All JSON is camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_PAGE_SIZE;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1500 bps = 15% (IVA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product row from the catalog snapshot.
///
/// `available_stock` is the last-known stock when the snapshot was fetched;
/// the backend re-checks it when a sale is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Store code / barcode, when the backend has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub price: Money,

    #[serde(alias = "stock")]
    pub available_stock: i64,
}

impl Product {
    /// Checks if `quantity` units fit within the last-known stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.available_stock
    }
}

/// A customer that can be attached to a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,

    /// National ID / tax number printed on the receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash. The only method that moves the drawer's expected amount.
    #[default]
    Cash,
    /// Bank transfer.
    Transfer,
    /// Card on an external terminal.
    Card,
}

impl PaymentMethod {
    /// Whether sales with this method count toward the drawer total.
    pub fn affects_drawer(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Transfer => write!(f, "transfer"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            "card" | "tarjeta" | "credit" | "debit" => Ok(PaymentMethod::Card),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec!["cash".into(), "transfer".into(), "card".into()],
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One line of the body sent to create a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequestLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Body of a sale submission.
///
/// Prices are deliberately absent: the backend prices the lines from its
/// own catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub customer_id: String,
    pub operator_id: String,
    pub payment_method: PaymentMethod,
    pub lines: Vec<SaleRequestLine>,
}

/// A line of a created sale, as priced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl SaleLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// A created sale. Immutable once the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    #[serde(alias = "createdAt")]
    pub timestamp: DateTime<Utc>,
    pub customer_id: String,
    pub operator_id: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub lines: Vec<SaleLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

// =============================================================================
// Cash Session
// =============================================================================

/// An open cash drawer session, scoped to one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashSession {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    pub opening_amount: Money,
    #[serde(default)]
    pub cash_sales_accumulated: Money,
    pub expected_amount: Money,
    pub operator_id: String,
}

impl CashSession {
    /// Starts a session record with no sales yet.
    pub fn opened(
        id: impl Into<String>,
        operator_id: impl Into<String>,
        opening_amount: Money,
        opened_at: DateTime<Utc>,
    ) -> Self {
        CashSession {
            id: id.into(),
            opened_at,
            opening_amount,
            cash_sales_accumulated: Money::zero(),
            expected_amount: opening_amount,
            operator_id: operator_id.into(),
        }
    }

    /// Records a cash sale against the drawer.
    pub fn record_cash_sale(&mut self, amount: Money) {
        self.cash_sales_accumulated += amount;
        self.expected_amount = self.opening_amount + self.cash_sales_accumulated;
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// One printed receipt line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// The projection handed to the receipt printer after a confirmed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSnapshot {
    pub sale_id: String,
    pub timestamp: DateTime<Utc>,
    pub customer: Customer,
    pub payment_method: PaymentMethod,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl ReceiptSnapshot {
    /// Renders the receipt as fixed-width text lines.
    pub fn render_lines(&self, width: usize, currency_symbol: &str) -> Vec<String> {
        let width = width.max(24);
        let rule = "-".repeat(width);
        let money = |m: Money| m.format_with(currency_symbol);
        let two_cols = |left: &str, right: &str| {
            let pad = width.saturating_sub(left.chars().count() + right.chars().count());
            format!("{}{}{}", left, " ".repeat(pad.max(1)), right)
        };

        let mut out = vec![
            format!("Sale {}", self.sale_id),
            self.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            format!("Customer: {}", self.customer.name),
        ];
        if let Some(doc) = &self.customer.document {
            out.push(format!("ID: {}", doc));
        }
        out.push(rule.clone());
        for line in &self.lines {
            out.push(line.name.clone());
            out.push(two_cols(
                &format!("  {} x {}", line.quantity, money(line.unit_price)),
                &money(line.line_total),
            ));
        }
        out.push(rule);
        out.push(two_cols("Subtotal", &money(self.subtotal)));
        out.push(two_cols("IVA", &money(self.tax)));
        out.push(two_cols("TOTAL", &money(self.total)));
        out.push(format!("Paid by {}", self.payment_method));
        out
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// A page of results from a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Page {
            data: Vec::new(),
            total: 0,
        }
    }
}

/// Query parameters for list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PageQuery {
    pub fn first(page_size: u32) -> Self {
        PageQuery {
            page: 1,
            page_size,
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    /// Checks bounds and trims the search term.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ValidationError::OutOfRange {
                field: "page size".to_string(),
                min: 1,
                max: MAX_PAGE_SIZE as i64,
            });
        }
        if let Some(search) = self.search.take() {
            let search = crate::validation::validate_search_query(&search)?;
            self.search = (!search.is_empty()).then_some(search);
        }
        Ok(self)
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        PageQuery::first(crate::DEFAULT_PAGE_SIZE)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1500);
        assert_eq!(rate.bps(), 1500);
        assert!((rate.percentage() - 15.0).abs() < 0.001);
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("efectivo".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert_eq!("tarjeta".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_product_accepts_stock_alias() {
        let json = r#"{"id":"p1","name":"Camisa","price":"12.50","stock":4}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.available_stock, 4);
        assert_eq!(product.price.cents(), 1250);
        assert!(product.can_sell(4));
        assert!(!product.can_sell(5));
    }

    #[test]
    fn test_sale_request_is_camel_case() {
        let request = SaleRequest {
            customer_id: "c1".into(),
            operator_id: "op1".into(),
            payment_method: PaymentMethod::Transfer,
            lines: vec![SaleRequestLine {
                product_id: "p1".into(),
                quantity: 2,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["customerId"], "c1");
        assert_eq!(json["paymentMethod"], "transfer");
        assert_eq!(json["lines"][0]["productId"], "p1");
    }

    #[test]
    fn test_cash_session_accumulates_cash_sales() {
        let mut session =
            CashSession::opened("s1", "op1", Money::from_cents(5000), Utc::now());
        session.record_cash_sale(Money::from_cents(12000));
        assert_eq!(session.cash_sales_accumulated.cents(), 12000);
        assert_eq!(session.expected_amount.cents(), 17000);
    }

    #[test]
    fn test_page_query_validation() {
        assert!(PageQuery::first(20).validated().is_ok());
        assert!(PageQuery { page: 0, ..PageQuery::first(20) }.validated().is_err());
        assert!(PageQuery::first(0).validated().is_err());
        assert!(PageQuery::first(MAX_PAGE_SIZE + 1).validated().is_err());

        let query = PageQuery::first(20).with_search("  jean  ").validated().unwrap();
        assert_eq!(query.search.as_deref(), Some("jean"));

        let blank = PageQuery::first(20).with_search("   ");
        assert_eq!(blank.search, None);
    }

    #[test]
    fn test_receipt_render_lines() {
        let receipt = ReceiptSnapshot {
            sale_id: "v-1".into(),
            timestamp: Utc::now(),
            customer: Customer {
                id: "c1".into(),
                name: "Consumidor Final".into(),
                document: Some("9999999999".into()),
                email: None,
                phone: None,
            },
            payment_method: PaymentMethod::Cash,
            lines: vec![ReceiptLine {
                name: "Camisa".into(),
                quantity: 2,
                unit_price: Money::from_cents(1000),
                line_total: Money::from_cents(2000),
            }],
            subtotal: Money::from_cents(2000),
            tax: Money::from_cents(300),
            total: Money::from_cents(2300),
        };
        let lines = receipt.render_lines(32, "$");
        assert!(lines.iter().any(|l| l.starts_with("TOTAL") && l.ends_with("$23.00")));
        assert!(lines.iter().any(|l| l == "ID: 9999999999"));
        assert!(lines.iter().all(|l| l.chars().count() <= 32));
    }
}
