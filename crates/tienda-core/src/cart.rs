//! # Cart
//!
//! The in-memory shopping cart and its money math.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Method                  Cart State Change     │
//! │  ───────────────          ──────                  ─────────────────     │
//! │                                                                         │
//! │  Click Product ──────────► add_product() ───────► qty += 1 or push     │
//! │                                                   (stock ceiling)      │
//! │                                                                         │
//! │  Change Quantity ────────► set_quantity() ──────► items[i].qty = n     │
//! │                                                                         │
//! │  Click Remove ───────────► remove_item() ───────► items.remove(i)      │
//! │                                                                         │
//! │  Pick Customer ──────────► select_customer() ───► customer = Some(c)   │
//! │                                                                         │
//! │  Checkout ───────────────► sale_request() ──────► (read only)          │
//! │                                                                         │
//! │  Sale confirmed / Reset ─► reset() ─────────────► empty cart           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Items are unique by `product_id` (adding the same product merges)
//! - `1 <= quantity <= last-known available stock` for every line
//! - A failed mutation leaves the cart exactly as it was

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    Customer, PaymentMethod, Product, ReceiptLine, ReceiptSnapshot, Sale, SaleRequest,
    SaleRequestLine,
};
use crate::validation::validate_cart_size;
use crate::{IVA_RATE, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// An item in the shopping cart.
///
/// ## Design Notes
/// `name`, `unit_price` and `available_stock` are frozen from the catalog
/// snapshot when the product is first added. The backend prices the sale
/// itself, so a stale price here only affects what the operator sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,

    /// Stock ceiling used by the soft check (last-known, not live).
    pub available_stock: i64,
}

impl LineItem {
    fn from_product(product: &Product) -> Self {
        LineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            available_stock: product.available_stock,
        }
    }

    /// Calculates the line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Subtotal, IVA and total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes totals for a set of lines.
///
/// The subtotal is an exact sum of cents; IVA is computed once on it and
/// rounded half-up, so rounding never compounds across lines.
pub fn compute_totals(lines: &[LineItem]) -> CartTotals {
    let subtotal: Money = lines.iter().map(LineItem::line_total).sum();
    let tax = subtotal.calculate_tax(IVA_RATE);
    CartTotals {
        item_count: lines.len(),
        total_quantity: lines.iter().map(|l| l.quantity).sum(),
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// The shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<LineItem>,
    pub customer: Option<Customer>,
    pub payment_method: PaymentMethod,

    /// When the cart was created/last reset
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            customer: None,
            payment_method: PaymentMethod::default(),
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of a product, merging with an existing line.
    ///
    /// ## Behavior
    /// - Already in cart: quantity + 1
    /// - Not in cart: new line with quantity 1
    /// - `current + 1 > available_stock`: `StockExceeded`, cart unchanged
    ///
    /// The stock figure is refreshed from `product` on every add, so a newer
    /// snapshot tightens or relaxes the ceiling for the existing line.
    pub fn add_product(&mut self, product: &Product) -> CoreResult<&LineItem> {
        let position = self.items.iter().position(|i| i.product_id == product.id);
        let current = position.map(|i| self.items[i].quantity).unwrap_or(0);
        let requested = current + 1;

        if requested > product.available_stock {
            return Err(CoreError::StockExceeded {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available: product.available_stock,
                requested,
            });
        }

        if requested > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested,
                max: MAX_ITEM_QUANTITY,
            });
        }

        match position {
            Some(idx) => {
                let item = &mut self.items[idx];
                item.quantity = requested;
                item.available_stock = product.available_stock;
                Ok(&self.items[idx])
            }
            None => {
                validate_cart_size(self.items.len())
                    .map_err(|_| CoreError::CartTooLarge { max: MAX_CART_ITEMS })?;
                self.items.push(LineItem::from_product(product));
                Ok(&self.items[self.items.len() - 1])
            }
        }
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - Quantity 0 removes the line
    /// - Above the line's last-known stock: `StockExceeded`
    /// - Product not in cart: returns `Ok(false)`
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<bool> {
        if quantity == 0 {
            return Ok(self.remove_item(product_id));
        }

        crate::validation::validate_quantity(quantity).map_err(|e| match e {
            crate::error::ValidationError::OutOfRange { .. } => CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            },
            other => CoreError::Validation(other),
        })?;

        let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) else {
            return Ok(false);
        };

        if quantity > item.available_stock {
            return Err(CoreError::StockExceeded {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                available: item.available_stock,
                requested: quantity,
            });
        }

        item.quantity = quantity;
        Ok(true)
    }

    /// Removes a line by product ID. Returns whether anything was removed.
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != initial_len
    }

    pub fn select_customer(&mut self, customer: Customer) {
        self.customer = Some(customer);
    }

    pub fn clear_customer(&mut self) {
        self.customer = None;
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    /// Clears lines, customer and payment method.
    pub fn reset(&mut self) {
        *self = Cart::new();
    }

    /// Returns the quantity of a product currently in the cart.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn totals(&self) -> CartTotals {
        compute_totals(&self.items)
    }

    /// Builds the sale submission body.
    ///
    /// ## Preconditions (checked in this order)
    /// 1. `operator_id` present → else `AuthRequired`
    /// 2. customer selected → else `CustomerRequired`
    /// 3. at least one line → else `EmptyCart`
    pub fn sale_request(&self, operator_id: Option<&str>) -> CoreResult<SaleRequest> {
        let operator_id = operator_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(CoreError::AuthRequired)?;

        let customer = self.customer.as_ref().ok_or(CoreError::CustomerRequired)?;

        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        Ok(SaleRequest {
            customer_id: customer.id.clone(),
            operator_id: operator_id.to_string(),
            payment_method: self.payment_method,
            lines: self
                .items
                .iter()
                .map(|i| SaleRequestLine {
                    product_id: i.product_id.clone(),
                    quantity: i.quantity,
                })
                .collect(),
        })
    }

    /// Projects a confirmed sale into the receipt handed to the printer.
    ///
    /// Line names fall back to the cart's names when the backend omits them.
    /// Returns `None` when no customer is selected.
    pub fn receipt_for(&self, sale: &Sale) -> Option<ReceiptSnapshot> {
        let customer = self.customer.clone()?;
        let lines = if sale.lines.is_empty() {
            self.items
                .iter()
                .map(|i| ReceiptLine {
                    name: i.name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    line_total: i.line_total(),
                })
                .collect()
        } else {
            sale.lines
                .iter()
                .map(|l| {
                    let name = if l.name.is_empty() {
                        self.items
                            .iter()
                            .find(|i| i.product_id == l.product_id)
                            .map(|i| i.name.clone())
                            .unwrap_or_else(|| l.product_id.clone())
                    } else {
                        l.name.clone()
                    };
                    ReceiptLine {
                        name,
                        quantity: l.quantity,
                        unit_price: l.unit_price,
                        line_total: l.line_total(),
                    }
                })
                .collect()
        };

        Some(ReceiptSnapshot {
            sale_id: sale.id.clone(),
            timestamp: sale.timestamp,
            customer,
            payment_method: sale.payment_method,
            lines,
            subtotal: sale.subtotal,
            tax: sale.tax,
            total: sale.total,
        })
    }
}
