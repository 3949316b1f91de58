//! # In-Memory Backend
//!
//! A [`PosBackend`] that keeps the whole store in process memory.
//!
//! It enforces the same rules as the real backend, which is what makes it
//! useful for tests and the CLI's `--demo` mode:
//!
//! - a sale decrements stock atomically, or not at all
//! - a sale requires an open cash session for the operator
//! - one open session per operator
//! - only cash sales feed the drawer's expected amount
//! - a repeated idempotency key returns the original sale
//!
//! Each handle is bound to one operator (what the bearer token does for the
//! HTTP backend). [`InMemoryBackend::for_operator`] hands out further
//! handles sharing the same store.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use tienda_core::{
    compute_totals, CashSession, ClosingReport, Customer, LineItem, Money, Page, PageQuery,
    Product, Sale, SaleLine, SaleRequest,
};

use crate::backend::PosBackend;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Default)]
struct Store {
    products: Vec<Product>,
    customers: Vec<Customer>,
    sessions: HashMap<String, CashSession>,
    sales: Vec<Sale>,
    sales_by_key: HashMap<String, usize>,
    next_sale: u64,
    next_session: u64,
}

#[derive(Debug, Default)]
struct Faults {
    /// Commit the next sale, then report a transport error.
    lose_next_sale_response: bool,
    /// Fail the next call of any kind with this error.
    next_error: Option<ClientError>,
}

#[derive(Debug, Default)]
struct Shared {
    store: Mutex<Store>,
    faults: Mutex<Faults>,
    calls: AtomicUsize,
}

/// Clonable in-memory backend bound to one operator.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
    operator_id: String,
}

impl InMemoryBackend {
    pub fn new(operator_id: impl Into<String>) -> Self {
        InMemoryBackend {
            shared: Arc::new(Shared::default()),
            operator_id: operator_id.into(),
        }
    }

    /// Another handle on the same store, acting as a different operator.
    pub fn for_operator(&self, operator_id: impl Into<String>) -> Self {
        InMemoryBackend {
            shared: Arc::clone(&self.shared),
            operator_id: operator_id.into(),
        }
    }

    pub fn operator_id(&self) -> &str {
        &self.operator_id
    }

    pub fn with_products(self, products: impl IntoIterator<Item = Product>) -> Self {
        self.lock().products.extend(products);
        self
    }

    pub fn with_customers(self, customers: impl IntoIterator<Item = Customer>) -> Self {
        self.lock().customers.extend(customers);
        self
    }

    /// Number of backend calls made through any handle.
    pub fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }

    pub fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.lock()
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.available_stock)
    }

    pub fn sales(&self) -> Vec<Sale> {
        self.lock().sales.clone()
    }

    /// Overwrites a product's stock, as another terminal selling would.
    pub fn set_stock(&self, product_id: &str, stock: i64) {
        if let Some(p) = self.lock().products.iter_mut().find(|p| p.id == product_id) {
            p.available_stock = stock;
        }
    }

    /// Makes the next sale commit but look like a dropped connection.
    pub fn lose_next_sale_response(&self) {
        self.faults().lose_next_sale_response = true;
    }

    /// Makes the next call fail with `err` without touching the store.
    pub fn fail_next(&self, err: ClientError) {
        self.faults().next_error = Some(err);
    }

    // A poisoned lock only means another test thread panicked mid-update;
    // the store itself is still usable.
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.shared
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.shared
            .faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_call(&self) -> ClientResult<()> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        match self.faults().next_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn process_sale(&self, request: &SaleRequest, idempotency_key: &str) -> ClientResult<Sale> {
        let mut store = self.lock();

        if let Some(&idx) = store.sales_by_key.get(idempotency_key) {
            debug!(idempotency_key, "Replaying sale for repeated key");
            return Ok(store.sales[idx].clone());
        }

        if request.operator_id != self.operator_id {
            return Err(ClientError::Rejected {
                status: 403,
                message: "Operator does not match the signed-in user".into(),
            });
        }

        if !store.customers.iter().any(|c| c.id == request.customer_id) {
            return Err(ClientError::Rejected {
                status: 404,
                message: format!("Customer {} not found", request.customer_id),
            });
        }

        if !store.sessions.contains_key(&self.operator_id) {
            return Err(ClientError::Rejected {
                status: 400,
                message: "No open cash session for this operator".into(),
            });
        }

        // Validate every line before touching stock.
        let mut priced = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = store
                .products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| ClientError::Rejected {
                    status: 404,
                    message: format!("Product {} not found", line.product_id),
                })?;

            if line.quantity <= 0 {
                return Err(ClientError::Rejected {
                    status: 400,
                    message: format!("Invalid quantity for {}", product.name),
                });
            }
            if line.quantity > product.available_stock {
                return Err(ClientError::Conflict(format!(
                    "Insufficient stock for {}: {} available",
                    product.name, product.available_stock
                )));
            }

            priced.push(LineItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
                available_stock: product.available_stock,
            });
        }

        for line in &priced {
            if let Some(p) = store.products.iter_mut().find(|p| p.id == line.product_id) {
                p.available_stock -= line.quantity;
            }
        }

        let totals = compute_totals(&priced);
        store.next_sale += 1;
        let sale = Sale {
            id: format!("V-{:06}", store.next_sale),
            timestamp: Utc::now(),
            customer_id: request.customer_id.clone(),
            operator_id: request.operator_id.clone(),
            payment_method: request.payment_method,
            lines: priced
                .iter()
                .map(|l| SaleLine {
                    product_id: l.product_id.clone(),
                    name: l.name.clone(),
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
        };

        if sale.payment_method.affects_drawer() {
            if let Some(session) = store.sessions.get_mut(&self.operator_id) {
                session.record_cash_sale(sale.total);
            }
        }

        let idx = store.sales.len();
        store.sales.push(sale.clone());
        store
            .sales_by_key
            .insert(idempotency_key.to_string(), idx);

        info!(sale_id = %sale.id, total = %sale.total, "Sale recorded");
        Ok(sale)
    }
}

fn paginate<T: Clone>(items: Vec<T>, query: &PageQuery) -> Page<T> {
    let total = items.len() as u64;
    let start = (query.page.saturating_sub(1) as usize).saturating_mul(query.page_size as usize);
    let data = items
        .into_iter()
        .skip(start)
        .take(query.page_size as usize)
        .collect();
    Page { data, total }
}

fn matches_search(search: Option<&str>, fields: &[Option<&str>]) -> bool {
    let Some(term) = search else {
        return true;
    };
    let term = term.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|f| f.to_lowercase().contains(&term))
}

impl PosBackend for InMemoryBackend {
    async fn list_products(&self, query: &PageQuery) -> ClientResult<Page<Product>> {
        self.begin_call()?;
        let query = query.clone().validated()?;
        let items: Vec<Product> = self
            .lock()
            .products
            .iter()
            .filter(|p| {
                matches_search(
                    query.search.as_deref(),
                    &[Some(p.name.as_str()), p.code.as_deref()],
                )
            })
            .cloned()
            .collect();
        Ok(paginate(items, &query))
    }

    async fn list_customers(&self, query: &PageQuery) -> ClientResult<Page<Customer>> {
        self.begin_call()?;
        let query = query.clone().validated()?;
        let items: Vec<Customer> = self
            .lock()
            .customers
            .iter()
            .filter(|c| {
                matches_search(
                    query.search.as_deref(),
                    &[Some(c.name.as_str()), c.document.as_deref(), c.email.as_deref()],
                )
            })
            .cloned()
            .collect();
        Ok(paginate(items, &query))
    }

    async fn submit_sale(&self, request: &SaleRequest, idempotency_key: &str) -> ClientResult<Sale> {
        self.begin_call()?;
        let sale = self.process_sale(request, idempotency_key)?;

        let lose = std::mem::take(&mut self.faults().lose_next_sale_response);
        if lose {
            return Err(ClientError::Transport("connection reset by peer".into()));
        }
        Ok(sale)
    }

    async fn current_session(&self) -> ClientResult<Option<CashSession>> {
        self.begin_call()?;
        Ok(self.lock().sessions.get(&self.operator_id).cloned())
    }

    async fn open_session(&self, opening_amount: Money) -> ClientResult<CashSession> {
        self.begin_call()?;
        if opening_amount.is_negative() {
            return Err(ClientError::Rejected {
                status: 400,
                message: "Opening amount cannot be negative".into(),
            });
        }

        let mut store = self.lock();
        if store.sessions.contains_key(&self.operator_id) {
            return Err(ClientError::SessionAlreadyActive(
                "There is already an open cash session for this operator".into(),
            ));
        }

        store.next_session += 1;
        let session = CashSession::opened(
            format!("C-{:04}", store.next_session),
            self.operator_id.clone(),
            opening_amount,
            Utc::now(),
        );
        store
            .sessions
            .insert(self.operator_id.clone(), session.clone());
        Ok(session)
    }

    async fn close_session(&self, counted_amount: Money) -> ClientResult<ClosingReport> {
        self.begin_call()?;
        if counted_amount.is_negative() {
            return Err(ClientError::Rejected {
                status: 400,
                message: "Counted amount cannot be negative".into(),
            });
        }

        let session = self
            .lock()
            .sessions
            .remove(&self.operator_id)
            .ok_or_else(|| ClientError::Conflict("No open cash session to close".into()))?;

        Ok(ClosingReport::new(
            session.opening_amount,
            session.cash_sales_accumulated,
            session.expected_amount,
            counted_amount,
        ))
    }
}
