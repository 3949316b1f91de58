//! # Checkout Engine
//!
//! Owns the cart for one terminal and turns it into a confirmed sale.
//!
//! ## Checkout Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Lifecycle                                   │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Submit   │────►│ Confirmed│       │
//! │  │  Cart    │     │          │     │ (POST)   │     │   Sale   │       │
//! │  └──────────┘     └──────────┘     └────┬─────┘     └────┬─────┘       │
//! │       ▲                add_to_cart      │ error           │             │
//! │       │                set_quantity     ▼                 │             │
//! │       │                remove      cart untouched,        │             │
//! │       │                            same idempotency key   │             │
//! │       │                                                   │             │
//! │       └───── reset cart, print receipt, catalog stale ◄───┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotent Submission
//! A lost response after the backend committed a sale must not turn into a
//! second sale when the operator retries. The first submit of a cart
//! generates a UUID sent as `Idempotency-Key`; retries of the *same* cart
//! reuse it. Any cart mutation, or a confirmed sale, drops it.
//!
//! Every mutating method takes `&mut self`, so a second submit cannot start
//! while one is in flight.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tienda_core::{
    Cart, CartTotals, CoreError, Customer, PageQuery, PaymentMethod, Product, Sale, MAX_PAGE_SIZE,
};

use crate::backend::PosBackend;
use crate::error::{ClientError, ClientResult};
use crate::receipt::{LogReceiptSink, ReceiptSink};

pub struct CheckoutEngine<B, R = LogReceiptSink> {
    backend: B,
    receipts: R,
    cart: Cart,
    catalog: Vec<Product>,
    catalog_stale: bool,
    customers: Vec<Customer>,
    page_size: u32,
    pending_key: Option<Uuid>,
}

impl<B: PosBackend, R: ReceiptSink> CheckoutEngine<B, R> {
    pub fn new(backend: B, receipts: R) -> Self {
        CheckoutEngine {
            backend,
            receipts,
            cart: Cart::new(),
            catalog: Vec::new(),
            catalog_stale: true,
            customers: Vec::new(),
            page_size: tienda_core::DEFAULT_PAGE_SIZE,
            pending_key: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// True after a confirmed sale until the next [`refresh_catalog`].
    ///
    /// [`refresh_catalog`]: Self::refresh_catalog
    pub fn is_catalog_stale(&self) -> bool {
        self.catalog_stale
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetches the first page of products matching `search`.
    ///
    /// Cart lines for products in the new snapshot pick up its stock figure
    /// as their ceiling; quantities already in the cart are left alone.
    pub async fn refresh_catalog(&mut self, search: Option<&str>) -> ClientResult<&[Product]> {
        let query = self.query(search)?;
        debug!(search = ?query.search, "Refreshing catalog");

        let page = self.backend.list_products(&query).await?;

        for item in &mut self.cart.items {
            if let Some(p) = page.data.iter().find(|p| p.id == item.product_id) {
                item.available_stock = p.available_stock;
            }
        }

        info!(products = page.data.len(), total = page.total, "Catalog refreshed");
        self.catalog = page.data;
        self.catalog_stale = false;
        Ok(&self.catalog)
    }

    pub async fn search_customers(&mut self, search: Option<&str>) -> ClientResult<&[Customer]> {
        let query = self.query(search)?;
        let page = self.backend.list_customers(&query).await?;
        debug!(customers = page.data.len(), "Customers loaded");
        self.customers = page.data;
        Ok(&self.customers)
    }

    /// Resolves a product id: the current snapshot first, then every page of
    /// the backend catalog.
    pub async fn find_product(&self, product_id: &str) -> ClientResult<Product> {
        if let Some(p) = self.catalog.iter().find(|p| p.id == product_id) {
            return Ok(p.clone());
        }

        let mut query = PageQuery::first(MAX_PAGE_SIZE);
        let mut seen = 0u64;
        loop {
            let page = self.backend.list_products(&query).await?;
            if let Some(p) = page.data.iter().find(|p| p.id == product_id) {
                debug!(product_id, page = query.page, "Product found beyond the snapshot");
                return Ok(p.clone());
            }
            seen += page.data.len() as u64;
            if page.data.is_empty() || seen >= page.total {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into());
            }
            query.page += 1;
        }
    }

    /// Resolves a customer id: the last search result first, then every page
    /// of the backend customer list.
    pub async fn find_customer(&self, customer_id: &str) -> ClientResult<Customer> {
        if let Some(c) = self.customers.iter().find(|c| c.id == customer_id) {
            return Ok(c.clone());
        }

        let mut query = PageQuery::first(MAX_PAGE_SIZE);
        let mut seen = 0u64;
        loop {
            let page = self.backend.list_customers(&query).await?;
            if let Some(c) = page.data.iter().find(|c| c.id == customer_id) {
                return Ok(c.clone());
            }
            seen += page.data.len() as u64;
            if page.data.is_empty() || seen >= page.total {
                return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
            }
            query.page += 1;
        }
    }

    fn query(&self, search: Option<&str>) -> ClientResult<PageQuery> {
        let query = match search {
            Some(s) => PageQuery::first(self.page_size).with_search(s),
            None => PageQuery::first(self.page_size),
        };
        Ok(query.validated()?)
    }

    // =========================================================================
    // Cart Mutations
    // =========================================================================

    /// Adds one unit of `product`. Fails with `StockExceeded` at the ceiling.
    pub fn add_to_cart(&mut self, product: &Product) -> ClientResult<()> {
        match self.cart.add_product(product) {
            Ok(item) => {
                debug!(product_id = %item.product_id, quantity = item.quantity, "Added to cart");
                self.cart_changed();
                Ok(())
            }
            Err(e) => {
                debug!(product_id = %product.id, error = %e, "Add to cart refused");
                Err(e.into())
            }
        }
    }

    /// Adds one unit of a product from the current catalog snapshot.
    pub fn add_to_cart_by_id(&mut self, product_id: &str) -> ClientResult<()> {
        let product = self
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        self.add_to_cart(&product)
    }

    /// Removes a line. Unknown products are a no-op.
    pub fn remove_from_cart(&mut self, product_id: &str) -> bool {
        let removed = self.cart.remove_item(product_id);
        if removed {
            self.cart_changed();
        }
        removed
    }

    /// Sets a line's quantity; `0` removes it.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> ClientResult<bool> {
        let changed = self.cart.set_quantity(product_id, quantity)?;
        if changed {
            self.cart_changed();
        }
        Ok(changed)
    }

    pub fn select_customer(&mut self, customer: Customer) {
        debug!(customer_id = %customer.id, "Customer selected");
        self.cart.select_customer(customer);
        self.cart_changed();
    }

    /// Selects a customer from the last [`search_customers`] result.
    ///
    /// [`search_customers`]: Self::search_customers
    pub fn select_customer_by_id(&mut self, customer_id: &str) -> ClientResult<()> {
        let customer = self
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned()
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;
        self.select_customer(customer);
        Ok(())
    }

    pub fn clear_customer(&mut self) {
        self.cart.clear_customer();
        self.cart_changed();
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.cart.set_payment_method(method);
        self.cart_changed();
    }

    /// Abandons the current cart.
    pub fn reset(&mut self) {
        self.cart.reset();
        self.cart_changed();
    }

    /// The cart differs from what was last submitted.
    fn cart_changed(&mut self) {
        self.pending_key = None;
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submits the cart as a sale.
    ///
    /// ## Preconditions (checked locally, in order)
    /// 1. `operator_id` present → else `AuthRequired`
    /// 2. customer selected → else `CustomerRequired`
    /// 3. cart not empty → else `EmptyCart`
    ///
    /// ## On Success
    /// The cart resets, the catalog is marked stale, and the receipt goes
    /// to the sink. A sink failure is logged only.
    ///
    /// ## On Failure
    /// The cart is exactly as before. Nothing is retried automatically.
    pub async fn submit_sale(&mut self, operator_id: Option<&str>) -> ClientResult<Sale> {
        let request = self.cart.sale_request(operator_id)?;
        let key = *self.pending_key.get_or_insert_with(Uuid::new_v4);

        debug!(
            idempotency_key = %key,
            lines = request.lines.len(),
            payment_method = %request.payment_method,
            "Submitting sale"
        );

        let sale = match self.backend.submit_sale(&request, &key.to_string()).await {
            Ok(sale) => sale,
            Err(e) => {
                match e.kind() {
                    crate::error::ErrorKind::Transport => {
                        error!(idempotency_key = %key, error = %e, "Sale submission failed")
                    }
                    _ => warn!(idempotency_key = %key, error = %e, "Sale rejected"),
                }
                return Err(e);
            }
        };

        info!(
            sale_id = %sale.id,
            total = %sale.total,
            payment_method = %sale.payment_method,
            "Sale confirmed"
        );

        if let Some(receipt) = self.cart.receipt_for(&sale) {
            if let Err(e) = self.receipts.print(&receipt) {
                warn!(sale_id = %sale.id, error = %e, "Receipt printing failed");
            }
        }

        self.cart.reset();
        self.pending_key = None;
        self.catalog_stale = true;

        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use crate::receipt::ReceiptError;
    use std::sync::{Arc, Mutex};
    use tienda_core::{Money, ReceiptSnapshot};

    #[derive(Clone, Default)]
    struct CollectingSink {
        printed: Arc<Mutex<Vec<ReceiptSnapshot>>>,
        fail: bool,
    }

    impl ReceiptSink for CollectingSink {
        fn print(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError> {
            if self.fail {
                return Err(ReceiptError::Unavailable("paper out".into()));
            }
            self.printed.lock().unwrap().push(receipt.clone());
            Ok(())
        }
    }

    fn product(id: &str, cents: i64, stock: i64) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {id}"),
            code: None,
            price: Money::from_cents(cents),
            available_stock: stock,
        }
    }

    fn customer() -> Customer {
        Customer {
            id: "c1".into(),
            name: "Ana Torres".into(),
            document: None,
            email: None,
            phone: None,
        }
    }

    async fn engine_with_open_drawer() -> (CheckoutEngine<InMemoryBackend, CollectingSink>, CollectingSink) {
        let backend = InMemoryBackend::new("op1")
            .with_products([product("p1", 1000, 5), product("p2", 550, 2)])
            .with_customers([customer()]);
        backend.open_session(Money::zero()).await.unwrap();

        let sink = CollectingSink::default();
        let mut engine = CheckoutEngine::new(backend, sink.clone());
        engine.refresh_catalog(None).await.unwrap();
        (engine, sink)
    }

    #[tokio::test]
    async fn test_full_checkout() {
        let (mut engine, sink) = engine_with_open_drawer().await;

        engine.add_to_cart_by_id("p1").unwrap();
        engine.add_to_cart_by_id("p1").unwrap();
        engine.add_to_cart_by_id("p2").unwrap();
        engine.select_customer(customer());

        let totals = engine.totals();
        assert_eq!(totals.total, Money::from_cents(2933));

        let sale = engine.submit_sale(Some("op1")).await.unwrap();

        assert_eq!(sale.subtotal, Money::from_cents(2550));
        assert_eq!(sale.tax, Money::from_cents(383));
        assert_eq!(sale.total, Money::from_cents(2933));
        assert!(engine.cart().is_empty());
        assert!(engine.cart().customer.is_none());
        assert!(engine.is_catalog_stale());
        assert_eq!(engine.backend().stock_of("p1"), Some(3));

        let printed = sink.printed.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].sale_id, sale.id);
        assert_eq!(printed[0].lines.len(), 2);
    }

    #[tokio::test]
    async fn test_local_preconditions_make_no_call() {
        let (mut engine, _) = engine_with_open_drawer().await;
        let calls = engine.backend().calls();

        assert!(matches!(
            engine.submit_sale(Some("op1")).await,
            Err(ClientError::Core(CoreError::CustomerRequired))
        ));

        engine.select_customer(customer());
        assert!(matches!(
            engine.submit_sale(Some("op1")).await,
            Err(ClientError::Core(CoreError::EmptyCart))
        ));

        engine.add_to_cart_by_id("p1").unwrap();
        assert!(matches!(
            engine.submit_sale(None).await,
            Err(ClientError::Core(CoreError::AuthRequired))
        ));

        assert_eq!(engine.backend().calls(), calls);
    }

    #[tokio::test]
    async fn test_failed_submission_preserves_cart() {
        let (mut engine, sink) = engine_with_open_drawer().await;
        engine.add_to_cart_by_id("p2").unwrap();
        engine.add_to_cart_by_id("p2").unwrap();
        engine.select_customer(customer());
        let before = engine.cart().clone();

        // Another terminal sold one in the meantime.
        engine.backend().set_stock("p2", 1);

        let err = engine.submit_sale(Some("op1")).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict(_)));
        assert_eq!(engine.cart(), &before);
        assert!(sink.printed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_after_lost_response_does_not_double_sell() {
        let (mut engine, _) = engine_with_open_drawer().await;
        engine.add_to_cart_by_id("p1").unwrap();
        engine.select_customer(customer());

        engine.backend().lose_next_sale_response();
        let err = engine.submit_sale(Some("op1")).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Transport);
        assert!(!engine.cart().is_empty());

        let sale = engine.submit_sale(Some("op1")).await.unwrap();
        assert_eq!(engine.backend().sales().len(), 1);
        assert_eq!(engine.backend().sales()[0].id, sale.id);
        assert_eq!(engine.backend().stock_of("p1"), Some(4));
    }

    #[tokio::test]
    async fn test_mutation_discards_idempotency_key() {
        let (mut engine, _) = engine_with_open_drawer().await;
        engine.add_to_cart_by_id("p1").unwrap();
        engine.select_customer(customer());

        engine.backend().lose_next_sale_response();
        engine.submit_sale(Some("op1")).await.unwrap_err();

        // Operator changes the cart: this is a new sale.
        engine.add_to_cart_by_id("p1").unwrap();
        engine.submit_sale(Some("op1")).await.unwrap();

        assert_eq!(engine.backend().sales().len(), 2);
        assert_eq!(engine.backend().stock_of("p1"), Some(2));
    }

    #[tokio::test]
    async fn test_receipt_failure_does_not_fail_sale() {
        let backend = InMemoryBackend::new("op1")
            .with_products([product("p1", 1000, 5)])
            .with_customers([customer()]);
        backend.open_session(Money::zero()).await.unwrap();
        let sink = CollectingSink {
            fail: true,
            ..CollectingSink::default()
        };

        let mut engine = CheckoutEngine::new(backend, sink);
        engine.add_to_cart(&product("p1", 1000, 5)).unwrap();
        engine.select_customer(customer());

        assert!(engine.submit_sale(Some("op1")).await.is_ok());
        assert!(engine.cart().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_id() {
        let (mut engine, _) = engine_with_open_drawer().await;
        assert!(matches!(
            engine.add_to_cart_by_id("nope"),
            Err(ClientError::Core(CoreError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_refresh_updates_cart_ceiling() {
        let (mut engine, _) = engine_with_open_drawer().await;
        engine.add_to_cart_by_id("p1").unwrap();

        engine.backend().set_stock("p1", 1);
        engine.refresh_catalog(None).await.unwrap();

        assert!(matches!(
            engine.add_to_cart_by_id("p1"),
            Err(ClientError::Core(CoreError::StockExceeded { available: 1, .. }))
        ));
        assert!(!engine.is_catalog_stale());
    }

    #[tokio::test]
    async fn test_customer_search_and_select() {
        let (mut engine, _) = engine_with_open_drawer().await;
        let found = engine.search_customers(Some("ana")).await.unwrap();
        assert_eq!(found.len(), 1);

        engine.select_customer_by_id("c1").unwrap();
        assert_eq!(engine.cart().customer.as_ref().map(|c| c.id.as_str()), Some("c1"));
    }

    #[tokio::test]
    async fn test_unknown_customer_is_local_validation() {
        let (mut engine, _) = engine_with_open_drawer().await;
        engine.search_customers(None).await.unwrap();
        let calls = engine.backend().calls();

        let err = engine.select_customer_by_id("c9").unwrap_err();
        assert!(matches!(&err, ClientError::Core(CoreError::CustomerNotFound(id)) if id == "c9"));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(err.is_local());
        assert_eq!(engine.backend().calls(), calls);
        assert!(engine.cart().customer.is_none());
    }

    fn large_backend() -> InMemoryBackend {
        let products = (1..=130).map(|i| product(&format!("p{i}"), 100 * i, 3));
        let customers = (1..=120).map(|i| Customer {
            id: format!("c{i}"),
            name: format!("Customer {i}"),
            document: None,
            email: None,
            phone: None,
        });
        InMemoryBackend::new("op1")
            .with_products(products)
            .with_customers(customers)
    }

    #[tokio::test]
    async fn test_find_product_beyond_first_page() {
        let backend = large_backend();
        backend.open_session(Money::zero()).await.unwrap();
        let mut engine = CheckoutEngine::new(backend, CollectingSink::default());
        engine.refresh_catalog(None).await.unwrap();
        assert_eq!(engine.catalog().len(), 50);

        assert!(matches!(
            engine.add_to_cart_by_id("p125"),
            Err(ClientError::Core(CoreError::ProductNotFound(_)))
        ));

        let product = engine.find_product("p125").await.unwrap();
        assert_eq!(product.price, Money::from_cents(12500));
        engine.add_to_cart(&product).unwrap();

        let customer = engine.find_customer("c115").await.unwrap();
        engine.select_customer(customer);

        let sale = engine.submit_sale(Some("op1")).await.unwrap();
        assert_eq!(sale.subtotal, Money::from_cents(12500));
        assert_eq!(engine.backend().stock_of("p125"), Some(2));
    }

    #[tokio::test]
    async fn test_find_scans_every_page_before_giving_up() {
        let engine = CheckoutEngine::new(large_backend(), CollectingSink::default());

        let calls = engine.backend().calls();
        assert!(matches!(
            engine.find_product("p999").await,
            Err(ClientError::Core(CoreError::ProductNotFound(_)))
        ));
        // 130 products at 100 per page
        assert_eq!(engine.backend().calls(), calls + 2);

        let err = engine.find_customer("c999").await.unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::CustomerNotFound(_))));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_find_product_prefers_snapshot() {
        let (engine, _) = engine_with_open_drawer().await;
        let calls = engine.backend().calls();
        assert_eq!(engine.find_product("p2").await.unwrap().id, "p2");
        assert_eq!(engine.backend().calls(), calls);
    }

    #[tokio::test]
    async fn test_remove_from_cart_starts_a_new_sale() {
        let (mut engine, _) = engine_with_open_drawer().await;
        engine.add_to_cart_by_id("p1").unwrap();
        engine.add_to_cart_by_id("p2").unwrap();
        engine.select_customer(customer());

        assert!(!engine.remove_from_cart("nope"));
        assert_eq!(engine.cart().items.len(), 2);

        engine.backend().lose_next_sale_response();
        engine.submit_sale(Some("op1")).await.unwrap_err();
        assert_eq!(engine.backend().sales().len(), 1);

        // Changed cart: the retry is a different sale, not a replay.
        assert!(engine.remove_from_cart("p2"));
        assert_eq!(engine.cart().items.len(), 1);
        let sale = engine.submit_sale(Some("op1")).await.unwrap();

        assert_eq!(engine.backend().sales().len(), 2);
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(engine.backend().stock_of("p1"), Some(3));
        assert_eq!(engine.backend().stock_of("p2"), Some(1));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let (mut engine, _) = engine_with_open_drawer().await;

        engine.backend().fail_next(ClientError::Server {
            status: 503,
            message: "Service Unavailable".into(),
        });
        let err = engine.refresh_catalog(None).await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Transport);
        assert_eq!(engine.catalog().len(), 2);
        assert!(!engine.is_catalog_stale());
        assert!(engine.refresh_catalog(None).await.is_ok());
    }
}
