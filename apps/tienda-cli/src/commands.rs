//! # CLI Commands
//!
//! Each command drives a `CashRegister` or a `CheckoutEngine` and prints a
//! short human-readable result.

use anyhow::{bail, Result};
use tracing::info;

use tienda_client::{
    CashRegister, CheckoutEngine, ClientConfig, ClientError, ErrorKind, InMemoryBackend,
    LogReceiptSink, PosBackend, Role,
};
use tienda_core::{ClosingReport, Customer, Money, PaymentMethod, Product};

use crate::Command;

/// Runs one command against `backend`.
pub async fn run<B: PosBackend>(
    command: Command,
    backend: B,
    config: &ClientConfig,
    operator_id: &str,
    role: Role,
) -> Result<()> {
    let needs_sales_role = matches!(
        command,
        Command::Open { .. } | Command::Close { .. } | Command::Sell { .. }
    );
    if needs_sales_role && !role.can_sell() {
        bail!("role '{}' cannot operate the cash drawer", role);
    }

    match command {
        Command::Status => {
            let mut register = CashRegister::new(backend);
            match register.refresh_status().await.map_err(explain)? {
                Some(session) => {
                    println!("Drawer OPEN since {}", session.opened_at.format("%Y-%m-%d %H:%M"));
                    println!("  opening amount   {}", session.opening_amount);
                    println!("  cash sales       {}", session.cash_sales_accumulated);
                    println!("  expected amount  {}", session.expected_amount);
                }
                None => println!("Drawer CLOSED"),
            }
        }

        Command::Open { amount } => {
            let mut register = CashRegister::new(backend);
            let session = register.open_from_input(&amount).await.map_err(explain)?;
            println!("Drawer opened with {} (session {})", session.opening_amount, session.id);
        }

        Command::Close { amount } => {
            let mut register = CashRegister::new(backend);
            let report = register.close_from_input(&amount).await.map_err(explain)?;
            print_report(&report);
        }

        Command::Products { search } => {
            let mut engine = checkout_engine(backend, config);
            for p in engine.refresh_catalog(search.as_deref()).await.map_err(explain)? {
                print_product(p);
            }
        }

        Command::Customers { search } => {
            let mut engine = checkout_engine(backend, config);
            for c in engine.search_customers(search.as_deref()).await.map_err(explain)? {
                print_customer(c);
            }
        }

        Command::Sell {
            customer,
            products,
            payment,
        } => {
            let method: PaymentMethod = payment.parse().map_err(ClientError::from)?;
            let mut engine = checkout_engine(backend, config);

            engine.refresh_catalog(None).await.map_err(explain)?;
            let customer = engine.find_customer(&customer).await.map_err(explain)?;
            engine.select_customer(customer);
            engine.set_payment_method(method);
            for product_id in &products {
                let product = engine.find_product(product_id).await.map_err(explain)?;
                engine.add_to_cart(&product).map_err(explain)?;
            }

            let totals = engine.totals();
            println!(
                "Subtotal {}  IVA {}  TOTAL {}",
                totals.subtotal, totals.tax, totals.total
            );

            let sale = engine.submit_sale(Some(operator_id)).await.map_err(explain)?;
            println!("Sale {} confirmed: {}", sale.id, sale.total);
        }

        Command::Demo => demo().await?,
    }

    Ok(())
}

fn checkout_engine<B: PosBackend>(backend: B, config: &ClientConfig) -> CheckoutEngine<B> {
    CheckoutEngine::new(backend, LogReceiptSink::new(&config.store)).with_page_size(config.api.page_size)
}

/// A scripted shift: open with 50.00, sell, close short by 5.00.
pub async fn demo() -> Result<()> {
    let config = ClientConfig::default();
    let backend = InMemoryBackend::new("demo")
        .with_products(demo_products())
        .with_customers(demo_customers());

    let mut register = CashRegister::new(backend.clone());
    let mut engine = checkout_engine(backend, &config);

    register.refresh_status().await?;
    let session = register.open_from_input("50.00").await?;
    println!("Drawer opened with {}", session.opening_amount);

    engine.refresh_catalog(None).await?;
    engine.search_customers(Some("final")).await?;
    engine.select_customer_by_id("c-001")?;
    engine.add_to_cart_by_id("p-camisa")?;
    engine.add_to_cart_by_id("p-camisa")?;
    engine.add_to_cart_by_id("p-media")?;

    // Only two jeans in stock: the third add is refused.
    engine.add_to_cart_by_id("p-jean")?;
    engine.add_to_cart_by_id("p-jean")?;
    if let Err(e) = engine.add_to_cart_by_id("p-jean") {
        println!("Refused: {}", e.user_message());
    }

    let sale = engine.submit_sale(Some("demo")).await?;
    println!("Sale {} confirmed: {}", sale.id, sale.total);

    engine.set_payment_method(PaymentMethod::Card);
    engine.refresh_catalog(None).await?;
    engine.select_customer_by_id("c-001")?;
    engine.add_to_cart_by_id("p-media")?;
    let card_sale = engine.submit_sale(Some("demo")).await?;
    println!("Sale {} confirmed by card: {} (not in drawer)", card_sale.id, card_sale.total);

    let status = register.refresh_status().await?.cloned();
    let expected = status.map(|s| s.expected_amount).unwrap_or_default();
    let counted = expected - Money::from_cents(500);

    let report = register.close(counted).await?;
    print_report(&report);

    info!("Demo finished");
    Ok(())
}

/// Adds a hint for the errors an operator can act on.
fn explain(err: ClientError) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::Auth => Some("sign in again and export a fresh TIENDA_TOKEN"),
        ErrorKind::Transport => Some("check the backend URL and your connection"),
        ErrorKind::Validation | ErrorKind::Conflict => None,
    };
    match hint {
        Some(hint) => anyhow::anyhow!("{} ({})", err.user_message(), hint),
        None => anyhow::anyhow!("{}", err.user_message()),
    }
}

fn print_product(p: &Product) {
    println!(
        "{:<12} {:<30} {:>10}  stock {}",
        p.id, p.name, p.price.to_string(), p.available_stock
    );
}

fn print_customer(c: &Customer) {
    println!(
        "{:<12} {:<30} {}",
        c.id,
        c.name,
        c.document.as_deref().unwrap_or("-")
    );
}

fn print_report(report: &ClosingReport) {
    println!("Drawer closed");
    println!("  opening amount   {}", report.opening_amount);
    println!("  cash sales       {}", report.cash_sales_accumulated);
    println!("  expected amount  {}", report.expected_amount);
    println!("  counted amount   {}", report.counted_amount);
    println!("  difference       {}", report.difference);
    println!("  => {}", report.summary());
}

fn demo_products() -> Vec<Product> {
    vec![
        Product {
            id: "p-camisa".into(),
            name: "Camisa Oxford".into(),
            code: Some("CAM-001".into()),
            price: Money::from_cents(1000),
            available_stock: 12,
        },
        Product {
            id: "p-media".into(),
            name: "Medias algodón".into(),
            code: Some("MED-010".into()),
            price: Money::from_cents(550),
            available_stock: 40,
        },
        Product {
            id: "p-jean".into(),
            name: "Jean clásico".into(),
            code: Some("JEA-204".into()),
            price: Money::from_cents(2999),
            available_stock: 2,
        },
    ]
}

fn demo_customers() -> Vec<Customer> {
    vec![Customer {
        id: "c-001".into(),
        name: "Consumidor Final".into(),
        document: Some("9999999999999".into()),
        email: None,
        phone: None,
    }]
}
