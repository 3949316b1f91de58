//! # Receipt Output
//!
//! After a sale is confirmed the checkout engine hands a
//! [`ReceiptSnapshot`] to a [`ReceiptSink`]. A failing sink is logged and
//! never undoes the sale.

use thiserror::Error;
use tracing::info;

use tienda_core::ReceiptSnapshot;

use crate::config::StoreSettings;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Printer unavailable: {0}")]
    Unavailable(String),
}

/// Destination for confirmed-sale receipts (printer, PDF, screen...).
pub trait ReceiptSink: Send + Sync {
    fn print(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError>;
}

/// Renders receipts as text and writes them to the log.
#[derive(Debug, Clone)]
pub struct LogReceiptSink {
    store_name: String,
    currency_symbol: String,
    width: usize,
}

impl LogReceiptSink {
    pub fn new(settings: &StoreSettings) -> Self {
        LogReceiptSink {
            store_name: settings.name.clone(),
            currency_symbol: settings.currency_symbol.clone(),
            width: settings.receipt_width,
        }
    }

    pub fn render(&self, receipt: &ReceiptSnapshot) -> Vec<String> {
        let width = self.width.max(24);
        let mut lines = Vec::with_capacity(receipt.lines.len() * 2 + 12);
        lines.push(center(&self.store_name, width));
        lines.extend(receipt.render_lines(width, &self.currency_symbol));
        lines
    }
}

impl Default for LogReceiptSink {
    fn default() -> Self {
        LogReceiptSink::new(&StoreSettings::default())
    }
}

impl ReceiptSink for LogReceiptSink {
    fn print(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError> {
        for line in self.render(receipt) {
            info!(target: "tienda::receipt", "{}", line);
        }
        Ok(())
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((width - len) / 2), text)
}
