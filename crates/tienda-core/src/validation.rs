//! # Validation Module
//!
//! Input validation utilities for Tienda POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Keystroke filter                                             │
//! │  └── accepts_amount_char / sanitize_amount_input                       │
//! │      digits and one decimal separator; no '-', no 'e'                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Pre-submit check (THIS MODULE)                               │
//! │  └── parse_amount: empty ≠ zero, non-negative, numeric                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                      │
//! │  └── authoritative stock and session rules                             │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every amount field in the system (opening cash, counted cash, prices
//! typed by hand) goes through [`parse_amount`]; there is no per-form
//! string handling.
//!
//! ## Usage
//! ```rust
//! use tienda_core::validation::{parse_amount, validate_quantity};
//!
//! let opening = parse_amount("50.00", "opening amount").unwrap();
//! assert_eq!(opening.cents(), 5000);
//!
//! assert!(parse_amount("", "opening amount").is_err());
//! assert!(parse_amount("-1", "opening amount").is_err());
//! assert!(validate_quantity(3).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum accepted length of a catalog/customer search term.
pub const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// Amount Input
// =============================================================================

/// Parses a non-negative decimal amount typed by the operator.
///
/// ## Rules
/// - Empty (or whitespace) input is `Required`; it never becomes zero
/// - A minus sign is `Negative`
/// - Scientific notation (`1e3`) and any other non-digit is `InvalidFormat`
/// - `0`, `0.00` and `.5` are valid
/// - More than two decimals round half-up to the cent
pub fn parse_amount(raw: &str, field: &str) -> ValidationResult<Money> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if trimmed.starts_with('-') {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if trimmed.contains(|c: char| c == 'e' || c == 'E') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "scientific notation is not accepted".to_string(),
        });
    }

    let amount: Money = trimmed
        .parse()
        .map_err(|e: crate::money::ParseMoneyError| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })?;

    validate_non_negative(amount, field)?;
    Ok(amount)
}

/// Rejects negative amounts. Zero is allowed.
pub fn validate_non_negative(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Keystroke filter for amount fields.
///
/// `current` is the text already in the field; `c` is the key pressed.
/// Digits are always accepted, a decimal separator only once.
pub fn accepts_amount_char(current: &str, c: char) -> bool {
    match c {
        '0'..='9' => true,
        '.' | ',' => !current.contains(|c: char| c == '.' || c == ','),
        _ => false,
    }
}

/// Applies [`accepts_amount_char`] to pasted text.
///
/// ```rust
/// use tienda_core::validation::sanitize_amount_input;
///
/// assert_eq!(sanitize_amount_input("-1e3.5.0"), "13.50");
/// ```
pub fn sanitize_amount_input(raw: &str) -> String {
    raw.chars().fold(String::with_capacity(raw.len()), |mut acc, c| {
        if accepts_amount_char(&acc, c) {
            acc.push(c);
        }
        acc
    })
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in the cart.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_accepts_zero_and_decimals() {
        assert_eq!(parse_amount("0", "amount").unwrap().cents(), 0);
        assert_eq!(parse_amount("0.00", "amount").unwrap().cents(), 0);
        assert_eq!(parse_amount("50", "amount").unwrap().cents(), 5000);
        assert_eq!(parse_amount("165,5", "amount").unwrap().cents(), 16550);
    }

    #[test]
    fn test_parse_amount_empty_is_not_zero() {
        assert_eq!(
            parse_amount("", "counted amount"),
            Err(ValidationError::Required {
                field: "counted amount".to_string()
            })
        );
        assert!(parse_amount("   ", "counted amount").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_sign_and_exponent() {
        assert!(matches!(
            parse_amount("-1", "amount"),
            Err(ValidationError::Negative { .. })
        ));
        assert!(matches!(
            parse_amount("-0.01", "amount"),
            Err(ValidationError::Negative { .. })
        ));
        assert!(matches!(
            parse_amount("1e2", "amount"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_amount("2E1", "amount"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_amount("+5", "amount"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_amount("abc", "amount"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_keystroke_filter() {
        assert!(accepts_amount_char("", '7'));
        assert!(accepts_amount_char("12", '.'));
        assert!(!accepts_amount_char("12.5", ','));
        assert!(!accepts_amount_char("", '-'));
        assert!(!accepts_amount_char("1", 'e'));
        assert!(!accepts_amount_char("1", 'E'));
        assert_eq!(sanitize_amount_input("12a,5"), "12,5");
        assert_eq!(sanitize_amount_input("--"), "");
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  jean ").unwrap(), "jean");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }
}
