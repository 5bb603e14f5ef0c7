//! # Validation Module
//!
//! Input validation utilities for Stockpad.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Mobile UI                                                    │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Use case (Rust)                                              │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (barcode, summary key)                                     │
//! │  └── Foreign keys (lines → invoices CASCADE, lines → products RESTRICT)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockpad_core::validation::{validate_barcode, validate_quantity};
//!
//! assert!(validate_barcode("5901234123457").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::Product;
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

/// Validates a category name: required, at most 100 characters.
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_name("category name", name, 100)
}

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a scanned or typed barcode.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - ASCII letters, digits and hyphens only (covers EAN/UPC and Code 128
///   labels printed in-store)
///
/// ```rust
/// use stockpad_core::validation::validate_barcode;
///
/// assert!(validate_barcode("4006381333931").is_ok());
/// assert!(validate_barcode("SHELF-12").is_ok());
/// assert!(validate_barcode("12 34").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    if barcode.is_empty() {
        return Err(ValidationError::required("barcode"));
    }

    if barcode.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 64,
        });
    }

    if !barcode
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query. Empty is allowed (lists everything).
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects negative values.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::negative(field));
    }
    Ok(())
}

/// Validates a unit price or cost: 0 ..= [`MAX_PRICE_CENTS`].
pub fn validate_price(field: &str, cents: i64) -> ValidationResult<()> {
    validate_non_negative(field, cents)?;

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a line quantity: 1 ..= [`MAX_LINE_QUANTITY`].
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the amounts fed into the daily sales accumulator.
pub fn validate_sale_amounts(quantity: i64, revenue_cents: i64, cost_cents: i64) -> ValidationResult<()> {
    validate_non_negative("quantity", quantity)?;
    validate_non_negative("revenue", revenue_cents)?;
    validate_non_negative("cost", cost_cents)?;
    Ok(())
}

/// Validates min/max stock thresholds.
pub fn validate_stock_thresholds(min_stock: i64, max_stock: Option<i64>) -> ValidationResult<()> {
    validate_non_negative("min_stock", min_stock)?;

    if let Some(max) = max_stock {
        if max < min_stock {
            return Err(ValidationError::OutOfRange {
                field: "max_stock".to_string(),
                min: min_stock,
                max: i64::MAX,
            });
        }
    }

    Ok(())
}

/// Rejects ranges whose start lies after their end.
pub fn validate_range<T: PartialOrd>(field: &str, start: &T, end: &T) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvertedRange {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates every user-editable field of a product.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_name(&product.name)?;

    if let Some(barcode) = &product.barcode {
        validate_barcode(barcode)?;
    }

    validate_price("price", product.price_cents)?;
    validate_price("cost", product.cost_cents)?;
    validate_non_negative("stock_quantity", product.stock_quantity)?;
    validate_stock_thresholds(product.min_stock, product.max_stock)?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
