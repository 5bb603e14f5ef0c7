//! # Invoice Drafts
//!
//! What a caller hands in to create an invoice, and the pure rules that turn
//! a draft plus the current catalog rows into priced, immutable lines.
//!
//! ## Draft → Invoice
//! ```text
//! InvoiceDraft { type: Sale, lines: [ (milk, qty 2), (bread, qty 1) ] }
//!      │
//!      ▼  validate()            empty? duplicates? quantities?
//!      │
//!      ▼  resolve_line() × N    price/cost frozen from the product row,
//!      │                        stock checked for sales
//!      ▼
//! Vec<InvoiceLine> ──► InvoiceTotals::compute() ──► Invoice totals
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{InvoiceLine, InvoiceStatus, InvoiceType, Product};
use crate::validation::{validate_non_negative, validate_price, validate_quantity};
use crate::MAX_INVOICE_LINES;

// =============================================================================
// Drafts
// =============================================================================

/// One requested line of a new invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLineDraft {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price override. Defaults to the product's price (sales) or cost
    /// (purchases).
    pub price_cents: Option<i64>,
    /// Per-unit discount.
    #[serde(default)]
    pub discount_cents: i64,
}

impl InvoiceLineDraft {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        InvoiceLineDraft {
            product_id: product_id.into(),
            quantity,
            price_cents: None,
            discount_cents: 0,
        }
    }
}

/// A new invoice as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDraft {
    pub invoice_type: InvoiceType,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub counterparty_id: Option<String>,
    /// Invoice-level discount, applied after line totals.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub lines: Vec<InvoiceLineDraft>,
}

impl InvoiceDraft {
    /// Empty sale draft dated `date`.
    pub fn sale(date: DateTime<Utc>) -> Self {
        Self::empty(InvoiceType::Sale, date)
    }

    /// Empty purchase draft dated `date`.
    pub fn purchase(date: DateTime<Utc>) -> Self {
        Self::empty(InvoiceType::Purchase, date)
    }

    fn empty(invoice_type: InvoiceType, date: DateTime<Utc>) -> Self {
        InvoiceDraft {
            invoice_type,
            date,
            counterparty_id: None,
            discount_cents: 0,
            status: InvoiceStatus::Completed,
            lines: Vec::new(),
        }
    }

    /// Appends a line at the product's current price.
    pub fn with_line(mut self, product_id: impl Into<String>, quantity: i64) -> Self {
        self.lines.push(InvoiceLineDraft::new(product_id, quantity));
        self
    }

    /// Checks the draft on its own, before any catalog lookup.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyInvoice);
        }
        if self.lines.len() > MAX_INVOICE_LINES {
            return Err(CoreError::InvoiceTooLarge {
                max: MAX_INVOICE_LINES,
            });
        }
        if self.status == InvoiceStatus::Cancelled {
            return Err(CoreError::InvalidInvoiceStatus {
                invoice_id: "new".to_string(),
                current_status: self.status.as_str().to_string(),
            });
        }
        validate_non_negative("discount", self.discount_cents)?;

        let mut seen = HashSet::new();
        for line in &self.lines {
            if !seen.insert(line.product_id.as_str()) {
                return Err(CoreError::DuplicateInvoiceLine {
                    product_id: line.product_id.clone(),
                });
            }
            validate_quantity(line.quantity)?;
            validate_non_negative("line discount", line.discount_cents)?;
            if let Some(price) = line.price_cents {
                validate_price("price", price)?;
            }
        }

        Ok(())
    }
}

/// Freezes one draft line against the current product row.
///
/// ## Errors
/// - `ProductNotFound` if the product is deleted or inactive
/// - `InsufficientStock` for a sale larger than the stock on hand
/// - `Validation` if the discount exceeds the unit price, or a stored price
///   or cost lies outside the accepted range
pub fn resolve_line(
    invoice_id: &str,
    invoice_type: InvoiceType,
    draft: &InvoiceLineDraft,
    product: &Product,
) -> CoreResult<InvoiceLine> {
    if !product.is_available() {
        return Err(CoreError::ProductNotFound(product.id.clone()));
    }

    let (price_cents, cost_cents) = match invoice_type {
        InvoiceType::Sale => {
            if !product.can_sell(draft.quantity) {
                return Err(CoreError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock_quantity,
                    requested: draft.quantity,
                });
            }
            (draft.price_cents.unwrap_or(product.price_cents), product.cost_cents)
        }
        InvoiceType::Purchase => {
            let unit = draft.price_cents.unwrap_or(product.cost_cents);
            (unit, unit)
        }
    };

    validate_price("price", price_cents)?;
    validate_price("cost", cost_cents)?;

    if draft.discount_cents > price_cents {
        return Err(ValidationError::OutOfRange {
            field: "line discount".to_string(),
            min: 0,
            max: price_cents,
        }
        .into());
    }

    Ok(InvoiceLine {
        invoice_id: invoice_id.to_string(),
        product_id: product.id.clone(),
        quantity: draft.quantity,
        price_cents,
        cost_cents,
        discount_cents: draft.discount_cents,
    })
}

// =============================================================================
// Totals
// =============================================================================

/// Aggregate amounts stored on the invoice row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub amount_cents: i64,
    pub profit_cents: i64,
    pub discount_cents: i64,
}

impl InvoiceTotals {
    /// Sums line totals and applies the invoice-level discount.
    ///
    /// Purchases carry no profit.
    ///
    /// ```rust
    /// use stockpad_core::{InvoiceLine, InvoiceTotals, InvoiceType};
    ///
    /// let lines = vec![InvoiceLine {
    ///     invoice_id: "i".into(),
    ///     product_id: "p".into(),
    ///     quantity: 2,
    ///     price_cents: 500,
    ///     cost_cents: 300,
    ///     discount_cents: 0,
    /// }];
    /// let totals = InvoiceTotals::compute(InvoiceType::Sale, &lines, 100).unwrap();
    /// assert_eq!(totals.amount_cents, 900);
    /// assert_eq!(totals.profit_cents, 300);
    /// ```
    pub fn compute(
        invoice_type: InvoiceType,
        lines: &[InvoiceLine],
        discount_cents: i64,
    ) -> CoreResult<Self> {
        let overflow = || -> CoreError {
            ValidationError::OutOfRange {
                field: "invoice total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into()
        };

        let mut subtotal = Money::zero();
        let mut cost = Money::zero();
        for line in lines {
            let unit = Money::from_cents(line.price_cents)
                .checked_sub(Money::from_cents(line.discount_cents))
                .ok_or_else(overflow)?;
            let line_total = unit
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(overflow)?;
            let line_cost = Money::from_cents(line.cost_cents)
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(overflow)?;

            subtotal = subtotal.checked_add(line_total).ok_or_else(overflow)?;
            cost = cost.checked_add(line_cost).ok_or_else(overflow)?;
        }

        let discount = Money::from_cents(discount_cents);
        if discount > subtotal {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: subtotal.cents(),
            }
            .into());
        }

        let amount = subtotal.checked_sub(discount).ok_or_else(overflow)?;
        let profit = match invoice_type {
            InvoiceType::Sale => amount.checked_sub(cost).ok_or_else(overflow)?,
            InvoiceType::Purchase => Money::zero(),
        };

        Ok(InvoiceTotals {
            amount_cents: amount.cents(),
            profit_cents: profit.cents(),
            discount_cents,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
