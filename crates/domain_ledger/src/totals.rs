//! Line-item totals calculator
//!
//! Pure arithmetic over a document's line items. Per item:
//! `line_subtotal = quantity × unit_price`, `line_tax = line_subtotal ×
//! tax_rate`, `line_total = line_subtotal + line_tax − item_discount`.
//! The document total subtracts the document-level discount from the
//! aggregate subtotal plus aggregate tax. All math is on `Decimal`, so
//! `total == subtotal + tax − discount` holds exactly.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use core_kernel::parse::{flexible_decimal, flexible_decimal_opt};
use core_kernel::{Currency, Money, Rate};

use crate::document::LineItem;
use crate::error::LedgerError;
use crate::numbering::DocumentKind;
use crate::product::Product;

/// Caller-supplied line item fields, before computation
///
/// Monetary values arrive as decimal strings or numbers from the HTTP
/// layer; the flexible deserializers normalize both.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    #[serde(deserialize_with = "flexible_decimal")]
    pub quantity: Decimal,
    #[serde(deserialize_with = "flexible_decimal")]
    pub unit_price: Decimal,
    /// Percentage, e.g. `10` for 10%
    #[serde(default, deserialize_with = "flexible_decimal_opt")]
    pub tax_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_decimal_opt")]
    pub discount: Option<Decimal>,
}

impl LineItemInput {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            tax_rate: None,
            discount: None,
        }
    }

    pub fn with_tax_rate(mut self, percent: Decimal) -> Self {
        self.tax_rate = Some(percent);
        self
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Composes a line from a catalog product, taking the unit price for
    /// the document side in play (selling price for invoices, purchase
    /// price for bills and expenses).
    pub fn from_product(product: &Product, kind: DocumentKind, quantity: Decimal) -> Self {
        let unit_price = match kind {
            DocumentKind::Invoice => product.selling_price,
            DocumentKind::Bill | DocumentKind::Expense => product.purchase_price,
        };
        Self::new(product.name.clone(), quantity, unit_price.amount())
    }
}

/// Aggregate monetary figures for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// Computes line items and document totals from raw inputs.
///
/// # Errors
///
/// - `EmptyDocument` for an empty item list
/// - `Validation` for negative quantities, prices, rates, or discounts
pub fn compute_totals(
    items: &[LineItemInput],
    document_discount: Decimal,
    currency: Currency,
) -> Result<(Vec<LineItem>, DocumentTotals), LedgerError> {
    if items.is_empty() {
        return Err(LedgerError::EmptyDocument);
    }
    if document_discount.is_sign_negative() {
        return Err(LedgerError::validation("document discount cannot be negative"));
    }

    let mut computed = Vec::with_capacity(items.len());
    let mut subtotal = Money::zero(currency);
    let mut tax_total = Money::zero(currency);

    for (index, input) in items.iter().enumerate() {
        validate_item(index, input)?;

        let unit_price = Money::new(input.unit_price, currency);
        let tax_rate = Rate::from_percentage(input.tax_rate.unwrap_or_default());
        let discount = Money::new(input.discount.unwrap_or_default(), currency);

        let line_subtotal = unit_price.multiply(input.quantity);
        let line_tax = tax_rate.apply(&line_subtotal);
        let line_total = line_subtotal.checked_add(&line_tax)?.checked_sub(&discount)?;

        subtotal = subtotal.checked_add(&line_subtotal)?;
        tax_total = tax_total.checked_add(&line_tax)?;

        computed.push(LineItem {
            id: Uuid::new_v4(),
            description: input.description.clone(),
            quantity: input.quantity,
            unit_price,
            tax_rate,
            discount,
            tax_amount: line_tax,
            total: line_total,
        });
    }

    let discount_amount = Money::new(document_discount, currency);
    let total = subtotal.checked_add(&tax_total)?.checked_sub(&discount_amount)?;

    Ok((
        computed,
        DocumentTotals {
            subtotal,
            tax_amount: tax_total,
            discount_amount,
            total,
        },
    ))
}

/// Rebuilds calculator inputs from stored line items, used when a
/// document-level field changes without an item replacement.
pub fn inputs_from_items(items: &[LineItem]) -> Vec<LineItemInput> {
    items
        .iter()
        .map(|item| LineItemInput {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.amount(),
            tax_rate: Some(item.tax_rate.as_percentage()),
            discount: Some(item.discount.amount()),
        })
        .collect()
}

fn validate_item(index: usize, input: &LineItemInput) -> Result<(), LedgerError> {
    if input.quantity.is_sign_negative() {
        return Err(LedgerError::Validation(format!(
            "item {index}: quantity cannot be negative"
        )));
    }
    if input.unit_price.is_sign_negative() {
        return Err(LedgerError::Validation(format!(
            "item {index}: unit price cannot be negative"
        )));
    }
    if input.tax_rate.unwrap_or_default().is_sign_negative() {
        return Err(LedgerError::Validation(format!(
            "item {index}: tax rate cannot be negative"
        )));
    }
    if input.discount.unwrap_or_default().is_sign_negative() {
        return Err(LedgerError::Validation(format!(
            "item {index}: discount cannot be negative"
        )));
    }
    Ok(())
}
