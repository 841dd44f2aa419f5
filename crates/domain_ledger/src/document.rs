//! Billable documents: invoices, bills, and expenses
//!
//! A document owns its line items exclusively; editing items replaces the
//! whole set and recomputes every derived monetary field. Status is always
//! derived from the paid/total relationship, never freely settable.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{CompanyId, Currency, DocumentId, Money, PartyId, Rate};

use crate::numbering::DocumentKind;

/// Document status
///
/// `Overdue` is advisory: it is derived at read time by
/// [`Document::effective_status`] and never persisted. Business rules
/// consult the persisted status only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Not yet issued
    Draft,
    /// Sent (invoices) or approved (bills/expenses), nothing paid
    Issued,
    /// Partially settled
    PartiallyPaid,
    /// Fully settled; the document is frozen
    Paid,
    /// Past due date and not fully paid (derived, never stored)
    Overdue,
}

impl DocumentStatus {
    /// Derives the persisted status from the paid/total relationship.
    ///
    /// `draft` keeps an unissued document in `Draft` while nothing has
    /// been paid against it.
    pub fn derive(paid: Money, total: Money, draft: bool) -> Self {
        if paid.is_zero() {
            if draft {
                DocumentStatus::Draft
            } else {
                DocumentStatus::Issued
            }
        } else if paid < total {
            DocumentStatus::PartiallyPaid
        } else {
            DocumentStatus::Paid
        }
    }
}

/// A line on a billable document
///
/// Tax and total are derived from quantity, unit price, tax rate, and
/// discount; they are recomputed whenever the item set changes and are
/// never independently authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub tax_rate: Rate,
    pub discount: Money,
    pub tax_amount: Money,
    pub total: Money,
}

/// A billable document aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub company_id: CompanyId,
    pub kind: DocumentKind,
    /// Unique per (company, kind); immutable once assigned
    pub number: String,
    /// Counterparty; required for invoices and bills, absent for expenses
    pub party_id: Option<PartyId>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax_amount: Money,
    /// Document-level discount, distinct from per-item discounts
    pub discount_amount: Money,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub balance_amount: Money,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    /// Optimistic-concurrency version, bumped by the store on every write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Returns the status as seen by reporting, deriving `Overdue` for
    /// unpaid documents past their due date.
    pub fn effective_status(&self, today: NaiveDate) -> DocumentStatus {
        match self.status {
            DocumentStatus::Paid | DocumentStatus::Draft => self.status,
            _ if today > self.due_date => DocumentStatus::Overdue,
            _ => self.status,
        }
    }

    /// Returns true if the document is fully settled and frozen
    pub fn is_settled(&self) -> bool {
        self.status == DocumentStatus::Paid
    }

    /// Returns true if any payment has been applied
    pub fn has_payments(&self) -> bool {
        self.paid_amount.is_positive()
    }
}
