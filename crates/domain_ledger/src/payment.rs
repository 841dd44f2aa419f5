//! Payments against invoices and bills

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, DocumentId, Money, PaymentId};

use crate::error::LedgerError;
use crate::numbering::DocumentKind;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    DebitCard,
    Check,
    Cash,
    Other,
}

/// A payment applied to exactly one invoice or bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub company_id: CompanyId,
    pub document_id: DocumentId,
    pub document_kind: DocumentKind,
    pub amount: Money,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    /// External reference (bank ref, transaction id)
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Names the document a payment applies to.
///
/// Exactly one of the two fields must be set; anything else is an
/// `InvalidReference` error.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DocumentRef {
    pub invoice_id: Option<DocumentId>,
    pub bill_id: Option<DocumentId>,
}

impl DocumentRef {
    pub fn invoice(id: DocumentId) -> Self {
        Self {
            invoice_id: Some(id),
            bill_id: None,
        }
    }

    pub fn bill(id: DocumentId) -> Self {
        Self {
            invoice_id: None,
            bill_id: Some(id),
        }
    }

    /// Resolves to the referenced kind and id, rejecting zero or two references
    pub fn resolve(&self) -> Result<(DocumentKind, DocumentId), LedgerError> {
        match (self.invoice_id, self.bill_id) {
            (Some(id), None) => Ok((DocumentKind::Invoice, id)),
            (None, Some(id)) => Ok((DocumentKind::Bill, id)),
            _ => Err(LedgerError::InvalidReference),
        }
    }
}
