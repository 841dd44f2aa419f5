//! Counterparties: customers and suppliers
//!
//! A party's running `balance` is the signed net amount owed (by a
//! customer, or to a supplier). It is mutated only through commit-set
//! balance effects, never read-modified elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, Currency, Money, PartyId};

/// Which side of the ledger a party sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    /// Billed via invoices; balance is receivable
    Customer,
    /// Billed via bills; balance is payable
    Supplier,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

/// A customer or supplier scoped to a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub company_id: CompanyId,
    pub kind: PartyKind,
    /// Unique per company
    pub code: String,
    pub name: String,
    /// Customers only; advisory, not enforced by the engine
    pub credit_limit: Option<Money>,
    /// Net amount owed, updated transactionally with document operations
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Party {
    /// Creates a new party with a zero balance
    pub fn new(
        company_id: CompanyId,
        kind: PartyKind,
        code: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PartyId::new_v7(),
            company_id,
            kind,
            code: code.into(),
            name: name.into(),
            credit_limit: None,
            balance: Money::zero(currency),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the credit limit (meaningful for customers)
    pub fn with_credit_limit(mut self, limit: Money) -> Self {
        self.credit_limit = Some(limit);
        self
    }
}
