//! Catalog products
//!
//! Products are a default-value source when composing line items; the
//! ledger core reads them but never mutates them.

use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, Money, ProductId};

/// A catalog entry with a price for each document side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub company_id: CompanyId,
    pub code: String,
    pub name: String,
    /// Default unit price on invoices
    pub selling_price: Money,
    /// Default unit price on bills and expenses
    pub purchase_price: Money,
}

impl Product {
    pub fn new(
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
        selling_price: Money,
        purchase_price: Money,
    ) -> Self {
        Self {
            id: ProductId::new_v7(),
            company_id,
            code: code.into(),
            name: name.into(),
            selling_price,
            purchase_price,
        }
    }
}
