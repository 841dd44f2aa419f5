//! Ledger Consistency Engine
//!
//! This crate implements the rules that keep monetary totals, running
//! balances, and document numbering correct as invoices, bills, payments,
//! expenses, and journal entries are created, updated, and deleted
//! concurrently.
//!
//! # Architecture
//!
//! Every mutating operation is computed purely against a snapshot of the
//! affected aggregates, then expressed as a [`CommitSet`]: the primary
//! writes plus a declarative list of [`BalanceEffect`]s. The storage
//! adapter applies one commit set atomically, so either the whole
//! operation becomes visible or none of it does.
//!
//! Write serialization is optimistic: documents and accounts carry a
//! version, and [`LedgerService`] retries a bounded number of times when
//! the store reports a conflict. Document number collisions follow the
//! same pattern through the numbering retry loop.
//!
//! # Example
//!
//! ```rust,ignore
//! let service = LedgerService::new(store);
//! let invoice = service.create_invoice(company, input).await?;
//! service.apply_payment(company, DocumentRef::invoice(invoice.id), payment).await?;
//! ```

pub mod document;
pub mod effects;
pub mod error;
pub mod journal;
pub mod numbering;
pub mod party;
pub mod payment;
pub mod product;
pub mod service;
pub mod store;
pub mod totals;

pub use document::{Document, DocumentStatus, LineItem};
pub use effects::{BalanceEffect, CommitSet, Write};
pub use error::LedgerError;
pub use journal::{
    Account, AccountType, JournalEntry, JournalEntryInput, JournalLine, JournalLineInput,
    JournalStatus,
};
pub use numbering::DocumentKind;
pub use party::{Party, PartyKind};
pub use payment::{DocumentRef, Payment, PaymentMethod};
pub use product::Product;
pub use service::{
    CreateDocumentInput, LedgerService, PaymentInput, UpdateDocumentInput,
};
pub use store::{LedgerStore, StoreError};
pub use totals::{DocumentTotals, LineItemInput};
