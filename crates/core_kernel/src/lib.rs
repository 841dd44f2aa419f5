//! Core Kernel - Foundational types for the ledger engine
//!
//! This crate provides the building blocks used across the accounting core:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed entity identifiers
//! - Flexible parsing for loosely-typed caller inputs

pub mod error;
pub mod identifiers;
pub mod money;
pub mod parse;

pub use error::CoreError;
pub use identifiers::{
    AccountId, CompanyId, DocumentId, JournalEntryId, PartyId, PaymentId, ProductId,
};
pub use money::{Currency, Money, MoneyError, Rate};
