//! Storage port for the ledger engine
//!
//! The engine computes against snapshots read through this trait and
//! persists through [`LedgerStore::commit`], which applies a whole
//! [`CommitSet`] atomically. Adapters live in `infra_mem` (single mutex,
//! validate-then-apply) and `infra_db` (one SQL transaction per commit).

use async_trait::async_trait;
use thiserror::Error;

use core_kernel::{AccountId, CompanyId, DocumentId, PartyId, PaymentId, ProductId};

use crate::document::Document;
use crate::effects::CommitSet;
use crate::journal::Account;
use crate::numbering::DocumentKind;
use crate::party::Party;
use crate::payment::Payment;
use crate::product::Product;

/// Errors reported by storage adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Insert collided with an existing (company, kind, number) tuple
    #[error("duplicate document number: {number}")]
    DuplicateNumber { number: String },

    /// A version-guarded write lost the race; the caller should re-read
    /// and retry
    #[error("version conflict on {entity} {id}")]
    VersionConflict { entity: &'static str, id: String },

    /// Connection to the backing store failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn version_conflict(entity: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::VersionConflict {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the failed write may succeed after a re-read
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. } | StoreError::DuplicateNumber { .. }
        )
    }
}

/// Transactional storage collaborator for the ledger engine
///
/// All reads and writes are scoped by company. Implementations must make
/// [`commit`](LedgerStore::commit) all-or-nothing: a failed commit leaves
/// no partial state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_party(&self, company: CompanyId, id: PartyId) -> Result<Party, StoreError>;

    async fn get_product(&self, company: CompanyId, id: ProductId) -> Result<Product, StoreError>;

    async fn get_document(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<Document, StoreError>;

    /// Looks a document up by its human-readable number
    async fn find_document_by_number(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        number: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Counts stored documents of a kind; the numbering sequence source
    async fn count_documents(
        &self,
        company: CompanyId,
        kind: DocumentKind,
    ) -> Result<u64, StoreError>;

    async fn get_payment(&self, company: CompanyId, id: PaymentId) -> Result<Payment, StoreError>;

    async fn get_account(&self, company: CompanyId, id: AccountId) -> Result<Account, StoreError>;

    /// Inserts or replaces a party (seeding and administration)
    async fn upsert_party(&self, party: Party) -> Result<(), StoreError>;

    /// Inserts or replaces an account (chart-of-accounts setup)
    async fn upsert_account(&self, account: Account) -> Result<(), StoreError>;

    /// Inserts or replaces a product (catalog administration)
    async fn upsert_product(&self, product: Product) -> Result<(), StoreError>;

    /// Applies a commit set atomically
    async fn commit(&self, commit: CommitSet) -> Result<(), StoreError>;
}
