//! In-memory [`LedgerStore`] adapter
//!
//! A single mutex over the whole state gives every commit the same
//! all-or-nothing guarantee the SQL adapter gets from a transaction:
//! preconditions are checked and new balances computed before anything is
//! mutated, so a failed commit leaves the state untouched. Suited to
//! tests and demos, not production retention.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use core_kernel::{
    AccountId, CompanyId, DocumentId, JournalEntryId, Money, PartyId, PaymentId, ProductId,
};
use domain_ledger::effects::{BalanceEffect, CommitSet, Write};
use domain_ledger::journal::{Account, JournalEntry};
use domain_ledger::numbering::DocumentKind;
use domain_ledger::party::Party;
use domain_ledger::payment::Payment;
use domain_ledger::product::Product;
use domain_ledger::store::{LedgerStore, StoreError};
use domain_ledger::Document;

#[derive(Default)]
struct State {
    parties: HashMap<(CompanyId, PartyId), Party>,
    products: HashMap<(CompanyId, ProductId), Product>,
    documents: HashMap<(CompanyId, DocumentId), Document>,
    /// Mirrors the SQL unique index on (company, kind, number)
    numbers: HashSet<(CompanyId, DocumentKind, String)>,
    payments: HashMap<(CompanyId, PaymentId), Payment>,
    accounts: HashMap<(CompanyId, AccountId), Account>,
    journal_entries: HashMap<(CompanyId, JournalEntryId), JournalEntry>,
}

/// Shared in-memory store; clones see the same state
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("state lock poisoned".into()))
    }

    /// Number of stored journal entries for a company, for assertions
    pub fn journal_entry_count(&self, company: CompanyId) -> usize {
        self.state
            .lock()
            .map(|state| {
                state
                    .journal_entries
                    .keys()
                    .filter(|(c, _)| *c == company)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Balance mutations validated during the check phase
///
/// Keyed by target so repeated effects against the same party or account
/// within one commit accumulate instead of overwriting each other.
#[derive(Default)]
struct PlannedBalances {
    parties: HashMap<PartyId, Money>,
    accounts: HashMap<AccountId, Money>,
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_party(&self, company: CompanyId, id: PartyId) -> Result<Party, StoreError> {
        self.lock()?
            .parties
            .get(&(company, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("party", id))
    }

    async fn get_product(&self, company: CompanyId, id: ProductId) -> Result<Product, StoreError> {
        self.lock()?
            .products
            .get(&(company, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_document(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<Document, StoreError> {
        self.lock()?
            .documents
            .get(&(company, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("document", id))
    }

    async fn find_document_by_number(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        number: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .find(|d| d.company_id == company && d.kind == kind && d.number == number)
            .cloned())
    }

    async fn count_documents(
        &self,
        company: CompanyId,
        kind: DocumentKind,
    ) -> Result<u64, StoreError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .filter(|d| d.company_id == company && d.kind == kind)
            .count() as u64)
    }

    async fn get_payment(&self, company: CompanyId, id: PaymentId) -> Result<Payment, StoreError> {
        self.lock()?
            .payments
            .get(&(company, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("payment", id))
    }

    async fn get_account(&self, company: CompanyId, id: AccountId) -> Result<Account, StoreError> {
        self.lock()?
            .accounts
            .get(&(company, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn upsert_party(&self, party: Party) -> Result<(), StoreError> {
        self.lock()?
            .parties
            .insert((party.company_id, party.id), party);
        Ok(())
    }

    async fn upsert_account(&self, account: Account) -> Result<(), StoreError> {
        self.lock()?
            .accounts
            .insert((account.company_id, account.id), account);
        Ok(())
    }

    async fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        self.lock()?
            .products
            .insert((product.company_id, product.id), product);
        Ok(())
    }

    async fn commit(&self, commit: CommitSet) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let company = commit.company_id;

        // Check phase: every precondition is verified and every new
        // balance computed before any mutation happens.
        for write in &commit.writes {
            match write {
                Write::InsertDocument(document) => {
                    let number_key = (company, document.kind, document.number.clone());
                    if state.numbers.contains(&number_key) {
                        return Err(StoreError::DuplicateNumber {
                            number: document.number.clone(),
                        });
                    }
                }
                Write::UpdateDocument(document) => {
                    let stored = state
                        .documents
                        .get(&(company, document.id))
                        .ok_or_else(|| StoreError::not_found("document", document.id))?;
                    if stored.version != document.version {
                        return Err(StoreError::version_conflict("document", document.id));
                    }
                }
                Write::DeleteDocument { id, version, .. } => {
                    let stored = state
                        .documents
                        .get(&(company, *id))
                        .ok_or_else(|| StoreError::not_found("document", *id))?;
                    if stored.version != *version {
                        return Err(StoreError::version_conflict("document", *id));
                    }
                }
                Write::InsertPayment(_) | Write::InsertJournalEntry(_) => {}
                Write::DeletePayment { id } => {
                    if !state.payments.contains_key(&(company, *id)) {
                        return Err(StoreError::not_found("payment", *id));
                    }
                }
            }
        }

        let mut planned = PlannedBalances::default();
        for effect in &commit.effects {
            match effect {
                BalanceEffect::Party { id, delta } => {
                    let current = match planned.parties.get(id) {
                        Some(balance) => *balance,
                        None => {
                            state
                                .parties
                                .get(&(company, *id))
                                .ok_or_else(|| StoreError::not_found("party", *id))?
                                .balance
                        }
                    };
                    let balance = current
                        .checked_add(delta)
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                    planned.parties.insert(*id, balance);
                }
                BalanceEffect::Account { id, delta } => {
                    let current = match planned.accounts.get(id) {
                        Some(balance) => *balance,
                        None => {
                            state
                                .accounts
                                .get(&(company, *id))
                                .ok_or_else(|| StoreError::not_found("account", *id))?
                                .balance
                        }
                    };
                    let balance = current
                        .checked_add(delta)
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                    planned.accounts.insert(*id, balance);
                }
            }
        }

        // Apply phase: infallible
        for write in commit.writes {
            match write {
                Write::InsertDocument(document) => {
                    state
                        .numbers
                        .insert((company, document.kind, document.number.clone()));
                    state.documents.insert((company, document.id), document);
                }
                Write::UpdateDocument(mut document) => {
                    document.version += 1;
                    state.documents.insert((company, document.id), document);
                }
                Write::DeleteDocument { id, .. } => {
                    if let Some(document) = state.documents.remove(&(company, id)) {
                        state
                            .numbers
                            .remove(&(company, document.kind, document.number));
                    }
                }
                Write::InsertPayment(payment) => {
                    state.payments.insert((company, payment.id), payment);
                }
                Write::DeletePayment { id } => {
                    state.payments.remove(&(company, id));
                }
                Write::InsertJournalEntry(entry) => {
                    state.journal_entries.insert((company, entry.id), entry);
                }
            }
        }

        for (id, balance) in planned.parties {
            if let Some(party) = state.parties.get_mut(&(company, id)) {
                party.balance = balance;
            }
        }
        for (id, balance) in planned.accounts {
            if let Some(account) = state.accounts.get_mut(&(company, id)) {
                account.balance = balance;
            }
        }

        Ok(())
    }
}
