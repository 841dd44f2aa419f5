//! Commit sets and declarative ledger effects
//!
//! Every mutating operation in the engine is expressed as one
//! [`CommitSet`]: the primary writes plus the balance deltas they imply.
//! The storage adapter applies the whole set atomically, which makes the
//! balance invariants auditable in one place instead of scattered
//! increment calls.

use core_kernel::{AccountId, CompanyId, DocumentId, Money, PartyId, PaymentId};

use crate::document::Document;
use crate::journal::JournalEntry;
use crate::numbering::DocumentKind;
use crate::payment::Payment;

/// A balance delta applied to a counterparty or account as part of a commit
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceEffect {
    /// Adjusts a customer or supplier running balance
    Party { id: PartyId, delta: Money },
    /// Adjusts an account running balance
    Account { id: AccountId, delta: Money },
}

/// A primary write within a commit set
#[derive(Debug, Clone)]
pub enum Write {
    /// Insert a new document; fails with `DuplicateNumber` if the
    /// (company, kind, number) tuple already exists
    InsertDocument(Document),
    /// Replace a document; `document.version` is the version that was
    /// read, and the store rejects the write if it has moved on
    UpdateDocument(Document),
    /// Remove a document and its items; guarded by the read version
    DeleteDocument {
        kind: DocumentKind,
        id: DocumentId,
        version: u64,
    },
    InsertPayment(Payment),
    DeletePayment { id: PaymentId },
    InsertJournalEntry(JournalEntry),
}

/// The atomic unit of persistence: writes plus their balance effects
///
/// Either every write and effect becomes visible, or none do.
#[derive(Debug, Clone)]
pub struct CommitSet {
    pub company_id: CompanyId,
    pub writes: Vec<Write>,
    pub effects: Vec<BalanceEffect>,
}

impl CommitSet {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            writes: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn write(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn effect(mut self, effect: BalanceEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Adds a party balance effect, skipping zero deltas
    pub fn party_effect(self, id: PartyId, delta: Money) -> Self {
        if delta.is_zero() {
            return self;
        }
        self.effect(BalanceEffect::Party { id, delta })
    }

    /// Adds an account balance effect, skipping zero deltas
    pub fn account_effect(self, id: AccountId, delta: Money) -> Self {
        if delta.is_zero() {
            return self;
        }
        self.effect(BalanceEffect::Account { id, delta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_effects_are_dropped() {
        let commit = CommitSet::new(CompanyId::new())
            .party_effect(PartyId::new(), Money::zero(Currency::USD))
            .account_effect(AccountId::new(), Money::zero(Currency::USD));

        assert!(commit.effects.is_empty());
    }

    #[test]
    fn test_effects_accumulate() {
        let party = PartyId::new();
        let commit = CommitSet::new(CompanyId::new())
            .party_effect(party, Money::new(dec!(220), Currency::USD))
            .account_effect(AccountId::new(), Money::new(dec!(-50), Currency::USD));

        assert_eq!(commit.effects.len(), 2);
        assert!(matches!(
            &commit.effects[0],
            BalanceEffect::Party { id, delta } if *id == party && delta.amount() == dec!(220)
        ));
    }
}
