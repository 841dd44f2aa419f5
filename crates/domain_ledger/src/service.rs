//! Ledger service: the engine's operation surface
//!
//! Each operation loads a snapshot of the aggregates it touches, computes
//! the outcome purely, and submits one [`CommitSet`] to the store. When a
//! version-guarded write loses a race the operation re-reads and retries
//! up to [`MAX_VERSION_RETRIES`] times; number collisions follow the same
//! shape through [`MAX_NUMBER_ATTEMPTS`].

use chrono::{Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use core_kernel::parse::{flexible_decimal, flexible_decimal_opt};
use core_kernel::{CompanyId, Currency, DocumentId, JournalEntryId, Money, PartyId, PaymentId};

use crate::document::{Document, DocumentStatus};
use crate::effects::{CommitSet, Write};
use crate::error::LedgerError;
use crate::journal::{Account, JournalEntry, JournalEntryInput, JournalStatus};
use crate::numbering::{format_number, DocumentKind, MAX_NUMBER_ATTEMPTS};
use crate::party::{Party, PartyKind};
use crate::payment::{DocumentRef, Payment, PaymentMethod};
use crate::store::{LedgerStore, StoreError};
use crate::totals::{compute_totals, inputs_from_items, LineItemInput};

/// How many times a version-guarded operation re-reads and retries after
/// losing a write race before surfacing the conflict.
pub const MAX_VERSION_RETRIES: u32 = 5;

/// Payment terms applied when a document carries no explicit due date
const DEFAULT_TERMS_DAYS: u64 = 30;

/// Fields accepted when creating an invoice, bill, or expense
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentInput {
    /// Counterparty; required for invoices (customer) and bills
    /// (supplier), optional supplier for expenses
    pub party_id: Option<PartyId>,
    pub date: NaiveDate,
    /// Defaults to `date` plus thirty days
    pub due_date: Option<NaiveDate>,
    pub currency: Currency,
    pub items: Vec<LineItemInput>,
    /// Document-level discount amount
    #[serde(default, deserialize_with = "flexible_decimal_opt")]
    pub discount: Option<Decimal>,
    /// Explicit number; skips the sequence and fails fast on collision
    pub number: Option<String>,
    /// Issue immediately; documents stay `Draft` by default
    #[serde(default)]
    pub issue: bool,
    pub notes: Option<String>,
}

impl CreateDocumentInput {
    pub fn new(date: NaiveDate, currency: Currency, items: Vec<LineItemInput>) -> Self {
        Self {
            party_id: None,
            date,
            due_date: None,
            currency,
            items,
            discount: None,
            number: None,
            issue: false,
            notes: None,
        }
    }

    pub fn with_party(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn issued(mut self) -> Self {
        self.issue = true;
        self
    }
}

/// Partial update for a document; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentInput {
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Replaces the whole item set and recomputes every derived total
    pub items: Option<Vec<LineItemInput>>,
    #[serde(default, deserialize_with = "flexible_decimal_opt")]
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
}

impl UpdateDocumentInput {
    pub fn items(items: Vec<LineItemInput>) -> Self {
        Self {
            items: Some(items),
            ..Self::default()
        }
    }

    pub fn discount(discount: Decimal) -> Self {
        Self {
            discount: Some(discount),
            ..Self::default()
        }
    }
}

/// Fields accepted when applying a payment
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    #[serde(deserialize_with = "flexible_decimal")]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

impl PaymentInput {
    pub fn new(amount: Decimal, date: NaiveDate, method: PaymentMethod) -> Self {
        Self {
            amount,
            date,
            method,
            reference: None,
        }
    }
}

/// The ledger engine's operation surface over a storage adapter
pub struct LedgerService<S> {
    store: S,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ----- documents -----

    pub async fn create_invoice(
        &self,
        company: CompanyId,
        input: CreateDocumentInput,
    ) -> Result<Document, LedgerError> {
        self.create_document(company, DocumentKind::Invoice, input)
            .await
    }

    pub async fn create_bill(
        &self,
        company: CompanyId,
        input: CreateDocumentInput,
    ) -> Result<Document, LedgerError> {
        self.create_document(company, DocumentKind::Bill, input)
            .await
    }

    pub async fn create_expense(
        &self,
        company: CompanyId,
        input: CreateDocumentInput,
    ) -> Result<Document, LedgerError> {
        self.create_document(company, DocumentKind::Expense, input)
            .await
    }

    pub async fn update_invoice(
        &self,
        company: CompanyId,
        id: DocumentId,
        input: UpdateDocumentInput,
    ) -> Result<Document, LedgerError> {
        self.update_document(company, DocumentKind::Invoice, id, input)
            .await
    }

    pub async fn update_bill(
        &self,
        company: CompanyId,
        id: DocumentId,
        input: UpdateDocumentInput,
    ) -> Result<Document, LedgerError> {
        self.update_document(company, DocumentKind::Bill, id, input)
            .await
    }

    pub async fn update_expense(
        &self,
        company: CompanyId,
        id: DocumentId,
        input: UpdateDocumentInput,
    ) -> Result<Document, LedgerError> {
        self.update_document(company, DocumentKind::Expense, id, input)
            .await
    }

    pub async fn delete_invoice(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<(), LedgerError> {
        self.delete_document(company, DocumentKind::Invoice, id)
            .await
    }

    pub async fn delete_bill(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<(), LedgerError> {
        self.delete_document(company, DocumentKind::Bill, id).await
    }

    pub async fn delete_expense(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<(), LedgerError> {
        self.delete_document(company, DocumentKind::Expense, id)
            .await
    }

    /// Loads a document and derives its effective (possibly overdue) status
    pub async fn get_document(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<Document, LedgerError> {
        let mut document = self.store.get_document(company, id).await?;
        document.status = document.effective_status(Utc::now().date_naive());
        Ok(document)
    }

    async fn create_document(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        input: CreateDocumentInput,
    ) -> Result<Document, LedgerError> {
        let party = self.resolve_counterparty(company, kind, &input).await?;
        // Expenses record their party without moving its balance
        let effect_party = kind
            .counterparty_kind()
            .and(party.as_ref().map(|p| p.id));

        let discount = input.discount.unwrap_or_default();
        let (items, totals) = compute_totals(&input.items, discount, input.currency)?;

        let due_date = input.due_date.unwrap_or_else(|| {
            input
                .date
                .checked_add_days(Days::new(DEFAULT_TERMS_DAYS))
                .unwrap_or(input.date)
        });
        let zero = Money::zero(input.currency);
        let status = DocumentStatus::derive(zero, totals.total, !input.issue);
        let now = Utc::now();

        let mut document = Document {
            id: DocumentId::new_v7(),
            company_id: company,
            kind,
            number: String::new(),
            party_id: party.as_ref().map(|p| p.id),
            date: input.date,
            due_date,
            currency: input.currency,
            items,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            discount_amount: totals.discount_amount,
            total_amount: totals.total,
            paid_amount: zero,
            balance_amount: totals.total,
            status,
            notes: input.notes,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        if let Some(number) = input.number {
            // Explicit numbers skip the sequence and fail fast on collision
            if self
                .store
                .find_document_by_number(company, kind, &number)
                .await?
                .is_some()
            {
                return Err(LedgerError::DuplicateCode { number });
            }
            document.number = number;
            self.commit_new_document(company, document, effect_party).await
        } else {
            self.commit_numbered_document(company, kind, document, effect_party)
                .await
        }
    }

    /// Derives the next sequence number from the stored count and inserts,
    /// regenerating on collision. The count is racy under concurrent
    /// creation and lags behind the high-water mark after deletions, so
    /// each attempt probes one sequence further; the unique constraint
    /// plus this loop closes the race.
    async fn commit_numbered_document(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        mut document: Document,
        party_id: Option<PartyId>,
    ) -> Result<Document, LedgerError> {
        let year = document.date.year();

        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let count = self.store.count_documents(company, kind).await?;
            document.number = format_number(kind, year, count + u64::from(attempt));

            match self
                .commit_new_document(company, document.clone(), party_id)
                .await
            {
                Err(LedgerError::DuplicateCode { number }) if attempt < MAX_NUMBER_ATTEMPTS => {
                    warn!(
                        kind = %kind,
                        number = %number,
                        attempt,
                        "document number collision, regenerating"
                    );
                }
                other => return other,
            }
        }

        Err(LedgerError::DuplicateCode {
            number: document.number,
        })
    }

    async fn commit_new_document(
        &self,
        company: CompanyId,
        document: Document,
        party_id: Option<PartyId>,
    ) -> Result<Document, LedgerError> {
        let mut commit = CommitSet::new(company).write(Write::InsertDocument(document.clone()));
        if let Some(party_id) = party_id {
            commit = commit.party_effect(party_id, document.total_amount);
        }
        self.store.commit(commit).await?;

        info!(
            kind = %document.kind,
            number = %document.number,
            total = %document.total_amount,
            "document created"
        );
        Ok(document)
    }

    async fn update_document(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        id: DocumentId,
        input: UpdateDocumentInput,
    ) -> Result<Document, LedgerError> {
        for attempt in 1..=MAX_VERSION_RETRIES {
            let stored = self.load_document(company, kind, id).await?;
            if stored.is_settled() {
                return Err(LedgerError::ImmutableState(format!(
                    "{} {} is fully paid",
                    kind, stored.number
                )));
            }

            let mut document = stored.clone();
            let old_total = document.total_amount;

            if let Some(date) = input.date {
                document.date = date;
            }
            if let Some(due_date) = input.due_date {
                document.due_date = due_date;
            }
            if let Some(notes) = input.notes.clone() {
                document.notes = Some(notes);
            }

            let discount = input
                .discount
                .unwrap_or_else(|| document.discount_amount.amount());
            let recompute_inputs = match &input.items {
                Some(items) => Some(items.clone()),
                None if input.discount.is_some() => Some(inputs_from_items(&document.items)),
                None => None,
            };
            if let Some(inputs) = recompute_inputs {
                let (items, totals) = compute_totals(&inputs, discount, document.currency)?;
                if totals.total < document.paid_amount {
                    return Err(LedgerError::Validation(format!(
                        "new total {} is below the amount already paid {}",
                        totals.total, document.paid_amount
                    )));
                }
                document.items = items;
                document.subtotal = totals.subtotal;
                document.tax_amount = totals.tax_amount;
                document.discount_amount = totals.discount_amount;
                document.total_amount = totals.total;
                document.balance_amount = totals.total.checked_sub(&document.paid_amount)?;
                document.status = DocumentStatus::derive(
                    document.paid_amount,
                    totals.total,
                    stored.status == DocumentStatus::Draft,
                );
            }
            document.updated_at = Utc::now();

            let delta = document.total_amount.checked_sub(&old_total)?;
            let mut commit = CommitSet::new(company).write(Write::UpdateDocument(document.clone()));
            if let Some(party_id) = self.counterparty_for(kind, &document) {
                commit = commit.party_effect(party_id, delta);
            }

            match self.store.commit(commit).await {
                Ok(()) => {
                    info!(
                        kind = %kind,
                        number = %document.number,
                        total = %document.total_amount,
                        "document updated"
                    );
                    document.version += 1;
                    return Ok(document);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_VERSION_RETRIES => {
                    warn!(kind = %kind, id = %id, attempt, "write conflict, retrying update");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(StoreError::version_conflict(kind.as_str(), id).into())
    }

    async fn delete_document(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<(), LedgerError> {
        for attempt in 1..=MAX_VERSION_RETRIES {
            let document = self.load_document(company, kind, id).await?;
            if document.has_payments() {
                return Err(LedgerError::HasPayments {
                    document: document.number,
                });
            }

            let mut commit = CommitSet::new(company).write(Write::DeleteDocument {
                kind,
                id,
                version: document.version,
            });
            if let Some(party_id) = self.counterparty_for(kind, &document) {
                commit = commit.party_effect(party_id, -document.balance_amount);
            }

            match self.store.commit(commit).await {
                Ok(()) => {
                    info!(kind = %kind, number = %document.number, "document deleted");
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_VERSION_RETRIES => {
                    warn!(kind = %kind, id = %id, attempt, "write conflict, retrying delete");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(StoreError::version_conflict(kind.as_str(), id).into())
    }

    // ----- payments -----

    /// Applies a payment to the invoice or bill named by `reference`.
    ///
    /// # Errors
    ///
    /// - `InvalidReference` unless exactly one document is referenced
    /// - `Validation` for non-positive amounts
    /// - `Overpayment` if the amount exceeds the outstanding balance
    pub async fn apply_payment(
        &self,
        company: CompanyId,
        reference: DocumentRef,
        input: PaymentInput,
    ) -> Result<Payment, LedgerError> {
        let (kind, id) = reference.resolve()?;
        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("payment amount must be positive"));
        }

        for attempt in 1..=MAX_VERSION_RETRIES {
            let mut document = self.load_document(company, kind, id).await?;
            let amount = Money::new(input.amount, document.currency);
            if amount > document.balance_amount {
                return Err(LedgerError::Overpayment {
                    amount: amount.amount(),
                    balance: document.balance_amount.amount(),
                });
            }

            document.paid_amount = document.paid_amount.checked_add(&amount)?;
            document.balance_amount = document.total_amount.checked_sub(&document.paid_amount)?;
            document.status =
                DocumentStatus::derive(document.paid_amount, document.total_amount, false);
            document.updated_at = Utc::now();

            let payment = Payment {
                id: PaymentId::new_v7(),
                company_id: company,
                document_id: id,
                document_kind: kind,
                amount,
                date: input.date,
                method: input.method,
                reference: input.reference.clone(),
                created_at: Utc::now(),
            };

            let mut commit = CommitSet::new(company)
                .write(Write::InsertPayment(payment.clone()))
                .write(Write::UpdateDocument(document.clone()));
            if let Some(party_id) = self.counterparty_for(kind, &document) {
                commit = commit.party_effect(party_id, -amount);
            }

            match self.store.commit(commit).await {
                Ok(()) => {
                    info!(
                        kind = %kind,
                        number = %document.number,
                        amount = %amount,
                        status = ?document.status,
                        "payment applied"
                    );
                    return Ok(payment);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_VERSION_RETRIES => {
                    warn!(kind = %kind, id = %id, attempt, "write conflict, retrying payment");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(StoreError::version_conflict(kind.as_str(), id).into())
    }

    /// Removes a payment, reversing its document and counterparty effects
    /// symmetrically to [`apply_payment`](Self::apply_payment).
    pub async fn delete_payment(
        &self,
        company: CompanyId,
        id: PaymentId,
    ) -> Result<(), LedgerError> {
        let payment = self.store.get_payment(company, id).await?;

        for attempt in 1..=MAX_VERSION_RETRIES {
            let mut document = self
                .load_document(company, payment.document_kind, payment.document_id)
                .await?;

            document.paid_amount = document.paid_amount.checked_sub(&payment.amount)?;
            document.balance_amount = document.total_amount.checked_sub(&document.paid_amount)?;
            document.status =
                DocumentStatus::derive(document.paid_amount, document.total_amount, false);
            document.updated_at = Utc::now();

            let mut commit = CommitSet::new(company)
                .write(Write::DeletePayment { id })
                .write(Write::UpdateDocument(document.clone()));
            if let Some(party_id) = self.counterparty_for(payment.document_kind, &document) {
                commit = commit.party_effect(party_id, payment.amount);
            }

            match self.store.commit(commit).await {
                Ok(()) => {
                    info!(
                        number = %document.number,
                        amount = %payment.amount,
                        "payment deleted"
                    );
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_VERSION_RETRIES => {
                    warn!(payment = %id, attempt, "write conflict, retrying payment delete");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(StoreError::version_conflict("payment", id).into())
    }

    // ----- journal -----

    /// Validates and posts a journal entry, applying each line's signed
    /// effect to its account balance in the same commit.
    pub async fn post_journal_entry(
        &self,
        company: CompanyId,
        input: JournalEntryInput,
    ) -> Result<JournalEntry, LedgerError> {
        let mut accounts: Vec<Account> = Vec::new();
        for line in &input.lines {
            if accounts.iter().any(|a| a.id == line.account_id) {
                continue;
            }
            accounts.push(self.store.get_account(company, line.account_id).await?);
        }

        // The entry posts in the currency of its accounts; mixed-currency
        // lines are rejected before anything is written
        let currency = accounts
            .first()
            .map(|account| account.balance.currency())
            .ok_or_else(|| LedgerError::validation("journal entry has no lines"))?;
        if let Some(mismatch) = accounts.iter().find(|a| a.balance.currency() != currency) {
            return Err(LedgerError::Validation(format!(
                "account {} is in {}, entry currency is {}",
                mismatch.code,
                mismatch.balance.currency(),
                currency
            )));
        }

        let (lines, total) = crate::journal::validate_lines(&input.lines, currency)?;

        let entry = JournalEntry {
            id: JournalEntryId::new_v7(),
            company_id: company,
            entry_date: input.entry_date,
            description: input.description,
            status: JournalStatus::Posted,
            total_debit: total,
            total_credit: total,
            lines,
            created_at: Utc::now(),
        };

        let mut commit = CommitSet::new(company).write(Write::InsertJournalEntry(entry.clone()));
        for line in &entry.lines {
            let account = accounts
                .iter()
                .find(|a| a.id == line.account_id)
                .ok_or_else(|| LedgerError::not_found("account", line.account_id))?;
            commit = commit.account_effect(line.account_id, line.signed_effect(account.account_type));
        }
        self.store.commit(commit).await?;

        info!(
            entry = %entry.id,
            total = %entry.total_debit,
            lines = entry.lines.len(),
            "journal entry posted"
        );
        Ok(entry)
    }

    // ----- helpers -----

    async fn resolve_counterparty(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        input: &CreateDocumentInput,
    ) -> Result<Option<Party>, LedgerError> {
        match kind.counterparty_kind() {
            Some(required) => {
                let party_id = input.party_id.ok_or_else(|| {
                    LedgerError::Validation(format!("{kind} requires a counterparty"))
                })?;
                let party = self.store.get_party(company, party_id).await?;
                if party.kind != required {
                    return Err(LedgerError::Validation(format!(
                        "party {} is a {}, {kind} requires a {}",
                        party.code,
                        party.kind.as_str(),
                        required.as_str()
                    )));
                }
                Ok(Some(party))
            }
            // Expenses may name a supplier for record-keeping but never
            // propagate to its balance
            None => match input.party_id {
                Some(party_id) => {
                    let party = self.store.get_party(company, party_id).await?;
                    if party.kind != PartyKind::Supplier {
                        return Err(LedgerError::Validation(format!(
                            "party {} is a {}, {kind} takes a supplier",
                            party.code,
                            party.kind.as_str()
                        )));
                    }
                    Ok(Some(party))
                }
                None => Ok(None),
            },
        }
    }

    /// Loads a document and checks it is of the expected kind
    async fn load_document(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Document, LedgerError> {
        let document = self.store.get_document(company, id).await?;
        if document.kind != kind {
            return Err(LedgerError::not_found(kind.as_str(), id));
        }
        Ok(document)
    }

    fn counterparty_for(&self, kind: DocumentKind, document: &Document) -> Option<PartyId> {
        kind.counterparty_kind().and(document.party_id)
    }
}
