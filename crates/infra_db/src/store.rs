//! PostgreSQL implementation of the ledger storage port
//!
//! Line items and journal lines are stored as JSONB alongside their
//! aggregate row; they are owned exclusively by it and always replaced
//! wholesale, so there is nothing to join. Balance effects are applied as
//! SQL increments inside the commit transaction; currency consistency is
//! enforced by the engine before the commit reaches this layer.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{
    AccountId, CompanyId, Currency, DocumentId, JournalEntryId, Money, PartyId, PaymentId,
    ProductId,
};
use domain_ledger::effects::{BalanceEffect, CommitSet, Write};
use domain_ledger::journal::{Account, JournalEntry, JournalLine};
use domain_ledger::numbering::DocumentKind;
use domain_ledger::party::Party;
use domain_ledger::payment::Payment;
use domain_ledger::product::Product;
use domain_ledger::store::{LedgerStore, StoreError};
use domain_ledger::{Document, LineItem};

use crate::error::{is_unique_violation, map_sqlx};

/// [`LedgerStore`] backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Enums cross the SQL boundary as their serde string form, so the text
// columns stay in lockstep with the wire format.

fn to_token<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(token)) => Ok(token),
        Ok(other) => Err(StoreError::Backend(format!(
            "expected string-serializable value, got {other}"
        ))),
        Err(e) => Err(StoreError::Backend(e.to_string())),
    }
}

fn from_token<T: DeserializeOwned>(token: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(token.to_string()))
        .map_err(|e| StoreError::Backend(format!("bad enum token '{token}': {e}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Backend(e.to_string()))
}

#[derive(FromRow)]
struct PartyRow {
    id: Uuid,
    company_id: Uuid,
    kind: String,
    code: String,
    name: String,
    currency: String,
    credit_limit: Option<Decimal>,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PartyRow> for Party {
    type Error = StoreError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        let currency: Currency = from_token(&row.currency)?;
        Ok(Party {
            id: PartyId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            kind: from_token(&row.kind)?,
            code: row.code,
            name: row.name,
            credit_limit: row.credit_limit.map(|limit| Money::new(limit, currency)),
            balance: Money::new(row.balance, currency),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    company_id: Uuid,
    code: String,
    name: String,
    currency: String,
    selling_price: Decimal,
    purchase_price: Decimal,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency: Currency = from_token(&row.currency)?;
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            code: row.code,
            name: row.name,
            selling_price: Money::new(row.selling_price, currency),
            purchase_price: Money::new(row.purchase_price, currency),
        })
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    company_id: Uuid,
    kind: String,
    number: String,
    party_id: Option<Uuid>,
    date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    items: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    discount_amount: Decimal,
    total_amount: Decimal,
    paid_amount: Decimal,
    balance_amount: Decimal,
    status: String,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let currency: Currency = from_token(&row.currency)?;
        let items: Vec<LineItem> = from_json(&row.items)?;
        Ok(Document {
            id: DocumentId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            kind: from_token(&row.kind)?,
            number: row.number,
            party_id: row.party_id.map(PartyId::from_uuid),
            date: row.date,
            due_date: row.due_date,
            currency,
            items,
            subtotal: Money::new(row.subtotal, currency),
            tax_amount: Money::new(row.tax_amount, currency),
            discount_amount: Money::new(row.discount_amount, currency),
            total_amount: Money::new(row.total_amount, currency),
            paid_amount: Money::new(row.paid_amount, currency),
            balance_amount: Money::new(row.balance_amount, currency),
            status: from_token(&row.status)?,
            notes: row.notes,
            version: row.version as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    company_id: Uuid,
    document_id: Uuid,
    document_kind: String,
    amount: Decimal,
    currency: String,
    date: NaiveDate,
    method: String,
    reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency: Currency = from_token(&row.currency)?;
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            document_id: DocumentId::from_uuid(row.document_id),
            document_kind: from_token(&row.document_kind)?,
            amount: Money::new(row.amount, currency),
            date: row.date,
            method: from_token(&row.method)?,
            reference: row.reference,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    company_id: Uuid,
    code: String,
    name: String,
    account_type: String,
    currency: String,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let currency: Currency = from_token(&row.currency)?;
        Ok(Account {
            id: AccountId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            code: row.code,
            name: row.name,
            account_type: from_token(&row.account_type)?,
            balance: Money::new(row.balance, currency),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_DOCUMENT: &str = "SELECT id, company_id, kind, number, party_id, date, due_date, \
     currency, items::text AS items, subtotal, tax_amount, discount_amount, total_amount, \
     paid_amount, balance_amount, status, notes, version, created_at, updated_at \
     FROM documents";

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_party(&self, company: CompanyId, id: PartyId) -> Result<Party, StoreError> {
        let row: Option<PartyRow> = sqlx::query_as(
            "SELECT id, company_id, kind, code, name, currency, credit_limit, balance, \
             created_at, updated_at FROM parties WHERE company_id = $1 AND id = $2",
        )
        .bind(company.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or_else(|| StoreError::not_found("party", id))?.try_into()
    }

    async fn get_product(&self, company: CompanyId, id: ProductId) -> Result<Product, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, company_id, code, name, currency, selling_price, purchase_price \
             FROM products WHERE company_id = $1 AND id = $2",
        )
        .bind(company.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or_else(|| StoreError::not_found("product", id))?.try_into()
    }

    async fn get_document(
        &self,
        company: CompanyId,
        id: DocumentId,
    ) -> Result<Document, StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("{SELECT_DOCUMENT} WHERE company_id = $1 AND id = $2"))
                .bind(company.as_uuid())
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.ok_or_else(|| StoreError::not_found("document", id))?.try_into()
    }

    async fn find_document_by_number(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        number: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "{SELECT_DOCUMENT} WHERE company_id = $1 AND kind = $2 AND number = $3"
        ))
        .bind(company.as_uuid())
        .bind(to_token(&kind)?)
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(Document::try_from).transpose()
    }

    async fn count_documents(
        &self,
        company: CompanyId,
        kind: DocumentKind,
    ) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE company_id = $1 AND kind = $2")
                .bind(company.as_uuid())
                .bind(to_token(&kind)?)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(count as u64)
    }

    async fn get_payment(&self, company: CompanyId, id: PaymentId) -> Result<Payment, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, company_id, document_id, document_kind, amount, currency, date, \
             method, reference, created_at FROM payments WHERE company_id = $1 AND id = $2",
        )
        .bind(company.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or_else(|| StoreError::not_found("payment", id))?.try_into()
    }

    async fn get_account(&self, company: CompanyId, id: AccountId) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, company_id, code, name, account_type, currency, balance, \
             created_at, updated_at FROM accounts WHERE company_id = $1 AND id = $2",
        )
        .bind(company.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or_else(|| StoreError::not_found("account", id))?.try_into()
    }

    async fn upsert_party(&self, party: Party) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO parties (id, company_id, kind, code, name, currency, credit_limit, \
             balance, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET kind = $3, code = $4, name = $5, currency = $6, \
             credit_limit = $7, updated_at = $10",
        )
        .bind(party.id.as_uuid())
        .bind(party.company_id.as_uuid())
        .bind(to_token(&party.kind)?)
        .bind(&party.code)
        .bind(&party.name)
        .bind(to_token(&party.balance.currency())?)
        .bind(party.credit_limit.map(|limit| limit.amount()))
        .bind(party.balance.amount())
        .bind(party.created_at)
        .bind(party.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn upsert_account(&self, account: Account) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounts (id, company_id, code, name, account_type, currency, \
             balance, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET code = $3, name = $4, account_type = $5, \
             currency = $6, updated_at = $9",
        )
        .bind(account.id.as_uuid())
        .bind(account.company_id.as_uuid())
        .bind(&account.code)
        .bind(&account.name)
        .bind(to_token(&account.account_type)?)
        .bind(to_token(&account.balance.currency())?)
        .bind(account.balance.amount())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO products (id, company_id, code, name, currency, selling_price, \
             purchase_price) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET code = $3, name = $4, currency = $5, \
             selling_price = $6, purchase_price = $7",
        )
        .bind(product.id.as_uuid())
        .bind(product.company_id.as_uuid())
        .bind(&product.code)
        .bind(&product.name)
        .bind(to_token(&product.selling_price.currency())?)
        .bind(product.selling_price.amount())
        .bind(product.purchase_price.amount())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn commit(&self, commit: CommitSet) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let company = commit.company_id;

        for write in &commit.writes {
            match write {
                Write::InsertDocument(document) => insert_document(&mut tx, document).await?,
                Write::UpdateDocument(document) => update_document(&mut tx, document).await?,
                Write::DeleteDocument { id, version, .. } => {
                    delete_document(&mut tx, company, *id, *version).await?
                }
                Write::InsertPayment(payment) => insert_payment(&mut tx, payment).await?,
                Write::DeletePayment { id } => delete_payment(&mut tx, company, *id).await?,
                Write::InsertJournalEntry(entry) => insert_journal_entry(&mut tx, entry).await?,
            }
        }

        for effect in &commit.effects {
            apply_effect(&mut tx, company, effect).await?;
        }

        tx.commit().await.map_err(map_sqlx)
    }
}

async fn insert_document(
    tx: &mut Transaction<'_, Postgres>,
    document: &Document,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "INSERT INTO documents (id, company_id, kind, number, party_id, date, due_date, \
         currency, items, subtotal, tax_amount, discount_amount, total_amount, paid_amount, \
         balance_amount, status, notes, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::jsonb, $10, $11, $12, $13, $14, $15, \
         $16, $17, $18, $19, $20)",
    )
    .bind(document.id.as_uuid())
    .bind(document.company_id.as_uuid())
    .bind(to_token(&document.kind)?)
    .bind(&document.number)
    .bind(document.party_id.map(|id| *id.as_uuid()))
    .bind(document.date)
    .bind(document.due_date)
    .bind(to_token(&document.currency)?)
    .bind(to_json(&document.items)?)
    .bind(document.subtotal.amount())
    .bind(document.tax_amount.amount())
    .bind(document.discount_amount.amount())
    .bind(document.total_amount.amount())
    .bind(document.paid_amount.amount())
    .bind(document.balance_amount.amount())
    .bind(to_token(&document.status)?)
    .bind(&document.notes)
    .bind(document.version as i64)
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateNumber {
            number: document.number.clone(),
        }),
        Err(e) => Err(map_sqlx(e)),
    }
}

async fn update_document(
    tx: &mut Transaction<'_, Postgres>,
    document: &Document,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE documents SET party_id = $1, date = $2, due_date = $3, items = $4::jsonb, \
         subtotal = $5, tax_amount = $6, discount_amount = $7, total_amount = $8, \
         paid_amount = $9, balance_amount = $10, status = $11, notes = $12, \
         version = version + 1, updated_at = $13 \
         WHERE company_id = $14 AND id = $15 AND version = $16",
    )
    .bind(document.party_id.map(|id| *id.as_uuid()))
    .bind(document.date)
    .bind(document.due_date)
    .bind(to_json(&document.items)?)
    .bind(document.subtotal.amount())
    .bind(document.tax_amount.amount())
    .bind(document.discount_amount.amount())
    .bind(document.total_amount.amount())
    .bind(document.paid_amount.amount())
    .bind(document.balance_amount.amount())
    .bind(to_token(&document.status)?)
    .bind(&document.notes)
    .bind(document.updated_at)
    .bind(document.company_id.as_uuid())
    .bind(document.id.as_uuid())
    .bind(document.version as i64)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::version_conflict("document", document.id));
    }
    Ok(())
}

async fn delete_document(
    tx: &mut Transaction<'_, Postgres>,
    company: CompanyId,
    id: DocumentId,
    version: u64,
) -> Result<(), StoreError> {
    let result =
        sqlx::query("DELETE FROM documents WHERE company_id = $1 AND id = $2 AND version = $3")
            .bind(company.as_uuid())
            .bind(id.as_uuid())
            .bind(version as i64)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::version_conflict("document", id));
    }
    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO payments (id, company_id, document_id, document_kind, amount, currency, \
         date, method, reference, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(payment.id.as_uuid())
    .bind(payment.company_id.as_uuid())
    .bind(payment.document_id.as_uuid())
    .bind(to_token(&payment.document_kind)?)
    .bind(payment.amount.amount())
    .bind(to_token(&payment.amount.currency())?)
    .bind(payment.date)
    .bind(to_token(&payment.method)?)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

async fn delete_payment(
    tx: &mut Transaction<'_, Postgres>,
    company: CompanyId,
    id: PaymentId,
) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM payments WHERE company_id = $1 AND id = $2")
        .bind(company.as_uuid())
        .bind(id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("payment", id));
    }
    Ok(())
}

async fn insert_journal_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &JournalEntry,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO journal_entries (id, company_id, entry_date, description, status, \
         total_debit, total_credit, currency, lines, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::jsonb, $10)",
    )
    .bind(entry.id.as_uuid())
    .bind(entry.company_id.as_uuid())
    .bind(entry.entry_date)
    .bind(&entry.description)
    .bind(to_token(&entry.status)?)
    .bind(entry.total_debit.amount())
    .bind(entry.total_credit.amount())
    .bind(to_token(&entry.total_debit.currency())?)
    .bind(to_json(&entry.lines)?)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

async fn apply_effect(
    tx: &mut Transaction<'_, Postgres>,
    company: CompanyId,
    effect: &BalanceEffect,
) -> Result<(), StoreError> {
    let (query, id, delta) = match effect {
        BalanceEffect::Party { id, delta } => (
            "UPDATE parties SET balance = balance + $1, updated_at = now() \
             WHERE company_id = $2 AND id = $3",
            *id.as_uuid(),
            delta,
        ),
        BalanceEffect::Account { id, delta } => (
            "UPDATE accounts SET balance = balance + $1, updated_at = now() \
             WHERE company_id = $2 AND id = $3",
            *id.as_uuid(),
            delta,
        ),
    };

    let result = sqlx::query(query)
        .bind(delta.amount())
        .bind(company.as_uuid())
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        let entity = match effect {
            BalanceEffect::Party { .. } => "party",
            BalanceEffect::Account { .. } => "account",
        };
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}
