//! Double-entry journal entries and the chart of accounts
//!
//! Every posted entry must balance: the sum of line debits equals the sum
//! of line credits, exactly, with each line carrying exactly one positive
//! side. Posting applies each line's signed effect to its account's
//! running balance under the standard sign convention: debits increase
//! debit-normal accounts (assets, expenses) and decrease the rest.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::parse::flexible_decimal_opt;
use core_kernel::{AccountId, CompanyId, Currency, JournalEntryId, Money};

use crate::error::LedgerError;

/// Account types in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// A chart-of-accounts entry with a running balance
///
/// Journal posting is the only mutator of account balances in the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub company_id: CompanyId,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new_v7(),
            company_id,
            code: code.into(),
            name: name.into(),
            account_type,
            balance: Money::zero(currency),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Journal entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Draft,
    Posted,
}

/// A validated journal line, one positive side only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLine {
    pub id: Uuid,
    pub account_id: AccountId,
    pub debit: Money,
    pub credit: Money,
    pub description: Option<String>,
}

impl JournalLine {
    /// Returns the signed balance change this line applies to an account
    /// of the given type.
    pub fn signed_effect(&self, account_type: AccountType) -> Money {
        let net = self.debit - self.credit;
        if account_type.is_debit_normal() {
            net
        } else {
            -net
        }
    }
}

/// A posted journal entry batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub company_id: CompanyId,
    pub entry_date: NaiveDate,
    pub description: String,
    pub status: JournalStatus,
    pub total_debit: Money,
    pub total_credit: Money,
    pub lines: Vec<JournalLine>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied journal line fields
#[derive(Debug, Clone, Deserialize)]
pub struct JournalLineInput {
    pub account_id: AccountId,
    #[serde(default, deserialize_with = "flexible_decimal_opt")]
    pub debit: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_decimal_opt")]
    pub credit: Option<Decimal>,
    pub description: Option<String>,
}

impl JournalLineInput {
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Some(amount),
            credit: None,
            description: None,
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: None,
            credit: Some(amount),
            description: None,
        }
    }
}

/// Caller-supplied journal entry batch
#[derive(Debug, Clone, Deserialize)]
pub struct JournalEntryInput {
    pub entry_date: NaiveDate,
    pub description: String,
    pub lines: Vec<JournalLineInput>,
}

/// Validates journal lines and computes the balanced total.
///
/// # Errors
///
/// - `Validation` if a line has both sides, neither side, or a
///   non-positive amount
/// - `UnbalancedEntry` if debits and credits differ
pub fn validate_lines(
    inputs: &[JournalLineInput],
    currency: Currency,
) -> Result<(Vec<JournalLine>, Money), LedgerError> {
    if inputs.is_empty() {
        return Err(LedgerError::validation("journal entry has no lines"));
    }

    let mut lines = Vec::with_capacity(inputs.len());
    let mut total_debit = Money::zero(currency);
    let mut total_credit = Money::zero(currency);

    for (index, input) in inputs.iter().enumerate() {
        let debit = input.debit.unwrap_or_default();
        let credit = input.credit.unwrap_or_default();

        let debit_set = !debit.is_zero();
        let credit_set = !credit.is_zero();
        if debit_set == credit_set {
            return Err(LedgerError::Validation(format!(
                "line {index}: exactly one of debit or credit must be non-zero"
            )));
        }
        if debit.is_sign_negative() || credit.is_sign_negative() {
            return Err(LedgerError::Validation(format!(
                "line {index}: amounts must be positive"
            )));
        }

        let debit = Money::new(debit, currency);
        let credit = Money::new(credit, currency);
        total_debit = total_debit.checked_add(&debit)?;
        total_credit = total_credit.checked_add(&credit)?;

        lines.push(JournalLine {
            id: Uuid::new_v4(),
            account_id: input.account_id,
            debit,
            credit,
            description: input.description.clone(),
        });
    }

    if total_debit != total_credit {
        return Err(LedgerError::UnbalancedEntry {
            debits: total_debit.amount(),
            credits: total_credit.amount(),
        });
    }

    Ok((lines, total_debit))
}
