//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for common ledger entities. Fixtures are
//! consistent and predictable so unit tests can assert exact values.

use chrono::NaiveDate;
use once_cell::sync::Lazy;

use core_kernel::{CompanyId, Currency, Money};
use domain_ledger::journal::{Account, AccountType};
use domain_ledger::party::{Party, PartyKind};
use domain_ledger::product::Product;
use rust_decimal_macros::dec;

/// A fixed company id shared across a test's fixtures
pub static TEST_COMPANY: Lazy<CompanyId> = Lazy::new(CompanyId::new);

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    pub fn usd_220() -> Money {
        Money::new(dec!(220.00), Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }
}

/// Fixture for date test data
pub struct DateFixtures;

impl DateFixtures {
    /// Standard document date (Mar 15, 2024)
    pub fn document_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    /// Due date thirty days after [`document_date`](Self::document_date)
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 14).unwrap()
    }

    /// A date past the standard due date, for overdue derivation tests
    pub fn after_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }
}

/// Fixture for counterparties
pub struct PartyFixtures;

impl PartyFixtures {
    pub fn customer(company: CompanyId) -> Party {
        Party::new(company, PartyKind::Customer, "CUST-001", "Acme Corp", Currency::USD)
    }

    pub fn supplier(company: CompanyId) -> Party {
        Party::new(
            company,
            PartyKind::Supplier,
            "SUPP-001",
            "Global Parts Ltd",
            Currency::USD,
        )
    }
}

/// Fixture for catalog products
pub struct ProductFixtures;

impl ProductFixtures {
    pub fn widget(company: CompanyId) -> Product {
        Product::new(
            company,
            "WID-001",
            "Widget",
            Money::new(dec!(100.00), Currency::USD),
            Money::new(dec!(60.00), Currency::USD),
        )
    }
}

/// A minimal chart of accounts for journal tests
pub struct ChartFixtures;

impl ChartFixtures {
    pub fn cash(company: CompanyId) -> Account {
        Account::new(company, "1000", "Cash", AccountType::Asset, Currency::USD)
    }

    pub fn accounts_receivable(company: CompanyId) -> Account {
        Account::new(
            company,
            "1100",
            "Accounts Receivable",
            AccountType::Asset,
            Currency::USD,
        )
    }

    pub fn accounts_payable(company: CompanyId) -> Account {
        Account::new(
            company,
            "2000",
            "Accounts Payable",
            AccountType::Liability,
            Currency::USD,
        )
    }

    pub fn equity(company: CompanyId) -> Account {
        Account::new(company, "3000", "Owner Equity", AccountType::Equity, Currency::USD)
    }

    pub fn revenue(company: CompanyId) -> Account {
        Account::new(company, "4000", "Sales Revenue", AccountType::Revenue, Currency::USD)
    }

    pub fn expenses(company: CompanyId) -> Account {
        Account::new(
            company,
            "5000",
            "Operating Expenses",
            AccountType::Expense,
            Currency::USD,
        )
    }

    /// The whole standard chart, in code order
    pub fn all(company: CompanyId) -> Vec<Account> {
        vec![
            Self::cash(company),
            Self::accounts_receivable(company),
            Self::accounts_payable(company),
            Self::equity(company),
            Self::revenue(company),
            Self::expenses(company),
        ]
    }
}
