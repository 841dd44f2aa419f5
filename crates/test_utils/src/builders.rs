//! Test Data Builders
//!
//! Builder patterns for constructing test inputs with sensible defaults,
//! so tests specify only the fields they care about.

use chrono::NaiveDate;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Word;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{CompanyId, Currency, Money, PartyId};
use domain_ledger::party::{Party, PartyKind};
use domain_ledger::service::{CreateDocumentInput, PaymentInput};
use domain_ledger::journal::{JournalEntryInput, JournalLineInput};
use domain_ledger::payment::PaymentMethod;
use domain_ledger::totals::LineItemInput;
use core_kernel::AccountId;

use crate::fixtures::DateFixtures;

/// Builder for document creation inputs
pub struct DocumentInputBuilder {
    party_id: Option<PartyId>,
    date: NaiveDate,
    due_date: Option<NaiveDate>,
    currency: Currency,
    items: Vec<LineItemInput>,
    discount: Option<Decimal>,
    number: Option<String>,
    issue: bool,
}

impl Default for DocumentInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentInputBuilder {
    /// One item of 2 × 100.00 at 10% tax: totals 200 / 20 / 220
    pub fn new() -> Self {
        Self {
            party_id: None,
            date: DateFixtures::document_date(),
            due_date: None,
            currency: Currency::USD,
            items: vec![LineItemInput::new("Widget", dec!(2), dec!(100)).with_tax_rate(dec!(10))],
            discount: None,
            number: None,
            issue: false,
        }
    }

    pub fn with_party(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_items(mut self, items: Vec<LineItemInput>) -> Self {
        self.items = items;
        self
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn issued(mut self) -> Self {
        self.issue = true;
        self
    }

    pub fn build(self) -> CreateDocumentInput {
        let mut input = CreateDocumentInput::new(self.date, self.currency, self.items);
        input.party_id = self.party_id;
        input.due_date = self.due_date;
        input.discount = self.discount;
        input.number = self.number;
        input.issue = self.issue;
        input
    }
}

/// Builder for payment inputs
pub struct PaymentInputBuilder {
    amount: Decimal,
    date: NaiveDate,
    method: PaymentMethod,
    reference: Option<String>,
}

impl Default for PaymentInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentInputBuilder {
    pub fn new() -> Self {
        Self {
            amount: dec!(100),
            date: DateFixtures::document_date(),
            method: PaymentMethod::BankTransfer,
            reference: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn build(self) -> PaymentInput {
        let mut input = PaymentInput::new(self.amount, self.date, self.method);
        input.reference = self.reference;
        input
    }
}

/// Builder for counterparties with generated names
pub struct PartyBuilder {
    company: CompanyId,
    kind: PartyKind,
    code: String,
    name: String,
    currency: Currency,
}

impl PartyBuilder {
    pub fn customer(company: CompanyId) -> Self {
        Self {
            company,
            kind: PartyKind::Customer,
            code: format!("CUST-{:03}", (1..999).fake::<u16>()),
            name: CompanyName().fake(),
            currency: Currency::USD,
        }
    }

    pub fn supplier(company: CompanyId) -> Self {
        Self {
            company,
            kind: PartyKind::Supplier,
            code: format!("SUPP-{:03}", (1..999).fake::<u16>()),
            name: CompanyName().fake(),
            currency: Currency::USD,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn build(self) -> Party {
        Party::new(self.company, self.kind, self.code, self.name, self.currency)
    }
}

/// Builder for balanced journal entry inputs
pub struct JournalEntryBuilder {
    entry_date: NaiveDate,
    description: String,
    lines: Vec<JournalLineInput>,
}

impl JournalEntryBuilder {
    pub fn new() -> Self {
        Self {
            entry_date: DateFixtures::document_date(),
            description: Word().fake(),
            lines: Vec::new(),
        }
    }

    pub fn debit(mut self, account: AccountId, amount: Decimal) -> Self {
        self.lines.push(JournalLineInput::debit(account, amount));
        self
    }

    pub fn credit(mut self, account: AccountId, amount: Decimal) -> Self {
        self.lines.push(JournalLineInput::credit(account, amount));
        self
    }

    pub fn build(self) -> JournalEntryInput {
        JournalEntryInput {
            entry_date: self.entry_date,
            description: self.description,
            lines: self.lines,
        }
    }
}

impl Default for JournalEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-line item set totalling the given pre-tax amount
pub fn single_item(amount: Decimal) -> Vec<LineItemInput> {
    vec![LineItemInput::new("Service", dec!(1), amount)]
}

/// Money shorthand for USD assertions
pub fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}
