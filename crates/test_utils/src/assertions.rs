//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful error
//! messages than standard assertions.

use core_kernel::Money;
use domain_ledger::{Document, DocumentStatus};

/// Asserts that two Money values are exactly equal, reporting both
/// amount and currency on failure.
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Money amounts differ: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {money}");
}

/// Asserts a document's derived figures are internally consistent:
/// total = subtotal + tax − discount, and balance = total − paid.
pub fn assert_document_consistent(document: &Document) {
    assert_eq!(
        document.total_amount.amount(),
        document.subtotal.amount() + document.tax_amount.amount()
            - document.discount_amount.amount(),
        "total does not equal subtotal + tax - discount for {}",
        document.number
    );
    assert_eq!(
        document.balance_amount.amount(),
        document.total_amount.amount() - document.paid_amount.amount(),
        "balance does not equal total - paid for {}",
        document.number
    );
    match document.status {
        DocumentStatus::Paid => assert!(document.balance_amount.is_zero()),
        DocumentStatus::PartiallyPaid => {
            assert!(document.paid_amount.is_positive());
            assert!(document.balance_amount.is_positive());
        }
        DocumentStatus::Draft | DocumentStatus::Issued => {
            assert!(document.paid_amount.is_zero());
        }
        // Derived at read time; nothing structural to check
        DocumentStatus::Overdue => {}
    }
}
