//! Loose-input parsing scenarios
//!
//! Callers deliver monetary values as decimal strings or bare numbers and
//! dates as ISO strings; these tests drive the calculator and journal
//! validator straight from JSON payloads the way the HTTP layer would.

use rust_decimal_macros::dec;

use core_kernel::{AccountId, Currency};
use domain_ledger::journal::{validate_lines, JournalEntryInput};
use domain_ledger::payment::DocumentRef;
use domain_ledger::service::{CreateDocumentInput, PaymentInput};
use domain_ledger::totals::{compute_totals, LineItemInput};
use domain_ledger::LedgerError;

#[test]
fn test_items_parse_from_mixed_number_forms() {
    let json = r#"[
        {"description": "Widget", "quantity": 2, "unit_price": "100.00", "tax_rate": 10},
        {"description": "Service", "quantity": "1", "unit_price": 49.5, "discount": "4.50"}
    ]"#;

    let items: Vec<LineItemInput> = serde_json::from_str(json).unwrap();
    let (lines, totals) = compute_totals(&items, dec!(0), Currency::USD).unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(totals.subtotal.amount(), dec!(249.50));
    assert_eq!(totals.tax_amount.amount(), dec!(20));
    assert_eq!(lines[1].total.amount(), dec!(45));
}

#[test]
fn test_create_input_parses_iso_dates_and_defaults() {
    let json = r#"{
        "date": "2024-03-15",
        "currency": "USD",
        "items": [{"description": "Widget", "quantity": 1, "unit_price": "10"}]
    }"#;

    let input: CreateDocumentInput = serde_json::from_str(json).unwrap();
    assert!(input.due_date.is_none());
    assert!(!input.issue);
    assert!(input.party_id.is_none());
}

#[test]
fn test_payment_input_amount_as_string() {
    let json = r#"{"amount": "150.25", "date": "2024-04-01", "method": "bank_transfer"}"#;

    let input: PaymentInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.amount, dec!(150.25));
}

#[test]
fn test_journal_entry_parses_and_validates() {
    // Ids cross the wire as bare UUIDs
    let a = uuid::Uuid::new_v4();
    let b = uuid::Uuid::new_v4();
    let json = format!(
        r#"{{
            "entry_date": "2024-05-01",
            "description": "opening balance",
            "lines": [
                {{"account_id": "{a}", "debit": "500.00"}},
                {{"account_id": "{b}", "credit": 500}}
            ]
        }}"#
    );

    let input: JournalEntryInput = serde_json::from_str(&json).unwrap();
    let (lines, total) = validate_lines(&input.lines, Currency::USD).unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].account_id, AccountId::from_uuid(a));
    assert_eq!(total.amount(), dec!(500));
}

#[test]
fn test_unbalanced_json_entry_rejected() {
    let a = uuid::Uuid::new_v4();
    let b = uuid::Uuid::new_v4();
    let json = format!(
        r#"{{
            "entry_date": "2024-05-01",
            "description": "off by a cent",
            "lines": [
                {{"account_id": "{a}", "debit": "100.00"}},
                {{"account_id": "{b}", "credit": "99.99"}}
            ]
        }}"#
    );

    let input: JournalEntryInput = serde_json::from_str(&json).unwrap();
    let result = validate_lines(&input.lines, Currency::USD);

    assert!(matches!(result, Err(LedgerError::UnbalancedEntry { .. })));
}

#[test]
fn test_document_ref_from_json() {
    let id = uuid::Uuid::new_v4();
    let json = format!(r#"{{"invoice_id": "{id}"}}"#);

    let reference: DocumentRef = serde_json::from_str(&json).unwrap();
    let (kind, _) = reference.resolve().unwrap();
    assert_eq!(kind, domain_ledger::DocumentKind::Invoice);
}
