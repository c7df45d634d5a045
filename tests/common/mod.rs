#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use ticket_recon::models::{Invoice, Quote, Ticket};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn ticket(id: i64, reference: &str, amount: &str, day: &str, contact: &str) -> Ticket {
    Ticket {
        id,
        external_id: format!("EXT-{}", id),
        reference: Some(reference.to_string()),
        description: None,
        amount: Some(BigDecimal::from_str(amount).unwrap()),
        ticket_date: Some(date(day)),
        contact_name: Some(contact.to_string()),
    }
}

pub fn quote(id: i64, number: &str, amount: &str, day: &str, contact: &str) -> Quote {
    Quote {
        id,
        quote_number: number.to_string(),
        contact_name: Some(contact.to_string()),
        amount: Some(BigDecimal::from_str(amount).unwrap()),
        issue_date: Some(date(day)),
    }
}

pub fn invoice(id: i64, number: &str, amount: &str, day: &str, contact: &str) -> Invoice {
    Invoice {
        id,
        invoice_number: number.to_string(),
        contact_name: Some(contact.to_string()),
        amount: Some(BigDecimal::from_str(amount).unwrap()),
        issue_date: Some(date(day)),
    }
}

/// 一组明确可对上的记录 + 一组互不相似的记录
pub fn sample_records() -> (Vec<Ticket>, Vec<Quote>, Vec<Invoice>) {
    let tickets = vec![
        ticket(1, "INV-1001", "5000", "2024-01-10", "Ahmed Al-Mansouri"),
        ticket(2, "TK-4410", "820.50", "2024-02-01", "Fatima Al Zaabi"),
    ];
    let quotes = vec![
        quote(10, "Q-1001", "5000", "2024-01-09", "Ahmed Al Mansouri"),
        quote(11, "Q-7781", "15000", "2024-06-20", "Fatima Noor"),
    ];
    let invoices = vec![
        invoice(20, "INV-1001", "5000", "2024-01-12", "Ahmed Al Mansouri"),
        invoice(21, "INV-9050", "99", "2024-09-30", "Fatima Haddad"),
    ];
    (tickets, quotes, invoices)
}

/// 没有近似重复的记录
pub fn dissimilar_records() -> (Vec<Ticket>, Vec<Quote>, Vec<Invoice>) {
    let tickets = vec![ticket(1, "TK-1001", "5000", "2024-01-10", "Ahmed Al Mansouri")];
    let quotes = vec![quote(10, "Q-2002", "7300", "2024-02-20", "Ahmed Khan")];
    let invoices = vec![invoice(20, "INV-3003", "120", "2024-05-01", "Ahmed Saleh")];
    (tickets, quotes, invoices)
}
