//! 工单 / 报价 / 发票 CSV 批量导入
//!
//! 每行先按字符串读取, 再逐字段解析并走与数据库行相同的 `TryFrom` 校验。
//! 校验失败的行不会中断导入, 而是以行号记录在 [`ImportReport::errors`] 中。

use crate::error::ReconError;
use crate::models::{Invoice, InvoiceRow, Quote, QuoteRow, Ticket, TicketRow};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::str::FromStr;

/// 行级错误
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

/// 导入结果
#[derive(Debug, Clone)]
pub struct ImportReport<T> {
    pub records: Vec<T>,
    pub errors: Vec<RowError>,
}

impl<T> ImportReport<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TicketCsv {
    id: String,
    external_id: Option<String>,
    reference: Option<String>,
    description: Option<String>,
    amount: Option<String>,
    date: Option<String>,
    contact_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentCsv {
    id: String,
    number: Option<String>,
    contact_name: Option<String>,
    amount: Option<String>,
    date: Option<String>,
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid id `{}`", raw))
}

/// 金额: 允许千分位逗号
fn parse_amount(raw: Option<String>) -> Result<Option<BigDecimal>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    BigDecimal::from_str(&cleaned)
        .map(Some)
        .map_err(|_| format!("invalid amount `{}`", raw))
}

/// 日期: YYYY-MM-DD 或 DD/MM/YYYY
fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map(Some)
        .map_err(|_| format!("invalid date `{}`", raw))
}

fn import_csv<C, R, T>(
    reader: impl Read,
    to_row: impl Fn(C) -> Result<R, String>,
    id_of: impl Fn(&T) -> i64,
) -> Result<ImportReport<T>, ReconError>
where
    C: DeserializeOwned,
    T: TryFrom<R, Error = ReconError>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut seen_ids = HashSet::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                errors.push(RowError {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let parsed = record
            .deserialize::<C>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(&to_row)
            .and_then(|row| T::try_from(row).map_err(|e| e.to_string()));

        match parsed {
            Ok(item) => {
                let id = id_of(&item);
                if seen_ids.insert(id) {
                    records.push(item);
                } else {
                    errors.push(RowError {
                        line,
                        message: format!("duplicate id {}", id),
                    });
                }
            }
            Err(message) => errors.push(RowError { line, message }),
        }
    }

    Ok(ImportReport { records, errors })
}

/// 表头: id, external_id, reference, description, amount, date, contact_name
pub fn import_tickets(reader: impl Read) -> Result<ImportReport<Ticket>, ReconError> {
    import_csv(
        reader,
        |c: TicketCsv| {
            Ok(TicketRow {
                id: parse_id(&c.id)?,
                external_id: c.external_id,
                reference: c.reference,
                description: c.description,
                amount: parse_amount(c.amount)?,
                ticket_date: parse_date(c.date)?,
                contact_name: c.contact_name,
            })
        },
        |t: &Ticket| t.id,
    )
}

/// 表头: id, number, contact_name, amount, date
pub fn import_quotes(reader: impl Read) -> Result<ImportReport<Quote>, ReconError> {
    import_csv(
        reader,
        |c: DocumentCsv| {
            Ok(QuoteRow {
                id: parse_id(&c.id)?,
                quote_number: c.number,
                contact_name: c.contact_name,
                amount: parse_amount(c.amount)?,
                issue_date: parse_date(c.date)?,
            })
        },
        |q: &Quote| q.id,
    )
}

/// 表头: id, number, contact_name, amount, date
pub fn import_invoices(reader: impl Read) -> Result<ImportReport<Invoice>, ReconError> {
    import_csv(
        reader,
        |c: DocumentCsv| {
            Ok(InvoiceRow {
                id: parse_id(&c.id)?,
                invoice_number: c.number,
                contact_name: c.contact_name,
                amount: parse_amount(c.amount)?,
                issue_date: parse_date(c.date)?,
            })
        },
        |i: &Invoice| i.id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_with_row_errors() {
        let csv = "\
id,external_id,reference,description,amount,date,contact_name
1,EXT-1,INV-1001,,\"5,000.00\",2024-01-10,Ahmed Al-Mansouri
2,,INV-1002,,100,2024-01-11,Fatima
x,EXT-3,,,100,2024-01-11,Omar
4,EXT-4,,Call for INV-1004,abc,2024-01-11,Omar
5,EXT-5,,,,10/01/2024,
1,EXT-6,,,1,2024-01-01,Dup
";
        let report = import_tickets(csv.as_bytes()).unwrap();

        let ids: Vec<i64> = report.records.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(report.records[0].amount, Some(BigDecimal::from(5000)));
        assert_eq!(report.records[1].ticket_date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(report.records[1].amount, None);

        let lines: Vec<u64> = report.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 7]);
        assert!(report.errors[0].message.contains("external_id"));
        assert!(report.errors[1].message.contains("invalid id"));
        assert!(report.errors[2].message.contains("invalid amount"));
        assert!(report.errors[3].message.contains("duplicate id 1"));
        assert!(!report.is_clean());
    }

    #[test]
    fn documents_require_number() {
        let csv = "\
id,number,contact_name,amount,date
10,Q-1001,Ahmed Al Mansouri,5000,2024-01-09
11,  ,Someone,10,2024-01-09
";
        let quotes = import_quotes(csv.as_bytes()).unwrap();
        assert_eq!(quotes.records.len(), 1);
        assert_eq!(quotes.records[0].quote_number, "Q-1001");
        assert_eq!(quotes.errors.len(), 1);

        let invoices = import_invoices(csv.as_bytes()).unwrap();
        assert_eq!(invoices.records[0].invoice_number, "Q-1001");
    }

    #[test]
    fn bad_date_is_reported() {
        assert!(parse_date(Some("2024-13-45".to_string())).is_err());
        assert_eq!(parse_date(Some(" ".to_string())), Ok(None));
        assert_eq!(parse_amount(Some("-12.50".to_string())).unwrap(), BigDecimal::from_str("-12.5").ok());
    }
}
