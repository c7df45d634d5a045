use crate::error::ReconError;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 工单原始行 (tickets 表, 字段均可能为空)
#[derive(Debug, Clone, FromRow)]
pub struct TicketRow {
    pub id: i64,
    pub external_id: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub amount: Option<BigDecimal>,
    pub ticket_date: Option<NaiveDate>,
    pub contact_name: Option<String>,
}

/// 报价单原始行 (quotes 表)
#[derive(Debug, Clone, FromRow)]
pub struct QuoteRow {
    pub id: i64,
    pub quote_number: Option<String>,
    pub contact_name: Option<String>,
    pub amount: Option<BigDecimal>,
    pub issue_date: Option<NaiveDate>,
}

/// 发票原始行 (invoices 表)
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub contact_name: Option<String>,
    pub amount: Option<BigDecimal>,
    pub issue_date: Option<NaiveDate>,
}

/// 外部系统导入的工单, 对匹配器只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub external_id: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub amount: Option<BigDecimal>,
    pub ticket_date: Option<NaiveDate>,
    pub contact_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub quote_number: String,
    pub contact_name: Option<String>,
    pub amount: Option<BigDecimal>,
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub contact_name: Option<String>,
    pub amount: Option<BigDecimal>,
    pub issue_date: Option<NaiveDate>,
}

/// 三类记录参与比较的字段视图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordView<'a> {
    pub reference: Option<&'a str>,
    pub contact: Option<&'a str>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, kind: &'static str, field: &str, id: i64) -> Result<String, ReconError> {
    non_blank(value).ok_or_else(|| ReconError::InvalidRecord {
        kind,
        reason: format!("row {} is missing {}", id, field),
    })
}

fn amount_f64(amount: &Option<BigDecimal>) -> Option<f64> {
    amount
        .as_ref()
        .and_then(|a| a.to_f64())
        .filter(|a| a.is_finite())
}

impl Ticket {
    /// 用于比较的单号: 优先 reference, 否则取描述中第一个含数字的词
    pub fn reference_hint(&self) -> Option<&str> {
        if let Some(reference) = self.reference.as_deref() {
            return Some(reference);
        }
        self.description.as_deref().and_then(|desc| {
            desc.split_whitespace()
                .find(|word| word.chars().any(|c| c.is_ascii_digit()))
                .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|word| !word.is_empty())
        })
    }

    /// 展示用单号
    pub fn display_ref(&self) -> &str {
        self.reference_hint().unwrap_or(&self.external_id)
    }

    pub fn view(&self) -> RecordView<'_> {
        RecordView {
            reference: self.reference_hint(),
            contact: self.contact_name.as_deref(),
            amount: amount_f64(&self.amount),
            date: self.ticket_date,
        }
    }
}

impl Quote {
    pub fn view(&self) -> RecordView<'_> {
        RecordView {
            reference: Some(&self.quote_number),
            contact: self.contact_name.as_deref(),
            amount: amount_f64(&self.amount),
            date: self.issue_date,
        }
    }
}

impl Invoice {
    pub fn view(&self) -> RecordView<'_> {
        RecordView {
            reference: Some(&self.invoice_number),
            contact: self.contact_name.as_deref(),
            amount: amount_f64(&self.amount),
            date: self.issue_date,
        }
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = ReconError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            external_id: required(row.external_id, "ticket", "external_id", row.id)?,
            reference: non_blank(row.reference),
            description: non_blank(row.description),
            amount: row.amount,
            ticket_date: row.ticket_date,
            contact_name: non_blank(row.contact_name),
        })
    }
}

impl TryFrom<QuoteRow> for Quote {
    type Error = ReconError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            quote_number: required(row.quote_number, "quote", "quote_number", row.id)?,
            contact_name: non_blank(row.contact_name),
            amount: row.amount,
            issue_date: row.issue_date,
        })
    }
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = ReconError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            invoice_number: required(row.invoice_number, "invoice", "invoice_number", row.id)?,
            contact_name: non_blank(row.contact_name),
            amount: row.amount,
            issue_date: row.issue_date,
        })
    }
}

/// 批量转换原始行, 丢弃校验失败的行并记录日志; 返回 (有效记录, 拒绝数)
pub fn validate_rows<R, T>(rows: Vec<R>, kind: &str) -> (Vec<T>, usize)
where
    T: TryFrom<R, Error = ReconError>,
{
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;
    for row in rows {
        match T::try_from(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                tracing::warn!("Skipping {} row: {}", kind, e);
            }
        }
    }
    (records, rejected)
}
