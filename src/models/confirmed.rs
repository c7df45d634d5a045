use crate::error::ReconError;
use crate::models::matching::Confidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;

/// 确认状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Confirmed,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Confirmed => "confirmed",
        }
    }
}

/// 已确认匹配 (工单-报价-发票三元组), 视为权威记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedMatch {
    pub id: i64,
    pub ticket_id: i64,
    pub quote_id: i64,
    pub invoice_id: i64,
    pub match_score: f64,
    pub confidence: Confidence,
    pub match_reasons: Vec<String>,
    pub status: MatchStatus,
    pub confirmed_at: DateTime<Utc>,
}

/// confirmed_matches 表原始行
#[derive(Debug, Clone, FromRow)]
pub struct ConfirmedMatchRow {
    pub id: i64,
    pub ticket_id: i64,
    pub quote_id: i64,
    pub invoice_id: i64,
    pub match_score: f64,
    pub confidence: String,
    pub match_reasons: Vec<String>,
    pub status: String,
    pub confirmed_at: DateTime<Utc>,
}

impl TryFrom<ConfirmedMatchRow> for ConfirmedMatch {
    type Error = ReconError;

    fn try_from(row: ConfirmedMatchRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| ReconError::InvalidRecord {
            kind: "confirmed match",
            reason,
        };
        let confidence = row.confidence.parse::<Confidence>().map_err(invalid)?;
        let status = match row.status.as_str() {
            "confirmed" => MatchStatus::Confirmed,
            other => return Err(invalid(format!("unknown status `{}`", other))),
        };

        Ok(Self {
            id: row.id,
            ticket_id: row.ticket_id,
            quote_id: row.quote_id,
            invoice_id: row.invoice_id,
            match_score: row.match_score,
            confidence,
            match_reasons: row.match_reasons,
            status,
            confirmed_at: row.confirmed_at,
        })
    }
}

/// 三元组唯一键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub ticket_id: i64,
    pub quote_id: i64,
    pub invoice_id: i64,
}

/// 已确认记录集合, 后续匹配需排除
#[derive(Debug, Clone, Default)]
pub struct ConfirmedSet {
    pub tickets: HashSet<i64>,
    pub quotes: HashSet<i64>,
    pub invoices: HashSet<i64>,
}

impl ConfirmedSet {
    pub fn insert(&mut self, key: MatchKey) {
        self.tickets.insert(key.ticket_id);
        self.quotes.insert(key.quote_id);
        self.invoices.insert(key.invoice_id);
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty() && self.quotes.is_empty() && self.invoices.is_empty()
    }
}

impl FromIterator<MatchKey> for ConfirmedSet {
    fn from_iter<I: IntoIterator<Item = MatchKey>>(iter: I) -> Self {
        let mut set = ConfirmedSet::default();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// 统计接口返回
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MatchingStats {
    pub total_tickets: i64,
    pub total_quotes: i64,
    pub total_invoices: i64,
    pub total_matches: i64,
    pub high_confidence_matches: i64,
    pub medium_confidence_matches: i64,
    pub low_confidence_matches: i64,
    pub avg_match_score: f64,
}
