use crate::db::import::{import_invoices, import_quotes, import_tickets, ImportReport};
use crate::db::store::{duplicate_conflict, match_key, record_conflict, RecordSnapshot, RecordStore};
use crate::error::ReconError;
use crate::models::{
    Confidence, ConfirmedMatch, ConfirmedSet, Invoice, MatchCandidate, MatchKey, MatchStatus,
    MatchingStats, Quote, Ticket,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// 内存存储: 测试、演示及 CSV 种子数据
#[derive(Debug)]
pub struct MemoryStore {
    tickets: Vec<Ticket>,
    quotes: Vec<Quote>,
    invoices: Vec<Invoice>,
    confirmed: DashMap<MatchKey, ConfirmedMatch>,
    /// 串行化确认: 记录级冲突检查与写入需原子完成
    confirm_lock: Mutex<()>,
    next_id: AtomicI64,
}

fn log_rejections<T>(kind: &str, report: &ImportReport<T>) {
    for e in &report.errors {
        tracing::warn!("{} CSV 第 {} 行被拒绝: {}", kind, e.line, e.message);
    }
}

impl MemoryStore {
    pub fn new(tickets: Vec<Ticket>, quotes: Vec<Quote>, invoices: Vec<Invoice>) -> Self {
        Self {
            tickets,
            quotes,
            invoices,
            confirmed: DashMap::new(),
            confirm_lock: Mutex::new(()),
            next_id: AtomicI64::new(1),
        }
    }

    /// 从目录加载 tickets.csv / quotes.csv / invoices.csv, 无效行记录日志后跳过
    pub fn from_csv_dir(dir: impl AsRef<Path>) -> Result<Self, ReconError> {
        let dir = dir.as_ref();
        let tickets = import_tickets(File::open(dir.join("tickets.csv"))?)?;
        let quotes = import_quotes(File::open(dir.join("quotes.csv"))?)?;
        let invoices = import_invoices(File::open(dir.join("invoices.csv"))?)?;

        log_rejections("tickets", &tickets);
        log_rejections("quotes", &quotes);
        log_rejections("invoices", &invoices);
        tracing::info!(
            "CSV 种子数据加载完成 ({}): 工单 {}, 报价 {}, 发票 {}",
            dir.display(),
            tickets.records.len(),
            quotes.records.len(),
            invoices.records.len()
        );

        Ok(Self::new(tickets.records, quotes.records, invoices.records))
    }

    /// 已确认匹配, 按 id 升序
    pub fn confirmed_matches(&self) -> Vec<ConfirmedMatch> {
        let mut all: Vec<ConfirmedMatch> = self.confirmed.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|m| m.id);
        all
    }

    fn find_triple(&self, key: &MatchKey) -> Result<(&Ticket, &Quote, &Invoice), ReconError> {
        let ticket = self
            .tickets
            .iter()
            .find(|t| t.id == key.ticket_id)
            .ok_or(ReconError::NotFound { kind: "ticket", id: key.ticket_id })?;
        let quote = self
            .quotes
            .iter()
            .find(|q| q.id == key.quote_id)
            .ok_or(ReconError::NotFound { kind: "quote", id: key.quote_id })?;
        let invoice = self
            .invoices
            .iter()
            .find(|i| i.id == key.invoice_id)
            .ok_or(ReconError::NotFound { kind: "invoice", id: key.invoice_id })?;
        Ok((ticket, quote, invoice))
    }

    /// 三元组中任一记录已属于其他已确认匹配
    fn check_unclaimed(&self, key: &MatchKey) -> Result<(), ReconError> {
        for entry in self.confirmed.iter() {
            let other = entry.key();
            if other.ticket_id == key.ticket_id {
                return Err(record_conflict("ticket", key.ticket_id));
            }
            if other.quote_id == key.quote_id {
                return Err(record_conflict("quote", key.quote_id));
            }
            if other.invoice_id == key.invoice_id {
                return Err(record_conflict("invoice", key.invoice_id));
            }
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    async fn load_snapshot(&self) -> Result<RecordSnapshot, ReconError> {
        let confirmed: ConfirmedSet = self.confirmed.iter().map(|e| *e.key()).collect();
        Ok(RecordSnapshot {
            tickets: self.tickets.clone(),
            quotes: self.quotes.clone(),
            invoices: self.invoices.clone(),
            confirmed,
        })
    }

    async fn load_triple(&self, key: &MatchKey) -> Result<(Ticket, Quote, Invoice), ReconError> {
        let (ticket, quote, invoice) = self.find_triple(key)?;
        Ok((ticket.clone(), quote.clone(), invoice.clone()))
    }

    async fn confirm(&self, candidate: &MatchCandidate) -> Result<ConfirmedMatch, ReconError> {
        let key = match_key(candidate);
        self.find_triple(&key)?;

        let _guard = self.confirm_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.confirmed.contains_key(&key) {
            return Err(duplicate_conflict(&key));
        }
        self.check_unclaimed(&key)?;

        match self.confirmed.entry(key) {
            Entry::Occupied(_) => Err(duplicate_conflict(&key)),
            Entry::Vacant(slot) => {
                let confirmed = ConfirmedMatch {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    ticket_id: key.ticket_id,
                    quote_id: key.quote_id,
                    invoice_id: key.invoice_id,
                    match_score: candidate.match_score,
                    confidence: candidate.confidence,
                    match_reasons: candidate.match_reasons.clone(),
                    status: MatchStatus::Confirmed,
                    confirmed_at: Utc::now(),
                };
                slot.insert(confirmed.clone());
                Ok(confirmed)
            }
        }
    }

    async fn stats(&self) -> Result<MatchingStats, ReconError> {
        let mut stats = MatchingStats {
            total_tickets: self.tickets.len() as i64,
            total_quotes: self.quotes.len() as i64,
            total_invoices: self.invoices.len() as i64,
            ..MatchingStats::default()
        };

        let mut score_sum = 0.0;
        for entry in self.confirmed.iter() {
            let m = entry.value();
            stats.total_matches += 1;
            score_sum += m.match_score;
            match m.confidence {
                Confidence::High => stats.high_confidence_matches += 1,
                Confidence::Medium => stats.medium_confidence_matches += 1,
                Confidence::Low => stats.low_confidence_matches += 1,
            }
        }
        if stats.total_matches > 0 {
            stats.avg_match_score = score_sum / stats.total_matches as f64;
        }
        Ok(stats)
    }
}
