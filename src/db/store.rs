use crate::db::queries;
use crate::error::ReconError;
use crate::models::{
    validate_rows, ConfirmedMatch, ConfirmedSet, Invoice, MatchCandidate, MatchKey,
    MatchingStats, Quote, Ticket,
};
use sqlx::PgPool;
use std::future::Future;

/// 一次请求开始时读取的全部数据
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    pub tickets: Vec<Ticket>,
    pub quotes: Vec<Quote>,
    pub invoices: Vec<Invoice>,
    pub confirmed: ConfirmedSet,
}

/// 记录存储: 读取快照、持久化确认、统计
pub trait RecordStore: Send + Sync + 'static {
    fn load_snapshot(&self) -> impl Future<Output = Result<RecordSnapshot, ReconError>> + Send;

    /// 按 id 读取三元组的三条记录, 任一缺失返回 NotFound
    fn load_triple(
        &self,
        key: &MatchKey,
    ) -> impl Future<Output = Result<(Ticket, Quote, Invoice), ReconError>> + Send;

    /// 确认候选匹配; 记录不存在返回 NotFound,
    /// 三元组重复或任一记录已属于其他已确认匹配时返回 Conflict
    fn confirm(
        &self,
        candidate: &MatchCandidate,
    ) -> impl Future<Output = Result<ConfirmedMatch, ReconError>> + Send;

    fn stats(&self) -> impl Future<Output = Result<MatchingStats, ReconError>> + Send;
}

pub(crate) fn match_key(candidate: &MatchCandidate) -> MatchKey {
    MatchKey {
        ticket_id: candidate.ticket_id,
        quote_id: candidate.quote_id,
        invoice_id: candidate.invoice_id,
    }
}

pub(crate) fn duplicate_conflict(key: &MatchKey) -> ReconError {
    ReconError::Conflict(format!(
        "ticket {} / quote {} / invoice {} is already confirmed",
        key.ticket_id, key.quote_id, key.invoice_id
    ))
}

/// 记录已属于另一个已确认匹配
pub(crate) fn record_conflict(kind: &str, id: i64) -> ReconError {
    ReconError::Conflict(format!("{} {} already belongs to a confirmed match", kind, id))
}

/// 唯一约束名 -> 冲突错误
fn unique_violation(constraint: Option<&str>, key: &MatchKey) -> ReconError {
    match constraint {
        Some("confirmed_matches_ticket_once") => record_conflict("ticket", key.ticket_id),
        Some("confirmed_matches_quote_once") => record_conflict("quote", key.quote_id),
        Some("confirmed_matches_invoice_once") => record_conflict("invoice", key.invoice_id),
        _ => duplicate_conflict(key),
    }
}

/// Postgres 存储
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RecordStore for PgStore {
    async fn load_snapshot(&self) -> Result<RecordSnapshot, ReconError> {
        let start_time = std::time::Instant::now();
        let (ticket_rows, quote_rows, invoice_rows, confirmed_keys) = futures::try_join!(
            queries::list_tickets(&self.pool),
            queries::list_quotes(&self.pool),
            queries::list_invoices(&self.pool),
            queries::list_confirmed_keys(&self.pool),
        )?;

        let (tickets, rejected_tickets) = validate_rows(ticket_rows, "ticket");
        let (quotes, rejected_quotes) = validate_rows(quote_rows, "quote");
        let (invoices, rejected_invoices) = validate_rows(invoice_rows, "invoice");

        tracing::info!(
            "读取快照: 工单 {} (拒绝 {}), 报价 {} (拒绝 {}), 发票 {} (拒绝 {}), 已确认 {}, 耗时: {:?}",
            tickets.len(),
            rejected_tickets,
            quotes.len(),
            rejected_quotes,
            invoices.len(),
            rejected_invoices,
            confirmed_keys.len(),
            start_time.elapsed()
        );

        Ok(RecordSnapshot {
            tickets,
            quotes,
            invoices,
            confirmed: confirmed_keys.into_iter().collect(),
        })
    }

    async fn load_triple(&self, key: &MatchKey) -> Result<(Ticket, Quote, Invoice), ReconError> {
        let (ticket, quote, invoice) = futures::try_join!(
            queries::find_ticket(&self.pool, key.ticket_id),
            queries::find_quote(&self.pool, key.quote_id),
            queries::find_invoice(&self.pool, key.invoice_id),
        )?;

        let ticket = ticket.ok_or(ReconError::NotFound { kind: "ticket", id: key.ticket_id })?;
        let quote = quote.ok_or(ReconError::NotFound { kind: "quote", id: key.quote_id })?;
        let invoice = invoice.ok_or(ReconError::NotFound { kind: "invoice", id: key.invoice_id })?;
        Ok((ticket.try_into()?, quote.try_into()?, invoice.try_into()?))
    }

    async fn confirm(&self, candidate: &MatchCandidate) -> Result<ConfirmedMatch, ReconError> {
        let key = match_key(candidate);
        let (ticket, quote, invoice) = queries::records_exist(&self.pool, &key).await?;
        if !ticket {
            return Err(ReconError::NotFound { kind: "ticket", id: key.ticket_id });
        }
        if !quote {
            return Err(ReconError::NotFound { kind: "quote", id: key.quote_id });
        }
        if !invoice {
            return Err(ReconError::NotFound { kind: "invoice", id: key.invoice_id });
        }

        match queries::insert_confirmed_match(&self.pool, candidate).await {
            Ok(row) => ConfirmedMatch::try_from(row),
            // 23505: unique_violation
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(unique_violation(db.constraint(), &key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stats(&self) -> Result<MatchingStats, ReconError> {
        Ok(queries::matching_stats(&self.pool).await?)
    }
}
