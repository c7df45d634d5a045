use crate::config::MatchingConfig;
use crate::db::RecordStore;
use crate::error::ReconError;
use crate::models::{ConfirmedMatch, MatchCandidate, MatchKey, MatchOutcome, MatchingStats};
use crate::service::aggregator::Aggregator;
use crate::service::runner::{MatchInput, MatchRunner};

/// 客户端分数与服务端重算分数的允许误差 (JSON 浮点往返)
const SCORE_TOLERANCE: f64 = 1e-9;

/// 确认结果: 已落库的匹配 + 服务端按当前记录重算的候选
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub confirmed: ConfirmedMatch,
    pub candidate: MatchCandidate,
}

/// 对账服务: 读取快照 -> 匹配; 确认; 统计
pub struct ReconciliationService<S> {
    store: S,
    aggregator: Aggregator,
}

impl<S: RecordStore> ReconciliationService<S> {
    /// 配置非法时立即失败
    pub fn new(store: S, config: MatchingConfig) -> Result<Self, ReconError> {
        Ok(Self {
            store,
            aggregator: Aggregator::new(config)?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MatchingConfig {
        self.aggregator.config()
    }

    /// 运行匹配, min_score 缺省时取配置值
    pub async fn run_matching(&self, min_score: Option<f64>) -> Result<MatchOutcome, ReconError> {
        let min_score = min_score.unwrap_or(self.config().default_min_score);
        let snapshot = self.store.load_snapshot().await?;
        let aggregator = self.aggregator.clone();

        // 打分为 CPU 密集计算, 移出异步运行时
        tokio::task::spawn_blocking(move || {
            let input = MatchInput {
                tickets: &snapshot.tickets,
                quotes: &snapshot.quotes,
                invoices: &snapshot.invoices,
                confirmed: &snapshot.confirmed,
            };
            MatchRunner::new(&aggregator).run(&input, min_score)
        })
        .await?
    }

    /// 确认候选匹配
    ///
    /// 分数与置信度不信任请求体: 按存储中的记录重新打分, 与请求不一致时拒绝,
    /// 落库的是服务端结果。
    pub async fn confirm_match(&self, candidate: &MatchCandidate) -> Result<Confirmation, ReconError> {
        if !candidate.match_score.is_finite() || !(0.0..=1.0).contains(&candidate.match_score) {
            return Err(ReconError::InvalidInput(format!(
                "match_score must be within [0, 1], got {}",
                candidate.match_score
            )));
        }

        let key = MatchKey {
            ticket_id: candidate.ticket_id,
            quote_id: candidate.quote_id,
            invoice_id: candidate.invoice_id,
        };
        let (ticket, quote, invoice) = self.store.load_triple(&key).await?;
        let rescored = MatchRunner::new(&self.aggregator)
            .score_triple(&ticket, &quote, &invoice)
            .ok_or_else(|| {
                ReconError::InvalidInput(format!(
                    "ticket {} / quote {} / invoice {} have no comparable fields",
                    key.ticket_id, key.quote_id, key.invoice_id
                ))
            })?;

        if (rescored.match_score - candidate.match_score).abs() > SCORE_TOLERANCE
            || rescored.confidence != candidate.confidence
        {
            tracing::warn!(
                "拒绝确认: 请求分数 {:.4} ({}), 重算分数 {:.4} ({})",
                candidate.match_score,
                candidate.confidence,
                rescored.match_score,
                rescored.confidence
            );
            return Err(ReconError::InvalidInput(format!(
                "candidate score {} ({}) does not match the stored records, expected {} ({})",
                candidate.match_score, candidate.confidence, rescored.match_score, rescored.confidence
            )));
        }

        let confirmed = self.store.confirm(&rescored).await?;
        tracing::info!(
            "确认匹配 #{}: 工单 {} / 报价 {} / 发票 {}, 分数 {:.4} ({})",
            confirmed.id,
            confirmed.ticket_id,
            confirmed.quote_id,
            confirmed.invoice_id,
            confirmed.match_score,
            confirmed.confidence
        );
        Ok(Confirmation {
            confirmed,
            candidate: rescored,
        })
    }

    pub async fn matching_stats(&self) -> Result<MatchingStats, ReconError> {
        self.store.stats().await
    }
}
