use crate::error::ReconError;
use crate::models::{
    ConfirmedSet, Invoice, MatchCandidate, MatchOutcome, MatchSummary, Quote, RecordView, Ticket,
};
use crate::service::aggregator::Aggregator;
use crate::service::normalize::{digit_core, tokens};
use crate::service::scorer::score_records;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use std::time::Instant;

/// 分块时忽略的常见姓名助词与公司后缀
const BLOCKING_STOPWORDS: &[&str] = &[
    "al", "el", "bin", "bint", "abu", "the", "and", "of", "llc", "fzco", "fze", "fzc", "fzllc",
    "co", "ltd", "est", "trading", "general", "company",
];

/// 分块键: 联系人词 + 单号数字部分
pub fn blocking_keys(view: &RecordView<'_>) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(contact) = view.contact {
        for token in tokens(contact) {
            if token.chars().count() >= 2 && !BLOCKING_STOPWORDS.contains(&token.as_str()) {
                keys.push(format!("c:{}", token));
            }
        }
    }
    if let Some(reference) = view.reference {
        let digits = digit_core(reference);
        let core = digits.trim_start_matches('0');
        if !core.is_empty() {
            keys.push(format!("r:{}", core));
        }
    }
    keys
}

/// 倒排索引: 分块键 -> 记录下标
#[derive(Debug, Default)]
struct BlockingIndex {
    postings: IndexMap<String, Vec<usize>>,
}

impl BlockingIndex {
    fn build<'a>(views: impl IntoIterator<Item = RecordView<'a>>) -> Self {
        let mut postings: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (idx, view) in views.into_iter().enumerate() {
            for key in blocking_keys(&view) {
                let list = postings.entry(key).or_default();
                if list.last() != Some(&idx) {
                    list.push(idx);
                }
            }
        }
        Self { postings }
    }

    fn collect(&self, keys: &[String], out: &mut IndexSet<usize>) {
        for key in keys {
            if let Some(list) = self.postings.get(key) {
                out.extend(list.iter().copied());
            }
        }
    }
}

/// 单次匹配输入 (请求开始时一次性读取)
#[derive(Debug, Clone, Copy)]
pub struct MatchInput<'a> {
    pub tickets: &'a [Ticket],
    pub quotes: &'a [Quote],
    pub invoices: &'a [Invoice],
    pub confirmed: &'a ConfirmedSet,
}

struct TicketPlan {
    ticket: usize,
    pairs: Vec<(usize, Vec<usize>)>,
}

/// 匹配执行器: 无状态, 纯计算
pub struct MatchRunner<'a> {
    aggregator: &'a Aggregator,
}

impl<'a> MatchRunner<'a> {
    pub fn new(aggregator: &'a Aggregator) -> Self {
        Self { aggregator }
    }

    /// 对单个三元组打分, 无可比较字段时返回 None
    pub fn score_triple(&self, ticket: &Ticket, quote: &Quote, invoice: &Invoice) -> Option<MatchCandidate> {
        let window = self.aggregator.config().date_window_days;
        let scores = score_records(&[ticket.view(), quote.view(), invoice.view()], window);
        let agg = self.aggregator.combine(&scores)?;

        Some(MatchCandidate {
            ticket_id: ticket.id,
            ticket_ref: ticket.display_ref().to_string(),
            quote_id: quote.id,
            quote_number: quote.quote_number.clone(),
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            match_score: agg.score,
            confidence: agg.confidence,
            match_reasons: agg.reasons.iter().map(|f| f.name().to_string()).collect(),
            skipped_fields: agg.skipped.iter().map(|f| f.name().to_string()).collect(),
        })
    }

    /// 执行匹配: 排除已确认记录 -> 分块预筛选 -> 候选上限检查 -> 并行打分 -> 排序
    pub fn run(&self, input: &MatchInput<'_>, min_score: f64) -> Result<MatchOutcome, ReconError> {
        if !min_score.is_finite() || !(0.0..=1.0).contains(&min_score) {
            return Err(ReconError::InvalidInput(format!(
                "minScore must be a number within [0, 1], got {}",
                min_score
            )));
        }

        let start_time = Instant::now();
        let confirmed = input.confirmed;
        let tickets: Vec<&Ticket> = input
            .tickets
            .iter()
            .filter(|t| !confirmed.tickets.contains(&t.id))
            .collect();
        let quotes: Vec<&Quote> = input
            .quotes
            .iter()
            .filter(|q| !confirmed.quotes.contains(&q.id))
            .collect();
        let invoices: Vec<&Invoice> = input
            .invoices
            .iter()
            .filter(|i| !confirmed.invoices.contains(&i.id))
            .collect();

        if tickets.is_empty() || quotes.is_empty() || invoices.is_empty() {
            tracing::info!(
                "[Matching] 无可匹配记录: 工单 {}, 报价 {}, 发票 {}",
                tickets.len(),
                quotes.len(),
                invoices.len()
            );
            return Ok(MatchOutcome::default());
        }

        let plan = self.plan(&tickets, &quotes, &invoices)?;
        let scored_combinations: u64 = plan
            .iter()
            .flat_map(|tp| tp.pairs.iter())
            .map(|(_, invs)| invs.len() as u64)
            .sum();

        tracing::info!(
            "[Matching] 工单 {}, 报价 {}, 发票 {}, 预筛选后候选组合 {}, 阈值 {}",
            tickets.len(),
            quotes.len(),
            invoices.len(),
            scored_combinations,
            min_score
        );

        let mut matches: Vec<MatchCandidate> = plan
            .par_iter()
            .flat_map_iter(|tp| {
                let ticket = tickets[tp.ticket];
                let mut found = Vec::new();
                for (qi, invs) in &tp.pairs {
                    for &ii in invs {
                        if let Some(c) = self.score_triple(ticket, quotes[*qi], invoices[ii]) {
                            if c.match_score >= min_score {
                                found.push(c);
                            }
                        }
                    }
                }
                found
            })
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .total_cmp(&a.match_score)
                .then_with(|| a.ticket_id.cmp(&b.ticket_id))
                .then_with(|| a.quote_id.cmp(&b.quote_id))
                .then_with(|| a.invoice_id.cmp(&b.invoice_id))
        });

        let summary = MatchSummary::from_matches(&matches);
        tracing::info!(
            "[Matching] 完成 - 匹配 {} 条 (高 {}, 中 {}, 低 {}), 平均分 {:.4}, 耗时: {:?}",
            matches.len(),
            summary.high_confidence,
            summary.medium_confidence,
            summary.low_confidence,
            summary.avg_score,
            start_time.elapsed()
        );

        Ok(MatchOutcome {
            matches,
            summary,
            scored_combinations,
        })
    }

    /// 构建候选计划, 超过上限立即失败
    fn plan(
        &self,
        tickets: &[&Ticket],
        quotes: &[&Quote],
        invoices: &[&Invoice],
    ) -> Result<Vec<TicketPlan>, ReconError> {
        let limit = self.aggregator.config().max_candidate_pairs;
        let quote_keys: Vec<Vec<String>> = quotes.iter().map(|q| blocking_keys(&q.view())).collect();
        let quote_index = BlockingIndex::build(quotes.iter().map(|q| q.view()));
        let invoice_index = BlockingIndex::build(invoices.iter().map(|i| i.view()));

        let mut planned: u64 = 0;
        let mut plan = Vec::with_capacity(tickets.len());
        for (ti, ticket) in tickets.iter().enumerate() {
            let ticket_keys = blocking_keys(&ticket.view());
            let mut candidate_quotes = IndexSet::new();
            quote_index.collect(&ticket_keys, &mut candidate_quotes);
            if candidate_quotes.is_empty() {
                continue;
            }

            let mut ticket_invoices = IndexSet::new();
            invoice_index.collect(&ticket_keys, &mut ticket_invoices);

            let mut pairs = Vec::with_capacity(candidate_quotes.len());
            for qi in candidate_quotes {
                let mut candidate_invoices = ticket_invoices.clone();
                invoice_index.collect(&quote_keys[qi], &mut candidate_invoices);
                if candidate_invoices.is_empty() {
                    continue;
                }

                planned += candidate_invoices.len() as u64;
                if planned > limit {
                    tracing::warn!(
                        "[Matching] 候选组合超过上限 {}, 已规划 {}",
                        limit,
                        planned
                    );
                    return Err(ReconError::TooManyCandidates {
                        pairs: planned,
                        limit,
                    });
                }
                pairs.push((qi, candidate_invoices.into_iter().collect()));
            }

            if !pairs.is_empty() {
                plan.push(TicketPlan { ticket: ti, pairs });
            }
        }
        Ok(plan)
    }
}
