mod common;

use common::{dissimilar_records, invoice, quote, sample_records, ticket};
use ticket_recon::config::MatchingConfig;
use ticket_recon::models::{Confidence, ConfirmedSet, Field, MatchSummary};
use ticket_recon::service::scorer::score_records;
use ticket_recon::service::{Aggregator, MatchInput, MatchRunner, ReconciliationService};
use ticket_recon::{MemoryStore, ReconError};

fn aggregator() -> Aggregator {
    Aggregator::new(MatchingConfig::default()).unwrap()
}

#[test]
fn ticket_and_quote_with_same_core_reference_are_high_confidence() {
    let t = ticket(1, "INV-1001", "5000", "2024-01-10", "Ahmed Al-Mansouri");
    let q = quote(10, "Q-1001", "5000", "2024-01-09", "Ahmed Al Mansouri");

    let scores = score_records(&[t.view(), q.view()], 30);
    let result = aggregator().combine(&scores).unwrap();

    assert!(result.score >= 0.8, "score {}", result.score);
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(
        result.reasons,
        vec![Field::Reference, Field::Amount, Field::Contact, Field::Date]
    );
    assert!(result.skipped.is_empty());
}

#[test]
fn dates_outside_window_cannot_be_high_confidence() {
    let t = ticket(1, "INV-1001", "5000", "2024-01-10", "Ahmed Al-Mansouri");
    let q = quote(10, "Q-1001", "5000", "2024-03-11", "Ahmed Al Mansouri");

    let scores = score_records(&[t.view(), q.view()], 30);
    assert_eq!(scores[Field::Date.index()].score, Some(0.0));

    let result = aggregator().combine(&scores).unwrap();
    assert_ne!(result.confidence, Confidence::High);
    assert!(!result.reasons.contains(&Field::Date));
}

#[test]
fn runner_is_deterministic() {
    let (tickets, quotes, invoices) = sample_records();
    let confirmed = ConfirmedSet::default();
    let input = MatchInput {
        tickets: &tickets,
        quotes: &quotes,
        invoices: &invoices,
        confirmed: &confirmed,
    };
    let agg = aggregator();
    let runner = MatchRunner::new(&agg);

    let first = runner.run(&input, 0.0).unwrap();
    let second = runner.run(&input, 0.0).unwrap();
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.matches.len(), 2);

    let best = &first.matches[0];
    assert_eq!((best.ticket_id, best.quote_id, best.invoice_id), (1, 10, 20));
    assert_eq!(best.confidence, Confidence::High);
    assert_eq!(first.matches[1].confidence, Confidence::Low);
}

#[test]
fn min_score_filters_and_summary_counts() {
    let (tickets, quotes, invoices) = sample_records();
    let confirmed = ConfirmedSet::default();
    let input = MatchInput {
        tickets: &tickets,
        quotes: &quotes,
        invoices: &invoices,
        confirmed: &confirmed,
    };
    let agg = aggregator();
    let outcome = MatchRunner::new(&agg).run(&input, 0.5).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.summary.high_confidence, 1);
    assert_eq!(outcome.summary.medium_confidence, 0);
    assert_eq!(outcome.summary.low_confidence, 0);
    assert_eq!(outcome.summary.avg_score, outcome.matches[0].match_score);
}

#[test]
fn sparse_records_skip_missing_fields() {
    let mut t = ticket(1, "INV-1001", "5000", "2024-01-10", "Ahmed Al-Mansouri");
    t.ticket_date = None;
    t.amount = None;
    let q = quote(10, "Q-1001", "5000", "2024-01-09", "Ahmed Al Mansouri");
    let i = invoice(20, "INV-1001", "5000", "2024-01-12", "Ahmed Al Mansouri");

    let agg = aggregator();
    let candidate = MatchRunner::new(&agg).score_triple(&t, &q, &i).unwrap();
    // 报价与发票之间仍可比较金额与日期
    assert!(candidate.skipped_fields.is_empty());

    let mut bare_quote = q.clone();
    bare_quote.issue_date = None;
    let mut bare_invoice = i.clone();
    bare_invoice.issue_date = None;
    let candidate = MatchRunner::new(&agg)
        .score_triple(&t, &bare_quote, &bare_invoice)
        .unwrap();
    assert_eq!(candidate.skipped_fields, vec!["date"]);
    assert_eq!(candidate.confidence, Confidence::High);
}

#[tokio::test]
async fn high_min_score_on_dissimilar_data_is_empty() {
    let (tickets, quotes, invoices) = dissimilar_records();
    let service = ReconciliationService::new(
        MemoryStore::new(tickets, quotes, invoices),
        MatchingConfig::default(),
    )
    .unwrap();

    let outcome = service.run_matching(Some(0.99)).await.unwrap();
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.summary, MatchSummary::default());
    assert_eq!(outcome.scored_combinations, 1);
}

#[tokio::test]
async fn invalid_weights_fail_at_construction() {
    let mut config = MatchingConfig::default();
    config.weights.reference = 0.0;
    config.weights.contact = 0.0;
    config.weights.amount = 0.0;
    config.weights.date = 0.0;

    let (tickets, quotes, invoices) = sample_records();
    let result = ReconciliationService::new(MemoryStore::new(tickets, quotes, invoices), config);
    assert!(matches!(result, Err(ReconError::Config(_))));
}

#[tokio::test]
async fn confirmed_triple_is_excluded_from_next_run() {
    let (tickets, quotes, invoices) = sample_records();
    let service = ReconciliationService::new(
        MemoryStore::new(tickets, quotes, invoices),
        MatchingConfig::default(),
    )
    .unwrap();

    let outcome = service.run_matching(Some(0.0)).await.unwrap();
    let best = outcome.matches[0].clone();
    service.confirm_match(&best).await.unwrap();

    let rerun = service.run_matching(Some(0.0)).await.unwrap();
    assert!(rerun.matches.iter().all(|m| m.ticket_id != best.ticket_id));
    assert!(rerun.matches.iter().all(|m| m.quote_id != best.quote_id));
    assert!(rerun.matches.iter().all(|m| m.invoice_id != best.invoice_id));
    assert_eq!(rerun.matches.len(), 1);
}
