// 诊断脚本: 依次调用 run-matching / confirm-match / matching-stats 并打印结果

use clap::{Parser, ValueEnum};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::PathBuf;
use ticket_recon::api::{
    ConfirmMatchResponse, MatchingStatsResponse, RunMatchingRequest, RunMatchingResponse,
};
use ticket_recon::models::{Confidence, MatchCandidate};
use ticket_recon::report::{export_matches_csv, ScoreHistogram};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser, Debug)]
#[command(name = "match-harness")]
#[command(about = "Exercise the matching endpoints of a running ticket-recon server")]
struct Cli {
    /// Server base URL
    #[arg(long, env = "RECON_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Minimum match score in [0, 1] (server default when omitted)
    #[arg(long)]
    min_score: Option<f64>,

    /// Ask the server for the confidence summary
    #[arg(long)]
    include_stats: bool,

    /// Only show matches of this confidence
    #[arg(long, value_enum, default_value_t = ConfidenceFilter::All)]
    confidence: ConfidenceFilter,

    /// Number of rows to print
    #[arg(long, default_value_t = 20)]
    top: usize,

    /// Write the filtered match list to a CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Confirm the best remaining match
    #[arg(long)]
    confirm_top: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfidenceFilter {
    High,
    Medium,
    Low,
    All,
}

impl ConfidenceFilter {
    fn accepts(self, confidence: Confidence) -> bool {
        match self {
            ConfidenceFilter::All => true,
            ConfidenceFilter::High => confidence == Confidence::High,
            ConfidenceFilter::Medium => confidence == Confidence::Medium,
            ConfidenceFilter::Low => confidence == Confidence::Low,
        }
    }
}

async fn read_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, Box<dyn std::error::Error>> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("server returned {}: {}", status, body).into());
    }
    Ok(response.json::<T>().await?)
}

fn print_table(matches: &[MatchCandidate], top: usize) {
    println!(
        "{:>4}  {:<14} {:<14} {:<14} {:>7}  {:<6}  {}",
        "#", "ticket", "quote", "invoice", "score", "conf", "reasons"
    );
    for (idx, m) in matches.iter().take(top).enumerate() {
        println!(
            "{:>4}  {:<14} {:<14} {:<14} {:>7.4}  {:<6}  {}",
            idx + 1,
            m.ticket_ref,
            m.quote_number,
            m.invoice_number,
            m.match_score,
            m.confidence,
            m.match_reasons.join(", ")
        );
    }
    if matches.len() > top {
        println!("  ... {} more", matches.len() - top);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Some(min_score) = cli.min_score {
        if !(0.0..=1.0).contains(&min_score) {
            return Err(format!("--min-score must be within [0, 1], got {}", min_score).into());
        }
    }

    let client = reqwest::Client::new();
    let base = cli.base_url.trim_end_matches('/');

    // 1. 运行匹配
    info!("POST {}/api/run-matching", base);
    let request = RunMatchingRequest {
        min_score: cli.min_score,
        include_stats: cli.include_stats,
    };
    let run: RunMatchingResponse =
        read_json(client.post(format!("{}/api/run-matching", base)).json(&request)).await?;

    let matches: Vec<MatchCandidate> = run
        .matches
        .into_iter()
        .filter(|m| cli.confidence.accepts(m.confidence))
        .collect();

    println!("\n== Matches ({}) ==", matches.len());
    print_table(&matches, cli.top);

    if let Some(summary) = &run.summary {
        println!(
            "\nSummary: high {}, medium {}, low {}, avg score {:.4}",
            summary.high_confidence, summary.medium_confidence, summary.low_confidence, summary.avg_score
        );
    }

    println!("\n== Score histogram ==");
    print!("{}", ScoreHistogram::from_matches(&matches).render(40));

    if let Some(path) = &cli.export {
        export_matches_csv(&matches, File::create(path)?)?;
        info!("Exported {} matches to {}", matches.len(), path.display());
    }

    // 2. 确认最优匹配 (可选)
    if cli.confirm_top {
        match matches.first() {
            Some(best) => {
                info!("POST {}/api/confirm-match", base);
                let confirmed: ConfirmMatchResponse =
                    read_json(client.post(format!("{}/api/confirm-match", base)).json(best)).await?;
                println!("\n{} (id {})", confirmed.message, confirmed.confirmed.id);
            }
            None => println!("\nNo match to confirm"),
        }
    }

    // 3. 统计
    info!("GET {}/api/matching-stats", base);
    let stats: MatchingStatsResponse =
        read_json(client.get(format!("{}/api/matching-stats", base))).await?;
    let s = stats.stats;
    println!("\n== Matching stats ==");
    println!("tickets {}, quotes {}, invoices {}", s.total_tickets, s.total_quotes, s.total_invoices);
    println!(
        "confirmed {} (high {}, medium {}, low {}), avg score {:.4}",
        s.total_matches,
        s.high_confidence_matches,
        s.medium_confidence_matches,
        s.low_confidence_matches,
        s.avg_match_score
    );

    Ok(())
}
