use crate::db::RecordStore;
use crate::error::ReconError;
use crate::models::{ConfirmedMatch, MatchCandidate, MatchSummary, MatchingStats};
use crate::service::ReconciliationService;
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 匹配参数
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMatchingRequest {
    pub min_score: Option<f64>,
    #[serde(default)]
    pub include_stats: bool,
}

/// 匹配响应
#[derive(Debug, Deserialize, Serialize)]
pub struct RunMatchingResponse {
    pub matches: Vec<MatchCandidate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<MatchSummary>,
}

/// 确认响应
#[derive(Debug, Deserialize, Serialize)]
pub struct ConfirmMatchResponse {
    #[serde(rename = "match")]
    pub confirmed: ConfirmedMatch,
    pub message: String,
}

/// 统计响应
#[derive(Debug, Deserialize, Serialize)]
pub struct MatchingStatsResponse {
    pub stats: MatchingStats,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ReconError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ReconError::InvalidInput(rejection.body_text()))
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 运行匹配
pub async fn run_matching<S: RecordStore>(
    State(service): State<Arc<ReconciliationService<S>>>,
    body: Result<Json<RunMatchingRequest>, JsonRejection>,
) -> Result<Json<RunMatchingResponse>, ReconError> {
    let req = json_body(body)?;
    let outcome = service.run_matching(req.min_score).await?;

    Ok(Json(RunMatchingResponse {
        matches: outcome.matches,
        summary: req.include_stats.then_some(outcome.summary),
    }))
}

/// 确认匹配
pub async fn confirm_match<S: RecordStore>(
    State(service): State<Arc<ReconciliationService<S>>>,
    body: Result<Json<MatchCandidate>, JsonRejection>,
) -> Result<Response, ReconError> {
    let candidate = json_body(body)?;
    let confirmation = service.confirm_match(&candidate).await?;

    // 展示字段取自存储中的记录
    let stored = &confirmation.candidate;
    let response = ConfirmMatchResponse {
        message: format!(
            "Match confirmed: ticket {} / quote {} / invoice {}",
            stored.ticket_ref, stored.quote_number, stored.invoice_number
        ),
        confirmed: confirmation.confirmed,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// 匹配统计
pub async fn matching_stats<S: RecordStore>(
    State(service): State<Arc<ReconciliationService<S>>>,
) -> Result<Json<MatchingStatsResponse>, ReconError> {
    let stats = service.matching_stats().await?;
    Ok(Json(MatchingStatsResponse { stats }))
}
