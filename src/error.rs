use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 对账服务统一错误
#[derive(Debug, Error)]
pub enum ReconError {
    /// 请求参数错误 (格式错误、minScore 越界等)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 边界校验失败的记录
    #[error("invalid {kind} record: {reason}")]
    InvalidRecord { kind: &'static str, reason: String },

    /// 确认匹配时引用的记录不存在
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// 重复确认
    #[error("conflict: {0}")]
    Conflict(String),

    /// 候选组合数超过上限
    #[error("too many candidates: {pairs} combinations exceed the limit of {limit}, reduce input size")]
    TooManyCandidates { pairs: u64, limit: u64 },

    /// 权重/阈值配置错误
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("matching task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<config::ConfigError> for ReconError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl ReconError {
    /// 错误类别 (写入响应体的 error 字段)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidRecord { .. } => "invalid_record",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::TooManyCandidates { .. } => "too_many_candidates",
            Self::Config(_) => "config",
            Self::Database(_) => "database",
            Self::Csv(_) | Self::Io(_) => "io",
            Self::Task(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InvalidRecord { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyCandidates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Config(_)
            | Self::Database(_)
            | Self::Csv(_)
            | Self::Io(_)
            | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl IntoResponse for ReconError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {:?}", self);
            "Internal server error".to_string()
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
