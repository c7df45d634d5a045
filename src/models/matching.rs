use crate::config::ConfidenceThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 参与评分的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Reference,
    Contact,
    Amount,
    Date,
}

impl Field {
    pub const COUNT: usize = 4;
    pub const ALL: [Field; Field::COUNT] = [Field::Reference, Field::Contact, Field::Amount, Field::Date];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Reference => "reference",
            Field::Contact => "contact",
            Field::Amount => "amount",
            Field::Date => "date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单字段得分, None 表示该字段无法比较
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScore {
    pub field: Field,
    pub score: Option<f64>,
}

/// 置信度分档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// 分数恰好等于阈值时归入较高一档
    pub fn from_score(score: f64, thresholds: &ConfidenceThresholds) -> Self {
        if score >= thresholds.high {
            Confidence::High
        } else if score >= thresholds.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            other => Err(format!("unknown confidence `{}`", other)),
        }
    }
}

/// 候选匹配 (每次运行计算, 确认前不落库)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub ticket_id: i64,
    pub ticket_ref: String,
    pub quote_id: i64,
    pub quote_number: String,
    pub invoice_id: i64,
    pub invoice_number: String,
    pub match_score: f64,
    pub confidence: Confidence,
    pub match_reasons: Vec<String>,
    /// 无法比较而被排除在加权平均之外的字段
    #[serde(default)]
    pub skipped_fields: Vec<String>,
}

/// 运行汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub avg_score: f64,
}

impl MatchSummary {
    pub fn from_matches(matches: &[MatchCandidate]) -> Self {
        let mut summary = MatchSummary::default();
        if matches.is_empty() {
            return summary;
        }

        let mut total = 0.0;
        for m in matches {
            match m.confidence {
                Confidence::High => summary.high_confidence += 1,
                Confidence::Medium => summary.medium_confidence += 1,
                Confidence::Low => summary.low_confidence += 1,
            }
            total += m.match_score;
        }
        summary.avg_score = total / matches.len() as f64;
        summary
    }
}

/// 匹配运行结果
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matches: Vec<MatchCandidate>,
    pub summary: MatchSummary,
    /// 实际评分的候选组合数
    pub scored_combinations: u64,
}
