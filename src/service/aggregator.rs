use crate::config::{FieldWeights, MatchingConfig};
use crate::error::ReconError;
use crate::models::{Confidence, Field, FieldScore};

/// 聚合结果
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub score: f64,
    pub confidence: Confidence,
    /// 超过显著性阈值的字段, 按贡献 (权重 × 分数) 降序
    pub reasons: Vec<Field>,
    /// 无法比较的字段
    pub skipped: Vec<Field>,
}

/// 加权聚合器, 构造时校验配置
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: MatchingConfig,
    weights: [f64; Field::COUNT],
}

fn weight_vector(w: &FieldWeights) -> [f64; Field::COUNT] {
    Field::ALL.map(|field| match field {
        Field::Reference => w.reference,
        Field::Contact => w.contact,
        Field::Amount => w.amount,
        Field::Date => w.date,
    })
}

impl Aggregator {
    pub fn new(config: MatchingConfig) -> Result<Self, ReconError> {
        config.validate()?;
        let weights = weight_vector(&config.weights);
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn weight(&self, field: Field) -> f64 {
        self.weights[field.index()]
    }

    /// match_score = Σ(w_i × s_i) / Σ(w_i, 字段可比较)
    ///
    /// 分数先按字段归位再求和, 结果与输入顺序无关; 同一字段重复出现时取较大值。
    /// 没有任何可比较字段 (或可比较字段权重全为 0) 时返回 None。
    pub fn combine(&self, scores: &[FieldScore]) -> Option<Aggregate> {
        let mut slots: [Option<f64>; Field::COUNT] = [None; Field::COUNT];
        for fs in scores {
            if let Some(s) = fs.score {
                let slot = &mut slots[fs.field.index()];
                *slot = Some(slot.map_or(s, |prev| prev.max(s)));
            }
        }

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut skipped = Vec::new();
        for field in Field::ALL {
            match slots[field.index()] {
                Some(s) => {
                    weighted += self.weight(field) * s;
                    total_weight += self.weight(field);
                }
                None => skipped.push(field),
            }
        }
        if total_weight <= 0.0 {
            return None;
        }

        let score = (weighted / total_weight).clamp(0.0, 1.0);
        let confidence = Confidence::from_score(score, &self.config.thresholds);

        let mut significant: Vec<(Field, f64)> = Field::ALL
            .iter()
            .filter_map(|&field| {
                let s = slots[field.index()]?;
                (s >= self.config.significance).then(|| (field, self.weight(field) * s))
            })
            .collect();
        // 稳定排序, 贡献相同时保持字段固定顺序
        significant.sort_by(|a, b| b.1.total_cmp(&a.1));

        Some(Aggregate {
            score,
            confidence,
            reasons: significant.into_iter().map(|(field, _)| field).collect(),
            skipped,
        })
    }
}
