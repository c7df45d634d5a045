use crate::error::ReconError;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/ticket_recon".to_string(),
            max_connections: 20,
            acquire_timeout_secs: 10,
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// 内存后端的 CSV 种子目录 (tickets.csv / quotes.csv / invoices.csv)
    pub seed_dir: Option<String>,
}

/// 各字段权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub reference: f64,
    pub contact: f64,
    pub amount: f64,
    pub date: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            reference: 0.35,
            contact: 0.20,
            amount: 0.25,
            date: 0.20,
        }
    }
}

/// 置信度分档阈值, 分数恰好等于阈值时归入上一档
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.85,
            medium: 0.60,
        }
    }
}

/// 匹配算法配置, 显式传入聚合器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub weights: FieldWeights,
    pub thresholds: ConfidenceThresholds,
    /// 单字段分数达到该值才计入 match_reasons
    pub significance: f64,
    /// 日期衰减窗口 (天)
    pub date_window_days: u32,
    /// 单次运行允许评分的候选组合上限
    pub max_candidate_pairs: u64,
    /// 请求未携带 minScore 时使用
    pub default_min_score: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: FieldWeights::default(),
            thresholds: ConfidenceThresholds::default(),
            significance: 0.70,
            date_window_days: 30,
            max_candidate_pairs: 2_000_000,
            default_min_score: 0.5,
        }
    }
}

fn unit_interval(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

impl MatchingConfig {
    /// 校验权重与阈值
    pub fn validate(&self) -> Result<(), ReconError> {
        let w = &self.weights;
        let weights = [
            ("reference", w.reference),
            ("contact", w.contact),
            ("amount", w.amount),
            ("date", w.date),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ReconError::Config(format!(
                    "weight `{}` must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        let total: f64 = weights.iter().map(|(_, v)| v).sum();
        if total <= 0.0 {
            return Err(ReconError::Config("field weights sum to zero".to_string()));
        }
        if !total.is_finite() {
            return Err(ReconError::Config(format!(
                "field weights must have a finite sum, got {}",
                total
            )));
        }

        let t = &self.thresholds;
        if !unit_interval(t.high) || !unit_interval(t.medium) || t.medium > t.high {
            return Err(ReconError::Config(format!(
                "thresholds must satisfy 0 <= medium <= high <= 1, got medium={} high={}",
                t.medium, t.high
            )));
        }
        if !unit_interval(self.significance) {
            return Err(ReconError::Config(format!(
                "significance must be within [0, 1], got {}",
                self.significance
            )));
        }
        if !unit_interval(self.default_min_score) {
            return Err(ReconError::Config(format!(
                "default_min_score must be within [0, 1], got {}",
                self.default_min_score
            )));
        }
        if self.max_candidate_pairs == 0 {
            return Err(ReconError::Config(
                "max_candidate_pairs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> TOML 文件 (RECON_CONFIG, 可缺省) -> RECON__* 环境变量
    /// -> DATABASE_URL / SERVER_HOST / SERVER_PORT
    pub fn from_env() -> Result<Self, ReconError> {
        let path = std::env::var("RECON_CONFIG").unwrap_or_else(|_| "recon.toml".to_string());
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .map(i64::from);

        let config: AppConfig = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("RECON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", port)?
            .build()?
            .try_deserialize()?;

        config.matching.validate()?;
        Ok(config)
    }
}
