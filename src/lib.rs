pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, MemoryStore, PgStore, RecordStore};
pub use error::ReconError;
pub use service::ReconciliationService;
