pub mod import;
pub mod memory;
pub mod pool;
pub mod queries;
pub mod store;

pub use import::{import_invoices, import_quotes, import_tickets, ImportReport, RowError};
pub use memory::MemoryStore;
pub use pool::create_pool;
pub use store::{PgStore, RecordSnapshot, RecordStore};
