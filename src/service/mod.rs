pub mod aggregator;
pub mod normalize;
pub mod reconciliation;
pub mod runner;
pub mod scorer;

pub use aggregator::{Aggregate, Aggregator};
pub use reconciliation::{Confirmation, ReconciliationService};
pub use runner::{MatchInput, MatchRunner};
