pub mod confirmed;
pub mod matching;
pub mod record;

pub use confirmed::{
    ConfirmedMatch, ConfirmedMatchRow, ConfirmedSet, MatchKey, MatchStatus, MatchingStats,
};
pub use matching::{
    Confidence, Field, FieldScore, MatchCandidate, MatchOutcome, MatchSummary,
};
pub use record::{
    validate_rows, Invoice, InvoiceRow, Quote, QuoteRow, RecordView, Ticket, TicketRow,
};
