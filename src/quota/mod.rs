//! Per-key quota tracking with fixed-window reset.

mod record;
mod tracker;

pub use record::{QuotaRecord, RecordState};
pub use tracker::{QuotaStatus, QuotaTracker};
