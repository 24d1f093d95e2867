//! Scan ingestion: photo bytes in, persisted inventory record out.

pub mod clock;
pub mod retry;
pub mod scan;

pub use clock::{Clock, FixedClock, SystemClock};
pub use retry::RetryPolicy;
pub use scan::{
    list_inventory, manual_add, photo_file_name, ScanError, ScanOutcome, ScanState, ScanStep,
    ScanTrace, ScanWorkflow,
};
