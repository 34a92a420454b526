//! Resumable citation enrichment.
//!
//! A [`RecordStore`] holds one record per title and is flushed to durable
//! storage as a whole. The [`EnrichmentScheduler`] dispatches the store's
//! pending titles to a bounded worker pool running a [`CitationResolver`],
//! applies results as they arrive and flushes periodically, so an interrupted
//! run resumes from the last flush. [`assemble`] projects the finished store
//! back onto the listing order.

pub mod assembler;
pub mod error;
pub mod record;
pub mod resolver;
pub mod scheduler;
pub mod status;
pub mod store;

pub use assembler::assemble;
pub use error::{EnrichmentError, EnrichmentResult};
pub use record::{EnrichmentRecord, PaperRow, SnapshotKey, NOT_FOUND};
pub use resolver::{
    resolver_from_settings, CitationResolver, CrossrefResolver, OpenCitationsResolver,
    Resolution, RetryPolicy,
};
pub use scheduler::{EnrichmentScheduler, EnrichmentSummary, ProgressObserver, SilentProgress};
pub use status::{format_run_status, format_skip_notice};
pub use store::{FileSnapshotBackend, MemorySnapshotBackend, RecordStore, SnapshotBackend};
