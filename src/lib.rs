pub mod enrichment;
pub mod orchestration;
pub mod papers;
pub mod pipeline;
pub mod ranking;
pub mod workspace;

// Re-export commonly used types for convenience.
pub use enrichment::{
    CitationResolver, EnrichmentError, EnrichmentScheduler, RecordStore, SnapshotKey,
};
pub use papers::{PaperList, Venue};
pub use pipeline::{RankingOutcome, RankingPipeline, RankingRequest};
pub use workspace::AppConfig;
