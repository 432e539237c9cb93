//! AbstainLab Core — domain types and the ingestion boundary.
//!
//! This crate holds everything the statistics engine consumes:
//! - Domain types (configurations, categories, run results, run sets)
//! - Validation of loosely-typed harness records into `RunResult`s
//! - The run store, grouping runs by (configuration, category) in first-seen order
//! - Campaign loaders for the harness directory layout and JSONL files
//! - Campaign fingerprinting

pub mod domain;
pub mod fingerprint;
pub mod ingest;
pub mod loader;
pub mod store;

pub use domain::{
    CategoryId, CategoryKind, CategoryKinds, ConfigName, RunResult, RunSet, RunSetError,
};
pub use fingerprint::{campaign_hash, CampaignHash};
pub use ingest::{parse_jsonl, IngestError, RawRunRecord};
pub use loader::{
    completed_runs, load_campaign_dir, load_jsonl_file, LoadError, LoadOptions, LoadedCampaign,
    SkippedConfiguration,
};
pub use store::RunStore;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: store and domain types can cross rayon worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<RunResult>();
        require_sync::<RunResult>();
        require_send::<RunSet>();
        require_sync::<RunSet>();
        require_send::<RunStore>();
        require_sync::<RunStore>();
        require_send::<CategoryKinds>();
        require_sync::<CategoryKinds>();
        require_send::<CampaignHash>();
        require_sync::<CampaignHash>();
    }
}
