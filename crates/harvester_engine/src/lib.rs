//! Harvester engine: HTTP transport, cache, range controller and table
//! output.
mod api;
mod cache;
mod controller;
mod engine;
mod error;
mod export;
mod fetch;
mod filename;
mod normalizer;
mod persist;
mod retry;
mod types;

pub use api::{ApiError, DetailFetcher, Endpoints, FetchedDetail, IndexFetcher, DEFAULT_BASE_URL};
pub use cache::{CacheError, CacheStore};
pub use controller::{ControllerOptions, RangeController};
pub use engine::{EngineConfig, Harvester};
pub use error::HarvestError;
pub use export::{
    default_metric_columns, ExportError, ExportOptions, ExportSummary, TableWriter, KEY_COLUMNS,
    MISSING_DATA_COLUMN,
};
pub use fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
pub use filename::{cache_filename, program_id_from_filename};
pub use normalizer::{normalize_cached, NormalizeReport};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, PARTIAL_SUFFIX};
pub use retry::{with_retry, IsRetryable, RetryPolicy};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, HarvestEvent, ProgramProgress, Stage,
};
