use harvester_core::ScopeError;

use crate::api::ApiError;
use crate::cache::CacheError;
use crate::export::ExportError;
use crate::FetchError;

/// Run-level failures. Anything in here stops the run; per-program failures
/// are reported through `FetchSummary` instead.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("cannot build http client: {0}")]
    Client(FetchError),
    #[error("program index unavailable: {0}")]
    Index(#[from] ApiError),
    #[error("invalid selection: {0}")]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("cannot write table: {0}")]
    Export(#[from] ExportError),
}
