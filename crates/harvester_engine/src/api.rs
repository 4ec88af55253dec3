use std::sync::Arc;

use engine_logging::engine_info;
use harvester_core::{parse_detail, parse_index, DetailPayload, ProgramId, ProgramIndexEntry, SchemaError};

use crate::retry::{with_retry, IsRetryable, RetryPolicy};
use crate::{FetchError, Fetcher};

pub const DEFAULT_BASE_URL: &str = "https://api.txcrews.org/api";

/// Failure of one remote call: transport (possibly transient) or a payload
/// that does not have the expected shape (permanent).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] FetchError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(err) => err.is_transient(),
            ApiError::Schema(_) => false,
        }
    }
}

impl IsRetryable for ApiError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// URL layout of the two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn index_url(&self) -> String {
        format!("{}/Majors", self.base_url)
    }

    pub fn detail_url(&self, program_id: ProgramId) -> String {
        format!("{}/MajorTrans/{program_id}", self.base_url)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

pub struct IndexFetcher {
    fetcher: Arc<dyn Fetcher>,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

impl IndexFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, endpoints: Endpoints, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            endpoints,
            retry,
        }
    }

    /// Fetch and validate the full program index. Never cached.
    pub async fn fetch_index(&self) -> Result<Vec<ProgramIndexEntry>, ApiError> {
        let url = self.endpoints.index_url();
        engine_info!("Fetching program index from {}", url);
        let index = with_retry(&self.retry, |_attempt| {
            let url = url.clone();
            async move {
                let output = self.fetcher.fetch(&url).await?;
                Ok::<_, ApiError>(parse_index(&output.bytes)?)
            }
        })
        .await?;
        engine_info!("Program index lists {} programs", index.len());
        Ok(index)
    }
}

/// Validated detail payload together with the exact bytes received, which
/// are what the cache stores.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDetail {
    pub program_id: ProgramId,
    pub bytes: Vec<u8>,
    pub payload: DetailPayload,
}

/// Retrieves one program's detail. Does not touch the cache.
pub struct DetailFetcher {
    fetcher: Arc<dyn Fetcher>,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

impl DetailFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, endpoints: Endpoints, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            endpoints,
            retry,
        }
    }

    pub async fn fetch(&self, program_id: ProgramId) -> Result<FetchedDetail, ApiError> {
        self.fetch_observed(program_id, |_| {}).await
    }

    /// Like [`DetailFetcher::fetch`], calling `on_attempt` with the 1-based
    /// attempt number before each request.
    pub async fn fetch_observed<F>(
        &self,
        program_id: ProgramId,
        mut on_attempt: F,
    ) -> Result<FetchedDetail, ApiError>
    where
        F: FnMut(u32) + Send,
    {
        let url = self.endpoints.detail_url(program_id);
        with_retry(&self.retry, |attempt| {
            on_attempt(attempt);
            let url = url.clone();
            async move {
                let output = self.fetcher.fetch(&url).await?;
                let payload = parse_detail(&output.bytes)?;
                Ok::<_, ApiError>(FetchedDetail {
                    program_id,
                    bytes: output.bytes,
                    payload,
                })
            }
        })
        .await
    }
}
