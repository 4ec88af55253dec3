use std::path::{Path, PathBuf};
use std::sync::Arc;

use harvester_core::{
    resolve_scope, FetchSummary, NormalizedRow, ProgramIndexEntry, RunScope, Selection,
};
use tokio_util::sync::CancellationToken;

use crate::api::{DetailFetcher, Endpoints, IndexFetcher};
use crate::cache::CacheStore;
use crate::controller::{ControllerOptions, RangeController};
use crate::export::{default_metric_columns, ExportOptions, ExportSummary, TableWriter};
use crate::normalizer::{normalize_cached, NormalizeReport};
use crate::retry::RetryPolicy;
use crate::{FetchSettings, Fetcher, HarvestError, ProgressSink, ReqwestFetcher};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub endpoints: Endpoints,
    pub fetch: FetchSettings,
    pub retry: RetryPolicy,
    pub cache_dir: PathBuf,
    pub controller: ControllerOptions,
    pub target_year: i32,
    pub metric_columns: Vec<String>,
}

impl EngineConfig {
    pub fn default_with_cache(cache_dir: PathBuf) -> Self {
        Self {
            endpoints: Endpoints::default(),
            fetch: FetchSettings::default(),
            retry: RetryPolicy::default(),
            cache_dir,
            controller: ControllerOptions::default(),
            target_year: 2022,
            metric_columns: default_metric_columns(),
        }
    }
}

/// Wires the index fetcher, range controller, cache and table writer for
/// one configuration.
pub struct Harvester {
    index: IndexFetcher,
    controller: RangeController,
    writer: TableWriter,
    target_year: i32,
}

impl Harvester {
    /// Harvester over HTTP.
    pub fn new(config: EngineConfig) -> Result<Self, HarvestError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone()).map_err(HarvestError::Client)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Harvester over any transport.
    pub fn with_fetcher(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, HarvestError> {
        let cache = CacheStore::open(&config.cache_dir)?;
        let index = IndexFetcher::new(
            fetcher.clone(),
            config.endpoints.clone(),
            config.retry.clone(),
        );
        let details = DetailFetcher::new(fetcher, config.endpoints, config.retry);
        let controller = RangeController::new(cache, details, config.controller);
        let writer = TableWriter::new(ExportOptions {
            target_year: config.target_year,
            metric_columns: config.metric_columns,
        });
        Ok(Self {
            index,
            controller,
            writer,
            target_year: config.target_year,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        self.controller.cache()
    }

    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    /// Fresh index for this run. Any failure here is fatal to the run.
    pub async fn fetch_index(&self) -> Result<Vec<ProgramIndexEntry>, HarvestError> {
        Ok(self.index.fetch_index().await?)
    }

    pub fn scope(
        &self,
        index: &[ProgramIndexEntry],
        selection: Selection,
    ) -> Result<RunScope, HarvestError> {
        Ok(resolve_scope(index, selection)?)
    }

    pub async fn fetch_scope(
        &self,
        scope: &RunScope,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> FetchSummary {
        self.controller.run_scope(scope, sink, cancel).await
    }

    pub fn normalize_scope(&self, scope: &RunScope) -> NormalizeReport {
        normalize_cached(self.cache(), &scope.programs, self.target_year)
    }

    pub fn write_table(
        &self,
        rows: &[NormalizedRow],
        destination: &Path,
    ) -> Result<ExportSummary, HarvestError> {
        Ok(self.writer.write(rows, destination)?)
    }
}
