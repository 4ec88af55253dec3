//! Run configuration: defaults, an optional RON file, then command-line
//! overrides, in that order.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use harvester_engine::{
    default_metric_columns, ControllerOptions, EngineConfig, Endpoints, FetchSettings,
    RetryPolicy, DEFAULT_BASE_URL,
};
use serde::{Deserialize, Serialize};

use crate::cli::GlobalArgs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter: policy.jitter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub output: PathBuf,
    pub target_year: i32,
    pub concurrency: usize,
    pub request_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
    pub retry: RetryConfig,
    pub metric_columns: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from("MajorTrans"),
            output: PathBuf::from("majortrans_2022.csv"),
            target_year: 2022,
            concurrency: 1,
            request_delay_ms: 0,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_bytes: fetch.max_bytes,
            retry: RetryConfig::default(),
            metric_columns: default_metric_columns(),
        }
    }
}

impl HarvestConfig {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &GlobalArgs) -> anyhow::Result<()> {
        if let Some(year) = args.year {
            self.target_year = year;
        }
        if let Some(out) = &args.out {
            self.output = out.clone();
        }
        if let Some(dir) = &args.cache_dir {
            self.cache_dir = dir.clone();
        }
        if let Some(url) = &args.base_url {
            self.base_url = url.clone();
        }
        if let Some(n) = args.concurrency {
            self.concurrency = n;
        }
        if let Some(secs) = args.sleep {
            let delay = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid --sleep value {secs}"))?;
            self.request_delay_ms = delay.as_millis() as u64;
        }
        self.validate()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            bail!("connect_timeout_secs and request_timeout_secs must be at least 1");
        }
        if self.max_bytes == 0 {
            bail!("max_bytes must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if !(self.retry.backoff_multiplier.is_finite() && self.retry.backoff_multiplier >= 1.0) {
            bail!("retry.backoff_multiplier must be a finite number >= 1");
        }
        Ok(())
    }

    pub fn engine_config(&self, force: bool) -> EngineConfig {
        EngineConfig {
            endpoints: Endpoints::new(self.base_url.clone()),
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                max_bytes: self.max_bytes,
                ..FetchSettings::default()
            },
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                backoff_multiplier: self.retry.backoff_multiplier,
                jitter: self.retry.jitter,
            },
            cache_dir: self.cache_dir.clone(),
            controller: ControllerOptions {
                force,
                concurrency: self.concurrency,
                request_delay: Duration::from_millis(self.request_delay_ms),
            },
            target_year: self.target_year,
            metric_columns: self.metric_columns.clone(),
        }
    }
}
