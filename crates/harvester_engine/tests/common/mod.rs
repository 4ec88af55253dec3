#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harvester_engine::{
    DetailFetcher, Endpoints, FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher,
    HarvestEvent, ProgressSink, RetryPolicy,
};
use serde_json::json;

pub const BASE: &str = "http://api.test/api";

pub fn init_logging() {
    engine_logging::initialize_for_tests();
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

pub fn detail_body(program_id: i64) -> Vec<u8> {
    json!({"degreeLevelData": [
        {"instituteLegalName": format!("Institute {program_id}"), "year": 2022, "wagesYear1": program_id * 100},
        {"instituteLegalName": "Shared College", "year": 2021, "wagesYear1": 1}
    ]})
    .to_string()
    .into_bytes()
}

pub fn index_body(ids: impl IntoIterator<Item = i64>) -> Vec<u8> {
    let entries: Vec<_> = ids
        .into_iter()
        .map(|id| json!({"programId": id, "programLongName": format!("Program {id}")}))
        .collect();
    serde_json::Value::Array(entries).to_string().into_bytes()
}

/// In-memory API: serves scripted bodies and scripted failures, records
/// every requested URL.
#[derive(Default)]
pub struct FakeApi {
    index: Option<Vec<u8>>,
    details: HashMap<i64, Vec<u8>>,
    failures: Mutex<HashMap<i64, VecDeque<FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_programs(ids: impl IntoIterator<Item = i64> + Clone) -> Self {
        let mut api = Self {
            index: Some(index_body(ids.clone())),
            ..Self::default()
        };
        for id in ids {
            api.details.insert(id, detail_body(id));
        }
        api
    }

    pub fn set_detail(&mut self, id: i64, body: impl Into<Vec<u8>>) {
        self.details.insert(id, body.into());
    }

    /// The next `times` requests for `id` fail with `kind`.
    pub fn fail(&self, id: i64, kind: FailureKind, times: usize) {
        let mut failures = self.failures.lock().unwrap();
        let queue = failures.entry(id).or_default();
        for _ in 0..times {
            queue.push_back(FetchError::new(kind.clone(), "scripted failure"));
        }
    }

    pub fn detail_calls(&self, id: i64) -> usize {
        let suffix = format!("/MajorTrans/{id}");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.ends_with(&suffix))
            .count()
    }

    pub fn total_detail_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains("/MajorTrans/"))
            .count()
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.ends_with("/Majors") {
            return self
                .index
                .clone()
                .ok_or_else(|| FetchError::new(FailureKind::HttpStatus(500), "no index"));
        }
        let id: i64 = url
            .rsplit('/')
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| FetchError::new(FailureKind::InvalidUrl, url.to_string()))?;
        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&id)
            .and_then(|q| q.pop_front())
        {
            return Err(err);
        }
        self.details
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::new(FailureKind::HttpStatus(404), "not found"))
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeApi {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let bytes = self.respond(url)?;
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                content_type: Some("application/json".to_string()),
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

pub fn detail_fetcher(api: Arc<FakeApi>, retry: RetryPolicy) -> DetailFetcher {
    DetailFetcher::new(api, Endpoints::new(BASE), retry)
}

#[derive(Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<HarvestEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: HarvestEvent) {
        self.events.lock().unwrap().push(event);
    }
}
