//! Shared fixtures for the integration tests: scripted model, in-memory
//! resource repository and a fully wired `AppState` over a temp storage root.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::adapters::{LocalStorageAdapter, MokaCacheAdapter};
use api_lib::config::Config;
use api_lib::generation::{
    ContentGenerator, JobOrchestrator, JobQueue, Memoizer, RetryPolicy, RetryingGateway,
};
use api_lib::web::AppState;
use async_trait::async_trait;
use campus_ai_core::{
    AsyncJobRecord, CacheStore, FileStorage, GatewayError, GatewayRequest, GenerativeModel,
    JobStatus, PortError, PortResult, ResourceAttachment, ResourceId, ResourceRepository,
};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Scripted model
// ---------------------------------------------------------------------------

/// Answers from a script; once the script runs out, repeats `fallback`.
/// A gated model holds every call until `open_gate` lets it through.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<Value, GatewayError>>>,
    fallback: Result<Value, GatewayError>,
    requests: Mutex<Vec<GatewayRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedModel {
    pub fn always(response: Result<Value, GatewayError>) -> Arc<Self> {
        Self::scripted(Vec::new(), response)
    }

    pub fn scripted(
        script: Vec<Result<Value, GatewayError>>,
        fallback: Result<Value, GatewayError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(response: Result<Value, GatewayError>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: response,
            requests: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    /// Lets `calls` more held calls complete.
    pub fn open_gate(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GatewayRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: &GatewayRequest) -> Result<Value, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn unavailable() -> GatewayError {
    GatewayError::Status {
        status: 503,
        body: "model overloaded".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Model payloads
// ---------------------------------------------------------------------------

/// Wraps model text in the `generateContent` response envelope.
pub fn envelope(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

pub fn quiz_json(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|i| {
                json!({
                    "question": format!("Question {i}?"),
                    "options": [format!("Right {i}"), "Wrong A", "Wrong B", "Wrong C"],
                    "correct_answer": format!("Right {i}"),
                    "explanation": format!("Because {i}.")
                })
            })
            .collect(),
    )
}

pub fn summary_json() -> Value {
    json!({
        "introduction": "The material covers cell biology.",
        "concept_summaries": {
            "Cell membrane": "Controls what enters and leaves the cell.",
            "Mitochondria": "Produce ATP."
        },
        "summary_type": "concise",
        "word_count": 42,
        "key_topics": ["cells"],
        "confidence_score": 0.8
    })
}

// ---------------------------------------------------------------------------
// In-memory resource repository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryResources {
    resources: Mutex<HashMap<ResourceId, Vec<ResourceAttachment>>>,
    failures_left: Mutex<u32>,
    calls: AtomicUsize,
}

impl InMemoryResources {
    pub fn insert(&self, resource_id: ResourceId, attachments: Vec<ResourceAttachment>) {
        self.resources
            .lock()
            .unwrap()
            .insert(resource_id, attachments);
    }

    /// Makes the next `count` lookups fail with an unexpected error.
    pub fn fail_next(&self, count: u32) {
        *self.failures_left.lock().unwrap() = count;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResources {
    async fn attachments_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> PortResult<Vec<ResourceAttachment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures_left = self.failures_left.lock().unwrap();
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(PortError::Unexpected("connection reset".to_string()));
            }
        }
        self.resources
            .lock()
            .unwrap()
            .get(&resource_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Resource {resource_id}")))
    }
}

// ---------------------------------------------------------------------------
// Wired application
// ---------------------------------------------------------------------------

/// Test configuration; `overrides` win over the defaults below.
pub fn test_config(storage_root: &Path, overrides: &[(&str, &str)]) -> Config {
    let root = storage_root.display().to_string();
    Config::from_lookup(|name| {
        if let Some((_, value)) = overrides.iter().find(|(key, _)| *key == name) {
            return Some(value.to_string());
        }
        match name {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "STORAGE_ROOT" => Some(root.clone()),
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            "GEMINI_BACKOFF_BASE_MS" => Some("1".to_string()),
            "AI_JOB_WORKERS" => Some("1".to_string()),
            _ => None,
        }
    })
    .unwrap()
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub model: Arc<ScriptedModel>,
    pub resources: Arc<InMemoryResources>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub results: Arc<dyn CacheStore>,
    pub job_records: Arc<dyn CacheStore>,
    pub workers: Vec<JoinHandle<()>>,
    pub storage_root: tempfile::TempDir,
    pub shutdown: CancellationToken,
}

impl TestApp {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        Self::with_env(model, &[])
    }

    pub fn with_env(model: Arc<ScriptedModel>, overrides: &[(&str, &str)]) -> Self {
        let storage_root = tempfile::tempdir().unwrap();
        let config = Arc::new(test_config(storage_root.path(), overrides));

        let resources = Arc::new(InMemoryResources::default());
        let storage: Arc<dyn FileStorage> =
            Arc::new(LocalStorageAdapter::new(config.storage_root.clone()));
        let results: Arc<dyn CacheStore> = Arc::new(MokaCacheAdapter::new(1_000));
        let job_records: Arc<dyn CacheStore> = Arc::new(MokaCacheAdapter::new(1_000));

        let gateway = RetryingGateway::new(
            model.clone(),
            RetryPolicy {
                max_attempts: config.gemini.max_attempts,
                base_delay: config.gemini.backoff_base,
            },
        );
        let generator = Arc::new(
            ContentGenerator::new(
                gateway,
                Memoizer::new(results.clone(), config.single_flight),
                config.cache_ttl,
            )
            .with_generation_config(config.gemini.generation),
        );

        let shutdown = CancellationToken::new();
        let orchestrator = Arc::new(JobOrchestrator::new(
            generator.clone(),
            resources.clone(),
            storage.clone(),
            job_records.clone(),
            config.job_ttl,
            config.job_tries,
        ));
        let (jobs, workers) = JobQueue::start(
            orchestrator.clone(),
            job_records.clone(),
            config.job_ttl,
            config.job_workers,
            16,
            shutdown.clone(),
        );

        let state = Arc::new(AppState {
            resources: resources.clone(),
            storage,
            generator,
            jobs: Arc::new(jobs),
        });

        Self {
            state,
            model,
            resources,
            orchestrator,
            results,
            job_records,
            workers,
            storage_root,
            shutdown,
        }
    }

    /// Writes a file under the storage root and registers it as the given
    /// attachment of the resource.
    pub fn add_attachment(
        &self,
        resource_id: ResourceId,
        attachment_id: i64,
        file_name: &str,
        mime_type: &str,
        contents: &[u8],
    ) -> ResourceAttachment {
        let relative = format!("resources/{resource_id}/{file_name}");
        let path = self.storage_root.path().join(&relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();

        let attachment = ResourceAttachment {
            id: attachment_id,
            resource_id,
            file_name: file_name.to_string(),
            file_path: relative,
            mime_type: mime_type.to_string(),
            size: contents.len() as i64,
        };
        let mut attachments = self
            .resources
            .attachments_for_resource_sync(resource_id);
        attachments.push(attachment.clone());
        self.resources.insert(resource_id, attachments);
        attachment
    }

    pub fn router(&self) -> axum::Router {
        api_lib::web::router(self.state.clone())
    }

    /// Stops the workers and waits for them to finish.
    pub async fn stop_workers(&mut self) {
        self.shutdown.cancel();
        for worker in std::mem::take(&mut self.workers) {
            worker.await.unwrap();
        }
    }

    /// Polls until the job's record reaches `status`.
    pub async fn wait_for_status(&self, job_id: Uuid, status: JobStatus) -> AsyncJobRecord {
        for _ in 0..500 {
            if let Some(record) = self.state.jobs.status(job_id).await {
                if record.status == status {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never reached {status:?}");
    }

    /// Polls until the job reaches a terminal record.
    pub async fn wait_for_job(&self, job_id: Uuid) -> AsyncJobRecord {
        for _ in 0..500 {
            if let Some(record) = self.state.jobs.status(job_id).await {
                if record.status.is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not finish");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl InMemoryResources {
    fn attachments_for_resource_sync(&self, resource_id: ResourceId) -> Vec<ResourceAttachment> {
        self.resources
            .lock()
            .unwrap()
            .get(&resource_id)
            .cloned()
            .unwrap_or_default()
    }
}
