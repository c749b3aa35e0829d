//! services/api/src/generation/job.rs
//!
//! Asynchronous generation jobs.
//!
//! `JobQueue::dispatch` records the job as queued and hands it to a pool of
//! worker tasks over a bounded channel. A worker marks the job running,
//! runs the pipeline (retrying transient failures up to the configured
//! number of tries) and writes exactly one terminal record. Callers poll
//! `JobQueue::status`; records expire after the job TTL.

use campus_ai_core::{
    fingerprint, validation, AsyncJobRecord, AttachmentId, CacheStore, ContentType,
    FileStorage, GeneratedContent, GenerationError, GenerationInput, GenerationOptions,
    PortError, ResourceId, ResourceRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::pipeline::{resolve_attachment, ContentGenerator};

/// Error stored for jobs dropped from the queue at shutdown.
pub const SHUTDOWN_REASON: &str = "service shutting down";

/// A unit of queued work.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub job_id: Uuid,
    pub content_type: ContentType,
    pub resource_id: ResourceId,
    pub attachment_id: Option<AttachmentId>,
    pub options: GenerationOptions,
}

//=========================================================================================
// Job Orchestrator
//=========================================================================================

/// Runs one job to a terminal record. Never returns an error: every failure
/// is logged and stored as a `Failed` record.
pub struct JobOrchestrator {
    generator: Arc<ContentGenerator>,
    resources: Arc<dyn ResourceRepository>,
    storage: Arc<dyn FileStorage>,
    records: Arc<dyn CacheStore>,
    record_ttl: Duration,
    tries: u32,
}

impl JobOrchestrator {
    pub fn new(
        generator: Arc<ContentGenerator>,
        resources: Arc<dyn ResourceRepository>,
        storage: Arc<dyn FileStorage>,
        records: Arc<dyn CacheStore>,
        record_ttl: Duration,
        tries: u32,
    ) -> Self {
        Self {
            generator,
            resources,
            storage,
            records,
            record_ttl,
            tries: tries.max(1),
        }
    }

    pub async fn handle(&self, job: &GenerationJob) {
        if let Some(existing) = read_record(self.records.as_ref(), job.job_id).await {
            if existing.status.is_terminal() {
                info!(job_id = %job.job_id, "Job already finished, skipping");
                return;
            }
        }

        self.write(&AsyncJobRecord::running(
            job.job_id,
            job.content_type,
            job.resource_id,
            job.attachment_id,
        ))
        .await;

        let mut attempt = 0;
        let record = loop {
            attempt += 1;
            match self.run(job).await {
                Ok((content, attachment_id)) => {
                    info!(
                        job_id = %job.job_id,
                        resource_id = job.resource_id,
                        attachment_id,
                        content_type = %job.content_type,
                        attempt,
                        "AI generation job completed"
                    );
                    break AsyncJobRecord::completed(
                        job.job_id,
                        job.resource_id,
                        Some(attachment_id),
                        content,
                        chrono::Utc::now(),
                    );
                }
                Err(e) if e.is_transient() && attempt < self.tries => {
                    warn!(
                        job_id = %job.job_id,
                        attempt,
                        error = %e,
                        "AI generation job attempt failed, retrying"
                    );
                }
                Err(e) => {
                    error!(
                        job_id = %job.job_id,
                        resource_id = job.resource_id,
                        attachment_id = ?job.attachment_id,
                        content_type = %job.content_type,
                        attempt,
                        error = %e,
                        "AI generation job failed"
                    );
                    break AsyncJobRecord::failed(
                        job.job_id,
                        job.content_type,
                        job.resource_id,
                        job.attachment_id,
                        e.to_string(),
                    );
                }
            }
        };

        self.write(&record).await;
    }

    /// Stores a `Failed` record for a job that will not be run.
    pub async fn abandon(&self, job: &GenerationJob, reason: &str) {
        warn!(job_id = %job.job_id, reason, "AI generation job abandoned");
        self.write(&AsyncJobRecord::failed(
            job.job_id,
            job.content_type,
            job.resource_id,
            job.attachment_id,
            reason.to_string(),
        ))
        .await;
    }

    async fn run(
        &self,
        job: &GenerationJob,
    ) -> Result<(GeneratedContent, AttachmentId), GenerationError> {
        let attachment =
            resolve_attachment(&self.resources, job.resource_id, job.attachment_id).await?;
        let source_path = self.storage.stage(&attachment).await?;

        let content = self
            .generator
            .generate(GenerationInput {
                content_type: job.content_type,
                source_path,
                mime_type: attachment.mime_type.clone(),
                options: job.options.clone(),
            })
            .await?;
        Ok((content, attachment.id))
    }

    async fn write(&self, record: &AsyncJobRecord) {
        if let Err(e) = write_record(self.records.as_ref(), record, self.record_ttl).await {
            error!(job_id = %record.job_id, error = %e, "Failed to store job record");
        }
    }
}

async fn read_record(records: &dyn CacheStore, job_id: Uuid) -> Option<AsyncJobRecord> {
    let value = records
        .get(&fingerprint::job_key(&job_id))
        .await
        .map_err(|e| warn!(job_id = %job_id, error = %e, "Failed to read job record"))
        .ok()??;
    serde_json::from_value(value)
        .map_err(|e| warn!(job_id = %job_id, error = %e, "Undecodable job record"))
        .ok()
}

async fn write_record(
    records: &dyn CacheStore,
    record: &AsyncJobRecord,
    ttl: Duration,
) -> Result<(), PortError> {
    let value = serde_json::to_value(record).map_err(|e| PortError::Unexpected(e.to_string()))?;
    records
        .put(&fingerprint::job_key(&record.job_id), value, ttl)
        .await
}

//=========================================================================================
// Job Queue
//=========================================================================================

pub struct JobQueue {
    sender: mpsc::Sender<GenerationJob>,
    records: Arc<dyn CacheStore>,
    record_ttl: Duration,
}

impl JobQueue {
    /// Starts `workers` worker tasks draining a channel of `capacity` jobs.
    /// Workers stop when `shutdown` is cancelled or the queue is dropped.
    pub fn start(
        orchestrator: Arc<JobOrchestrator>,
        records: Arc<dyn CacheStore>,
        record_ttl: Duration,
        workers: usize,
        capacity: usize,
        shutdown: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    orchestrator.clone(),
                    receiver.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        (
            Self {
                sender,
                records,
                record_ttl,
            },
            handles,
        )
    }

    /// Validates the parameters, records the job as queued and enqueues it.
    /// Returns the job identifier to poll.
    pub async fn dispatch(
        &self,
        content_type: ContentType,
        resource_id: ResourceId,
        attachment_id: Option<AttachmentId>,
        options: GenerationOptions,
    ) -> Result<Uuid, GenerationError> {
        validation::validate_parameters(content_type, &options)?;

        // Claim a slot first: no record is written for a job that cannot be queued.
        let permit = self.sender.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => GenerationError::Unavailable("job queue is full".to_string()),
            TrySendError::Closed(()) => {
                GenerationError::Unavailable("job queue is shutting down".to_string())
            }
        })?;

        let job_id = Uuid::new_v4();
        write_record(
            self.records.as_ref(),
            &AsyncJobRecord::queued(job_id, content_type, resource_id, attachment_id),
            self.record_ttl,
        )
        .await?;
        permit.send(GenerationJob {
            job_id,
            content_type,
            resource_id,
            attachment_id,
            options,
        });

        // Shutdown may have drained the queue while the record was written.
        if self.sender.is_closed() {
            let record = AsyncJobRecord::failed(
                job_id,
                content_type,
                resource_id,
                attachment_id,
                SHUTDOWN_REASON.to_string(),
            );
            if let Err(e) = write_record(self.records.as_ref(), &record, self.record_ttl).await {
                error!(job_id = %job_id, error = %e, "Failed to store job record");
            }
            return Err(GenerationError::Unavailable(
                "job queue is shutting down".to_string(),
            ));
        }

        info!(job_id = %job_id, resource_id, content_type = %content_type, "AI generation job queued");
        Ok(job_id)
    }

    /// The latest record of a job, or `None` if the id is unknown or expired.
    pub async fn status(&self, job_id: Uuid) -> Option<AsyncJobRecord> {
        read_record(self.records.as_ref(), job_id).await
    }
}

async fn worker_loop(
    worker: usize,
    orchestrator: Arc<JobOrchestrator>,
    receiver: Arc<Mutex<mpsc::Receiver<GenerationJob>>>,
    shutdown: CancellationToken,
) {
    info!(worker, "AI job worker started");
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            job = async { receiver.lock().await.recv().await } => job,
        };
        let Some(job) = next else {
            break;
        };
        orchestrator.handle(&job).await;
    }

    // Jobs still waiting will never run; close them out so pollers see it.
    let mut receiver = receiver.lock().await;
    receiver.close();
    while let Ok(job) = receiver.try_recv() {
        orchestrator.abandon(&job, SHUTDOWN_REASON).await;
    }
    info!(worker, "AI job worker stopped");
}
