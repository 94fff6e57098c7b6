/// Async execution channel
///
/// Queue-triggered execution: inbound job messages carry a workflow id, a
/// wire-format wiring and a configuration block. Every job, whatever happens
/// to it, produces exactly one result envelope published under the job's
/// correlation key. No failure escapes the worker: deserialization,
/// resolution and engine errors all become `success=false` envelopes. Publish
/// failures are logged and swallowed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::catalog::types::IoType;
use crate::compiler::wiring::{from_wire_format, WireWiring};
use crate::runtime::engine::ExecutionResponse;
use crate::runtime::orchestrator::{Orchestrator, RunConfig};

/// Inbound job message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionJob {
    pub workflow_id: Uuid,
    #[serde(default)]
    pub workflow_wiring: WireWiring,
    #[serde(default)]
    pub configuration: Option<RunConfig>,
}

/// A raw inbound message with its correlation key. The payload is kept
/// unparsed so malformed messages still produce a result envelope.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub key: String,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub code: String,
    pub message: String,
}

/// Outbound result envelope, correlated with the inbound message's key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<JobError>,
    #[serde(default)]
    pub output_results_by_output_name: BTreeMap<String, Value>,
    #[serde(default)]
    pub output_types_by_output_name: BTreeMap<String, IoType>,
}

impl ExecutionOutcome {
    pub fn failure(code: &str, message: String) -> Self {
        Self {
            success: false,
            errors: vec![JobError {
                code: code.to_string(),
                message,
            }],
            output_results_by_output_name: BTreeMap::new(),
            output_types_by_output_name: BTreeMap::new(),
        }
    }

    pub fn from_response(response: ExecutionResponse) -> Self {
        match response.error {
            Some(error) => {
                let mut message = error;
                if let Some(traceback) = response.traceback {
                    message = format!("{}\n{}", message, traceback);
                }
                Self::failure("ENGINE", message)
            }
            None => Self {
                success: true,
                errors: vec![],
                output_results_by_output_name: response.output_results_by_output_name,
                output_types_by_output_name: response.output_types_by_output_name,
            },
        }
    }
}

/// Outbound seam for result envelopes. Real transports (queue producers) live
/// behind this; the default implementation just logs.
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish(&self, key: &str, outcome: &ExecutionOutcome) -> anyhow::Result<()>;
}

/// Publisher of last resort: writes envelopes to the log.
pub struct LogPublisher;

#[async_trait]
impl ResultPublisher for LogPublisher {
    async fn publish(&self, key: &str, outcome: &ExecutionOutcome) -> anyhow::Result<()> {
        tracing::info!(
            "job {} finished: success={} ({} outputs)",
            key,
            outcome.success,
            outcome.output_results_by_output_name.len()
        );
        Ok(())
    }
}

/// Create the bounded job channel the transport shell feeds into.
pub fn job_channel(capacity: usize) -> (mpsc::Sender<QueuedJob>, mpsc::Receiver<QueuedJob>) {
    mpsc::channel(capacity)
}

/// Worker loop: drain jobs until the channel closes, publishing one envelope
/// per job. Runs as a supervised task spawned at server startup.
pub async fn run_job_worker(
    mut jobs: mpsc::Receiver<QueuedJob>,
    orchestrator: Arc<Orchestrator>,
    publisher: Arc<dyn ResultPublisher>,
) {
    tracing::info!("job worker started");
    while let Some(job) = jobs.recv().await {
        tracing::info!("processing job {}", job.key);
        let outcome = process_job(&orchestrator, &job.payload).await;
        if let Err(e) = publisher.publish(&job.key, &outcome).await {
            tracing::error!("failed to publish result for job {}: {}", job.key, e);
        }
    }
    tracing::info!("job worker stopped");
}

async fn process_job(orchestrator: &Orchestrator, payload: &str) -> ExecutionOutcome {
    let job: ExecutionJob = match serde_json::from_str(payload) {
        Ok(job) => job,
        Err(e) => {
            tracing::error!("undecodable job message: {}", e);
            return ExecutionOutcome::failure("SERIALIZATION", e.to_string());
        }
    };

    let wiring = match from_wire_format(&job.workflow_wiring, "queued execution") {
        Ok(wiring) => wiring,
        Err(e) => {
            tracing::error!("job wiring rejected: {}", e);
            return ExecutionOutcome::failure(e.code(), e.to_string());
        }
    };

    match orchestrator
        .execute_workflow(job.workflow_id, &wiring, job.configuration.as_ref(), false)
        .await
    {
        Ok(response) => ExecutionOutcome::from_response(response),
        Err(e) => {
            tracing::error!("job execution failed: {}", e);
            ExecutionOutcome::failure(e.code(), e.to_string())
        }
    }
}
