//! Request intake for a benchmark run.
//!
//! A run is started in the background and the caller waits on it for a
//! bounded time. Waiting never cancels dispatch: a run that outlives the wait
//! keeps sending and can be waited on again.

use std::sync::Arc;
use std::time::Duration;

use bench_core::{BenchmarkRequest, BenchmarkResponse, RequestError, TestRunId};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::OrchestrationError;
use crate::orchestrator::{FanOutOrchestrator, FanOutReport};

/// How long a caller waits for a run before reporting it as still running.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP-style status codes reported with each response.
pub mod status {
    pub const OK: u16 = 200;
    pub const ACCEPTED: u16 = 202;
    pub const BAD_REQUEST: u16 = 400;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

/// State of a run as seen by a waiting caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed(FanOutReport),
    Failed(OrchestrationError),
    /// The wait timed out; dispatch is still in progress.
    Running(TestRunId),
}

impl RunStatus {
    pub fn status_code(&self) -> u16 {
        match self {
            RunStatus::Completed(_) => status::OK,
            RunStatus::Running(_) => status::ACCEPTED,
            RunStatus::Failed(_) => status::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn response(&self) -> BenchmarkResponse {
        match self {
            RunStatus::Completed(report) => BenchmarkResponse::TestRunId(report.test_run_id.clone()),
            RunStatus::Running(test_run_id) => BenchmarkResponse::TestRunId(test_run_id.clone()),
            RunStatus::Failed(e) => BenchmarkResponse::Error(e.to_string()),
        }
    }

    pub fn into_response(self) -> (u16, BenchmarkResponse) {
        (self.status_code(), self.response())
    }
}

/// Response for a request that never started a run.
pub fn rejection(error: &RequestError) -> (u16, BenchmarkResponse) {
    (status::BAD_REQUEST, BenchmarkResponse::Error(error.to_string()))
}

/// Handle to a run started by [`LoadEntryPoint::start`].
pub struct RunHandle {
    test_run_id: TestRunId,
    task: JoinHandle<Result<FanOutReport, OrchestrationError>>,
    finished: Option<RunStatus>,
}

impl RunHandle {
    pub fn test_run_id(&self) -> &TestRunId {
        &self.test_run_id
    }

    /// Wait up to `timeout` for the run to finish.
    ///
    /// Returns [`RunStatus::Running`] on timeout without touching the
    /// background task. Once the run has finished, every later call returns
    /// the same status immediately.
    pub async fn wait(&mut self, timeout: Duration) -> RunStatus {
        if let Some(status) = &self.finished {
            return status.clone();
        }

        let status = match tokio::time::timeout(timeout, &mut self.task).await {
            Err(_) => {
                warn!(
                    "Run {} still dispatching after {:?}; returning while it continues",
                    self.test_run_id, timeout
                );
                return RunStatus::Running(self.test_run_id.clone());
            }
            Ok(Ok(Ok(report))) => RunStatus::Completed(report),
            Ok(Ok(Err(e))) => RunStatus::Failed(e),
            Ok(Err(join_error)) => RunStatus::Failed(OrchestrationError::TaskFailed {
                test_run_id: self.test_run_id.clone(),
                reason: join_error.to_string(),
            }),
        };

        self.finished = Some(status.clone());
        status
    }
}

/// Turns benchmark requests into running fan-outs.
#[derive(Clone)]
pub struct LoadEntryPoint {
    orchestrator: Arc<FanOutOrchestrator>,
}

impl LoadEntryPoint {
    pub fn new(orchestrator: FanOutOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn orchestrator(&self) -> &FanOutOrchestrator {
        &self.orchestrator
    }

    /// Validate `request`, assign a fresh test run id and start dispatching.
    pub fn start(&self, request: &BenchmarkRequest) -> Result<RunHandle, RequestError> {
        let broker = self.orchestrator.broker();
        request.validate_for(broker)?;

        let test_run_id = TestRunId::generate();
        info!(
            "Received benchmark request for {}: {} {}(s) x {} message(s), work time {:?}. Test run {}",
            broker,
            request.groups,
            broker.group_unit(),
            request.messages_per_group,
            request.effective_work_time_ms(),
            test_run_id
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let groups = request.groups;
        let per_group = request.messages_per_group;
        let work_time_ms = request.effective_work_time_ms();
        let run_id = test_run_id.clone();
        let task = tokio::spawn(async move {
            orchestrator
                .fan(groups, per_group, run_id, work_time_ms)
                .await
        });

        Ok(RunHandle {
            test_run_id,
            task,
            finished: None,
        })
    }

    /// Parse a JSON request body and start it.
    pub fn start_json(&self, body: &str) -> Result<RunHandle, RequestError> {
        let request = BenchmarkRequest::from_json(body)?;
        self.start(&request)
    }

    /// Start a run, wait for it, and produce the caller-facing response.
    pub async fn handle(&self, body: &str, timeout: Duration) -> (u16, BenchmarkResponse) {
        match self.start_json(body) {
            Ok(mut handle) => handle.wait(timeout).await.into_response(),
            Err(e) => {
                warn!("Rejected benchmark request: {}", e);
                rejection(&e)
            }
        }
    }
}
