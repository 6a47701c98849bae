// jobs/controller.rs - single-worker background job state machine
//
//   Idle ──start──▶ Running ──worker done──▶ Completed
//                      │
//                      ├──abort / worker error──▶ Aborted
//
// Every `start` leaves Completed/Aborted behind and discards the previous
// result. The worker owns its output buffer until it hands it over through
// the channel; nothing else is shared with it apart from the cancel flag.

use crate::error::{HeatmapError, HeatmapResult};
use crate::eval::cache::GridCache;
use crate::eval::pipeline::{run_region, JobOutput, SourceData};
use crate::schema::{HeatmapConfig, Rect, TerrainContext};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Everything a job needs, captured by value when it starts.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub config: HeatmapConfig,
    pub ctx: TerrainContext,
    pub source: SourceData,
    pub rect: Rect,
    pub cache: Option<Arc<GridCache>>,
}

enum JobEvent {
    Finished(HeatmapResult<JobOutput>),
}

struct JobHandle {
    cancel: Arc<AtomicBool>,
    receiver: mpsc::Receiver<JobEvent>,
    handle: Option<JoinHandle<()>>,
}

/// Runs one job at a time on a background thread.
#[derive(Default)]
pub struct JobController {
    status: JobStatus,
    job: Option<JobHandle>,
    rect: Option<Rect>,
    result: Option<JobOutput>,
    last_error: Option<HeatmapError>,
}

impl JobController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Sub-rectangle of the current or most recent job.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Error that ended the most recent job, if it was not a cancellation.
    pub fn last_error(&self) -> Option<&HeatmapError> {
        self.last_error.as_ref()
    }

    /// Spawn a worker for `request`. Fails if a job is still running.
    pub fn start(&mut self, request: JobRequest) -> HeatmapResult<()> {
        if self.poll() == JobStatus::Running {
            return Err(HeatmapError::JobAlreadyRunning);
        }

        self.result = None;
        self.last_error = None;
        self.rect = Some(request.rect);

        let (sender, receiver) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_thread = Arc::clone(&cancel);

        log::debug!(
            "starting job for '{}' over {:?}",
            request.config.name,
            request.rect
        );
        let handle = thread::spawn(move || {
            let JobRequest {
                config,
                ctx,
                source,
                rect,
                cache,
            } = request;
            let result = run_region(&config, &ctx, &source, rect, &cancel_thread, cache.as_deref());
            // The receiver is gone if the job was aborted.
            let _ = sender.send(JobEvent::Finished(result));
        });

        self.job = Some(JobHandle {
            cancel,
            receiver,
            handle: Some(handle),
        });
        self.status = JobStatus::Running;
        Ok(())
    }

    /// Non-blocking completion check.
    pub fn poll(&mut self) -> JobStatus {
        let Some(job) = self.job.as_ref() else {
            return self.status;
        };
        match job.receiver.try_recv() {
            Ok(JobEvent::Finished(result)) => self.finish(result),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.worker_lost(),
        }
        self.status
    }

    /// Block until the job finishes or `timeout` elapses. On timeout the job
    /// keeps running; aborting it is up to the caller.
    pub fn wait(&mut self, timeout: Duration) -> JobStatus {
        let Some(job) = self.job.as_ref() else {
            return self.status;
        };
        match job.receiver.recv_timeout(timeout) {
            Ok(JobEvent::Finished(result)) => self.finish(result),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.worker_lost(),
        }
        self.status
    }

    /// Cancel the running job. Its output is discarded; the worker stops at
    /// its next row boundary without being joined.
    pub fn abort(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel.store(true, Ordering::Relaxed);
            log::debug!("aborting job over {:?}", self.rect);
        }
        if self.status == JobStatus::Running {
            self.status = JobStatus::Aborted;
        }
        self.result = None;
    }

    /// Output of the last job, only while it is `Completed`.
    pub fn result(&self) -> Option<&JobOutput> {
        match self.status {
            JobStatus::Completed => self.result.as_ref(),
            _ => None,
        }
    }

    pub fn take_result(&mut self) -> Option<JobOutput> {
        match self.status {
            JobStatus::Completed => self.result.take(),
            _ => None,
        }
    }

    fn finish(&mut self, result: HeatmapResult<JobOutput>) {
        if let Some(mut job) = self.job.take() {
            if let Some(handle) = job.handle.take() {
                // The worker has already sent its only message.
                let _ = handle.join();
            }
        }
        match result {
            Ok(output) => {
                self.result = Some(output);
                self.status = JobStatus::Completed;
            }
            Err(HeatmapError::Cancelled) => {
                self.status = JobStatus::Aborted;
            }
            Err(e) => {
                log::warn!("heatmap job over {:?} failed: {e}", self.rect);
                self.last_error = Some(e);
                self.status = JobStatus::Aborted;
            }
        }
    }

    fn worker_lost(&mut self) {
        log::warn!("heatmap job over {:?} ended without a result", self.rect);
        self.job = None;
        self.status = JobStatus::Aborted;
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        if let Some(job) = self.job.as_ref() {
            job.cancel.store(true, Ordering::Relaxed);
        }
    }
}
