// Phase 9: 全ジョブ実行 + 単一ジョブ受付サービス

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, warn};

use crate::error::StitchError;
use crate::pipeline::job_runner::{JobConfig, JobResult, StitchOutput, process, run_job};

/// Run multiple jobs, collecting results.
/// One job failure does NOT prevent other jobs from running.
pub fn run_all_jobs(jobs: &[JobConfig]) -> Vec<crate::error::Result<JobResult>> {
    jobs.iter().map(run_job).collect()
}

/// 単一ジョブの受付窓口。
///
/// 同時に実行できるジョブは1つだけ。実行中に `submit` すると
/// キューに積まずに `StitchError::Busy` を即座に返す。
/// ジョブは専用ワーカースレッドで実行され、完了（成功・失敗とも）は
/// `JobHandle` に正確に1回だけ届く。
#[derive(Debug, Default)]
pub struct StitchService {
    busy: Arc<AtomicBool>,
}

impl StitchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a job is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start the full pipeline for `job` on the worker thread.
    pub fn submit(&self, job: JobConfig) -> crate::error::Result<JobHandle<StitchOutput>> {
        self.spawn_job(move || {
            process(
                &job.top_path,
                &job.bottom_path,
                &job.page,
                job.output_kind,
                &job.options,
            )
        })
    }

    /// Like [`StitchService::submit`], but also writes the output file.
    pub fn submit_to_file(&self, job: JobConfig) -> crate::error::Result<JobHandle<JobResult>> {
        self.spawn_job(move || run_job(&job))
    }

    fn spawn_job<T, F>(&self, work: F) -> crate::error::Result<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StitchError::busy("a stitch job is already running"));
        }

        let (tx, rx) = mpsc::channel();
        let busy = Arc::clone(&self.busy);

        let spawned = thread::Builder::new()
            .name("stitch-worker".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(
                    |payload| Err(StitchError::worker(panic_message(payload.as_ref()))),
                );
                // Clear before notifying so the receiver may resubmit immediately.
                busy.store(false, Ordering::Release);
                if tx.send(outcome).is_err() {
                    debug!("job handle dropped before completion");
                }
            });

        if let Err(e) = spawned {
            self.busy.store(false, Ordering::Release);
            warn!(error = %e, "failed to start worker thread");
            return Err(StitchError::worker(format!(
                "failed to start worker thread: {e}"
            )));
        }

        Ok(JobHandle { rx })
    }
}

/// Receives the single completion of a submitted job.
///
/// Consuming methods guarantee the completion is observed at most once.
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: Receiver<crate::error::Result<T>>,
}

impl<T> JobHandle<T> {
    /// Block until the job finishes.
    pub fn wait(self) -> crate::error::Result<T> {
        self.rx.recv().unwrap_or_else(|_| {
            Err(StitchError::worker(
                "worker exited without reporting a result",
            ))
        })
    }

    /// Return the completion if it is ready, otherwise hand the handle back.
    pub fn try_wait(self) -> std::result::Result<crate::error::Result<T>, Self> {
        match self.rx.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(StitchError::worker(
                "worker exited without reporting a result",
            ))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}
