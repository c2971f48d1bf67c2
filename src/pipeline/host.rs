//! The execution host: state machine and worker-thread handoff.
//!
//! The host owns the pipeline between runs and is the only component that
//! moves it across threads. Preflight runs synchronously on the caller's
//! thread; the execute path runs on a dedicated worker thread so the caller
//! stays responsive for Cancel and live message rendering. Completion
//! travels back over a bounded crossbeam channel, and the worker returns the
//! pipeline itself through its join handle.
//!
//! State machine: Idle -> Preflighting -> Ready -> Running ->
//! (Cancelling | Finishing) -> Idle. Editing access to the pipeline is
//! gated on state, so stage parameters cannot change while a run holds the
//! data store.

use crate::pipeline::executor::{Pipeline, RunSummary};
use crate::pipeline::stage::ErrorCode;
use crate::store::DataStore;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

/// Host lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Idle,
    Preflighting,
    Ready,
    Running,
    Cancelling,
    Finishing,
}

/// Host state-machine misuse and worker failures.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Cannot start an empty pipeline")]
    EmptyPipeline,

    #[error("Operation not allowed in state {0:?}")]
    NotReady(HostState),

    #[error("Final preflight failed with code {0}")]
    PreflightFailed(ErrorCode),

    #[error("No run in progress")]
    NotRunning,

    #[error("Worker thread panicked; pipeline lost")]
    WorkerPanicked,
}

/// Runs a pipeline off the interactive thread with cooperative cancellation
/// and snapshot/restore of the data store around each run.
pub struct ExecutionHost {
    state: HostState,
    pipeline: Option<Pipeline>,
    worker: Option<JoinHandle<Pipeline>>,
    done_rx: Option<Receiver<RunSummary>>,
    cancel: Option<Arc<AtomicBool>>,
    snapshot: Option<DataStore>,
}

impl ExecutionHost {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            state: HostState::Idle,
            pipeline: Some(pipeline),
            worker: None,
            done_rx: None,
            cancel: None,
            snapshot: None,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Read access to the pipeline. `None` while a run holds it.
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Edit access to the pipeline. `None` while a run holds it; any edit
    /// access invalidates a previous successful preflight (Ready -> Idle),
    /// mirroring the rule that every pipeline edit triggers a fresh
    /// preflight.
    pub fn pipeline_mut(&mut self) -> Option<&mut Pipeline> {
        match self.state {
            HostState::Idle | HostState::Ready => {
                self.state = HostState::Idle;
                self.pipeline.as_mut()
            }
            _ => None,
        }
    }

    /// Synchronous preflight on the caller's thread.
    ///
    /// Transitions Idle -> Preflighting -> Ready on success, back to Idle on
    /// a negative code. The code is also reported through the pipeline's
    /// issues cache.
    pub fn preflight(&mut self) -> Result<ErrorCode, HostError> {
        match self.state {
            HostState::Idle | HostState::Ready => {}
            other => return Err(HostError::NotReady(other)),
        }
        self.state = HostState::Preflighting;
        // The pipeline is present in every non-running state.
        let code = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.preflight(),
            None => {
                self.state = HostState::Idle;
                return Err(HostError::NotReady(HostState::Idle));
            }
        };
        self.state = if code < 0 {
            HostState::Idle
        } else {
            HostState::Ready
        };
        Ok(code)
    }

    /// Whether Start is currently allowed: a successful preflight is in
    /// effect and the pipeline has at least one stage.
    pub fn can_start(&self) -> bool {
        self.state == HostState::Ready
            && self.pipeline.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Enter Running: final preflight check, snapshot the data store, hand
    /// the pipeline to a worker thread.
    pub fn start(&mut self) -> Result<(), HostError> {
        if self.state != HostState::Ready {
            return Err(HostError::NotReady(self.state));
        }
        let Some(mut pipeline) = self.pipeline.take() else {
            return Err(HostError::NotReady(self.state));
        };
        if pipeline.is_empty() {
            self.pipeline = Some(pipeline);
            return Err(HostError::EmptyPipeline);
        }

        // One last chance to preflight before anything is mutated.
        let code = pipeline.preflight();
        if code < 0 {
            self.pipeline = Some(pipeline);
            self.state = HostState::Idle;
            return Err(HostError::PreflightFailed(code));
        }

        self.snapshot = Some(pipeline.store().clone());
        pipeline.clear_cancel();
        self.cancel = Some(pipeline.cancel_flag());

        let (done_tx, done_rx) = bounded(1);
        let name = pipeline.name().to_string();
        let worker = std::thread::spawn(move || {
            let summary = pipeline.run();
            // Receiver may be gone if the host was dropped mid-run.
            let _ = done_tx.send(summary);
            pipeline
        });
        tracing::info!("Pipeline '{}' handed to worker thread", name);

        self.worker = Some(worker);
        self.done_rx = Some(done_rx);
        self.state = HostState::Running;
        Ok(())
    }

    /// Request cooperative cancellation of the running pipeline. The flag is
    /// observed between stages; the host still waits for the worker to stop.
    pub fn cancel(&mut self) {
        if self.state == HostState::Running {
            if let Some(cancel) = &self.cancel {
                cancel.store(true, Ordering::Relaxed);
            }
            self.state = HostState::Cancelling;
            tracing::info!("Cancellation requested");
        }
    }

    /// Non-blocking completion check. Returns `Ok(Some(summary))` exactly
    /// once per run, after restoring the store snapshot and flushing cached
    /// messages.
    pub fn poll(&mut self) -> Result<Option<RunSummary>, HostError> {
        match self.state {
            HostState::Running | HostState::Cancelling => {}
            _ => return Ok(None),
        }
        let Some(done_rx) = &self.done_rx else {
            return Ok(None);
        };
        match done_rx.try_recv() {
            Ok(summary) => self.finish(summary).map(Some),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                // Worker died without reporting: surface the panic.
                Err(self.finish_lost())
            }
        }
    }

    /// Block until the running pipeline completes.
    pub fn wait(&mut self) -> Result<RunSummary, HostError> {
        match self.state {
            HostState::Running | HostState::Cancelling => {}
            _ => return Err(HostError::NotRunning),
        }
        let Some(done_rx) = self.done_rx.take() else {
            return Err(HostError::NotRunning);
        };
        match done_rx.recv() {
            Ok(summary) => self.finish(summary),
            Err(_) => Err(self.finish_lost()),
        }
    }

    /// Finishing: join the worker (it has already signalled completion, so
    /// this only reclaims the pipeline), restore the pre-run store snapshot,
    /// flush the issues cache as one block, return to Idle.
    fn finish(&mut self, summary: RunSummary) -> Result<RunSummary, HostError> {
        self.state = HostState::Finishing;
        self.done_rx = None;
        self.cancel = None;

        let Some(worker) = self.worker.take() else {
            self.state = HostState::Idle;
            return Err(HostError::NotRunning);
        };
        let mut pipeline = match worker.join() {
            Ok(pipeline) => pipeline,
            Err(_) => {
                self.state = HostState::Idle;
                return Err(HostError::WorkerPanicked);
            }
        };

        if let Some(snapshot) = self.snapshot.take() {
            *pipeline.store_mut() = snapshot;
        }
        pipeline.channel_mut().flush_cache();
        self.pipeline = Some(pipeline);
        self.state = HostState::Idle;

        tracing::info!(
            "Run finished: code {}, canceled {}",
            summary.error_code,
            summary.canceled
        );
        Ok(summary)
    }

    /// A worker that dropped its channel without sending panicked inside a
    /// stage. The pipeline value is unrecoverable.
    fn finish_lost(&mut self) -> HostError {
        self.state = HostState::Idle;
        self.done_rx = None;
        self.cancel = None;
        self.snapshot = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        HostError::WorkerPanicked
    }
}

impl std::fmt::Debug for ExecutionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHost")
            .field("state", &self.state)
            .field("has_pipeline", &self.pipeline.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::{ParamMap, ParamValue, Stage, StageContext};
    use crate::store::DataArray;
    use std::sync::atomic::AtomicUsize;

    /// Stage that writes a marker array, optionally cancels its own
    /// pipeline, and counts executions.
    struct Marker {
        array: &'static str,
        runs: Arc<AtomicUsize>,
        cancel: Option<Arc<AtomicBool>>,
        validate_code: ErrorCode,
    }

    impl Marker {
        fn new(array: &'static str, runs: Arc<AtomicUsize>) -> Self {
            Self {
                array,
                runs,
                cancel: None,
                validate_code: 0,
            }
        }
    }

    impl Stage for Marker {
        fn class_name(&self) -> &'static str {
            "Marker"
        }

        fn label(&self) -> &'static str {
            "Marker Stage"
        }

        fn parameters(&self) -> ParamMap {
            ParamMap::new()
        }

        fn set_parameter(&mut self, _name: &str, _value: &ParamValue) -> bool {
            false
        }

        fn validate(
            &mut self,
            _store: &mut DataStore,
            ctx: &mut StageContext<'_>,
            _dry_run: bool,
        ) -> ErrorCode {
            if self.validate_code < 0 {
                ctx.error(self.validate_code, "marker validation failure");
            }
            self.validate_code
        }

        fn run(&mut self, store: &mut DataStore, _ctx: &mut StageContext<'_>) -> ErrorCode {
            self.runs.fetch_add(1, Ordering::SeqCst);
            store
                .create_container("Run")
                .insert_array(self.array, DataArray::filled_f64(1, 1, 1.0));
            if let Some(cancel) = &self.cancel {
                cancel.store(true, Ordering::Relaxed);
            }
            0
        }
    }

    fn host_with_markers(count: usize, runs: Arc<AtomicUsize>) -> ExecutionHost {
        let mut pipeline = Pipeline::new("test");
        let names = ["A", "B", "C", "D"];
        for name in names.iter().take(count) {
            pipeline.push_stage(Box::new(Marker::new(name, runs.clone())));
        }
        ExecutionHost::new(pipeline)
    }

    #[test]
    fn test_empty_pipeline_preflights_clean_but_cannot_start() {
        let mut host = ExecutionHost::new(Pipeline::new("empty"));
        assert_eq!(host.preflight().unwrap(), 0);
        assert_eq!(host.state(), HostState::Ready);
        assert!(!host.can_start());
        // Ready but empty: refused before any worker is spawned.
        assert!(matches!(host.start(), Err(HostError::EmptyPipeline)));
        assert!(host.pipeline().is_some());
    }

    #[test]
    fn test_start_requires_successful_preflight() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_markers(1, runs.clone());
        assert!(matches!(host.start(), Err(HostError::NotReady(_))));

        // Make the single stage fail validation.
        if let Some(pipeline) = host.pipeline_mut() {
            pipeline.push_stage(Box::new(Marker {
                validate_code: -11,
                ..Marker::new("X", runs.clone())
            }));
        }
        assert_eq!(host.preflight().unwrap(), -11);
        assert_eq!(host.state(), HostState::Idle);
        assert!(!host.can_start());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_to_completion_and_store_restored() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_markers(2, runs.clone());
        assert_eq!(host.preflight().unwrap(), 0);
        assert!(host.can_start());
        host.start().unwrap();
        assert_eq!(host.state(), HostState::Running);
        assert!(host.pipeline().is_none());

        let summary = host.wait().unwrap();
        assert_eq!(summary.error_code, 0);
        assert!(!summary.canceled);
        assert_eq!(summary.stages_run, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(host.state(), HostState::Idle);

        // The worker wrote marker arrays, but the snapshot was restored.
        let pipeline = host.pipeline().unwrap();
        assert!(!pipeline.store().contains_container("Run"));
    }

    #[test]
    fn test_cancel_between_stages_restores_snapshot() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new("cancel");
        let flag = pipeline.cancel_flag();
        pipeline.push_stage(Box::new(Marker {
            cancel: Some(flag),
            ..Marker::new("A", runs.clone())
        }));
        pipeline.push_stage(Box::new(Marker::new("B", runs.clone())));
        pipeline.push_stage(Box::new(Marker::new("C", runs.clone())));
        let mut host = ExecutionHost::new(pipeline);

        host.preflight().unwrap();
        host.start().unwrap();
        let summary = host.wait().unwrap();

        assert!(summary.canceled);
        assert_eq!(summary.stages_run, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!host.pipeline().unwrap().store().contains_container("Run"));
    }

    #[test]
    fn test_poll_reports_completion_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_markers(1, runs);
        host.preflight().unwrap();
        host.start().unwrap();

        let summary = loop {
            if let Some(summary) = host.poll().unwrap() {
                break summary;
            }
            std::thread::yield_now();
        };
        assert_eq!(summary.error_code, 0);
        assert_eq!(host.state(), HostState::Idle);
        assert!(host.poll().unwrap().is_none());
    }

    #[test]
    fn test_edit_access_invalidates_ready() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_markers(1, runs);
        host.preflight().unwrap();
        assert_eq!(host.state(), HostState::Ready);
        assert!(host.pipeline_mut().is_some());
        assert_eq!(host.state(), HostState::Idle);
    }
}
