//! The pipeline: an ordered stage sequence with the two-phase
//! preflight/execute protocol.
//!
//! Structural edits (insert/remove/move) keep the stage arena gapless;
//! neighbor relationships are derived from sequence position on demand, so
//! no reorder can leave a dangling link. Preflight validates every stage in
//! order against a scratch copy of the data store and stops at the first
//! failure. The execute path is fail-soft: a failing stage is recorded and
//! the remaining stages still run. Cancellation is cooperative and observed
//! between stages only.

use crate::pipeline::message::MessageChannel;
use crate::pipeline::stage::{ErrorCode, Stage, StageContext};
use crate::store::DataStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of one execute pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// 0 if every stage succeeded, else the first negative code recorded.
    pub error_code: ErrorCode,
    /// Whether cancellation stopped the sequence early.
    pub canceled: bool,
    /// How many stages entered their execute phase.
    pub stages_run: usize,
}

/// An ordered sequence of stages plus the shared execution context.
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
    store: DataStore,
    channel: MessageChannel,
    cancel: Arc<AtomicBool>,
    error_code: ErrorCode,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            store: DataStore::new(),
            channel: MessageChannel::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            error_code: 0,
        }
    }

    // --- Identity and access ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Aggregate error state from the last preflight or run.
    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DataStore {
        &mut self.store
    }

    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut MessageChannel {
        &mut self.channel
    }

    /// Shared cancellation flag. The host holds a clone of this across the
    /// worker handoff.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    // --- Stage arena ---

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(&self, index: usize) -> Option<&dyn Stage> {
        self.stages.get(index).map(AsRef::as_ref)
    }

    pub fn stage_mut(&mut self, index: usize) -> Option<&mut Box<dyn Stage>> {
        self.stages.get_mut(index)
    }

    /// Iterate stages in sequence order.
    pub fn stages(&self) -> impl Iterator<Item = &dyn Stage> {
        self.stages.iter().map(AsRef::as_ref)
    }

    /// Append a stage at the end of the sequence.
    pub fn push_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Insert a stage at `index` (clamped to the sequence length).
    pub fn insert_stage(&mut self, index: usize, stage: Box<dyn Stage>) {
        let index = index.min(self.stages.len());
        self.stages.insert(index, stage);
    }

    /// Remove and return the stage at `index`.
    pub fn remove_stage(&mut self, index: usize) -> Option<Box<dyn Stage>> {
        if index < self.stages.len() {
            Some(self.stages.remove(index))
        } else {
            None
        }
    }

    /// Move the stage at `from` to position `to`. The sequence stays gapless
    /// and derived neighbor links follow the new order immediately.
    pub fn move_stage(&mut self, from: usize, to: usize) -> bool {
        if from >= self.stages.len() || to >= self.stages.len() {
            return false;
        }
        let stage = self.stages.remove(from);
        self.stages.insert(to, stage);
        true
    }

    /// Derived previous/next view for the stage at `index`, consistent with
    /// sequence order by construction.
    pub fn neighbors(&self, index: usize) -> (Option<&dyn Stage>, Option<&dyn Stage>) {
        let previous = index
            .checked_sub(1)
            .and_then(|i| self.stages.get(i))
            .map(AsRef::as_ref);
        let next = self.stages.get(index + 1).map(AsRef::as_ref);
        (previous, next)
    }

    // --- Cancellation ---

    /// Request cooperative cancellation. Observed between stages; a stage
    /// already executing runs to completion first.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Reset the cancellation flag ahead of a new run.
    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    // --- Two-phase protocol ---

    /// Dry-run validation pass.
    ///
    /// Clears the issues cache, then validates stages in order against a
    /// scratch copy of the store, stopping at the first negative code. The
    /// scratch copy lets stages register placeholder outputs for downstream
    /// existence checks while the editable store stays untouched, which also
    /// makes consecutive preflights idempotent. Cheap enough to call on
    /// every structural or parameter edit.
    pub fn preflight(&mut self) -> ErrorCode {
        self.channel.clear_cache();
        self.error_code = 0;

        let mut scratch = self.store.clone();
        for (index, stage) in self.stages.iter_mut().enumerate() {
            let label = stage.label();
            let mut ctx = StageContext::new(index, label, &mut self.channel);
            let code = stage.validate(&mut scratch, &mut ctx, true);
            if code < 0 {
                tracing::warn!(
                    "Preflight failed at stage {} '{}' with code {}",
                    index,
                    label,
                    code
                );
                self.error_code = code;
                break;
            }
        }

        self.error_code
    }

    /// Execute pass. Only invoked after a successful preflight.
    ///
    /// Each stage is re-validated against the real store, then run. Failures
    /// are collected, not fail-fast: the aggregate code is the first negative
    /// one seen, and later stages still execute. The cancel flag is checked
    /// between stages.
    pub fn run(&mut self) -> RunSummary {
        tracing::info!("Pipeline '{}' starting: {} stages", self.name, self.stages.len());
        let mut summary = RunSummary {
            error_code: 0,
            canceled: false,
            stages_run: 0,
        };

        for (index, stage) in self.stages.iter_mut().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!("Pipeline '{}' canceled before stage {}", self.name, index);
                summary.canceled = true;
                break;
            }

            let label = stage.label();
            let mut ctx = StageContext::new(index, label, &mut self.channel);
            let mut code = stage.validate(&mut self.store, &mut ctx, false);
            if code >= 0 {
                code = stage.run(&mut self.store, &mut ctx);
            }
            summary.stages_run += 1;

            if code < 0 {
                tracing::warn!("Stage {} '{}' failed with code {}", index, label, code);
                if summary.error_code == 0 {
                    summary.error_code = code;
                }
            }
        }

        self.error_code = summary.error_code;
        tracing::info!(
            "Pipeline '{}' finished: code {}, canceled {}, {} of {} stages run",
            self.name,
            summary.error_code,
            summary.canceled,
            summary.stages_run,
            self.stages.len()
        );
        summary
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stages.len())
            .field("error_code", &self.error_code)
            .finish()
    }
}
