//! The stage contract: two-phase validate/run against the shared store.
//!
//! A stage is validated twice per lifecycle: once during preflight with
//! `dry_run = true` (shape and existence checks only; stages may create
//! placeholder arrays so downstream stages can validate, and preflight hands
//! them a scratch copy of the store so the editable state is never touched),
//! and once as the first action of the execute path with `dry_run = false`.
//!
//! Stage-level failure is an engine-protocol value, not a Rust error: 0 means
//! success, negative means failure, and every failure must be accompanied by
//! at least one Error message describing the broken precondition.

use crate::pipeline::message::{MessageChannel, MessageContent, PipelineMessage};
use crate::store::DataStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stage-protocol error code. 0 = success, negative = failure.
pub type ErrorCode = i32;

/// A typed stage parameter value.
///
/// Untagged serde representation keeps pipeline documents natural:
/// `"factor": 2.5`, `"array": "Density"`, `"invert": true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric accessor: accepts both Float and Int so `2` in a document
    /// works where `2.0` is meant.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered parameter map, as serialized in pipeline documents.
pub type ParamMap = BTreeMap<String, ParamValue>;

// Assignment helpers shared by stage `set_parameter` implementations.
// Each returns whether the value had a usable type.

pub(crate) fn assign_string(target: &mut String, value: &ParamValue) -> bool {
    match value.as_str() {
        Some(v) => {
            *target = v.to_string();
            true
        }
        None => false,
    }
}

pub(crate) fn assign_int(target: &mut i64, value: &ParamValue) -> bool {
    match value.as_int() {
        Some(v) => {
            *target = v;
            true
        }
        None => false,
    }
}

pub(crate) fn assign_float(target: &mut f64, value: &ParamValue) -> bool {
    match value.as_float() {
        Some(v) => {
            *target = v;
            true
        }
        None => false,
    }
}

/// Context handed to a stage's lifecycle hooks: where it sits in the
/// pipeline and the channel it reports through.
pub struct StageContext<'a> {
    index: usize,
    label: &'static str,
    channel: &'a mut MessageChannel,
}

impl<'a> StageContext<'a> {
    pub fn new(index: usize, label: &'static str, channel: &'a mut MessageChannel) -> Self {
        Self {
            index,
            label,
            channel,
        }
    }

    /// Position of the stage within its pipeline.
    pub fn index(&self) -> usize {
        self.index
    }

    fn post(&mut self, content: MessageContent) {
        self.channel
            .post(PipelineMessage::new(self.index, self.label, content));
    }

    /// Post a status line.
    pub fn status(&mut self, text: impl Into<String>) {
        self.post(MessageContent::Status { text: text.into() });
    }

    /// Post a bare progress value (clamped to 0-100).
    pub fn progress(&mut self, progress: i32) {
        self.post(MessageContent::ProgressValue {
            progress: progress.clamp(0, 100),
        });
    }

    /// Post a status line and progress value in one message.
    pub fn status_progress(&mut self, text: impl Into<String>, progress: i32) {
        self.post(MessageContent::StatusAndProgress {
            text: text.into(),
            progress: progress.clamp(0, 100),
        });
    }

    /// Post free-form standard output.
    pub fn stdout(&mut self, text: impl Into<String>) {
        self.post(MessageContent::StandardOutput { text: text.into() });
    }

    /// Post an Error message. Call this for every negative code returned.
    pub fn error(&mut self, code: ErrorCode, text: impl Into<String>) {
        self.post(MessageContent::Error {
            code,
            text: text.into(),
        });
    }

    /// Post a Warning message.
    pub fn warning(&mut self, code: ErrorCode, text: impl Into<String>) {
        self.post(MessageContent::Warning {
            code,
            text: text.into(),
        });
    }
}

/// A single named transform unit within a pipeline.
///
/// Implementations never touch sibling stages; the data store is the only
/// shared state. `Send` because the pipeline moves to a worker thread for
/// the execute path.
pub trait Stage: Send {
    /// Registry key. Stable across versions; what documents serialize.
    fn class_name(&self) -> &'static str;

    /// Human label shown in messages and issue tables.
    fn label(&self) -> &'static str;

    /// Snapshot of the stage's parameters, as serialized in documents.
    fn parameters(&self) -> ParamMap;

    /// Apply one parameter. Returns `false` for an unrecognized name or an
    /// unusable value; callers surface that as a warning, not a failure.
    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool;

    /// Two-phase validation. With `dry_run` the store is a preflight scratch
    /// copy: check existence/shape, create placeholder outputs, leave
    /// existing contents alone. Without `dry_run` this runs against the real
    /// store as the first action of execute.
    fn validate(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>, dry_run: bool)
        -> ErrorCode;

    /// The actual transform. Only called after `validate` succeeded.
    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode;
}
