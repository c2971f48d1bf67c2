//! The pipeline execution engine.
//!
//! An ordered sequence of stages runs against a shared data store under a
//! two-phase protocol: a cheap dry-run validation pass ("preflight") gates
//! the real execute pass. Stages report through a publish/subscribe message
//! channel; the execution host moves the pipeline to a worker thread for the
//! execute pass and supports cooperative cancellation.
//!
//! # Architecture
//!
//! ```text
//! shell edits ──► Pipeline ──preflight──► issues cache ──► receivers
//!                    │
//!                 ExecutionHost ──start──► worker thread ──► run()
//!                    ▲                          │
//!                    └── completion channel ◄───┘
//! ```
//!
//! # Design
//!
//! - **Trait-object stages** — `Box<dyn Stage>` built by a name-keyed
//!   registry; documents carry only class names and parameters.
//! - **Arena-ordered sequence** — stages live in a `Vec`; neighbor links are
//!   derived from position, never stored.
//! - **Fail-soft execute** — stage failures are recorded, later stages still
//!   run; only cancellation stops the sequence early.
//! - **Snapshot/restore** — the host deep-copies the store before a run and
//!   restores it afterwards, so the editable state survives every run.

pub mod document;
pub mod executor;
pub mod host;
pub mod message;
pub mod registry;
pub mod stage;
pub mod stages;

pub use document::{PipelineDocument, StageDescriptor};
pub use executor::{Pipeline, RunSummary};
pub use host::{ExecutionHost, HostError, HostState};
pub use message::{
    ConsoleReceiver, MessageChannel, MessageContent, MessageReceiver, PipelineMessage, ReceiverId,
};
pub use registry::StageRegistry;
pub use stage::{ErrorCode, ParamMap, ParamValue, Stage, StageContext};
