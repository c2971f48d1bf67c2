//! # pipeflow-rs: two-phase pipeline execution engine
//!
//! A pipeline is an ordered sequence of stages operating on a shared store
//! of named, typed arrays. Every structural or parameter edit triggers a
//! synchronous dry-run validation pass ("preflight"); only a pipeline whose
//! preflight passes may execute, and execution happens on a worker thread
//! with cooperative cancellation and live progress reporting.
//!
//! ## Example
//!
//! ```no_run
//! use pipeflow_rs::{
//!     error::Result,
//!     pipeline::{ConsoleReceiver, ExecutionHost, PipelineDocument, StageRegistry},
//! };
//!
//! fn main() -> Result<()> {
//!     let registry = StageRegistry::with_builtins();
//!     let document = PipelineDocument::load("pipeline.json")?;
//!     let mut pipeline = document.to_pipeline(&registry)?;
//!     pipeline.channel_mut().subscribe(Box::new(ConsoleReceiver::new()));
//!
//!     let mut host = ExecutionHost::new(pipeline);
//!     if host.preflight()? >= 0 && host.can_start() {
//!         host.start()?;
//!         let summary = host.wait()?;
//!         println!("finished with code {}", summary.error_code);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use error::{PipeflowError, Result};
pub use pipeline::{
    ErrorCode, ExecutionHost, HostState, Pipeline, PipelineDocument, PipelineMessage,
    StageRegistry,
};
pub use store::{DataArray, DataStore};
