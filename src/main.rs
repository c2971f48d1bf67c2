//! Pipeline runner - command line entry point
//!
//! Loads a pipeline document, preflights it, and runs it to completion on
//! the execution host, echoing stage messages through the console receiver.

use anyhow::{bail, Context};
use pipeflow_rs::pipeline::{ConsoleReceiver, ExecutionHost, PipelineDocument, StageRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pipeflow_rs=trace")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: pipeflow-rs <pipeline.json|pipeline.ini>")?;

    let registry = StageRegistry::with_builtins();
    let document = PipelineDocument::load(&path)
        .with_context(|| format!("Failed to load pipeline from {path}"))?;
    tracing::info!(
        "Loaded pipeline '{}' with {} stages",
        document.name,
        document.stages.len()
    );

    let mut pipeline = document.to_pipeline(&registry)?;
    pipeline
        .channel_mut()
        .subscribe(Box::new(ConsoleReceiver::new()));

    let mut host = ExecutionHost::new(pipeline);
    let code = host.preflight()?;
    if code < 0 {
        // Surface the cached issues before giving up.
        if let Some(pipeline) = host.pipeline() {
            for message in pipeline.channel().cached() {
                tracing::error!("[{}] {:?}", message.stage_label, message.content);
            }
        }
        bail!("Preflight failed with code {code}");
    }
    if !host.can_start() {
        bail!("Pipeline has no stages to run");
    }

    host.start()?;
    let summary = host.wait()?;

    if summary.canceled {
        bail!("Pipeline run was canceled");
    }
    if summary.error_code < 0 {
        bail!(
            "Pipeline finished with code {} ({} stages run)",
            summary.error_code,
            summary.stages_run
        );
    }
    tracing::info!("Pipeline finished: {} stages run", summary.stages_run);
    Ok(())
}
