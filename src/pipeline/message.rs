//! Messages and the observer channel stages publish into.
//!
//! Stages never talk to the shell directly: they post `PipelineMessage`
//! values into a `MessageChannel`, which fans them out to registered
//! `MessageReceiver`s. Error and Warning messages additionally land in the
//! issues cache so the shell can clear them before each preflight and flush
//! them as one block when a run finishes, bucketed separately from live
//! status/progress traffic.

use crate::pipeline::stage::ErrorCode;

/// Payload of a single pipeline message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Progress update, 0-100.
    ProgressValue { progress: i32 },
    /// Human-readable status line.
    Status { text: String },
    /// Status line plus progress in one message.
    StatusAndProgress { text: String, progress: i32 },
    /// Free-form output a stage wants echoed to the log.
    StandardOutput { text: String },
    /// A failed precondition or execution failure. `code` is negative.
    Error { code: ErrorCode, text: String },
    /// A non-fatal condition worth surfacing. `code` is negative or zero.
    Warning { code: ErrorCode, text: String },
}

/// A discriminated event emitted by a stage, tagged with where it came from.
///
/// Ephemeral: displayed and logged, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineMessage {
    /// Position of the emitting stage within its pipeline.
    pub stage_index: usize,
    /// Human label of the emitting stage.
    pub stage_label: String,
    pub content: MessageContent,
}

impl PipelineMessage {
    pub fn new(stage_index: usize, stage_label: impl Into<String>, content: MessageContent) -> Self {
        Self {
            stage_index,
            stage_label: stage_label.into(),
            content,
        }
    }

    /// Whether this message belongs in the issues cache.
    pub fn is_issue(&self) -> bool {
        matches!(
            self.content,
            MessageContent::Error { .. } | MessageContent::Warning { .. }
        )
    }

    /// The error code carried by an Error or Warning message.
    pub fn code(&self) -> Option<ErrorCode> {
        match self.content {
            MessageContent::Error { code, .. } | MessageContent::Warning { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A subscriber receiving fan-out from a `MessageChannel`.
///
/// Receivers must be `Send`: during a run the channel lives on the worker
/// thread and delivery happens there.
pub trait MessageReceiver: Send {
    fn receive(&mut self, message: &PipelineMessage);
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverId(u64);

/// Publish/subscribe sink for stage messages.
///
/// Delivery order is subscription order. `post` never blocks and never
/// panics; a receiver that panics is the receiver's bug, not the channel's.
pub struct MessageChannel {
    receivers: Vec<(ReceiverId, Box<dyn MessageReceiver>)>,
    cache: Vec<PipelineMessage>,
    next_id: u64,
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageChannel {
    pub fn new() -> Self {
        Self {
            receivers: Vec::new(),
            cache: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a receiver. Returns a token for `unsubscribe`.
    pub fn subscribe(&mut self, receiver: Box<dyn MessageReceiver>) -> ReceiverId {
        let id = ReceiverId(self.next_id);
        self.next_id += 1;
        self.receivers.push((id, receiver));
        id
    }

    /// Remove a previously registered receiver. Returns whether it was found.
    pub fn unsubscribe(&mut self, id: ReceiverId) -> bool {
        let before = self.receivers.len();
        self.receivers.retain(|(rid, _)| *rid != id);
        self.receivers.len() != before
    }

    /// Number of registered receivers.
    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Publish a message.
    ///
    /// Issues (Error/Warning) are recorded in the cache for a later
    /// `flush_cache`; everything else is delivered to receivers immediately.
    pub fn post(&mut self, message: PipelineMessage) {
        if message.is_issue() {
            self.cache.push(message);
        } else {
            for (_, receiver) in &mut self.receivers {
                receiver.receive(&message);
            }
        }
    }

    /// Cached issues accumulated since the last `clear_cache`.
    pub fn cached(&self) -> &[PipelineMessage] {
        &self.cache
    }

    /// Drop all cached issues. Preflight calls this before each pass.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Deliver all cached issues to the receivers as one block, in emission
    /// order. The cache is kept so the shell can still inspect it; only
    /// `clear_cache` empties it.
    pub fn flush_cache(&mut self) {
        for message in &self.cache {
            for (_, receiver) in &mut self.receivers {
                receiver.receive(message);
            }
        }
    }
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("receivers", &self.receivers.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Receiver that renders messages through `tracing`, used by the CLI runner.
#[derive(Debug, Default)]
pub struct ConsoleReceiver;

impl ConsoleReceiver {
    pub fn new() -> Self {
        Self
    }
}

impl MessageReceiver for ConsoleReceiver {
    fn receive(&mut self, message: &PipelineMessage) {
        match &message.content {
            MessageContent::ProgressValue { progress } => {
                tracing::info!("[{}] {}%", message.stage_label, progress);
            }
            MessageContent::Status { text } => {
                tracing::info!("[{}] {}", message.stage_label, text);
            }
            MessageContent::StatusAndProgress { text, progress } => {
                tracing::info!("[{}] {} ({}%)", message.stage_label, text, progress);
            }
            MessageContent::StandardOutput { text } => {
                tracing::info!("{}", text);
            }
            MessageContent::Error { code, text } => {
                tracing::error!("[{}] ({}) {}", message.stage_label, code, text);
            }
            MessageContent::Warning { code, text } => {
                tracing::warn!("[{}] ({}) {}", message.stage_label, code, text);
            }
        }
    }
}
