//! Shared helpers for the integration suites.

pub mod builders;

use pipeflow_rs::pipeline::{MessageReceiver, PipelineMessage};
use std::sync::{Arc, Mutex};

/// Receiver that records every delivered message for later assertions.
pub struct RecordingReceiver {
    messages: Arc<Mutex<Vec<PipelineMessage>>>,
}

impl RecordingReceiver {
    /// Returns the receiver and a shared handle to its message log.
    pub fn new() -> (Self, Arc<Mutex<Vec<PipelineMessage>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                messages: messages.clone(),
            },
            messages,
        )
    }
}

impl MessageReceiver for RecordingReceiver {
    fn receive(&mut self, message: &PipelineMessage) {
        self.messages.lock().unwrap().push(message.clone());
    }
}
