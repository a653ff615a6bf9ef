use tracing::warn;

/// Sink for user-facing resolver diagnostics.
///
/// The host routes these to its own output channel; ambient `tracing`
/// narration stays separate.
pub trait OutputSink {
    fn add_message(&self, message: &str);
}

/// Default sink forwarding to the tracing layer.
pub struct LogSink;

impl OutputSink for LogSink {
    fn add_message(&self, message: &str) {
        warn!("{message}");
    }
}

#[cfg(test)]
pub struct MemorySink {
    pub messages: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl OutputSink for MemorySink {
    fn add_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
