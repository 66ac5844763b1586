use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{EventPublisher, PublishError};

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub channel: String,
    pub payload: Value,
}

/// Records every published event in order.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    events: Mutex<Vec<PublishedEvent>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish waits `delay` before recording.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// While set, publishes are rejected and nothing is recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn on_channel(&self, channel: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e.channel == channel)
            .map(|e| e.payload)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, channel: &str, payload: &Value) -> Result<(), PublishError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected("channel unavailable".into()));
        }
        self.events
            .lock()
            .map_err(|_| PublishError::Rejected("recorder lock poisoned".into()))?
            .push(PublishedEvent {
                channel: channel.to_string(),
                payload: payload.clone(),
            });
        Ok(())
    }
}
