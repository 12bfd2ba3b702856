//! Tool start/finish notifications
//!
//! A thin `tokio::sync::broadcast` fan-out. Publishing never waits and never
//! fails: with no subscribers the event is counted and dropped, and slow
//! subscribers lose the oldest events (they see `RecvError::Lagged`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// Observability events for one tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolEvent {
    Started {
        tool: String,
        description: String,
        timestamp: DateTime<Utc>,
    },
    Finished {
        tool: String,
        description: String,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ToolEvent {
    #[must_use]
    pub fn started(tool: &str, description: impl Into<String>) -> Self {
        ToolEvent::Started {
            tool: tool.to_string(),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn finished(tool: &str, description: impl Into<String>, error: Option<String>) -> Self {
        ToolEvent::Finished {
            tool: tool.to_string(),
            description: description.into(),
            error,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn tool(&self) -> &str {
        match self {
            ToolEvent::Started { tool, .. } | ToolEvent::Finished { tool, .. } => tool,
        }
    }
}

#[derive(Debug)]
pub struct ToolEventBus {
    sender: broadcast::Sender<ToolEvent>,
    published: AtomicU64,
    unobserved: AtomicU64,
}

impl ToolEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
            unobserved: AtomicU64::new(0),
        }
    }

    /// Publish without waiting; returns the number of subscribers reached
    pub fn publish(&self, event: ToolEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                self.unobserved.fetch_add(1, Ordering::Relaxed);
                trace!("No subscribers for tool event from {}", event.tool());
                0
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ToolEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events published so far, including unobserved ones
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Events published while nobody was subscribed
    #[must_use]
    pub fn unobserved(&self) -> u64 {
        self.unobserved.load(Ordering::Relaxed)
    }
}

impl Default for ToolEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
