//! Event bus
//!
//! Every event goes out on one broadcast channel; a [`Subscription`] carries
//! its topic pattern and skips what does not match. Publishing never waits
//! on subscribers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::types::Event;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bus refused the event
    #[error("Event rejected: {0}")]
    Rejected(String),

    /// Malformed topic pattern
    #[error("Invalid topic pattern: {0}")]
    InvalidPattern(String),

    /// The subscriber fell behind and missed events
    #[error("Subscriber lagged, {0} events dropped")]
    Lagged(u64),

    /// The bus was dropped
    #[error("Channel closed")]
    ChannelClosed,
}

pub type EventBusResult<T> = Result<T, EventBusError>;

/// Where the service sends its domain events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Hand an event to the bus.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Receive events whose topic matches `pattern`.
    ///
    /// - `*` matches exactly one segment
    /// - `#` matches zero or more segments
    async fn subscribe(&self, pattern: &str) -> EventBusResult<Subscription>;
}

/// A pattern-filtered view of the bus.
#[derive(Debug)]
pub struct Subscription {
    pattern: String,
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Next event matching the pattern.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if topic_matches(&self.pattern, &event.topic()) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(EventBusError::Lagged(n))
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed)
                }
            }
        }
    }
}

/// Check if a topic matches a pattern.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let topic: Vec<&str> = topic.split('.').collect();
    segments_match(&pattern, &topic)
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match pattern.split_first() {
        None => topic.is_empty(),
        Some((&"#", [])) => true,
        Some((&"#", rest)) => (0..=topic.len()).any(|skip| segments_match(rest, &topic[skip..])),
        Some((&"*", rest)) => !topic.is_empty() && segments_match(rest, &topic[1..]),
        Some((segment, rest)) => topic.first() == Some(segment) && segments_match(rest, &topic[1..]),
    }
}

fn validate_pattern(pattern: &str) -> EventBusResult<()> {
    if pattern.split('.').any(str::is_empty) {
        return Err(EventBusError::InvalidPattern(pattern.to_string()));
    }
    Ok(())
}

/// In-process bus for single-node deployments and tests.
pub struct MemoryEventBus {
    sender: broadcast::Sender<Event>,
    published: AtomicU64,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("subscribers", &self.sender.receiver_count())
            .field("published", &self.published())
            .finish()
    }
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    /// Events accepted so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let event_id = event.id;
        // No subscribers is not an error
        let receivers = self.sender.send(event).unwrap_or(0);
        self.published.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(%topic, %event_id, receivers, "event published");
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> EventBusResult<Subscription> {
        validate_pattern(pattern)?;
        Ok(Subscription {
            pattern: pattern.to_string(),
            receiver: self.sender.subscribe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountEvent, Module, OrgEvent};
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscriber_sees_matching_events_only() {
        let bus = MemoryEventBus::new();
        let mut orgs = bus.subscribe("org.*").await.unwrap();

        bus.publish(
            AccountEvent::Disabled {
                account_id: "a1".to_string(),
            }
            .to_event(),
        )
        .await
        .unwrap();
        let deleted = OrgEvent::Deleted {
            org_id: "o1".to_string(),
            project_ids: vec![],
        }
        .to_event();
        bus.publish(deleted.clone()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_millis(100), orgs.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.id, deleted.id);
        assert_eq!(bus.published(), 2);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MemoryEventBus::new();
        bus.publish(Event::new("registered", Module::Account, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(bus.published(), 1);
    }

    #[tokio::test]
    async fn test_lagging_subscriber() {
        let bus = MemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe("#").await.unwrap();
        for _ in 0..4 {
            bus.publish(Event::new("updated", Module::Org, serde_json::json!({})))
                .await
                .unwrap();
        }
        assert!(matches!(sub.recv().await, Err(EventBusError::Lagged(2))));
        assert!(sub.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let bus = MemoryEventBus::new();
        assert!(matches!(
            bus.subscribe("org..x").await,
            Err(EventBusError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_topic_matching() {
        assert!(topic_matches("org.deleted", "org.deleted"));
        assert!(topic_matches("org.*", "org.deleted"));
        assert!(topic_matches("*.deleted", "project.deleted"));
        assert!(topic_matches("#", "account.logged_in"));
        assert!(topic_matches("account.#", "account.logged_in"));
        assert!(topic_matches("#.deleted", "org.deleted"));

        assert!(!topic_matches("org.created", "org.deleted"));
        assert!(!topic_matches("project.*", "org.deleted"));
        assert!(!topic_matches("org.*", "org"));
    }
}
