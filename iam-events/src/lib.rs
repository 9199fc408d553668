//! # IAM Events
//!
//! This crate provides the event bus the IAM core uses for cross-module
//! notifications: login events, organization/project deletion cascades and
//! account lifecycle changes.
//!
//! ## Overview
//!
//! The iam-events crate handles:
//! - **Event Types**: An envelope plus typed events per module
//! - **Event Bus**: Fire-and-forget publishing, pattern-filtered subscriptions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iam_events::{EventBus, MemoryEventBus, OrgEvent};
//!
//! async fn example() {
//!     let bus = MemoryEventBus::new();
//!     let mut sub = bus.subscribe("org.*").await.unwrap();
//!
//!     let event = OrgEvent::Deleted { org_id: "o1".into(), project_ids: vec![] };
//!     bus.publish(event.to_event()).await.unwrap();
//!
//!     let received = sub.recv().await.unwrap();
//!     assert_eq!(received.topic(), "org.deleted");
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `{module}.{event_type}`:
//! - `account.logged_in` - Specific event
//! - `org.*` - All organization events
//! - `#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    topic_matches, EventBus, EventBusError, EventBusResult, MemoryEventBus, Subscription,
    DEFAULT_CAPACITY,
};
pub use types::{AccountEvent, Event, Module, OrgEvent, ProjectEvent};
