//! Upload notification queue.
//!
//! This crate provides:
//! - Receipt-handle based receive/delete against the upload queue
//! - Notification publishing for freshly uploaded objects
//!
//! Messages are delivered at least once: a received message stays invisible
//! for the visibility timeout and reappears unless explicitly deleted.

pub mod consumer;
pub mod error;
pub mod publisher;

pub use consumer::{QueueConfig, QueueConsumer, ReceivedMessage};
pub use error::{QueueError, QueueResult};
pub use publisher::{NotificationPublisher, PublisherConfig};
