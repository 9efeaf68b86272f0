//! Message model for consumed Kafka records

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message observed on a partition
///
/// Produced by the underlying consumer transport; immutable once observed.
/// Offsets are monotonic and unique within one partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Topic the message was read from
    pub topic: String,

    /// Partition within the topic
    pub partition: u32,

    /// Offset within the partition
    pub offset: u64,

    /// Message key (optional, set by the producer for partitioning)
    pub key: Option<Bytes>,

    /// Message payload
    pub value: Bytes,

    /// Broker-assigned timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional headers for metadata
    pub headers: Vec<(String, Vec<u8>)>,
}

impl Message {
    /// Create a new message
    pub fn new(topic: impl Into<String>, partition: u32, offset: u64, value: Bytes) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            value,
            timestamp: Utc::now(),
            headers: Vec::new(),
        }
    }

    /// Set the message key
    pub fn with_key(mut self, key: Bytes) -> Self {
        self.key = Some(key);
        self
    }

    /// Add a header to the message
    pub fn add_header(mut self, key: String, value: Vec<u8>) -> Self {
        self.headers.push((key, value));
        self
    }
}
