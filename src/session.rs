//! Sessions, claims and offset bookkeeping
//!
//! A session is one consumer-group membership generation. The external
//! group framework creates it with the generation's partition assignment,
//! spawns one claim loop per partition, and flips the close signal when
//! the generation ends (rebalance or shutdown). Claims are finite and not
//! restartable; the next generation issues new ones.

use crate::message::Message;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// One partition's assignment for one session generation.
///
/// Yields messages in strictly increasing offset order. The stream ends
/// when the partition is revoked or the session ends.
#[derive(Debug)]
pub struct Claim {
    topic: String,
    partition: u32,
    initial_offset: u64,
    messages: mpsc::Receiver<Message>,
}

impl Claim {
    /// Create a claim over an existing message stream
    pub fn new(
        topic: impl Into<String>,
        partition: u32,
        initial_offset: u64,
        messages: mpsc::Receiver<Message>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            initial_offset,
            messages,
        }
    }

    /// Create a claim together with the sender feeding it.
    ///
    /// `buffer` bounds how many undelivered messages the transport may
    /// queue ahead of the claim loop.
    pub fn channel(
        topic: impl Into<String>,
        partition: u32,
        initial_offset: u64,
        buffer: usize,
    ) -> (mpsc::Sender<Message>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(topic, partition, initial_offset, rx))
    }

    /// Topic this claim consumes
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Partition this claim consumes
    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Offset consumption started from this generation
    pub fn initial_offset(&self) -> u64 {
        self.initial_offset
    }

    /// Next message in offset order; `None` once the claim is closed
    pub async fn next_message(&mut self) -> Option<Message> {
        self.messages.recv().await
    }
}

/// Highest marked offset per (topic, partition).
///
/// Written by claim loops via [`Session::mark`], read by the external
/// framework that performs the actual commit. Marks never move backwards.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    marked: DashMap<(String, u32), u64>,
}

impl OffsetTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an offset as consumed
    pub fn mark(&self, topic: &str, partition: u32, offset: u64) {
        self.marked
            .entry((topic.to_string(), partition))
            .and_modify(|current| {
                if offset > *current {
                    *current = offset;
                }
            })
            .or_insert(offset);
    }

    /// Highest marked offset for a partition, if any
    pub fn marked_offset(&self, topic: &str, partition: u32) -> Option<u64> {
        self.marked
            .get(&(topic.to_string(), partition))
            .map(|entry| *entry)
    }

    /// Copy of all marked offsets
    pub fn snapshot(&self) -> HashMap<(String, u32), u64> {
        self.marked
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

/// One consumer-group membership generation.
///
/// Cloneable: each claim loop holds its own handle, all sharing the same
/// close signal and offset tracker.
#[derive(Debug, Clone)]
pub struct Session {
    generation: u64,
    claims: Arc<HashMap<String, Vec<u32>>>,
    closing: watch::Receiver<bool>,
    offsets: Arc<OffsetTracker>,
}

/// Close handle for a session, held by the group framework
#[derive(Debug)]
pub struct SessionControl {
    close_tx: watch::Sender<bool>,
}

impl SessionControl {
    /// Signal that the generation is ending (rebalance or shutdown).
    ///
    /// Claim loops observe this between messages; in-flight handler calls
    /// run to completion.
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }
}

impl Session {
    /// Create a session for one generation with its partition assignment
    pub fn new(
        generation: u64,
        claims: HashMap<String, Vec<u32>>,
    ) -> (SessionControl, Self) {
        let (close_tx, closing) = watch::channel(false);
        (
            SessionControl { close_tx },
            Self {
                generation,
                claims: Arc::new(claims),
                closing,
                offsets: Arc::new(OffsetTracker::new()),
            },
        )
    }

    /// Generation id of this session
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Topic -> partitions claimed by this instance for this generation
    pub fn claims(&self) -> &HashMap<String, Vec<u32>> {
        &self.claims
    }

    /// Non-blocking check of the close signal
    pub fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    /// Wait until the session is closing.
    ///
    /// Also returns if the controller is dropped, which equally ends the
    /// generation.
    pub async fn closed(&self) {
        let mut closing = self.closing.clone();
        let _ = closing.wait_for(|closed| *closed).await;
    }

    /// Mark a message's offset as consumed
    pub fn mark(&self, message: &Message) {
        self.offsets
            .mark(&message.topic, message.partition, message.offset);
    }

    /// Offsets marked during this generation
    pub fn offsets(&self) -> &OffsetTracker {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn assignment() -> HashMap<String, Vec<u32>> {
        HashMap::from([("events".to_string(), vec![0, 1, 2])])
    }

    #[tokio::test]
    async fn test_close_signal_visible_to_clones() {
        let (control, session) = Session::new(7, assignment());
        let clone = session.clone();

        assert!(!session.is_closing());
        control.close();
        assert!(session.is_closing());
        assert!(clone.is_closing());
        clone.closed().await;
    }

    #[tokio::test]
    async fn test_dropped_control_unblocks_waiters() {
        let (control, session) = Session::new(1, assignment());
        drop(control);
        // Must not hang
        session.closed().await;
    }

    #[test]
    fn test_offset_tracker_is_monotonic() {
        let tracker = OffsetTracker::new();
        tracker.mark("events", 0, 5);
        tracker.mark("events", 0, 9);
        tracker.mark("events", 0, 7); // stale mark, ignored
        assert_eq!(tracker.marked_offset("events", 0), Some(9));
        assert_eq!(tracker.marked_offset("events", 1), None);
    }

    #[tokio::test]
    async fn test_marks_shared_across_clones() {
        let (_control, session) = Session::new(3, assignment());
        let clone = session.clone();

        let msg = Message::new("events", 1, 42, Bytes::from_static(b"v"));
        clone.mark(&msg);
        assert_eq!(session.offsets().marked_offset("events", 1), Some(42));
    }

    #[tokio::test]
    async fn test_claim_stream_ends_on_revocation() {
        let (tx, mut claim) = Claim::channel("events", 0, 10, 8);
        assert_eq!(claim.topic(), "events");
        assert_eq!(claim.initial_offset(), 10);

        tx.send(Message::new("events", 0, 10, Bytes::from_static(b"a")))
            .await
            .unwrap();
        drop(tx); // partition revoked

        assert_eq!(claim.next_message().await.unwrap().offset, 10);
        assert!(claim.next_message().await.is_none());
    }
}
