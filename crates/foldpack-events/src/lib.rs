//! Run event bus for foldpack.
//!
//! The bus carries typed lifecycle events for an archiving run, stamped with
//! sequential identifiers. Subscribers see events published after they attach.
//! Internally it uses `tokio::broadcast`; when a receiver lags, the oldest
//! events are dropped for that receiver only.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Identifier assigned to each published event.
pub type EventId = u64;

/// Default capacity of the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Stage of a folder job that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Computing the archive path or writing the archive.
    Archive,
    /// Removing the source folder after a successful archive.
    Delete,
}

impl FailureStage {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }
}

/// Lifecycle events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Subdirectories were enumerated and jobs are about to be submitted.
    RunStarted {
        /// Root directory being processed.
        root: PathBuf,
        /// Number of folder jobs in the run.
        total: usize,
    },
    /// A worker picked up a folder.
    FolderStarted {
        /// Folder name relative to the root.
        folder: String,
    },
    /// A folder archive was written.
    FolderArchived {
        /// Folder name relative to the root.
        folder: String,
        /// Archive written for the folder.
        archive_path: PathBuf,
        /// Number of file entries in the archive.
        files: usize,
    },
    /// The source folder was removed after archiving.
    FolderRemoved {
        /// Folder name relative to the root.
        folder: String,
    },
    /// A folder job stopped at the given stage.
    FolderFailed {
        /// Folder name relative to the root.
        folder: String,
        /// Stage that failed.
        stage: FailureStage,
        /// Rendered error chain.
        message: String,
    },
    /// A folder job finished, whatever its outcome.
    Progress {
        /// Jobs completed so far.
        completed: usize,
        /// Jobs in the run.
        total: usize,
    },
    /// Every submitted job has finished.
    RunCompleted {
        /// Jobs in the run.
        total: usize,
        /// Folders archived and removed.
        done: usize,
        /// Folders left in place because archiving failed.
        archive_failed: usize,
        /// Folders left in place next to their archive.
        delete_failed: usize,
        /// Folders only planned (dry run).
        planned: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::FolderStarted { .. } => "folder_started",
            Self::FolderArchived { .. } => "folder_archived",
            Self::FolderRemoved { .. } => "folder_removed",
            Self::FolderFailed { .. } => "folder_failed",
            Self::Progress { .. } => "progress",
            Self::RunCompleted { .. } => "run_completed",
        }
    }
}

/// Metadata wrapper around events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Publish a new event, assigning it a sequential identifier.
    ///
    /// Publishing never blocks and succeeds even without subscribers.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of live events from the broadcast channel.
pub struct EventStream {
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event; returns `None` once every bus handle is dropped.
    ///
    /// A lagging receiver skips the events it missed.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::task;
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(1);

    fn progress(completed: usize) -> Event {
        Event::Progress {
            completed,
            total: 500,
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_delivered_live() {
        let bus = EventBus::with_capacity(16);
        let mut stream = bus.subscribe();

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(progress(i));
        }
        assert_eq!(last_id, 5);

        let mut received = Vec::new();
        for _ in 0..5 {
            let next = timeout(RECV_TIMEOUT, stream.next())
                .await
                .expect("live event timed out");
            received.extend(next.map(|event| event.id));
        }
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn late_subscriber_only_sees_new_events() {
        let bus = EventBus::with_capacity(8);
        let _ = bus.publish(progress(1));
        let mut stream = bus.subscribe();
        let id = bus.publish(progress(2));

        assert_eq!(stream.next().await.map(|event| event.id), Some(id));
    }

    #[tokio::test]
    async fn stream_closes_when_bus_dropped() {
        let bus = EventBus::with_capacity(4);
        let mut stream = bus.subscribe();
        let _ = bus.publish(progress(1));
        drop(bus);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_retained_events() {
        let bus = EventBus::with_capacity(2);
        let mut stream = bus.subscribe();
        for i in 0..5 {
            let _ = bus.publish(progress(i));
        }
        let first = stream.next().await.map(|event| event.id);
        assert_eq!(first, Some(4));
    }

    #[tokio::test]
    async fn concurrent_publishers_do_not_lose_ids() {
        let bus = EventBus::with_capacity(512);
        let mut stream = bus.subscribe();

        let publisher = {
            let bus = bus.clone();
            task::spawn(async move {
                for i in 0..500 {
                    let _ = bus.publish(progress(i));
                }
            })
        };

        let consumer = task::spawn(async move {
            let mut ids = HashSet::new();
            while ids.len() < 500 {
                if let Some(event) = stream.next().await {
                    ids.insert(event.id);
                }
            }
            ids
        });

        publisher.await.expect("publisher task panicked");
        let ids = consumer.await.expect("consumer task panicked");
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn event_kind_and_stage_labels() {
        let failed = Event::FolderFailed {
            folder: "a".into(),
            stage: FailureStage::Delete,
            message: "busy".into(),
        };
        assert_eq!(failed.kind(), "folder_failed");
        assert_eq!(FailureStage::Archive.as_str(), "archive");
        assert_eq!(
            Event::RunStarted {
                root: PathBuf::from("/tmp"),
                total: 0
            }
            .kind(),
            "run_started"
        );
    }
}
