use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::events::{Event, EventSender};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PRINTED: &str = "printed";

/// A label waiting for (or already sent to) the physical printer. Lives only
/// in process memory; the queue resets on restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub packaging_type_id: i64,
    pub name: String,
    pub priority: i32,
    pub timestamp: String,
    pub status: String,
    pub barcode_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueOutcome {
    /// 1-based position in the queue after sorting.
    pub position: usize,
    pub duplicate: bool,
}

/// Process-wide print queue, ordered ascending by priority. All four
/// operations take the same lock, so each is atomic with respect to
/// concurrent requests.
#[derive(Clone)]
pub struct LabelQueue {
    queue: Arc<Mutex<Vec<LabelRecord>>>,
    event_sender: Arc<EventSender>,
}

impl LabelQueue {
    pub fn new(event_sender: Arc<EventSender>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            event_sender,
        }
    }

    /// Builds a pending label stamped with the current instant and enqueues
    /// it. Duplicate detection is structural over every field, timestamp and
    /// barcode included, so true duplicates are rare in practice.
    #[instrument(skip(self))]
    pub async fn enqueue(
        &self,
        packaging_type_id: i64,
        name: String,
        priority: i32,
        barcode_number: String,
    ) -> EnqueueOutcome {
        let record = LabelRecord {
            packaging_type_id,
            name,
            priority,
            timestamp: Utc::now().to_rfc3339(),
            status: STATUS_PENDING.to_string(),
            barcode_number,
        };
        self.enqueue_record(record).await
    }

    /// Enqueues an already-built record. If an identical record is present
    /// the queue is left untouched and the existing record's position is
    /// returned; otherwise the record is appended and the whole queue is
    /// re-sorted ascending by priority with a stable sort, so equal
    /// priorities keep insertion order.
    pub async fn enqueue_record(&self, record: LabelRecord) -> EnqueueOutcome {
        let packaging_type_id = record.packaging_type_id;
        let mut queue = self.queue.lock().await;

        let duplicate = queue.contains(&record);
        if !duplicate {
            queue.push(record.clone());
            queue.sort_by_key(|r| r.priority);
        }

        // Present either way, so the position lookup cannot fail.
        let position = queue
            .iter()
            .position(|r| *r == record)
            .map(|idx| idx + 1)
            .unwrap_or(queue.len());
        drop(queue);

        if duplicate {
            info!(packaging_type_id, position, "Label already queued");
        } else {
            self.event_sender
                .send_or_log(Event::LabelQueued {
                    packaging_type_id,
                    queue_position: position,
                })
                .await;
        }

        EnqueueOutcome {
            position,
            duplicate,
        }
    }

    /// The queue in its current order, unfiltered.
    pub async fn list(&self) -> Vec<LabelRecord> {
        self.queue.lock().await.clone()
    }

    /// Removes every label for `packaging_type_id`, not just the first.
    /// Returns how many were dropped.
    #[instrument(skip(self))]
    pub async fn remove(&self, packaging_type_id: i64) -> usize {
        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|r| r.packaging_type_id != packaging_type_id);
        let removed = before - queue.len();
        drop(queue);

        if removed > 0 {
            self.event_sender
                .send_or_log(Event::LabelRemoved {
                    packaging_type_id,
                    removed,
                })
                .await;
        }

        removed
    }

    /// Sets the status of the first label (in current queue order) for
    /// `packaging_type_id`. Any status string is accepted. Returns whether a
    /// match was found; later labels for the same type are untouched.
    #[instrument(skip(self))]
    pub async fn update_status(&self, packaging_type_id: i64, status: &str) -> bool {
        let mut queue = self.queue.lock().await;
        let updated = match queue
            .iter_mut()
            .find(|r| r.packaging_type_id == packaging_type_id)
        {
            Some(record) => {
                record.status = status.to_string();
                true
            }
            None => false,
        };
        drop(queue);

        if updated {
            self.event_sender
                .send_or_log(Event::LabelStatusUpdated {
                    packaging_type_id,
                    status: status.to_string(),
                })
                .await;
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn queue() -> LabelQueue {
        let (tx, _rx) = mpsc::channel(64);
        LabelQueue::new(Arc::new(EventSender::new(tx)))
    }

    fn label(packaging_type_id: i64, priority: i32, barcode: &str) -> LabelRecord {
        LabelRecord {
            packaging_type_id,
            name: format!("Type {}", packaging_type_id),
            priority,
            timestamp: "2026-08-27T10:00:00+00:00".to_string(),
            status: STATUS_PENDING.to_string(),
            barcode_number: barcode.to_string(),
        }
    }

    #[tokio::test]
    async fn lower_priority_sorts_first() {
        let q = queue();
        q.enqueue(1, "Crate".into(), 5, "100111".into()).await;
        let outcome = q.enqueue(2, "Tray".into(), 1, "200222".into()).await;

        assert_eq!(outcome.position, 1);
        let labels = q.list().await;
        assert_eq!(labels[0].packaging_type_id, 2);
        assert_eq!(labels[1].packaging_type_id, 1);
    }

    #[tokio::test]
    async fn equal_priorities_keep_insertion_order() {
        let q = queue();
        q.enqueue_record(label(1, 3, "a")).await;
        q.enqueue_record(label(2, 3, "b")).await;
        q.enqueue_record(label(3, 3, "c")).await;

        let ids: Vec<i64> = q.list().await.iter().map(|r| r.packaging_type_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn identical_record_is_suppressed() {
        let q = queue();
        let first = q.enqueue_record(label(7, 2, "700001")).await;
        let second = q.enqueue_record(label(7, 2, "700001")).await;

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(second.position, first.position);
        assert_eq!(q.list().await.len(), 1);
    }

    #[tokio::test]
    async fn differing_timestamp_is_not_a_duplicate() {
        let q = queue();
        let mut a = label(7, 2, "700001");
        q.enqueue_record(a.clone()).await;
        a.timestamp = "2026-08-27T10:00:01+00:00".to_string();
        let outcome = q.enqueue_record(a).await;

        assert!(!outcome.duplicate);
        assert_eq!(q.list().await.len(), 2);
    }

    #[tokio::test]
    async fn remove_drops_every_match() {
        let q = queue();
        q.enqueue_record(label(4, 1, "a")).await;
        q.enqueue_record(label(4, 9, "b")).await;
        q.enqueue_record(label(5, 5, "c")).await;

        assert_eq!(q.remove(4).await, 2);
        let labels = q.list().await;
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].packaging_type_id, 5);
    }

    #[tokio::test]
    async fn update_status_touches_first_match_only() {
        let q = queue();
        q.enqueue_record(label(4, 1, "a")).await;
        q.enqueue_record(label(4, 9, "b")).await;

        assert!(q.update_status(4, STATUS_PRINTED).await);
        let labels = q.list().await;
        assert_eq!(labels[0].status, STATUS_PRINTED);
        assert_eq!(labels[1].status, STATUS_PENDING);
    }

    #[tokio::test]
    async fn update_status_without_match_mutates_nothing() {
        let q = queue();
        q.enqueue_record(label(4, 1, "a")).await;

        assert!(!q.update_status(99, STATUS_PRINTED).await);
        assert_eq!(q.list().await[0].status, STATUS_PENDING);
    }
}
