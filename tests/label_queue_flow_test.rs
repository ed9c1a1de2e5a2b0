//! End-to-end flow over the in-process label print queue: enqueue with
//! mixed priorities, mark printed, remove, and observe emitted events.

use std::sync::Arc;

use tokio::sync::mpsc;

use packhouse_api::events::{Event, EventSender};
use packhouse_api::services::labels::{LabelQueue, STATUS_PENDING, STATUS_PRINTED};

#[tokio::test]
async fn queue_lifecycle_orders_prints_and_removes() {
    let (tx, mut rx) = mpsc::channel(32);
    let queue = LabelQueue::new(Arc::new(EventSender::new(tx)));

    // Urgent label jumps ahead of the earlier low-priority one.
    let first = queue
        .enqueue(10, "Pallet - 10".into(), 5, "1017564000001234".into())
        .await;
    let second = queue
        .enqueue(11, "Case - 11".into(), 1, "1117564000005678".into())
        .await;

    assert!(!first.duplicate);
    assert_eq!(first.position, 1);
    assert!(!second.duplicate);
    assert_eq!(second.position, 1);

    let labels = queue.list().await;
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].packaging_type_id, 11);
    assert_eq!(labels[1].packaging_type_id, 10);
    assert!(labels.iter().all(|l| l.status == STATUS_PENDING));

    // The printer worker reports the head label done.
    assert!(queue.update_status(11, STATUS_PRINTED).await);
    assert_eq!(queue.list().await[0].status, STATUS_PRINTED);

    // Operator cancels the remaining job for type 10.
    assert_eq!(queue.remove(10).await, 1);
    assert_eq!(queue.remove(10).await, 0);
    assert_eq!(queue.list().await.len(), 1);

    // Every mutation surfaced as an event, in order.
    assert!(matches!(
        rx.recv().await,
        Some(Event::LabelQueued {
            packaging_type_id: 10,
            queue_position: 1,
        })
    ));
    assert!(matches!(
        rx.recv().await,
        Some(Event::LabelQueued {
            packaging_type_id: 11,
            queue_position: 1,
        })
    ));
    match rx.recv().await {
        Some(Event::LabelStatusUpdated {
            packaging_type_id,
            status,
        }) => {
            assert_eq!(packaging_type_id, 11);
            assert_eq!(status, STATUS_PRINTED);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(
        rx.recv().await,
        Some(Event::LabelRemoved {
            packaging_type_id: 10,
            removed: 1,
        })
    ));
}
