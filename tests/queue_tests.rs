// Integration tests for the aggregation queue.
//
// These verify the multi-producer/single-consumer contract: non-blocking
// publish, drop-oldest overflow, close-then-drain semantics, and that
// delivery order feeding the timeline yields timestamp order.

use contextrec::{Event, EventQueue, ScreenshotTrigger, Timeline};
use std::sync::Arc;

#[tokio::test]
async fn delivery_order_drains_into_timestamp_order() {
    // Inject events in delivery order Transcript(100), Clipboard(50),
    // Screenshot(75); after the drain the timeline must hold them in
    // timestamp order 50, 75, 100.
    let queue = Arc::new(EventQueue::new(16));
    queue.publish(Event::transcript(100, 400, "hello", 0.9).unwrap());
    queue.publish(Event::clipboard(50, "foo").unwrap());
    queue.publish(Event::screenshot(75, "img_000075.png", 800, 600, ScreenshotTrigger::Hotkey).unwrap());
    queue.close();

    let mut timeline = Timeline::new();
    while let Some(event) = queue.recv().await {
        timeline.append(event);
    }
    timeline.freeze();

    let timestamps: Vec<u64> = timeline.events().iter().map(|e| e.timestamp_ms()).collect();
    assert_eq!(timestamps, vec![50, 75, 100], "timeline must re-sort delivery order");
}

#[tokio::test]
async fn publish_never_blocks_under_overflow() {
    let queue = EventQueue::new(4);
    for i in 0..100u64 {
        // publish is synchronous; if it blocked, this loop would hang
        assert!(queue.publish(Event::clipboard(i + 1, format!("c{i}")).unwrap()));
    }
    assert_eq!(queue.len(), 4, "queue must stay bounded");
    assert_eq!(queue.dropped(), 96, "overflow must drop the oldest events");

    // The survivors are the newest four, in delivery order.
    let mut remaining = Vec::new();
    while let Some(event) = queue.try_recv() {
        remaining.push(event.timestamp_ms());
    }
    assert_eq!(remaining, vec![97, 98, 99, 100]);
}

#[tokio::test]
async fn concurrent_producers_all_deliver() {
    let queue = Arc::new(EventQueue::new(256));
    let mut handles = Vec::new();
    for p in 0..4u64 {
        let queue = Arc::clone(&queue);
        handles.push(tokio::spawn(async move {
            for i in 0..32u64 {
                queue.publish(Event::clipboard(p * 1000 + i + 1, format!("p{p}-{i}")).unwrap());
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    queue.close();

    let mut count = 0;
    while queue.recv().await.is_some() {
        count += 1;
    }
    assert_eq!(count, 128, "all published events must be delivered");
    assert_eq!(queue.dropped(), 0);
}

#[tokio::test]
async fn close_wakes_pending_consumer() {
    let queue = Arc::new(EventQueue::new(8));
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.recv().await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    queue.close();
    let received = tokio::time::timeout(std::time::Duration::from_secs(1), consumer)
        .await
        .expect("consumer must wake on close")
        .unwrap();
    assert!(received.is_none(), "closed empty queue yields end of stream");
}
