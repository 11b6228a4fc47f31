use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tracked_queue::TrackedQueue;

const PRODUCERS: usize = 4;
const CONSUMERS: usize = 4;
const ITEMS_PER_PRODUCER: usize = 2500;

#[test]
fn test_many_producers_many_consumers() {
    // None tells a consumer to stop
    let queue: TrackedQueue<Option<(usize, usize)>> = TrackedQueue::new();

    let received: Vec<Vec<(usize, usize)>> = thread::scope(|s| {
        let queue = &queue;
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                s.spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        let (item, _done) = queue.pop_with_guard();
                        match item {
                            Some(pair) => seen.push(pair),
                            None => break,
                        }
                    }
                    seen
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                s.spawn(move || {
                    for seq in 0..ITEMS_PER_PRODUCER {
                        queue.push(Some((producer, seq)));
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }
        for _ in 0..CONSUMERS {
            queue.push(None);
        }

        consumers.into_iter().map(|h| h.join().unwrap()).collect()
    });

    queue.join();

    // a single consumer always sees a producer's items in the order they were pushed
    for seen in &received {
        let mut last = [None; PRODUCERS];
        for &(producer, seq) in seen {
            if let Some(prev) = last[producer] {
                assert!(seq > prev, "producer {producer} reordered: {seq} after {prev}");
            }
            last[producer] = Some(seq);
        }
    }

    let all: Vec<_> = received.into_iter().flatten().collect();
    let unique: HashSet<_> = all.iter().copied().collect();
    assert_eq!(all.len(), PRODUCERS * ITEMS_PER_PRODUCER, "lost items");
    assert_eq!(unique.len(), all.len(), "duplicated items");

    let stats = queue.stats();
    let total = (PRODUCERS * ITEMS_PER_PRODUCER + CONSUMERS) as u64;
    assert_eq!(stats.enqueued_total, total);
    assert_eq!(stats.completed_total, total);
    assert_eq!(stats.unfinished_tasks, 0);
}

#[test]
fn test_consumers_stop_on_timeout() {
    struct BigThing {
        _data: [u8; 2048],
    }

    let queue = TrackedQueue::new();
    let handled = AtomicUsize::new(0);
    let items = 4000;

    thread::scope(|s| {
        for _ in 0..CONSUMERS {
            s.spawn(|| {
                while let Ok((_item, _done)) = queue.pop_with_guard_timeout(Duration::from_millis(100)) {
                    handled.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
        s.spawn(|| {
            for _ in 0..items {
                queue.push(BigThing { _data: [0; 2048] });
            }
        });
    });

    // consumers may give up before a slow producer finishes
    while let Some((_item, _done)) = queue.try_pop_with_guard() {
        handled.fetch_add(1, Ordering::Relaxed);
    }
    queue.join();
    assert_eq!(handled.load(Ordering::Relaxed), items);
}

#[test]
fn test_concurrent_push_and_join() {
    let queue = TrackedQueue::new();
    let handled = AtomicUsize::new(0);

    thread::scope(|s| {
        let (queue, handled) = (&queue, &handled);
        let producers: Vec<_> = (0..3)
            .map(|_| {
                s.spawn(move || {
                    for i in 0..20 {
                        queue.push_and_join(Some(i));
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(move || loop {
                    let (item, _done) = queue.pop_with_guard();
                    if item.is_none() {
                        break;
                    }
                    handled.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();

        for handle in producers {
            handle.join().unwrap();
        }
        queue.extend([None, None]);
        for handle in consumers {
            handle.join().unwrap();
        }
    });

    queue.join();
    assert_eq!(handled.load(Ordering::Relaxed), 60);
    assert_eq!(queue.unfinished_tasks(), 0);
}
