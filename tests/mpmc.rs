use ringpool::error::CapacityError;
use ringpool::mpmc::Queue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Counts how many times it has been dropped.
struct Tracked(Arc<AtomicUsize>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// cargo test --package ringpool --test mpmc -- test_capacity_rounding --exact --nocapture
#[test]
fn test_capacity_rounding() {
    assert_eq!(Queue::<u8>::new(1).capacity(), 1);
    assert_eq!(Queue::<u8>::new(5).capacity(), 8);
    assert_eq!(Queue::<u8>::new(8).capacity(), 8);
    assert_eq!(Queue::<u8>::new(1000).capacity(), 1024);

    assert_eq!(Queue::<u8>::try_new(0).unwrap_err(), CapacityError::Zero);
    assert_eq!(
        Queue::<u8>::try_new(usize::MAX).unwrap_err(),
        CapacityError::Overflow(usize::MAX)
    );
}

// cargo test --package ringpool --test mpmc -- test_fifo --exact --nocapture
#[test]
fn test_fifo() {
    const COUNT: usize = 8;
    let queue: Queue<usize> = Queue::new(COUNT);

    for i in 0..COUNT {
        queue.try_enqueue(i).unwrap();
    }
    assert_eq!(queue.maybe_size(), COUNT);

    for i in 0..COUNT {
        assert_eq!(Some(i), queue.try_dequeue());
    }
    assert_eq!(queue.maybe_size(), 0);
}

// cargo test --package ringpool --test mpmc -- test_full_hands_value_back --exact --nocapture
#[test]
fn test_full_hands_value_back() {
    let queue: Queue<String> = Queue::new(2);

    queue.try_enqueue("a".to_owned()).unwrap();
    queue.try_enqueue("b".to_owned()).unwrap();
    assert_eq!(queue.try_enqueue("c".to_owned()), Err("c".to_owned()));

    assert_eq!(queue.try_dequeue().as_deref(), Some("a"));
    assert_eq!(queue.try_dequeue().as_deref(), Some("b"));
}

// cargo test --package ringpool --test mpmc -- test_single_slot --exact --nocapture
#[test]
fn test_single_slot() {
    let queue: Queue<u32> = Queue::new(1);

    queue.try_enqueue(1).unwrap();
    // The one slot is published; the next ticket must not overwrite it.
    assert_eq!(queue.try_enqueue(2), Err(2));
    assert_eq!(queue.try_dequeue(), Some(1));
}

// cargo test --package ringpool --test mpmc -- test_wraparound --exact --nocapture
#[test]
fn test_wraparound() {
    let queue: Queue<usize> = Queue::new(8);
    let mut next = 0;
    let mut seen = Vec::new();

    // Batches of five drift across the slot boundary on every round.
    for _ in 0..20 {
        for _ in 0..5 {
            queue.try_enqueue(next).unwrap();
            next += 1;
        }
        assert_eq!(queue.maybe_size(), 5);
        for _ in 0..5 {
            seen.push(queue.try_dequeue().unwrap());
        }
    }

    // Full laps.
    for _ in 0..10 {
        for _ in 0..8 {
            queue.try_enqueue(next).unwrap();
            next += 1;
        }
        assert_eq!(queue.maybe_size(), 8);
        for _ in 0..8 {
            seen.push(queue.try_dequeue().unwrap());
        }
    }

    assert_eq!(seen, (0..next).collect::<Vec<_>>());
    assert!(queue.empty_hint());
}

// cargo test --package ringpool --test mpmc -- test_empty_hint --exact --nocapture
#[test]
fn test_empty_hint() {
    let queue: Queue<u8> = Queue::new(4);
    assert!(queue.empty_hint());

    queue.try_enqueue(1).unwrap();
    assert!(!queue.empty_hint());

    assert_eq!(queue.try_dequeue(), Some(1));
    assert!(queue.empty_hint());
}

// cargo test --package ringpool --test mpmc -- test_abandoned_ticket --exact --nocapture
#[test]
fn test_abandoned_ticket() {
    let drops = Arc::new(AtomicUsize::new(0));
    let queue: Queue<Tracked> = Queue::new(2);

    // Dequeuing from an empty queue burns consumer ticket 0 ...
    assert!(queue.try_dequeue().is_none());

    // ... so the element published under producer ticket 0 is never handed out.
    assert!(queue.try_enqueue(Tracked(drops.clone())).is_ok());
    assert!(queue.try_dequeue().is_none());
    assert_eq!(queue.maybe_size(), 0);

    // It is still reclaimed with the queue.
    drop(queue);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

// cargo test --package ringpool --test mpmc -- test_drop_remaining --exact --nocapture
#[test]
fn test_drop_remaining() {
    let drops = Arc::new(AtomicUsize::new(0));
    let queue: Queue<Tracked> = Queue::new(8);
    let other = queue.clone();

    for _ in 0..6 {
        assert!(queue.try_enqueue(Tracked(drops.clone())).is_ok());
    }
    drop(other.try_dequeue());
    drop(other.try_dequeue());
    assert_eq!(drops.load(Ordering::SeqCst), 2);

    drop(queue);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
    drop(other);
    assert_eq!(drops.load(Ordering::SeqCst), 6);
}

// cargo test --package ringpool --test mpmc -- test_mpmc_no_loss --exact --nocapture
#[test]
fn test_mpmc_no_loss() {
    const COUNT: usize = 1_000;
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    let queue: Queue<usize> = Queue::new(COUNT * PRODUCERS);

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = queue.clone();
            thread::spawn(move || {
                for i in 0..COUNT {
                    q.try_enqueue(p * COUNT + i).unwrap();
                }
            })
        })
        .collect();

    for th in producers {
        th.join().unwrap();
    }
    assert_eq!(queue.maybe_size(), COUNT * PRODUCERS);

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(n) = q.try_dequeue() {
                    taken.push(n);
                }
                taken
            })
        })
        .collect();

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for th in consumers {
        for n in th.join().unwrap() {
            *counts.entry(n).or_default() += 1;
        }
    }

    assert_eq!(counts.len(), COUNT * PRODUCERS);
    assert!(counts.values().all(|&c| c == 1));
    assert!((0..COUNT * PRODUCERS).all(|n| counts.contains_key(&n)));
}

// cargo test --package ringpool --test mpmc -- test_concurrent_producers_respect_capacity --exact --nocapture
#[test]
fn test_concurrent_producers_respect_capacity() {
    const CAPACITY: usize = 64;
    const PRODUCERS: usize = 4;
    let queue: Queue<usize> = Queue::new(CAPACITY);
    let accepted = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let q = queue.clone();
            let accepted = accepted.clone();
            thread::spawn(move || {
                for i in 0..CAPACITY {
                    if q.try_enqueue(i).is_ok() {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for th in producers {
        th.join().unwrap();
    }

    // Only the first lap of tickets finds vacant slots.
    assert_eq!(accepted.load(Ordering::SeqCst), CAPACITY);

    let mut drained = 0;
    while queue.try_dequeue().is_some() {
        drained += 1;
    }
    assert_eq!(drained, CAPACITY);
}
