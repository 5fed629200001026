use ringpool::baseline::{BlockingQueue, ThreadPool};
use ringpool::error::PoolError;
use ringpool::task::Dispatch;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// cargo test --package ringpool --test baseline -- test_fifo --exact --nocapture
#[test]
fn test_fifo() {
    let queue = BlockingQueue::new();
    for i in 0..10 {
        queue.push(i).unwrap();
    }
    assert_eq!(queue.len(), 10);

    for i in 0..10 {
        assert_eq!(queue.pop(), Some(i));
    }
    assert!(queue.is_empty());
    assert_eq!(queue.pop(), None);
}

// cargo test --package ringpool --test baseline -- test_wait_and_pop --exact --nocapture
#[test]
fn test_wait_and_pop() {
    let queue = Arc::new(BlockingQueue::new());

    let q = queue.clone();
    let consumer = thread::spawn(move || q.wait_and_pop());

    thread::sleep(Duration::from_millis(10));
    queue.push(7).unwrap();

    assert_eq!(consumer.join().unwrap(), Some(7));
}

// cargo test --package ringpool --test baseline -- test_shutdown_wakes_waiters --exact --nocapture
#[test]
fn test_shutdown_wakes_waiters() {
    const WAITERS: usize = 4;
    let queue: Arc<BlockingQueue<u32>> = Arc::new(BlockingQueue::new());

    let ths: Vec<_> = (0..WAITERS)
        .map(|_| {
            let q = queue.clone();
            thread::spawn(move || q.wait_and_pop())
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    queue.shutdown();

    for th in ths {
        assert_eq!(th.join().unwrap(), None);
    }
    assert!(queue.is_shutdown());
    assert_eq!(queue.push(1), Err(1));
}

// cargo test --package ringpool --test baseline -- test_shutdown_drains_first --exact --nocapture
#[test]
fn test_shutdown_drains_first() {
    let queue = BlockingQueue::new();
    queue.push(1).unwrap();
    queue.push(2).unwrap();
    queue.shutdown();

    assert_eq!(queue.wait_and_pop(), Some(1));
    assert_eq!(queue.wait_and_pop(), Some(2));
    assert_eq!(queue.wait_and_pop(), None);
}

// cargo test --package ringpool --test baseline -- test_pool_graceful_shutdown --exact --nocapture
#[test]
fn test_pool_graceful_shutdown() {
    const COUNT: usize = 500;
    let pool = ThreadPool::new(2).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));

    for _ in 0..COUNT {
        let ran = ran.clone();
        let dispatch = pool
            .submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(dispatch, Dispatch::Queued);
    }

    assert!(pool.shutdown());
    assert_eq!(ran.load(Ordering::SeqCst), COUNT);
    assert!(!pool.shutdown());

    let late = pool.submit(|| {});
    assert!(matches!(late, Err(PoolError::ShutDown)));
}
