#![cfg(loom)]

use loom::thread;
use ringpool::spsc;

// Run all tests:
//
// RUSTFLAGS="--cfg loom" cargo test --package ringpool --test loom_spsc --release

// A ring of four slots holds three items, so pushing four items exercises both the
// full check and the reuse of the slot freed by the consumer.
//
// RUSTFLAGS="--cfg loom" cargo test --package ringpool --test loom_spsc --release -- test_push_pop_order --exact
#[test]
fn test_push_pop_order() {
    loom::model(|| {
        const COUNT: usize = 4;
        let (mut tx, mut rx) = spsc::bounded::<usize>(4);

        let th = thread::spawn(move || {
            for i in 0..COUNT {
                let mut item = i;
                while let Err(back) = tx.try_push(item) {
                    item = back;
                    thread::yield_now();
                }
            }
        });

        for i in 0..COUNT {
            let n = loop {
                if let Some(x) = rx.try_pop() {
                    break x;
                }
                // Loom scheduler is, by design, not fair. Yielding tells loom this thread
                // can't make progress until the producer runs.
                thread::yield_now();
            };
            assert_eq!(i, n);
        }

        th.join().unwrap();
    });
}

// RUSTFLAGS="--cfg loom" cargo test --package ringpool --test loom_spsc --release -- test_drop_with_items_in_flight --exact
#[test]
fn test_drop_with_items_in_flight() {
    loom::model(|| {
        let (mut tx, mut rx) = spsc::bounded::<Box<usize>>(2);

        let th = thread::spawn(move || {
            let _ = tx.try_push(Box::new(1));
        });

        let _ = rx.try_pop();
        th.join().unwrap();
        // Whatever was not popped is released with the last handle.
        drop(rx);
    });
}
