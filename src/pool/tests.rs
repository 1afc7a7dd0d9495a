// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;

fn workers(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn submit_n_drain_n() {
    for num_workers in [1, 2, 8] {
        let mut pool = WorkerPool::new(workers(num_workers), |i: u64, out: &Sender<u64>| {
            out.send(i * i).unwrap();
        });
        for i in 0..100 {
            pool.submit(i);
        }
        let mut results: Vec<u64> = pool.drain().collect();
        assert_eq!(results.len(), 100);
        // No ordering guarantee between results.
        results.sort_unstable();
        assert_eq!(results, (0..100).map(|i| i * i).collect::<Vec<_>>());
        pool.shutdown();
    }
}

#[test]
fn results_correlate_through_tags() {
    let mut pool = WorkerPool::new(workers(4), |(tag, x): (usize, f64), out: &Sender<(usize, f64)>| {
        out.send((tag, x.sqrt())).unwrap();
    });
    for (tag, x) in [(0, 4.0), (1, 9.0), (2, 16.0)] {
        pool.submit((tag, x));
    }
    let mut results: Vec<(usize, f64)> = pool.drain().collect();
    results.sort_by_key(|&(tag, _)| tag);
    assert_eq!(results, vec![(0, 2.0), (1, 3.0), (2, 4.0)]);
    pool.shutdown();
}

#[test]
fn drain_resets_between_batches() {
    let mut pool = WorkerPool::new(workers(2), |i: usize, out: &Sender<usize>| {
        out.send(i + 1).unwrap();
    });
    for i in 0..3 {
        pool.submit(i);
    }
    assert_eq!(pool.drain().count(), 3);
    for i in 0..2 {
        pool.submit(i);
    }
    assert_eq!(pool.drain().count(), 2);
    pool.shutdown();
}

#[test]
fn shutdown_finishes_pending_work() {
    static COMPLETED: AtomicUsize = AtomicUsize::new(0);

    let mut pool = WorkerPool::new(workers(3), |_: usize, _: &Sender<()>| {
        std::thread::sleep(Duration::from_millis(1));
        COMPLETED.fetch_add(1, Ordering::SeqCst);
    });
    for i in 0..50 {
        pool.submit(i);
    }
    // Shut down while most of the queue is still pending; the poison pills
    // sit behind the work, so everything must complete first.
    pool.shutdown();
    assert_eq!(COMPLETED.load(Ordering::SeqCst), 50);
}
