// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A bounded pool of worker threads draining one shared queue.
//!
//! The intended shape of a session: [WorkerPool::new], any number of
//! [WorkerPool::submit]s, a [WorkerPool::drain] to collect one result per
//! submission, then [WorkerPool::shutdown]. Results arrive in completion
//! order, not submission order; callers that need to correlate them should
//! carry a tag inside the result payload.

#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};

enum Job<T> {
    Work(T),
    /// The poison pill; the worker that receives it terminates.
    Terminate,
}

/// A fixed-size set of named worker threads sharing a pending queue and a
/// result sink. The worker count can't change over the pool's lifetime.
pub struct WorkerPool<T, R> {
    workers: Vec<JoinHandle<()>>,
    work_tx: Sender<Job<T>>,
    results_rx: Receiver<R>,
    num_submitted: usize,
}

impl<T: Send + 'static, R: Send + 'static> WorkerPool<T, R> {
    /// Spawn `num_workers` threads, each looping over the pending queue and
    /// calling `work_fn` on every item it pulls. `work_fn` pushes its
    /// result(s) through the supplied sender; [WorkerPool::drain] expects
    /// exactly one result per item.
    pub fn new<F>(num_workers: NonZeroUsize, work_fn: F) -> WorkerPool<T, R>
    where
        F: Fn(T, &Sender<R>) + Send + Sync + 'static,
    {
        let (work_tx, work_rx) = unbounded::<Job<T>>();
        let (results_tx, results_rx) = unbounded();
        let work_fn = Arc::new(work_fn);

        debug!("Spawning {num_workers} worker threads");
        let workers = (0..num_workers.get())
            .map(|i| {
                let work_rx = work_rx.clone();
                let results_tx = results_tx.clone();
                let work_fn = Arc::clone(&work_fn);
                thread::Builder::new()
                    .name(format!("worker-{i}"))
                    .spawn(move || {
                        // A blocking recv; workers idle rather than spin
                        // while the queue is empty.
                        while let Ok(job) = work_rx.recv() {
                            match job {
                                Job::Terminate => {
                                    trace!("worker-{i} got the poison pill");
                                    break;
                                }
                                Job::Work(item) => work_fn(item, &results_tx),
                            }
                        }
                    })
                    .expect("OS can create threads")
            })
            .collect();

        WorkerPool {
            workers,
            work_tx,
            results_rx,
            num_submitted: 0,
        }
    }

    /// Enqueue one work item.
    pub fn submit(&mut self, item: T) {
        self.work_tx
            .send(Job::Work(item))
            .expect("the work queue is connected while the pool is alive");
        self.num_submitted += 1;
    }

    /// Yield exactly one result per item submitted since the last drain, in
    /// completion order. Blocks while results are still being produced.
    pub fn drain(&mut self) -> impl Iterator<Item = R> {
        let num = std::mem::take(&mut self.num_submitted);
        let results_rx = self.results_rx.clone();
        (0..num).map(move |_| {
            results_rx
                .recv()
                .expect("workers hold the result sink while the pool is alive")
        })
    }

    /// Send every worker a poison pill, then block until all pending work
    /// has been finished and every worker has terminated. The queue is FIFO,
    /// so no submitted item is abandoned.
    pub fn shutdown(self) {
        for _ in &self.workers {
            self.work_tx
                .send(Job::Terminate)
                .expect("the work queue is connected while the pool is alive");
        }
        for worker in self.workers {
            worker.join().expect("a worker thread panicked");
        }
        debug!("All workers terminated");
    }
}
