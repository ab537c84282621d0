use std::iter::zip;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use tracing::{trace, warn};

use crate::error::{Error, Result};

/// Cut a value into at most `n` independently processable parts.
pub trait Split: Sized {
    fn split_to_vec(self, n: usize) -> Vec<Self>;
}

/// Reassemble parts produced by [`Split`], in order.
pub trait Join: Sized {
    fn join_vec(parts: Vec<Self>) -> Result<Self>;
}

pub struct RangeSplitter;

impl RangeSplitter {
    /// Cuts `start..end` into `n` contiguous ranges whose lengths differ by at
    /// most one, the longer ones first.
    pub fn split(start: usize, end: usize, n: usize) -> Vec<(usize, usize)> {
        let n = n.max(1);
        let len = end.saturating_sub(start);
        let size = len / n;
        let size_xtra = len % n;

        let mut ranges = Vec::with_capacity(n);
        let mut from = start;
        for i in 0..n {
            let to = from + size + usize::from(i < size_xtra);
            ranges.push((from, to));
            from = to;
        }
        ranges
    }
}

impl<T> Split for Vec<T> {
    fn split_to_vec(mut self, n: usize) -> Vec<Self> {
        let mut parts: Vec<Vec<T>> = vec![];
        for (start, _) in RangeSplitter::split(0, self.len(), n).into_iter().rev() {
            parts.push(self.split_off(start));
        }
        parts.reverse();
        parts
    }
}

impl<T> Join for Vec<T> {
    fn join_vec(parts: Vec<Self>) -> Result<Self> {
        Ok(parts.into_iter().flatten().collect())
    }
}

#[derive(Debug)]
struct SplitPart<T> {
    n: usize,
    part: T,
}

struct Worker<T> {
    tx: mpsc::Sender<SplitPart<T>>,
}

impl<T> Worker<T>
where
    T: Send + 'static,
{
    /// Every part received gets exactly one reply, `None` if `f` panicked.
    /// A worker that panicked closes its input before replying and exits.
    fn spawn<U, F>(id: usize, mut f: F, sol_tx: mpsc::Sender<SplitPart<Option<U>>>) -> Self
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<SplitPart<T>>();
        thread::spawn(move || {
            while let Ok(SplitPart { n, part }) = rx.recv() {
                trace!(worker = id, part = n, "solving part");
                match panic::catch_unwind(AssertUnwindSafe(|| f(part))) {
                    Ok(solved) => {
                        if sol_tx.send(SplitPart { n, part: Some(solved) }).is_err() {
                            return;
                        }
                    }
                    Err(_) => {
                        warn!(worker = id, part = n, "worker panicked");
                        drop(rx);
                        let _ = sol_tx.send(SplitPart { n, part: None });
                        return;
                    }
                }
            }
        });
        Self { tx }
    }

    fn send(&self, part: SplitPart<T>) -> Result<()> {
        self.tx.send(part).map_err(|_| Error::WorkerDisconnected)
    }
}

/// Fixed set of worker threads. [`WorkerPool::call`] splits its input across
/// the workers, waits for every part and joins the results in order.
///
/// Workers exit when the pool is dropped.
pub struct WorkerPool<T, U> {
    workers: Vec<Worker<T>>,
    rx: mpsc::Receiver<SplitPart<Option<U>>>,
}

impl<T, U> WorkerPool<T, U>
where
    T: Split + Send + 'static,
    U: Join + Send + 'static,
{
    /// Spawns `n` workers (at least one), each running a closure built by `make`.
    pub fn with<M, F>(n: usize, make: M) -> Self
    where
        M: Fn() -> F,
        F: FnMut(T) -> U + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let workers = (0..n.max(1))
            .map(|id| Worker::spawn(id, make(), tx.clone()))
            .collect();
        Self { workers, rx }
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// On error every part that did go out is still collected, so nothing
    /// stale is left queued for the next call.
    pub fn call(&self, input: T) -> Result<U> {
        let mut status = Ok(());
        let mut sent = 0;
        for (worker, (n, part)) in zip(
            &self.workers,
            input.split_to_vec(self.workers.len()).into_iter().enumerate(),
        ) {
            if let Err(e) = worker.send(SplitPart { n, part }) {
                status = Err(e);
                break;
            }
            sent += 1;
        }

        let mut slots: Vec<Option<U>> = (0..sent).map(|_| None).collect();
        for _ in 0..sent {
            match self.rx.recv() {
                Ok(SplitPart { n, part: Some(part) }) => slots[n] = Some(part),
                Ok(SplitPart { part: None, .. }) => {
                    status = status.and(Err(Error::WorkerPanicked));
                }
                Err(_) => return Err(Error::WorkerDisconnected),
            }
        }
        status?;

        let parts: Option<Vec<U>> = slots.into_iter().collect();
        let parts = parts.ok_or_else(|| Error::JoinMismatch("missing part".to_string()))?;
        U::join_vec(parts)
    }
}
