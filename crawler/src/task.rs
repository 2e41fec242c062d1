//! This module provides required task pooling features.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{self, Future, FutureExt};
use tokio::sync::{mpsc, Mutex};

type Task = future::BoxFuture<'static, ()>;

/// A bounded pool of workers to deal with asynchronous tasks in the background.
///
/// At most `size` tasks are polled at the same time, one per worker. Pending tasks are queued in an unbounded channel
/// until a worker becomes available, so the pool bounds parallelism but never pushes back on submitters.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use std::num::NonZeroUsize;
/// # use crawler::task::Pool;
/// let mut pool = Pool::named("example");
/// pool.start(NonZeroUsize::new(3).unwrap());
///
/// for i in 0..=5 {
///     pool.forget(async move { println!("Hello from task #{i}!") });
/// }
///
/// pool.close().await;
/// # })
/// ```
/// ```text
/// Hello from task #0!
/// Hello from task #1!
/// Hello from task #2!
/// Hello from task #3!
/// Hello from task #4!
/// Hello from task #5!
/// ```
#[derive(Debug, Default)]
pub struct Pool {
    /// A name to tell pools apart in logs.
    name: &'static str,
    /// The pool of workers.
    workers: Vec<Worker>,
    /// The sending part of a channel to push tasks to the workers.
    ///
    /// The next available worker will wait for a task to be received through the channel.
    /// This is the only strong sender: once dropped, workers drain the channel and shut down.
    sender: Option<mpsc::UnboundedSender<Task>>,
}

impl Pool {
    /// Create a stopped pool with a name used in logs.
    pub fn named(name: &'static str) -> Self {
        Self { name, ..Default::default() }
    }

    /// Start a pool with `size` workers.
    ///
    /// Once started, tasks can be pushed and will be processed in the background in order.
    ///
    /// _Note: if a task is sent to the pool while not started, it is just lost without executing anything._
    ///
    /// # Panics
    /// This method panics if the pool is already running, ie. when called more than once without stopping the pool in between.
    pub fn start(&mut self, size: NonZeroUsize) {
        assert!(self.sender.is_none() && self.workers.is_empty());

        let (sender, receiver) = mpsc::unbounded_channel();

        let receiver = Arc::new(Mutex::new(receiver));

        static WORKER_ID: AtomicUsize = AtomicUsize::new(0);
        let size = size.get();
        let id = WORKER_ID.fetch_add(size, Ordering::Relaxed);

        self.workers = (0..size)
            .map(|i| Worker::new(self.name, id.wrapping_add(i), Arc::clone(&receiver)))
            .collect();
        self.sender = Some(sender);
    }

    /// Number of running workers.
    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Return a cloneable handle to push tasks to this pool from other tasks.
    ///
    /// A spawner does not keep the pool alive: once the pool is stopped, tasks sent through it are just lost.
    pub fn spawner(&self) -> Spawner {
        Spawner {
            name: self.name,
            sender: self.sender.as_ref().map(mpsc::UnboundedSender::downgrade),
        }
    }

    /// Send a task and forget it.
    ///
    /// _Note: if the pool has not been started yet, the task is just lost without executing anything._
    ///
    /// ```
    /// # use crawler::task::Pool;
    /// # let pool = Pool::default();
    /// pool.forget(async { println!("Hello world!") });
    /// ```
    #[inline]
    pub fn forget(&self, future: impl Future<Output = ()> + Send + 'static) {
        if let Some(ref sender) = self.sender {
            send(self.name, sender, future.boxed());
        }
    }

    /// Stop current pool of workers, waiting for all pending tasks to complete.
    ///
    /// Once stopped, the pool can be started again with any number of workers.
    ///
    /// _Note: if a task is sent to the pool while stopped, it is just lost without executing anything._
    pub async fn stop(&mut self) {
        drop(self.sender.take());
        let workers = std::mem::take(&mut self.workers);

        let results = future::join_all(workers.into_iter().inspect(|worker| {
            tracing::debug!("Stopping {} worker {}...", self.name, worker.id);
        }))
        .await;

        for err in results.into_iter().filter_map(Result::err) {
            tracing::warn!("A {} worker did not stop cleanly: {err}", self.name);
        }
    }

    /// Close current pool of workers, waiting for all pending tasks to complete.
    ///
    /// Once closed, the pool cannot be used since it is consumed.
    pub async fn close(mut self) {
        self.stop().await
    }
}

/// A weak handle on a [`Pool`] to push tasks from within other tasks.
#[derive(Debug, Clone)]
pub struct Spawner {
    name: &'static str,
    sender: Option<mpsc::WeakUnboundedSender<Task>>,
}

impl Spawner {
    /// Send a task and forget it.
    ///
    /// _Note: if the pool has been stopped in the meantime, the task is just dropped without executing anything._
    pub fn forget(&self, future: impl Future<Output = ()> + Send + 'static) {
        match self.sender.as_ref().and_then(mpsc::WeakUnboundedSender::upgrade) {
            Some(sender) => send(self.name, &sender, future.boxed()),
            None => tracing::debug!("The {} pool is not running, dropping task.", self.name),
        }
    }
}

fn send(name: &str, sender: &mpsc::UnboundedSender<Task>, task: Task) {
    if sender.send(task).is_err() {
        tracing::warn!("All {name} workers are gone, dropping task.");
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    fn new(name: &'static str, id: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>) -> Worker {
        tracing::debug!("Starting {name} worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                loop {
                    let message = receiver.lock().await.recv().await;

                    match message {
                        Some(task) => {
                            tracing::trace!("Executing task on {name} worker {id}...");

                            task.await;
                        }
                        None => {
                            tracing::debug!("All tasks exhausted, shutting down {name} worker {id}.");
                            break;
                        }
                    }
                }
            }),
        }
    }
}

impl Future for Worker {
    type Output = Result<(), tokio::task::JoinError>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}
