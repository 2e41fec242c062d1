//! The single consumer appending discovered image references to the output sink.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::barrier::{TerminationBarrier, WorkUnit};
use crate::stats::Stats;

/// A queued line, holding its work unit until written.
#[derive(Debug)]
struct Entry {
    line: String,
    unit: WorkUnit,
}

/// The producing side of the writer queue, shared by every parse task.
#[derive(Debug, Clone)]
pub(crate) struct Queue {
    sender: mpsc::UnboundedSender<Entry>,
}

impl Queue {
    /// Queue `line` for writing, `unit` is released once the line has been handled.
    pub(crate) fn push(&self, line: String, unit: WorkUnit) {
        if let Err(mpsc::error::SendError(entry)) = self.sender.send(Entry { line, unit }) {
            tracing::warn!("Result writer is gone, dropping `{}`.", entry.line);
        }
    }
}

/// Spawn the result writer on its own task.
///
/// The writer drains the queue into `sink` until `barrier` reaches quiescence, then flushes and hands `sink` back.
pub(crate) fn spawn<W>(sink: W, barrier: Arc<TerminationBarrier>, stats: Arc<Stats>) -> (Queue, JoinHandle<W>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();

    let writer = Writer {
        sink,
        receiver,
        barrier,
        stats,
    };

    (Queue { sender }, tokio::spawn(writer.run()))
}

struct Writer<W> {
    sink: W,
    receiver: mpsc::UnboundedReceiver<Entry>,
    barrier: Arc<TerminationBarrier>,
    stats: Arc<Stats>,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    async fn run(mut self) -> W {
        tracing::debug!("Starting result writer...");

        loop {
            // a queued entry holds a unit, so quiescence implies an empty queue:
            // entries are always drained before considering it
            tokio::select! {
                biased;

                Some(Entry { line, unit }) = self.receiver.recv() => {
                    self.write(line).await;
                    unit.release();
                }
                _ = self.barrier.wait_for_quiescence() => break,
            }
        }

        if let Err(err) = self.sink.flush().await {
            tracing::warn!("Failed to flush output: {err}");
        }

        tracing::debug!("Nothing left to write, shutting down result writer.");

        self.sink
    }

    async fn write(&mut self, mut line: String) {
        line.push('\n');

        match self.sink.write_all(line.as_bytes()).await {
            Ok(()) => self.stats.line_written(),
            Err(err) => {
                tracing::warn!("Failed to write `{}`: {err}", line.trim_end());
                self.stats.write_failed();
            }
        }
    }
}
