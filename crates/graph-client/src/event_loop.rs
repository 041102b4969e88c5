//! Dedicated single-threaded event loop.
//!
//! Each connection owns one loop: a named OS thread driving a current-thread
//! tokio runtime. Work is marshaled onto it with [`EventLoop::run_and_wait`]
//! (blocking the caller) or [`EventLoop::handle`] + spawn (fire and forget).

use std::future::Future;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use thiserror::Error;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

/// Name given to event loop threads.
pub const LOOP_THREAD_NAME: &str = "graph-conn-loop";

/// Errors from the event loop.
#[derive(Debug, Error)]
pub enum LoopError {
    /// The loop thread or runtime could not be created.
    #[error("failed to start event loop: {0}")]
    Spawn(#[source] std::io::Error),

    /// The loop stopped before the work completed.
    #[error("event loop stopped")]
    Stopped,

    /// A blocking call was made from the loop's own thread.
    #[error("blocking call issued from the event loop thread")]
    Reentrant,
}

/// A single-threaded runtime on its own thread.
pub struct EventLoop {
    handle: Handle,
    thread_id: ThreadId,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl EventLoop {
    /// Start a new loop thread.
    pub fn spawn() -> Result<Self, LoopError> {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(runtime.handle().clone()));
                runtime.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(LoopError::Spawn)?;

        let handle = ready_rx
            .recv()
            .map_err(|_| LoopError::Stopped)?
            .map_err(LoopError::Spawn)?;
        let thread_id = thread.thread().id();
        tracing::trace!(?thread_id, "event loop started");

        Ok(Self {
            handle,
            thread_id,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Handle for spawning work onto the loop.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Whether the calling thread is this loop's thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Run `fut` on the loop and block until it finishes.
    ///
    /// Fails with [`LoopError::Reentrant`] on the loop thread, where waiting
    /// would deadlock.
    pub fn run_and_wait<F>(&self, fut: F) -> Result<F::Output, LoopError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_current() {
            return Err(LoopError::Reentrant);
        }
        let (tx, rx) = mpsc::sync_channel(1);
        self.handle.spawn(async move {
            let _ = tx.send(fut.await);
        });
        rx.recv().map_err(|_| LoopError::Stopped)
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // Dropped from a callback on the loop itself: the thread exits on its
        // own once the current task yields.
        if self.is_current() {
            return;
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        tracing::trace!(thread_id = ?self.thread_id, "event loop stopped");
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("thread_id", &self.thread_id)
            .finish()
    }
}
