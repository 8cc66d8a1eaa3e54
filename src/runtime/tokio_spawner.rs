//! Tokio runtime spawner implementation.

use std::future::Future;

use tokio::runtime::{Handle, Runtime};

use crate::core::Spawn;

/// Tokio-based spawner that runs units on a tokio runtime.
///
/// The spawner only holds a [`Handle`]; whoever owns the runtime decides when it
/// shuts down.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Build a multi-threaded runtime with `worker_threads` workers and a spawner for it.
    ///
    /// The caller keeps the returned [`Runtime`] alive for as long as units run.
    /// Drop it from synchronous code, or call [`Runtime::shutdown_background`]
    /// from async code.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while building the runtime.
    pub fn with_worker_threads(worker_threads: usize) -> Result<(Self, Runtime), std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("unit-scheduler")
            .enable_all()
            .build()?;
        Ok((Self::new(runtime.handle().clone()), runtime))
    }

    /// Handle of the runtime units are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
