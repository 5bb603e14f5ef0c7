//! # Resource Wrapper
//!
//! What the UI sees for any use case: still loading, a value, or an error.
//!
//! ## Observation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Observed::spawn(use_case.execute(..))                                  │
//! │       │                                                                 │
//! │       ├──► watch: Loading                                               │
//! │       │                                                                 │
//! │       ▼  (task finishes)                                                │
//! │       ├──► watch: Success(value) | Error { message, code }              │
//! │       │                                                                 │
//! │  drop / cancel() ──► task aborted, watch keeps its last value           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;

use crate::error::{ApiResult, ErrorCode};

/// State of an asynchronous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Resource<T> {
    Loading,
    Success(T),
    Error {
        message: String,
        code: Option<ErrorCode>,
    },
}

impl<T> Resource<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Resource::Success(_))
    }

    /// The value, if loaded.
    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Resource::Loading => Resource::Loading,
            Resource::Success(value) => Resource::Success(f(value)),
            Resource::Error { message, code } => Resource::Error { message, code },
        }
    }
}

impl<T> From<ApiResult<T>> for Resource<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(value) => Resource::Success(value),
            Err(err) => Resource::Error {
                message: err.message,
                code: Some(err.code),
            },
        }
    }
}

// =============================================================================
// Observed
// =============================================================================

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A use case running in the background, observable through a watch channel.
///
/// Emits `Loading` first, then the settled value. Dropping the handle (or
/// calling [`Observed::cancel`]) aborts the task.
#[derive(Debug)]
pub struct Observed<T> {
    rx: watch::Receiver<Resource<T>>,
    task: AbortOnDrop,
}

impl<T> Observed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawns `work` on the current runtime.
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Resource::Loading);

        let task = tokio::spawn(async move {
            let result = work.await;
            // Nobody listening is fine
            let _ = tx.send(Resource::from(result));
        });

        Observed {
            rx,
            task: AbortOnDrop(task),
        }
    }

    /// Latest emitted state.
    pub fn current(&self) -> Resource<T> {
        self.rx.borrow().clone()
    }

    /// Waits until the task settles.
    ///
    /// Returns `Loading` if the task was cancelled before producing a value.
    pub async fn settled(&mut self) -> Resource<T> {
        loop {
            {
                let value = self.rx.borrow_and_update();
                if !value.is_loading() {
                    return value.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }

    /// Stops the task. The last emitted state stays readable.
    pub fn cancel(&self) {
        self.task.0.abort();
    }

    /// Converts into a stream of states, starting with the current one.
    /// The task lives as long as the stream.
    pub fn into_stream(self) -> ObservedStream<T> {
        ObservedStream {
            inner: WatchStream::new(self.rx),
            _task: self.task,
        }
    }
}

/// Stream form of [`Observed`].
pub struct ObservedStream<T> {
    inner: WatchStream<Resource<T>>,
    _task: AbortOnDrop,
}

impl<T> Stream for ObservedStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = Resource<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
