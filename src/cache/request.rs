//! Cache Request - Resolve-Once, Multi-Subscriber Result
//!
//! Every fetch against a cache level hands back a [`CacheRequest`]. The
//! request starts pending and is resolved exactly once, either with a value
//! or with a failure. Any number of observers can be attached before or after
//! resolution.
//!
//! # Observer semantics
//!
//! - Observers registered while pending are stored and invoked once, in
//!   registration order, at the moment the request resolves.
//! - Observers registered after resolution run synchronously, before the
//!   registering call returns.
//! - Success observers run before completion observers (and likewise for
//!   failure observers).
//! - A failure may carry no error object. `fail(None)` is still a failure and
//!   never reaches success observers.
//!
//! Observers are never invoked while the internal lock is held, so an observer
//! may register further observers on the same request.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::Error;

type SuccessObserver<T> = Box<dyn FnOnce(&T) + Send>;
type FailureObserver = Box<dyn FnOnce(Option<&Error>) + Send>;
type CompletionObserver<T> = Box<dyn FnOnce(Option<&T>, Option<&Error>) + Send>;

/// Resolution state of a request
enum Resolution<T> {
    Pending,
    Succeeded(Arc<T>),
    Failed(Option<Error>),
}

struct Inner<T> {
    resolution: Resolution<T>,
    on_success: Vec<SuccessObserver<T>>,
    on_failure: Vec<FailureObserver>,
    on_completion: Vec<CompletionObserver<T>>,
}

impl<T> Inner<T> {
    fn with_resolution(resolution: Resolution<T>) -> Self {
        Self {
            resolution,
            on_success: Vec::new(),
            on_failure: Vec::new(),
            on_completion: Vec::new(),
        }
    }
}

/// A single-assignment result shared between a level and its callers.
///
/// Cloning a `CacheRequest` yields another handle to the same underlying
/// request; resolving through any handle is visible through all of them.
pub struct CacheRequest<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for CacheRequest<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for CacheRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheRequest<T> {
    /// Create a pending request
    pub fn new() -> Self {
        Self::from_resolution(Resolution::Pending)
    }

    /// Create a request that already succeeded with `value`
    pub fn succeeded(value: T) -> Self {
        Self::from_resolution(Resolution::Succeeded(Arc::new(value)))
    }

    /// Create a request that already failed, optionally with an error
    pub fn failed(error: Option<Error>) -> Self {
        Self::from_resolution(Resolution::Failed(error))
    }

    fn from_resolution(resolution: Resolution<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::with_resolution(resolution))),
        }
    }

    /// Whether the request is still waiting for an outcome
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.lock().resolution, Resolution::Pending)
    }

    /// Whether the request resolved with a value
    pub fn is_succeeded(&self) -> bool {
        matches!(self.inner.lock().resolution, Resolution::Succeeded(_))
    }

    /// Whether the request resolved with a failure (with or without an error)
    pub fn is_failed(&self) -> bool {
        matches!(self.inner.lock().resolution, Resolution::Failed(_))
    }

    /// Register an observer for the success outcome
    pub fn on_success<F>(&self, observer: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let value = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            match &inner.resolution {
                Resolution::Pending => {
                    inner.on_success.push(Box::new(observer));
                    return self;
                }
                Resolution::Succeeded(value) => Arc::clone(value),
                Resolution::Failed(_) => return self,
            }
        };

        observer(&value);
        self
    }

    /// Register an observer for the failure outcome
    pub fn on_failure<F>(&self, observer: F) -> &Self
    where
        F: FnOnce(Option<&Error>) + Send + 'static,
    {
        let error = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            match &inner.resolution {
                Resolution::Pending => {
                    inner.on_failure.push(Box::new(observer));
                    return self;
                }
                Resolution::Failed(error) => error.clone(),
                Resolution::Succeeded(_) => return self,
            }
        };

        observer(error.as_ref());
        self
    }

    /// Register an observer for either outcome
    ///
    /// The observer receives `(Some(value), None)` on success and
    /// `(None, error)` on failure.
    pub fn on_completion<F>(&self, observer: F) -> &Self
    where
        F: FnOnce(Option<&T>, Option<&Error>) + Send + 'static,
    {
        let outcome = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            match &inner.resolution {
                Resolution::Pending => {
                    inner.on_completion.push(Box::new(observer));
                    return self;
                }
                Resolution::Succeeded(value) => Ok(Arc::clone(value)),
                Resolution::Failed(error) => Err(error.clone()),
            }
        };

        match outcome {
            Ok(value) => observer(Some(&value), None),
            Err(error) => observer(None, error.as_ref()),
        }
        self
    }

    /// Resolve the request with a value
    ///
    /// Does nothing if the request is already resolved.
    pub fn succeed(&self, value: T) {
        let (value, success, completion) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if !matches!(inner.resolution, Resolution::Pending) {
                return;
            }

            let value = Arc::new(value);
            inner.resolution = Resolution::Succeeded(Arc::clone(&value));
            inner.on_failure.clear();
            (
                value,
                std::mem::take(&mut inner.on_success),
                std::mem::take(&mut inner.on_completion),
            )
        };

        for observer in success {
            observer(&value);
        }
        for observer in completion {
            observer(Some(&value), None);
        }
    }

    /// Resolve the request with a failure
    ///
    /// `None` signals a failure with no error object available. Does nothing
    /// if the request is already resolved.
    pub fn fail(&self, error: Option<Error>) {
        let (failure, completion) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if !matches!(inner.resolution, Resolution::Pending) {
                return;
            }

            inner.resolution = Resolution::Failed(error.clone());
            inner.on_success.clear();
            (
                std::mem::take(&mut inner.on_failure),
                std::mem::take(&mut inner.on_completion),
            )
        };

        for observer in failure {
            observer(error.as_ref());
        }
        for observer in completion {
            observer(None, error.as_ref());
        }
    }
}

impl<T: Clone + Send + Sync + 'static> CacheRequest<T> {
    /// Forward this request's outcome into `target` once it resolves
    pub fn pipe_into(&self, target: CacheRequest<T>) {
        self.on_completion(move |value, error| match value {
            Some(value) => target.succeed(value.clone()),
            None => target.fail(error.cloned()),
        });
    }

    /// Await the outcome from async code
    ///
    /// Resolves to `Ok(value)` or `Err(error)`, where the error may itself be
    /// absent. If every handle to a still-pending request is dropped, the
    /// future resolves to an internal error.
    pub fn outcome(&self) -> impl Future<Output = std::result::Result<T, Option<Error>>> + Send {
        let (tx, rx) = oneshot::channel();
        self.on_completion(move |value, error| {
            let outcome = match value {
                Some(value) => Ok(value.clone()),
                None => Err(error.cloned()),
            };
            let _ = tx.send(outcome);
        });

        async move {
            rx.await.unwrap_or_else(|_| {
                Err(Some(Error::Internal(
                    "request dropped before resolution".to_string(),
                )))
            })
        }
    }
}

impl<T> From<crate::error::Result<T>> for CacheRequest<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Self::succeeded(value),
            Err(error) => Self::failed(Some(error)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CacheRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        let mut out = f.debug_struct("CacheRequest");
        match &inner.resolution {
            Resolution::Pending => out.field("state", &"pending"),
            Resolution::Succeeded(value) => out.field("succeeded", value),
            Resolution::Failed(error) => out.field("failed", error),
        };
        let observers =
            inner.on_success.len() + inner.on_failure.len() + inner.on_completion.len();
        out.field("pending_observers", &observers).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
