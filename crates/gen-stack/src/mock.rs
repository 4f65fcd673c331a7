//! Mock provider for testing.
//!
//! [`MockProvider`] is a queue-based fake that lets tests script exactly
//! which events each turn streams and which errors are returned, without
//! touching the network. It implements [`Provider`], so it works anywhere
//! a real backend does, including behind `Arc<dyn DynProvider>`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gen_stack::catalog::ModelCatalog;
//! use gen_stack::mock::MockProvider;
//! use gen_stack::test_helpers::mock_metadata;
//! use gen_stack::{GenerationService, ProviderEvent, Usage};
//!
//! let mock = Arc::new(MockProvider::new(mock_metadata()));
//! mock.queue_stream(vec![
//!     ProviderEvent::TextDelta("Hello".into()),
//!     ProviderEvent::Completed { usage: Usage::default() },
//! ]);
//! let service = GenerationService::new(mock.clone(), Arc::new(ModelCatalog::new()));
//! ```
//!
//! [`GenerationError`] is not `Clone`, so queued failures are stored as
//! [`MockError`] and converted when dequeued.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;

use crate::error::GenerationError;
use crate::provider::{Provider, ProviderMetadata, ResponseRequest, SafetyVerdict};
use crate::stream::{ProviderEvent, ProviderStream};

/// A queue-based mock provider for unit and integration tests.
///
/// Every `stream` call pops the front of the stream queue and records its
/// [`ResponseRequest`] for [`recorded_calls`](Self::recorded_calls).
/// `moderate` pops the moderation queue. Streams handed out and not yet
/// dropped are counted by [`open_streams`](Self::open_streams).
///
/// # Panics
///
/// `stream` and `moderate` panic when their queue is empty.
pub struct MockProvider {
    streams: Mutex<VecDeque<Result<Vec<MockStreamItem>, MockError>>>,
    moderations: Mutex<VecDeque<Result<SafetyVerdict, MockError>>>,
    meta: ProviderMetadata,
    calls: Arc<Mutex<Vec<ResponseRequest>>>,
    open: Arc<AtomicUsize>,
}

/// Decrements the open-stream count when the stream holding it drops.
struct OpenStreamGuard(Arc<AtomicUsize>);

impl OpenStreamGuard {
    fn acquire(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(open))
    }
}

impl Drop for OpenStreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One scripted stream item.
#[derive(Debug, Clone)]
enum MockStreamItem {
    Event(ProviderEvent),
    Error(MockError),
}

/// Cloneable mirror of the common [`GenerationError`] variants.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Maps to [`GenerationError::Http`].
    Http {
        /// HTTP status code, if any.
        status: Option<http::StatusCode>,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`GenerationError::Auth`].
    Auth(String),
    /// Maps to [`GenerationError::InvalidRequest`].
    InvalidRequest(String),
    /// Maps to [`GenerationError::RateLimited`].
    RateLimited(String),
    /// Maps to [`GenerationError::Provider`].
    Provider {
        /// Provider error code.
        code: String,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`GenerationError::Stream`].
    Stream(String),
    /// Maps to [`GenerationError::Timeout`].
    Timeout {
        /// Elapsed milliseconds.
        elapsed_ms: u64,
    },
}

impl MockError {
    /// Converts into the error a real provider would return.
    pub fn into_generation_error(self) -> GenerationError {
        match self {
            Self::Http {
                status,
                message,
                retryable,
            } => GenerationError::Http {
                status,
                message,
                retryable,
            },
            Self::Auth(msg) => GenerationError::Auth(msg),
            Self::InvalidRequest(msg) => GenerationError::InvalidRequest(msg),
            Self::RateLimited(msg) => GenerationError::RateLimited(msg),
            Self::Provider {
                code,
                message,
                retryable,
            } => GenerationError::Provider {
                code,
                message,
                retryable,
            },
            Self::Stream(msg) => GenerationError::Stream(msg),
            Self::Timeout { elapsed_ms } => GenerationError::Timeout { elapsed_ms },
        }
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stream_len = self.streams.lock().unwrap().len();
        let moderation_len = self.moderations.lock().unwrap().len();
        let call_count = self.calls.lock().unwrap().len();
        f.debug_struct("MockProvider")
            .field("meta", &self.meta)
            .field("queued_streams", &stream_len)
            .field("queued_moderations", &moderation_len)
            .field("recorded_calls", &call_count)
            .field("open_streams", &self.open_streams())
            .finish()
    }
}

impl MockProvider {
    /// Creates a mock with the given metadata and empty queues.
    pub fn new(meta: ProviderMetadata) -> Self {
        Self {
            streams: Mutex::new(VecDeque::new()),
            moderations: Mutex::new(VecDeque::new()),
            meta,
            calls: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueues the events of the next turn.
    pub fn queue_stream(&self, events: Vec<ProviderEvent>) -> &Self {
        let items = events.into_iter().map(MockStreamItem::Event).collect();
        self.streams.lock().unwrap().push_back(Ok(items));
        self
    }

    /// Enqueues a turn whose stream yields `events` and then fails with
    /// `error` mid-stream.
    pub fn queue_stream_then_error(&self, events: Vec<ProviderEvent>, error: MockError) -> &Self {
        let mut items: Vec<_> = events.into_iter().map(MockStreamItem::Event).collect();
        items.push(MockStreamItem::Error(error));
        self.streams.lock().unwrap().push_back(Ok(items));
        self
    }

    /// Enqueues an error returned by the next `stream` call itself,
    /// before any event, like a rejected key or an unreachable host.
    pub fn queue_stream_error(&self, error: MockError) -> &Self {
        self.streams.lock().unwrap().push_back(Err(error));
        self
    }

    /// Enqueues the verdict of the next `moderate` call.
    pub fn queue_moderation(&self, verdict: SafetyVerdict) -> &Self {
        self.moderations.lock().unwrap().push_back(Ok(verdict));
        self
    }

    /// Enqueues an error for the next `moderate` call.
    pub fn queue_moderation_error(&self, error: MockError) -> &Self {
        self.moderations.lock().unwrap().push_back(Err(error));
        self
    }

    /// Every request passed to `stream`, in call order.
    pub fn recorded_calls(&self) -> Vec<ResponseRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Streams returned by `stream` that have not been dropped yet.
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl Provider for MockProvider {
    async fn stream(&self, request: &ResponseRequest) -> Result<ProviderStream, GenerationError> {
        self.calls.lock().unwrap().push(request.clone());
        let items = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockProvider: no queued streams remaining")
            .map_err(MockError::into_generation_error)?;
        let guard = OpenStreamGuard::acquire(&self.open);
        let stream = futures::stream::iter(items).map(move |item| {
            let _open = &guard;
            match item {
                MockStreamItem::Event(event) => Ok(event),
                MockStreamItem::Error(error) => Err(error.into_generation_error()),
            }
        });
        Ok(Box::pin(stream))
    }

    async fn moderate(&self, _text: &str) -> Result<SafetyVerdict, GenerationError> {
        self.moderations
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockProvider: no queued moderations remaining")
            .map_err(MockError::into_generation_error)
    }

    fn metadata(&self) -> ProviderMetadata {
        self.meta.clone()
    }
}
