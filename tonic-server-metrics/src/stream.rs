//! Pass-through stream wrappers that count messages.
//!
//! Both wrappers forward every item of the inner stream unchanged and in
//! order. An item is counted after the inner stream yields it and before it
//! is handed on, so the count always equals the number of messages that
//! actually went through the wrapper.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use pin_project::pin_project;
use tokio_stream::Stream;
use tonic::Status;

use crate::{MethodDescriptor, MetricsSink};

/// A request stream that reports every message received from the peer.
///
/// Handed to client streaming and bidirectional streaming handlers in place of
/// the raw request stream. Each `Ok` message calls
/// [`MetricsSink::increment_stream_received_count`] once. Errors and the end
/// of the stream are passed through without being counted.
#[pin_project]
pub struct MeteredInbound<S> {
    #[pin]
    inner: S,
    sink: Arc<dyn MetricsSink>,
    method: MethodDescriptor,
}

impl<S> MeteredInbound<S> {
    pub(crate) fn new(inner: S, sink: Arc<dyn MetricsSink>, method: MethodDescriptor) -> Self {
        MeteredInbound {
            inner,
            sink,
            method,
        }
    }

    /// The call this stream belongs to.
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the underlying stream.
    ///
    /// Messages read through this reference are not counted.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes `self`, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, T> Stream for MeteredInbound<S>
where
    S: Stream<Item = Result<T, Status>>,
{
    type Item = Result<T, Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.inner.poll_next(cx));

        if let Some(Ok(_)) = &item {
            this.sink.increment_stream_received_count(this.method);
        }

        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> fmt::Debug for MeteredInbound<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeteredInbound")
            .field("method", &self.method)
            .finish()
    }
}

/// A response stream that reports every message sent to the peer.
///
/// Returned from server streaming and bidirectional streaming calls in place
/// of the handler's response stream. tonic drains this stream to write the
/// response, so each `Ok` message it yields is one successful write and calls
/// [`MetricsSink::increment_stream_sent_count`] once. An `Err` item ends the
/// response with that status and is not counted.
#[pin_project]
pub struct MeteredOutbound<S> {
    #[pin]
    inner: S,
    sink: Arc<dyn MetricsSink>,
    method: MethodDescriptor,
}

impl<S> MeteredOutbound<S> {
    pub(crate) fn new(inner: S, sink: Arc<dyn MetricsSink>, method: MethodDescriptor) -> Self {
        MeteredOutbound {
            inner,
            sink,
            method,
        }
    }

    /// The call this stream belongs to.
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the underlying stream.
    ///
    /// Messages read through this reference are not counted.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes `self`, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, T> Stream for MeteredOutbound<S>
where
    S: Stream<Item = Result<T, Status>>,
{
    type Item = Result<T, Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.inner.poll_next(cx));

        if let Some(Ok(_)) = &item {
            this.sink.increment_stream_sent_count(this.method);
        }

        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> fmt::Debug for MeteredOutbound<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeteredOutbound")
            .field("method", &self.method)
            .finish()
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(MeteredInbound<tokio_stream::Empty<Result<(), Status>>>: Send, Sync, Unpin);
#[cfg(test)]
static_assertions::assert_impl_all!(MeteredOutbound<tokio_stream::Empty<Result<(), Status>>>: Send, Sync, Unpin);
