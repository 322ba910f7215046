//! The boundary between the interceptor and a metrics backend.

use tonic::Code;

use crate::MethodDescriptor;

/// Receives call-level metric events from a [`MetricsInterceptor`].
///
/// A single sink is shared by every call the interceptor sees, so it is
/// invoked concurrently from many tasks. Implementations must not block for
/// longer than it takes to update their own state, and must absorb their own
/// failures: every method returns `()` and nothing a sink does can change the
/// value or error returned to the RPC caller.
///
/// See [`MetricsRecorderSink`] for an implementation on top of the `metrics`
/// crate.
///
/// [`MetricsInterceptor`]: crate::MetricsInterceptor
/// [`MetricsRecorderSink`]: crate::MetricsRecorderSink
pub trait MetricsSink: Send + Sync {
    /// Called exactly once per call, before the handler runs.
    fn increment_request_count(&self, method: &MethodDescriptor);

    /// Called at most once per call, when the outcome is known.
    ///
    /// `code` is [`Code::Ok`] when the handler returned normally, otherwise
    /// the code of the [`Status`](tonic::Status) it failed with.
    fn increment_response_count(&self, method: &MethodDescriptor, code: Code);

    /// Called once per message handed from the handler to the transport.
    fn increment_stream_sent_count(&self, method: &MethodDescriptor);

    /// Called once per message handed from the transport to the handler.
    fn increment_stream_received_count(&self, method: &MethodDescriptor);

    /// Called at most once per call, only when latency recording is enabled.
    fn record_latency(&self, method: &MethodDescriptor, elapsed_seconds: f64);
}
