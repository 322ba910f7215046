//! The call interceptor.
//!
//! See [`MetricsInterceptor`] for more details.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tonic::{Code, Request, Response};
use tracing::{debug, trace};

use crate::stream::{MeteredInbound, MeteredOutbound};
use crate::timer::CallTimer;
use crate::{CallShape, MethodDescriptor, MetricsSink, RpcError};

/// Instruments server handlers with call-level metrics.
///
/// Each of the four entry points wraps one handler shape. For every call the
/// interceptor:
///
/// 1. counts the request,
/// 2. starts a timer,
/// 3. substitutes counting wrappers for the request and response streams the
///    shape has,
/// 4. runs the handler (the continuation),
/// 5. counts the response with [`Code::Ok`], or with the status code the
///    handler failed with,
/// 6. records the elapsed time if latency recording is enabled.
///
/// The handler's result is returned exactly as the handler produced it.
/// Errors that do not carry a status (see [`RpcError`]), and panics, pass
/// through without a response count. The latency is recorded on every exit,
/// including when the call future is dropped before completion.
///
/// For streaming responses, the outcome is classified when the handler hands
/// back its response stream. A stream that later yields an error is still
/// counted as `Ok`; its messages are counted as they are sent.
///
/// ```rust
/// # use std::sync::Arc;
/// # use tonic::{Request, Response, Status};
/// # use tonic_server_metrics::{MetricsInterceptor, MetricsSink, MethodDescriptor};
/// # struct Noop;
/// # impl MetricsSink for Noop {
/// #     fn increment_request_count(&self, _: &MethodDescriptor) {}
/// #     fn increment_response_count(&self, _: &MethodDescriptor, _: tonic::Code) {}
/// #     fn increment_stream_sent_count(&self, _: &MethodDescriptor) {}
/// #     fn increment_stream_received_count(&self, _: &MethodDescriptor) {}
/// #     fn record_latency(&self, _: &MethodDescriptor, _: f64) {}
/// # }
/// # async fn say_hello(request: Request<String>) -> Result<Response<String>, Status> {
/// #     Ok(Response::new(format!("Hello {}!", request.into_inner())))
/// # }
/// # async fn run() -> Result<(), Status> {
/// let interceptor = MetricsInterceptor::new(Arc::new(Noop)).enable_latency(true);
///
/// let response = interceptor
///     .unary("/helloworld.Greeter/SayHello", Request::new("Tonic".to_string()), say_hello)
///     .await?;
///
/// assert_eq!(response.into_inner(), "Hello Tonic!");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MetricsInterceptor {
    sink: Arc<dyn MetricsSink>,
    latency: bool,
}

impl MetricsInterceptor {
    /// Create a new interceptor reporting to `sink`, with latency recording
    /// disabled.
    pub fn new<S>(sink: Arc<S>) -> Self
    where
        S: MetricsSink + 'static,
    {
        Self::from_shared(sink)
    }

    /// Create a new interceptor from an already type-erased sink.
    pub fn from_shared(sink: Arc<dyn MetricsSink>) -> Self {
        MetricsInterceptor {
            sink,
            latency: false,
        }
    }

    /// Enable or disable recording of call latency.
    pub fn enable_latency(self, enabled: bool) -> Self {
        MetricsInterceptor {
            latency: enabled,
            ..self
        }
    }

    /// Returns `true` if call latency is recorded.
    pub fn latency_enabled(&self) -> bool {
        self.latency
    }

    /// Intercept a unary call.
    ///
    /// `path` is the fully-qualified method path, for example
    /// `"/helloworld.Greeter/SayHello"`.
    pub async fn unary<M, R, E, F, Fut>(
        &self,
        path: impl Into<Arc<str>>,
        request: Request<M>,
        continuation: F,
    ) -> Result<Response<R>, E>
    where
        F: FnOnce(Request<M>) -> Fut,
        Fut: Future<Output = Result<Response<R>, E>>,
        E: RpcError,
    {
        let method = MethodDescriptor::new(path, CallShape::Unary);
        let _timer = self.start(&method);

        let result = continuation(request).await;

        self.finish(&method, result)
    }

    /// Intercept a server streaming call.
    ///
    /// The response stream the handler returns is wrapped so each message
    /// sent is counted.
    pub async fn server_streaming<M, S, E, F, Fut>(
        &self,
        path: impl Into<Arc<str>>,
        request: Request<M>,
        continuation: F,
    ) -> Result<Response<MeteredOutbound<S>>, E>
    where
        F: FnOnce(Request<M>) -> Fut,
        Fut: Future<Output = Result<Response<S>, E>>,
        E: RpcError,
    {
        let method = MethodDescriptor::new(path, CallShape::ServerStreaming);
        let _timer = self.start(&method);

        let result = continuation(request)
            .await
            .map(|response| response.map(|stream| self.outbound(stream, &method)));

        self.finish(&method, result)
    }

    /// Intercept a client streaming call.
    ///
    /// The handler receives the request stream wrapped so each message
    /// received is counted.
    pub async fn client_streaming<S, R, E, F, Fut>(
        &self,
        path: impl Into<Arc<str>>,
        request: Request<S>,
        continuation: F,
    ) -> Result<Response<R>, E>
    where
        F: FnOnce(Request<MeteredInbound<S>>) -> Fut,
        Fut: Future<Output = Result<Response<R>, E>>,
        E: RpcError,
    {
        let method = MethodDescriptor::new(path, CallShape::ClientStreaming);
        let _timer = self.start(&method);

        let request = request.map(|stream| self.inbound(stream, &method));
        let result = continuation(request).await;

        self.finish(&method, result)
    }

    /// Intercept a bidirectional streaming call.
    ///
    /// Both the request stream and the response stream are wrapped.
    pub async fn streaming<S1, S2, E, F, Fut>(
        &self,
        path: impl Into<Arc<str>>,
        request: Request<S1>,
        continuation: F,
    ) -> Result<Response<MeteredOutbound<S2>>, E>
    where
        F: FnOnce(Request<MeteredInbound<S1>>) -> Fut,
        Fut: Future<Output = Result<Response<S2>, E>>,
        E: RpcError,
    {
        let method = MethodDescriptor::new(path, CallShape::DuplexStreaming);
        let _timer = self.start(&method);

        let request = request.map(|stream| self.inbound(stream, &method));
        let result = continuation(request)
            .await
            .map(|response| response.map(|stream| self.outbound(stream, &method)));

        self.finish(&method, result)
    }

    fn start(&self, method: &MethodDescriptor) -> CallTimer {
        trace!(method = %method.full_name(), shape = %method.shape(), "rpc started");

        self.sink.increment_request_count(method);
        CallTimer::start(&self.sink, method, self.latency)
    }

    fn finish<T, E>(&self, method: &MethodDescriptor, result: Result<T, E>) -> Result<T, E>
    where
        E: RpcError,
    {
        match &result {
            Ok(_) => {
                trace!(method = %method.full_name(), "rpc completed");
                self.sink.increment_response_count(method, Code::Ok);
            }
            Err(err) => match err.status_code() {
                Some(code) => {
                    debug!(method = %method.full_name(), ?code, "rpc failed with status");
                    self.sink.increment_response_count(method, code);
                }
                None => {
                    debug!(method = %method.full_name(), "rpc failed without a status");
                }
            },
        }

        result
    }

    fn inbound<S>(&self, stream: S, method: &MethodDescriptor) -> MeteredInbound<S> {
        MeteredInbound::new(stream, self.sink.clone(), method.clone())
    }

    fn outbound<S>(&self, stream: S, method: &MethodDescriptor) -> MeteredOutbound<S> {
        MeteredOutbound::new(stream, self.sink.clone(), method.clone())
    }
}

impl fmt::Debug for MetricsInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsInterceptor")
            .field("latency", &self.latency)
            .finish()
    }
}
