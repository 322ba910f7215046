//! Server-side call metrics for [`tonic`] handlers.
//!
//! [`MetricsInterceptor`] wraps the four handler shapes (unary, server
//! streaming, client streaming and bidirectional streaming) and reports to a
//! [`MetricsSink`]:
//!
//! - one request count per call, before the handler runs,
//! - one response count per call, keyed by status code,
//! - one count per stream message sent or received,
//! - optionally, the call latency in seconds.
//!
//! Messages and results are passed through untouched.
//!
//! # Feature flags
//!
//! - `metrics`: Enables [`MetricsRecorderSink`], a sink reporting to the
//!   [`metrics`](https://docs.rs/metrics) facade. Enabled by default.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tonic::{Request, Response, Status};
//! use tonic_server_metrics::{method_path, MetricsInterceptor, MetricsRecorderSink};
//!
//! async fn handle(request: Request<String>) -> Result<Response<String>, Status> {
//!     Ok(Response::new(request.into_inner()))
//! }
//!
//! # async fn run(request: Request<String>) -> Result<(), Status> {
//! MetricsRecorderSink::describe();
//! let metrics = MetricsInterceptor::new(Arc::new(MetricsRecorderSink::new())).enable_latency(true);
//!
//! let path = method_path(&request).unwrap_or_else(|| "/echo.Echo/Echo".to_string());
//! let response = metrics.unary(path, request, handle).await?;
//! # drop(response);
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod interceptor;
mod method;
mod sink;
mod status;
mod stream;
mod timer;

#[cfg(feature = "metrics")]
mod recorder;

#[cfg(test)]
mod test_util;

pub use interceptor::MetricsInterceptor;
pub use method::{method_path, CallShape, MethodDescriptor};
pub use sink::MetricsSink;
pub use status::{code_label, RpcError};
pub use stream::{MeteredInbound, MeteredOutbound};

#[cfg(feature = "metrics")]
pub use recorder::MetricsRecorderSink;
