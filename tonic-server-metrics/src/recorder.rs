//! A [`MetricsSink`] backed by the [`metrics`] crate.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use tonic::Code;

use crate::status::code_label;
use crate::{MethodDescriptor, MetricsSink};

const STARTED_TOTAL: &str = "grpc_server_started_total";
const HANDLED_TOTAL: &str = "grpc_server_handled_total";
const MSG_RECEIVED_TOTAL: &str = "grpc_server_msg_received_total";
const MSG_SENT_TOTAL: &str = "grpc_server_msg_sent_total";
const HANDLING_SECONDS: &str = "grpc_server_handling_seconds";

/// Reports call metrics to whichever [`metrics::Recorder`] is installed,
/// using the series names and labels of
/// https://github.com/grpc-ecosystem/go-grpc-prometheus.
///
/// | Event | Series |
/// |---|---|
/// | request | `grpc_server_started_total` |
/// | response | `grpc_server_handled_total` (with `grpc_code`) |
/// | message received | `grpc_server_msg_received_total` |
/// | message sent | `grpc_server_msg_sent_total` |
/// | latency | `grpc_server_handling_seconds` |
///
/// Every series carries the `grpc_type`, `grpc_service` and `grpc_method`
/// labels.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsRecorderSink {
    _p: (),
}

impl MetricsRecorderSink {
    /// Create a new sink.
    pub fn new() -> Self {
        MetricsRecorderSink::default()
    }

    /// Register descriptions and units of every series with the installed
    /// recorder.
    pub fn describe() {
        describe_counter!(STARTED_TOTAL, "Total number of RPCs started on the server.");
        describe_counter!(
            HANDLED_TOTAL,
            "Total number of RPCs completed on the server, regardless of success or failure."
        );
        describe_counter!(
            MSG_RECEIVED_TOTAL,
            "Total number of RPC stream messages received on the server."
        );
        describe_counter!(
            MSG_SENT_TOTAL,
            "Total number of gRPC stream messages sent by the server."
        );
        describe_histogram!(
            HANDLING_SECONDS,
            Unit::Seconds,
            "Histogram of response latency (seconds) of gRPC that had been application-level \
                handled by the server."
        );
    }
}

impl MetricsSink for MetricsRecorderSink {
    fn increment_request_count(&self, method: &MethodDescriptor) {
        counter!(
            STARTED_TOTAL,
            "grpc_type" => method.shape().as_str(),
            "grpc_service" => method.service().to_owned(),
            "grpc_method" => method.method().to_owned(),
        )
        .increment(1);
    }

    fn increment_response_count(&self, method: &MethodDescriptor, code: Code) {
        counter!(
            HANDLED_TOTAL,
            "grpc_type" => method.shape().as_str(),
            "grpc_service" => method.service().to_owned(),
            "grpc_method" => method.method().to_owned(),
            "grpc_code" => code_label(code),
        )
        .increment(1);
    }

    fn increment_stream_sent_count(&self, method: &MethodDescriptor) {
        counter!(
            MSG_SENT_TOTAL,
            "grpc_type" => method.shape().as_str(),
            "grpc_service" => method.service().to_owned(),
            "grpc_method" => method.method().to_owned(),
        )
        .increment(1);
    }

    fn increment_stream_received_count(&self, method: &MethodDescriptor) {
        counter!(
            MSG_RECEIVED_TOTAL,
            "grpc_type" => method.shape().as_str(),
            "grpc_service" => method.service().to_owned(),
            "grpc_method" => method.method().to_owned(),
        )
        .increment(1);
    }

    fn record_latency(&self, method: &MethodDescriptor, elapsed_seconds: f64) {
        histogram!(
            HANDLING_SECONDS,
            "grpc_type" => method.shape().as_str(),
            "grpc_service" => method.service().to_owned(),
            "grpc_method" => method.method().to_owned(),
        )
        .record(elapsed_seconds);
    }
}
