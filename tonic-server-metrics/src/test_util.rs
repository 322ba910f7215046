use std::sync::Mutex;

use tonic::Code;

use crate::{MethodDescriptor, MetricsSink};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Event {
    Request,
    Response(Code),
    Sent,
    Received,
    Latency,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Snapshot {
    pub(crate) requests: u64,
    pub(crate) responses: Vec<Code>,
    pub(crate) sent: u64,
    pub(crate) received: u64,
    pub(crate) latencies: Vec<f64>,
    pub(crate) methods: Vec<MethodDescriptor>,
    pub(crate) events: Vec<Event>,
}

/// Keeps every event it receives, in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    inner: Mutex<Snapshot>,
}

impl RecordingSink {
    pub(crate) fn snapshot(&self) -> Snapshot {
        self.inner.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn increment_request_count(&self, method: &MethodDescriptor) {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        inner.methods.push(method.clone());
        inner.events.push(Event::Request);
    }

    fn increment_response_count(&self, _method: &MethodDescriptor, code: Code) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push(code);
        inner.events.push(Event::Response(code));
    }

    fn increment_stream_sent_count(&self, _method: &MethodDescriptor) {
        let mut inner = self.inner.lock().unwrap();
        inner.sent += 1;
        inner.events.push(Event::Sent);
    }

    fn increment_stream_received_count(&self, _method: &MethodDescriptor) {
        let mut inner = self.inner.lock().unwrap();
        inner.received += 1;
        inner.events.push(Event::Received);
    }

    fn record_latency(&self, _method: &MethodDescriptor, elapsed_seconds: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.latencies.push(elapsed_seconds);
        inner.events.push(Event::Latency);
    }
}
