#![cfg(feature = "metrics")]

use std::sync::{Arc, Mutex};

use metrics::{
    Counter, CounterFn, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use tokio_stream::StreamExt;
use tonic::{Code, Request, Response, Status};
use tonic_server_metrics::{MetricsInterceptor, MetricsRecorderSink};

#[derive(Default)]
struct TestRecorderInner {
    counters: Vec<(Key, u64)>,
    histograms: Vec<(Key, f64)>,
    described: Vec<(String, Option<Unit>)>,
}

#[derive(Default)]
struct TestRecorder {
    inner: Arc<Mutex<TestRecorderInner>>,
}

struct Handle {
    key: Key,
    inner: Arc<Mutex<TestRecorderInner>>,
}

impl CounterFn for Handle {
    fn increment(&self, value: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.push((self.key.clone(), value));
    }

    fn absolute(&self, _value: u64) {}
}

impl HistogramFn for Handle {
    fn record(&self, value: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.histograms.push((self.key.clone(), value));
    }
}

impl TestRecorder {
    fn describe(&self, key: KeyName, unit: Option<Unit>) {
        let mut inner = self.inner.lock().unwrap();
        inner.described.push((key.as_str().to_owned(), unit));
    }

    fn handle(&self, key: &Key) -> Arc<Handle> {
        Arc::new(Handle {
            key: key.clone(),
            inner: self.inner.clone(),
        })
    }
}

impl Recorder for TestRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, _description: SharedString) {
        self.describe(key, unit);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, _description: SharedString) {
        self.describe(key, unit);
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, _description: SharedString) {
        self.describe(key, unit);
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}

fn labels(key: &Key) -> Vec<(String, String)> {
    let mut labels = key
        .labels()
        .map(|l| (l.key().to_owned(), l.value().to_owned()))
        .collect::<Vec<_>>();
    labels.sort();
    labels
}

fn expected(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut labels = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<Vec<_>>();
    labels.sort();
    labels
}

// The recorder is installed for the current thread only, so the calls are
// driven on a current thread runtime inside it.
fn with_recorder<F: std::future::Future>(recorder: &TestRecorder, f: F) -> F::Output {
    metrics::with_local_recorder(recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    })
}

#[test]
fn generates_metrics_for_failed_unary_call() {
    let recorder = TestRecorder::default();
    let interceptor =
        MetricsInterceptor::new(Arc::new(MetricsRecorderSink::new())).enable_latency(true);

    let status = with_recorder(&recorder, async {
        interceptor
            .unary("/test.Test/unary_call", Request::new(()), |_| async {
                Err::<Response<()>, _>(Status::resource_exhausted("Too many requests"))
            })
            .await
            .unwrap_err()
    });

    assert_eq!(status.code(), Code::ResourceExhausted);

    let inner = recorder.inner.lock().unwrap();
    let base = [
        ("grpc_method", "unary_call"),
        ("grpc_service", "test.Test"),
        ("grpc_type", "unary"),
    ];

    assert_eq!(inner.counters.len(), 2);

    let (key, value) = &inner.counters[0];
    assert_eq!(key.name(), "grpc_server_started_total");
    assert_eq!(labels(key), expected(&base));
    assert_eq!(*value, 1);

    let (key, value) = &inner.counters[1];
    assert_eq!(key.name(), "grpc_server_handled_total");
    let mut with_code = base.to_vec();
    with_code.push(("grpc_code", "ResourceExhausted"));
    assert_eq!(labels(key), expected(&with_code));
    assert_eq!(*value, 1);

    assert_eq!(inner.histograms.len(), 1);
    let (key, value) = &inner.histograms[0];
    assert_eq!(key.name(), "grpc_server_handling_seconds");
    assert_eq!(labels(key), expected(&base));
    assert!(*value >= 0.0);
}

#[test]
fn generates_metrics_for_bidi_stream() {
    let recorder = TestRecorder::default();
    let interceptor = MetricsInterceptor::new(Arc::new(MetricsRecorderSink::new()));

    let received = with_recorder(&recorder, async {
        let inbound = tokio_stream::iter(vec![Ok::<_, Status>(1), Ok(2)]);

        let response = interceptor
            .streaming("/chat.Chat/Talk", Request::new(inbound), |request| async move {
                let replies = request.into_inner().map(|m| m.map(|n| n * 2));
                Ok::<_, Status>(Response::new(replies))
            })
            .await
            .unwrap();

        response
            .into_inner()
            .map(|m| m.unwrap())
            .collect::<Vec<_>>()
            .await
    });

    assert_eq!(received, vec![2, 4]);

    let inner = recorder.inner.lock().unwrap();
    let names = inner
        .counters
        .iter()
        .map(|(key, _)| key.name().to_owned())
        .collect::<Vec<_>>();

    assert_eq!(
        names,
        vec![
            "grpc_server_started_total",
            "grpc_server_handled_total",
            "grpc_server_msg_received_total",
            "grpc_server_msg_sent_total",
            "grpc_server_msg_received_total",
            "grpc_server_msg_sent_total",
        ]
    );

    let base = [
        ("grpc_method", "Talk"),
        ("grpc_service", "chat.Chat"),
        ("grpc_type", "bidi_stream"),
    ];
    assert_eq!(labels(&inner.counters[2].0), expected(&base));
    assert_eq!(labels(&inner.counters[3].0), expected(&base));

    // latency recording is off
    assert!(inner.histograms.is_empty());
}

#[test]
fn describes_every_series() {
    let recorder = TestRecorder::default();

    metrics::with_local_recorder(&recorder, MetricsRecorderSink::describe);

    let inner = recorder.inner.lock().unwrap();
    let mut described = inner.described.clone();
    described.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        described,
        vec![
            ("grpc_server_handled_total".to_owned(), None),
            ("grpc_server_handling_seconds".to_owned(), Some(Unit::Seconds)),
            ("grpc_server_msg_received_total".to_owned(), None),
            ("grpc_server_msg_sent_total".to_owned(), None),
            ("grpc_server_started_total".to_owned(), None),
        ]
    );
}
