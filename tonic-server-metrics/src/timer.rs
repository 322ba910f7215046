use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{MethodDescriptor, MetricsSink};

/// Measures one call and reports its latency when dropped.
///
/// Dropping covers every exit from the interceptor: a normal return, an
/// error, a panic unwinding through the handler, and the framework dropping
/// the call future on cancellation. The latency is reported at most once.
pub(crate) struct CallTimer {
    started: Instant,
    report: Option<(Arc<dyn MetricsSink>, MethodDescriptor)>,
}

impl CallTimer {
    /// Start timing. Nothing is reported on drop unless `enabled`.
    pub(crate) fn start(
        sink: &Arc<dyn MetricsSink>,
        method: &MethodDescriptor,
        enabled: bool,
    ) -> Self {
        CallTimer {
            started: Instant::now(),
            report: enabled.then(|| (sink.clone(), method.clone())),
        }
    }
}

impl Drop for CallTimer {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();

        if let Some((sink, method)) = self.report.take() {
            sink.record_latency(&method, elapsed);
        }
    }
}

impl fmt::Debug for CallTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallTimer")
            .field("started", &self.started)
            .field("enabled", &self.report.is_some())
            .finish()
    }
}
