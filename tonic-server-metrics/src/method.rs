//! Identity of the call being instrumented.

use std::fmt;
use std::sync::Arc;

use tonic::codegen::GrpcMethod;
use tonic::Request;

/// The structural pattern of an RPC.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CallShape {
    /// Single request, single response.
    Unary,

    /// Single request, stream of responses.
    ServerStreaming,

    /// Stream of requests, single response.
    ClientStreaming,

    /// Stream of requests, stream of responses.
    DuplexStreaming,
}

impl CallShape {
    /// Label value for this shape, compatible with
    /// https://github.com/grpc-ecosystem/go-grpc-prometheus.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallShape::Unary => "unary",
            CallShape::ServerStreaming => "server_stream",
            CallShape::ClientStreaming => "client_stream",
            CallShape::DuplexStreaming => "bidi_stream",
        }
    }

    /// Returns `true` if the handler consumes a stream of requests.
    pub fn has_request_stream(&self) -> bool {
        matches!(self, CallShape::ClientStreaming | CallShape::DuplexStreaming)
    }

    /// Returns `true` if the handler produces a stream of responses.
    pub fn has_response_stream(&self) -> bool {
        matches!(self, CallShape::ServerStreaming | CallShape::DuplexStreaming)
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a single call for the purpose of labeling metrics.
///
/// Built once when interception starts and read-only afterwards. Cloning is
/// cheap, the method path is reference counted.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodDescriptor {
    full_name: Arc<str>,
    shape: CallShape,
}

impl MethodDescriptor {
    /// Create a descriptor from the fully-qualified method path, for example
    /// `"/helloworld.Greeter/SayHello"`, and the shape of the handler.
    ///
    /// The path is taken as-is.
    pub fn new(full_name: impl Into<Arc<str>>, shape: CallShape) -> Self {
        MethodDescriptor {
            full_name: full_name.into(),
            shape,
        }
    }

    /// The fully-qualified method path as supplied by the framework.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The shape of the call.
    pub fn shape(&self) -> CallShape {
        self.shape
    }

    /// The service part of the path, `package.Service` for
    /// `/package.Service/Method`. Empty if the path has no separator.
    pub fn service(&self) -> &str {
        self.split().0
    }

    /// The method part of the path, `Method` for `/package.Service/Method`.
    pub fn method(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        let path = self.full_name.trim_start_matches('/');
        path.split_once('/').unwrap_or(("", path))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name, self.shape)
    }
}

/// Reads the method path of a request from the [`GrpcMethod`] extension
/// that tonic's generated server code attaches to every request.
///
/// Returns `None` for requests that did not come through a generated server,
/// for example ones built by hand in tests.
pub fn method_path<T>(request: &Request<T>) -> Option<String> {
    request
        .extensions()
        .get::<GrpcMethod>()
        .map(|method| format!("/{}/{}", method.service(), method.method()))
}
