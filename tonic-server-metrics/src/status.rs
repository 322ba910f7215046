use std::error::Error;

use tonic::{Code, Status};

/// Errors a handler may fail with.
///
/// Only errors that carry a gRPC status are classified into the response
/// count. Anything else passes through the interceptor untouched and is not
/// counted as a response.
pub trait RpcError {
    /// The status code of a transport-level RPC error, or `None` if the error
    /// is not one.
    fn status_code(&self) -> Option<Code>;
}

impl RpcError for Status {
    fn status_code(&self) -> Option<Code> {
        Some(self.code())
    }
}

impl RpcError for Box<dyn Error + Send + Sync + 'static> {
    fn status_code(&self) -> Option<Code> {
        find_status_in_source_chain(&**self)
    }
}

fn find_status_in_source_chain(err: &(dyn Error + 'static)) -> Option<Code> {
    let mut source = Some(err);

    while let Some(err) = source {
        if let Some(status) = err.downcast_ref::<Status>() {
            return Some(status.code());
        }

        source = err.source();
    }

    None
}

/// Stable label value for a status code.
#[inline]
pub fn code_label(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "Canceled",
        Code::Unknown => "Unknown",
        Code::InvalidArgument => "InvalidArgument",
        Code::DeadlineExceeded => "DeadlineExceeded",
        Code::NotFound => "NotFound",
        Code::AlreadyExists => "AlreadyExists",
        Code::PermissionDenied => "PermissionDenied",
        Code::ResourceExhausted => "ResourceExhausted",
        Code::FailedPrecondition => "FailedPrecondition",
        Code::Aborted => "Aborted",
        Code::OutOfRange => "OutOfRange",
        Code::Unimplemented => "Unimplemented",
        Code::Internal => "Internal",
        Code::Unavailable => "Unavailable",
        Code::DataLoss => "DataLoss",
        Code::Unauthenticated => "Unauthenticated",
    }
}
