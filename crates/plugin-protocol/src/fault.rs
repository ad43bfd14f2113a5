//! Transport-level call faults.
//!
//! A fault means the call never reached a handler (unknown service, bad
//! parameters, shutting down).  Handler-level refusals travel inside the
//! reply as [`ErrorStatus`](crate::ErrorStatus) instead.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultCode {
    UnknownService,
    UnknownMethod,
    InvalidParams,
    Unavailable,
    Internal,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct Fault {
    pub code: FaultCode,
    pub message: String,
}

impl Fault {
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unknown_service(service: &str) -> Self {
        Self::new(
            FaultCode::UnknownService,
            format!("service not deployed: {service}"),
        )
    }

    pub fn unknown_method(service: &str, method: &str) -> Self {
        Self::new(
            FaultCode::UnknownMethod,
            format!("unknown method: {service}.{method}"),
        )
    }

    pub fn invalid_params(err: impl std::fmt::Display) -> Self {
        Self::new(FaultCode::InvalidParams, format!("invalid params: {err}"))
    }

    pub fn unavailable() -> Self {
        Self::new(FaultCode::Unavailable, "plugin is shutting down")
    }
}
