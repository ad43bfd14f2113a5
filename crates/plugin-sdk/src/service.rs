//! The capability every deployable service implements.

use pw_protocol::Fault;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A named RPC service.  Both transports hand calls to services in the
/// same shape: a method name plus JSON parameters.
///
/// Implementations run concurrently on the binary transport, so shared
/// state belongs behind a lock.
#[async_trait::async_trait]
pub trait Service: Send + Sync + 'static {
    async fn call(&self, method: &str, params: Value) -> Result<Value, Fault>;
}

/// Decode call parameters; a mismatch is an `InvalidParams` fault.
pub fn decode_params<T: DeserializeOwned>(params: Value) -> Result<T, Fault> {
    serde_json::from_value(params).map_err(Fault::invalid_params)
}

pub fn encode_result<T: Serialize>(value: &T) -> Result<Value, Fault> {
    serde_json::to_value(value)
        .map_err(|e| Fault::new(pw_protocol::FaultCode::Internal, format!("encode result: {e}")))
}
