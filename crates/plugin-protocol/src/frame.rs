//! Binary RPC frames.
//!
//! Frames are [`postcard`]-encoded and carried inside length-delimited
//! chunks on the byte stream.  Call arguments and results are JSON
//! documents carried as opaque bytes so both transports share one
//! request/reply schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fault::Fault;

/// Default ceiling for a single frame, in bytes (4 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Call {
        id: u64,
        service: String,
        method: String,
        payload: Vec<u8>,
    },
    Reply {
        id: u64,
        outcome: ReplyOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplyOutcome {
    Ok(Vec<u8>),
    Fault(Fault),
}

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("frame codec: {0}")]
    Codec(#[from] postcard::Error),
    #[error("frame payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl Frame {
    pub fn call(id: u64, service: &str, method: &str, args: &Value) -> Result<Self, FrameError> {
        Ok(Frame::Call {
            id,
            service: service.to_string(),
            method: method.to_string(),
            payload: encode_payload(args)?,
        })
    }

    pub fn reply(id: u64, result: Result<Value, Fault>) -> Result<Self, FrameError> {
        let outcome = match result {
            Ok(value) => ReplyOutcome::Ok(encode_payload(&value)?),
            Err(fault) => ReplyOutcome::Fault(fault),
        };
        Ok(Frame::Reply { id, outcome })
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        Ok(postcard::to_stdvec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, FrameError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a payload; an empty payload reads as JSON `null`.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FrameError> {
    if bytes.is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultCode;
    use serde_json::json;

    #[test]
    fn call_frame_survives_codec() {
        let frame = Frame::call(7, "command", "Command", &json!({"name": "Hello"})).unwrap();
        let bytes = frame.encode().unwrap();
        let decoded = Frame::decode(&bytes).unwrap();
        match decoded {
            Frame::Call {
                id,
                service,
                method,
                payload,
            } => {
                assert_eq!(id, 7);
                assert_eq!(service, "command");
                assert_eq!(method, "Command");
                let args: Value = decode_payload(&payload).unwrap();
                assert_eq!(args, json!({"name": "Hello"}));
            }
            other => panic!("expected call frame, got {other:?}"),
        }
    }

    #[test]
    fn fault_reply_carries_code() {
        let frame = Frame::reply(3, Err(Fault::unknown_service("command"))).unwrap();
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        match decoded {
            Frame::Reply {
                outcome: ReplyOutcome::Fault(fault),
                ..
            } => assert_eq!(fault.code, FaultCode::UnknownService),
            other => panic!("expected fault reply, got {other:?}"),
        }
    }

    #[test]
    fn empty_payload_is_null() {
        let v: Value = decode_payload(&[]).unwrap();
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn truncated_frame_is_codec_error() {
        let bytes = Frame::call(1, "a", "b", &json!(null)).unwrap().encode().unwrap();
        assert!(matches!(
            Frame::decode(&bytes[..bytes.len() / 2]),
            Err(FrameError::Codec(_))
        ));
    }
}
