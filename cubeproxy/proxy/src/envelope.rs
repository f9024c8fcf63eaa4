//! Framing of the objects exchanged with code running inside a pod.
//!
//! Every body is a bincode encoded [`RpcEnvelope`]: the value itself, bincode encoded, next to
//! the tag naming its type. The tag is the only type information the other side gets, so both
//! ends must agree on it through [`RpcMessage::TYPE_TAG`].

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{ProxyError, Result};

/// A value that can travel in an [`RpcEnvelope`].
pub trait RpcMessage: Serialize + DeserializeOwned {
    const TYPE_TAG: &'static str;
}

macro_rules! impl_rpc_message {
    ($($ty:ty => $tag:literal),* $(,)?) => {
        $(
            impl RpcMessage for $ty {
                const TYPE_TAG: &'static str = $tag;
            }
        )*
    };
}

impl_rpc_message! {
    () => "unit",
    bool => "bool",
    i32 => "i32",
    i64 => "i64",
    u32 => "u32",
    u64 => "u64",
    String => "string",
    Vec<u8> => "bytes",
    Vec<String> => "string-list",
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    pub type_tag: String,
    pub payload: Vec<u8>,
}

/// Upper bound on the bytes a single envelope may claim while decoding.
///
/// Length prefixes come from the other side, so an unbounded decode would allocate whatever a
/// corrupt body asks for.
pub const MAX_ENVELOPE_SIZE: usize = 64 * 1024 * 1024;

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_ENVELOPE_SIZE>()
}

impl RpcEnvelope {
    pub fn wrap<T: RpcMessage>(value: &T) -> Result<Self> {
        Ok(RpcEnvelope {
            type_tag: T::TYPE_TAG.to_owned(),
            payload: bincode::serde::encode_to_vec(value, bincode_config())?,
        })
    }

    /// Unpacks the payload, failing with [`ProxyError::PayloadTypeMismatch`] when it carries
    /// something other than a `T`.
    pub fn unwrap_as<T: RpcMessage>(&self) -> Result<T> {
        if self.type_tag != T::TYPE_TAG {
            return Err(ProxyError::PayloadTypeMismatch {
                expected: T::TYPE_TAG,
                found: self.type_tag.clone(),
            });
        }

        let (value, _) = bincode::serde::decode_from_slice(&self.payload, bincode_config())?;
        Ok(value)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, bincode_config())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (envelope, _) = bincode::serde::decode_from_slice(bytes, bincode_config())?;
        Ok(envelope)
    }
}

/// Encodes `value` into a request body.
pub fn encode<T: RpcMessage>(value: &T) -> Result<Vec<u8>> {
    RpcEnvelope::wrap(value)?.to_bytes()
}

/// Decodes a response body that should hold a `T`.
pub fn decode<T: RpcMessage>(bytes: &[u8]) -> Result<T> {
    RpcEnvelope::from_bytes(bytes)?.unwrap_as()
}
