//! Message codec seam: how one frame payload becomes a typed value.
//!
//! Codecs operate on exactly the bytes of one already-demarcated frame
//! payload; framing is handled before they run. A [`BincodeCodec`]
//! implementation is provided as the default for `serde` message types.

use std::{error::Error, marker::PhantomData};

use bincode::{
    config,
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{Serialize, de::DeserializeOwned};

/// Boxed error returned by codec implementations.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Decode and encode a single protocol message.
pub trait MessageCodec<T>: Send + Sync {
    /// Decode one message from exactly the bytes of one frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be parsed into a message.
    fn decode_one(&self, payload: &[u8]) -> Result<T, BoxError>;

    /// Encode one message into the exact payload bytes for one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn encode_one(&self, value: &T) -> Result<Vec<u8>, BoxError>;
}

/// Codec using `bincode` with its standard configuration.
#[derive(Debug)]
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageCodec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn decode_one(&self, payload: &[u8]) -> Result<T, BoxError> {
        let (value, read) = decode_from_slice(payload, config::standard())?;
        if read != payload.len() {
            return Err("frame payload longer than encoded message".into());
        }
        Ok(value)
    }

    fn encode_one(&self, value: &T) -> Result<Vec<u8>, BoxError> {
        Ok(encode_to_vec(value, config::standard())?)
    }
}
