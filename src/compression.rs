//! Per-message compression codecs selected once per call by negotiated
//! name and shared read-only across the call's messages.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use flate2::{read::GzDecoder, write::GzEncoder};

/// Wire name of the no-op codec.
pub const IDENTITY: &str = "identity";
/// Wire name of the gzip codec.
pub const GZIP: &str = "gzip";

/// Compression capability applied to frame payloads.
pub trait Compressor: Send + Sync {
    /// Negotiated encoding name.
    fn name(&self) -> &'static str;

    /// Whether frames produced with this codec leave the compressed flag
    /// clear.
    fn is_identity(&self) -> bool {
        false
    }

    /// Compress one frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be compressed.
    fn compress(&self, payload: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress one frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid for this encoding or
    /// inflates past the configured size cap.
    fn decompress(&self, payload: &[u8]) -> io::Result<Vec<u8>>;
}

/// No-op codec; a valid selection for uncompressed calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Compressor for Identity {
    fn name(&self) -> &'static str {
        IDENTITY
    }

    fn is_identity(&self) -> bool {
        true
    }

    fn compress(&self, payload: &[u8]) -> io::Result<Vec<u8>> {
        Ok(payload.to_vec())
    }

    fn decompress(&self, payload: &[u8]) -> io::Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// Gzip codec with a cap on decompressed size to bound memory.
#[derive(Clone, Copy, Debug)]
pub struct Gzip {
    max_decompressed_size: usize,
}

impl Gzip {
    #[must_use]
    pub const fn new(max_decompressed_size: usize) -> Self {
        Self {
            max_decompressed_size,
        }
    }
}

impl Compressor for Gzip {
    fn name(&self) -> &'static str {
        GZIP
    }

    fn compress(&self, payload: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(payload)?;
        encoder.finish()
    }

    fn decompress(&self, payload: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut decoder = GzDecoder::new(payload).take(self.max_decompressed_size as u64 + 1);
        decoder.read_to_end(&mut out)?;
        if out.len() > self.max_decompressed_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "decompressed message exceeds {} bytes",
                    self.max_decompressed_size
                ),
            ));
        }
        Ok(out)
    }
}

/// Resolve a negotiated encoding name to a codec instance.
///
/// Returns `None` for names this engine does not implement; the caller
/// decides how to surface the rejection.
#[must_use]
pub fn select_compressor(name: &str, max_decompressed_size: usize) -> Option<Arc<dyn Compressor>> {
    match name {
        IDENTITY => Some(Arc::new(Identity)),
        GZIP => Some(Arc::new(Gzip::new(max_decompressed_size))),
        _ => None,
    }
}
