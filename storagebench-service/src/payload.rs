//! Random contents for the benchmark object.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Generates exactly `size` bytes of cryptographically random data.
///
/// The bytes come straight from the OS entropy source. If the buffer cannot be allocated or the
/// entropy source is unavailable, the invocation cannot proceed and [`Error::Generation`] is
/// returned.
pub fn generate(size: u64) -> Result<Bytes> {
    let len = usize::try_from(size).map_err(|cause| Error::Generation {
        size,
        cause: cause.into(),
    })?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|cause| Error::Generation {
            size,
            cause: cause.into(),
        })?;
    buffer.resize(len, 0);

    OsRng
        .try_fill_bytes(&mut buffer)
        .map_err(|cause| Error::Generation {
            size,
            cause: cause.into(),
        })?;

    Ok(buffer.into())
}

/// Encodes the payload the way it is stored on both the filesystem and the object store.
///
/// This is padded standard base64, so the stored object is `4 * ceil(n / 3)` bytes long.
pub fn encode(payload: &[u8]) -> Bytes {
    STANDARD.encode(payload).into()
}

/// The stored size of a payload of `size` raw bytes.
pub fn encoded_len(size: u64) -> u64 {
    size.div_ceil(3) * 4
}
