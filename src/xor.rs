//! Host reference implementation of the repeating-key XOR transform.
//!
//! The device kernel is the production path; this module computes the
//! same transform on the CPU so the device output can be verified
//! against it. XOR is an involution, so applying the transform twice
//! with the same key recovers the original data.

use crate::{ClxorError, ClxorResult};

/// XOR `data` in place against a repeating `key`.
///
/// Byte `i` of the data is combined with byte `i % key.len()` of the
/// key. Fails with `EmptyKey` when the key has no bytes.
pub fn xor_in_place(data: &mut [u8], key: &[u8]) -> ClxorResult<()> {
    if key.is_empty() {
        return Err(ClxorError::EmptyKey);
    }
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % key.len()];
    }
    Ok(())
}

/// XOR `data` against a repeating `key`, returning the masked copy.
pub fn xor_with_key(data: &[u8], key: &[u8]) -> ClxorResult<Vec<u8>> {
    let mut out = data.to_vec();
    xor_in_place(&mut out, key)?;
    Ok(out)
}
