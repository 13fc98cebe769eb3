// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Encrypted Envelope Wire Format
//!
//! Parser for the two-layer envelope layout used by encrypted submissions:
//!
//! ```text
//! +--------+------------------+--------------------------+
//! | L(u32) | sealed_key[L]    | iv(12) | ct+tag(rest)    |
//! +--------+------------------+--------------------------+
//! ```
//!
//! `L` is a little-endian u32. A blob is envelope-encoded iff
//! `200 <= L <= 400` and the blob extends past `L + 4` bytes; anything else
//! is treated as a directly-sealed payload whose plaintext comes back from
//! the key service as-is.
//!
//! The bounds come from the size of a sealed data-encryption key under the
//! sealing policy; an `L` outside them means the leading u32 was audio data,
//! not a length prefix.

/// Parsed envelope: the sealed data-encryption key and the AEAD ciphertext.
///
/// Owns copies of both sections so the fetched blob buffer can be dropped
/// before the (potentially long) key-recovery call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    sealed_key: Vec<u8>,
    ciphertext: Vec<u8>,
}

/// Inclusive bounds on a plausible sealed-key length.
pub const SEALED_KEY_MIN_LEN: usize = 200;
pub const SEALED_KEY_MAX_LEN: usize = 400;

/// AEAD nonce length preceding the ciphertext.
pub const IV_LEN: usize = 12;

impl EncryptedEnvelope {
    /// Attempts to parse a fetched blob as an envelope.
    ///
    /// Returns `None` when the blob does not match the envelope layout, in
    /// which case the caller must treat the entire blob as directly sealed.
    pub fn parse(blob: &[u8]) -> Option<EncryptedEnvelope> {
        if blob.len() < 4 {
            return None;
        }
        let key_length = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
        if !(SEALED_KEY_MIN_LEN..=SEALED_KEY_MAX_LEN).contains(&key_length) {
            return None;
        }
        if blob.len() <= key_length + 4 {
            return None;
        }
        Some(EncryptedEnvelope {
            sealed_key: blob[4..4 + key_length].to_vec(),
            ciphertext: blob[4 + key_length..].to_vec(),
        })
    }

    /// The sealed data-encryption key section.
    pub fn sealed_key(&self) -> &[u8] {
        &self.sealed_key
    }

    /// The `[iv | ct+tag]` section.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Splits the ciphertext into `(iv, ct_and_tag)`.
    ///
    /// Returns `None` when the ciphertext is shorter than the nonce.
    pub fn split_iv(&self) -> Option<(&[u8], &[u8])> {
        if self.ciphertext.len() < IV_LEN {
            return None;
        }
        Some(self.ciphertext.split_at(IV_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_blob(key_len: u32, ct_len: usize) -> Vec<u8> {
        let mut blob = key_len.to_le_bytes().to_vec();
        blob.extend(std::iter::repeat(0xaa).take(key_len as usize));
        blob.extend(std::iter::repeat(0xbb).take(ct_len));
        blob
    }

    #[test]
    fn test_length_199_is_direct() {
        assert!(EncryptedEnvelope::parse(&envelope_blob(199, 64)).is_none());
    }

    #[test]
    fn test_length_200_is_envelope() {
        let env = EncryptedEnvelope::parse(&envelope_blob(200, 64)).unwrap();
        assert_eq!(env.sealed_key().len(), 200);
        assert_eq!(env.ciphertext().len(), 64);
    }

    #[test]
    fn test_length_400_is_envelope_401_is_not() {
        assert!(EncryptedEnvelope::parse(&envelope_blob(400, 64)).is_some());
        assert!(EncryptedEnvelope::parse(&envelope_blob(401, 64)).is_none());
    }

    #[test]
    fn test_truncated_blob_is_direct() {
        // Length prefix claims 200 bytes but nothing follows the key
        assert!(EncryptedEnvelope::parse(&envelope_blob(200, 0)).is_none());
        assert!(EncryptedEnvelope::parse(&[0x01, 0x02]).is_none());
        assert!(EncryptedEnvelope::parse(&[]).is_none());
    }

    #[test]
    fn test_split_iv() {
        let env = EncryptedEnvelope::parse(&envelope_blob(200, 40)).unwrap();
        let (iv, ct) = env.split_iv().unwrap();
        assert_eq!(iv.len(), IV_LEN);
        assert_eq!(ct.len(), 28);

        let short = EncryptedEnvelope::parse(&envelope_blob(200, 8)).unwrap();
        assert!(short.split_iv().is_none());
    }
}
