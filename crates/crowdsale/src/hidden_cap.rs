//! Commit-reveal hidden cap
//!
//! The sale commits to a proceeds ceiling by publishing only
//! `keccak256(cap_be32 || secret_be32)`. The engine keeps the sealed value so
//! it can enforce the ceiling on every contribution, re-checking it against the
//! digest each time; views only ever expose the digest.

use crate::errors::{CrowdsaleError, Result};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use tranche_primitives::Amount;

/// Width of one packed commitment word.
const WORD_BYTES: usize = 32;

/// Keccak-256 commitment to a `(cap, secret)` pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapDigest(pub [u8; 32]);

impl CapDigest {
    /// Commit to `cap` and `secret`, each packed as a 32-byte big-endian word.
    pub fn commit(cap: Amount, secret: u128) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(word(cap));
        hasher.update(word(secret));
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        CapDigest(out)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for CapDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CapDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapDigest({})", self.to_hex())
    }
}

fn word(value: u128) -> [u8; WORD_BYTES] {
    let mut out = [0u8; WORD_BYTES];
    out[WORD_BYTES - 16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Committed cap plus the sealed value used for enforcement.
#[derive(Clone, PartialEq, Eq)]
pub struct HiddenCap {
    digest: CapDigest,
    cap: Amount,
    secret: u128,
}

impl HiddenCap {
    /// Seal a fresh commitment.
    pub fn seal(cap: Amount, secret: u128) -> Result<Self> {
        if cap == 0 {
            return Err(CrowdsaleError::InvalidConfig("hidden cap must be positive".into()));
        }
        Ok(Self {
            digest: CapDigest::commit(cap, secret),
            cap,
            secret,
        })
    }

    /// Adopt a previously published digest; the sealed pair must match it.
    pub fn from_commitment(digest: CapDigest, cap: Amount, secret: u128) -> Result<Self> {
        let sealed = Self::seal(cap, secret)?;
        if sealed.digest != digest {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "sealed cap does not match published digest {digest}"
            )));
        }
        Ok(sealed)
    }

    pub fn digest(&self) -> CapDigest {
        self.digest
    }

    /// Pure check of a claimed `(cap, secret)` pair against the digest.
    pub fn verify(&self, cap: Amount, secret: u128) -> bool {
        CapDigest::commit(cap, secret) == self.digest
    }

    /// Sealed cap, re-verified against the digest.
    pub fn enforced_cap(&self) -> Result<Amount> {
        if self.verify(self.cap, self.secret) {
            Ok(self.cap)
        } else {
            Err(CrowdsaleError::InvalidConfig(
                "sealed cap no longer matches its digest".into(),
            ))
        }
    }

    /// Whether `cumulative` proceeds have reached the cap.
    pub fn is_reached(&self, cumulative: Amount) -> bool {
        cumulative >= self.cap
    }
}

impl fmt::Debug for HiddenCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HiddenCap")
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_packed_uint256_encoding() {
        let digest = CapDigest::commit(1, 2);
        assert_eq!(
            digest.to_hex(),
            "0xe90b7bceb6e7df5418fb78d8ee546e97c83a08bbccc01a0644d599ccd2a7c2e0"
        );
    }

    #[test]
    fn verify_accepts_only_committed_pair() {
        let cap = HiddenCap::seal(5 * 10u128.pow(19), 42).unwrap();
        assert_eq!(
            cap.digest().to_hex(),
            "0x9779b795e2c7d77087f8afe755f4eb89142140381e14a8c2e249b2ca5a4a7d39"
        );
        assert!(cap.verify(5 * 10u128.pow(19), 42));
        assert!(!cap.verify(5 * 10u128.pow(19), 43));
        assert!(!cap.verify(5 * 10u128.pow(19) + 1, 42));
    }

    #[test]
    fn mismatched_commitment_rejected() {
        let published = CapDigest::commit(100, 7);
        assert!(HiddenCap::from_commitment(published, 100, 7).is_ok());
        let err = HiddenCap::from_commitment(published, 101, 7).unwrap_err();
        assert!(matches!(err, CrowdsaleError::InvalidConfig(_)));
    }

    #[test]
    fn debug_output_hides_sealed_value() {
        let cap = HiddenCap::seal(123_456_789, 987_654_321).unwrap();
        let rendered = format!("{cap:?}");
        assert!(!rendered.contains("123456789"));
        assert!(!rendered.contains("987654321"));
    }

    #[test]
    fn zero_cap_rejected() {
        assert!(HiddenCap::seal(0, 1).is_err());
    }
}
