use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an account address string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with '0x'")]
    InvalidPrefix,
    #[error("address must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 20;
/// Expected string length of an encoded address (`0x` + 40 hex chars).
pub const ADDRESS_STRING_LENGTH: usize = 2 + ADDRESS_BYTES * 2;

/// Ledger account or contract identity.
///
/// The all-zero address is the ledger's "null" account: it never holds a
/// role, never receives an allocation and is rejected by every batch entry
/// point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    /// Derive a stable address from a human readable seed (accounts in
    /// simulations and tests, contract instances in deployments).
    pub fn derive(seed: &str) -> Self {
        let hash = blake3::hash(seed.as_bytes());
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes.copy_from_slice(&hash.as_bytes()[..ADDRESS_BYTES]);
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_BYTES]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

/// Encode an address as `0x`-prefixed lowercase hex.
pub fn encode_address(address: &Address) -> String {
    let mut encoded = String::with_capacity(ADDRESS_STRING_LENGTH);
    encoded.push_str("0x");
    encoded.push_str(&hex::encode(address.0));
    encoded
}

/// Decode a `0x`-prefixed hex string into an address.
pub fn decode_address(address: &str) -> Result<Address, AddressError> {
    let payload = address
        .strip_prefix("0x")
        .ok_or(AddressError::InvalidPrefix)?;

    if address.len() != ADDRESS_STRING_LENGTH {
        return Err(AddressError::InvalidLength {
            expected: ADDRESS_STRING_LENGTH,
            actual: address.len(),
        });
    }

    let mut bytes = [0u8; ADDRESS_BYTES];
    hex::decode_to_slice(payload, &mut bytes)?;
    Ok(Address(bytes))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_address(self))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", encode_address(self))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_address(s)
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        encode_address(&value)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode_address(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_addresses_are_stable_and_distinct() {
        let a = Address::derive("alice");
        assert_eq!(a, Address::derive("alice"));
        assert_ne!(a, Address::derive("bob"));
        assert!(!a.is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn display_parses_back() {
        let a = Address::derive("carol");
        let parsed: Address = a.to_string().parse().expect("address should decode");
        assert_eq!(parsed, a);
    }

    #[test]
    fn invalid_prefix_rejected() {
        let bad = "1x".to_string() + &"00".repeat(ADDRESS_BYTES);
        assert!(matches!(
            decode_address(&bad).unwrap_err(),
            AddressError::InvalidPrefix
        ));
    }

    #[test]
    fn invalid_length_rejected() {
        let bad = "0x".to_string() + &"00".repeat(ADDRESS_BYTES - 1);
        assert!(matches!(
            decode_address(&bad).unwrap_err(),
            AddressError::InvalidLength { .. }
        ));
    }

    #[test]
    fn invalid_hex_rejected() {
        let bad = format!("0x{}", "zz".repeat(ADDRESS_BYTES));
        assert!(matches!(
            decode_address(&bad).unwrap_err(),
            AddressError::InvalidHex(_)
        ));
    }

    #[test]
    fn serde_uses_string_form() {
        let a = Address::derive("dave");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{a}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
