use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The public half of a participant's Ed25519 key pair, used as the address that
/// transaction outputs pay to. Spending an output requires a signature that verifies
/// against this address.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyAddress([u8; 32]);

impl PublicKeyAddress {
    pub fn new(raw_bytes: [u8; 32]) -> Self {
        Self(raw_bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0[..])
    }
}

impl Display for PublicKeyAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_hex() {
        let address = PublicKeyAddress::new([0x1f; 32]);
        assert_eq!(format!("{}", address), "1f".repeat(32));
    }

    #[test]
    fn compares_by_raw_bytes() {
        assert_eq!(PublicKeyAddress::new([7; 32]), PublicKeyAddress::new([7; 32]));
        assert_ne!(PublicKeyAddress::new([7; 32]), PublicKeyAddress::new([8; 32]));
    }
}
