use crate::PublicKeyAddress;
use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::convert::TryInto;
use std::fmt::{Display, Formatter};

/// A signature over a transaction's signable payload, authorizing one input's claim.
/// The bytes are a raw Ed25519 signature. Malformed content (e.g. a length other than
/// 64 bytes) never verifies.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(raw_bytes: Vec<u8>) -> Self {
        Self(raw_bytes)
    }

    /// A placeholder for inputs that have not been signed yet.
    pub fn empty() -> Self {
        Self(vec![])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.as_slice()))
    }
}

/// An Ed25519 key pair held by one participant. The public half doubles as the
/// participant's address.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a fresh key pair from the operating system's entropy source.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key_address(&self) -> PublicKeyAddress {
        PublicKeyAddress::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

/// Signature verification, as used by the transaction validator.
pub struct Crypto {}

impl Crypto {
    /// Returns whether the signature over the message verifies against the given
    /// address. Total and deterministic: a malformed address or signature is reported
    /// as a failed verification rather than an error.
    pub fn verify_signature(
        address: &PublicKeyAddress,
        message: &[u8],
        signature: &Signature,
    ) -> bool {
        let verifying_key = match VerifyingKey::from_bytes(address.as_bytes()) {
            Ok(verifying_key) => verifying_key,
            Err(_) => return false,
        };
        let raw_signature: [u8; 64] = match signature.as_slice().try_into() {
            Ok(raw_signature) => raw_signature,
            Err(_) => return false,
        };
        let signature = Ed25519Signature::from_bytes(&raw_signature);
        verifying_key.verify(message, &signature).is_ok()
    }
}
