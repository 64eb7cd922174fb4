use std::fmt;

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::digest::{b64_decode, b64_encode, derive_user_id};
use super::{random_bytes, CryptoError};

/// Size of Ed25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

const PUBLIC_PEM_TAG: &str = "PUBLIC KEY";
const PRIVATE_PEM_TAG: &str = "PRIVATE KEY";

/// Conversion from a signing keypair to its key-agreement counterpart.
///
/// Envelope wrapping never touches curve arithmetic directly; it goes through
/// this interface so the conversion lives in exactly one audited place.
pub trait KeyAgreement {
    /// Agreement private key for a signing private key.
    fn to_agreement_private(signing: &SecretKey) -> StaticSecret;

    /// Agreement public key for a signing public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the Edwards point does not decompress.
    fn to_agreement_public(signing: &PublicKey) -> Result<X25519PublicKey, CryptoError>;
}

/// Ed25519 to X25519 through the Edwards/Montgomery birational map.
///
/// The private side uses the clamped scalar of the Ed25519 key (the first half
/// of its SHA-512 expansion), so both conversions agree with each other:
/// `to_agreement_public(sk.public()) == X25519PublicKey::from(&to_agreement_private(sk))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Birational;

impl KeyAgreement for Birational {
    fn to_agreement_private(signing: &SecretKey) -> StaticSecret {
        StaticSecret::from(signing.0.to_scalar_bytes())
    }

    fn to_agreement_public(signing: &PublicKey) -> Result<X25519PublicKey, CryptoError> {
        let edwards_point = CompressedEdwardsY::from_slice(&signing.to_bytes())
            .map_err(|_| CryptoError::InvalidKey("public key invalid edwards point".into()))?
            .decompress()
            .ok_or_else(|| {
                CryptoError::InvalidKey("public key failed to decompress edwards point".into())
            })?;

        let montgomery_point = edwards_point.to_montgomery();
        Ok(X25519PublicKey::from(montgomery_point.to_bytes()))
    }
}

/// Public half of a user's signing identity
///
/// Serves two purposes:
/// - **Identity**: hashed into the user id and checked against handshake signatures
/// - **Key Wrapping**: converted to X25519 for ECDH with a sender or recipient
///
/// Serialized as base64 text, matching every other binary field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl TryFrom<&[u8]> for PublicKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Self::from_bytes(&buff)
    }
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| CryptoError::InvalidKey("not a valid ed25519 point".into()))
    }

    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| CryptoError::Encoding("public key hex decode error".into()))?;
        Self::from_bytes(&buff)
    }

    pub fn from_base64(b64: &str) -> Result<Self, CryptoError> {
        let bytes = b64_decode(b64)?;
        Self::try_from(bytes.as_slice())
    }

    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn to_base64(&self) -> String {
        b64_encode(&self.to_bytes())
    }

    /// PEM armor for handing the key to someone out of band.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PUBLIC_PEM_TAG, self.to_bytes()))
    }

    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let contents = parse_pem(pem_str, PUBLIC_PEM_TAG)?;
        Self::try_from(contents.as_slice())
    }

    /// Parse a key given either as PEM or as bare base64.
    pub fn parse(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();
        if text.starts_with("-----BEGIN") {
            Self::from_pem(text)
        } else {
            Self::from_base64(text)
        }
    }

    /// The user id this key hashes to.
    pub fn user_id(&self) -> String {
        derive_user_id(self)
    }

    /// Verify an Ed25519 signature on a message.
    ///
    /// Uses strict verification, so small-order keys and malleable signatures
    /// are refused.
    pub fn verify(&self, msg: &[u8], signature: &ed25519_dalek::Signature) -> Result<(), CryptoError> {
        self.0
            .verify_strict(msg, signature)
            .map_err(|_| CryptoError::Authentication)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let b64 = String::deserialize(deserializer)?;
        PublicKey::from_base64(&b64).map_err(serde::de::Error::custom)
    }
}

/// Private half of a user's signing identity
///
/// Never serialized. At rest it only exists inside a
/// [`ProtectedKeyRecord`](super::ProtectedKeyRecord); in memory it is held by a
/// [`Credential`](crate::identity::Credential). The inner key is zeroized on drop.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"<redacted>").finish()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl SecretKey {
    /// Generate a new random secret key from the OS random source
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Entropy`] if the random source cannot be read.
    pub fn generate() -> Result<Self, CryptoError> {
        let bytes = zeroize::Zeroizing::new(random_bytes::<PRIVATE_KEY_SIZE>()?);
        Ok(Self::from(*bytes))
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let buff: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "invalid private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self::from(buff))
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Raw secret bytes, wiped when the returned buffer is dropped.
    pub fn to_bytes(&self) -> zeroize::Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        zeroize::Zeroizing::new(self.0.to_bytes())
    }

    /// Sign a message with this secret key using Ed25519.
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        self.0.sign(msg)
    }

    /// Unprotected PEM export. Prefer a [`KeyVault`](super::KeyVault) record for storage.
    pub fn to_pem(&self) -> zeroize::Zeroizing<String> {
        let bytes = self.to_bytes();
        zeroize::Zeroizing::new(pem::encode(&pem::Pem::new(PRIVATE_PEM_TAG, bytes.to_vec())))
    }

    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let contents = zeroize::Zeroizing::new(parse_pem(pem_str, PRIVATE_PEM_TAG)?);
        Self::try_from_slice(&contents)
    }
}

fn parse_pem(pem_str: &str, tag: &str) -> Result<Vec<u8>, CryptoError> {
    let pem = pem::parse(pem_str)
        .map_err(|e| CryptoError::Encoding(format!("failed to parse PEM: {}", e)))?;
    if pem.tag() != tag {
        return Err(CryptoError::Encoding(format!(
            "expected PEM tag {}, got {}",
            tag,
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate().unwrap();
        let public_key = private_key.public();

        let recovered_private = SecretKey::try_from_slice(&*private_key.to_bytes()).unwrap();
        assert_eq!(*private_key.to_bytes(), *recovered_private.to_bytes());

        let recovered_public = PublicKey::from_hex(&public_key.to_hex()).unwrap();
        assert_eq!(public_key, recovered_public);
        let recovered_public = PublicKey::from_base64(&public_key.to_base64()).unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_pem_serialization() {
        let private_key = SecretKey::generate().unwrap();
        let public_key = private_key.public();

        let recovered_private = SecretKey::from_pem(&private_key.to_pem()).unwrap();
        assert_eq!(*private_key.to_bytes(), *recovered_private.to_bytes());

        let pem = public_key.to_pem();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert_eq!(PublicKey::from_pem(&pem).unwrap(), public_key);
        assert_eq!(PublicKey::parse(&pem).unwrap(), public_key);
        assert_eq!(PublicKey::parse(&public_key.to_base64()).unwrap(), public_key);

        // tags are not interchangeable
        assert!(PublicKey::from_pem(&private_key.to_pem()).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let secret_key = SecretKey::generate().unwrap();
        let public_key = secret_key.public();
        let message = b"hello, world!";

        let signature = secret_key.sign(message);
        assert!(public_key.verify(message, &signature).is_ok());

        // Verify fails with wrong message
        assert!(matches!(
            public_key.verify(b"hello, world?", &signature),
            Err(CryptoError::Authentication)
        ));

        // Verify fails with wrong key
        let other_key = SecretKey::generate().unwrap().public();
        assert!(other_key.verify(message, &signature).is_err());
    }

    #[test]
    fn test_conversions_agree() {
        let secret_key = SecretKey::generate().unwrap();
        let from_private =
            X25519PublicKey::from(&Birational::to_agreement_private(&secret_key));
        let from_public = Birational::to_agreement_public(&secret_key.public()).unwrap();
        assert_eq!(from_private.as_bytes(), from_public.as_bytes());
    }

    #[test]
    fn test_public_key_size_validation() {
        assert!(PublicKey::try_from([1u8; 16].as_slice()).is_err());
        assert!(SecretKey::try_from_slice(&[1u8; 64]).is_err());
    }

    #[test]
    fn test_public_key_serde_is_base64() {
        let public_key = SecretKey::generate().unwrap().public();
        let json = serde_json::to_string(&public_key).unwrap();
        assert_eq!(json, format!("\"{}\"", public_key.to_base64()));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, public_key);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret_key = SecretKey::generate().unwrap();
        let debug = format!("{:?}", secret_key);
        assert!(!debug.contains(&hex::encode(*secret_key.to_bytes())));
    }
}
