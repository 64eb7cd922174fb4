//! Per-recipient key wrapping using ECDH + AES-256-GCM
//!
//! This module wraps a file [`Secret`] so that exactly one (sender, recipient) pair
//! can recover it. Both parties use their long-lived Ed25519 identity keys; no
//! separate key-agreement keypair is ever registered.
//!
//! # Protocol Overview
//!
//! To wrap a secret for a recipient:
//! 1. **Convert keys**: sender secret key and recipient public key go to X25519
//! 2. **Perform ECDH**: compute the shared secret
//! 3. **Derive**: wrapping key = SHA-256(shared secret)
//! 4. **Encrypt**: AES-256-GCM of the 32-byte secret under a fresh 12-byte IV
//!
//! The recipient recovers the secret by:
//! 1. **Convert keys**: recipient secret key and sender public key go to X25519
//! 2. **Perform ECDH**: X25519 is symmetric, so this is the same shared secret
//! 3. **Derive + Decrypt**: same wrapping key, AEAD decrypt
//!
//! # Security Properties
//!
//! - **Pairwise keys**: every (sender, recipient) pair gets its own wrapping key
//! - **Authentication**: only the sender's public key reconstructs the shared secret,
//!   so a recipient must know who wrapped the key
//! - **Integrity**: the GCM tag covers the wrapped key; any bit flip fails to unwrap
//! - **No forward secrecy**: the wrapping key is static for a pair. Compromise of
//!   either identity key exposes every key that pair has exchanged.

use zeroize::Zeroizing;

use super::digest::sha256;
use super::keys::{Birational, KeyAgreement, PublicKey, SecretKey};
use super::secret::{generate_iv, Iv, Secret, SECRET_SIZE, TAG_SIZE};
use super::CryptoError;

/// Size of a wrapped [`Secret`]: the 32 key bytes plus the GCM tag
pub const WRAPPED_KEY_SIZE: usize = SECRET_SIZE + TAG_SIZE;

/// A [`Secret`] encrypted for one recipient, plus the IV it was sealed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    pub encrypted_key: Vec<u8>,
    pub iv: Iv,
}

/// Derive the pairwise wrapping key from one side's private key and the other's public key.
fn wrapping_key<C: KeyAgreement>(
    own_private: &SecretKey,
    other_public: &PublicKey,
) -> Result<Secret, CryptoError> {
    let own_x25519_private = C::to_agreement_private(own_private);
    let other_x25519_public = C::to_agreement_public(other_public)?;

    let shared_secret = own_x25519_private.diffie_hellman(&other_x25519_public);
    // A small-order public key forces the all-zero shared secret
    if !shared_secret.was_contributory() {
        return Err(CryptoError::InvalidKey(
            "key agreement produced a non-contributory shared secret".into(),
        ));
    }

    let digest = Zeroizing::new(sha256(shared_secret.as_bytes()));
    Ok(Secret::from(*digest))
}

/// Check that a caller-supplied public key is the public half of `private`.
fn ensure_pair(private: &SecretKey, public: &PublicKey) -> Result<(), CryptoError> {
    if private.public() != *public {
        return Err(CryptoError::InvalidKey(
            "public key does not match private key".into(),
        ));
    }
    Ok(())
}

/// Wrap `symmetric_key` so only `recipient_signing_public` can unwrap it.
///
/// # Errors
///
/// - [`CryptoError::InvalidKey`] if the sender's public key is not the public half
///   of the sender's private key, or the recipient key is not a usable point
/// - [`CryptoError::Entropy`] if no IV can be generated
pub fn wrap_key_for(
    symmetric_key: &Secret,
    sender_signing_private: &SecretKey,
    sender_signing_public: &PublicKey,
    recipient_signing_public: &PublicKey,
) -> Result<WrappedKey, CryptoError> {
    ensure_pair(sender_signing_private, sender_signing_public)?;

    let kek = wrapping_key::<Birational>(sender_signing_private, recipient_signing_public)?;
    let iv = generate_iv()?;
    let encrypted_key = kek.encrypt(&iv, symmetric_key.bytes())?;

    Ok(WrappedKey { encrypted_key, iv })
}

/// Recover a [`Secret`] wrapped by `sender_signing_public` for the recipient.
///
/// # Errors
///
/// - [`CryptoError::Authentication`] if the GCM tag does not verify: wrong keys,
///   tampered bytes or a mismatched IV all look the same
/// - [`CryptoError::InvalidKey`] if the recipient's public key does not match their
///   private key, or the sender key is not a usable point
pub fn unwrap_key_from(
    encrypted_key: &[u8],
    iv: &Iv,
    recipient_signing_private: &SecretKey,
    recipient_signing_public: &PublicKey,
    sender_signing_public: &PublicKey,
) -> Result<Secret, CryptoError> {
    ensure_pair(recipient_signing_private, recipient_signing_public)?;

    let kek = wrapping_key::<Birational>(recipient_signing_private, sender_signing_public)?;
    let unwrapped = Zeroizing::new(kek.decrypt(iv, encrypted_key)?);

    // The tag verified, so a size mismatch means the sender wrapped something else
    Secret::from_slice(&unwrapped).map_err(|_| CryptoError::Authentication)
}

#[cfg(test)]
mod test {
    use super::*;

    fn keypair() -> (SecretKey, PublicKey) {
        let private = SecretKey::generate().unwrap();
        let public = private.public();
        (private, public)
    }

    #[test]
    fn test_wrap_for_self() {
        let secret = Secret::from([42u8; SECRET_SIZE]);
        let (private, public) = keypair();

        let wrapped = wrap_key_for(&secret, &private, &public, &public).unwrap();
        assert_eq!(wrapped.encrypted_key.len(), WRAPPED_KEY_SIZE);

        let recovered =
            unwrap_key_from(&wrapped.encrypted_key, &wrapped.iv, &private, &public, &public)
                .unwrap();
        assert_eq!(secret, recovered);
    }

    #[test]
    fn test_wrap_between_users() {
        let secret = Secret::generate().unwrap();
        let (alice_private, alice_public) = keypair();
        let (bob_private, bob_public) = keypair();

        // Alice wraps for Bob
        let wrapped = wrap_key_for(&secret, &alice_private, &alice_public, &bob_public).unwrap();

        // Bob unwraps naming Alice as sender
        let recovered = unwrap_key_from(
            &wrapped.encrypted_key,
            &wrapped.iv,
            &bob_private,
            &bob_public,
            &alice_public,
        )
        .unwrap();
        assert_eq!(secret, recovered);
    }

    #[test]
    fn test_unwrap_with_wrong_sender_fails() {
        let secret = Secret::generate().unwrap();
        let (alice_private, alice_public) = keypair();
        let (bob_private, bob_public) = keypair();
        let (_, carol_public) = keypair();

        let wrapped = wrap_key_for(&secret, &alice_private, &alice_public, &bob_public).unwrap();

        let result = unwrap_key_from(
            &wrapped.encrypted_key,
            &wrapped.iv,
            &bob_private,
            &bob_public,
            &carol_public,
        );
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_unwrap_by_other_recipient_fails() {
        let secret = Secret::generate().unwrap();
        let (alice_private, alice_public) = keypair();
        let (_, bob_public) = keypair();
        let (carol_private, carol_public) = keypair();

        let wrapped = wrap_key_for(&secret, &alice_private, &alice_public, &bob_public).unwrap();

        let result = unwrap_key_from(
            &wrapped.encrypted_key,
            &wrapped.iv,
            &carol_private,
            &carol_public,
            &alice_public,
        );
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_tampered_wrap_fails() {
        let secret = Secret::generate().unwrap();
        let (private, public) = keypair();
        let mut wrapped = wrap_key_for(&secret, &private, &public, &public).unwrap();

        wrapped.encrypted_key[0] ^= 0x80;
        let result =
            unwrap_key_from(&wrapped.encrypted_key, &wrapped.iv, &private, &public, &public);
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_mismatched_sender_pair_rejected() {
        let secret = Secret::generate().unwrap();
        let (alice_private, _) = keypair();
        let (_, bob_public) = keypair();

        let result = wrap_key_for(&secret, &alice_private, &bob_public, &bob_public);
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_each_wrap_uses_fresh_iv() {
        let secret = Secret::generate().unwrap();
        let (private, public) = keypair();

        let first = wrap_key_for(&secret, &private, &public, &public).unwrap();
        let second = wrap_key_for(&secret, &private, &public, &public).unwrap();
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.encrypted_key, second.encrypted_key);
    }
}
