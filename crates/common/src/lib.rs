/**
 * Login handshake.
 *  - Challenge issue and single-use verification
 *  - Session tokens and bearer auth
 *  - Client-side state machine
 */
pub mod auth;
/**
 * Cryptographic types and operations.
 *  - Public and Private key implementations
 *  - Passphrase key vault
 *  - Key-to-key key wrapping
 */
pub mod crypto;
/**
 * Encrypted file metadata and the list
 *  of users allowed to open each file.
 */
pub mod envelope;
/**
 * User identities and unlocked credentials.
 */
pub mod identity;

pub mod prelude {
    pub use crate::auth::{Handshake, HandshakeError, HandshakeState, Verifier};
    pub use crate::crypto::{CryptoError, KeyVault, ProtectedKeyRecord, PublicKey, SecretKey};
    pub use crate::envelope::{AuthorizationEntry, EnvelopeError, ErrorKind, FileEnvelope};
    pub use crate::identity::{generate_identity, Credential, Identity, IdentityError};
}
