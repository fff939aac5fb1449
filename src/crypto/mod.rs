//! Signature verification and the things needed for it.
//!

pub use self::digest::{Digest, DigestAlgorithm};
pub use self::keys::{
    KeyIdentifier, PublicKey, PublicKeyFormat, SignatureVerificationError,
};
pub use self::signer::{KeyError, Signer, SigningError};
pub use self::signature::{Signature, SignatureAlgorithm};
pub use self::token::{
    CryptoContext, CryptoToken, SoftToken, TokenError, TokenRegistry,
    TokenSwitch, INTERNAL_TOKEN,
};

pub mod digest;
pub mod keys;
pub mod signer;
pub mod signature;
pub mod softsigner;
pub mod token;
