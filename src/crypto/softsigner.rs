//! A signer keeping keys in memory.
//!
//! This signer is used by agent tooling and tests that need to create
//! certificates and signed requests. Keys are generated by or imported
//! into the process and stay there.

use std::{error, fmt};
use std::sync::{Arc, RwLock};
use bytes::Bytes;
use dsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use dsa::signature::SignatureEncoding;
use dsa::signature::hazmat::PrehashSigner;
use ring::rand;
use ring::rand::SecureRandom;
use ring::signature::{
    EcdsaKeyPair, EcdsaSigningAlgorithm, KeyPair as _, RsaKeyPair,
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING,
    RSA_PKCS1_SHA256,
};
use super::keys::{PublicKey, PublicKeyFormat};
use super::signature::{Signature, SignatureAlgorithm};
use super::signer::{KeyError, Signer, SigningError};


//------------ SoftSigner ----------------------------------------------------

/// A signer based on ring and, for DSA, the `dsa` crate.
///
/// Only keys for the P-256 and P-384 curves can be created. RSA and DSA
/// keys can be imported from PKCS #8. Each key signs with its format’s
/// default signature algorithm.
pub struct SoftSigner {
    keys: RwLock<Vec<Option<Arc<KeyPair>>>>,
    rng: rand::SystemRandom,
}

impl SoftSigner {
    pub fn new() -> SoftSigner {
        SoftSigner {
            keys: Default::default(),
            rng: rand::SystemRandom::new(),
        }
    }

    /// Imports a key from its PKCS #8 encoding.
    pub fn key_from_pkcs8(
        &self, format: PublicKeyFormat, der: &[u8]
    ) -> Result<KeyId, SoftSignerError> {
        let key = KeyPair::from_pkcs8(format, der, &self.rng)?;
        Ok(self.insert_key(key))
    }

    fn insert_key(&self, key: KeyPair) -> KeyId {
        let mut keys = self.keys.write().unwrap_or_else(|err| {
            err.into_inner()
        });
        let res = keys.len();
        keys.push(Some(key.into()));
        KeyId(res)
    }

    fn get_key(
        &self, id: KeyId
    ) -> Result<Arc<KeyPair>, KeyError<SoftSignerError>> {
        let keys = self.keys.read().unwrap_or_else(|err| err.into_inner());
        keys.get(id.0).and_then(|key| {
            key.as_ref().cloned()
        }).ok_or(KeyError::KeyNotFound)
    }

    fn delete_key(
        &self, key: KeyId
    ) -> Result<(), KeyError<SoftSignerError>> {
        let mut keys = self.keys.write().unwrap_or_else(|err| {
            err.into_inner()
        });
        match keys.get_mut(key.0) {
            Some(key) => {
                if key.is_some() {
                    *key = None;
                    Ok(())
                }
                else {
                    Err(KeyError::KeyNotFound)
                }
            }
            None => Err(KeyError::KeyNotFound)
        }
    }
}

impl Signer for SoftSigner {
    type KeyId = KeyId;
    type Error = SoftSignerError;

    fn create_key(
        &self, algorithm: PublicKeyFormat
    ) -> Result<Self::KeyId, Self::Error> {
        Ok(self.insert_key(KeyPair::new(algorithm, &self.rng)?))
    }

    fn get_key_info(
        &self,
        id: &Self::KeyId
    ) -> Result<PublicKey, KeyError<Self::Error>> {
        Ok(self.get_key(*id)?.get_key_info())
    }

    fn destroy_key(
        &self, key: &Self::KeyId
    ) -> Result<(), KeyError<Self::Error>> {
        self.delete_key(*key)
    }

    fn sign<D: AsRef<[u8]> + ?Sized>(
        &self,
        key: &Self::KeyId,
        algorithm: SignatureAlgorithm,
        data: &D
    ) -> Result<Signature, SigningError<Self::Error>> {
        let key = self.get_key(*key)?;
        if algorithm != key.format.default_signature_algorithm() {
            return Err(SigningError::IncompatibleKey)
        }
        Ok(key.sign(data.as_ref(), &self.rng)?)
    }

    fn rand(&self, target: &mut [u8]) -> Result<(), Self::Error> {
        self.rng.fill(target).map_err(|_| SoftSignerError::Rng)
    }
}


impl Default for SoftSigner {
    fn default() -> Self {
        Self::new()
    }
}


//------------ KeyId ---------------------------------------------------------

/// This signer’s key identifier.
//
//  We wrap this in a newtype so that people won’t start mucking about with
//  the integers.
#[derive(Clone, Copy, Debug)]
pub struct KeyId(usize);


//------------ KeyPair -------------------------------------------------------

/// A key pair kept by the signer.
struct KeyPair {
    format: PublicKeyFormat,
    key: KeyMaterial,
}

/// The private key of a key pair.
enum KeyMaterial {
    Ecdsa(EcdsaKeyPair),
    Rsa(RsaKeyPair),

    /// A DSA key with its public key including the domain parameters.
    Dsa(dsa::SigningKey, PublicKey),
}

impl KeyPair {
    fn signing_algorithm(
        format: PublicKeyFormat
    ) -> Result<&'static EcdsaSigningAlgorithm, SoftSignerError> {
        match format {
            PublicKeyFormat::EcdsaP256 => Ok(&ECDSA_P256_SHA256_ASN1_SIGNING),
            PublicKeyFormat::EcdsaP384 => Ok(&ECDSA_P384_SHA384_ASN1_SIGNING),
            _ => Err(SoftSignerError::UnsupportedAlgorithm)
        }
    }

    fn new(
        format: PublicKeyFormat, rng: &rand::SystemRandom
    ) -> Result<Self, SoftSignerError> {
        let alg = Self::signing_algorithm(format)?;
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, rng).map_err(|_| {
            SoftSignerError::Rng
        })?;
        Self::from_pkcs8(format, pkcs8.as_ref(), rng)
    }

    fn from_pkcs8(
        format: PublicKeyFormat, der: &[u8], rng: &rand::SystemRandom
    ) -> Result<Self, SoftSignerError> {
        let key = match format {
            PublicKeyFormat::Rsa => {
                KeyMaterial::Rsa(RsaKeyPair::from_pkcs8(der).map_err(|_| {
                    SoftSignerError::KeyRejected
                })?)
            }
            PublicKeyFormat::Dsa => {
                let key = dsa::SigningKey::from_pkcs8_der(der).map_err(|_| {
                    SoftSignerError::KeyRejected
                })?;
                let info = key.verifying_key().to_public_key_der().map_err(
                    |_| SoftSignerError::KeyRejected
                )?;
                let public = PublicKey::decode(
                    Bytes::copy_from_slice(info.as_bytes())
                ).map_err(|_| SoftSignerError::KeyRejected)?;
                KeyMaterial::Dsa(key, public)
            }
            _ => {
                let alg = Self::signing_algorithm(format)?;
                KeyMaterial::Ecdsa(
                    EcdsaKeyPair::from_pkcs8(alg, der, rng).map_err(|_| {
                        SoftSignerError::KeyRejected
                    })?
                )
            }
        };
        Ok(KeyPair { format, key })
    }

    fn get_key_info(&self) -> PublicKey {
        match self.key {
            KeyMaterial::Ecdsa(ref key) => {
                PublicKey::new(
                    self.format,
                    Bytes::copy_from_slice(key.public_key().as_ref())
                )
            }
            KeyMaterial::Rsa(ref key) => {
                PublicKey::new(
                    self.format,
                    Bytes::copy_from_slice(key.public().as_ref())
                )
            }
            KeyMaterial::Dsa(_, ref public) => public.clone(),
        }
    }

    fn sign(
        &self, data: &[u8], rng: &rand::SystemRandom
    ) -> Result<Signature, SoftSignerError> {
        let algorithm = self.format.default_signature_algorithm();
        let value = match self.key {
            KeyMaterial::Ecdsa(ref key) => {
                let signature = key.sign(rng, data).map_err(|_| {
                    SoftSignerError::Rng
                })?;
                Bytes::copy_from_slice(signature.as_ref())
            }
            KeyMaterial::Rsa(ref key) => {
                let mut signature = vec![0u8; key.public().modulus_len()];
                key.sign(
                    &RSA_PKCS1_SHA256, rng, data, &mut signature
                ).map_err(|_| SoftSignerError::Rng)?;
                Bytes::from(signature)
            }
            KeyMaterial::Dsa(ref key, _) => {
                let digest = algorithm.digest_algorithm().digest(data);
                let signature = key.sign_prehash(digest.as_ref()).map_err(
                    |_| SoftSignerError::Rng
                )?;
                Bytes::from(signature.to_vec())
            }
        };
        Ok(Signature::new(algorithm, value))
    }
}


//------------ SoftSignerError -----------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SoftSignerError {
    /// The key format is not supported by this signer.
    UnsupportedAlgorithm,

    /// An imported key was rejected.
    KeyRejected,

    /// The random number generator failed.
    Rng,
}

impl fmt::Display for SoftSignerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            SoftSignerError::UnsupportedAlgorithm => "unsupported algorithm",
            SoftSignerError::KeyRejected => "key rejected",
            SoftSignerError::Rng => "rng error",
        })
    }
}

impl error::Error for SoftSignerError { }


//============ Tests =========================================================
