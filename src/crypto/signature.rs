//! Signature algorithms and operations.

use std::fmt;
use bcder::{decode, encode};
use bcder::{ConstOid, Oid, Tag};
use bcder::decode::DecodeError;
use bcder::encode::PrimitiveContent;
use bytes::Bytes;
use crate::oid;
use super::digest::DigestAlgorithm;
use super::keys::PublicKeyFormat;


//------------ SignatureAlgorithm --------------------------------------------

/// A signature algorithm used by an agent or a certification request.
///
/// Each algorithm combines a public key algorithm with a digest algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    /// RSA with PKCS #1 version 1.5 padding.
    RsaPkcs1(DigestAlgorithm),

    /// ECDSA with an ASN.1 encoded signature value.
    Ecdsa(DigestAlgorithm),

    /// DSA with an ASN.1 encoded signature value.
    Dsa(DigestAlgorithm),
}

impl SignatureAlgorithm {
    /// Returns the digest algorithm used by the signature algorithm.
    pub fn digest_algorithm(self) -> DigestAlgorithm {
        match self {
            SignatureAlgorithm::RsaPkcs1(digest) => digest,
            SignatureAlgorithm::Ecdsa(digest) => digest,
            SignatureAlgorithm::Dsa(digest) => digest,
        }
    }

    /// Returns whether a key of the given format can create signatures.
    pub fn is_compatible(self, format: PublicKeyFormat) -> bool {
        matches!(
            (self, format),
            (SignatureAlgorithm::RsaPkcs1(_), PublicKeyFormat::Rsa)
            | (SignatureAlgorithm::Ecdsa(_), PublicKeyFormat::EcdsaP256)
            | (SignatureAlgorithm::Ecdsa(_), PublicKeyFormat::EcdsaP384)
            | (SignatureAlgorithm::Dsa(_), PublicKeyFormat::Dsa)
        )
    }

    /// Returns the combined object identifier if there is one.
    fn x509_oid(self) -> Option<&'static ConstOid> {
        use self::DigestAlgorithm::*;

        match self {
            SignatureAlgorithm::RsaPkcs1(Sha1) => {
                Some(&oid::SHA1_WITH_RSA_ENCRYPTION)
            }
            SignatureAlgorithm::RsaPkcs1(Sha256) => {
                Some(&oid::SHA256_WITH_RSA_ENCRYPTION)
            }
            SignatureAlgorithm::RsaPkcs1(Sha384) => {
                Some(&oid::SHA384_WITH_RSA_ENCRYPTION)
            }
            SignatureAlgorithm::RsaPkcs1(Sha512) => {
                Some(&oid::SHA512_WITH_RSA_ENCRYPTION)
            }
            SignatureAlgorithm::Ecdsa(Sha1) => Some(&oid::ECDSA_WITH_SHA1),
            SignatureAlgorithm::Ecdsa(Sha256) => {
                Some(&oid::ECDSA_WITH_SHA256)
            }
            SignatureAlgorithm::Ecdsa(Sha384) => {
                Some(&oid::ECDSA_WITH_SHA384)
            }
            SignatureAlgorithm::Ecdsa(Sha512) => {
                Some(&oid::ECDSA_WITH_SHA512)
            }
            SignatureAlgorithm::Dsa(Sha1) => Some(&oid::DSA_WITH_SHA1),
            SignatureAlgorithm::Dsa(Sha256) => Some(&oid::DSA_WITH_SHA256),
            SignatureAlgorithm::Dsa(_) => None,
        }
    }

    /// Returns the algorithm for a combined object identifier.
    fn from_x509_oid<T: AsRef<[u8]>>(oid: &Oid<T>) -> Option<Self> {
        use self::DigestAlgorithm::*;

        [
            SignatureAlgorithm::RsaPkcs1(Sha1),
            SignatureAlgorithm::RsaPkcs1(Sha256),
            SignatureAlgorithm::RsaPkcs1(Sha384),
            SignatureAlgorithm::RsaPkcs1(Sha512),
            SignatureAlgorithm::Ecdsa(Sha1),
            SignatureAlgorithm::Ecdsa(Sha256),
            SignatureAlgorithm::Ecdsa(Sha384),
            SignatureAlgorithm::Ecdsa(Sha512),
            SignatureAlgorithm::Dsa(Sha1),
            SignatureAlgorithm::Dsa(Sha256),
        ].into_iter().find(|alg| {
            alg.x509_oid().map(|alg_oid| alg_oid == oid).unwrap_or(false)
        })
    }
}

/// # ASN.1 Values
///
/// Signature algorithm identifiers appear in certificates, certification
/// requests, and in the signer infos of signed data.
///
/// ```txt
/// SignatureAlgorithmIdentifier ::= AlgorithmIdentifier
/// AlgorithmIdentifier          ::= SEQUENCE {
///      algorithm                   OBJECT IDENTIFIER,
///      parameters                  ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// X.509-related objects always use an identifier that names both the
/// public key and the digest algorithm, e.g., `sha256WithRSAEncryption`.
/// In signer infos, [RFC 3370] additionally allows naming only the public
/// key algorithm, e.g., `rsaEncryption`, with the digest algorithm taken
/// from the signer info’s own digest algorithm field. Functions prefixed
/// with `x509_` deal with the former, `cms_` with the latter.
///
/// For RSA, the parameters are NULL or absent. For ECDSA and DSA, they are
/// absent. Unknown parameters are rejected.
///
/// [RFC 3370]: https://tools.ietf.org/html/rfc3370
impl SignatureAlgorithm {
    /// Takes a signature algorithm identifier for X.509 objects.
    pub fn x509_take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let oid = Oid::take_from(cons)?;
            let res = match Self::from_x509_oid(&oid) {
                Some(res) => res,
                None => {
                    return Err(cons.content_err(
                        "unsupported signature algorithm"
                    ))
                }
            };
            cons.take_opt_primitive_if(Tag::NULL, |_| Ok(()))?;
            Ok(res)
        })
    }

    /// Takes a signature algorithm identifier for CMS signer infos.
    ///
    /// The `digest` is the digest algorithm of the signer info. It is used
    /// if the identifier only names the public key algorithm.
    pub fn cms_take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        digest: DigestAlgorithm,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let oid = Oid::take_from(cons)?;
            let res = if oid == oid::RSA_ENCRYPTION {
                cons.take_opt_primitive_if(Tag::NULL, |_| Ok(()))?;
                SignatureAlgorithm::RsaPkcs1(digest)
            }
            else if oid == oid::EC_PUBLIC_KEY {
                cons.skip_all()?;
                SignatureAlgorithm::Ecdsa(digest)
            }
            else if oid == oid::DSA {
                cons.skip_all()?;
                SignatureAlgorithm::Dsa(digest)
            }
            else {
                match Self::from_x509_oid(&oid) {
                    Some(res) => {
                        cons.take_opt_primitive_if(Tag::NULL, |_| Ok(()))?;
                        res
                    }
                    None => {
                        return Err(cons.content_err(
                            "unsupported signature algorithm"
                        ))
                    }
                }
            };
            Ok(res)
        })
    }

    /// Provides an encoder for X.509 objects.
    ///
    /// DSA with SHA-384 and SHA-512 has no combined identifier and is
    /// encoded as `id-dsa`.
    pub fn x509_encode(self) -> impl encode::Values {
        let alg = self.x509_oid().unwrap_or(&oid::DSA);
        encode::sequence((
            alg.encode_ref(),
            match self {
                SignatureAlgorithm::RsaPkcs1(_) => Some(().encode()),
                _ => None
            }
        ))
    }

    /// Provides an encoder for CMS signer infos.
    ///
    /// This always uses the combined identifier.
    pub fn cms_encode(self) -> impl encode::Values {
        self.x509_encode()
    }
}


//--- Display

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SignatureAlgorithm::RsaPkcs1(digest) => {
                write!(f, "{}withRSA", digest.name().replace('-', ""))
            }
            SignatureAlgorithm::Ecdsa(digest) => {
                write!(f, "{}withEC", digest.name().replace('-', ""))
            }
            SignatureAlgorithm::Dsa(digest) => {
                write!(f, "{}withDSA", digest.name().replace('-', ""))
            }
        }
    }
}


//------------ Signature -----------------------------------------------------

/// A signature value together with the algorithm that created it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    algorithm: SignatureAlgorithm,
    value: Bytes
}

impl Signature {
    pub fn new(algorithm: SignatureAlgorithm, value: Bytes) -> Self {
        Signature { algorithm, value }
    }

    pub fn algorithm(&self) -> &SignatureAlgorithm {
        &self.algorithm
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn unwrap(self) -> (SignatureAlgorithm, Bytes) {
        (self.algorithm, self.value)
    }
}


//============ Tests =========================================================
