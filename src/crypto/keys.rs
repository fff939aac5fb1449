//! Types and parameters of keys.

use std::{error, fmt, io};
use bcder::{decode, encode};
use bcder::{BitString, Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use dsa::pkcs8::DecodePublicKey;
use dsa::signature::hazmat::PrehashVerifier;
use ring::{digest, signature};
use ring::error::Unspecified;
use crate::oid;
use crate::util::hex;
use super::digest::DigestAlgorithm;
use super::signature::{Signature, SignatureAlgorithm};


//------------ PublicKeyFormat -----------------------------------------------

/// The formats of public keys an agent certificate may carry.
///
/// RSA keys, ECDSA keys on the NIST curves P-256 and P-384, and DSA keys
/// can be used for verification.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PublicKeyFormat {
    /// An RSA public key.
    Rsa,

    /// An ECDSA public key for the P-256 elliptic curve.
    EcdsaP256,

    /// An ECDSA public key for the P-384 elliptic curve.
    EcdsaP384,

    /// A DSA public key.
    Dsa,
}

impl PublicKeyFormat {
    /// Returns the key type name as used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            PublicKeyFormat::Rsa => "RSA",
            PublicKeyFormat::EcdsaP256 | PublicKeyFormat::EcdsaP384 => "EC",
            PublicKeyFormat::Dsa => "DSA",
        }
    }

    /// Returns the signature algorithm this format signs with by default.
    pub fn default_signature_algorithm(self) -> SignatureAlgorithm {
        match self {
            PublicKeyFormat::Rsa => {
                SignatureAlgorithm::RsaPkcs1(DigestAlgorithm::Sha256)
            }
            PublicKeyFormat::EcdsaP256 => {
                SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha256)
            }
            PublicKeyFormat::EcdsaP384 => {
                SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha384)
            }
            PublicKeyFormat::Dsa => {
                SignatureAlgorithm::Dsa(DigestAlgorithm::Sha256)
            }
        }
    }
}


/// # ASN.1 Algorithm Identifiers
///
/// The format of the public key is identified in certificates through a
/// algorithm identifier defined with this ASN.1:
///
/// ```txt
/// AlgorithmIdentifier ::= SEQUENCE {
///      algorithm          OBJECT IDENTIFIER,
///      parameters         ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// For RSA keys, the object identifier needs to be that of `rsaEncryption`
/// defined by [RFC 4055] and the parameters must be present and NULL.
/// When parsing, we generously also allow it to be absent altogether.
///
/// For ECDSA keys, the object identifer needs to be `ecPublicKey` defined
/// in [RFC 5480] with the parameter being the object identifier of the
/// named curve.
///
/// For DSA keys, the identifier is `id-dsa` from [RFC 3279]. The domain
/// parameters are kept with the public key since they are needed for
/// verification.
///
/// [RFC 3279]: https://tools.ietf.org/html/rfc3279
/// [RFC 4055]: https://tools.ietf.org/html/rfc4055
/// [RFC 5480]: https://tools.ietf.org/html/rfc5480
impl PublicKeyFormat {
    /// Takes and returns a algorithm identifier.
    ///
    /// Returns a malformed error if the algorithm isn’t one of the allowed
    /// algorithms or if the value isn’t correctly encoded.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the algorithm identifier from the contents of its sequence.
    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        Self::with_parameters_from_constructed(cons).map(|res| res.0)
    }

    /// Parses the algorithm identifier and keeps DSA domain parameters.
    fn with_parameters_from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<(Self, Option<Captured>), DecodeError<S::Error>> {
        let alg = Oid::take_from(cons)?;
        if alg == oid::RSA_ENCRYPTION {
            cons.take_opt_primitive_if(Tag::NULL, |_| Ok(()))?;
            Ok((PublicKeyFormat::Rsa, None))
        }
        else if alg == oid::EC_PUBLIC_KEY {
            let curve = Oid::take_from(cons)?;
            if curve == oid::SECP256R1 {
                Ok((PublicKeyFormat::EcdsaP256, None))
            }
            else if curve == oid::SECP384R1 {
                Ok((PublicKeyFormat::EcdsaP384, None))
            }
            else {
                Err(cons.content_err("unsupported elliptic curve"))
            }
        }
        else if alg == oid::DSA {
            let params = cons.capture(|cons| cons.skip_all())?;
            if params.as_slice().is_empty() {
                Ok((PublicKeyFormat::Dsa, None))
            }
            else {
                Ok((PublicKeyFormat::Dsa, Some(params)))
            }
        }
        else {
            Err(cons.content_err("unsupported public key algorithm"))
        }
    }

    /// Provides an encoder for the algorihm identifier.
    ///
    /// DSA keys are encoded without domain parameters. Use
    /// [`PublicKey::encode_ref`] to include them.
    pub fn encode(self) -> impl encode::Values {
        let (alg, param) = match self {
            PublicKeyFormat::Rsa => (&oid::RSA_ENCRYPTION, None),
            PublicKeyFormat::EcdsaP256 => {
                (&oid::EC_PUBLIC_KEY, Some(&oid::SECP256R1))
            }
            PublicKeyFormat::EcdsaP384 => {
                (&oid::EC_PUBLIC_KEY, Some(&oid::SECP384R1))
            }
            PublicKeyFormat::Dsa => (&oid::DSA, None),
        };
        encode::sequence((
            alg.encode_ref(),
            param.map(|param| param.encode_ref()),
            if self == PublicKeyFormat::Rsa {
                Some(().encode())
            }
            else {
                None
            }
        ))
    }
}


//------------ PublicKey -----------------------------------------------------

/// A public key.
#[derive(Clone, Debug)]
pub struct PublicKey {
    algorithm: PublicKeyFormat,
    bits: Bytes,

    /// The encoded domain parameters of a DSA key.
    parameters: Option<Captured>,
}

impl PublicKey {
    /// Creates a public key from its format and the content of its bits.
    ///
    /// For RSA keys, `bits` is the DER encoded `RSAPublicKey`, for ECDSA
    /// keys it is the uncompressed curve point.
    pub fn new(algorithm: PublicKeyFormat, bits: Bytes) -> Self {
        PublicKey { algorithm, bits, parameters: None }
    }

    /// Returns the algorithm of this public key.
    pub fn algorithm(&self) -> PublicKeyFormat {
        self.algorithm
    }

    /// Returns the bits of this public key.
    pub fn bits(&self) -> &[u8] {
        self.bits.as_ref()
    }

    /// Returns a key identifier for this key.
    ///
    /// The identifier will be the SHA1 hash of the key’s bits.
    pub fn key_identifier(&self) -> KeyIdentifier {
        KeyIdentifier(Bytes::copy_from_slice(
            digest::digest(
                &digest::SHA1_FOR_LEGACY_USE_ONLY, self.bits.as_ref()
            ).as_ref()
        ))
    }

    /// Returns the encoded domain parameters of a DSA key.
    pub fn parameters(&self) -> Option<&[u8]> {
        self.parameters.as_ref().map(Captured::as_slice)
    }

    /// Verifies a signature using this public key.
    ///
    /// The signature algorithm must fit the key. RSA keys verify PKCS #1
    /// version 1.5 signatures, ECDSA keys verify ASN.1 encoded signatures
    /// with SHA-256 or SHA-384. DSA keys need their domain parameters.
    /// Everything else fails.
    pub fn verify(
        &self, message: &[u8], signature: &Signature
    ) -> Result<(), SignatureVerificationError> {
        if let SignatureAlgorithm::Dsa(digest) = *signature.algorithm() {
            return self.verify_dsa(message, digest, signature)
        }
        let alg = match self.verification_algorithm(*signature.algorithm()) {
            Some(alg) => alg,
            None => return Err(SignatureVerificationError(()))
        };
        signature::UnparsedPublicKey::new(alg, self.bits.as_ref()).verify(
            message, signature.value().as_ref()
        ).map_err(Into::into)
    }

    /// Verifies a DSA signature.
    fn verify_dsa(
        &self,
        message: &[u8],
        digest: DigestAlgorithm,
        signature: &Signature,
    ) -> Result<(), SignatureVerificationError> {
        if self.algorithm != PublicKeyFormat::Dsa {
            return Err(SignatureVerificationError(()))
        }
        if self.parameters.is_none() {
            return Err(SignatureVerificationError(()))
        }
        let key = dsa::VerifyingKey::from_public_key_der(
            self.to_info_bytes().as_ref()
        ).map_err(|_| SignatureVerificationError(()))?;
        let signature = dsa::Signature::try_from(
            signature.value().as_ref()
        ).map_err(|_| SignatureVerificationError(()))?;
        key.verify_prehash(digest.digest(message).as_ref(), &signature)
            .map_err(|_| SignatureVerificationError(()))
    }

    /// Returns the ring algorithm for verifying a signature with this key.
    fn verification_algorithm(
        &self, algorithm: SignatureAlgorithm
    ) -> Option<&'static dyn signature::VerificationAlgorithm> {
        use self::DigestAlgorithm::*;

        match (self.algorithm, algorithm) {
            (PublicKeyFormat::Rsa, SignatureAlgorithm::RsaPkcs1(digest)) => {
                Some(match digest {
                    Sha1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
                    Sha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
                    Sha384 => &signature::RSA_PKCS1_2048_8192_SHA384,
                    Sha512 => &signature::RSA_PKCS1_2048_8192_SHA512,
                })
            }
            (PublicKeyFormat::EcdsaP256, SignatureAlgorithm::Ecdsa(digest)) => {
                match digest {
                    Sha256 => Some(&signature::ECDSA_P256_SHA256_ASN1),
                    Sha384 => Some(&signature::ECDSA_P256_SHA384_ASN1),
                    _ => None
                }
            }
            (PublicKeyFormat::EcdsaP384, SignatureAlgorithm::Ecdsa(digest)) => {
                match digest {
                    Sha256 => Some(&signature::ECDSA_P384_SHA256_ASN1),
                    Sha384 => Some(&signature::ECDSA_P384_SHA384_ASN1),
                    _ => None
                }
            }
            _ => None
        }
    }
}


/// # As `SubjectPublicKeyInfo`
///
/// Public keys are included in X.509 certificates and certification
/// requests as `SubjectPublicKeyInfo` structures. As these contain the
/// same information as `PublicKey`, it can be decoded from and encoded to
/// such sequences.
impl PublicKey {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let (algorithm, parameters) = cons.take_sequence(
                PublicKeyFormat::with_parameters_from_constructed
            )?;
            Ok(PublicKey {
                algorithm,
                bits: BitString::take_from(cons)?.octet_bytes(),
                parameters,
            })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            match self.parameters {
                Some(ref params) => {
                    encode::Choice2::One(encode::sequence((
                        oid::DSA.encode(), params
                    )))
                }
                None => encode::Choice2::Two(self.algorithm.encode()),
            },
            BitStringContent(self.bits.as_ref()).encode(),
        ))
    }

    /// Returns a bytes values of the encoded the *subjectPublicKeyInfo*.
    pub fn to_info_bytes(&self) -> Bytes {
        self.encode_ref().to_captured(Mode::Der).into_bytes()
    }
}


//--- PartialEq and Eq

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && self.bits == other.bits
            && self.parameters() == other.parameters()
    }
}

impl Eq for PublicKey { }


//------------ BitStringContent ----------------------------------------------

/// Encodes an octet slice as a bit string without unused bits.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BitStringContent<'a>(pub(crate) &'a [u8]);

impl PrimitiveContent for BitStringContent<'_> {
    const TAG: Tag = Tag::BIT_STRING;

    fn encoded_len(&self, _: Mode) -> usize {
        self.0.len() + 1
    }

    fn write_encoded<W: io::Write>(
        &self,
        _: Mode,
        target: &mut W
    ) -> Result<(), io::Error> {
        target.write_all(&[0u8])?;
        target.write_all(self.0)
    }
}


//------------ KeyIdentifier -------------------------------------------------

/// A key identifier.
///
/// Identifiers created by this crate are the SHA-1 hash over the public
/// key’s bits. Identifiers found in certificates and signer infos are
/// taken as they are since other issuers may use other methods.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct KeyIdentifier(Bytes);

impl KeyIdentifier {
    /// Creates a new identifier from the given octets.
    pub fn from_bytes(bytes: Bytes) -> Self {
        KeyIdentifier(bytes)
    }

    /// Returns an octet slice of the key identifer’s value.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Takes an encoded key identifier from a constructed value.
    ///
    /// ```text
    /// KeyIdentifier ::= OCTET STRING
    /// ```
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        OctetString::take_from(cons).map(|octets| {
            KeyIdentifier(octets.into_bytes())
        })
    }

    /// Parses an encoded key identifer from encoded content.
    pub fn from_content<S: decode::Source>(
        content: &mut decode::Content<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        OctetString::from_content(content).map(|octets| {
            KeyIdentifier(octets.into_bytes())
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        OctetString::encode_slice(self.0.as_ref())
    }

    pub fn encode_ref_as(&self, tag: Tag) -> impl encode::Values + '_ {
        OctetString::encode_slice_as(self.0.as_ref(), tag)
    }
}


//--- AsRef

impl AsRef<[u8]> for KeyIdentifier {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}


//--- Display and Debug

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::colon_display(self.as_slice()))
    }
}

impl fmt::Debug for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyIdentifier({})", self)
    }
}


//------------ SignatureVerificationError ------------------------------------

/// An error happened while verifying a signature.
///
/// No further information is provided. This is on purpose.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureVerificationError(());

impl Default for SignatureVerificationError {
    fn default() -> Self {
        SignatureVerificationError(())
    }
}

impl From<Unspecified> for SignatureVerificationError {
    fn from(_: Unspecified) -> Self {
        SignatureVerificationError(())
    }
}

impl fmt::Display for SignatureVerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("signature verification failed")
    }
}

impl error::Error for SignatureVerificationError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn info_round_trip() {
        let key = PublicKey::new(
            PublicKeyFormat::EcdsaP256,
            Bytes::from_static(&[4u8; 65])
        );
        let decoded = PublicKey::decode(key.to_info_bytes()).unwrap();
        assert_eq!(key, decoded);

        let key = PublicKey::new(
            PublicKeyFormat::Rsa, Bytes::from_static(b"\x30\x03\x02\x01\x03")
        );
        let decoded = PublicKey::decode(key.to_info_bytes()).unwrap();
        assert_eq!(key, decoded);
        assert_eq!(key.key_identifier().as_slice().len(), 20);
    }

    #[test]
    fn mismatched_algorithm_fails() {
        let key = PublicKey::new(
            PublicKeyFormat::Dsa, Bytes::from_static(b"\x02\x01\x03")
        );
        let sig = Signature::new(
            SignatureAlgorithm::Dsa(DigestAlgorithm::Sha256),
            Bytes::from_static(b"foo")
        );
        assert!(key.verify(b"bar", &sig).is_err());

        let key = PublicKey::new(
            PublicKeyFormat::EcdsaP256, Bytes::from_static(&[4u8; 65])
        );
        let sig = Signature::new(
            SignatureAlgorithm::RsaPkcs1(DigestAlgorithm::Sha256),
            Bytes::from_static(b"foo")
        );
        assert!(key.verify(b"bar", &sig).is_err());
    }
}
