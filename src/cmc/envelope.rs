//! The signed envelope of a CMC request.
//!
//! A full CMC request is a CMS signed data structure as defined in
//! [RFC 5652] with the `PKIData` as its encapsulated content. See section
//! 3.2 of [RFC 5272] for the details.
//!
//! [RFC 5272]: https://tools.ietf.org/html/rfc5272
//! [RFC 5652]: https://tools.ietf.org/html/rfc5652

use std::{error, fmt};
use std::borrow::Cow;
use std::convert::Infallible;
use bcder::{decode, encode};
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{ContentError, DecodeError, IntoSource, Source};
use bcder::encode::PrimitiveContent;
use bytes::Bytes;
use crate::oid;
use crate::cert::Cert;
use crate::crypto::{
    CryptoToken, Digest, DigestAlgorithm, KeyIdentifier, PublicKey,
    Signature, SignatureAlgorithm, SignatureVerificationError,
};
use crate::util::base64;
use crate::x509::{skip_content, Name, Serial, Time};
use super::pkidata::PkiData;


//------------ CmcEnvelope ---------------------------------------------------

/// A decoded full CMC request.
///
/// ```txt
/// ContentInfo ::= SEQUENCE {
///     contentType        ContentType,
///     content            [0] EXPLICIT ANY DEFINED BY contentType }
///
/// SignedData ::= SEQUENCE {
///     version            CMSVersion,
///     digestAlgorithms   DigestAlgorithmIdentifiers,
///     encapContentInfo   EncapsulatedContentInfo,
///     certificates       [0] IMPLICIT CertificateSet OPTIONAL,
///     crls               [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///     signerInfos        SignerInfos }
///
/// EncapsulatedContentInfo ::= SEQUENCE {
///     eContentType       ContentType,
///     eContent           [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
///
/// The content type must be signed data and the encapsulated content must
/// be present and of type `id-cct-PKIData`. The encapsulated content is
/// decoded, too. Revocation information is ignored. Certificate choices
/// other than plain certificates are skipped.
///
/// Agents are not required to use DER, so BER is accepted throughout.
/// Decoding only checks the structure. Signatures are verified separately.
#[derive(Clone, Debug)]
pub struct CmcEnvelope {
    //--- From SignedData
    //
    digest_algorithms: Vec<DigestAlgorithm>,
    content_type: Oid<Bytes>,
    content: OctetString,
    certificates: Vec<Cert>,
    signer_infos: Vec<SignerInfo>,

    //--- From the content
    //
    pki_data: PkiData,
}

/// # Data Access
///
impl CmcEnvelope {
    /// Returns the declared digest algorithms in the order they appear in.
    pub fn digest_algorithms(&self) -> &[DigestAlgorithm] {
        &self.digest_algorithms
    }

    /// Returns the type of the encapsulated content.
    ///
    /// This is always `id-cct-PKIData`.
    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    /// Returns the encapsulated content.
    pub fn content(&self) -> &OctetString {
        &self.content
    }

    /// Returns the embedded certificates.
    pub fn certificates(&self) -> &[Cert] {
        &self.certificates
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Returns the decoded encapsulated content.
    pub fn pki_data(&self) -> &PkiData {
        &self.pki_data
    }

    /// Returns the embedded certificate identified by `sid`, if present.
    pub fn find_certificate(&self, sid: &SignerIdentifier) -> Option<&Cert> {
        self.certificates.iter().find(|cert| sid.matches(cert))
    }

    /// Calculates the digest of the encapsulated content.
    pub fn content_digest(&self, algorithm: DigestAlgorithm) -> Digest {
        let mut context = algorithm.start();
        self.content.iter().for_each(|x| context.update(x));
        context.finish()
    }
}

/// # Decoding
///
impl CmcEnvelope {
    /// Decodes a Base 64 encoded request.
    ///
    /// The request may be wrapped in PEM armour and line-wrapped.
    pub fn decode_blob(blob: &str) -> Result<Self, BlobError> {
        let der = base64::Cmc.decode_armored(blob)?;
        Self::decode(Bytes::from(der)).map_err(Into::into)
    }

    /// Decodes a request from its BER encoding.
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Ber.decode(source.into_source(), Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| { // ContentInfo
            let content_type = Oid::take_from(cons)?;
            if content_type != oid::SIGNED_DATA {
                return Err(cons.content_err(
                    "content type is not signed data"
                ))
            }
            let res = cons.take_opt_constructed_if(
                Tag::CTX_0, Self::take_signed_data
            )?;
            match res {
                Some(res) => Ok(res),
                None => Err(cons.content_err("missing signed data content"))
            }
        })
    }

    fn take_signed_data<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| { // SignedData
            cons.take_primitive_if(Tag::INTEGER, |prim| prim.to_u8())?;
            let digest_algorithms = DigestAlgorithm::take_set_from(cons)?;
            let (content_type, content) = {
                cons.take_sequence(|cons| { // encapContentInfo
                    Ok((
                        Oid::take_from(cons)?,
                        cons.take_opt_constructed_if(
                            Tag::CTX_0,
                            OctetString::take_from
                        )?
                    ))
                })?
            };
            if content_type != oid::CT_PKI_DATA {
                return Err(cons.content_err(
                    "encapsulated content is not PKIData"
                ))
            }
            let content = match content {
                Some(content) => content,
                None => {
                    return Err(cons.content_err(
                        "missing encapsulated content"
                    ))
                }
            };
            let certificates = cons.take_opt_constructed_if(
                Tag::CTX_0, |cons| {
                    let mut res = Vec::new();
                    loop {
                        if let Some(cert) = Cert::take_opt_from(cons)? {
                            res.push(cert);
                            continue
                        }
                        // Some other certificate choice.
                        if cons.take_opt_value(|_, content| {
                            skip_content(content)
                        })?.is_none() {
                            break
                        }
                    }
                    Ok(res)
                }
            )?.unwrap_or_default();
            cons.take_opt_constructed_if(Tag::CTX_1, |cons| { // crls
                cons.skip_all()
            })?;
            let signer_infos = cons.take_set(|cons| {
                let mut res = Vec::new();
                while let Some(info) = SignerInfo::take_opt_from(cons)? {
                    res.push(info)
                }
                Ok(res)
            })?;
            let pki_data = PkiData::decode(
                content.to_bytes()
            ).map_err(|err| cons.content_err(InvalidPkiData::new(err)))?;
            Ok(CmcEnvelope {
                digest_algorithms,
                content_type,
                content,
                certificates,
                signer_infos,
                pki_data,
            })
        })
    }
}


//------------ SignerInfo ----------------------------------------------------

/// The information about a single signer of the request.
///
/// ```txt
/// SignerInfo ::= SEQUENCE {
///     version              CMSVersion,
///     sid                  SignerIdentifier,
///     digestAlgorithm      DigestAlgorithmIdentifier,
///     signedAttrs          [0] IMPLICIT SignedAttributes OPTIONAL,
///     signatureAlgorithm   SignatureAlgorithmIdentifier,
///     signature            SignatureValue,
///     unsignedAttrs        [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct SignerInfo {
    sid: SignerIdentifier,
    digest_algorithm: DigestAlgorithm,
    signed_attrs: Option<SignedAttrs>,
    signature: Signature,
}

impl SignerInfo {
    pub fn new(
        sid: SignerIdentifier,
        digest_algorithm: DigestAlgorithm,
        signed_attrs: Option<SignedAttrs>,
        signature: Signature,
    ) -> Self {
        SignerInfo { sid, digest_algorithm, signed_attrs, signature }
    }

    pub fn sid(&self) -> &SignerIdentifier {
        &self.sid
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn signed_attrs(&self) -> Option<&SignedAttrs> {
        self.signed_attrs.as_ref()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the message the signature was created over.
    ///
    /// This is the encoded signed attributes if there are any or the
    /// `content` otherwise.
    pub fn signed_message<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        match self.signed_attrs {
            Some(ref attrs) => Cow::Owned(attrs.encode_verify()),
            None => Cow::Borrowed(content)
        }
    }

    /// Checks the signed attributes against the content.
    ///
    /// If there are signed attributes, the message digest attribute must
    /// be equal to `digest` and the content type attribute must be equal
    /// to `content_type`.
    pub fn check_signed_attrs(
        &self, content_type: &Oid<Bytes>, digest: &[u8]
    ) -> Result<(), VerificationError> {
        let attrs = match self.signed_attrs {
            Some(ref attrs) => attrs,
            None => return Ok(())
        };
        if attrs.message_digest().as_ref() != digest {
            return Err(VerificationError::new(
                "message digest mismatch in signer info"
            ))
        }
        if attrs.content_type() != content_type {
            return Err(VerificationError::new(
                "content type mismatch in signer info"
            ))
        }
        Ok(())
    }

    /// Verifies the signer info with the given key.
    ///
    /// The `digest` is the digest of `content` made with the signer info’s
    /// digest algorithm. The signature itself is verified via `token`.
    pub fn verify(
        &self,
        content_type: &Oid<Bytes>,
        content: &[u8],
        digest: &[u8],
        key: &PublicKey,
        token: &dyn CryptoToken,
    ) -> Result<(), VerificationError> {
        self.check_signed_attrs(content_type, digest)?;
        token.verify(
            key, &self.signed_message(content), &self.signature
        ).map_err(Into::into)
    }

    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            cons.take_primitive_if(Tag::INTEGER, |prim| prim.to_u8())?;
            let sid = SignerIdentifier::take_from(cons)?;
            let digest_algorithm = DigestAlgorithm::take_from(cons)?;
            let signed_attrs = SignedAttrs::take_opt_from(cons)?;
            let signature = Signature::new(
                SignatureAlgorithm::cms_take_from(cons, digest_algorithm)?,
                OctetString::take_from(cons)?.into_bytes()
            );
            cons.take_opt_constructed_if(Tag::CTX_1, |cons| { // unsignedAttrs
                cons.skip_all()
            })?;
            Ok(SignerInfo { sid, digest_algorithm, signed_attrs, signature })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            self.sid.version().encode(),
            self.sid.encode_ref(),
            self.digest_algorithm.encode(),
            self.signed_attrs.as_ref().map(|attrs| attrs.encode_ref()),
            self.signature.algorithm().cms_encode(),
            OctetString::encode_slice(self.signature.value().as_ref()),
        ))
    }
}


//------------ SignerIdentifier ----------------------------------------------

/// The identifier of the certificate of a signer.
///
/// ```txt
/// SignerIdentifier ::= CHOICE {
///     issuerAndSerialNumber   IssuerAndSerialNumber,
///     subjectKeyIdentifier    [0] SubjectKeyIdentifier }
///
/// IssuerAndSerialNumber ::= SEQUENCE {
///     issuer                  Name,
///     serialNumber            CertificateSerialNumber }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerIdentifier {
    IssuerAndSerial {
        issuer: Name,
        serial: Serial,
    },
    KeyIdentifier(KeyIdentifier),
}

impl SignerIdentifier {
    /// Returns whether the identifier refers to the given certificate.
    pub fn matches(&self, cert: &Cert) -> bool {
        match *self {
            SignerIdentifier::IssuerAndSerial { ref issuer, ref serial } => {
                cert.has_issuer_and_serial(issuer, serial)
            }
            SignerIdentifier::KeyIdentifier(ref key_id) => {
                cert.has_key_identifier(key_id)
            }
        }
    }

    /// Returns the signer info version that goes with the identifier.
    fn version(&self) -> u8 {
        match *self {
            SignerIdentifier::IssuerAndSerial { .. } => 1,
            SignerIdentifier::KeyIdentifier(_) => 3,
        }
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_value(|tag, content| {
            if tag == Tag::SEQUENCE {
                let cons = content.as_constructed()?;
                Ok(SignerIdentifier::IssuerAndSerial {
                    issuer: Name::take_from(cons)?,
                    serial: Serial::take_from(cons)?,
                })
            }
            else if tag == Tag::CTX_0 {
                KeyIdentifier::from_content(content).map(
                    SignerIdentifier::KeyIdentifier
                )
            }
            else {
                Err(content.content_err("invalid signer identifier"))
            }
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        match *self {
            SignerIdentifier::IssuerAndSerial { ref issuer, ref serial } => {
                encode::Choice2::One(encode::sequence((
                    issuer.encode_ref(),
                    serial.encode_ref(),
                )))
            }
            SignerIdentifier::KeyIdentifier(ref key_id) => {
                encode::Choice2::Two(key_id.encode_ref_as(Tag::CTX_0))
            }
        }
    }
}

impl fmt::Display for SignerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SignerIdentifier::IssuerAndSerial { ref issuer, ref serial } => {
                write!(f, "issuer={};serial={}", issuer, serial)
            }
            SignerIdentifier::KeyIdentifier(ref key_id) => {
                write!(f, "ski={}", key_id)
            }
        }
    }
}


//------------ SignedAttrs ---------------------------------------------------

/// The signed attributes of a signer info.
///
/// These attributes, in their DER encoded form, are what the signature is
/// calculated over. The encoding uses the tag for SET OF, not \[0\] as it
/// is found in the actual data. Requests created by agents have their
/// signed attributes in DER even if the rest is BER, so the captured
/// content is used as is.
///
/// Only the content type, message digest, and signing time attributes are
/// interpreted. The first two are required. All other attributes are
/// ignored.
#[derive(Clone, Debug)]
pub struct SignedAttrs {
    /// The content of the attributes set.
    raw: Captured,

    content_type: Oid<Bytes>,
    message_digest: MessageDigest,
    signing_time: Option<Time>,
}

impl SignedAttrs {
    /// Creates signed attributes for the given content type and digest.
    pub fn new(
        content_type: &Oid<impl AsRef<[u8]>>,
        digest: MessageDigest,
        signing_time: Option<Time>,
    ) -> Self {
        let mut attrs = vec![
            Captured::from_values(Mode::Der, encode::sequence((
                oid::CONTENT_TYPE.encode(),
                encode::set(content_type.encode_ref()),
            ))),
            Captured::from_values(Mode::Der, encode::sequence((
                oid::MESSAGE_DIGEST.encode(),
                encode::set(digest.encode_ref()),
            ))),
        ];
        if let Some(time) = signing_time {
            attrs.push(Captured::from_values(Mode::Der, encode::sequence((
                oid::SIGNING_TIME.encode(),
                encode::set(time.encode_varied()),
            ))));
        }

        // In DER, the values of a SET OF are ordered by their encoding.
        attrs.sort_by(|left, right| left.as_slice().cmp(right.as_slice()));
        let mut raw = Captured::builder(Mode::Der);
        for attr in &attrs {
            raw.extend(attr)
        }

        SignedAttrs {
            raw: raw.freeze(),
            content_type: Oid(Bytes::copy_from_slice(
                content_type.0.as_ref()
            )),
            message_digest: digest,
            signing_time,
        }
    }

    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    pub fn message_digest(&self) -> &MessageDigest {
        &self.message_digest
    }

    pub fn signing_time(&self) -> Option<Time> {
        self.signing_time
    }

    /// Takes optional signed attributes from the beginning of a value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        let mut message_digest = None;
        let mut content_type = None;
        let mut signing_time = None;
        let raw = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
            cons.capture(|cons| {
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    let oid = Oid::take_from(cons)?;
                    if oid == oid::CONTENT_TYPE {
                        Self::take_content_type(cons, &mut content_type)
                    }
                    else if oid == oid::MESSAGE_DIGEST {
                        Self::take_message_digest(cons, &mut message_digest)
                    }
                    else if oid == oid::SIGNING_TIME {
                        Self::take_signing_time(cons, &mut signing_time)
                    }
                    else {
                        cons.skip_all()
                    }
                })? { }
                Ok(())
            })
        })?;
        let raw = match raw {
            Some(raw) => raw,
            None => return Ok(None)
        };
        let Some(message_digest) = message_digest else {
            return Err(cons.content_err(
                "missing message digest in signed attributes"
            ))
        };
        let Some(content_type) = content_type else {
            return Err(cons.content_err(
                "missing content type in signed attributes"
            ))
        };
        Ok(Some(SignedAttrs {
            raw,
            content_type,
            message_digest: message_digest.into(),
            signing_time,
        }))
    }

    /// Parses the Content Type attribute.
    ///
    /// This attribute is defined in section 11.1. of RFC 5652. The attribute
    /// value is a SET of exactly one OBJECT IDENTIFIER.
    fn take_content_type<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        content_type: &mut Option<Oid<Bytes>>
    ) -> Result<(), DecodeError<S::Error>> {
        if content_type.is_some() {
            Err(cons.content_err("duplicate Content Type attribute"))
        }
        else {
            *content_type = Some(
                cons.take_set(|cons| Oid::take_from(cons))?
            );
            Ok(())
        }
    }

    fn take_message_digest<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        message_digest: &mut Option<OctetString>
    ) -> Result<(), DecodeError<S::Error>> {
        if message_digest.is_some() {
            Err(cons.content_err("duplicate Message Digest attribute"))
        }
        else {
            *message_digest = Some(
                cons.take_set(|cons| OctetString::take_from(cons))?
            );
            Ok(())
        }
    }

    fn take_signing_time<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        signing_time: &mut Option<Time>
    ) -> Result<(), DecodeError<S::Error>> {
        if signing_time.is_some() {
            Err(cons.content_err("duplicate Signing Time attribute"))
        }
        else {
            *signing_time = Some(
                cons.take_set(Time::take_from)?
            );
            Ok(())
        }
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence_as(Tag::CTX_0, &self.raw)
    }

    /// Creates the message for verification.
    pub fn encode_verify(&self) -> Vec<u8> {
        let len = self.raw.len();
        let mut res = Vec::with_capacity(len + 10);
        res.push(0x31); // SET
        if len < 0x80 {
            res.push(len as u8)
        }
        else {
            let octets = len.to_be_bytes();
            let skip = octets.iter().take_while(|&&x| x == 0).count();
            res.push(0x80 | (octets.len() - skip) as u8);
            res.extend_from_slice(&octets[skip..]);
        }
        res.extend_from_slice(self.raw.as_slice());
        res
    }
}

impl AsRef<[u8]> for SignedAttrs {
    fn as_ref(&self) -> &[u8] {
        self.raw.as_ref()
    }
}


//------------ MessageDigest -------------------------------------------------

/// The value of the message digest attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageDigest(Bytes);

impl MessageDigest {
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        OctetString::encode_slice(self.0.as_ref())
    }
}

impl From<OctetString> for MessageDigest {
    fn from(src: OctetString) -> Self {
        MessageDigest(src.into_bytes())
    }
}

impl From<Digest> for MessageDigest {
    fn from(digest: Digest) -> Self {
        MessageDigest(Bytes::copy_from_slice(digest.as_ref()))
    }
}

impl AsRef<[u8]> for MessageDigest {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}


//============ Error Types ===================================================

//------------ VerificationError ---------------------------------------------

/// A signer info failed to verify.
#[derive(Debug)]
pub struct VerificationError {
    inner: ContentError,
}

impl VerificationError {
    pub fn new(err: impl Into<ContentError>) -> Self {
        VerificationError { inner: err.into() }
    }
}

impl From<SignatureVerificationError> for VerificationError {
    fn from(_: SignatureVerificationError) -> Self {
        VerificationError::new("signature verification failed")
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl error::Error for VerificationError { }


//------------ BlobError -----------------------------------------------------

/// A request blob could not be decoded.
#[derive(Debug)]
pub enum BlobError {
    /// The blob is not valid Base 64.
    Base64(base64::DecodeError),

    /// The decoded blob is not a valid request.
    Decode(DecodeError<Infallible>),
}

impl From<base64::DecodeError> for BlobError {
    fn from(err: base64::DecodeError) -> Self {
        BlobError::Base64(err)
    }
}

impl From<DecodeError<Infallible>> for BlobError {
    fn from(err: DecodeError<Infallible>) -> Self {
        BlobError::Decode(err)
    }
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BlobError::Base64(ref err) => {
                write!(f, "invalid Base 64 encoding: {}", err)
            }
            BlobError::Decode(ref err) => {
                write!(f, "malformed CMC request: {}", err)
            }
        }
    }
}

impl error::Error for BlobError { }


//------------ InvalidPkiData ------------------------------------------------

/// The encapsulated content failed to decode.
#[derive(Clone, Debug)]
struct InvalidPkiData {
    message: String,
}

impl InvalidPkiData {
    fn new(err: DecodeError<Infallible>) -> Self {
        InvalidPkiData { message: err.to_string() }
    }
}

impl From<InvalidPkiData> for ContentError {
    fn from(err: InvalidPkiData) -> Self {
        ContentError::from_boxed(Box::new(err))
    }
}

impl fmt::Display for InvalidPkiData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid PKIData: {}", self.message)
    }
}


//============ Tests =========================================================
