//! X.509 certificates.
//!
//! Agents sign CMC requests with keys certified by the CA. Their
//! certificates are either included in the request itself or found in the
//! CA’s certificate store. The authenticator needs only a few things from
//! them: the issuer and serial number for identifying them, the subject
//! for binding them to the TLS client certificate, and the public key for
//! verifying signatures.

use std::ops;
use bcder::{decode, encode};
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::PrimitiveContent;
use crate::oid;
use crate::crypto::{
    KeyIdentifier, PublicKey, SignatureAlgorithm, SignatureVerificationError,
    Signer, SigningError,
};
use crate::x509::{Name, SignedData, Serial, Validity, encode_extension};


//------------ Cert ----------------------------------------------------------

/// An X.509 certificate.
///
/// If a certificate is stored in a file, you can use the [`decode`] function
/// to parse the entire file. If the certificate is part of some other
/// structure, the [`take_from`] and [`from_constructed`] functions can be
/// used during parsing of that structure.
///
/// The content of the certificate is available through dereferencing to
/// [`TbsCert`].
///
/// [`decode`]: #method.decode
/// [`take_from`]: #method.take_from
/// [`from_constructed`]: #method.from_constructed
#[derive(Clone, Debug)]
pub struct Cert {
    /// The outer structure of the certificate.
    signed_data: SignedData,

    /// The actual data of the certificate.
    tbs: TbsCert,
}


/// # Decoding and Encoding
///
impl Cert {
    /// Decodes a source as a certificate.
    pub fn decode<S: IntoSource>(
        source: S,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Takes an encoded certificate from the beginning of a value.
    ///
    /// This function assumes that the certificate is encoded in the next
    /// constructed value in `cons` tagged as a sequence.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Takes an optional certificate from the beginning of a value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    /// Parses the content of a Certificate sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let signed_data = SignedData::from_constructed(cons)?;
        let tbs = signed_data.data().clone().decode(
            TbsCert::from_constructed
        ).map_err(DecodeError::convert)?;
        Ok(Self { signed_data, tbs })
    }

    /// Returns a value encoder for a reference to the certificate.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        self.signed_data.encode_ref()
    }

    /// Returns a captured encoding of the certificate.
    pub fn to_captured(&self) -> Captured {
        Captured::from_values(Mode::Der, self.encode_ref())
    }
}


/// # Verification
///
impl Cert {
    /// Verifies that the certificate was signed by the given key.
    ///
    /// Only the signature is checked. Whether the certificate is trusted
    /// is decided elsewhere.
    pub fn verify_signature(
        &self, issuer_key: &PublicKey
    ) -> Result<(), SignatureVerificationError> {
        self.signed_data.verify_signature(issuer_key)
    }

    /// Returns whether the certificate has the given issuer and serial.
    pub fn has_issuer_and_serial(
        &self, issuer: &Name, serial: &Serial
    ) -> bool {
        self.tbs.issuer == *issuer && self.tbs.serial_number == *serial
    }

    /// Returns whether the certificate has the given key identifier.
    ///
    /// If the certificate has a subject key identifier extension, its value
    /// is compared. Otherwise the identifier is compared with the SHA-1
    /// hash of the public key.
    pub fn has_key_identifier(&self, key_id: &KeyIdentifier) -> bool {
        match self.tbs.subject_key_identifier.as_ref() {
            Some(ski) => ski == key_id,
            None => {
                self.tbs.subject_public_key_info.key_identifier() == *key_id
            }
        }
    }
}


//--- Deref and AsRef

impl ops::Deref for Cert {
    type Target = TbsCert;

    fn deref(&self) -> &Self::Target {
        &self.tbs
    }
}

impl AsRef<TbsCert> for Cert {
    fn as_ref(&self) -> &TbsCert {
        &self.tbs
    }
}


//--- PartialEq and Eq

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.signed_data == other.signed_data
    }
}

impl Eq for Cert { }


//------------ TbsCert -------------------------------------------------------

/// The data of a certificate.
///
/// ```txt
/// TBSCertificate  ::=  SEQUENCE  {
///      version         [0]  EXPLICIT Version DEFAULT v1,
///      serialNumber         CertificateSerialNumber,
///      signature            AlgorithmIdentifier,
///      issuer               Name,
///      validity             Validity,
///      subject              Name,
///      subjectPublicKeyInfo SubjectPublicKeyInfo,
///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///      extensions      [3]  EXPLICIT Extensions OPTIONAL }
/// ```
///
/// Only the subject key identifier and basic constraints extensions are
/// interpreted. All other extensions are skipped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TbsCert {
    serial_number: Serial,
    signature: SignatureAlgorithm,
    issuer: Name,
    validity: Validity,
    subject: Name,
    subject_public_key_info: PublicKey,

    /// Basic Constraints.
    ///
    /// The field indicates whether the extension is present and, if so,
    /// whether the "cA" boolean is set.
    basic_ca: Option<bool>,

    /// Subject Key Identifier.
    subject_key_identifier: Option<KeyIdentifier>,
}


/// # Creation and Conversion
///
impl TbsCert {
    /// Creates the data for a new certificate.
    ///
    /// The subject key identifier is derived from the public key.
    pub fn new(
        serial_number: Serial,
        issuer: Name,
        validity: Validity,
        subject: Name,
        subject_public_key_info: PublicKey,
        signature: SignatureAlgorithm,
    ) -> Self {
        Self {
            subject_key_identifier: Some(
                subject_public_key_info.key_identifier()
            ),
            serial_number,
            signature,
            issuer,
            validity,
            subject,
            subject_public_key_info,
            basic_ca: None,
        }
    }

    /// Converts the value into a signed certificate.
    pub fn into_cert<S: Signer>(
        self,
        signer: &S,
        key: &S::KeyId,
    ) -> Result<Cert, SigningError<S::Error>> {
        let data = Captured::from_values(Mode::Der, self.encode_ref());
        let signature = signer.sign(key, self.signature, &data)?;
        Ok(Cert {
            signed_data: SignedData::new(data, signature),
            tbs: self
        })
    }
}


/// # Data Access
///
impl TbsCert {
    /// Returns the serial number of the certificate.
    pub fn serial_number(&self) -> &Serial {
        &self.serial_number
    }

    /// Returns the algorithm the issuer signed the certificate with.
    pub fn signature(&self) -> SignatureAlgorithm {
        self.signature
    }

    /// Returns a reference to the issuer.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Returns the validity.
    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// Returns a reference to the subject.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Returns a reference to the public key.
    pub fn subject_public_key_info(&self) -> &PublicKey {
        &self.subject_public_key_info
    }

    /// Returns the cA field of the basic constraints extension if present.
    pub fn basic_ca(&self) -> Option<bool> {
        self.basic_ca
    }

    /// Sets the basic constraints extension.
    pub fn set_basic_ca(&mut self, basic_ca: Option<bool>) {
        self.basic_ca = basic_ca
    }

    /// Returns a reference to the subject key identifier if present.
    pub fn subject_key_identifier(&self) -> Option<&KeyIdentifier> {
        self.subject_key_identifier.as_ref()
    }
}


/// # Decoding and Encoding
///
impl TbsCert {
    /// Parses the content of a Certificate sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            // version [0] EXPLICIT Version DEFAULT v1.
            let version = cons.take_opt_constructed_if(Tag::CTX_0, |c| {
                c.take_u8()
            })?.unwrap_or(0);
            if version > 2 {
                return Err(cons.content_err("unknown certificate version"))
            }

            let serial_number = Serial::take_from(cons)?;
            let signature = SignatureAlgorithm::x509_take_from(cons)?;
            let issuer = Name::take_from(cons)?;
            let validity = Validity::take_from(cons)?;
            let subject = Name::take_from(cons)?;
            let subject_public_key_info = PublicKey::take_from(cons)?;

            // issuerUniqueID and subjectUniqueID.
            cons.take_opt_value_if(Tag::CTX_1, |c| {
                c.as_primitive()?.skip_all()
            })?;
            cons.take_opt_value_if(Tag::CTX_2, |c| {
                c.as_primitive()?.skip_all()
            })?;

            let mut basic_ca = None;
            let mut subject_key_identifier = None;

            cons.take_opt_constructed_if(Tag::CTX_3, |c| {
                c.take_sequence(|cons| {
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        let id = Oid::take_from(cons)?;
                        let _critical = cons.take_opt_bool()?;
                        let value = OctetString::take_from(cons)?;
                        Mode::Der.decode(value, |content| {
                            if id == oid::CE_BASIC_CONSTRAINTS {
                                Self::take_basic_constraints(
                                    content, &mut basic_ca
                                )
                            }
                            else if id == oid::CE_SUBJECT_KEY_IDENTIFIER {
                                Self::take_subject_key_identifier(
                                    content, &mut subject_key_identifier
                                )
                            }
                            else {
                                content.skip_all()
                            }
                        }).map_err(DecodeError::convert)?;
                        Ok(())
                    })? { }
                    Ok(())
                })
            })?;

            Ok(Self {
                serial_number,
                signature,
                issuer,
                validity,
                subject,
                subject_public_key_info,
                basic_ca,
                subject_key_identifier,
            })
        })
    }

    /// Parses the Basic Constraints extension.
    ///
    /// ```txt
    /// BasicConstraints        ::= SEQUENCE {
    ///     cA                      BOOLEAN DEFAULT FALSE,
    ///     pathLenConstraint       INTEGER (0..MAX) OPTIONAL
    /// }
    /// ```
    fn take_basic_constraints<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        basic_ca: &mut Option<bool>,
    ) -> Result<(), DecodeError<S::Error>> {
        if basic_ca.is_some() {
            return Err(cons.content_err(
                "duplicate Basic Constraints extension"
            ))
        }
        cons.take_sequence(|cons| {
            *basic_ca = Some(cons.take_opt_bool()?.unwrap_or(false));
            cons.skip_all()
        })
    }

    /// Parses the Subject Key Identifier extension.
    ///
    /// ```txt
    /// SubjectKeyIdentifier ::= KeyIdentifier
    /// ```
    fn take_subject_key_identifier<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        subject_key_id: &mut Option<KeyIdentifier>,
    ) -> Result<(), DecodeError<S::Error>> {
        if subject_key_id.is_some() {
            return Err(cons.content_err(
                "duplicate Subject Key Identifier extension"
            ))
        }
        *subject_key_id = Some(KeyIdentifier::take_from(cons)?);
        Ok(())
    }

    /// Returns an encoder for the value.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        let has_extensions = self.basic_ca.is_some()
            || self.subject_key_identifier.is_some();
        encode::sequence((
            encode::sequence_as(Tag::CTX_0, 2.encode()), // version
            self.serial_number.encode_ref(),
            self.signature.x509_encode(),
            self.issuer.encode_ref(),
            self.validity.encode(),
            self.subject.encode_ref(),
            self.subject_public_key_info.encode_ref(),
            // no issuerUniqueID
            // no subjectUniqueID
            if has_extensions {
                Some(encode::sequence_as(Tag::CTX_3, encode::sequence((
                    // Basic Constraints
                    self.basic_ca.map(|ca| {
                        encode_extension(
                            &oid::CE_BASIC_CONSTRAINTS, true,
                            encode::sequence(
                                if ca {
                                    Some(ca.encode())
                                }
                                else {
                                    None
                                }
                            )
                        )
                    }),

                    // Subject Key Identifier
                    self.subject_key_identifier.as_ref().map(|id| {
                        encode_extension(
                            &oid::CE_SUBJECT_KEY_IDENTIFIER, false,
                            id.encode_ref(),
                        )
                    }),
                ))))
            }
            else {
                None
            }
        ))
    }
}


//============ Tests =========================================================
