//! CRMF certificate request messages.
//!
//! The Certificate Request Message Format is defined in [RFC 4211]. It is
//! the second form in which a CMC request can ask for a certificate. Unlike
//! a PKCS #10 request, the desired certificate is described by a template
//! in which every field is optional.
//!
//! [RFC 4211]: https://tools.ietf.org/html/rfc4211

use bcder::{decode, encode};
use bcder::{BitString, Captured, Mode, Tag};
use bcder::decode::DecodeError;
use bcder::encode::PrimitiveContent;
use crate::crypto::{PublicKey, PublicKeyFormat};
use crate::crypto::keys::BitStringContent;
use crate::x509::{skip_content, Name};


//------------ CertReqMsg ----------------------------------------------------

/// A single CRMF certificate request message.
///
/// ```txt
/// CertReqMsg ::= SEQUENCE {
///     certReq   CertRequest,
///     popo      ProofOfPossession  OPTIONAL,
///     regInfo   SEQUENCE SIZE(1..MAX) OF AttributeTypeAndValue OPTIONAL }
///
/// CertRequest ::= SEQUENCE {
///     certReqId     INTEGER,
///     certTemplate  CertTemplate,
///     controls      Controls OPTIONAL }
/// ```
///
/// The proof of possession and the registration info are not interpreted
/// and kept in their encoded form.
#[derive(Clone, Debug)]
pub struct CertReqMsg {
    cert_req_id: u32,
    template: CertTemplate,
    popo: Captured,
}

impl CertReqMsg {
    /// Creates a new message for a template.
    ///
    /// The message will state that the proof of possession was verified by
    /// the registration authority.
    pub fn new(cert_req_id: u32, template: CertTemplate) -> Self {
        CertReqMsg {
            cert_req_id,
            template,
            popo: Captured::from_values(
                Mode::Der, ().encode_as(Tag::CTX_0) // raVerified
            ),
        }
    }

    /// Returns the request identifier chosen by the requester.
    pub fn cert_req_id(&self) -> u32 {
        self.cert_req_id
    }

    /// Returns the certificate template.
    pub fn template(&self) -> &CertTemplate {
        &self.template
    }

    /// Takes a message from the beginning of a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the content of a message sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let (cert_req_id, template) = cons.take_sequence(|cons| {
            let cert_req_id = cons.take_primitive_if(
                Tag::INTEGER, |prim| prim.to_u32()
            )?;
            let template = CertTemplate::take_from(cons)?;
            cons.skip_all()?; // controls
            Ok((cert_req_id, template))
        })?;
        let popo = cons.capture(|cons| cons.skip_all())?;
        Ok(CertReqMsg { cert_req_id, template, popo })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        self.encode_ref_as(Tag::SEQUENCE)
    }

    /// Returns an encoder for the message using an implicit tag.
    pub fn encode_ref_as(&self, tag: Tag) -> impl encode::Values + '_ {
        encode::sequence_as(tag, (
            encode::sequence((
                self.cert_req_id.encode(),
                self.template.encode_ref(),
            )),
            &self.popo,
        ))
    }
}


//------------ CertTemplate --------------------------------------------------

/// A template describing the requested certificate.
///
/// ```txt
/// CertTemplate ::= SEQUENCE {
///     version      [0] Version               OPTIONAL,
///     serialNumber [1] INTEGER               OPTIONAL,
///     signingAlg   [2] AlgorithmIdentifier   OPTIONAL,
///     issuer       [3] Name                  OPTIONAL,
///     validity     [4] OptionalValidity      OPTIONAL,
///     subject      [5] Name                  OPTIONAL,
///     publicKey    [6] SubjectPublicKeyInfo  OPTIONAL,
///     issuerUID    [7] UniqueIdentifier      OPTIONAL,
///     subjectUID   [8] UniqueIdentifier      OPTIONAL,
///     extensions   [9] Extensions            OPTIONAL }
/// ```
///
/// The module uses implicit tagging. Since `Name` is a choice, the issuer
/// and subject are explicitly tagged nonetheless. Only the subject and the
/// public key are kept. All other fields are skipped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CertTemplate {
    subject: Option<Name>,
    public_key: Option<PublicKey>,
}

impl CertTemplate {
    /// Creates an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the requested subject if present.
    pub fn subject(&self) -> Option<&Name> {
        self.subject.as_ref()
    }

    /// Sets the requested subject.
    pub fn set_subject(&mut self, subject: Option<Name>) {
        self.subject = subject
    }

    /// Returns the requested public key if present.
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    /// Sets the requested public key.
    pub fn set_public_key(&mut self, public_key: Option<PublicKey>) {
        self.public_key = public_key
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.take_opt_value_if(Tag::CTX_0, skip_content)?;
            cons.take_opt_value_if(Tag::CTX_1, skip_content)?;
            cons.take_opt_value_if(Tag::CTX_2, skip_content)?;
            cons.take_opt_constructed_if(Tag::CTX_3, Name::take_from)?;
            cons.take_opt_value_if(Tag::CTX_4, skip_content)?;
            let subject = cons.take_opt_constructed_if(
                Tag::CTX_5, Name::take_from
            )?;
            let public_key = cons.take_opt_constructed_if(
                Tag::CTX_6, |cons| {
                    Ok(PublicKey::new(
                        PublicKeyFormat::take_from(cons)?,
                        BitString::take_from(cons)?.octet_bytes()
                    ))
                }
            )?;
            cons.take_opt_value_if(Tag::ctx(7), skip_content)?;
            cons.take_opt_value_if(Tag::ctx(8), skip_content)?;
            cons.take_opt_value_if(Tag::ctx(9), skip_content)?;
            Ok(CertTemplate { subject, public_key })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            self.subject.as_ref().map(|subject| {
                encode::sequence_as(Tag::CTX_5, subject.encode_ref())
            }),
            self.public_key.as_ref().map(|key| {
                encode::sequence_as(Tag::CTX_6, (
                    key.algorithm().encode(),
                    BitStringContent(key.bits()).encode(),
                ))
            }),
        ))
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use bcder::encode::Values;
    use bytes::Bytes;
    use crate::oid;
    use super::*;

    #[test]
    fn encode_decode() {
        let mut template = CertTemplate::new();
        template.set_subject(Some(Name::from_str("CN=Jane Doe").unwrap()));
        template.set_public_key(Some(PublicKey::new(
            PublicKeyFormat::EcdsaP256, Bytes::from_static(&[4u8; 65])
        )));
        let msg = CertReqMsg::new(17, template.clone());
        let decoded = msg.encode_ref().to_captured(Mode::Der).decode(
            CertReqMsg::take_from
        ).unwrap();
        assert_eq!(decoded.cert_req_id(), 17);
        assert_eq!(decoded.template(), &template);
    }

    #[test]
    fn skip_unused_fields() {
        let encoded = encode::sequence((
            encode::sequence((
                5u32.encode(),
                encode::sequence((
                    2u8.encode_as(Tag::CTX_0),
                    encode::sequence_as(Tag::CTX_2,
                        oid::ECDSA_WITH_SHA256.encode_ref()
                    ),
                    encode::sequence_as(Tag::CTX_5,
                        Name::from_str("CN=Jane Doe").unwrap().encode_ref()
                    ),
                    encode::sequence_as(Tag::ctx(9),
                        encode::sequence(Captured::empty(Mode::Der))
                    ),
                )),
            )),
        )).to_captured(Mode::Der);
        let decoded = encoded.decode(CertReqMsg::take_from).unwrap();
        assert_eq!(decoded.cert_req_id(), 5);
        assert_eq!(
            decoded.template().subject().unwrap().to_string(),
            "CN=Jane Doe"
        );
        assert!(decoded.template().public_key().is_none());
    }

    #[test]
    fn reject_out_of_order() {
        let encoded = encode::sequence((
            encode::sequence((
                5u32.encode(),
                encode::sequence((
                    encode::sequence_as(Tag::CTX_5,
                        Name::from_str("CN=Jane Doe").unwrap().encode_ref()
                    ),
                    2u8.encode_as(Tag::CTX_0),
                )),
            )),
        )).to_captured(Mode::Der);
        assert!(encoded.decode(CertReqMsg::take_from).is_err());
    }
}
