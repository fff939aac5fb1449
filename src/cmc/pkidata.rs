//! The content of a full CMC request.
//!
//! The content of the signed data of a CMC request is a `PKIData` value as
//! defined in section 3.2 of [RFC 5272]. It carries a sequence of controls
//! and a sequence of certificate requests. A request with certificate
//! requests asks for enrollment. A request without them asks for the
//! revocation of the certificates named by its revocation request controls.
//!
//! [RFC 5272]: https://tools.ietf.org/html/rfc5272

use std::fmt;
use std::convert::Infallible;
use bcder::{decode, encode};
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::DecodeError;
use bcder::encode::PrimitiveContent;
use bytes::Bytes;
use crate::oid;
use crate::crmf::CertReqMsg;
use crate::csr::CertificationRequest;
use crate::x509::{Name, Serial, Time};


//------------ PkiData -------------------------------------------------------

/// The content of a full CMC request.
///
/// ```txt
/// PKIData ::= SEQUENCE {
///     controlSequence    SEQUENCE SIZE(0..MAX) OF TaggedAttribute,
///     reqSequence        SEQUENCE SIZE(0..MAX) OF TaggedRequest,
///     cmsSequence        SEQUENCE SIZE(0..MAX) OF TaggedContentInfo,
///     otherMsgSequence   SEQUENCE SIZE(0..MAX) OF OtherMsg }
/// ```
///
/// The CMS and other message sequences are kept in their encoded form.
/// The values of all revocation request controls are decoded right away so
/// that a malformed revocation request fails decoding of the whole value.
#[derive(Clone, Debug)]
pub struct PkiData {
    /// The encoded value as it was decoded.
    encoded: Bytes,

    controls: Vec<TaggedAttribute>,
    requests: Vec<TaggedRequest>,

    /// The revocation requests of all revocation request controls in order.
    revocations: Vec<RevokeRequest>,

    cms_sequence: Captured,
    other_msg_sequence: Captured,
}

/// # Data Access
///
impl PkiData {
    /// Returns the control attributes.
    pub fn controls(&self) -> &[TaggedAttribute] {
        &self.controls
    }

    /// Returns the certificate requests.
    pub fn requests(&self) -> &[TaggedRequest] {
        &self.requests
    }

    /// Returns all revocation requests in the order they appear in.
    ///
    /// Revocation requests from all `id-cmc-revokeRequest` controls are
    /// included.
    pub fn revocations(&self) -> &[RevokeRequest] {
        &self.revocations
    }

    /// Returns whether this is a request for revocation.
    ///
    /// This is the case if there are no certificate requests.
    pub fn is_revocation(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns the content of the CMS sequence.
    pub fn cms_sequence(&self) -> &Captured {
        &self.cms_sequence
    }

    /// Returns the content of the other message sequence.
    pub fn other_msg_sequence(&self) -> &Captured {
        &self.other_msg_sequence
    }

    /// Returns the encoded value.
    pub fn as_slice(&self) -> &[u8] {
        self.encoded.as_ref()
    }
}

/// # Decoding
///
impl PkiData {
    /// Decodes a value.
    ///
    /// BER encoding is accepted.
    pub fn decode(encoded: Bytes) -> Result<Self, DecodeError<Infallible>> {
        Mode::Ber.decode(encoded.clone(), |cons| {
            cons.take_sequence(|cons| Self::from_constructed(cons, encoded))
        })
    }

    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        encoded: Bytes,
    ) -> Result<Self, DecodeError<S::Error>> {
        let controls = cons.take_sequence(|cons| {
            let mut res = Vec::new();
            while let Some(attr) = TaggedAttribute::take_opt_from(cons)? {
                res.push(attr)
            }
            Ok(res)
        })?;
        let requests = cons.take_sequence(|cons| {
            let mut res = Vec::new();
            while let Some(req) = TaggedRequest::take_opt_from(cons)? {
                res.push(req)
            }
            Ok(res)
        })?;
        let cms_sequence = cons.take_sequence(|cons| {
            cons.capture(|cons| cons.skip_all())
        })?;
        let other_msg_sequence = cons.take_sequence(|cons| {
            cons.capture(|cons| cons.skip_all())
        })?;

        let mut revocations = Vec::new();
        for attr in &controls {
            if attr.attr_type() != &oid::CMC_REVOKE_REQUEST {
                continue
            }
            let decoded = attr.values().clone().decode(|cons| {
                let mut res = Vec::new();
                while let Some(req) = RevokeRequest::take_opt_from(cons)? {
                    res.push(req)
                }
                Ok(res)
            }).map_err(|_| {
                cons.content_err("invalid revocation request")
            })?;
            revocations.extend(decoded);
        }

        Ok(PkiData {
            encoded, controls, requests, revocations,
            cms_sequence, other_msg_sequence
        })
    }
}


//------------ BodyPartId ----------------------------------------------------

/// The identifier of a part of a CMC message.
///
/// ```txt
/// BodyPartID ::= INTEGER(0..4294967295)
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BodyPartId(u32);

impl BodyPartId {
    pub fn into_u32(self) -> u32 {
        self.0
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::INTEGER, |prim| {
            prim.to_u32().map(BodyPartId)
        })
    }

    pub fn encode(self) -> impl encode::Values {
        self.0.encode()
    }
}

impl From<u32> for BodyPartId {
    fn from(id: u32) -> Self {
        BodyPartId(id)
    }
}

impl fmt::Display for BodyPartId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}


//------------ TaggedAttribute -----------------------------------------------

/// A control attribute.
///
/// ```txt
/// TaggedAttribute ::= SEQUENCE {
///     bodyPartID         BodyPartID,
///     attrType           OBJECT IDENTIFIER,
///     attrValues         SET OF AttributeValue }
/// ```
#[derive(Clone, Debug)]
pub struct TaggedAttribute {
    body_part_id: BodyPartId,
    attr_type: Oid<Bytes>,

    /// The content of the values set.
    values: Captured,
}

impl TaggedAttribute {
    pub fn new(
        body_part_id: BodyPartId, attr_type: Oid<Bytes>, values: Captured
    ) -> Self {
        TaggedAttribute { body_part_id, attr_type, values }
    }

    pub fn body_part_id(&self) -> BodyPartId {
        self.body_part_id
    }

    pub fn attr_type(&self) -> &Oid<Bytes> {
        &self.attr_type
    }

    /// Returns the encoded content of the set of values.
    pub fn values(&self) -> &Captured {
        &self.values
    }

    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            Ok(TaggedAttribute {
                body_part_id: BodyPartId::take_from(cons)?,
                attr_type: Oid::take_from(cons)?,
                values: cons.take_set(|cons| {
                    cons.capture(|cons| cons.skip_all())
                })?,
            })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            self.body_part_id.encode(),
            self.attr_type.encode_ref(),
            encode::set(&self.values),
        ))
    }
}


//------------ TaggedRequest -------------------------------------------------

/// A certificate request inside a CMC message.
///
/// ```txt
/// TaggedRequest ::= CHOICE {
///     tcr               [0] TaggedCertificationRequest,
///     crm               [1] CertReqMsg,
///     orm               [2] SEQUENCE {
///         bodyPartID            BodyPartID,
///         requestMessageType    OBJECT IDENTIFIER,
///         requestMessageValue   ANY DEFINED BY requestMessageType } }
///
/// TaggedCertificationRequest ::= SEQUENCE {
///     bodyPartID            BodyPartID,
///     certificationRequest  CertificationRequest }
/// ```
///
/// The module uses implicit tagging. Other request messages are not
/// supported and are rejected when decoding.
#[derive(Clone, Debug)]
pub enum TaggedRequest {
    /// A PKCS #10 certification request.
    Pkcs10 {
        body_part_id: BodyPartId,
        request: CertificationRequest,
    },

    /// A CRMF certificate request message.
    Crmf(CertReqMsg),
}

impl TaggedRequest {
    /// Returns the identifier the requester assigned to the request.
    ///
    /// This is the body part ID of a PKCS #10 request and the certificate
    /// request ID of a CRMF request.
    pub fn correlation_id(&self) -> u32 {
        match *self {
            TaggedRequest::Pkcs10 { body_part_id, .. } => {
                body_part_id.into_u32()
            }
            TaggedRequest::Crmf(ref msg) => msg.cert_req_id()
        }
    }

    /// Returns the requested subject if there is one.
    pub fn subject(&self) -> Option<&Name> {
        match *self {
            TaggedRequest::Pkcs10 { ref request, .. } => {
                Some(request.subject())
            }
            TaggedRequest::Crmf(ref msg) => msg.template().subject()
        }
    }

    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_value(|tag, content| {
            if tag == Tag::CTX_0 {
                let cons = content.as_constructed()?;
                Ok(TaggedRequest::Pkcs10 {
                    body_part_id: BodyPartId::take_from(cons)?,
                    request: CertificationRequest::take_from(cons)?,
                })
            }
            else if tag == Tag::CTX_1 {
                CertReqMsg::from_constructed(
                    content.as_constructed()?
                ).map(TaggedRequest::Crmf)
            }
            else if tag == Tag::CTX_2 {
                Err(content.content_err("unsupported other request message"))
            }
            else {
                Err(content.content_err("invalid tagged request"))
            }
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        match *self {
            TaggedRequest::Pkcs10 { body_part_id, ref request } => {
                encode::Choice2::One(
                    encode::sequence_as(Tag::CTX_0, (
                        body_part_id.encode(),
                        request.encode_ref(),
                    ))
                )
            }
            TaggedRequest::Crmf(ref msg) => {
                encode::Choice2::Two(msg.encode_ref_as(Tag::CTX_1))
            }
        }
    }
}


//------------ RevokeRequest -------------------------------------------------

/// A request to revoke a certificate.
///
/// ```txt
/// RevokeRequest ::= SEQUENCE {
///     issuerName            Name,
///     serialNumber          INTEGER,
///     reason                CRLReason,
///     invalidityDate        GeneralizedTime OPTIONAL,
///     passphrase            OCTET STRING OPTIONAL,
///     comment               UTF8String OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevokeRequest {
    issuer: Name,
    serial: Serial,
    reason: RevocationReason,
    invalidity_date: Option<Time>,
    passphrase: Option<Bytes>,
    comment: Option<String>,
}

impl RevokeRequest {
    pub fn new(
        issuer: Name, serial: Serial, reason: RevocationReason
    ) -> Self {
        RevokeRequest {
            issuer, serial, reason,
            invalidity_date: None,
            passphrase: None,
            comment: None,
        }
    }

    /// The issuer of the certificate to revoke.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// The serial number of the certificate to revoke.
    pub fn serial(&self) -> &Serial {
        &self.serial
    }

    pub fn reason(&self) -> RevocationReason {
        self.reason
    }

    pub fn invalidity_date(&self) -> Option<Time> {
        self.invalidity_date
    }

    pub fn set_invalidity_date(&mut self, date: Option<Time>) {
        self.invalidity_date = date
    }

    /// The shared secret authorizing the revocation.
    pub fn passphrase(&self) -> Option<&Bytes> {
        self.passphrase.as_ref()
    }

    pub fn set_passphrase(&mut self, passphrase: Option<Bytes>) {
        self.passphrase = passphrase
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment
    }

    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let issuer = Name::take_from(cons)?;
            let serial = Serial::take_from(cons)?;
            let reason = RevocationReason::take_from(cons)?;
            let invalidity_date = Time::take_opt_generalized(cons)?;
            let passphrase = OctetString::take_opt_from(cons)?.map(|s| {
                s.into_bytes()
            });
            let comment = cons.take_opt_value_if(
                Tag::UTF8_STRING, |content| {
                    let bytes = content.as_primitive()?.take_all()?;
                    String::from_utf8(bytes.to_vec()).map_err(|_| {
                        content.content_err("invalid UTF8String")
                    })
                }
            )?;
            Ok(RevokeRequest {
                issuer, serial, reason, invalidity_date, passphrase, comment
            })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            self.issuer.encode_ref(),
            self.serial.encode_ref(),
            self.reason.encode(),
            self.invalidity_date.map(|date| date.encode_generalized_time()),
            self.passphrase.as_ref().map(|passphrase| {
                OctetString::encode_slice(passphrase.as_ref())
            }),
            self.comment.as_ref().map(|comment| {
                OctetString::encode_slice_as(
                    comment.as_bytes(), Tag::UTF8_STRING
                )
            }),
        ))
    }
}


//------------ RevocationReason ----------------------------------------------

/// The reason for revoking a certificate.
///
/// ```txt
/// CRLReason ::= ENUMERATED {
///      unspecified             (0),
///      keyCompromise           (1),
///      cACompromise            (2),
///      affiliationChanged      (3),
///      superseded              (4),
///      cessationOfOperation    (5),
///      certificateHold         (6),
///           -- value 7 is not used
///      removeFromCRL           (8),
///      privilegeWithdrawn      (9),
///      aACompromise           (10) }
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    /// Returns the reason for an encoded value if it is defined.
    pub fn from_code(code: u8) -> Option<Self> {
        use self::RevocationReason::*;

        match code {
            0 => Some(Unspecified),
            1 => Some(KeyCompromise),
            2 => Some(CaCompromise),
            3 => Some(AffiliationChanged),
            4 => Some(Superseded),
            5 => Some(CessationOfOperation),
            6 => Some(CertificateHold),
            8 => Some(RemoveFromCrl),
            9 => Some(PrivilegeWithdrawn),
            10 => Some(AaCompromise),
            _ => None
        }
    }

    /// Returns the encoded value of the reason.
    pub fn code(self) -> u8 {
        use self::RevocationReason::*;

        match self {
            Unspecified => 0,
            KeyCompromise => 1,
            CaCompromise => 2,
            AffiliationChanged => 3,
            Superseded => 4,
            CessationOfOperation => 5,
            CertificateHold => 6,
            RemoveFromCrl => 8,
            PrivilegeWithdrawn => 9,
            AaCompromise => 10,
        }
    }

    pub fn name(self) -> &'static str {
        use self::RevocationReason::*;

        match self {
            Unspecified => "unspecified",
            KeyCompromise => "keyCompromise",
            CaCompromise => "cACompromise",
            AffiliationChanged => "affiliationChanged",
            Superseded => "superseded",
            CessationOfOperation => "cessationOfOperation",
            CertificateHold => "certificateHold",
            RemoveFromCrl => "removeFromCRL",
            PrivilegeWithdrawn => "privilegeWithdrawn",
            AaCompromise => "aACompromise",
        }
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::ENUMERATED, |prim| {
            let code = prim.to_u8()?;
            Self::from_code(code).ok_or_else(|| {
                prim.content_err("invalid revocation reason")
            })
        })
    }

    pub fn encode(self) -> impl encode::Values {
        self.code().encode_as(Tag::ENUMERATED)
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use bcder::encode::Values;
    use crate::cmc::builder::PkiDataBuilder;
    use crate::crmf::CertTemplate;
    use crate::crypto::{PublicKeyFormat, Signer};
    use crate::crypto::softsigner::SoftSigner;
    use super::*;

    fn revoke(serial: u64, reason: RevocationReason) -> RevokeRequest {
        RevokeRequest::new(
            Name::from_str("CN=Test CA, O=Example").unwrap(),
            Serial::from(serial),
            reason,
        )
    }

    #[test]
    fn enrollment_requests() {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let csr = CertificationRequest::construct(
            &signer, &key, Name::from_str("CN=Jane Doe").unwrap()
        ).unwrap();
        let mut template = CertTemplate::new();
        template.set_subject(Some(Name::from_str("CN=John Doe").unwrap()));

        let mut builder = PkiDataBuilder::new();
        builder.add_pkcs10(BodyPartId::from(1), csr);
        builder.add_crmf(CertReqMsg::new(7, template));
        let data = PkiData::decode(builder.finalize()).unwrap();

        assert!(!data.is_revocation());
        assert!(data.controls().is_empty());
        assert_eq!(data.requests().len(), 2);
        assert_eq!(data.requests()[0].correlation_id(), 1);
        assert!(matches!(data.requests()[0], TaggedRequest::Pkcs10 { .. }));
        assert_eq!(
            data.requests()[0].subject().unwrap().to_string(), "CN=Jane Doe"
        );
        assert_eq!(data.requests()[1].correlation_id(), 7);
        assert!(matches!(data.requests()[1], TaggedRequest::Crmf(_)));
        assert_eq!(
            data.requests()[1].subject().unwrap().to_string(), "CN=John Doe"
        );
    }

    #[test]
    fn revocations_in_order() {
        let mut first = revoke(0x1234, RevocationReason::KeyCompromise);
        first.set_comment(Some("lost laptop".into()));
        first.set_passphrase(Some(Bytes::from_static(b"secret")));
        first.set_invalidity_date(Time::utc(2024, 3, 1, 12, 0, 0));

        let mut builder = PkiDataBuilder::new();
        builder.add_revoke_requests(
            BodyPartId::from(1),
            &[first.clone(), revoke(2, RevocationReason::Superseded)]
        );
        builder.add_revoke_requests(
            BodyPartId::from(2), &[revoke(3, RevocationReason::Unspecified)]
        );
        let data = PkiData::decode(builder.finalize()).unwrap();

        assert!(data.is_revocation());
        assert_eq!(data.controls().len(), 2);
        assert_eq!(data.revocations().len(), 3);
        assert_eq!(data.revocations()[0], first);
        assert_eq!(data.revocations()[0].comment(), Some("lost laptop"));
        assert_eq!(data.revocations()[1].serial(), &Serial::from(2));
        assert_eq!(
            data.revocations()[1].reason(), RevocationReason::Superseded
        );
        assert_eq!(data.revocations()[2].serial(), &Serial::from(3));
    }

    #[test]
    fn other_controls_are_kept() {
        let mut builder = PkiDataBuilder::new();
        builder.add_control(
            BodyPartId::from(5),
            Oid(Bytes::from_static(oid::CMC_IDENTIFICATION.0)),
            Captured::from_values(Mode::Der, OctetString::encode_slice_as(
                b"jdoe", Tag::UTF8_STRING
            ))
        );
        let data = PkiData::decode(builder.finalize()).unwrap();
        assert_eq!(data.controls().len(), 1);
        assert_eq!(data.controls()[0].body_part_id(), BodyPartId::from(5));
        assert_eq!(
            data.controls()[0].attr_type(), &oid::CMC_IDENTIFICATION
        );
        assert!(data.revocations().is_empty());
        assert!(data.is_revocation());
    }

    #[test]
    fn reject_other_request_message() {
        let encoded = encode::sequence((
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(
                encode::sequence_as(Tag::CTX_2, (
                    3u32.encode(),
                    oid::DATA.encode_ref(),
                    ().encode(),
                ))
            ),
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(Captured::empty(Mode::Der)),
        )).to_captured(Mode::Der).into_bytes();
        assert!(PkiData::decode(encoded).is_err());
    }

    #[test]
    fn reject_bad_revocation_reason() {
        let encoded = encode::sequence((
            encode::sequence(
                encode::sequence((
                    1u32.encode(),
                    oid::CMC_REVOKE_REQUEST.encode_ref(),
                    encode::set(
                        encode::sequence((
                            Name::from_str("CN=Test CA").unwrap().encode_ref(),
                            12u32.encode(),
                            7u8.encode_as(Tag::ENUMERATED),
                        ))
                    ),
                ))
            ),
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(Captured::empty(Mode::Der)),
        )).to_captured(Mode::Der).into_bytes();
        assert!(PkiData::decode(encoded).is_err());
    }

    #[test]
    fn reject_missing_sequence() {
        let encoded = encode::sequence((
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(Captured::empty(Mode::Der)),
        )).to_captured(Mode::Der).into_bytes();
        assert!(PkiData::decode(encoded).is_err());
    }
}
