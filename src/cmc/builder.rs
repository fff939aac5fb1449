//! Creating CMC requests.
//!
//! The authenticator only ever decodes requests. Building them is needed
//! by agent tooling and for testing.

use bcder::encode;
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use crate::oid;
use crate::cert::Cert;
use crate::crmf::CertReqMsg;
use crate::crypto::{DigestAlgorithm, Signer, SigningError};
use crate::csr::CertificationRequest;
use crate::x509::Time;
use super::envelope::{SignedAttrs, SignerIdentifier, SignerInfo};
use super::pkidata::{
    BodyPartId, RevokeRequest, TaggedAttribute, TaggedRequest
};


//------------ PkiDataBuilder ------------------------------------------------

/// A builder for the content of a CMC request.
#[derive(Clone, Debug, Default)]
pub struct PkiDataBuilder {
    controls: Vec<TaggedAttribute>,
    requests: Vec<TaggedRequest>,
    transaction_id: Option<u64>,
    sender_nonce: Option<Bytes>,
}

impl PkiDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of the transaction ID control.
    pub fn set_transaction_id(&mut self, id: Option<u64>) {
        self.transaction_id = id
    }

    /// Sets the value of the sender nonce control.
    pub fn set_sender_nonce(&mut self, nonce: Option<Bytes>) {
        self.sender_nonce = nonce
    }

    /// Adds a control attribute.
    ///
    /// The `values` are the encoded content of the set of values.
    pub fn add_control(
        &mut self,
        body_part_id: BodyPartId,
        attr_type: Oid<Bytes>,
        values: Captured,
    ) {
        self.controls.push(
            TaggedAttribute::new(body_part_id, attr_type, values)
        )
    }

    /// Adds a revocation request control with the given requests.
    pub fn add_revoke_requests(
        &mut self,
        body_part_id: BodyPartId,
        requests: &[RevokeRequest],
    ) {
        let values = Captured::from_values(Mode::Der, encode::iter(
            requests.iter().map(|req| req.encode_ref())
        ));
        self.add_control(
            body_part_id,
            Oid(Bytes::from_static(oid::CMC_REVOKE_REQUEST.0)),
            values
        )
    }

    /// Adds a PKCS #10 certification request.
    pub fn add_pkcs10(
        &mut self,
        body_part_id: BodyPartId,
        request: CertificationRequest,
    ) {
        self.requests.push(TaggedRequest::Pkcs10 { body_part_id, request })
    }

    /// Adds a CRMF certificate request message.
    pub fn add_crmf(&mut self, msg: CertReqMsg) {
        self.requests.push(TaggedRequest::Crmf(msg))
    }

    /// Returns the DER encoded `PKIData`.
    ///
    /// The transaction ID and sender nonce controls use the body part
    /// ID 0 and precede all other controls.
    pub fn finalize(&self) -> Bytes {
        encode::sequence((
            encode::sequence((
                self.transaction_id.map(|id| {
                    encode::sequence((
                        0u32.encode(),
                        oid::CMC_TRANSACTION_ID.encode(),
                        encode::set(id.encode()),
                    ))
                }),
                self.sender_nonce.as_ref().map(|nonce| {
                    encode::sequence((
                        0u32.encode(),
                        oid::CMC_SENDER_NONCE.encode(),
                        encode::set(OctetString::encode_slice(nonce.as_ref())),
                    ))
                }),
                encode::iter(self.controls.iter().map(|attr| {
                    attr.encode_ref()
                })),
            )),
            encode::sequence(
                encode::iter(self.requests.iter().map(|req| req.encode_ref()))
            ),
            encode::sequence(Captured::empty(Mode::Der)),
            encode::sequence(Captured::empty(Mode::Der)),
        )).to_captured(Mode::Der).into_bytes()
    }
}


//------------ SignedRequestBuilder ------------------------------------------

/// A builder for signed CMC requests.
///
/// By default, the signer’s certificate is embedded and identified by its
/// issuer and serial number, and signed attributes are included.
#[derive(Clone, Debug)]
pub struct SignedRequestBuilder {
    /// The certificate of the signer.
    cert: Cert,

    /// Whether to include `cert` in the certificates set.
    embed_cert: bool,

    /// Additional certificates for the certificates set.
    extra_certs: Vec<Cert>,

    /// The encapsulated content type.
    ///
    /// Defaults to `id-cct-PKIData`.
    content_type: Oid<Bytes>,

    /// Whether the signer is identified via its key identifier.
    use_key_identifier: bool,

    /// Whether to include signed attributes.
    signed_attrs: bool,

    /// The signing time attribute if one should be included.
    signing_time: Option<Time>,

    /// Whether the digest algorithm is listed in the digest algorithms.
    declare_digest_algorithm: bool,
}

impl SignedRequestBuilder {
    pub fn new(cert: Cert) -> Self {
        SignedRequestBuilder {
            cert,
            embed_cert: true,
            extra_certs: Vec::new(),
            content_type: Oid(Bytes::from_static(oid::CT_PKI_DATA.0)),
            use_key_identifier: false,
            signed_attrs: true,
            signing_time: None,
            declare_digest_algorithm: true,
        }
    }

    pub fn set_embed_cert(&mut self, embed: bool) {
        self.embed_cert = embed
    }

    pub fn add_cert(&mut self, cert: Cert) {
        self.extra_certs.push(cert)
    }

    pub fn set_content_type(&mut self, content_type: Oid<Bytes>) {
        self.content_type = content_type
    }

    pub fn set_use_key_identifier(&mut self, use_key_id: bool) {
        self.use_key_identifier = use_key_id
    }

    pub fn set_signed_attrs(&mut self, signed_attrs: bool) {
        self.signed_attrs = signed_attrs
    }

    pub fn set_signing_time(&mut self, signing_time: Option<Time>) {
        self.signing_time = signing_time
    }

    pub fn set_declare_digest_algorithm(&mut self, declare: bool) {
        self.declare_digest_algorithm = declare
    }

    /// Signs `content` and returns the DER encoded request.
    ///
    /// The key’s default signature algorithm is used and its digest
    /// algorithm becomes the only declared digest algorithm unless
    /// declaring it has been switched off.
    pub fn finalize<S: Signer>(
        self,
        content: Bytes,
        signer: &S,
        key: &S::KeyId,
    ) -> Result<Bytes, SigningError<S::Error>> {
        let algorithm = signer.get_key_info(key)?.algorithm()
            .default_signature_algorithm();
        let digest_algorithm = algorithm.digest_algorithm();

        let signed_attrs = if self.signed_attrs {
            Some(SignedAttrs::new(
                &self.content_type,
                digest_algorithm.digest(&content).into(),
                self.signing_time,
            ))
        }
        else {
            None
        };
        let signature = match signed_attrs {
            Some(ref attrs) => {
                signer.sign(key, algorithm, &attrs.encode_verify())?
            }
            None => signer.sign(key, algorithm, &content)?
        };
        let sid = if self.use_key_identifier {
            SignerIdentifier::KeyIdentifier(
                self.cert.subject_public_key_info().key_identifier()
            )
        }
        else {
            SignerIdentifier::IssuerAndSerial {
                issuer: self.cert.issuer().clone(),
                serial: self.cert.serial_number().clone(),
            }
        };
        let info = SignerInfo::new(
            sid, digest_algorithm, signed_attrs, signature
        );

        let mut certs = Vec::new();
        if self.embed_cert {
            certs.push(self.cert)
        }
        certs.extend(self.extra_certs);
        let digest_algorithms = if self.declare_digest_algorithm {
            vec![digest_algorithm]
        }
        else {
            Vec::new()
        };

        let res = encode::sequence((
            oid::SIGNED_DATA.encode(), // contentType
            encode::sequence_as(Tag::CTX_0, // content
                encode::sequence((
                    3u8.encode(), // version
                    DigestAlgorithm::encode_set(&digest_algorithms),
                    encode::sequence(( // encapContentInfo
                        self.content_type.encode_ref(),
                        encode::sequence_as(Tag::CTX_0,
                            OctetString::encode_slice(content.as_ref())
                        ),
                    )),
                    if certs.is_empty() {
                        None
                    }
                    else {
                        Some(encode::sequence_as(Tag::CTX_0, // certificates
                            encode::iter(certs.iter().map(|cert| {
                                cert.encode_ref()
                            }))
                        ))
                    },
                    // crls omitted
                    encode::set(info.encode_ref()), // signerInfos
                ))
            )
        )).to_captured(Mode::Der).into_bytes();
        Ok(res)
    }
}


//============ Tests =========================================================
