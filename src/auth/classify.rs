//! Classifying the requests of an authenticated CMC request.

use log::{debug, error};
use crate::cmc::{PkiData, TaggedRequest};
use crate::crypto::CryptoContext;
use crate::csr::CertificationRequest;
use crate::x509::Name;
use super::audit::{AuditContext, EMPTY_VALUE};
use super::config::CmcAuthConfig;
use super::error::AuthError;
use super::token::{
    AuthToken, CertRequestInfo, RequestType, TOKEN_CERT_SUBJECT
};


//------------ Constants -----------------------------------------------------

/// The audit request type of an enrollment.
pub const ENROLLMENT: &str = "enrollment";

/// The audit request type of a revocation.
pub const REVOCATION: &str = "revocation";


//------------ classify ------------------------------------------------------

/// Adds the requests of `pki_data` to `token`.
///
/// A request without certificate requests is a revocation. Its
/// revocation entries are added to the token in order. Otherwise, every
/// certificate request is described in the token and, if configured, the
/// proof of possession of PKCS #10 requests is checked.
pub(crate) fn classify(
    pki_data: &PkiData,
    token: &mut AuthToken,
    audit: &mut AuditContext,
    context: &mut CryptoContext,
    config: &CmcAuthConfig,
) -> Result<(), AuthError> {
    if pki_data.is_revocation() {
        debug!("no certificate requests, assuming revocation request");
        audit.request_type = REVOCATION.into();
        for req in pki_data.revocations() {
            token.add_revocation(req.serial().clone(), req.reason());
        }
        return Ok(())
    }

    debug!(
        "{} certificate requests, assuming enrollment request",
        pki_data.requests().len()
    );
    audit.request_type = ENROLLMENT.into();
    for req in pki_data.requests() {
        match *req {
            TaggedRequest::Pkcs10 { body_part_id, ref request } => {
                debug!("request {} is PKCS #10", body_part_id);
                if config.request_verify {
                    check_pop(
                        request, context, config.verify_token_name()
                    )?;
                }
                let subject = audit_subject(
                    &subject_string(request.subject())
                );
                audit.cert_subject = subject.clone();
                token.set(TOKEN_CERT_SUBJECT, subject);
                token.add_cert_request(CertRequestInfo::new(
                    body_part_id.into_u32(),
                    RequestType::Pkcs10,
                    Some(request.subject().clone()),
                    Some(request.public_key().clone()),
                ));
            }
            TaggedRequest::Crmf(ref msg) => {
                debug!("request {} is CRMF", msg.cert_req_id());
                let template = msg.template();
                if let Some(subject) = template.subject() {
                    let subject = subject_string(subject);
                    audit.cert_subject = audit_subject(&subject);
                    token.set(TOKEN_CERT_SUBJECT, subject);
                }
                token.add_cert_request(CertRequestInfo::new(
                    msg.cert_req_id(),
                    RequestType::Crmf,
                    template.subject().cloned(),
                    template.public_key().cloned(),
                ));
            }
        }
    }
    Ok(())
}

/// Checks the self-signature of a PKCS #10 request.
fn check_pop(
    request: &CertificationRequest,
    context: &mut CryptoContext,
    token_name: &str,
) -> Result<(), AuthError> {
    let switch = context.switch_to(token_name).map_err(|err| {
        error!("cannot select crypto token: {}", err);
        AuthError::internal(err.to_string())
    })?;
    let signed = request.signed_data();
    switch.current().verify(
        request.public_key(), signed.data().as_slice(), signed.signature()
    ).map_err(|_| {
        error!(
            "proof of possession of request for '{}' failed",
            request.subject()
        );
        AuthError::invalid("proof of possession failed")
    })
}

fn subject_string(subject: &Name) -> String {
    subject.to_string().trim().into()
}

fn audit_subject(subject: &str) -> String {
    if subject.is_empty() {
        EMPTY_VALUE.into()
    }
    else {
        subject.into()
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use std::sync::Arc;
    use crate::cmc::{
        BodyPartId, PkiDataBuilder, RevocationReason, RevokeRequest
    };
    use crate::crmf::{CertReqMsg, CertTemplate};
    use crate::crypto::{PublicKeyFormat, Signer, TokenRegistry};
    use crate::crypto::softsigner::SoftSigner;
    use crate::x509::Serial;
    use super::*;
    use super::super::audit::UNIDENTIFIED;
    use super::super::token::{CERT_SERIAL_TO_REVOKE, REASON_CODE};

    fn context() -> CryptoContext {
        CryptoContext::new(Arc::new(TokenRegistry::new()))
    }

    fn csr(signer: &SoftSigner, subject: &str) -> CertificationRequest {
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        CertificationRequest::construct(
            signer, &key, Name::from_str(subject).unwrap()
        ).unwrap()
    }

    fn run(
        builder: PkiDataBuilder
    ) -> Result<(AuthToken, AuditContext), AuthError> {
        let data = PkiData::decode(builder.finalize()).unwrap();
        let mut token = AuthToken::new();
        let mut audit = AuditContext::new();
        classify(
            &data, &mut token, &mut audit, &mut context(),
            &CmcAuthConfig::default()
        )?;
        Ok((token, audit))
    }

    #[test]
    fn pkcs10_enrollment() {
        let signer = SoftSigner::new();
        let mut builder = PkiDataBuilder::new();
        builder.add_pkcs10(
            BodyPartId::from(1), csr(&signer, "CN=Jane Doe, O=Example")
        );
        let (token, audit) = run(builder).unwrap();
        assert_eq!(token.cert_request_type(), Some("cmc-pkcs10"));
        assert_eq!(
            token.get_str(TOKEN_CERT_SUBJECT), Some("CN=Jane Doe, O=Example")
        );
        assert_eq!(token.cert_requests()[0].correlation_id(), 1);
        assert_eq!(audit.request_type, ENROLLMENT);
        assert_eq!(audit.cert_subject, "CN=Jane Doe, O=Example");
    }

    #[test]
    fn empty_pkcs10_subject() {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let request = CertificationRequest::construct(
            &signer, &key, Name::empty()
        ).unwrap();
        let mut builder = PkiDataBuilder::new();
        builder.add_pkcs10(BodyPartId::from(1), request);
        let (token, audit) = run(builder).unwrap();
        assert_eq!(token.get_str(TOKEN_CERT_SUBJECT), Some(EMPTY_VALUE));
        assert_eq!(audit.cert_subject, EMPTY_VALUE);
        assert!(token.cert_requests()[0].subject_string().is_none());
    }

    #[test]
    fn crmf_enrollment() {
        let mut with_subject = CertTemplate::new();
        with_subject.set_subject(Some(Name::from_str("CN=Crmf").unwrap()));
        let mut builder = PkiDataBuilder::new();
        builder.add_crmf(CertReqMsg::new(4, with_subject));
        builder.add_crmf(CertReqMsg::new(5, CertTemplate::new()));
        let (token, audit) = run(builder).unwrap();
        assert_eq!(token.cert_request_type(), Some("cmc-crmf"));
        assert_eq!(token.get_str(TOKEN_CERT_SUBJECT), Some("CN=Crmf"));
        assert_eq!(audit.cert_subject, "CN=Crmf");
        let ids: Vec<_> = token.cert_requests().iter().map(|info| {
            info.correlation_id()
        }).collect();
        assert_eq!(ids, [4, 5]);
        assert!(token.cert_requests()[1].subject().is_none());
    }

    #[test]
    fn revocation() {
        let issuer = Name::from_str("CN=Test CA").unwrap();
        let mut builder = PkiDataBuilder::new();
        builder.add_revoke_requests(BodyPartId::from(1), &[
            RevokeRequest::new(
                issuer.clone(), Serial::from(10),
                RevocationReason::KeyCompromise
            ),
            RevokeRequest::new(
                issuer.clone(), Serial::from(11), RevocationReason::Superseded
            ),
        ]);
        builder.add_revoke_requests(BodyPartId::from(2), &[
            RevokeRequest::new(
                issuer, Serial::from(12), RevocationReason::Unspecified
            ),
        ]);
        let (token, audit) = run(builder).unwrap();
        assert_eq!(
            token.get_list(CERT_SERIAL_TO_REVOKE).unwrap(),
            &["10".to_string(), "11".to_string(), "12".to_string()]
        );
        assert_eq!(
            token.get_list(REASON_CODE).unwrap(),
            &["1".to_string(), "4".to_string(), "0".to_string()]
        );
        assert_eq!(audit.request_type, REVOCATION);
        assert_eq!(audit.cert_subject, UNIDENTIFIED);
        assert!(token.cert_request_type().is_none());
    }
}
