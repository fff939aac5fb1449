//! Authentication of complete CMC requests.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;
use bcder::Oid;
use bytes::Bytes;
use chrono::TimeDelta;
use cmcauth::auth::{
    AuditEvent, AuditSink, AuthError, CertUserDirectory, CmcAuth,
    CmcAuthConfig, Credentials, DirectoryError, Outcome, Principal,
    SessionContext, DEFAULT_USER, ENROLLMENT, REVOCATION,
};
use cmcauth::auth::audit::{NON_ROLE_USER, UNIDENTIFIED};
use cmcauth::auth::token::{
    AUTHENTICATED_CERT_SUBJECT, CERT_SERIAL_TO_REVOKE, REASON_CODE,
    SSL_CLIENT_CERT, TOKEN_CERT_SUBJECT, UID, USER_ID,
};
use cmcauth::cert::{Cert, TbsCert};
use cmcauth::cmc::{
    BodyPartId, CmcEnvelope, PkiDataBuilder, RevocationReason,
    RevokeRequest, SignedRequestBuilder,
};
use cmcauth::crmf::{CertReqMsg, CertTemplate};
use cmcauth::crypto::{PublicKeyFormat, Signer, SoftToken, TokenRegistry};
use cmcauth::crypto::softsigner::{KeyId, SoftSigner};
use cmcauth::csr::CertificationRequest;
use cmcauth::oid;
use cmcauth::util::base64;
use cmcauth::x509::{Name, Serial, Validity};


//------------ Test Collaborators --------------------------------------------

/// An audit sink remembering all events.
#[derive(Default)]
struct Recorder(Mutex<Vec<AuditEvent>>);

impl Recorder {
    fn events(&self) -> Vec<AuditEvent> {
        self.0.lock().unwrap().clone()
    }

    fn single(&self) -> AuditEvent {
        let events = self.events();
        assert_eq!(events.len(), 1, "expected exactly one audit event");
        events.into_iter().next().unwrap()
    }
}

impl AuditSink for Recorder {
    fn emit(&self, event: AuditEvent) {
        self.0.lock().unwrap().push(event)
    }
}

/// A user directory mapping certificate subjects to user IDs.
#[derive(Default)]
struct Directory {
    users: Vec<(Name, String)>,
    unavailable: bool,
}

impl Directory {
    fn with_user(subject: &Name, uid: &str) -> Self {
        Directory {
            users: vec![(subject.clone(), uid.into())],
            unavailable: false,
        }
    }
}

impl CertUserDirectory for Directory {
    fn authenticate_by_certificate(
        &self, cert: &Cert
    ) -> Result<Principal, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable(
                "connection refused".into()
            ))
        }
        self.users.iter().find(|(subject, _)| {
            subject == cert.subject()
        }).map(|(_, uid)| Principal::new(uid.clone())).ok_or(
            DirectoryError::NotFound
        )
    }
}


//------------ Test Material -------------------------------------------------

/// An agent with its key and certificate.
struct Agent {
    signer: SoftSigner,
    key: KeyId,
    cert: Cert,
}

impl Agent {
    fn new(serial: u64, subject: &str) -> Self {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        Self::with_key(signer, key, serial, subject)
    }

    /// Creates an agent using a PKCS #8 encoded key.
    fn imported(format: PublicKeyFormat, pkcs8: &[u8]) -> Self {
        let signer = SoftSigner::new();
        let key = signer.key_from_pkcs8(format, pkcs8).unwrap();
        Self::with_key(signer, key, 0x1001, "CN=Agent, O=Example")
    }

    fn with_key(
        signer: SoftSigner, key: KeyId, serial: u64, subject: &str
    ) -> Self {
        let info = signer.get_key_info(&key).unwrap();
        let algorithm = info.algorithm().default_signature_algorithm();
        let cert = TbsCert::new(
            Serial::from(serial),
            Name::from_str("CN=Test CA, O=Example").unwrap(),
            Validity::from_duration(TimeDelta::days(30)),
            Name::from_str(subject).unwrap(),
            info,
            algorithm,
        ).into_cert(&signer, &key).unwrap();
        Agent { signer, key, cert }
    }

    fn builder(&self) -> SignedRequestBuilder {
        SignedRequestBuilder::new(self.cert.clone())
    }

    /// Signs the content and returns the PEM armoured request.
    fn sign(&self, builder: SignedRequestBuilder, content: Bytes) -> String {
        let der = builder.finalize(content, &self.signer, &self.key).unwrap();
        base64::Cmc.encode_armored("CMC REQUEST", &der)
    }

    fn session(&self) -> SessionContext {
        SessionContext::new(Some(self.cert.clone()), None)
    }

    fn csr(&self, subject: &str) -> CertificationRequest {
        let key = self.signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        CertificationRequest::construct(
            &self.signer, &key, Name::from_str(subject).unwrap()
        ).unwrap()
    }
}

fn agent() -> Agent {
    Agent::new(0x1001, "CN=Agent, O=Example")
}

fn authenticator(
    config: CmcAuthConfig,
    store: Vec<Cert>,
    directory: Directory,
    tokens: TokenRegistry,
) -> (CmcAuth, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let auth = CmcAuth::new(
        config,
        Arc::new(tokens),
        Arc::new(store),
        Arc::new(directory),
        recorder.clone(),
    );
    (auth, recorder)
}

/// Returns an authenticator knowing `agent` as user `"agent"`.
fn default_authenticator(
    agent: &Agent, config: CmcAuthConfig
) -> (CmcAuth, Arc<Recorder>) {
    authenticator(
        config,
        Vec::new(),
        Directory::with_user(agent.cert.subject(), "agent"),
        TokenRegistry::new(),
    )
}

fn enrollment(agent: &Agent, subject: &str) -> Bytes {
    let mut data = PkiDataBuilder::new();
    data.set_transaction_id(Some(77));
    data.add_pkcs10(BodyPartId::from(1), agent.csr(subject));
    data.finalize()
}


//------------ Enrollment ----------------------------------------------------

#[test]
fn pkcs10_enrollment() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let request = agent.sign(
        agent.builder(), enrollment(&agent, "CN=Jane Doe, O=Example")
    );

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert_eq!(token.cert_request_type(), Some("cmc-pkcs10"));
    assert_eq!(
        token.get_str(TOKEN_CERT_SUBJECT), Some("CN=Jane Doe, O=Example")
    );
    assert_eq!(token.get_str(USER_ID), Some("agent"));
    assert_eq!(token.get_str(UID), Some("CN=Agent, O=Example"));
    assert_eq!(
        token.get_str(AUTHENTICATED_CERT_SUBJECT),
        Some("CN=Agent, O=Example")
    );
    assert_eq!(token.get_str(SSL_CLIENT_CERT), Some("4097"));
    assert_eq!(token.cert_requests().len(), 1);
    assert_eq!(token.cert_requests()[0].correlation_id(), 1);

    let event = audit.single();
    assert_eq!(event.outcome(), Outcome::Success);
    assert_eq!(event.subject_id(), "CN=Agent, O=Example");
    assert_eq!(event.request_type(), ENROLLMENT);
    assert_eq!(event.cert_subject(), "CN=Jane Doe, O=Example");
    assert_eq!(event.signer_info(), "CN=Agent, O=Example");
}

#[test]
fn crmf_enrollment() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let mut template = CertTemplate::new();
    template.set_subject(Some(Name::from_str("CN=John Doe").unwrap()));
    template.set_public_key(Some(
        agent.signer.get_key_info(&agent.key).unwrap()
    ));
    let mut data = PkiDataBuilder::new();
    data.add_crmf(CertReqMsg::new(42, template));
    let request = agent.sign(agent.builder(), data.finalize());

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert_eq!(token.cert_request_type(), Some("cmc-crmf"));
    assert_eq!(token.get_str(TOKEN_CERT_SUBJECT), Some("CN=John Doe"));
    let info = &token.cert_requests()[0];
    assert_eq!(info.correlation_id(), 42);
    assert_eq!(
        info.public_key(),
        Some(&agent.signer.get_key_info(&agent.key).unwrap())
    );
    assert_eq!(audit.single().outcome(), Outcome::Success);
}

#[test]
fn pop_check_with_configured_token() {
    let agent = agent();
    let mut tokens = TokenRegistry::new();
    tokens.register(Arc::new(SoftToken::new("hsm")));
    let (auth, audit) = authenticator(
        CmcAuthConfig { verify_token: "hsm".into(), .. Default::default() },
        Vec::new(),
        Directory::with_user(agent.cert.subject(), "agent"),
        tokens,
    );
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));
    assert!(
        auth.authenticate(
            &Credentials::with_cmc_request(request), &agent.session()
        ).is_ok()
    );
    assert_eq!(audit.single().outcome(), Outcome::Success);
}


//------------ Agent Keys ----------------------------------------------------

#[test]
fn rsa_agent() {
    let agent = Agent::imported(
        PublicKeyFormat::Rsa, include_bytes!("../test-data/agent-rsa.pk8")
    );
    assert_eq!(
        agent.cert.subject_public_key_info().algorithm(),
        PublicKeyFormat::Rsa
    );
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert_eq!(token.user_id(), Some("agent"));
    assert_eq!(audit.single().outcome(), Outcome::Success);
}

#[test]
fn dsa_agent() {
    let agent = Agent::imported(
        PublicKeyFormat::Dsa, include_bytes!("../test-data/agent-dsa.pk8")
    );
    assert!(agent.cert.subject_public_key_info().parameters().is_some());
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert_eq!(token.user_id(), Some("agent"));
    assert_eq!(audit.single().outcome(), Outcome::Success);

    // Signing with a different key must still fail.
    let impostor = Agent::new(0x1001, "CN=Agent, O=Example");
    let request = impostor.sign(agent.builder(), enrollment(&agent, "CN=X"));
    assert!(
        auth.authenticate(
            &Credentials::with_cmc_request(request), &agent.session()
        ).unwrap_err().is_invalid_credentials()
    );
}

#[test]
fn undeclared_digest_algorithm() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let mut builder = agent.builder();
    builder.set_declare_digest_algorithm(false);
    let request = agent.sign(builder, enrollment(&agent, "CN=X"));
    assert!(
        CmcEnvelope::decode_blob(&request).unwrap()
            .digest_algorithms().is_empty()
    );

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert_eq!(token.user_id(), Some("agent"));
    assert_eq!(audit.single().outcome(), Outcome::Success);
}


//------------ Revocation ----------------------------------------------------

#[test]
fn revocation_lists_in_order() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let issuer = Name::from_str("CN=Test CA, O=Example").unwrap();
    let mut data = PkiDataBuilder::new();
    data.add_revoke_requests(BodyPartId::from(1), &[
        RevokeRequest::new(
            issuer.clone(), Serial::from(100), RevocationReason::KeyCompromise
        ),
        RevokeRequest::new(
            issuer.clone(), Serial::from(101), RevocationReason::Superseded
        ),
    ]);
    data.add_revoke_requests(BodyPartId::from(2), &[
        RevokeRequest::new(
            issuer, Serial::from_str("123456789012345678901234567890")
                .unwrap(),
            RevocationReason::CessationOfOperation
        ),
    ]);
    let request = agent.sign(agent.builder(), data.finalize());

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert!(token.is_revocation());
    assert_eq!(
        token.get_list(CERT_SERIAL_TO_REVOKE).unwrap(),
        &[
            "100".to_string(), "101".to_string(),
            "123456789012345678901234567890".to_string()
        ]
    );
    assert_eq!(
        token.get_list(REASON_CODE).unwrap(),
        &["1".to_string(), "4".to_string(), "5".to_string()]
    );
    assert_eq!(token.revocations().len(), 3);

    let event = audit.single();
    assert_eq!(event.request_type(), REVOCATION);
    assert_eq!(event.cert_subject(), UNIDENTIFIED);
}


//------------ Decoding ------------------------------------------------------

#[test]
fn decoding_is_idempotent() {
    let agent = agent();
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));
    let first = CmcEnvelope::decode_blob(&request).unwrap();
    let second = CmcEnvelope::decode_blob(&request).unwrap();
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
    assert_eq!(first.pki_data().as_slice(), second.pki_data().as_slice());
    assert_eq!(first.certificates(), second.certificates());
}

#[test]
fn wrong_content_type_is_malformed() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let mut builder = agent.builder();
    builder.set_content_type(Oid(Bytes::from_static(oid::DATA.0)));
    let request = agent.sign(builder, enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap_err();
    assert!(err.is_malformed_request(), "{}", err);
    assert_eq!(audit.single().outcome(), Outcome::Failure);
}

#[test]
fn garbage_is_malformed() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    for blob in ["not base 64!", "MIIB", "AAAA"] {
        assert!(
            auth.authenticate(
                &Credentials::with_cmc_request(blob), &agent.session()
            ).unwrap_err().is_malformed_request()
        );
    }
    assert_eq!(audit.events().len(), 3);
}

#[test]
fn plain_base64_and_fallback_credential() {
    let agent = agent();
    let (auth, _) = default_authenticator(&agent, Default::default());
    let der = agent.builder().finalize(
        enrollment(&agent, "CN=X"), &agent.signer, &agent.key
    ).unwrap();
    let mut creds = Credentials::new();
    creds.set("cmcRequest", base64::Cmc.encode(&der));
    assert!(auth.authenticate(&creds, &agent.session()).is_ok());
}


//------------ Credentials ---------------------------------------------------

#[test]
fn empty_request_is_invalid() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    assert_eq!(
        auth.authenticate(
            &Credentials::with_cmc_request(""), &agent.session()
        ),
        Err(AuthError::invalid("attempted login with empty CMC"))
    );
    let event = audit.single();
    assert_eq!(event.outcome(), Outcome::Failure);
    assert_eq!(event.request_type(), UNIDENTIFIED);
}

#[test]
fn absent_request_is_missing() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let err = auth.authenticate(
        &Credentials::new(), &SessionContext::default()
    ).unwrap_err();
    assert!(err.is_missing_credential());
    let event = audit.single();
    assert_eq!(event.outcome(), Outcome::Failure);
    assert_eq!(event.subject_id(), NON_ROLE_USER);
}


//------------ Signature Verification ----------------------------------------

#[test]
fn unresolvable_signer_is_invalid() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let mut builder = agent.builder();
    builder.set_embed_cert(false);
    let request = agent.sign(builder, enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap_err();
    assert!(err.is_invalid_credentials(), "{}", err);
    let event = audit.single();
    assert_eq!(event.outcome(), Outcome::Failure);
    assert_eq!(event.signer_info(), UNIDENTIFIED);
}

#[test]
fn signer_from_store() {
    let agent = agent();
    let (auth, audit) = authenticator(
        Default::default(),
        vec![agent.cert.clone()],
        Directory::with_user(agent.cert.subject(), "agent"),
        TokenRegistry::new(),
    );
    let mut builder = agent.builder();
    builder.set_embed_cert(false);
    let request = agent.sign(builder, enrollment(&agent, "CN=X"));

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap();
    assert_eq!(token.user_id(), Some("agent"));
    assert_eq!(audit.single().outcome(), Outcome::Success);
}

#[test]
fn signed_by_other_key_is_invalid() {
    let agent = agent();
    let impostor = Agent::new(0x1001, "CN=Agent, O=Example");
    let (auth, audit) = default_authenticator(&agent, Default::default());
    // The impostor’s request carries the real agent’s certificate.
    let request = impostor.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap_err();
    assert!(err.is_invalid_credentials(), "{}", err);
    assert_eq!(audit.single().outcome(), Outcome::Failure);
}

#[test]
fn verification_disabled() {
    let agent = agent();
    let (auth, audit) = authenticator(
        CmcAuthConfig {
            verify_signer_info: false, .. Default::default()
        },
        Vec::new(),
        Directory::default(),
        TokenRegistry::new(),
    );
    let mut builder = agent.builder();
    builder.set_embed_cert(false);
    let request = agent.sign(builder, enrollment(&agent, "CN=X"));

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &SessionContext::default()
    ).unwrap();
    assert_eq!(token.user_id(), Some(DEFAULT_USER));
    assert!(token.get(AUTHENTICATED_CERT_SUBJECT).is_none());
    let event = audit.single();
    assert_eq!(event.outcome(), Outcome::Success);
    assert_eq!(event.signer_info(), DEFAULT_USER);
}

#[test]
fn unknown_verify_token_is_internal() {
    let agent = agent();
    let (auth, audit) = default_authenticator(
        &agent,
        CmcAuthConfig { verify_token: "hsm".into(), .. Default::default() }
    );
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap_err();
    assert!(err.is_internal_error(), "{}", err);
    assert_eq!(audit.single().outcome(), Outcome::Failure);
}


//------------ Trust Binding -------------------------------------------------

#[test]
fn client_cert_mismatch_is_invalid() {
    let agent = agent();
    let other = Agent::new(0x2002, "CN=Other Agent, O=Example");
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &other.session()
    ).unwrap_err();
    assert!(err.is_invalid_credentials(), "{}", err);
    let event = audit.single();
    assert_eq!(event.outcome(), Outcome::Failure);
    assert_eq!(event.signer_info(), UNIDENTIFIED);
}

#[test]
fn missing_client_cert() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &SessionContext::default()
    ).unwrap_err();
    assert!(err.is_missing_credential(), "{}", err);
    assert_eq!(audit.single().outcome(), Outcome::Failure);
}

#[test]
fn bypass_without_client_cert() {
    let agent = agent();
    let (auth, audit) = default_authenticator(
        &agent,
        CmcAuthConfig { bypass_client_auth: true, .. Default::default() }
    );
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let token = auth.authenticate(
        &Credentials::with_cmc_request(request), &SessionContext::default()
    ).unwrap();
    assert_eq!(token.user_id(), Some("agent"));
    assert_eq!(audit.single().outcome(), Outcome::Success);
}

#[test]
fn unknown_user_is_invalid() {
    let agent = agent();
    let (auth, audit) = authenticator(
        Default::default(),
        Vec::new(),
        Directory::default(),
        TokenRegistry::new(),
    );
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap_err();
    assert!(err.is_invalid_credentials(), "{}", err);
    assert_eq!(audit.single().outcome(), Outcome::Failure);
}

#[test]
fn directory_failure_is_internal() {
    let agent = agent();
    let (auth, audit) = authenticator(
        Default::default(),
        Vec::new(),
        Directory { users: Vec::new(), unavailable: true },
        TokenRegistry::new(),
    );
    let request = agent.sign(agent.builder(), enrollment(&agent, "CN=X"));

    let err = auth.authenticate(
        &Credentials::with_cmc_request(request), &agent.session()
    ).unwrap_err();
    assert!(err.is_internal_error(), "{}", err);
    assert_eq!(audit.single().outcome(), Outcome::Failure);
}


//------------ Concurrency ---------------------------------------------------

#[test]
fn concurrent_attempts() {
    let agent = agent();
    let (auth, audit) = default_authenticator(&agent, Default::default());
    let good = agent.sign(agent.builder(), enrollment(&agent, "CN=Good"));
    let session = agent.session();

    thread::scope(|scope| {
        for i in 0..8 {
            let auth = &auth;
            let good = &good;
            let session = &session;
            scope.spawn(move || {
                if i % 2 == 0 {
                    assert!(auth.authenticate(
                        &Credentials::with_cmc_request(good.as_str()), session
                    ).is_ok());
                }
                else {
                    assert!(auth.authenticate(
                        &Credentials::with_cmc_request(""), session
                    ).is_err());
                }
            });
        }
    });

    let events = audit.events();
    assert_eq!(events.len(), 8);
    assert_eq!(
        events.iter().filter(|e| e.outcome() == Outcome::Success).count(), 4
    );
}
