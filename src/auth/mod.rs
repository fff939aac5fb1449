//! Authentication of signed CMC requests.
//!
//! Agents submit certificate requests and revocations to the CA as full
//! CMC requests signed with their agent certificate. The [`CmcAuth`]
//! authenticator decodes such a request, verifies its signature, binds the
//! signer to the TLS client certificate of the session, looks the signer up
//! in the user directory, and finally describes the contained requests in
//! an [`AuthToken`].
//!
//! Every attempt produces exactly one [`AuditEvent`], whether it succeeds
//! or not.

pub use self::audit::{AuditEvent, AuditSink, LogAuditSink, Outcome};
pub use self::classify::{ENROLLMENT, REVOCATION};
pub use self::config::CmcAuthConfig;
pub use self::error::AuthError;
pub use self::token::{AuthToken, CertRequestInfo, RequestType, TokenValue};
pub use self::trust::{
    CertStore, CertUserDirectory, DirectoryError, Principal
};

pub mod audit;
pub mod config;
pub mod error;
pub mod token;
pub mod trust;
mod classify;
mod verify;

use std::fmt;
use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, error, info};
use crate::cert::Cert;
use crate::cmc::CmcEnvelope;
use crate::crypto::{CryptoContext, TokenRegistry};
use self::audit::{AuditContext, NON_ROLE_USER};
use self::token::{AUTHENTICATED_CERT_SUBJECT, SSL_CLIENT_CERT, UID, USER_ID};


//------------ Constants -----------------------------------------------------

/// The name of the credential carrying the CMC request.
pub const CRED_CERT_REQUEST: &str = "cert_request";

/// The name of the fallback credential carrying the CMC request.
pub const CRED_CMC: &str = "cmcRequest";

/// The user ID used when signature verification is disabled.
pub const DEFAULT_USER: &str = "defUser";


//------------ Credentials ---------------------------------------------------

/// The credentials submitted with a request.
///
/// Credentials are named string values. The CMC request is taken from
/// [`CRED_CERT_REQUEST`] or, if that is missing, from [`CRED_CMC`].
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates credentials containing only the given CMC request.
    pub fn with_cmc_request(request: impl Into<String>) -> Self {
        let mut res = Self::new();
        res.set(CRED_CERT_REQUEST, request);
        res
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns the CMC request if present.
    pub fn cmc_request(&self) -> Option<&str> {
        self.get(CRED_CERT_REQUEST).or_else(|| self.get(CRED_CMC))
    }
}


//------------ SessionContext ------------------------------------------------

/// Information about the session a request was received over.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    /// The certificate the client authenticated the TLS session with.
    client_cert: Option<Cert>,

    /// The user already associated with the session.
    user_id: Option<String>,
}

impl SessionContext {
    pub fn new(client_cert: Option<Cert>, user_id: Option<String>) -> Self {
        SessionContext { client_cert, user_id }
    }

    pub fn client_cert(&self) -> Option<&Cert> {
        self.client_cert.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the subject ID for audit events.
    fn audit_subject_id(&self) -> String {
        match self.user_id {
            Some(ref id) => id.trim().into(),
            None => NON_ROLE_USER.into(),
        }
    }
}


//------------ CmcAuth -------------------------------------------------------

/// The authenticator for signed CMC requests.
///
/// The authenticator only holds its configuration and its collaborators.
/// It can be shared between threads and used for any number of concurrent
/// attempts.
pub struct CmcAuth {
    config: CmcAuthConfig,

    /// The crypto tokens available for verification.
    tokens: Arc<TokenRegistry>,

    /// The store for finding signer certificates.
    store: Arc<dyn CertStore>,

    /// The directory mapping signer certificates to agents.
    directory: Arc<dyn CertUserDirectory>,

    /// Where audit events go.
    audit: Arc<dyn AuditSink>,
}

impl CmcAuth {
    pub fn new(
        config: CmcAuthConfig,
        tokens: Arc<TokenRegistry>,
        store: Arc<dyn CertStore>,
        directory: Arc<dyn CertUserDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        CmcAuth { config, tokens, store, directory, audit }
    }

    pub fn config(&self) -> &CmcAuthConfig {
        &self.config
    }

    /// Authenticates a CMC request.
    ///
    /// Returns the token describing the authenticated agent and its
    /// requests. Exactly one audit event is emitted before returning.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        session: &SessionContext,
    ) -> Result<AuthToken, AuthError> {
        let mut audit = AuditContext::new();
        audit.subject_id = session.audit_subject_id();
        let res = self.process(credentials, session, &mut audit);
        match res {
            Ok(_) => {
                info!(
                    "CMC {} request signed by '{}' authenticated",
                    audit.request_type, audit.signer_info
                );
                self.audit.emit(audit.to_event(Outcome::Success));
            }
            Err(ref err) => {
                error!("CMC authentication failed: {}", err);
                self.audit.emit(audit.to_event(Outcome::Failure));
            }
        }
        res
    }

    fn process(
        &self,
        credentials: &Credentials,
        session: &SessionContext,
        audit: &mut AuditContext,
    ) -> Result<AuthToken, AuthError> {
        let blob = credentials.cmc_request().ok_or_else(|| {
            AuthError::missing("missing CMC request")
        })?;
        if blob.is_empty() {
            return Err(AuthError::invalid("attempted login with empty CMC"))
        }
        let envelope = CmcEnvelope::decode_blob(blob).map_err(|err| {
            AuthError::malformed(err.to_string())
        })?;

        let mut token = AuthToken::new();
        let mut context = CryptoContext::new(self.tokens.clone());
        let (user_id, uid) = if self.config.verify_signer_info {
            let signer = verify::verify_signer_info(
                &envelope, self.store.as_ref(), &mut context,
                self.config.verify_token_name()
            )?;
            trust::bind_client_cert(
                &signer, session.client_cert(),
                self.config.bypass_client_auth
            )?;
            let principal = trust::reauthenticate(
                self.directory.as_ref(), &signer
            )?;
            let subject = signer.subject().to_string();
            token.set(AUTHENTICATED_CERT_SUBJECT, subject.clone());
            token.set(SSL_CLIENT_CERT, signer.serial_number().to_string());
            let user_id = principal.uid().trim().to_string();
            (user_id, subject.trim().to_string())
        }
        else {
            debug!("signer info verification bypassed");
            (DEFAULT_USER.to_string(), DEFAULT_USER.to_string())
        };
        audit.signer_info = uid.clone();
        audit.subject_id = uid.clone();
        token.set(USER_ID, user_id);
        token.set(UID, uid);

        classify::classify(
            envelope.pki_data(), &mut token, audit, &mut context, &self.config
        )?;
        Ok(token)
    }
}

impl fmt::Debug for CmcAuth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CmcAuth")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .finish()
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cmc_request_fallback() {
        let mut creds = Credentials::new();
        assert_eq!(creds.cmc_request(), None);
        creds.set(CRED_CMC, "fallback");
        assert_eq!(creds.cmc_request(), Some("fallback"));
        creds.set(CRED_CERT_REQUEST, "primary");
        assert_eq!(creds.cmc_request(), Some("primary"));
    }

    #[test]
    fn audit_subject_id() {
        assert_eq!(
            SessionContext::default().audit_subject_id(), NON_ROLE_USER
        );
        assert_eq!(
            SessionContext::new(None, Some(" admin ".into()))
                .audit_subject_id(),
            "admin"
        );
    }

    #[test]
    fn send_and_sync() {
        fn check<T: Send + Sync>() { }
        check::<CmcAuth>();
    }
}
