//! The result of a successful authentication.

use std::fmt;
use std::collections::BTreeMap;
use crate::crypto::PublicKey;
use crate::x509::{Name, Serial};
use crate::cmc::RevocationReason;


//------------ Field Names ---------------------------------------------------

/// The user ID of the authenticated agent as returned by the directory.
pub const USER_ID: &str = "userid";

/// The subject name of the agent’s signing certificate.
pub const UID: &str = "uid";

/// The subject of the requested certificate.
pub const TOKEN_CERT_SUBJECT: &str = "tokenCertSubject";

/// The subject of the certificate the request was signed with.
pub const AUTHENTICATED_CERT_SUBJECT: &str = "tokenAuthenticatedCertSubject";

/// The serial number of the certificate the request was signed with.
pub const SSL_CLIENT_CERT: &str = "sslClientCert";

/// The type of the last certificate request.
pub const CERT_REQUEST_TYPE: &str = "cert_request_type";

/// The serial numbers of the certificates to revoke.
pub const CERT_SERIAL_TO_REVOKE: &str = "certSerialToRevoke";

/// The revocation reason codes.
pub const REASON_CODE: &str = "reasonCode";


//------------ AuthToken -----------------------------------------------------

/// The authenticated identity and the requests it made.
///
/// The token is a mapping from field names to either a single string or a
/// list of strings. The names of the fields are available as constants in
/// this module. In addition, the token provides typed access to the
/// certificate requests and revocations of an authenticated request.
///
/// A token is created anew for every authentication attempt and can’t be
/// changed once it has been returned.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthToken {
    /// The string fields.
    fields: BTreeMap<&'static str, TokenValue>,

    /// The certificate requests of an enrollment.
    cert_requests: Vec<CertRequestInfo>,

    /// The revocations requested.
    revocations: Vec<(Serial, RevocationReason)>,
}

/// # Data Access
///
impl AuthToken {
    /// Returns the value of the field with the given name.
    pub fn get(&self, name: &str) -> Option<&TokenValue> {
        self.fields.get(name)
    }

    /// Returns the value of a single-valued field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            TokenValue::Str(value) => Some(value),
            TokenValue::List(_) => None,
        }
    }

    /// Returns the values of a list field.
    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        match self.fields.get(name)? {
            TokenValue::List(values) => Some(values),
            TokenValue::Str(_) => None,
        }
    }

    /// Returns an iterator over all string fields.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &TokenValue)> + '_ {
        self.fields.iter().map(|(key, value)| (*key, value))
    }

    /// Returns the user ID of the authenticated agent.
    pub fn user_id(&self) -> Option<&str> {
        self.get_str(USER_ID)
    }

    /// Returns the type of the last certificate request.
    pub fn cert_request_type(&self) -> Option<&str> {
        self.get_str(CERT_REQUEST_TYPE)
    }

    /// Returns the certificate requests in request sequence order.
    ///
    /// This is empty for a revocation.
    pub fn cert_requests(&self) -> &[CertRequestInfo] {
        &self.cert_requests
    }

    /// Returns the requested revocations in control sequence order.
    ///
    /// This is empty for an enrollment.
    pub fn revocations(&self) -> &[(Serial, RevocationReason)] {
        &self.revocations
    }

    /// Returns whether the token is for a revocation.
    pub fn is_revocation(&self) -> bool {
        self.cert_requests.is_empty()
    }
}

/// # Building
///
/// Tokens are only ever built by the authenticator.
impl AuthToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(
        &mut self, name: &'static str, value: impl Into<String>
    ) {
        self.fields.insert(name, TokenValue::Str(value.into()));
    }

    /// Appends a value to a list field, creating the list if necessary.
    pub(crate) fn push(
        &mut self, name: &'static str, value: impl Into<String>
    ) {
        let value = value.into();
        match self.fields.get_mut(name) {
            Some(TokenValue::List(list)) => list.push(value),
            _ => {
                self.fields.insert(name, TokenValue::List(vec![value]));
            }
        }
    }

    pub(crate) fn add_cert_request(&mut self, info: CertRequestInfo) {
        self.set(CERT_REQUEST_TYPE, info.request_type().as_str());
        self.cert_requests.push(info);
    }

    pub(crate) fn add_revocation(
        &mut self, serial: Serial, reason: RevocationReason
    ) {
        self.push(CERT_SERIAL_TO_REVOKE, serial.to_string());
        self.push(REASON_CODE, reason.code().to_string());
        self.revocations.push((serial, reason));
    }
}


//------------ TokenValue ----------------------------------------------------

/// The value of a field of an authentication token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenValue {
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TokenValue::Str(ref value) => f.write_str(value),
            TokenValue::List(ref values) => {
                let mut first = true;
                for value in values {
                    if first {
                        first = false
                    }
                    else {
                        f.write_str(",")?;
                    }
                    f.write_str(value)?;
                }
                Ok(())
            }
        }
    }
}


//------------ RequestType ---------------------------------------------------

/// The kind of a certificate request.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RequestType {
    Pkcs10,
    Crmf,
}

impl RequestType {
    /// Returns the tag used for the request type in the token.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Pkcs10 => "cmc-pkcs10",
            RequestType::Crmf => "cmc-crmf",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//------------ CertRequestInfo -----------------------------------------------

/// A description of a single certificate request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertRequestInfo {
    /// The body part ID or CRMF request ID.
    correlation_id: u32,

    request_type: RequestType,

    /// The requested subject.
    ///
    /// A CRMF template may leave out the subject.
    subject: Option<Name>,

    /// The requested public key.
    public_key: Option<PublicKey>,
}

impl CertRequestInfo {
    pub(crate) fn new(
        correlation_id: u32,
        request_type: RequestType,
        subject: Option<Name>,
        public_key: Option<PublicKey>,
    ) -> Self {
        CertRequestInfo { correlation_id, request_type, subject, public_key }
    }

    pub fn correlation_id(&self) -> u32 {
        self.correlation_id
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn subject(&self) -> Option<&Name> {
        self.subject.as_ref()
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    /// Returns the subject as a string.
    ///
    /// Returns `None` if there is no subject or the subject is empty.
    pub fn subject_string(&self) -> Option<String> {
        let subject = self.subject.as_ref()?;
        if subject.is_empty() {
            None
        }
        else {
            Some(subject.to_string().trim().to_string())
        }
    }
}


//============ Tests =========================================================
