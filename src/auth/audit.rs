//! Audit events.
//!
//! Every authentication attempt results in exactly one [`AuditEvent`]
//! which is handed to an [`AuditSink`]. Values unknown at the time the
//! attempt ends are replaced with sentinels.

use std::fmt;
use log::info;


//------------ Sentinels -----------------------------------------------------

/// The value of fields that are not known.
pub const UNIDENTIFIED: &str = "$Unidentified$";

/// The subject ID used when a session has no user ID.
pub const NON_ROLE_USER: &str = "$NonRoleUser$";

/// The certificate subject used when the requested subject is empty.
pub const EMPTY_VALUE: &str = "<empty>";

/// The name of the event type.
pub const CMC_SIGNED_REQUEST_SIG_VERIFY: &str =
    "CMC_SIGNED_REQUEST_SIG_VERIFY";


//------------ AuditSink -----------------------------------------------------

/// A receiver of audit events.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}


//------------ LogAuditSink --------------------------------------------------

/// An audit sink that writes events to the log.
///
/// Events are logged at info level with the target `audit`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(target: "audit", "{}", event);
    }
}


//------------ Outcome -------------------------------------------------------

/// The outcome of an authentication attempt.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Outcome::Success => "Success",
            Outcome::Failure => "Failure",
        })
    }
}


//------------ AuditEvent ----------------------------------------------------

/// The record of a single signed CMC request verification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditEvent {
    /// The identity of whoever made the request.
    subject_id: String,

    outcome: Outcome,

    /// Either `"enrollment"` or `"revocation"`.
    request_type: String,

    /// The subject of the requested certificate.
    cert_subject: String,

    /// The user ID of the signer.
    signer_info: String,
}

impl AuditEvent {
    pub fn new(
        subject_id: impl Into<String>,
        outcome: Outcome,
        request_type: impl Into<String>,
        cert_subject: impl Into<String>,
        signer_info: impl Into<String>,
    ) -> Self {
        AuditEvent {
            subject_id: subject_id.into(),
            outcome,
            request_type: request_type.into(),
            cert_subject: cert_subject.into(),
            signer_info: signer_info.into(),
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn cert_subject(&self) -> &str {
        &self.cert_subject
    }

    pub fn signer_info(&self) -> &str {
        &self.signer_info
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
            "[AuditEvent={}][SubjectID={}][Outcome={}][ReqType={}]\
             [CertSubject={}][SignerInfo={}] \
             agent pre-approved CMC request signature verification",
            CMC_SIGNED_REQUEST_SIG_VERIFY,
            self.subject_id, self.outcome, self.request_type,
            self.cert_subject, self.signer_info,
        )
    }
}


//------------ AuditContext --------------------------------------------------

/// The audit information collected during an attempt.
///
/// All fields start out unidentified and are filled in as the attempt
/// learns more. When the attempt ends, the context is turned into an
/// event.
#[derive(Clone, Debug)]
pub(crate) struct AuditContext {
    pub subject_id: String,
    pub request_type: String,
    pub cert_subject: String,
    pub signer_info: String,
}

impl AuditContext {
    pub fn new() -> Self {
        AuditContext {
            subject_id: UNIDENTIFIED.into(),
            request_type: UNIDENTIFIED.into(),
            cert_subject: UNIDENTIFIED.into(),
            signer_info: UNIDENTIFIED.into(),
        }
    }

    pub fn to_event(&self, outcome: Outcome) -> AuditEvent {
        AuditEvent::new(
            self.subject_id.clone(), outcome, self.request_type.clone(),
            self.cert_subject.clone(), self.signer_info.clone(),
        )
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unidentified_event() {
        let event = AuditContext::new().to_event(Outcome::Failure);
        assert_eq!(event.subject_id(), UNIDENTIFIED);
        assert_eq!(event.request_type(), UNIDENTIFIED);
        assert_eq!(event.cert_subject(), UNIDENTIFIED);
        assert_eq!(event.signer_info(), UNIDENTIFIED);
        assert_eq!(event.outcome(), Outcome::Failure);
    }

    #[test]
    fn display() {
        let event = AuditEvent::new(
            "agent", Outcome::Success, "revocation", EMPTY_VALUE, "agent"
        );
        assert_eq!(
            event.to_string(),
            "[AuditEvent=CMC_SIGNED_REQUEST_SIG_VERIFY][SubjectID=agent]\
             [Outcome=Success][ReqType=revocation][CertSubject=<empty>]\
             [SignerInfo=agent] \
             agent pre-approved CMC request signature verification"
        );
    }
}
