//! The error returned by the authenticator.

use std::{error, fmt};


//------------ AuthError -----------------------------------------------------

/// An authentication attempt failed.
///
/// Every failure inside the authenticator is normalized into one of four
/// kinds. Each kind carries a human-readable reason intended for logging.
/// The reason never contains key material.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthError {
    /// A required credential was not provided.
    ///
    /// This is the case if there is no CMC request at all or if there is
    /// no TLS client certificate while one is required.
    MissingCredential(String),

    /// The provided credentials were rejected.
    ///
    /// This covers bad signatures, a TLS client certificate that doesn’t
    /// match the signer, signers that can’t be resolved, and signers
    /// unknown to the user directory.
    InvalidCredentials(String),

    /// The CMC request could not be decoded or is of the wrong type.
    MalformedRequest(String),

    /// Something went wrong on our side.
    InternalError(String),
}

impl AuthError {
    pub fn missing(reason: impl Into<String>) -> Self {
        AuthError::MissingCredential(reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        AuthError::InvalidCredentials(reason.into())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AuthError::MalformedRequest(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        AuthError::InternalError(reason.into())
    }

    /// Returns the reason given for the failure.
    pub fn reason(&self) -> &str {
        match *self {
            AuthError::MissingCredential(ref reason) => reason,
            AuthError::InvalidCredentials(ref reason) => reason,
            AuthError::MalformedRequest(ref reason) => reason,
            AuthError::InternalError(ref reason) => reason,
        }
    }

    /// Returns whether this is a missing credential error.
    pub fn is_missing_credential(&self) -> bool {
        matches!(*self, AuthError::MissingCredential(_))
    }

    /// Returns whether this is an invalid credentials error.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(*self, AuthError::InvalidCredentials(_))
    }

    /// Returns whether this is a malformed request error.
    pub fn is_malformed_request(&self) -> bool {
        matches!(*self, AuthError::MalformedRequest(_))
    }

    /// Returns whether this is an internal error.
    pub fn is_internal_error(&self) -> bool {
        matches!(*self, AuthError::InternalError(_))
    }
}


//--- Display and Error

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AuthError::MissingCredential(ref reason) => {
                write!(f, "missing credential: {}", reason)
            }
            AuthError::InvalidCredentials(ref reason) => {
                write!(f, "invalid credentials: {}", reason)
            }
            AuthError::MalformedRequest(ref reason) => {
                write!(f, "malformed request: {}", reason)
            }
            AuthError::InternalError(ref reason) => {
                write!(f, "internal error: {}", reason)
            }
        }
    }
}

impl error::Error for AuthError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            AuthError::invalid("signer mismatch").to_string(),
            "invalid credentials: signer mismatch"
        );
        assert_eq!(
            AuthError::missing("no request").to_string(),
            "missing credential: no request"
        );
        assert_eq!(AuthError::malformed("bad").reason(), "bad");
        assert!(AuthError::internal("oops").is_internal_error());
    }
}
