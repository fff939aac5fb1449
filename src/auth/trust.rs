//! Binding the signer of a request to an agent.
//!
//! A valid signature alone doesn’t make a request acceptable. The signer
//! must also be the party that submitted the request via TLS and it must
//! be known to the user directory as an agent. This module contains the
//! collaborators needed for this and the checks themselves.

use std::{error, fmt};
use log::{debug, error};
use crate::cert::Cert;
use crate::x509::{Name, Serial};
use super::error::AuthError;


//------------ CertStore -----------------------------------------------------

/// A store of certificates known to the CA.
///
/// The store is used to find the certificate of a signer that didn’t
/// include its certificate in the request.
pub trait CertStore: Send + Sync {
    /// Returns the certificate with the given issuer and serial number.
    fn resolve(&self, issuer: &Name, serial: &Serial) -> Option<Cert>;
}

impl CertStore for Vec<Cert> {
    fn resolve(&self, issuer: &Name, serial: &Serial) -> Option<Cert> {
        self.iter().find(|cert| {
            cert.has_issuer_and_serial(issuer, serial)
        }).cloned()
    }
}


//------------ CertUserDirectory ---------------------------------------------

/// A directory mapping certificates to users.
pub trait CertUserDirectory: Send + Sync {
    /// Returns the user the certificate belongs to.
    ///
    /// If no user has the certificate, returns
    /// [`DirectoryError::NotFound`]. Any other error indicates that the
    /// directory could not be queried.
    fn authenticate_by_certificate(
        &self, cert: &Cert
    ) -> Result<Principal, DirectoryError>;
}


//------------ Principal -----------------------------------------------------

/// A user known to the directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    /// The user ID.
    uid: String,

    /// The full name of the user if the directory knows it.
    full_name: Option<String>,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Principal { uid: uid.into(), full_name: None }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }
}


//------------ Checks --------------------------------------------------------

/// Checks that the TLS client certificate belongs to the signer.
///
/// The subjects of both certificates must be identical in their encoded
/// form. If there is no client certificate, the check only succeeds if
/// `bypass` is set.
pub(crate) fn bind_client_cert(
    signer: &Cert,
    client_cert: Option<&Cert>,
    bypass: bool,
) -> Result<(), AuthError> {
    let Some(client_cert) = client_cert else {
        if bypass {
            debug!(
                "missing TLS client authentication certificate; allowed"
            );
            return Ok(())
        }
        error!("missing TLS client authentication certificate");
        return Err(AuthError::missing(
            "missing TLS client authentication certificate"
        ))
    };
    if client_cert.subject() == signer.subject() {
        debug!("TLS client certificate subject and CMC signer match");
        Ok(())
    }
    else {
        error!(
            "TLS client certificate '{}' and CMC signer '{}' do not match",
            client_cert.subject(), signer.subject()
        );
        Err(AuthError::invalid(
            "TLS client authentication certificate and CMC signer \
             do not match"
        ))
    }
}

/// Looks up the signer in the user directory.
///
/// Whether the signer is unknown or the directory failed is only visible
/// in the log.
pub(crate) fn reauthenticate(
    directory: &dyn CertUserDirectory,
    signer: &Cert,
) -> Result<Principal, AuthError> {
    match directory.authenticate_by_certificate(signer) {
        Ok(principal) => {
            debug!(
                "signer '{}' is user '{}'", signer.subject(), principal.uid()
            );
            Ok(principal)
        }
        Err(DirectoryError::NotFound) => {
            error!("signer '{}' is not a known user", signer.subject());
            Err(AuthError::invalid("signer is not a known user"))
        }
        Err(err) => {
            error!("user directory lookup failed: {}", err);
            Err(AuthError::internal("user directory lookup failed"))
        }
    }
}


//============ Error Types ===================================================

//------------ DirectoryError ------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DirectoryError {
    /// No user has the certificate.
    NotFound,

    /// The directory could not be queried.
    Unavailable(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DirectoryError::NotFound => f.write_str("user not found"),
            DirectoryError::Unavailable(ref reason) => {
                write!(f, "directory unavailable: {}", reason)
            }
        }
    }
}

impl error::Error for DirectoryError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use chrono::TimeDelta;
    use crate::cert::TbsCert;
    use crate::crypto::{PublicKeyFormat, Signer};
    use crate::crypto::softsigner::SoftSigner;
    use crate::x509::Validity;
    use super::*;

    fn make_cert(serial: u64, subject: &str) -> Cert {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        TbsCert::new(
            Serial::from(serial),
            Name::from_str("CN=Test CA").unwrap(),
            Validity::from_duration(TimeDelta::days(1)),
            Name::from_str(subject).unwrap(),
            signer.get_key_info(&key).unwrap(),
            PublicKeyFormat::EcdsaP256.default_signature_algorithm(),
        ).into_cert(&signer, &key).unwrap()
    }

    struct Directory(Result<Principal, DirectoryError>);

    impl CertUserDirectory for Directory {
        fn authenticate_by_certificate(
            &self, _cert: &Cert
        ) -> Result<Principal, DirectoryError> {
            self.0.clone()
        }
    }

    #[test]
    fn resolve_from_vec() {
        let store = vec![make_cert(1, "CN=One"), make_cert(2, "CN=Two")];
        let issuer = Name::from_str("CN=Test CA").unwrap();
        assert_eq!(
            store.resolve(&issuer, &Serial::from(2)).unwrap().subject()
                .to_string(),
            "CN=Two"
        );
        assert!(store.resolve(&issuer, &Serial::from(3)).is_none());
    }

    #[test]
    fn client_cert_binding() {
        let signer = make_cert(1, "CN=Agent");
        let same_subject = make_cert(2, "CN=Agent");
        let other = make_cert(3, "CN=Other Agent");

        assert!(bind_client_cert(&signer, Some(&same_subject), false).is_ok());
        assert!(
            bind_client_cert(&signer, Some(&other), true).unwrap_err()
                .is_invalid_credentials()
        );
        assert!(
            bind_client_cert(&signer, None, false).unwrap_err()
                .is_missing_credential()
        );
        assert!(bind_client_cert(&signer, None, true).is_ok());
    }

    #[test]
    fn directory_errors() {
        let signer = make_cert(1, "CN=Agent");
        assert_eq!(
            reauthenticate(
                &Directory(Ok(Principal::new("agent"))), &signer
            ).unwrap().uid(),
            "agent"
        );
        assert!(
            reauthenticate(
                &Directory(Err(DirectoryError::NotFound)), &signer
            ).unwrap_err().is_invalid_credentials()
        );
        assert!(
            reauthenticate(
                &Directory(Err(DirectoryError::Unavailable("down".into()))),
                &signer
            ).unwrap_err().is_internal_error()
        );
    }
}
