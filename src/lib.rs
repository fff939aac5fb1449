//! Authentication of CMC requests.
//!
//! _Certificate Management over CMS_ (CMC) is a protocol for requesting
//! certificates from and revoking certificates at a certification
//! authority. A full CMC request wraps PKCS #10 or CRMF certificate requests
//! or revocation requests into a signed CMS object.
//!
//! This crate contains everything a CA needs to accept such requests from
//! its agents: decoders for the CMC and CMS structures in [`cmc`], the
//! X.509 building blocks in [`cert`], [`csr`], [`crmf`], and [`x509`],
//! signature verification via crypto tokens in [`crypto`], and the
//! authenticator itself in [`auth`].

pub mod auth;
pub mod cert;
pub mod cmc;
pub mod crmf;
pub mod crypto;
pub mod csr;
pub mod oid;
pub mod util;
pub mod x509;
