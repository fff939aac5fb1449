//! The object identifiers used in this crate.
//!
//! This module collects all the object indentifiers used at various places
//! in this crate in one central place. They are public so you can refer to
//! them should that ever become necessary.

use bcder::{ConstOid, Oid};


//------------ Content Types -------------------------------------------------

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-signedData`
pub const SIGNED_DATA: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-data`
pub const DATA: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// [RFC 5272](https://tools.ietf.org/html/rfc5272) `id-cct-PKIData`
///
/// Identifies the full PKI request content of a CMC message.
pub const CT_PKI_DATA: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 12, 2]);


//------------ CMC Controls --------------------------------------------------

pub const CMC_STATUS_INFO: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 1]);
pub const CMC_IDENTIFICATION: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 2]);
pub const CMC_IDENTITY_PROOF: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 3]);
pub const CMC_DATA_RETURN: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 4]);
pub const CMC_TRANSACTION_ID: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 5]);
pub const CMC_SENDER_NONCE: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 6]);
pub const CMC_RECIPIENT_NONCE: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 7]);

/// [RFC 5272](https://tools.ietf.org/html/rfc5272) `id-cmc-revokeRequest`
///
/// The control attribute asking for the revocation of a certificate.
pub const CMC_REVOKE_REQUEST: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 7, 17]);


//------------ CMS Attributes ------------------------------------------------

pub const CONTENT_TYPE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);
pub const MESSAGE_DIGEST: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);
pub const SIGNING_TIME: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 5]);

/// [RFC 2985](https://tools.ietf.org/html/rfc2985) `extensionRequest`
pub const EXTENSION_REQUEST: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 14]);


//------------ Digest Algorithms ---------------------------------------------

/// [RFC 3370](https://tools.ietf.org/html/rfc3370) `sha-1`
pub const SHA1: ConstOid = Oid(&[43, 14, 3, 2, 26]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha256`
///
/// Identifies the SHA-256 one-way hash function.
pub const SHA256: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);
pub const SHA384: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 2]);
pub const SHA512: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 3]);


//------------ Public Key and Signature Algorithms ---------------------------

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `rsaEncryption`
///
/// Identifies an RSA public key with no limitation to either RSASSA-PSS or
/// RSAES-OEAP.
pub const RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

pub const SHA1_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 5]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `sha256WithRSAEncryption`
///
/// Identifies the PKCS #1 version 1.5 signature algorithm with SHA-256.
pub const SHA256_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);
pub const SHA384_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 12]);
pub const SHA512_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 13]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `ecPublicKey`
pub const EC_PUBLIC_KEY: ConstOid = Oid(&[42, 134, 72, 206, 61, 2, 1]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `secp256r1`
pub const SECP256R1: ConstOid = Oid(&[42, 134, 72, 206, 61, 3, 1, 7]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `secp384r1`
pub const SECP384R1: ConstOid = Oid(&[43, 129, 4, 0, 34]);

pub const ECDSA_WITH_SHA1: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 1]);

/// [RFC 5758](https://tools.ietf.org/html/rfc5758) `ecdsa-with-SHA256`
pub const ECDSA_WITH_SHA256: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);
pub const ECDSA_WITH_SHA384: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 4, 3, 3]);
pub const ECDSA_WITH_SHA512: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 4, 3, 4]);

/// [RFC 3279](https://tools.ietf.org/html/rfc3279) `id-dsa`
pub const DSA: ConstOid = Oid(&[42, 134, 72, 206, 56, 4, 1]);
pub const DSA_WITH_SHA1: ConstOid = Oid(&[42, 134, 72, 206, 56, 4, 3]);
pub const DSA_WITH_SHA256: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 3, 2]);


//------------ Name Attribute Types ------------------------------------------

pub const AT_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]); // 2 5 4 3
pub const AT_SERIAL_NUMBER: ConstOid = Oid(&[85, 4, 5]); // 2 5 4 5
pub const AT_COUNTRY_NAME: ConstOid = Oid(&[85, 4, 6]);
pub const AT_LOCALITY_NAME: ConstOid = Oid(&[85, 4, 7]);
pub const AT_STATE_OR_PROVINCE_NAME: ConstOid = Oid(&[85, 4, 8]);
pub const AT_ORGANIZATION_NAME: ConstOid = Oid(&[85, 4, 10]);
pub const AT_ORGANIZATIONAL_UNIT_NAME: ConstOid = Oid(&[85, 4, 11]);
pub const AT_EMAIL_ADDRESS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 1]);
pub const AT_USER_ID: ConstOid
    = Oid(&[9, 146, 38, 137, 147, 242, 44, 100, 1, 1]);
pub const AT_DOMAIN_COMPONENT: ConstOid
    = Oid(&[9, 146, 38, 137, 147, 242, 44, 100, 1, 25]);


//------------ Certificate Extensions ----------------------------------------

pub const CE_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);
pub const CE_KEY_USAGE: ConstOid = Oid(&[85, 29, 15]);
pub const CE_BASIC_CONSTRAINTS: ConstOid = Oid(&[85, 29, 19]);
