//! Certificate Management over CMS.
//!
//! This module contains the types for full CMC requests as defined in
//! [RFC 5272]: the signed envelope in [`envelope`], its content in
//! [`pkidata`], and builders for creating requests in [`builder`].
//!
//! [RFC 5272]: https://tools.ietf.org/html/rfc5272

pub use self::builder::{PkiDataBuilder, SignedRequestBuilder};
pub use self::envelope::{
    BlobError, CmcEnvelope, MessageDigest, SignedAttrs, SignerIdentifier,
    SignerInfo, VerificationError,
};
pub use self::pkidata::{
    BodyPartId, PkiData, RevocationReason, RevokeRequest, TaggedAttribute,
    TaggedRequest,
};

pub mod builder;
pub mod envelope;
pub mod pkidata;
