//! PKCS #10 certification requests.
//!
//! Certification requests are defined in [RFC 2986]. In CMC, they are one
//! of the two forms in which an agent can ask for a certificate. The request
//! carries the requested subject and public key and is signed with the
//! private key of the latter as proof of possession.
//!
//! [RFC 2986]: https://tools.ietf.org/html/rfc2986

use bcder::{decode, encode};
use bcder::{Captured, Mode, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::PrimitiveContent;
use crate::crypto::{
    PublicKey, SignatureVerificationError, Signer, SigningError
};
use crate::x509::{Name, SignedData};


//------------ CertificationRequest ------------------------------------------

/// A PKCS #10 certification request.
///
/// ```txt
/// CertificationRequest ::= SEQUENCE {
///      certificationRequestInfo CertificationRequestInfo,
///      signatureAlgorithm       AlgorithmIdentifier,
///      signature                BIT STRING }
///
/// CertificationRequestInfo ::= SEQUENCE {
///      version       INTEGER { v1(0) },
///      subject       Name,
///      subjectPKInfo SubjectPublicKeyInfo,
///      attributes    [0] IMPLICIT SET OF Attribute }
/// ```
///
/// The attributes are kept in their encoded form.
#[derive(Clone, Debug)]
pub struct CertificationRequest {
    /// The outer structure of the request.
    signed_data: SignedData,

    /// The requested subject.
    subject: Name,

    /// The public key to be certified.
    public_key: PublicKey,

    /// The content of the attributes set.
    attributes: Captured,
}

/// # Data Access
///
impl CertificationRequest {
    /// The subject name requested for the certificate.
    ///
    /// This may be an empty name.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Returns the public key for the requested certificate.
    ///
    /// Note that [`verify_signature`](Self::verify_signature) should be
    /// called to ensure that the requester has possession of the private
    /// key for this public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the encoded content of the attributes.
    pub fn attributes(&self) -> &Captured {
        &self.attributes
    }
}

/// # Decode, Encode, and Validate
///
impl CertificationRequest {
    /// Parses a source as a certification request.
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source.into_source(), Self::take_from)
    }

    /// Takes an encoded request from the beginning of a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the content of a certification request.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let signed_data = SignedData::from_constructed(cons)?;
        let (subject, public_key, attributes) = signed_data.data().clone()
            .decode(|cons| {
                cons.take_sequence(|cons| {
                    cons.skip_u8_if(0)?; // version MUST be 0, cause v1
                    let subject = Name::take_from(cons)?;
                    let public_key = PublicKey::take_from(cons)?;
                    let attributes = cons.take_constructed_if(
                        Tag::CTX_0, |cons| cons.capture(|cons| {
                            cons.skip_all()
                        })
                    )?;
                    Ok((subject, public_key, attributes))
                })
            }).map_err(DecodeError::convert)?;
        Ok(Self { signed_data, subject, public_key, attributes })
    }

    /// Verifies the request’s signature against its own public key.
    ///
    /// This is the proof that the requester possesses the private key.
    pub fn verify_signature(&self) -> Result<(), SignatureVerificationError> {
        self.signed_data.verify_signature(&self.public_key)
    }

    /// Returns the signed data of the request.
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// Returns a value encoder for a reference to the request.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        self.signed_data.encode_ref()
    }

    /// Returns a captured encoding of the request.
    pub fn to_captured(&self) -> Captured {
        Captured::from_values(Mode::Der, self.encode_ref())
    }
}

/// # Construct
///
impl CertificationRequest {
    /// Builds a new request for the given subject.
    ///
    /// The public key of `key` is requested and the request is signed with
    /// the key’s default signature algorithm. No attributes are included.
    pub fn construct<S: Signer>(
        signer: &S,
        key: &S::KeyId,
        subject: Name,
    ) -> Result<Self, SigningError<S::Error>> {
        let public_key = signer.get_key_info(key)?;
        let attributes = Captured::empty(Mode::Der);
        let content = Captured::from_values(Mode::Der, encode::sequence((
            0_u32.encode(),
            subject.encode_ref(),
            public_key.encode_ref(),
            encode::sequence_as(Tag::CTX_0, &attributes),
        )));
        let signature = signer.sign_default(key, &content)?;
        Ok(CertificationRequest {
            signed_data: SignedData::new(content, signature),
            subject,
            public_key,
            attributes,
        })
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use crate::crypto::PublicKeyFormat;
    use crate::crypto::softsigner::SoftSigner;
    use super::*;

    #[test]
    fn construct_decode_verify() {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let subject = Name::from_str("CN=Jane Doe, O=Example").unwrap();
        let csr = CertificationRequest::construct(
            &signer, &key, subject.clone()
        ).unwrap();
        let decoded = CertificationRequest::decode(
            csr.to_captured().into_bytes()
        ).unwrap();
        assert_eq!(decoded.subject(), &subject);
        assert_eq!(
            decoded.public_key(), &signer.get_key_info(&key).unwrap()
        );
        assert!(decoded.attributes().as_slice().is_empty());
        decoded.verify_signature().unwrap();
    }

    #[test]
    fn empty_subject() {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP384).unwrap();
        let csr = CertificationRequest::construct(
            &signer, &key, Name::empty()
        ).unwrap();
        let decoded = CertificationRequest::decode(
            csr.to_captured().into_bytes()
        ).unwrap();
        assert!(decoded.subject().is_empty());
        decoded.verify_signature().unwrap();
    }

    #[test]
    fn tampered_signature() {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let other = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let csr = CertificationRequest::construct(
            &signer, &key, Name::from_str("CN=Jane Doe").unwrap()
        ).unwrap();

        // Replace the signature with one made by another key.
        let signature = signer.sign_default(
            &other, csr.signed_data().data()
        ).unwrap();
        let forged = SignedData::new(
            csr.signed_data().data().clone(), signature
        );
        let forged = CertificationRequest::decode(
            forged.to_bytes()
        ).unwrap();
        assert!(forged.verify_signature().is_err());
    }
}
