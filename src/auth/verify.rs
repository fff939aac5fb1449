//! Verifying the signature of a CMC request.

use std::collections::HashMap;
use log::{debug, error, warn};
use crate::cert::Cert;
use crate::cmc::{CmcEnvelope, SignerIdentifier, SignerInfo};
use crate::crypto::{CryptoContext, CryptoToken, Digest, DigestAlgorithm};
use super::error::AuthError;
use super::trust::CertStore;


//------------ verify_signer_info --------------------------------------------

/// Verifies the signer infos of a request and returns the signer.
///
/// All signer infos are verified in order using the crypto token named
/// `token_name`. The first signer info whose certificate can be found
/// either among the certificates of the request or in `store` and whose
/// signature verifies determines the signer. Signer infos without a
/// certificate are verified against the keys known to the token. Any
/// signer info that fails verification fails the whole request.
///
/// The token selection of `context` is restored before returning.
pub(crate) fn verify_signer_info(
    envelope: &CmcEnvelope,
    store: &dyn CertStore,
    context: &mut CryptoContext,
    token_name: &str,
) -> Result<Cert, AuthError> {
    let switch = context.switch_to(token_name).map_err(|err| {
        error!("cannot select crypto token: {}", err);
        AuthError::internal(err.to_string())
    })?;
    let token = switch.current();

    let content = envelope.content().to_bytes();
    let digests: HashMap<_, _> = envelope.digest_algorithms().iter().map(
        |&alg| (alg, alg.digest(content.as_ref()))
    ).collect();

    for info in envelope.signer_infos() {
        let digest = match digests.get(&info.digest_algorithm()) {
            Some(digest) => digest.clone(),
            None => fallback_digest(envelope, info.digest_algorithm()),
        };
        match find_signer_cert(envelope, store, info.sid()) {
            Some(cert) => {
                debug!("found signing certificate, verifying");
                info.verify(
                    envelope.content_type(), content.as_ref(),
                    digest.as_ref(), cert.subject_public_key_info(), token
                ).map_err(|err| {
                    error!("signature of signer {} invalid: {}",
                        info.sid(), err
                    );
                    AuthError::invalid("signature verification failed")
                })?;
                debug!("signature of signer {} verified", info.sid());
                return Ok(cert)
            }
            None => {
                verify_with_known_keys(
                    envelope, info, content.as_ref(), &digest, token
                )?;
            }
        }
    }
    error!("no signer of the request has a known certificate");
    Err(AuthError::invalid("signer certificate not found"))
}

/// Calculates the digest for an algorithm not declared in the request.
///
/// The signature is checked against a digest over the encoded PKI data.
/// Since the PKI data is kept as it was encoded in the request, this is
/// normally the digest of the content.
fn fallback_digest(envelope: &CmcEnvelope, alg: DigestAlgorithm) -> Digest {
    warn!(
        "digest algorithm {} not declared in request, \
         re-hashing PKI data", alg
    );
    alg.digest(envelope.pki_data().as_slice())
}

/// Finds the certificate for a signer.
///
/// Embedded certificates take precedence over the store. The store can
/// only be asked for signers identified by issuer and serial number.
fn find_signer_cert(
    envelope: &CmcEnvelope,
    store: &dyn CertStore,
    sid: &SignerIdentifier,
) -> Option<Cert> {
    if let Some(cert) = envelope.find_certificate(sid) {
        return Some(cert.clone())
    }
    match *sid {
        SignerIdentifier::IssuerAndSerial { ref issuer, ref serial } => {
            debug!("signer {} not embedded, asking certificate store", sid);
            store.resolve(issuer, serial)
        }
        SignerIdentifier::KeyIdentifier(_) => None
    }
}

/// Verifies a signer info without a certificate.
fn verify_with_known_keys(
    envelope: &CmcEnvelope,
    info: &SignerInfo,
    content: &[u8],
    digest: &Digest,
    token: &dyn CryptoToken,
) -> Result<(), AuthError> {
    debug!("no certificate for signer {}, trying token keys", info.sid());
    info.check_signed_attrs(
        envelope.content_type(), digest.as_ref()
    ).map_err(|err| {
        error!("signer {}: {}", info.sid(), err);
        AuthError::invalid("signature verification failed")
    })?;
    match token.verify_with_known_keys(
        &info.signed_message(content), info.signature()
    ) {
        Some(_) => {
            debug!("signer {} verified with a key of token '{}'",
                info.sid(), token.name()
            );
            Ok(())
        }
        None => {
            error!(
                "no key of token '{}' verifies signer {}",
                token.name(), info.sid()
            );
            Err(AuthError::invalid("signer certificate not found"))
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use std::sync::Arc;
    use bytes::Bytes;
    use chrono::TimeDelta;
    use crate::cert::TbsCert;
    use crate::cmc::{PkiDataBuilder, SignedRequestBuilder};
    use crate::crypto::{
        PublicKeyFormat, Signer, SoftToken, TokenRegistry, INTERNAL_TOKEN
    };
    use crate::crypto::softsigner::{KeyId, SoftSigner};
    use crate::x509::{Name, Serial, Validity};
    use super::*;

    fn agent(signer: &SoftSigner) -> (Cert, KeyId) {
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let cert = TbsCert::new(
            Serial::from(7),
            Name::from_str("CN=Test CA").unwrap(),
            Validity::from_duration(TimeDelta::days(1)),
            Name::from_str("CN=Agent").unwrap(),
            signer.get_key_info(&key).unwrap(),
            PublicKeyFormat::EcdsaP256.default_signature_algorithm(),
        ).into_cert(signer, &key).unwrap();
        (cert, key)
    }

    fn context(token: Option<SoftToken>) -> CryptoContext {
        let mut registry = TokenRegistry::new();
        if let Some(token) = token {
            registry.register(Arc::new(token));
        }
        CryptoContext::new(Arc::new(registry))
    }

    fn request(
        builder: SignedRequestBuilder, signer: &SoftSigner, key: &KeyId
    ) -> CmcEnvelope {
        CmcEnvelope::decode(
            builder.finalize(PkiDataBuilder::new().finalize(), signer, key)
                .unwrap()
        ).unwrap()
    }

    #[test]
    fn embedded_signer() {
        let signer = SoftSigner::new();
        let (cert, key) = agent(&signer);
        let envelope = request(
            SignedRequestBuilder::new(cert.clone()), &signer, &key
        );
        let mut context = context(None);
        assert_eq!(
            verify_signer_info(
                &envelope, &Vec::<Cert>::new(), &mut context, INTERNAL_TOKEN
            ).unwrap(),
            cert
        );
    }

    #[test]
    fn signer_from_store() {
        let signer = SoftSigner::new();
        let (cert, key) = agent(&signer);
        let mut builder = SignedRequestBuilder::new(cert.clone());
        builder.set_embed_cert(false);
        let envelope = request(builder, &signer, &key);
        let mut context = context(None);
        assert!(
            verify_signer_info(
                &envelope, &Vec::<Cert>::new(), &mut context, INTERNAL_TOKEN
            ).unwrap_err().is_invalid_credentials()
        );
        assert_eq!(
            verify_signer_info(
                &envelope, &vec![cert.clone()], &mut context, INTERNAL_TOKEN
            ).unwrap(),
            cert
        );
    }

    #[test]
    fn wrong_key() {
        let signer = SoftSigner::new();
        let (cert, _) = agent(&signer);
        let other = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let envelope = request(
            SignedRequestBuilder::new(cert), &signer, &other
        );
        let mut context = context(None);
        assert!(
            verify_signer_info(
                &envelope, &Vec::<Cert>::new(), &mut context, INTERNAL_TOKEN
            ).unwrap_err().is_invalid_credentials()
        );
    }

    #[test]
    fn token_keys_do_not_identify() {
        let signer = SoftSigner::new();
        let (cert, key) = agent(&signer);
        let mut builder = SignedRequestBuilder::new(cert);
        builder.set_embed_cert(false);
        let envelope = request(builder, &signer, &key);

        let mut token = SoftToken::new("hsm");
        token.add_key(signer.get_key_info(&key).unwrap());
        let mut context = context(Some(token));
        let err = verify_signer_info(
            &envelope, &Vec::<Cert>::new(), &mut context, "hsm"
        ).unwrap_err();
        assert_eq!(err.reason(), "signer certificate not found");
        assert_eq!(context.current().name(), INTERNAL_TOKEN);
    }

    #[test]
    fn unknown_token() {
        let signer = SoftSigner::new();
        let (cert, key) = agent(&signer);
        let envelope = request(SignedRequestBuilder::new(cert), &signer, &key);
        let mut context = context(None);
        assert!(
            verify_signer_info(
                &envelope, &Vec::<Cert>::new(), &mut context, "hsm"
            ).unwrap_err().is_internal_error()
        );
    }

    #[test]
    fn undeclared_digest_algorithm() {
        let signer = SoftSigner::new();
        let (cert, key) = agent(&signer);
        let mut builder = SignedRequestBuilder::new(cert.clone());
        builder.set_declare_digest_algorithm(false);
        let envelope = request(builder, &signer, &key);
        assert!(envelope.digest_algorithms().is_empty());
        let mut context = context(None);
        assert_eq!(
            verify_signer_info(
                &envelope, &Vec::<Cert>::new(), &mut context, INTERNAL_TOKEN
            ).unwrap(),
            cert
        );
    }

    #[test]
    fn digest_fallback() {
        let signer = SoftSigner::new();
        let (cert, key) = agent(&signer);
        let content = PkiDataBuilder::new().finalize();
        let envelope = request(
            SignedRequestBuilder::new(cert), &signer, &key
        );
        let digest = fallback_digest(&envelope, DigestAlgorithm::Sha256);
        assert_eq!(
            digest.as_ref(),
            DigestAlgorithm::Sha256.digest(content.as_ref()).as_ref()
        );
        assert_eq!(
            Bytes::copy_from_slice(envelope.pki_data().as_slice()), content
        );
    }
}
