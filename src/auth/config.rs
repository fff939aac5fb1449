//! Configuration of the authenticator.

use crate::crypto::INTERNAL_TOKEN;


//------------ CmcAuthConfig -------------------------------------------------

/// The policy settings of a [`CmcAuth`](super::CmcAuth) authenticator.
///
/// With the `serde` feature enabled, the configuration can be
/// deserialized. Field names are in kebab case and missing fields take
/// their default value.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct CmcAuthConfig {
    /// Whether the signature of the request is verified.
    ///
    /// Disabling this skips signature verification and the binding to the
    /// TLS client certificate entirely. The token then names the default
    /// user [`DEFAULT_USER`](super::DEFAULT_USER). Defaults to `true`.
    pub verify_signer_info: bool,

    /// Whether a missing TLS client certificate is tolerated.
    ///
    /// Defaults to `false`.
    pub bypass_client_auth: bool,

    /// The name of the crypto token used for verification.
    ///
    /// Defaults to the internal token.
    pub verify_token: String,

    /// Whether the proof of possession of PKCS #10 requests is checked.
    ///
    /// Defaults to `true`.
    pub request_verify: bool,
}

impl CmcAuthConfig {
    /// Returns the name of the token used for verification.
    ///
    /// An empty token name selects the internal token.
    pub fn verify_token_name(&self) -> &str {
        if self.verify_token.is_empty() {
            INTERNAL_TOKEN
        }
        else {
            &self.verify_token
        }
    }
}

impl Default for CmcAuthConfig {
    fn default() -> Self {
        CmcAuthConfig {
            verify_signer_info: true,
            bypass_client_auth: false,
            verify_token: INTERNAL_TOKEN.into(),
            request_verify: true,
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = CmcAuthConfig::default();
        assert!(config.verify_signer_info);
        assert!(!config.bypass_client_auth);
        assert!(config.request_verify);
        assert_eq!(config.verify_token_name(), INTERNAL_TOKEN);
        let config = CmcAuthConfig {
            verify_token: String::new(), .. Default::default()
        };
        assert_eq!(config.verify_token_name(), INTERNAL_TOKEN);
    }

    #[test]
    #[cfg(feature = "serde")]
    fn deserialize_partial() {
        let config: CmcAuthConfig = serde_json::from_str(
            r#"{ "bypass-client-auth": true, "verify-token": "hsm" }"#
        ).unwrap();
        assert_eq!(
            config,
            CmcAuthConfig {
                bypass_client_auth: true,
                verify_token: "hsm".into(),
                .. Default::default()
            }
        );
        assert_eq!(config.verify_token_name(), "hsm");
    }

    #[test]
    #[cfg(feature = "serde")]
    fn serde_tokens() {
        use serde_test::{assert_tokens, Token};

        assert_tokens(
            &CmcAuthConfig::default(),
            &[
                Token::Struct { name: "CmcAuthConfig", len: 4 },
                Token::Str("verify-signer-info"),
                Token::Bool(true),
                Token::Str("bypass-client-auth"),
                Token::Bool(false),
                Token::Str("verify-token"),
                Token::Str("internal"),
                Token::Str("request-verify"),
                Token::Bool(true),
                Token::StructEnd,
            ]
        );
    }
}
