//! Crypto tokens and their scoped selection.
//!
//! A crypto token is a named provider of signature verification. It may
//! also know public keys of its own, such as those of the CA’s subsystems.
//! The authenticator verifies signatures through the token currently
//! selected in a [`CryptoContext`]. Selecting a different token returns a
//! [`TokenSwitch`] guard that restores the previous selection when it is
//! dropped.

use std::{error, fmt, ops};
use std::collections::HashMap;
use std::sync::Arc;
use log::debug;
use super::keys::{PublicKey, SignatureVerificationError};
use super::signature::Signature;


//------------ Constants -----------------------------------------------------

/// The name of the token that is always available.
pub const INTERNAL_TOKEN: &str = "internal";


//------------ CryptoToken ---------------------------------------------------

/// A named provider of signature verification.
pub trait CryptoToken: Send + Sync {
    /// Returns the name of the token.
    fn name(&self) -> &str;

    /// Returns the public keys known to the token.
    fn keys(&self) -> &[PublicKey];

    /// Verifies a signature over `message` made with `key`.
    fn verify(
        &self, key: &PublicKey, message: &[u8], signature: &Signature
    ) -> Result<(), SignatureVerificationError> {
        key.verify(message, signature)
    }

    /// Returns the first of the token’s own keys that verifies a signature.
    fn verify_with_known_keys(
        &self, message: &[u8], signature: &Signature
    ) -> Option<&PublicKey> {
        self.keys().iter().find(|key| {
            self.verify(key, message, signature).is_ok()
        })
    }
}


//------------ SoftToken -----------------------------------------------------

/// A crypto token verifying in software.
#[derive(Clone, Debug)]
pub struct SoftToken {
    name: String,
    keys: Vec<PublicKey>,
}

impl SoftToken {
    /// Creates a new token without any known keys.
    pub fn new(name: impl Into<String>) -> Self {
        SoftToken { name: name.into(), keys: Vec::new() }
    }

    /// Adds a public key to the token.
    pub fn add_key(&mut self, key: PublicKey) {
        self.keys.push(key)
    }
}

impl CryptoToken for SoftToken {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[PublicKey] {
        &self.keys
    }
}


//------------ TokenRegistry -------------------------------------------------

/// The set of crypto tokens available to the authenticator.
///
/// A registry always contains a token named [`INTERNAL_TOKEN`]. A new
/// registry uses an empty [`SoftToken`] for it which can be replaced via
/// [`register`](Self::register).
pub struct TokenRegistry {
    tokens: HashMap<String, Arc<dyn CryptoToken>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        let mut res = TokenRegistry { tokens: HashMap::new() };
        res.register(Arc::new(SoftToken::new(INTERNAL_TOKEN)));
        res
    }

    /// Adds a token, replacing any token of the same name.
    pub fn register(&mut self, token: Arc<dyn CryptoToken>) {
        self.tokens.insert(token.name().into(), token);
    }

    /// Returns the token with the given name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn CryptoToken>, TokenError> {
        self.tokens.get(name).cloned().ok_or_else(|| {
            TokenError::UnknownToken(name.into())
        })
    }

    /// Returns the internal token.
    pub fn internal(&self) -> Arc<dyn CryptoToken> {
        match self.tokens.get(INTERNAL_TOKEN) {
            Some(token) => token.clone(),
            None => Arc::new(SoftToken::new(INTERNAL_TOKEN))
        }
    }

    /// Returns the names of all tokens in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut res: Vec<_> = self.tokens.keys().map(String::as_str).collect();
        res.sort_unstable();
        res
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("tokens", &self.names())
            .finish()
    }
}


//------------ CryptoContext -------------------------------------------------

/// The crypto token selection of a single authentication attempt.
///
/// A new context has the internal token selected.
pub struct CryptoContext {
    registry: Arc<TokenRegistry>,
    current: Arc<dyn CryptoToken>,
}

impl CryptoContext {
    pub fn new(registry: Arc<TokenRegistry>) -> Self {
        let current = registry.internal();
        CryptoContext { registry, current }
    }

    /// Returns the currently selected token.
    pub fn current(&self) -> &dyn CryptoToken {
        self.current.as_ref()
    }

    /// Selects the token with the given name.
    ///
    /// The selection lasts for as long as the returned guard lives. When
    /// the guard is dropped, the previously selected token is selected
    /// again.
    pub fn switch_to(
        &mut self, name: &str
    ) -> Result<TokenSwitch<'_>, TokenError> {
        let token = self.registry.get(name)?;
        let previous = std::mem::replace(&mut self.current, token);
        if previous.name() != name {
            debug!(
                "switching crypto token from '{}' to '{}'",
                previous.name(), name
            );
        }
        Ok(TokenSwitch { context: self, previous: Some(previous) })
    }
}

impl fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CryptoContext")
            .field("current", &self.current.name())
            .finish()
    }
}


//------------ TokenSwitch ---------------------------------------------------

/// A scoped selection of a crypto token.
///
/// Dereferences to the crypto context with the new token selected.
pub struct TokenSwitch<'a> {
    context: &'a mut CryptoContext,
    previous: Option<Arc<dyn CryptoToken>>,
}

impl ops::Deref for TokenSwitch<'_> {
    type Target = CryptoContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl ops::DerefMut for TokenSwitch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for TokenSwitch<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if previous.name() != self.context.current.name() {
                debug!(
                    "restoring crypto token '{}'", previous.name()
                );
            }
            self.context.current = previous;
        }
    }
}


//------------ TokenError ----------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenError {
    /// No token with the given name is registered.
    UnknownToken(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TokenError::UnknownToken(ref name) => {
                write!(f, "unknown crypto token '{}'", name)
            }
        }
    }
}

impl error::Error for TokenError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::crypto::{PublicKeyFormat, Signer};
    use crate::crypto::softsigner::SoftSigner;
    use super::*;

    fn registry() -> Arc<TokenRegistry> {
        let mut registry = TokenRegistry::new();
        registry.register(Arc::new(SoftToken::new("hsm")));
        Arc::new(registry)
    }

    #[test]
    fn switch_and_restore() {
        let mut context = CryptoContext::new(registry());
        assert_eq!(context.current().name(), INTERNAL_TOKEN);
        {
            let switch = context.switch_to("hsm").unwrap();
            assert_eq!(switch.current().name(), "hsm");
        }
        assert_eq!(context.current().name(), INTERNAL_TOKEN);
    }

    #[test]
    fn nested_switch() {
        let mut context = CryptoContext::new(registry());
        {
            let mut outer = context.switch_to("hsm").unwrap();
            {
                let inner = outer.switch_to(INTERNAL_TOKEN).unwrap();
                assert_eq!(inner.current().name(), INTERNAL_TOKEN);
            }
            assert_eq!(outer.current().name(), "hsm");
        }
        assert_eq!(context.current().name(), INTERNAL_TOKEN);
    }

    #[test]
    fn restore_on_early_return() {
        fn failing(context: &mut CryptoContext) -> Result<(), TokenError> {
            let switch = context.switch_to("hsm")?;
            assert_eq!(switch.current().name(), "hsm");
            Err(TokenError::UnknownToken("oops".into()))
        }

        let mut context = CryptoContext::new(registry());
        assert!(failing(&mut context).is_err());
        assert_eq!(context.current().name(), INTERNAL_TOKEN);
    }

    #[test]
    fn unknown_token() {
        let mut context = CryptoContext::new(registry());
        assert_eq!(
            context.switch_to("nope").err(),
            Some(TokenError::UnknownToken("nope".into()))
        );
        assert_eq!(context.current().name(), INTERNAL_TOKEN);
    }

    #[test]
    fn known_keys() {
        let signer = SoftSigner::new();
        let key = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let other = signer.create_key(PublicKeyFormat::EcdsaP256).unwrap();
        let mut token = SoftToken::new("hsm");
        token.add_key(signer.get_key_info(&other).unwrap());
        token.add_key(signer.get_key_info(&key).unwrap());

        let sig = signer.sign_default(&key, b"foo").unwrap();
        assert_eq!(
            token.verify_with_known_keys(b"foo", &sig),
            Some(&signer.get_key_info(&key).unwrap())
        );
        assert_eq!(token.verify_with_known_keys(b"bar", &sig), None);
    }
}
