//! Handling of Base 64-encoded data.
//!
//! This module provides various methods for decoding and encoding data in
//! Base 64. Because there are different dialects of Base 64 and applications
//! again place slight differences atop those, the module provides a number
//! of structs that describe flavors of Base 64 used within a certain
//! context. That is, you don’t have to remember how an application uses
//! Base 64 exactly but just pick your application.
use std::str;
use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

pub use base64::DecodeError;


//------------ Cmc -----------------------------------------------------------

/// The flavor used for CMC requests submitted by agents.
///
/// Requests arrive either as a plain Base 64 blob or wrapped into PEM
/// armour, i.e., enclosed by `-----BEGIN …-----` and `-----END …-----`
/// lines. Line breaks and other white space may appear anywhere. The
/// standard alphabet is used and padding is optional when decoding.
pub struct Cmc;

impl Cmc {
    const ENGINE: GeneralPurpose = GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    );

    /// Decodes plain Base 64 data without white space.
    pub fn decode(self, input: &str) -> Result<Vec<u8>, DecodeError> {
        Self::ENGINE.decode(input)
    }

    /// Decodes a possibly PEM-armoured and line-wrapped blob.
    ///
    /// Any line starting with five dashes is dropped before decoding, as is
    /// all white space.
    pub fn decode_armored(self, input: &str) -> Result<Vec<u8>, DecodeError> {
        let mut stripped = String::with_capacity(input.len());
        for line in input.lines() {
            let line = line.trim();
            if line.starts_with("-----") {
                continue
            }
            stripped.extend(line.chars().filter(|ch| !ch.is_whitespace()));
        }
        Self::ENGINE.decode(stripped)
    }

    /// Same as `decode_armored` but starting from raw octets.
    pub fn decode_armored_bytes(
        self, input: &[u8]
    ) -> Result<Vec<u8>, DecodeError> {
        let input = str::from_utf8(input).map_err(|err| {
            let pos = err.valid_up_to();
            DecodeError::InvalidByte(pos, input[pos])
        })?;
        self.decode_armored(input)
    }

    pub fn encode(self, data: &[u8]) -> String {
        Self::ENGINE.encode(data)
    }

    /// Encodes data into PEM armour with the given label.
    ///
    /// Lines are wrapped after 64 characters.
    pub fn encode_armored(self, label: &str, data: &[u8]) -> String {
        let encoded = Self::ENGINE.encode(data);
        let mut res = format!("-----BEGIN {}-----\n", label);
        for chunk in encoded.as_bytes().chunks(64) {
            // The engine only produces ASCII.
            res.push_str(&String::from_utf8_lossy(chunk));
            res.push('\n');
        }
        res.push_str(&format!("-----END {}-----\n", label));
        res
    }
}


//============ Tests =========================================================
