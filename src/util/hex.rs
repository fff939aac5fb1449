//! Converting octets into hex strings.

use std::fmt;


/// Encodes an octet sequence as an upper case hex string.
pub fn encode_string(src: &[u8]) -> String {
    let mut res = String::with_capacity(src.len() * 2);
    for &ch in src {
        let [hi, lo] = encode_u8(ch);
        res.push(char::from(hi));
        res.push(char::from(lo));
    }
    res
}

/// Returns the two hex digits for a single octet.
pub fn encode_u8(ch: u8) -> [u8; 2] {
    [DIGITS[usize::from(ch >> 4)], DIGITS[usize::from(ch & 0x0F)]]
}

/// Returns a value displaying the octets as hex, separated by colons.
///
/// This is the customary format for key identifiers and fingerprints.
pub fn colon_display(src: &[u8]) -> impl fmt::Display + '_ {
    struct ColonHex<'a>(&'a [u8]);

    impl fmt::Display for ColonHex<'_> {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            for (idx, &ch) in self.0.iter().enumerate() {
                if idx > 0 {
                    f.write_str(":")?;
                }
                let [hi, lo] = encode_u8(ch);
                write!(f, "{}{}", char::from(hi), char::from(lo))?;
            }
            Ok(())
        }
    }

    ColonHex(src)
}

const DIGITS: &[u8] = b"0123456789ABCDEF";


//============ Tests =========================================================
