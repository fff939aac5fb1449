//! Types common to all things X.509.

use std::{error, fmt, io, ops, str};
use std::convert::Infallible;
use std::str::FromStr;
use bcder::{decode, encode};
use bcder::{
    BitString, Captured, ConstOid, Mode, OctetString, Oid, Tag, Unsigned,
};
use bcder::decode::{ContentError, DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use chrono::{Datelike, DateTime, LocalResult, TimeDelta, Timelike};
use chrono::{TimeZone, Utc};
use crate::oid;
use crate::crypto::{
    PublicKey, Signature, SignatureAlgorithm, SignatureVerificationError
};
use crate::util::hex;


//------------ Functions -----------------------------------------------------

/// Skips over the content of a value of any kind.
pub(crate) fn skip_content<S: decode::Source>(
    content: &mut decode::Content<S>
) -> Result<(), DecodeError<S::Error>> {
    match content {
        decode::Content::Primitive(prim) => prim.skip_all(),
        decode::Content::Constructed(cons) => cons.skip_all(),
    }
}

/// Returns an encoder for a single certificate extension.
pub fn encode_extension<V: encode::Values>(
    oid: &'static ConstOid,
    critical: bool,
    content: V
) -> impl encode::Values {
    encode::sequence((
        oid.encode_ref(),
        if critical {
            Some(critical.encode())
        }
        else {
            None
        },
        OctetString::encode_wrapped(Mode::Der, content)
    ))
}


//------------ Name ----------------------------------------------------------

/// A distinguished name.
///
/// The name is kept in its encoded form. Two names are equal if their
/// encodings are identical. This is the comparison used when binding the
/// TLS client certificate to the signer of a request.
///
/// The `Display` implementation produces the customary string form, with
/// the relative distinguished names in reverse order, e.g.,
/// `CN=Agent, O=Example`. The same form can be parsed via `FromStr`.
#[derive(Clone, Debug)]
pub struct Name(Captured);

impl Name {
    /// Takes an encoded name from the beginning of a constructed value.
    ///
    /// An empty sequence of relative distinguished names is accepted since
    /// certification requests may leave the subject empty.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.capture(|cons| {
            cons.take_sequence(|cons| { // RDNSequence
                while let Some(()) = cons.take_opt_set(|cons| {
                    let mut empty_set = true;
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        empty_set = false;
                        Oid::skip_in(cons)?;
                        if cons.skip_one()?.is_none() {
                            return Err(cons.content_err(
                                "invalid name"
                            ))
                        }
                        Ok(())
                    })? { }
                    if empty_set {
                        return Err(cons.content_err(
                            "empty relative distinguished name"
                        ));
                    }
                    Ok(())
                })? { }
                Ok(())
            })
        }).map(Name)
    }

    /// Creates an empty name.
    pub fn empty() -> Self {
        Name(Captured::from_values(
            Mode::Der, encode::sequence(Captured::empty(Mode::Der))
        ))
    }

    /// Returns whether the name has no relative distinguished names.
    pub fn is_empty(&self) -> bool {
        // An empty sequence is encoded as exactly two octets.
        self.0.as_slice().len() == 2
    }

    /// Returns the encoded name.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns the value of the first attribute with the given type.
    pub fn first_value(&self, attr: &ConstOid) -> Option<String> {
        self.attributes().ok()?.into_iter().flatten().find_map(
            |(oid, value)| {
                if oid == *attr {
                    Some(value)
                }
                else {
                    None
                }
            }
        )
    }

    /// Returns the common name if there is one.
    pub fn common_name(&self) -> Option<String> {
        self.first_value(&oid::AT_COMMON_NAME)
    }

    /// Decodes the attributes of the name.
    ///
    /// Returns the relative distinguished names in encoding order. Values
    /// that aren’t strings are returned as a hash sign followed by the hex
    /// encoding of their content.
    fn attributes(
        &self
    ) -> Result<Vec<Vec<(Oid, String)>>, DecodeError<Infallible>> {
        self.0.clone().decode(|cons| {
            cons.take_sequence(|cons| {
                let mut res = Vec::new();
                while let Some(rdn) = cons.take_opt_set(|cons| {
                    let mut rdn = Vec::new();
                    while let Some(attr) = cons.take_opt_sequence(|cons| {
                        Ok((
                            Oid::take_from(cons)?,
                            take_attribute_value(cons)?
                        ))
                    })? {
                        rdn.push(attr)
                    }
                    Ok(rdn)
                })? {
                    res.push(rdn)
                }
                Ok(res)
            })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        &self.0
    }
}

/// Takes an attribute value and converts it into a string.
fn take_attribute_value<S: decode::Source>(
    cons: &mut decode::Constructed<S>
) -> Result<String, DecodeError<S::Error>> {
    cons.take_value(|tag, content| {
        let bytes = content.as_primitive()?.take_all()?;
        if tag == Tag::BMP_STRING {
            let units: Vec<u16> = bytes.chunks(2).map(|chunk| {
                u16::from_be_bytes([
                    chunk[0], chunk.get(1).copied().unwrap_or(0)
                ])
            }).collect();
            Ok(String::from_utf16_lossy(&units))
        }
        else if tag == Tag::UTF8_STRING
            || tag == Tag::PRINTABLE_STRING
            || tag == Tag::IA5_STRING
            || tag == Tag::TELETEX_STRING
            || tag == Tag::VISIBLE_STRING
        {
            Ok(String::from_utf8_lossy(bytes.as_ref()).into_owned())
        }
        else {
            Ok(format!("#{}", hex::encode_string(bytes.as_ref())))
        }
    })
}


//--- PartialEq and Eq

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for Name {}


//--- FromStr

impl FromStr for Name {
    type Err = NameError;

    /// Parses a name from its string form.
    ///
    /// The relative distinguished names are separated by commas and are
    /// given in reverse order. Multi-valued relative distinguished names
    /// are not supported. Special characters in values can be escaped with
    /// a backslash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rdns = Vec::new();
        for part in split_unescaped(s, ',') {
            let part = part.trim();
            if part.is_empty() {
                if s.trim().is_empty() {
                    continue
                }
                return Err(NameError)
            }
            let (label, value) = part.split_once('=').ok_or(NameError)?;
            let (attr, tag) = AttributeLabel::from_label(label.trim())
                .ok_or(NameError)?;
            rdns.push((attr, tag, unescape(value.trim())));
        }
        rdns.reverse();
        Ok(Name(Captured::from_values(Mode::Der, encode::sequence(
            encode::iter(rdns.iter().map(|(attr, tag, value)| {
                encode::set(encode::sequence((
                    attr.encode_ref(),
                    OctetString::encode_slice_as(value.as_bytes(), *tag),
                )))
            }))
        ))))
    }
}

/// Splits a string at every separator not preceded by a backslash.
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut res = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
        }
        else if ch == '\\' {
            escaped = true;
        }
        else if ch == sep {
            res.push(&s[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    res.push(&s[start..]);
    res
}

fn unescape(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(ch) = chars.next() {
                res.push(ch)
            }
        }
        else {
            res.push(ch)
        }
    }
    res
}


//--- Display

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let attrs = match self.attributes() {
            Ok(attrs) => attrs,
            Err(_) => {
                return write!(f, "#{}", hex::encode_string(self.as_slice()))
            }
        };
        let mut first = true;
        for rdn in attrs.iter().rev() {
            if first {
                first = false
            }
            else {
                f.write_str(", ")?;
            }
            let mut first_attr = true;
            for (attr, value) in rdn {
                if first_attr {
                    first_attr = false
                }
                else {
                    f.write_str("+")?;
                }
                match AttributeLabel::label(attr) {
                    Some(label) => f.write_str(label)?,
                    None => write!(f, "{}", attr)?,
                }
                f.write_str("=")?;
                for ch in value.chars() {
                    if matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';') {
                        write!(f, "\\{}", ch)?;
                    }
                    else {
                        write!(f, "{}", ch)?;
                    }
                }
            }
        }
        Ok(())
    }
}


//------------ AttributeLabel ------------------------------------------------

/// The well-known attribute types and their labels.
struct AttributeLabel;

impl AttributeLabel {
    const LABELS: &'static [(&'static str, &'static ConstOid, Tag)] = &[
        ("CN", &oid::AT_COMMON_NAME, Tag::UTF8_STRING),
        ("SERIALNUMBER", &oid::AT_SERIAL_NUMBER, Tag::PRINTABLE_STRING),
        ("C", &oid::AT_COUNTRY_NAME, Tag::PRINTABLE_STRING),
        ("L", &oid::AT_LOCALITY_NAME, Tag::UTF8_STRING),
        ("ST", &oid::AT_STATE_OR_PROVINCE_NAME, Tag::UTF8_STRING),
        ("O", &oid::AT_ORGANIZATION_NAME, Tag::UTF8_STRING),
        ("OU", &oid::AT_ORGANIZATIONAL_UNIT_NAME, Tag::UTF8_STRING),
        ("E", &oid::AT_EMAIL_ADDRESS, Tag::IA5_STRING),
        ("UID", &oid::AT_USER_ID, Tag::UTF8_STRING),
        ("DC", &oid::AT_DOMAIN_COMPONENT, Tag::IA5_STRING),
    ];

    fn label<T: AsRef<[u8]>>(attr: &Oid<T>) -> Option<&'static str> {
        Self::LABELS.iter().find_map(|(label, oid, _)| {
            if *oid == attr {
                Some(*label)
            }
            else {
                None
            }
        })
    }

    fn from_label(label: &str) -> Option<(&'static ConstOid, Tag)> {
        Self::LABELS.iter().find_map(|(item, oid, tag)| {
            if item.eq_ignore_ascii_case(label) {
                Some((*oid, *tag))
            }
            else {
                None
            }
        })
    }
}


//------------ Serial --------------------------------------------------------

/// A certificate serial number.
///
/// Serial numbers are non-negative integers of arbitrary size. Certificates
/// issued by older software may use more than the 20 octets allowed by
/// RFC 5280, so there is no limit.
//
//  We keep the big-endian magnitude without leading zeros. Zero is a single
//  zero octet.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Serial(Bytes);

impl Serial {
    /// Creates a serial number from its big-endian magnitude.
    ///
    /// Leading zeros are ignored. An empty slice is zero.
    pub fn from_slice(s: &[u8]) -> Self {
        let start = s.iter().position(|&ch| ch != 0).unwrap_or(s.len());
        if start == s.len() {
            Serial(Bytes::from_static(b"\0"))
        }
        else {
            Serial(Bytes::copy_from_slice(&s[start..]))
        }
    }

    /// Returns the big-endian magnitude of the serial number.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Takes a serial number from the beginning of a constructed value.
    ///
    /// Negative serial numbers are rejected.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        Unsigned::take_from(cons).map(|value| {
            Self::from_slice(value.as_ref())
        })
    }

    fn is_zero(&self) -> bool {
        self.0.as_ref() == b"\0"
    }

    /// Divides the magnitude by `rhs` and returns the remainder.
    fn div_rem_u8(digits: &mut [u8], rhs: u8) -> u8 {
        let mut step: u16 = 0;
        let rhs = u16::from(rhs);
        for digit in digits.iter_mut() {
            step = (step << 8) + u16::from(*digit);
            *digit = (step / rhs) as u8;
            step %= rhs;
        }
        step as u8
    }

    fn to_decimal(&self) -> String {
        if self.is_zero() {
            return "0".into()
        }
        let mut digits = self.0.to_vec();
        let mut res = Vec::new();
        while digits.iter().any(|&ch| ch != 0) {
            res.push(Self::div_rem_u8(&mut digits, 10) + b'0');
        }
        res.reverse();
        res.into_iter().map(char::from).collect()
    }
}


//--- From and FromStr

impl From<u64> for Serial {
    fn from(value: u64) -> Self {
        Self::from_slice(value.to_be_bytes().as_ref())
    }
}

impl FromStr for Serial {
    type Err = SerialError;

    /// Parses a serial number from its decimal representation.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err(SerialError)
        }
        let mut res: Vec<u8> = vec![0];
        for ch in value.chars() {
            let mut carry = match ch.to_digit(10) {
                Some(digit) => digit as u16,
                None => return Err(SerialError)
            };
            for octet in res.iter_mut().rev() {
                let step = u16::from(*octet) * 10 + carry;
                *octet = step as u8;
                carry = step >> 8;
            }
            if carry != 0 {
                res.insert(0, carry as u8)
            }
        }
        Ok(Self::from_slice(&res))
    }
}


//--- Display and Debug

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl fmt::Debug for Serial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Serial({self})")
    }
}


//--- PrimitiveContent

impl PrimitiveContent for Serial {
    const TAG: Tag = Tag::INTEGER;

    fn encoded_len(&self, _mode: Mode) -> usize {
        if self.0[0] & 0x80 != 0 {
            self.0.len() + 1
        }
        else {
            self.0.len()
        }
    }

    fn write_encoded<W: io::Write>(
        &self,
        _mode: Mode,
        target: &mut W
    ) -> Result<(), io::Error> {
        if self.0[0] & 0x80 != 0 {
            target.write_all(b"\0")?;
        }
        target.write_all(self.0.as_ref())
    }
}


//------------ SignedData ----------------------------------------------------

/// Data signed with the X.509 signature scheme.
///
/// This is the outer structure of both certificates and certification
/// requests: some data followed by the signature algorithm and the
/// signature value as a bit string.
#[derive(Clone, Debug)]
pub struct SignedData {
    data: Captured,
    signature: Signature,
}

impl SignedData {
    pub fn new(data: Captured, signature: Signature) -> Self {
        Self { data, signature }
    }

    pub fn data(&self) -> &Captured {
        &self.data
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        Ok(SignedData {
            data: cons.capture_one()?,
            signature: Signature::new(
                SignatureAlgorithm::x509_take_from(cons)?,
                BitString::take_from(cons)?.octet_bytes()
            )
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            &self.data,
            self.signature.algorithm().x509_encode(),
            SignatureValueContent(self).encode(),
        ))
    }

    pub fn verify_signature(
        &self,
        public_key: &PublicKey
    ) -> Result<(), SignatureVerificationError> {
        public_key.verify(self.data.as_ref(), &self.signature)
    }

    /// Returns the DER encoding of the signed data.
    pub fn to_bytes(&self) -> Bytes {
        self.encode_ref().to_captured(Mode::Der).into_bytes()
    }
}


//--- PartialEq and Eq

impl PartialEq for SignedData {
    fn eq(&self, other: &Self) -> bool {
        self.data.as_slice() == other.data.as_slice() &&
            self.signature == other.signature
    }
}

impl Eq for SignedData {}


#[derive(Clone, Copy, Debug)]
struct SignatureValueContent<'a>(&'a SignedData);

impl PrimitiveContent for SignatureValueContent<'_> {
    const TAG: Tag = Tag::BIT_STRING;

    fn encoded_len(&self, _: Mode) -> usize {
        self.0.signature.value().len() + 1
    }

    fn write_encoded<W: io::Write>(
        &self,
        _: Mode,
        target: &mut W
    ) -> Result<(), io::Error> {
        target.write_all(&[0u8])?;
        target.write_all(self.0.signature.value().as_ref())
    }
}


//------------ Time ----------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Time(DateTime<Utc>);

impl Time {
    pub fn new(dt: DateTime<Utc>) -> Self {
        Time(dt)
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Creates a time value from its components.
    ///
    /// Returns `None` if the components do not form a valid time.
    pub fn utc(
        year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32
    ) -> Option<Self> {
        Self::from_parts((year, month, day, hour, min, sec)).ok()
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive(|tag, prim| {
            match tag {
                Tag::UTC_TIME => {
                    // RFC 5280 requires the format YYMMDDHHMMSSZ
                    let year = read_two_char(prim)? as i32;
                    let year = if year >= 50 { year + 1900 }
                               else { year + 2000 };
                    let res = (
                        year,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                    );
                    if prim.take_u8()? != b'Z' {
                        return Err(prim.content_err(
                            "malformed time value"
                        ))
                    }
                    Self::from_parts(res).map_err(|err| prim.content_err(err))
                }
                Tag::GENERALIZED_TIME => {
                    Self::generalized_from_primitive(prim)
                }
                _ => {
                    Err(prim.content_err(
                        "malformed time value"
                    ))
                }
            }
        })
    }

    /// Takes an optional value that must be a GeneralizedTime.
    pub fn take_opt_generalized<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_primitive_if(
            Tag::GENERALIZED_TIME, Self::generalized_from_primitive
        )
    }

    fn generalized_from_primitive<S: decode::Source>(
        prim: &mut decode::Primitive<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        // RFC 5280 requires the format YYYYMMDDHHMMSSZ
        let res = (
            read_four_char(prim)? as i32,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
        );
        if prim.take_u8()? != b'Z' {
            return Err(prim.content_err("malformed time value"))
        }
        Self::from_parts(res).map_err(|err| prim.content_err(err))
    }

    fn from_parts(
        parts: (i32, u32, u32, u32, u32, u32)
    ) -> Result<Self, ContentError> {
        match Utc.with_ymd_and_hms(
            parts.0, parts.1, parts.2, parts.3, parts.4, parts.5
        ) {
            LocalResult::Single(dt) => Ok(Time(dt)),
            _ => Err(ContentError::from_static("malformed time value"))
        }
    }

    pub fn encode_utc_time(self) -> impl encode::Values {
        UtcTime(self).encode()
    }

    pub fn encode_generalized_time(self) -> impl encode::Values {
        GeneralizedTime(self).encode()
    }

    pub fn encode_varied(self) -> impl encode::Values {
        if self.year() < 1950 || self.year() > 2049 {
            (None, Some(self.encode_generalized_time()))
        }
        else {
            (Some(self.encode_utc_time()), None)
        }
    }
}


//--- Deref and AsRef

impl ops::Deref for Time {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<DateTime<Utc>> for Time {
    fn as_ref(&self) -> &DateTime<Utc> {
        &self.0
    }
}


//--- From

impl From<DateTime<Utc>> for Time {
    fn from(time: DateTime<Utc>) -> Self {
        Time(time)
    }
}

impl From<Time> for DateTime<Utc> {
    fn from(time: Time) -> Self {
        time.0
    }
}


//--- Add and Sub

impl ops::Add<TimeDelta> for Time {
    type Output = Self;

    fn add(self, duration: TimeDelta) -> Self::Output {
        Self::new(self.0 + duration)
    }
}

impl ops::Sub<TimeDelta> for Time {
    type Output = Self;

    fn sub(self, duration: TimeDelta) -> Self::Output {
        Self::new(self.0 - duration)
    }
}


//--- Display

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}


fn read_two_char<S: decode::Source>(
    source: &mut S
) -> Result<u32, DecodeError<S::Error>> {
    let mut s = [0u8; 2];
    s[0] = source.take_u8()?;
    s[1] = source.take_u8()?;
    let s = match str::from_utf8(&s[..]) {
        Ok(s) => s,
        Err(_err) => {
            return Err(source.content_err("malformed time value"))
        }
    };
    u32::from_str(s).map_err(|_err| {
        source.content_err("malformed time value")
    })
}


fn read_four_char<S: decode::Source>(
    source: &mut S
) -> Result<u32, DecodeError<S::Error>> {
    let mut s = [0u8; 4];
    s[0] = source.take_u8()?;
    s[1] = source.take_u8()?;
    s[2] = source.take_u8()?;
    s[3] = source.take_u8()?;
    let s = match str::from_utf8(&s[..]) {
        Ok(s) => s,
        Err(_err) => {
            return Err(source.content_err("malformed time value"))
        }
    };
    u32::from_str(s).map_err(|_err| {
        source.content_err("malformed time value")
    })
}


//------------ UtcTime -------------------------------------------------------

pub struct UtcTime(Time);

impl PrimitiveContent for UtcTime {
    const TAG: Tag = Tag::UTC_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        13 // yyMMddhhmmssZ
    }

    fn write_encoded<W: io::Write>(
        &self, _: Mode, target: &mut W
    ) -> Result<(), io::Error> {
        write!(
            target, "{:02}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year() % 100, self.0.month(), self.0.day(),
            self.0.hour(), self.0.minute(), self.0.second()
        )
    }
}


//------------ GeneralizedTime -----------------------------------------------

pub struct GeneralizedTime(Time);

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        15 // yyyyMMddhhmmssZ
    }

    fn write_encoded<W: io::Write>(
        &self, _: Mode, target: &mut W
    ) -> Result<(), io::Error> {
        write!(
            target, "{:04}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year(), self.0.month(), self.0.day(),
            self.0.hour(), self.0.minute(), self.0.second()
        )
    }
}


//------------ Validity ------------------------------------------------------

#[derive(Clone, Debug, Copy, Eq, Hash, PartialEq)]
pub struct Validity {
    not_before: Time,
    not_after: Time,
}

impl Validity {
    pub fn new(not_before: Time, not_after: Time) -> Self {
        Validity { not_before, not_after }
    }

    /// Creates a validity starting now and lasting for the given duration.
    pub fn from_duration(duration: TimeDelta) -> Self {
        let not_before = Time::now();
        Validity::new(not_before, not_before + duration)
    }

    pub fn not_before(self) -> Time {
        self.not_before
    }

    pub fn not_after(self) -> Time {
        self.not_after
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(Validity::new(
                Time::take_from(cons)?,
                Time::take_from(cons)?,
            ))
        })
    }

    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            self.not_before.encode_varied(),
            self.not_after.encode_varied(),
        ))
    }
}


//------------ NameError -----------------------------------------------------

/// A string could not be parsed into a distinguished name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NameError;

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid distinguished name")
    }
}

impl error::Error for NameError { }


//------------ SerialError ---------------------------------------------------

/// A string could not be parsed into a serial number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SerialError;

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid serial number")
    }
}

impl error::Error for SerialError { }


//============ Tests =========================================================
