//! Byte-stream decoding with an ordered encoding fallback chain (astral-build-core)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::BuildToolError;
use crate::scan::split_lines;

/// Strict decoder: `None` when any byte sequence is invalid.
type StrictDecode = fn(&[u8]) -> Option<String>;

/// Lossy decoder: drops whatever it cannot decode.
type LossyDecode = fn(&[u8]) -> String;

/// Encodings the build inspector knows how to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    Utf8,
    Utf16,
    Cp1252,
    Latin1,
}

/// Candidate order used when nothing else is configured.
pub const DEFAULT_ENCODINGS: [Encoding; 4] = [
    Encoding::Utf8,
    Encoding::Utf16,
    Encoding::Cp1252,
    Encoding::Latin1,
];

impl Encoding {
    pub const fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16 => "utf-16",
            Encoding::Cp1252 => "cp1252",
            Encoding::Latin1 => "latin1",
        }
    }

    fn strict(self) -> StrictDecode {
        match self {
            Encoding::Utf8 => decode_utf8,
            Encoding::Utf16 => decode_utf16,
            Encoding::Cp1252 => decode_cp1252,
            Encoding::Latin1 => decode_latin1,
        }
    }

    fn lossy(self) -> LossyDecode {
        match self {
            Encoding::Utf8 => decode_utf8_lossy,
            Encoding::Utf16 => decode_utf16_lossy,
            Encoding::Cp1252 => decode_cp1252_lossy,
            Encoding::Latin1 => decode_latin1_lossy,
        }
    }

    /// Decode every byte or fail.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        (self.strict())(bytes)
    }

    /// Decode, silently dropping undecodable sequences.
    pub fn decode_lossy(self, bytes: &[u8]) -> String {
        (self.lossy())(bytes)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = BuildToolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16" | "utf16" => Ok(Encoding::Utf16),
            "cp1252" | "windows-1252" | "windows1252" => Ok(Encoding::Cp1252),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(Encoding::Latin1),
            _ => Err(BuildToolError::UnknownEncoding(raw.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = BuildToolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        encoding.name().to_string()
    }
}

/// Which step of the chain produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Exact(Encoding),
    Lossy(Encoding),
}

impl DecodeStrategy {
    pub fn encoding(self) -> Encoding {
        match self {
            DecodeStrategy::Exact(encoding) | DecodeStrategy::Lossy(encoding) => encoding,
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, DecodeStrategy::Lossy(_))
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStrategy::Exact(encoding) => write!(f, "{encoding}"),
            DecodeStrategy::Lossy(encoding) => write!(f, "{encoding}(ignore)"),
        }
    }
}

impl Serialize for DecodeStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Bytes captured from a finished subprocess, stdout and stderr interleaved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput(Vec<u8>);

impl RawOutput {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RawOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for RawOutput {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Text produced by exactly one step of the decode chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    text: String,
    strategy: DecodeStrategy,
}

impl DecodedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn strategy(&self) -> DecodeStrategy {
        self.strategy
    }

    pub fn lines(&self) -> Vec<&str> {
        split_lines(&self.text)
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Ordered list of candidate encodings, tried left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    candidates: Vec<Encoding>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODINGS)
    }
}

impl Decoder {
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = Encoding>,
    {
        Self {
            candidates: candidates.into_iter().collect(),
        }
    }

    pub fn candidates(&self) -> &[Encoding] {
        &self.candidates
    }

    /// Decode with the first candidate that accepts every byte.
    ///
    /// When all candidates reject the input, the first candidate's lossy
    /// decode is used (UTF-8 if the list is empty), so this never fails.
    pub fn decode(&self, raw: RawOutput) -> DecodedText {
        let bytes = raw.as_bytes();

        for &encoding in &self.candidates {
            if let Some(text) = encoding.decode(bytes) {
                log::debug!("decoded {} bytes as {encoding}", bytes.len());
                return DecodedText {
                    text,
                    strategy: DecodeStrategy::Exact(encoding),
                };
            }
            log::debug!("{encoding} rejected {} bytes of output", bytes.len());
        }

        let fallback = self.candidates.first().copied().unwrap_or(Encoding::Utf8);
        log::info!("no candidate encoding fits, falling back to lossy {fallback}");
        DecodedText {
            text: fallback.decode_lossy(bytes),
            strategy: DecodeStrategy::Lossy(fallback),
        }
    }
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

fn decode_utf8_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Strip a byte-order mark; report whether the body is big-endian.
fn split_utf16_bom(bytes: &[u8]) -> (&[u8], bool) {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        _ => (bytes, false),
    }
}

fn utf16_units(body: &[u8], big_endian: bool) -> impl Iterator<Item = u16> + '_ {
    body.chunks_exact(2).map(move |pair| {
        let pair = [pair[0], pair[1]];
        if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        }
    })
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, big_endian) = split_utf16_bom(bytes);
    if body.len() % 2 != 0 {
        return None;
    }
    char::decode_utf16(utf16_units(body, big_endian))
        .collect::<Result<String, _>>()
        .ok()
}

fn decode_utf16_lossy(bytes: &[u8]) -> String {
    let (body, big_endian) = split_utf16_bom(bytes);
    char::decode_utf16(utf16_units(body, big_endian))
        .filter_map(Result::ok)
        .collect()
}

/// Windows-1252 mapping for 0x80..=0x9F; `None` marks undefined bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

fn cp1252_char(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => Some(char::from(byte)),
    }
}

fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    bytes.iter().map(|&byte| cp1252_char(byte)).collect()
}

fn decode_cp1252_lossy(bytes: &[u8]) -> String {
    bytes.iter().filter_map(|&byte| cp1252_char(byte)).collect()
}

fn decode_latin1(bytes: &[u8]) -> Option<String> {
    Some(decode_latin1_lossy(bytes))
}

fn decode_latin1_lossy(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_honours_byte_order_marks() {
        assert_eq!(decode_utf16(&[0xFF, 0xFE, b'h', 0, b'i', 0]).as_deref(), Some("hi"));
        assert_eq!(decode_utf16(&[0xFE, 0xFF, 0, b'h', 0, b'i']).as_deref(), Some("hi"));
        assert_eq!(decode_utf16(&[b'o', 0, b'k', 0]).as_deref(), Some("ok"));
    }

    #[test]
    fn utf16_rejects_odd_length_and_lone_surrogates() {
        assert_eq!(decode_utf16(&[b'a', 0, b'b']), None);
        assert_eq!(decode_utf16(&[0x00, 0xD8, b'a', 0]), None);
        assert_eq!(decode_utf16_lossy(&[0x00, 0xD8, b'a', 0, b'z']), "a");
    }

    #[test]
    fn cp1252_rejects_undefined_bytes() {
        assert_eq!(decode_cp1252(&[0x80, b'5']).as_deref(), Some("\u{20AC}5"));
        for undefined in [0x81, 0x8D, 0x8F, 0x90, 0x9D] {
            assert_eq!(decode_cp1252(&[b'x', undefined]), None, "byte {undefined:#x}");
        }
        assert_eq!(decode_cp1252_lossy(&[b'x', 0x81, b'y']), "xy");
    }

    #[test]
    fn latin1_maps_every_byte() {
        let all: Vec<u8> = (0..=255).collect();
        let text = decode_latin1(&all).expect("latin1 never fails");
        assert_eq!(text.chars().count(), 256);
        assert_eq!(text.chars().last(), Some('\u{FF}'));
    }

    #[test]
    fn utf8_lossy_drops_invalid_sequences() {
        assert_eq!(decode_utf8_lossy(b"ab\xFFcd\xC3"), "abcd");
    }

    #[test]
    fn parses_encoding_aliases() {
        assert_eq!("UTF8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("windows_1252".parse::<Encoding>().unwrap(), Encoding::Cp1252);
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!("mbcs".parse::<Encoding>().is_err());
    }

    #[test]
    fn strategy_names_lossy_fallback() {
        assert_eq!(DecodeStrategy::Exact(Encoding::Utf16).to_string(), "utf-16");
        assert_eq!(DecodeStrategy::Lossy(Encoding::Utf8).to_string(), "utf-8(ignore)");
    }
}
