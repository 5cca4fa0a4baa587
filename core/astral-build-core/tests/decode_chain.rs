use proptest::prelude::*;

use astral_build_core::decode::{DecodeStrategy, Decoder, Encoding, RawOutput};

fn decode_with(candidates: &[Encoding], bytes: &[u8]) -> (String, DecodeStrategy) {
    let decoded = Decoder::new(candidates.iter().copied()).decode(RawOutput::from(bytes));
    let strategy = decoded.strategy();
    (decoded.into_string(), strategy)
}

#[test]
fn first_matching_candidate_wins() {
    let (text, strategy) = decode_with(&[Encoding::Utf8, Encoding::Latin1], "naïve".as_bytes());
    assert_eq!(text, "naïve");
    assert_eq!(strategy, DecodeStrategy::Exact(Encoding::Utf8));
}

#[test]
fn msvc_utf16_output_is_recognised() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "error C2143".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }

    let (text, strategy) = decode_with(&Decoder::default().candidates().to_vec(), &bytes);
    assert_eq!(text, "error C2143");
    assert_eq!(strategy, DecodeStrategy::Exact(Encoding::Utf16));
}

#[test]
fn default_chain_falls_through_to_cp1252_then_latin1() {
    let defaults = Decoder::default().candidates().to_vec();

    let (text, strategy) = decode_with(&defaults, b"ok\x80");
    assert_eq!(text, "ok\u{20AC}");
    assert_eq!(strategy, DecodeStrategy::Exact(Encoding::Cp1252));

    let (text, strategy) = decode_with(&defaults, b"\x81ab");
    assert_eq!(text, "\u{81}ab");
    assert_eq!(strategy, DecodeStrategy::Exact(Encoding::Latin1));
}

#[test]
fn exhausted_chain_uses_lossy_first_candidate() {
    let (text, strategy) = decode_with(&[Encoding::Utf8, Encoding::Utf16], b"ok\xFF");
    assert_eq!(text, "ok");
    assert_eq!(strategy, DecodeStrategy::Lossy(Encoding::Utf8));
    assert_eq!(strategy.to_string(), "utf-8(ignore)");
}

#[test]
fn empty_chain_decodes_lossy_utf8() {
    let (text, strategy) = decode_with(&[], b"a\xC3\x28b");
    assert_eq!(text, "a(b");
    assert!(strategy.is_lossy());
    assert_eq!(strategy.encoding(), Encoding::Utf8);
}

proptest! {
    #[test]
    fn text_valid_in_first_candidate_decodes_verbatim(s in any::<String>()) {
        let (text, strategy) = decode_with(&Decoder::default().candidates().to_vec(), s.as_bytes());
        prop_assert_eq!(text, s);
        prop_assert_eq!(strategy, DecodeStrategy::Exact(Encoding::Utf8));
    }

    #[test]
    fn undecodable_bytes_still_produce_text(s in any::<String>()) {
        // A stray 0xFF breaks UTF-8; odd length breaks UTF-16.
        let mut bytes = s.clone().into_bytes();
        bytes.push(0xFF);
        if bytes.len() % 2 == 0 {
            bytes.push(0xFF);
        }

        let (text, strategy) = decode_with(&[Encoding::Utf8, Encoding::Utf16], &bytes);
        prop_assert_eq!(strategy, DecodeStrategy::Lossy(Encoding::Utf8));
        prop_assert_eq!(text, s);
    }
}
