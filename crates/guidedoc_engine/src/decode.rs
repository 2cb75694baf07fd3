use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding_label: String,
}

/// Decodes fetched page bytes into UTF-8: BOM -> Content-Type charset ->
/// chardetng guess. Never fails; malformed sequences decode with replacement
/// characters, since a partially readable guide still converts.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> DecodedPage {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_lossy(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_lossy(bytes, encoding);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_lossy(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim_matches(|c| c == ' ' || c == '"' || c == '\''))
        } else {
            None
        }
    })
}

fn decode_lossy(bytes: &[u8], encoding: &'static Encoding) -> DecodedPage {
    let (text, actual, _had_errors) = encoding.decode(bytes);
    DecodedPage {
        html: text.into_owned(),
        encoding_label: actual.name().to_string(),
    }
}
