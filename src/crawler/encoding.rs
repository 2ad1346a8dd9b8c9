//! Response body decoding
//!
//! Servers frequently omit the charset or send the HTTP default
//! (ISO-8859-1) for pages that are really UTF-8 or declare their encoding in a
//! `<meta>` tag. Decoding therefore looks at the bytes before trusting the
//! header.
//!
//! Resolution order:
//! 1. Byte order mark
//! 2. `charset` from the Content-Type header, unless absent or a known
//!    unreliable default
//! 3. `<meta charset>` / `<meta http-equiv>` in the first 1024 bytes
//! 4. UTF-8 if the bytes are valid UTF-8
//! 5. windows-1252

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// How many leading bytes are scanned for a `<meta>` charset declaration
const META_PRESCAN_BYTES: usize = 1024;

/// Decodes a response body to text
///
/// Malformed byte sequences are replaced with U+FFFD; decoding never fails.
///
/// # Returns
///
/// The decoded text and the encoding that was used
///
/// # Examples
///
/// ```
/// use tidemark::crawler::decode_body;
///
/// let bytes = "Caf\u{e9}".as_bytes();
/// let (text, encoding) = decode_body(bytes, Some("text/html; charset=ISO-8859-1"));
/// assert_eq!(text, "Caf\u{e9}");
/// assert_eq!(encoding.name(), "UTF-8");
/// ```
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> (String, &'static Encoding) {
    let encoding = detect_encoding(bytes, content_type);
    // decode() also strips a BOM if one is present
    let (text, used, _had_errors) = encoding.decode(bytes);
    (text.into_owned(), used)
}

/// Picks the encoding for a body without decoding it
pub fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(declared) = content_type.and_then(charset_from_content_type) {
        if !is_unreliable_default(declared) {
            return declared;
        }
    }

    if let Some(meta) = prescan_meta_charset(bytes) {
        return meta;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    WINDOWS_1252
}

/// Extracts and resolves the `charset` parameter of a Content-Type value
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches(|c| c == '"' || c == '\'');
        Encoding::for_label(label.as_bytes())
    })
}

/// Charsets that mean "nobody told the server" rather than a real declaration
///
/// The WHATWG registry maps both latin1 and ascii labels to windows-1252.
fn is_unreliable_default(encoding: &'static Encoding) -> bool {
    encoding == WINDOWS_1252
}

/// Looks for a charset declaration in `<meta>` tags near the top of the document
fn prescan_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag_body = &rest[start + 5..];
        let end = tag_body.find('>').unwrap_or(tag_body.len());
        let tag = &tag_body[..end];

        if let Some(encoding) = charset_in_meta_tag(tag) {
            // A document cannot declare itself UTF-16 from inside ASCII-compatible bytes
            if encoding == UTF_16LE || encoding == UTF_16BE {
                return Some(UTF_8);
            }
            return Some(encoding);
        }

        rest = &tag_body[end..];
    }

    None
}

/// Finds `charset=...` inside a lowercase meta tag body
fn charset_in_meta_tag(tag: &str) -> Option<&'static Encoding> {
    let idx = tag.find("charset")?;
    let after = tag[idx + "charset".len()..].trim_start();
    let after = after.strip_prefix('=')?.trim_start();
    let after = after.trim_start_matches(|c| c == '"' || c == '\'');

    let label: String = after
        .chars()
        .take_while(|c| !matches!(c, '"' | '\'' | ';' | '/' | '>') && !c.is_whitespace())
        .collect();

    if label.is_empty() {
        return None;
    }

    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{BIG5, GBK, SHIFT_JIS};

    #[test]
    fn test_declared_charset_used() {
        let (text, encoding) = decode_body(b"hello", Some("text/html; charset=utf-8"));
        assert_eq!(text, "hello");
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn test_declared_non_default_charset_wins_over_sniffing() {
        let (big5_bytes, _, _) = BIG5.encode("\u{9999}\u{6e2f}");
        let (text, encoding) = decode_body(&big5_bytes, Some("text/html; charset=big5"));
        assert_eq!(encoding, BIG5);
        assert_eq!(text, "\u{9999}\u{6e2f}");
    }

    #[test]
    fn test_quoted_charset_parameter() {
        let encoding = charset_from_content_type("text/html; Charset=\"Shift_JIS\"");
        assert_eq!(encoding, Some(SHIFT_JIS));
    }

    #[test]
    fn test_latin1_default_is_not_trusted_for_utf8_bytes() {
        let body = "<p>R\u{e9}sum\u{e9} \u{2014} \u{9999}\u{6e2f}</p>";
        let (text, encoding) = decode_body(body.as_bytes(), Some("text/html; charset=ISO-8859-1"));
        assert_eq!(encoding, UTF_8);
        assert_eq!(text, body);
    }

    #[test]
    fn test_missing_charset_sniffs_meta() {
        let html = "<html><head><meta charset=\"gbk\"><title>x</title></head></html>";
        let encoding = detect_encoding(html.as_bytes(), Some("text/html"));
        assert_eq!(encoding, GBK);
    }

    #[test]
    fn test_meta_http_equiv() {
        let html = r#"<meta http-equiv="Content-Type" content="text/html; charset=Big5">"#;
        let encoding = detect_encoding(html.as_bytes(), None);
        assert_eq!(encoding, BIG5);
    }

    #[test]
    fn test_meta_without_charset_is_skipped() {
        let html = r#"<meta name="viewport" content="width=device-width"><meta charset=utf-8>"#;
        let encoding = detect_encoding(html.as_bytes(), None);
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn test_meta_utf16_maps_to_utf8() {
        let html = r#"<meta charset="utf-16">"#;
        assert_eq!(detect_encoding(html.as_bytes(), None), UTF_8);
    }

    #[test]
    fn test_bom_wins() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("caf\u{e9}".as_bytes());
        let (text, encoding) = decode_body(&bytes, Some("text/html; charset=big5"));
        assert_eq!(encoding, UTF_8);
        assert_eq!(text, "caf\u{e9}");
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_windows_1252() {
        let bytes = [b'c', b'a', b'f', 0xE9];
        let (text, encoding) = decode_body(&bytes, None);
        assert_eq!(encoding, WINDOWS_1252);
        assert_eq!(text, "caf\u{e9}");
    }

    #[test]
    fn test_unknown_label_ignored() {
        let encoding = detect_encoding(b"plain", Some("text/html; charset=not-a-charset"));
        assert_eq!(encoding, UTF_8);
    }
}
