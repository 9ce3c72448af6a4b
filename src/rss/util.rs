//! Utility functions for RSS feed processing.

use flate2;
use std::io::Read;
use tracing::debug;
use url;

use crate::TARGET_WEB_REQUEST;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// A feed document after [`cleanup_xml`], with a note for every repair made.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedXml {
    pub xml: String,
    /// Empty when the input was already well-formed as far as cleanup can tell.
    pub issues: Vec<String>,
}

// Entities XML defines itself
const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

// HTML entities commonly found in feeds, with their code points
const HTML_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 160),
    ("copy", 169),
    ("laquo", 171),
    ("reg", 174),
    ("deg", 176),
    ("middot", 183),
    ("raquo", 187),
    ("eacute", 233),
    ("ndash", 8211),
    ("mdash", 8212),
    ("lsquo", 8216),
    ("rsquo", 8217),
    ("ldquo", 8220),
    ("rdquo", 8221),
    ("bull", 8226),
    ("hellip", 8230),
    ("euro", 8364),
    ("trade", 8482),
];

const UTF8_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Repair the usual ways real-world feeds deviate from XML: text before the
/// root element, HTML entities, unescaped ampersands and characters XML does
/// not allow. CDATA sections are left alone apart from invalid characters.
///
/// The result always carries a UTF-8 declaration, since it is a Rust string.
pub fn cleanup_xml(xml: &str) -> CleanedXml {
    let mut issues = Vec::new();
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').trim_start();

    // Drop anything before the document actually starts
    if !cleaned.starts_with('<') {
        let start = ["<?xml", "<rss", "<rdf:RDF", "<feed"]
            .iter()
            .filter_map(|marker| cleaned.find(marker))
            .min();
        if let Some(start) = start {
            issues.push("content before the document start".to_string());
            cleaned = &cleaned[start..];
        }
    }

    // Replace the declaration; the encoding it names no longer applies
    if is_xml_declaration(cleaned) {
        if let Some(end) = cleaned.find("?>") {
            cleaned = cleaned[end + 2..].trim_start();
        }
    }

    let (repaired, html_entities, bare_ampersands) = repair_markup(cleaned);
    if html_entities > 0 {
        issues.push(format!("{} HTML entities not defined in XML", html_entities));
    }
    if bare_ampersands > 0 {
        issues.push(format!("{} unescaped ampersands", bare_ampersands));
    }

    let before = repaired.chars().count();
    let repaired: String = repaired
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | // tab
                '\u{000A}' | // newline
                '\u{000D}' | // carriage return
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();
    let removed = before - repaired.chars().count();
    if removed > 0 {
        issues.push(format!("{} invalid XML characters", removed));
    }

    CleanedXml {
        xml: format!("{}\n{}", UTF8_DECLARATION, repaired),
        issues,
    }
}

fn is_xml_declaration(xml: &str) -> bool {
    xml.strip_prefix("<?xml")
        .and_then(|rest| rest.chars().next())
        .map_or(false, |c| c.is_whitespace() || c == '?')
}

/// Fix entity references outside CDATA sections. Returns the repaired text and
/// the number of HTML entities and bare ampersands found.
fn repair_markup(xml: &str) -> (String, usize, usize) {
    let mut out = String::with_capacity(xml.len());
    let (mut html_entities, mut bare_ampersands) = (0, 0);
    let mut rest = xml;

    loop {
        let (markup, cdata) = match rest.find("<![CDATA[") {
            Some(start) => rest.split_at(start),
            None => (rest, ""),
        };

        let (fixed, html, bare) = repair_references(markup);
        out.push_str(&fixed);
        html_entities += html;
        bare_ampersands += bare;

        if cdata.is_empty() {
            break;
        }
        match cdata.find("]]>") {
            Some(end) => {
                out.push_str(&cdata[..end + 3]);
                rest = &cdata[end + 3..];
            }
            None => {
                out.push_str(cdata);
                break;
            }
        }
    }

    (out, html_entities, bare_ampersands)
}

fn repair_references(text: &str) -> (String, usize, usize) {
    let text = text.replace("&amp;amp;", "&amp;");
    let mut out = String::with_capacity(text.len());
    let (mut html_entities, mut bare_ampersands) = (0, 0);
    let mut rest = text.as_str();

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let name = tail
            .char_indices()
            .take(32)
            .find(|&(_, c)| c == ';')
            .map(|(end, _)| &tail[..end]);

        match name {
            Some(name) if is_character_reference(name) || XML_ENTITIES.contains(&name) => {
                out.push('&');
            }
            Some(name) => match HTML_ENTITIES.iter().find(|(entity, _)| *entity == name) {
                Some((_, code)) => {
                    out.push_str(&format!("&#{};", code));
                    html_entities += 1;
                    rest = &tail[name.len() + 1..];
                    continue;
                }
                None => {
                    out.push_str("&amp;");
                    bare_ampersands += 1;
                }
            },
            None => {
                out.push_str("&amp;");
                bare_ampersands += 1;
            }
        }
        rest = tail;
    }
    out.push_str(rest);

    (out, html_entities, bare_ampersands)
}

fn is_character_reference(name: &str) -> bool {
    match name.strip_prefix('#') {
        Some(hex) if hex.starts_with(|c| c == 'x' || c == 'X') => {
            hex.len() > 1 && hex[1..].chars().all(|c| c.is_ascii_hexdigit())
        }
        Some(dec) => !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Undo gzip/zlib compression on bodies served without a matching Content-Encoding.
pub fn try_decompressions(bytes: &[u8], rss_url: &str) -> Vec<u8> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut decoded = Vec::new();
        if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with gzip from {}", rss_url);
            return decoded;
        }
    }

    // zlib header: CMF 0x78 with a valid check byte
    if bytes.len() > 2 && bytes[0] == 0x78 && (u16::from(bytes[0]) << 8 | u16::from(bytes[1])) % 31 == 0 {
        let mut decoder = flate2::read::ZlibDecoder::new(bytes);
        let mut decoded = Vec::new();
        if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with zlib from {}", rss_url);
            return decoded;
        }
    }

    bytes.to_vec()
}

/// Extract the charset parameter from a Content-Type header value
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find(|part| part.to_lowercase().starts_with("charset="))
        .and_then(|part| part.split('=').nth(1))
        .map(|charset| charset.trim().trim_matches('"'))
}

/// Read the `encoding` attribute of an XML declaration at the start of `bytes`
pub fn declared_xml_encoding(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let head = head.trim_start_matches('\u{FEFF}').trim_start();
    if !is_xml_declaration(head) {
        return None;
    }

    let declaration = &head[..head.find("?>")?];
    let after = declaration[declaration.find("encoding")? + "encoding".len()..].trim_start();
    let value = after.strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    Some(value[..value.find(quote)?].to_string())
}

/// A feed body decoded to text.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBody {
    pub text: String,
    /// Set when the bytes did not match the declared (or assumed) encoding.
    pub issue: Option<String>,
}

/// Decode a feed body to text. A non-UTF-8 charset named by the Content-Type
/// header, or else by the XML declaration, is honored. Bytes that claim to be
/// UTF-8 but are not fall back to windows-1252, which accepts any input.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    let declared = content_type
        .and_then(charset_from_content_type)
        .map(str::to_string)
        .or_else(|| declared_xml_encoding(bytes))
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()));

    if let Some(encoding) = declared.filter(|encoding| *encoding != encoding_rs::UTF_8) {
        let (decoded, used, had_errors) = encoding.decode(bytes);
        return DecodedBody {
            text: decoded.into_owned(),
            issue: had_errors.then(|| format!("body is not valid {}", used.name())),
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => DecodedBody {
            text: text.to_string(),
            issue: None,
        },
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            DecodedBody {
                text: decoded.into_owned(),
                issue: Some("body is not valid UTF-8, decoded as windows-1252".to_string()),
            }
        }
    }
}
