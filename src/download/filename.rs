//! Output filename selection

use crate::error::DownloadError;
use unicode_normalization::UnicodeNormalization;
use url::Url;
use uuid::Uuid;

/// Characters rejected by at least one supported filesystem
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn is_invalid(c: char) -> bool {
    c.is_control() || INVALID_CHARS.contains(&c)
}

/// Longest name accepted, in bytes. Leaves room for a `-N` collision
/// suffix within the 255-byte limit most filesystems share.
pub const MAX_FILENAME_BYTES: usize = 240;

fn is_reserved(name: &str) -> bool {
    name.is_empty() || name.chars().all(|c| c == '.')
}

/// Check a caller-supplied filename; it is used verbatim or not at all.
pub fn validate_override(name: &str) -> Result<String, DownloadError> {
    let name = name.trim();
    if is_reserved(name) || name.chars().any(is_invalid) {
        return Err(DownloadError::InvalidDestination(format!(
            "filename {:?} contains invalid characters",
            name
        )));
    }
    let name: String = name.nfc().collect();
    if name.len() > MAX_FILENAME_BYTES {
        return Err(DownloadError::InvalidDestination(format!(
            "filename is {} bytes long, the limit is {}",
            name.len(),
            MAX_FILENAME_BYTES
        )));
    }
    Ok(name)
}

/// Replace invalid characters with `_`; `None` if nothing usable remains.
/// Overlong names are cut down, keeping their extension.
pub fn sanitize(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .trim_matches('"')
        .nfc()
        .map(|c| if is_invalid(c) { '_' } else { c })
        .collect();
    let cleaned = shorten(cleaned.trim());
    if is_reserved(&cleaned) {
        None
    } else {
        Some(cleaned)
    }
}

fn shorten(name: &str) -> String {
    if name.len() <= MAX_FILENAME_BYTES {
        return name.to_string();
    }
    let (stem, extension) = match split_extension(name) {
        (stem, extension) if extension.len() <= MAX_FILENAME_BYTES / 4 => (stem, extension),
        _ => (name, ""),
    };
    let mut end = MAX_FILENAME_BYTES - extension.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", stem[..end].trim_end(), extension)
}

/// The file name carried by a `Content-Disposition` header.
///
/// An RFC 5987 `filename*` parameter wins over a plain `filename`.
pub fn from_content_disposition(header: &str) -> Option<String> {
    let params = parameters(header);
    let find = |key: &str| {
        params
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    };

    find("filename*")
        .and_then(decode_extended)
        .or_else(|| find("filename").map(str::to_string))
        .filter(|value| !value.trim().is_empty())
}

/// `key=value` pairs of a header, with quoted strings unescaped.
fn parameters(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars().peekable();

    loop {
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(';') => continue,
            Some(_) => {}
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    c => value.push(c),
                }
            }
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                value.push(c);
            }
            value.truncate(value.trim_end().len());
        }
        params.push((key.trim().to_string(), value));
    }

    params
}

/// Decode `charset'language'percent-encoded` (RFC 5987).
fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let bytes = percent_decode(parts.next()?)?;

    if charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.into_iter().map(char::from).collect())
    } else {
        None
    }
}

fn percent_decode(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

/// Last non-empty path segment of the mirror URL.
pub fn from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Pick the output name: override, then server suggestion, then URL, then a UUID.
pub fn choose(
    requested: Option<&str>,
    suggested: Option<&str>,
    mirror: &Url,
) -> Result<String, DownloadError> {
    match requested.filter(|name| !name.trim().is_empty()) {
        Some(requested) => validate_override(requested),
        None => Ok(derive(suggested, mirror)),
    }
}

/// Name derived from the response: server suggestion, then URL, then a UUID.
pub fn derive(suggested: Option<&str>, mirror: &Url) -> String {
    suggested
        .and_then(sanitize)
        .or_else(|| from_url(mirror).as_deref().and_then(sanitize))
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Split `name` into stem and extension (with its dot).
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}
