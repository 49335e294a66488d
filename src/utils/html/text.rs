//! Text helpers: entity decoding, whitespace folding, word-safe truncation.

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use std::borrow::Cow;

/// Longest entity name considered when scanning for `&name;`.
const MAX_ENTITY_LEN: usize = 32;

/// Decode HTML character references.
///
/// Unknown or unterminated references (a bare `&` in `Q & A`) are kept as
/// written instead of failing the whole string.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    if let Ok(decoded) = unescape_with(raw, resolve_html5_entity) {
        return decoded;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let reference = tail[1..]
            .find(';')
            .filter(|&i| {
                (1..=MAX_ENTITY_LEN).contains(&i)
                    && tail[1..1 + i]
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'#')
            })
            .map(|i| &tail[..i + 2]);

        match reference.and_then(|r| Some((r, unescape_with(r, resolve_html5_entity).ok()?))) {
            Some((r, decoded)) => {
                out.push_str(&decoded);
                rest = &tail[r.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Fold every whitespace run into one space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `s` to at most `max_chars` characters, backing off to the last
/// whitespace so no word is split. A single word longer than the limit is
/// cut hard.
pub fn truncate_at_word(s: &str, max_chars: usize) -> String {
    let Some((cut, _)) = s.char_indices().nth(max_chars) else {
        return s.to_owned();
    };
    let head = &s[..cut];
    let next_is_boundary = s[cut..].starts_with(char::is_whitespace);
    let head = if next_is_boundary {
        head
    } else {
        match head.rfind(char::is_whitespace) {
            Some(space) => &head[..space],
            None => head,
        }
    };
    head.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_and_numeric() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&copy; &#169; &#xA9;"), "© © ©");
        assert_eq!(decode_entities("&nbsp;"), "\u{a0}");
    }

    #[test]
    fn test_decode_is_lenient() {
        assert_eq!(decode_entities("Q & A"), "Q & A");
        assert_eq!(decode_entities("Q & A &amp; more"), "Q & A & more");
        assert_eq!(decode_entities("&bogus; &amp;"), "&bogus; &");
        assert_eq!(decode_entities("tail &"), "tail &");
    }

    #[test]
    fn test_decode_borrows_plain_text() {
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn test_truncate_short_is_unchanged() {
        assert_eq!(truncate_at_word("short text", 50), "short text");
        assert_eq!(truncate_at_word("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_backs_off_to_word() {
        assert_eq!(truncate_at_word("hello wonderful world", 12), "hello");
        assert_eq!(truncate_at_word("hello wonderful world", 15), "hello wonderful");
        assert_eq!(truncate_at_word("hello wonderful world", 16), "hello wonderful");
    }

    #[test]
    fn test_truncate_single_long_word() {
        assert_eq!(truncate_at_word("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_at_word("日本語 テキスト", 5), "日本語");
    }
}
