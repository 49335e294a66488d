//! Lenient HTML tokenizer on top of quick-xml.
//!
//! quick-xml does the tag scanning; this wrapper adds what HTML needs on top:
//! `script`/`style` bodies are sliced verbatim up to their closing tag, and
//! every token carries the exact source span it was read from so the tree
//! can be written back byte for byte.

use super::HtmlError;
use quick_xml::{Reader, events::Event};

#[inline]
pub fn create_html_reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(content);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_dangling_amp = true;
    config.allow_unmatched_ends = true;
    reader
}

const BOM: char = '\u{feff}';

/// Elements whose content is text up to the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name ...>`; name is lowercased.
    Start(String),
    /// `<name ... />`
    Empty(String),
    /// `</name>`
    End(String),
    /// Character data, entities left encoded.
    Text,
    /// Body of a raw-text element.
    RawText,
    /// Comment, doctype, CDATA, processing instruction or declaration.
    Other,
    Eof,
}

pub struct HtmlReader<'a> {
    src: &'a str,
    /// Offset of `reader`'s input inside `src`.
    base: usize,
    reader: Reader<&'a [u8]>,
    raw_text_of: Option<String>,
    pending_bom: bool,
}

impl<'a> HtmlReader<'a> {
    pub fn new(src: &'a str) -> Self {
        // quick-xml drops a leading BOM without advancing its offset, so
        // the BOM is emitted here and the reader starts after it.
        let bom = src.starts_with(BOM);
        let base = if bom { BOM.len_utf8() } else { 0 };
        Self {
            src,
            base,
            reader: create_html_reader(&src[base..]),
            raw_text_of: None,
            pending_bom: bom,
        }
    }

    #[inline]
    fn position(&self) -> usize {
        self.base + self.reader.buffer_position() as usize
    }

    /// Read the next token along with its source span.
    pub fn next_token(&mut self) -> Result<(Token, &'a str), HtmlError> {
        if std::mem::take(&mut self.pending_bom) {
            return Ok((Token::Other, &self.src[..self.base]));
        }
        if let Some(name) = self.raw_text_of.take() {
            return Ok((Token::RawText, self.slice_raw_text(&name)));
        }

        let start = self.position();
        let rest = &self.src[start..];
        if rest.starts_with('<') && !opens_markup(rest.as_bytes()) {
            let end = next_markup(&rest[1..]).map_or(self.src.len(), |i| start + 1 + i);
            self.restart_at(end);
            return Ok((Token::Text, &self.src[start..end]));
        }

        let event = self.reader.read_event().map_err(|source| HtmlError::Syntax {
            position: self.base as u64 + self.reader.error_position(),
            source,
        })?;
        let end = self.position();
        let span = self.src.get(start..end).ok_or(HtmlError::Span(start))?;

        let token = match event {
            Event::Start(e) => {
                let name = lowercase_name(e.name().as_ref());
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    self.raw_text_of = Some(name.clone());
                }
                Token::Start(name)
            }
            Event::Empty(e) => Token::Empty(lowercase_name(e.name().as_ref())),
            Event::End(e) => Token::End(lowercase_name(e.name().as_ref())),
            Event::Text(_) | Event::GeneralRef(_) => Token::Text,
            Event::Eof => Token::Eof,
            Event::Comment(_)
            | Event::CData(_)
            | Event::DocType(_)
            | Event::Decl(_)
            | Event::PI(_) => Token::Other,
        };
        Ok((token, span))
    }

    /// Take everything up to `</name` as text and restart the reader there.
    fn slice_raw_text(&mut self, name: &str) -> &'a str {
        let start = self.position();
        let end = find_close_tag(&self.src[start..], name).map_or(self.src.len(), |i| start + i);
        self.restart_at(end);
        &self.src[start..end]
    }

    fn restart_at(&mut self, at: usize) {
        self.base = at;
        self.reader = create_html_reader(&self.src[at..]);
    }
}

/// `<` starts markup only before a tag name, `/name`, `!` or `?`.
/// Anything else (`a < b`, `<3`) is text, as in a browser.
fn opens_markup(rest: &[u8]) -> bool {
    match rest.get(1) {
        Some(b'/') => rest.get(2).is_some_and(u8::is_ascii_alphabetic),
        Some(&b) => b.is_ascii_alphabetic() || matches!(b, b'!' | b'?'),
        None => false,
    }
}

/// Offset of the first `<` in `s` that starts markup.
fn next_markup(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    s.match_indices('<')
        .map(|(i, _)| i)
        .find(|&i| opens_markup(&bytes[i..]))
}

fn lowercase_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

/// Byte offset of the first `</name` (ASCII case-insensitive) that is
/// followed by whitespace, `/` or `>`.
fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let name = name.as_bytes();
    let mut from = 0;
    while let Some(i) = haystack[from..].find("</") {
        let at = from + i;
        let name_start = at + 2;
        let name_end = name_start + name.len();
        if name_end <= bytes.len()
            && bytes[name_start..name_end].eq_ignore_ascii_case(name)
            && bytes
                .get(name_end)
                .is_none_or(|b| b.is_ascii_whitespace() || matches!(b, b'/' | b'>'))
        {
            return Some(at);
        }
        from = name_start;
    }
    None
}
