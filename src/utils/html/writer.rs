//! Markup builders for the fragments we inject.
//!
//! Everything goes through quick-xml's `Writer`, so attribute values and
//! text are escaped in one place.

use anyhow::Result;
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use std::io::Cursor;

pub type HtmlWriter = Writer<Cursor<Vec<u8>>>;

#[inline]
pub fn create_html_writer() -> HtmlWriter {
    Writer::new(Cursor::new(Vec::new()))
}

/// Consume the writer and return its UTF-8 output.
pub fn finish(writer: HtmlWriter) -> Result<String> {
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn start_with_attrs<'a>(tag: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(tag);
    for (k, v) in attrs {
        elem.push_attribute((*k, *v));
    }
    elem
}

/// `<tag attrs...>`
#[inline]
pub fn write_start(writer: &mut HtmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    writer.write_event(Event::Start(start_with_attrs(tag, attrs)))?;
    Ok(())
}

/// `</tag>`
#[inline]
pub fn write_end(writer: &mut HtmlWriter, tag: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Escaped text.
#[inline]
pub fn write_text(writer: &mut HtmlWriter, text: &str) -> Result<()> {
    writer.write_event(Event::Text(BytesText::new(text)))?;
    Ok(())
}

/// `<tag attrs...>text</tag>`
pub fn write_text_element(
    writer: &mut HtmlWriter,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    write_start(writer, tag, attrs)?;
    write_text(writer, text)?;
    write_end(writer, tag)
}

/// `<tag attrs.../>`
#[inline]
pub fn write_empty_elem(writer: &mut HtmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    writer.write_event(Event::Empty(start_with_attrs(tag, attrs)))?;
    Ok(())
}

/// `<tag attrs...>body</tag>` where `body` is written unescaped.
///
/// For `script`/`style` content that is already safe to embed.
pub fn write_raw_element(
    writer: &mut HtmlWriter,
    tag: &str,
    attrs: &[(&str, &str)],
    body: &str,
) -> Result<()> {
    write_start(writer, tag, attrs)?;
    writer.write_event(Event::Text(BytesText::from_escaped(body)))?;
    write_end(writer, tag)
}

/// Pre-rendered trusted markup, such as inline SVG icons.
#[inline]
pub fn write_trusted(writer: &mut HtmlWriter, markup: &str) -> Result<()> {
    writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
    Ok(())
}
