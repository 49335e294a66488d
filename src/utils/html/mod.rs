//! Lossless HTML handling.
//!
//! - [`reader`]: quick-xml based tokenizer with raw-text element support
//! - [`dom`]: arena tree that serializes back to its source bytes
//! - [`text`]: entity decoding and text shaping
//! - [`writer`]: escaped markup builders for injected fragments

mod dom;
mod reader;
pub mod text;
pub mod writer;

pub use dom::{Dom, Element, Node, NodeId, ROOT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("HTML syntax error at byte {position}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("token boundary at byte {0} is not on a character boundary")]
    Span(usize),
}
