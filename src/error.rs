//! Page-level errors. None of these stop a build: the pipeline reports
//! them and either degrades the feature or passes the page through.

use crate::utils::html::HtmlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("HTML could not be parsed")]
    DocumentParse(#[from] HtmlError),

    #[error("document has no <head>")]
    MissingHead,

    #[error("document is not valid UTF-8")]
    NotUtf8,

    #[error("structured data could not be serialized")]
    Serialization(#[from] serde_json::Error),

    #[error("fragment could not be rendered: {0}")]
    Render(String),
}
