//! docmeta: search and social metadata, structured data, share links and
//! contributor footers for generated documentation pages.
//!
//! The per-page work lives in [`pipeline::Pipeline`]. Two adapters drive
//! it: [`hooks::Hooks`] for hosts that hand over pages one at a time, and
//! [`batch::process_site`] for an already-built site directory. Given the
//! same page and configuration both produce the same bytes.

pub mod batch;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod fragments;
pub mod hooks;
pub mod inject;
pub mod meta;
pub mod pipeline;
pub mod provenance;
pub mod schema;
pub mod utils;
