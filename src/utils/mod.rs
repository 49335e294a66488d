//! Shared helpers: process execution, HTML handling, terminal logging.

pub mod exec;
pub mod html;
pub mod log;
