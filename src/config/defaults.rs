//! Default values for configuration fields, used by serde and `Default`.

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

pub fn default_image() -> Option<String> {
    None
}

pub fn default_author() -> Option<String> {
    None
}

/// Defaults for the batch command line.
pub mod batch {
    use std::path::PathBuf;

    pub fn docs_dir() -> PathBuf {
        "docs".into()
    }
}
