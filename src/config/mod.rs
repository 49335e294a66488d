//! Configuration for `docmeta.toml`.
//!
//! A flat table: every key is optional and unknown keys are rejected.
//!
//! ```toml
//! site_url = "https://docs.example.com/"
//! docs_dir = "docs"
//!
//! add_desc = true
//! add_share_buttons = false
//! default_image = "https://docs.example.com/assets/card.png"
//! default_author = "Docs Team <docs@example.com>"
//! authors_file = "authors.yml"
//! ```

pub mod defaults;
mod error;

pub use error::ConfigError;

use crate::{
    cli::{Cli, Commands},
    provenance::Author,
};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct MetaConfig {
    /// Path the configuration was loaded from, empty for defaults.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Master switch. When off, pages pass through untouched.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enabled: bool,

    /// One summary line per page.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub verbose: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_desc: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_image: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_keywords: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_share_buttons: bool,

    /// Author list in the page footer.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_authors: bool,

    /// Created/updated dates in the page footer.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_dates: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_json_ld: bool,

    /// "Copy page in Markdown format" button next to the edit link.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_copy_llm: bool,

    /// Stylesheet for share buttons, copy button and footer.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub add_css: bool,

    /// Build one history index per run instead of querying git per page.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub history_index: bool,

    /// Also credit authors of the current lines (`git blame`).
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub blame_authors: bool,

    /// Image used when a page has none. Absolute URL or site-root path.
    #[serde(default = "defaults::default_image")]
    #[educe(Default = defaults::default_image())]
    pub default_image: Option<String>,

    /// `Name` or `Name <email>`, used when history is unavailable.
    #[serde(default = "defaults::default_author")]
    #[educe(Default = defaults::default_author())]
    pub default_author: Option<String>,

    /// Public base URL of the site, needed for absolute URLs.
    #[serde(default)]
    pub site_url: Option<String>,

    /// Markdown sources, relative to the config file.
    #[serde(default = "defaults::batch::docs_dir")]
    #[educe(Default = defaults::batch::docs_dir())]
    pub docs_dir: PathBuf,

    /// YAML file mapping author emails to profile overrides.
    #[serde(default)]
    pub authors_file: Option<PathBuf>,
}

impl MetaConfig {
    pub fn from_str(content: &str) -> Result<Self> {
        let config: MetaConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Commands::Process {
            docs,
            site_url,
            verbose,
            ..
        } = &cli.command
        {
            // relative to the working directory, not the config file
            if let Some(docs) = docs {
                self.docs_dir = std::path::absolute(docs).unwrap_or_else(|_| docs.clone());
            }
            if let Some(url) = site_url {
                self.site_url = Some(url.clone());
            }
            if *verbose {
                self.verbose = true;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(image) = &self.default_image
            && !(image.starts_with("http://")
                || image.starts_with("https://")
                || image.starts_with('/'))
        {
            bail!(ConfigError::Validation(format!(
                "`default_image` must be an absolute URL or start with `/`, got `{image}`"
            )));
        }

        if let Some(author) = &self.default_author
            && Author::parse(author).is_none()
        {
            bail!(ConfigError::Validation(
                "`default_author` must not be blank".into()
            ));
        }

        if let Some(url) = &self.site_url
            && url::Url::parse(url)
                .map(|u| !matches!(u.scheme(), "http" | "https"))
                .unwrap_or(true)
        {
            bail!(ConfigError::Validation(format!(
                "`site_url` must start with http:// or https://, got `{url}`"
            )));
        }

        Ok(())
    }

    pub fn default_author(&self) -> Option<Author> {
        self.default_author.as_deref().and_then(Author::parse)
    }

    /// Source directory with `~` expanded, anchored at the config file.
    pub fn docs_dir(&self) -> PathBuf {
        self.anchored(&self.docs_dir)
    }

    pub fn authors_file(&self) -> Option<PathBuf> {
        self.authors_file.as_deref().map(|p| self.anchored(p))
    }

    fn anchored(&self, path: &Path) -> PathBuf {
        let raw = path.to_string_lossy();
        let expanded = PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref());
        if expanded.is_absolute() {
            return expanded;
        }
        match self.config_path.parent() {
            Some(dir) => dir.join(expanded),
            None => expanded,
        }
    }
}
