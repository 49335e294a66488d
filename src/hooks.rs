//! Per-page adapter for hosts that build pages one at a time.
//!
//! A host calls [`Hooks::on_page_content`] when a page's rendered body is
//! ready and [`Hooks::on_post_page`] with the final document. Both share the
//! provenance cache owned by the `Hooks` value, so one `Hooks` per build.

use crate::{
    config::MetaConfig,
    document::{PageMeta, SiteContext},
    pipeline::{self, PageOutcome, Pipeline},
    provenance::{AuthorDirectory, GitLog, HistorySource, ProvenanceCache},
};
use anyhow::Result;

pub struct Hooks {
    config: MetaConfig,
    site: SiteContext,
    history: Box<dyn HistorySource>,
    cache: ProvenanceCache,
    authors: AuthorDirectory,
}

impl Hooks {
    /// Hooks with the history backend and author directory `config` selects.
    ///
    /// Fails on an invalid configuration before any history is read.
    pub fn new(config: MetaConfig, site: SiteContext) -> Result<Self> {
        config.validate()?;
        let history: Box<dyn HistorySource> = if config.enabled {
            pipeline::history_source(&config)
        } else {
            Box::new(GitLog::new())
        };
        let authors = pipeline::load_authors(&config)?;
        Ok(Self::assemble(config, site, history, authors))
    }

    pub fn with_history(
        config: MetaConfig,
        site: SiteContext,
        history: Box<dyn HistorySource>,
        authors: AuthorDirectory,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, site, history, authors))
    }

    fn assemble(
        config: MetaConfig,
        site: SiteContext,
        history: Box<dyn HistorySource>,
        authors: AuthorDirectory,
    ) -> Self {
        Self {
            config,
            site,
            history,
            cache: ProvenanceCache::new(),
            authors,
        }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.config, self.history.as_ref(), &self.cache, &self.authors)
    }

    /// Content stage: returns `content` unchanged and resolves the page's
    /// provenance ahead of the output stage.
    pub fn on_page_content(&self, content: &str, page: &PageMeta) -> String {
        let pipeline = self.pipeline();
        if pipeline.needs_provenance() {
            pipeline.provenance(page);
        }
        content.to_owned()
    }

    /// Output stage: the augmented document.
    pub fn on_post_page(&self, output: &str, page: &PageMeta) -> String {
        self.process(output, page).html
    }

    /// Output stage with the page report.
    pub fn process(&self, output: &str, page: &PageMeta) -> PageOutcome {
        self.pipeline().process(output, page, &self.site)
    }

    pub fn cache(&self) -> &ProvenanceCache {
        &self.cache
    }
}
