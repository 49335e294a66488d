//! One page, start to finish: parse, strip, extract, synthesize, render,
//! merge. Both adapters go through [`Pipeline::process`].

use crate::{
    config::MetaConfig,
    document::{Document, PageMeta, SiteContext},
    error::PageError,
    extract::extract,
    fragments,
    inject::{self, Fragments, Region},
    log,
    meta::{MetaTag, synthesize},
    provenance::{
        AuthorDirectory, GitLog, HistoryIndex, HistorySource, Provenance, ProvenanceCache,
        Resolver,
    },
    schema,
};
use anyhow::Result;
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Meta,
    Description,
    Image,
    Keywords,
    JsonLd,
    Share,
    Authors,
    Dates,
    Copy,
    Css,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Meta => "meta",
            Self::Description => "description",
            Self::Image => "image",
            Self::Keywords => "keywords",
            Self::JsonLd => "json-ld",
            Self::Share => "share",
            Self::Authors => "authors",
            Self::Dates => "dates",
            Self::Copy => "copy",
            Self::Css => "css",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Applied,
    Skipped(String),
    Degraded(String),
}

/// What happened to one page.
#[derive(Debug, Clone, Default)]
pub struct PageReport {
    pub url: String,
    pub features: Vec<(Feature, Status)>,
    /// Set when the page was passed through untouched because of an error.
    pub error: Option<String>,
}

impl PageReport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Record `status` for `feature`, replacing an earlier entry.
    pub fn record(&mut self, feature: Feature, status: Status) {
        match self.features.iter_mut().find(|(f, _)| *f == feature) {
            Some(entry) => entry.1 = status,
            None => self.features.push((feature, status)),
        }
    }

    pub fn status(&self, feature: Feature) -> Option<&Status> {
        self.features
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|(_, s)| s)
    }

    /// `url: applied [..]; skipped [..]; degraded [..]`
    pub fn summary_line(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{}: passed through ({error})", self.url);
        }
        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        let mut degraded = Vec::new();
        for (feature, status) in &self.features {
            match status {
                Status::Applied => applied.push(feature.to_string()),
                Status::Skipped(why) => skipped.push(format!("{feature}: {why}")),
                Status::Degraded(why) => degraded.push(format!("{feature}: {why}")),
            }
        }
        let mut line = format!("{}: applied [{}]", self.url, applied.join(", "));
        if !skipped.is_empty() {
            line.push_str(&format!("; skipped [{}]", skipped.join(", ")));
        }
        if !degraded.is_empty() {
            line.push_str(&format!("; degraded [{}]", degraded.join(", ")));
        }
        line
    }
}

#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub html: String,
    pub changed: bool,
    pub report: PageReport,
}

impl PageOutcome {
    /// The input, untouched, with the reason.
    pub fn passthrough(html: &str, mut report: PageReport, err: &PageError) -> Self {
        report.error = Some(err.to_string());
        Self {
            html: html.to_owned(),
            changed: false,
            report,
        }
    }
}

/// History backend for a run: the per-run index over the docs directory
/// when enabled and buildable, per-page `git log` otherwise.
pub fn history_source(config: &MetaConfig) -> Box<dyn HistorySource> {
    if config.history_index {
        match HistoryIndex::build(&config.docs_dir()) {
            Ok(index) => return Box::new(index.with_blame(config.blame_authors)),
            Err(err) => log!("git"; "history index unavailable, querying per page: {err}"),
        }
    }
    Box::new(GitLog::new().with_blame(config.blame_authors))
}

pub fn load_authors(config: &MetaConfig) -> Result<AuthorDirectory> {
    match config.authors_file() {
        Some(path) => AuthorDirectory::load(&path),
        None => Ok(AuthorDirectory::default()),
    }
}

fn disabled() -> Status {
    Status::Skipped("disabled".into())
}

pub struct Pipeline<'a> {
    config: &'a MetaConfig,
    resolver: Resolver<'a>,
    cache: &'a ProvenanceCache,
    authors: &'a AuthorDirectory,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a MetaConfig,
        history: &'a dyn HistorySource,
        cache: &'a ProvenanceCache,
        authors: &'a AuthorDirectory,
    ) -> Self {
        Self {
            config,
            resolver: Resolver::new(history, config.default_author()),
            cache,
            authors,
        }
    }

    /// Whether any enabled feature reads provenance.
    pub fn needs_provenance(&self) -> bool {
        let c = self.config;
        c.enabled && (c.add_authors || c.add_dates || c.add_json_ld)
    }

    pub fn provenance(&self, page: &PageMeta) -> Arc<Provenance> {
        match &page.source {
            Some(source) => self.resolver.resolve(source, self.cache),
            None => Arc::new(Provenance::fallback(
                self.config.default_author().as_ref(),
                "page has no source file",
            )),
        }
    }

    pub fn process(&self, html: &str, page: &PageMeta, site: &SiteContext) -> PageOutcome {
        let outcome = self.run(html, page, site);
        if self.config.verbose {
            log!("page"; "{}", outcome.report.summary_line());
        }
        outcome
    }

    fn run(&self, html: &str, page: &PageMeta, site: &SiteContext) -> PageOutcome {
        let config = self.config;
        let mut report = PageReport::new(site.page_url(&page.url));
        if !config.enabled {
            return PageOutcome {
                html: html.to_owned(),
                changed: false,
                report,
            };
        }

        let mut doc = match Document::parse(html, page, site) {
            Ok(doc) => doc,
            Err(err) => return PageOutcome::passthrough(html, report, &err),
        };
        inject::strip(&mut doc.dom);

        let summary = extract(&doc, config);
        let tags = synthesize(&summary, &doc, config);
        let mut regions = Fragments::default();

        report.record(
            Feature::Description,
            match (config.add_desc, tags.contains(MetaTag::Description)) {
                (false, _) => disabled(),
                (true, true) => Status::Applied,
                (true, false) => Status::Degraded("no paragraph long enough".into()),
            },
        );
        report.record(
            Feature::Image,
            match (config.add_image, &summary.image, tags.contains(MetaTag::OgImage)) {
                (false, ..) => disabled(),
                (true, Some(_), _) => Status::Applied,
                (true, None, true) => Status::Degraded("no image found, using default".into()),
                (true, None, false) => Status::Degraded("no image found".into()),
            },
        );
        report.record(
            Feature::Keywords,
            match (config.add_keywords, tags.contains(MetaTag::Keywords)) {
                (false, _) => disabled(),
                (true, true) => Status::Applied,
                (true, false) => Status::Skipped("no front matter keywords".into()),
            },
        );

        match fragments::meta_tags(&tags) {
            Ok(markup) => {
                regions.meta = Some(markup);
                report.record(Feature::Meta, Status::Applied);
            }
            Err(err) => report.record(Feature::Meta, Status::Degraded(err.to_string())),
        }

        let provenance = self
            .needs_provenance()
            .then(|| self.provenance(page));

        // json-ld
        if !config.add_json_ld {
            report.record(Feature::JsonLd, disabled());
        } else if inject::has_foreign_json_ld(&doc.dom) {
            report.record(
                Feature::JsonLd,
                Status::Skipped("page has its own structured data".into()),
            );
        } else if let Some(data) = provenance
            .as_ref()
            .and_then(|p| schema::build(&summary, p, self.authors, &doc, config))
        {
            let rendered = data
                .to_script_json()
                .map_err(PageError::from)
                .and_then(|json| {
                    fragments::json_ld(&json).map_err(|e| PageError::Render(e.to_string()))
                });
            match rendered {
                Ok(markup) => {
                    regions.json_ld = Some(markup);
                    report.record(Feature::JsonLd, Status::Applied);
                }
                Err(err) => report.record(Feature::JsonLd, Status::Degraded(err.to_string())),
            }
        } else {
            report.record(Feature::JsonLd, Status::Skipped("nothing to describe".into()));
        }

        // share buttons
        if config.add_share_buttons {
            match fragments::share_buttons(&doc.url) {
                Ok(markup) => {
                    regions.share = Some(markup);
                    report.record(Feature::Share, Status::Applied);
                }
                Err(err) => report.record(Feature::Share, Status::Degraded(err.to_string())),
            }
        } else {
            report.record(Feature::Share, disabled());
        }

        // footer
        if let Some(provenance) = &provenance {
            self.record_footer(&mut report, provenance);
            if config.add_authors || config.add_dates {
                match fragments::footer(provenance, self.authors, config) {
                    Ok(markup) => regions.footer = markup,
                    Err(err) => {
                        let status = Status::Degraded(err.to_string());
                        report.record(Feature::Authors, status.clone());
                        report.record(Feature::Dates, status);
                    }
                }
            }
        } else {
            report.record(Feature::Authors, disabled());
            report.record(Feature::Dates, disabled());
        }

        // copy for LLM
        if !config.add_copy_llm {
            report.record(Feature::Copy, disabled());
        } else if doc.url.contains("/reference/") {
            report.record(Feature::Copy, Status::Skipped("reference page".into()));
        } else if inject::edit_link(&doc.dom).is_none() {
            report.record(Feature::Copy, Status::Skipped("no edit link".into()));
        } else if inject::has_foreign_copy_button(&doc.dom) {
            report.record(
                Feature::Copy,
                Status::Skipped("page has its own copy button".into()),
            );
        } else {
            match fragments::copy_button().and_then(|b| Ok((b, fragments::copy_script()?))) {
                Ok((button, script)) => {
                    regions.copy_button = Some(button);
                    regions.copy_script = Some(script);
                    report.record(Feature::Copy, Status::Applied);
                }
                Err(err) => report.record(Feature::Copy, Status::Degraded(err.to_string())),
            }
        }

        // one stylesheet for every styled fragment
        if !config.add_css {
            report.record(Feature::Css, disabled());
        } else if regions.share.is_none()
            && regions.footer.is_none()
            && regions.copy_button.is_none()
        {
            report.record(Feature::Css, Status::Skipped("nothing to style".into()));
        } else {
            match fragments::stylesheet() {
                Ok(markup) => {
                    regions.css = Some(markup);
                    report.record(Feature::Css, Status::Applied);
                }
                Err(err) => report.record(Feature::Css, Status::Degraded(err.to_string())),
            }
        }

        for (region, err) in inject::merge(&mut doc, &tags, &regions) {
            let status = Status::Degraded(format!("injection failed: {err}"));
            match region {
                Region::Meta => report.record(Feature::Meta, status),
                Region::JsonLd => report.record(Feature::JsonLd, status),
                Region::Css => report.record(Feature::Css, status),
                Region::Share => report.record(Feature::Share, status),
                Region::Copy => report.record(Feature::Copy, status),
                Region::Footer => {
                    report.record(Feature::Authors, status.clone());
                    report.record(Feature::Dates, status);
                }
            }
        }

        let out = doc.to_html();
        PageOutcome {
            changed: out != html,
            html: out,
            report,
        }
    }

    fn record_footer(&self, report: &mut PageReport, provenance: &Provenance) {
        let reason = provenance.fallback_reason.as_deref().unwrap_or("no history");

        report.record(
            Feature::Authors,
            if !self.config.add_authors {
                disabled()
            } else if provenance.authors.is_empty() {
                Status::Skipped(format!("no authors ({reason})"))
            } else if !provenance.has_history() {
                Status::Degraded(format!("default author ({reason})"))
            } else {
                Status::Applied
            },
        );
        report.record(
            Feature::Dates,
            if !self.config.add_dates {
                disabled()
            } else if provenance.created.is_none() {
                Status::Degraded(format!("no dates ({reason})"))
            } else {
                Status::Applied
            },
        );
    }
}
