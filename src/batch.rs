//! Batch mode: augment every page of an already-built site in place.

use crate::{
    config::MetaConfig,
    document::{PageMeta, SiteContext, url_for_output},
    error::PageError,
    log,
    pipeline::{self, PageOutcome, PageReport, Pipeline},
    provenance::ProvenanceCache,
    utils::log::Progress,
};
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub pages: usize,
    pub changed: usize,
    /// Pages passed through untouched or left unwritten after an error.
    pub failed: usize,
}

/// HTML files under `dir`, sorted.
pub fn collect_pages(dir: &Path) -> Vec<PathBuf> {
    let mut pages: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        .map(|e| e.into_path())
        .collect();
    pages.sort();
    pages
}

/// Markdown source for a built page, relative paths on both sides:
/// `a/b/index.html` → `a/b.md`, `a/b/index.md` or `a/b/README.md`;
/// `a/b.html` → `a/b.md`.
pub fn source_for(docs_dir: &Path, rel_html: &Path) -> Option<PathBuf> {
    let parent = rel_html.parent().unwrap_or(Path::new(""));
    let candidates: Vec<PathBuf> = if rel_html.file_name().is_some_and(|n| n == "index.html") {
        let mut candidates = Vec::new();
        if let Some(dir_name) = parent.file_name() {
            let grand = parent.parent().unwrap_or(Path::new(""));
            candidates.push(grand.join(Path::new(dir_name).with_extension("md")));
        }
        candidates.push(parent.join("index.md"));
        candidates.push(parent.join("README.md"));
        candidates
    } else {
        vec![rel_html.with_extension("md")]
    };

    candidates
        .into_iter()
        .map(|rel| docs_dir.join(rel))
        .find(|path| path.is_file())
}

fn page_meta(docs_dir: &Path, rel: &Path) -> PageMeta {
    let url = url_for_output(rel);
    let source = source_for(docs_dir, rel);
    PageMeta::from_source(url.clone(), source.clone()).unwrap_or_else(|err| {
        log!("warn"; "{err:#}");
        PageMeta {
            url,
            source,
            ..PageMeta::default()
        }
    })
}

fn process_file(
    pipeline: &Pipeline<'_>,
    site_dir: &Path,
    docs_dir: &Path,
    path: &Path,
    site: &SiteContext,
) -> Result<PageOutcome> {
    let rel = path.strip_prefix(site_dir).unwrap_or(path);
    let page = page_meta(docs_dir, rel);

    let bytes = fs::read(path).with_context(|| format!("Failed to read `{}`", path.display()))?;
    let Ok(html) = String::from_utf8(bytes) else {
        let report = PageReport::new(site.page_url(&page.url));
        return Ok(PageOutcome::passthrough("", report, &PageError::NotUtf8));
    };

    let outcome = pipeline.process(&html, &page, site);
    if outcome.changed {
        fs::write(path, &outcome.html)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
    }
    Ok(outcome)
}

/// Process every HTML page under `site_dir` in place.
///
/// Page failures are logged and counted; only an invalid configuration, a
/// missing site directory or an unreadable authors file abort the run.
pub fn process_site(site_dir: &Path, site: &SiteContext, config: &MetaConfig) -> Result<BatchReport> {
    config.validate()?;
    if !site_dir.is_dir() {
        bail!("Site directory `{}` not found", site_dir.display());
    }

    let docs_dir = config.docs_dir();
    let pages = collect_pages(site_dir);
    log!("process"; "{} pages under {}", pages.len(), site_dir.display());

    let authors = pipeline::load_authors(config)?;
    let history = pipeline::history_source(config);
    let cache = ProvenanceCache::new();
    let pipeline = Pipeline::new(config, history.as_ref(), &cache, &authors);

    let progress = Progress::new("process", pages.len());
    let results: Vec<(PathBuf, Result<PageOutcome>)> = pages
        .par_iter()
        .map(|path| {
            let result = process_file(&pipeline, site_dir, &docs_dir, path, site);
            progress.inc();
            (path.clone(), result)
        })
        .collect();
    progress.finish();

    let mut report = BatchReport {
        pages: pages.len(),
        ..BatchReport::default()
    };
    for (path, result) in results {
        match result {
            Ok(outcome) if outcome.report.error.is_some() => {
                report.failed += 1;
                log!("warn"; "{}", outcome.report.summary_line());
            }
            Ok(outcome) => report.changed += usize::from(outcome.changed),
            Err(err) => {
                report.failed += 1;
                log!("error"; "{}: {err:#}", path.display());
            }
        }
    }

    log!(
        "process";
        "{} of {} pages updated, {} failed",
        report.changed,
        report.pages,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Hooks;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="description" content="stale">
  <title>Setup</title>
</head>
<body>
<article class="md-content__inner">
<h1>Setup</h1>
<p>Install the tool and configure your site in minutes.</p>
</article>
</body>
</html>
"#;

    struct Site {
        _root: tempfile::TempDir,
        site_dir: PathBuf,
        config: MetaConfig,
    }

    /// A built site plus its sources, outside any git repository view
    /// that matters: history falls back to the default author.
    fn site() -> Site {
        let root = tempfile::TempDir::new().unwrap();
        let docs = root.path().join("docs");
        let site_dir = root.path().join("site");
        fs::create_dir_all(docs.join("guide")).unwrap();
        fs::create_dir_all(site_dir.join("guide/setup")).unwrap();

        fs::write(
            docs.join("guide/setup.md"),
            "---\nkeywords:\n  - install\n  - setup\n---\n# Setup\n",
        )
        .unwrap();
        fs::write(site_dir.join("guide/setup/index.html"), PAGE).unwrap();
        fs::write(site_dir.join("404.html"), "<p>Not found</p>").unwrap();
        fs::write(site_dir.join("style.css"), "body{}").unwrap();

        let config = MetaConfig {
            docs_dir: docs,
            history_index: false,
            default_author: Some("Docs Team".into()),
            ..MetaConfig::default()
        };
        Site {
            _root: root,
            site_dir,
            config,
        }
    }

    #[test]
    fn test_source_for() {
        let dir = tempfile::TempDir::new().unwrap();
        let docs = dir.path();
        fs::create_dir_all(docs.join("a/c")).unwrap();
        fs::write(docs.join("a/b.md"), "").unwrap();
        fs::write(docs.join("a/c/README.md"), "").unwrap();
        fs::write(docs.join("index.md"), "").unwrap();
        fs::write(docs.join("a/page.md"), "").unwrap();

        assert_eq!(
            source_for(docs, Path::new("a/b/index.html")),
            Some(docs.join("a/b.md"))
        );
        assert_eq!(
            source_for(docs, Path::new("a/c/index.html")),
            Some(docs.join("a/c/README.md"))
        );
        assert_eq!(
            source_for(docs, Path::new("index.html")),
            Some(docs.join("index.md"))
        );
        assert_eq!(
            source_for(docs, Path::new("a/page.html")),
            Some(docs.join("a/page.md"))
        );
        assert_eq!(source_for(docs, Path::new("missing/index.html")), None);
    }

    #[test]
    fn test_collect_pages_only_html() {
        let s = site();
        let pages = collect_pages(&s.site_dir);
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.extension().unwrap() == "html"));
    }

    #[test]
    fn test_process_site_rewrites_changed_pages() {
        let s = site();
        let site_ctx = SiteContext::new(Some("https://docs.example.com/")).unwrap();

        let report = process_site(&s.site_dir, &site_ctx, &s.config).unwrap();
        assert_eq!(report.pages, 2);
        assert_eq!(report.changed, 1);
        // the 404 fragment has no <head>
        assert_eq!(report.failed, 1);

        let out = fs::read_to_string(s.site_dir.join("guide/setup/index.html")).unwrap();
        assert!(out.contains(r#"<meta name="keywords" content="install, setup" data-docmeta="meta"/>"#));
        assert!(!out.contains("stale"));
        assert!(out.contains(">Docs Team</span>"));
        assert_eq!(
            fs::read_to_string(s.site_dir.join("404.html")).unwrap(),
            "<p>Not found</p>"
        );

        // a second run converges
        let again = process_site(&s.site_dir, &site_ctx, &s.config).unwrap();
        assert_eq!(again.changed, 0);
        assert_eq!(
            fs::read_to_string(s.site_dir.join("guide/setup/index.html")).unwrap(),
            out
        );
    }

    #[test]
    fn test_hook_and_batch_outputs_match() {
        let s = site();
        let site_ctx = SiteContext::new(Some("https://docs.example.com/")).unwrap();
        let source = s.config.docs_dir().join("guide/setup.md");

        let hooks = Hooks::new(s.config.clone(), site_ctx.clone()).unwrap();
        let page = PageMeta::from_source("guide/setup/", Some(source)).unwrap();
        hooks.on_page_content("<p>rendered markdown</p>", &page);
        let from_hook = hooks.on_post_page(PAGE, &page);

        process_site(&s.site_dir, &site_ctx, &s.config).unwrap();
        let from_batch = fs::read_to_string(s.site_dir.join("guide/setup/index.html")).unwrap();

        assert_eq!(from_hook, from_batch);
    }

    #[test]
    fn test_non_utf8_page_is_left_alone() {
        let s = site();
        let path = s.site_dir.join("binary.html");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x3c]).unwrap();

        let report = process_site(&s.site_dir, &SiteContext::default(), &s.config).unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(fs::read(&path).unwrap(), [0xff, 0xfe, 0x00, 0x3c]);
    }

    #[test]
    fn test_invalid_config_aborts_before_any_page() {
        let mut s = site();
        s.config.default_image = Some("card.png".into());
        assert!(process_site(&s.site_dir, &SiteContext::default(), &s.config).is_err());
        assert_eq!(
            fs::read_to_string(s.site_dir.join("guide/setup/index.html")).unwrap(),
            PAGE
        );
    }

    #[test]
    fn test_missing_site_dir() {
        let s = site();
        let missing = s.site_dir.join("nope");
        assert!(process_site(&missing, &SiteContext::default(), &s.config).is_err());
    }
}
