//! Page input: the parsed document plus what the host knows about it.

use crate::{
    error::PageError,
    utils::html::{Dom, NodeId, ROOT, text::collapse_whitespace},
};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use url::{Position, Url};

/// Stand-in origin for resolving links on pages without a site URL.
const LOCAL_BASE: &str = "http://docmeta.invalid/";
const LOCAL_HOST: &str = "docmeta.invalid";

// ============================================================================
// Front matter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterValue {
    Text(String),
    List(Vec<String>),
}

pub type FrontMatter = BTreeMap<String, FrontMatterValue>;

/// Read the `---` fenced YAML block at the top of a Markdown source.
///
/// Scalars become text, sequences of scalars become lists, anything else is
/// dropped. Missing or malformed front matter yields an empty map.
pub fn parse_front_matter(source: &str) -> FrontMatter {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.split_inclusive('\n');
    if lines.next().map(str::trim_end) != Some("---") {
        return FrontMatter::new();
    }

    let mut yaml = String::new();
    let mut closed = false;
    for line in lines {
        if matches!(line.trim_end(), "---" | "...") {
            closed = true;
            break;
        }
        yaml.push_str(line);
    }
    if !closed {
        return FrontMatter::new();
    }

    let Ok(Value::Mapping(mapping)) = serde_yaml::from_str::<Value>(&yaml) else {
        return FrontMatter::new();
    };

    mapping
        .into_iter()
        .filter_map(|(key, value)| {
            let key = scalar_text(&key)?;
            let value = match &value {
                Value::Sequence(items) => {
                    FrontMatterValue::List(items.iter().filter_map(scalar_text).collect())
                }
                other => FrontMatterValue::Text(scalar_text(other)?),
            };
            Some((key, value))
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Site and page context
// ============================================================================

/// Values shared by every page of one build.
#[derive(Debug, Clone, Default)]
pub struct SiteContext {
    /// Always ends with `/`.
    pub site_url: Option<Url>,
}

impl SiteContext {
    pub fn new(site_url: Option<&str>) -> Result<Self> {
        let site_url = site_url
            .map(|raw| {
                let with_slash = if raw.ends_with('/') {
                    raw.to_owned()
                } else {
                    format!("{raw}/")
                };
                Url::parse(&with_slash).with_context(|| format!("Invalid site URL `{raw}`"))
            })
            .transpose()?;
        Ok(Self { site_url })
    }

    /// Absolute URL of a site-relative page path, or the path itself
    /// (rooted at `/`) when no site URL is configured.
    pub fn page_url(&self, rel: &str) -> String {
        let rel = rel.trim_start_matches('/');
        match &self.site_url {
            Some(base) => base
                .join(rel)
                .map(String::from)
                .unwrap_or_else(|_| format!("{base}{rel}")),
            None => format!("/{rel}"),
        }
    }
}

/// Site-relative page URL for a built file: `a/b/index.html` → `a/b/`,
/// `index.html` → ``, `a/b.html` → `a/b.html`.
pub fn url_for_output(rel: &Path) -> String {
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match rel.strip_suffix("index.html") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => dir.to_owned(),
        _ => rel,
    }
}

/// What the host knows about a page besides its HTML.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    /// Site-relative URL, e.g. `guide/setup/`.
    pub url: String,
    /// Markdown source, if known.
    pub source: Option<PathBuf>,
    /// Title chosen by the host, overriding front matter and headings.
    pub title: Option<String>,
    pub front_matter: FrontMatter,
}

impl PageMeta {
    /// Page metadata with front matter read from `source`.
    pub fn from_source(url: impl Into<String>, source: Option<PathBuf>) -> Result<Self> {
        let front_matter = match &source {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read `{}`", path.display()))?;
                parse_front_matter(&content)
            }
            None => FrontMatter::new(),
        };
        Ok(Self {
            url: url.into(),
            source,
            title: None,
            front_matter,
        })
    }

    pub fn front_matter_text(&self, key: &str) -> Option<&str> {
        match self.front_matter.get(key)? {
            FrontMatterValue::Text(s) => Some(s.as_str()),
            FrontMatterValue::List(_) => None,
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// One page during processing.
#[derive(Debug, Clone)]
pub struct Document {
    pub dom: Dom,
    /// Absolute page URL when the site URL is known, otherwise `/rel`.
    pub url: String,
    pub source: Option<PathBuf>,
    pub front_matter: FrontMatter,
    pub title: Option<String>,
    head: NodeId,
}

impl Document {
    pub fn parse(html: &str, page: &PageMeta, site: &SiteContext) -> Result<Self, PageError> {
        let dom = Dom::parse(html)?;
        let head = dom.find(ROOT, |e| e.is("head")).ok_or(PageError::MissingHead)?;

        let title = page
            .title
            .clone()
            .or_else(|| page.front_matter_text("title").map(str::to_owned))
            .or_else(|| heading_title(&dom))
            .filter(|t| !t.is_empty());

        Ok(Self {
            dom,
            url: site.page_url(&page.url),
            source: page.source.clone(),
            front_matter: page.front_matter.clone(),
            title,
            head,
        })
    }

    #[inline]
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// Resolve `href` against the page URL. Without a site URL the result
    /// is root-relative (`/guide/img/a.png`).
    pub fn resolve_url(&self, href: &str) -> String {
        if let Ok(base) = Url::parse(&self.url) {
            return base.join(href).map_or_else(|_| href.to_owned(), String::from);
        }
        let resolved = Url::parse(LOCAL_BASE)
            .and_then(|root| root.join(&self.url))
            .and_then(|page| page.join(href));
        match resolved {
            Ok(url) if url.host_str() == Some(LOCAL_HOST) => url[Position::BeforePath..].to_owned(),
            Ok(url) => url.into(),
            Err(_) => href.to_owned(),
        }
    }

    pub fn to_html(&self) -> String {
        self.dom.to_html()
    }
}

/// First `<h1>`, else `<title>`, ignoring permalink anchors.
fn heading_title(dom: &Dom) -> Option<String> {
    ["h1", "title"].into_iter().find_map(|tag| {
        let id = dom.find(ROOT, |e| e.is(tag))?;
        let text = collapse_whitespace(&dom.text_content(id, |e| e.has_class("headerlink")));
        (!text.is_empty()).then_some(text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter_values() {
        let fm = parse_front_matter(
            "---\ntitle: Setup Guide\nkeywords:\n  - install\n  - setup\nweight: 3\nnested:\n  a: 1\n---\n# Body\n",
        );
        assert_eq!(
            fm.get("title"),
            Some(&FrontMatterValue::Text("Setup Guide".into()))
        );
        assert_eq!(
            fm.get("keywords"),
            Some(&FrontMatterValue::List(vec!["install".into(), "setup".into()]))
        );
        assert_eq!(fm.get("weight"), Some(&FrontMatterValue::Text("3".into())));
        assert!(!fm.contains_key("nested"));
    }

    #[test]
    fn test_front_matter_absent_or_unclosed() {
        assert!(parse_front_matter("# Just a heading\n").is_empty());
        assert!(parse_front_matter("---\ntitle: x\n").is_empty());
        assert!(parse_front_matter("---\n: : :\n---\n").is_empty());
    }

    #[test]
    fn test_front_matter_crlf() {
        let fm = parse_front_matter("---\r\ntitle: Win\r\n---\r\nbody");
        assert_eq!(fm.get("title"), Some(&FrontMatterValue::Text("Win".into())));
    }

    #[test]
    fn test_url_for_output() {
        assert_eq!(url_for_output(Path::new("index.html")), "");
        assert_eq!(url_for_output(Path::new("guide/setup/index.html")), "guide/setup/");
        assert_eq!(url_for_output(Path::new("guide/page.html")), "guide/page.html");
        assert_eq!(url_for_output(Path::new("guide/myindex.html")), "guide/myindex.html");
    }

    #[test]
    fn test_page_url() {
        let site = SiteContext::new(Some("https://example.com/docs")).unwrap();
        assert_eq!(site.page_url("guide/"), "https://example.com/docs/guide/");
        assert_eq!(site.page_url(""), "https://example.com/docs/");

        let local = SiteContext::default();
        assert_eq!(local.page_url("guide/"), "/guide/");
    }

    #[test]
    fn test_document_requires_head() {
        let page = PageMeta::default();
        let site = SiteContext::default();
        let err = Document::parse("<p>fragment</p>", &page, &site).unwrap_err();
        assert!(matches!(err, PageError::MissingHead));
    }

    #[test]
    fn test_document_title_order() {
        let site = SiteContext::default();
        let html = r##"<html><head><title>Tab - Site</title></head><body><h1>Heading<a class="headerlink" href="#h">¶</a></h1></body></html>"##;

        let doc = Document::parse(html, &PageMeta::default(), &site).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Heading"));

        let mut page = PageMeta::default();
        page.front_matter
            .insert("title".into(), FrontMatterValue::Text("From YAML".into()));
        let doc = Document::parse(html, &page, &site).unwrap();
        assert_eq!(doc.title.as_deref(), Some("From YAML"));

        let no_h1 = "<html><head><title>Tab - Site</title></head><body></body></html>";
        let doc = Document::parse(no_h1, &PageMeta::default(), &site).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Tab - Site"));
    }

    #[test]
    fn test_resolve_url() {
        let site = SiteContext::new(Some("https://example.com/")).unwrap();
        let page = PageMeta {
            url: "guide/setup/".into(),
            ..PageMeta::default()
        };
        let doc = Document::parse("<html><head></head></html>", &page, &site).unwrap();
        assert_eq!(
            doc.resolve_url("../img/a.png"),
            "https://example.com/guide/img/a.png"
        );
        assert_eq!(
            doc.resolve_url("https://cdn.example.com/b.png"),
            "https://cdn.example.com/b.png"
        );

        let local = Document::parse("<html><head></head></html>", &page, &SiteContext::default())
            .unwrap();
        assert_eq!(local.resolve_url("img/a.png"), "/guide/setup/img/a.png");
        assert_eq!(local.resolve_url("/assets/card.png"), "/assets/card.png");
        assert_eq!(
            local.resolve_url("https://cdn.example.com/b.png"),
            "https://cdn.example.com/b.png"
        );
    }
}
