//! Summary signals read from a rendered page.
//!
//! Extraction only reads the tree. Regions injected by a previous run are
//! ignored, so a processed page yields the same summary as a fresh one.

use crate::{
    config::MetaConfig,
    document::{Document, FrontMatterValue},
    inject::is_injected,
    utils::html::{
        Dom, Element, Node, NodeId, ROOT,
        text::{collapse_whitespace, truncate_at_word},
    },
};
use regex::Regex;
use std::sync::LazyLock;

/// Paragraphs this short are navigation crumbs, not summaries.
const MIN_PARAGRAPH_CHARS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 500;

const DECORATIVE_CLASSES: &[&str] = &["twemoji", "emojione", "gemoji", "emoji", "decorative"];
const UNSAFE_SCHEMES: &[&str] = &["data:", "javascript:", "blob:"];

static RE_FAQ_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:faqs?|frequently asked questions)\s*:?\s*$").unwrap()
});

static RE_YOUTUBE_EMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube(?:-nocookie)?\.com/embed/([A-Za-z0-9_-]+)").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSummary {
    /// First qualifying paragraph, whitespace-collapsed and truncated.
    pub description: Option<String>,
    /// First content image, resolved against the page URL.
    pub image: Option<String>,
    /// Front matter keywords, as written.
    pub keywords: Option<Vec<String>>,
    pub faq: Vec<FaqPair>,
}

pub fn extract(doc: &Document, config: &MetaConfig) -> ExtractedSummary {
    let dom = &doc.dom;
    let region = main_region(dom);

    ExtractedSummary {
        description: config
            .add_desc
            .then(|| first_paragraph(dom, region))
            .flatten(),
        image: config
            .add_image
            .then(|| first_image(dom, region).map(|src| doc.resolve_url(&src)))
            .flatten(),
        keywords: config.add_keywords.then(|| keywords(doc)).flatten(),
        faq: if config.add_json_ld {
            faq_pairs(dom, region)
        } else {
            Vec::new()
        },
    }
}

/// Content area of the page, falling back to ever wider containers.
pub fn main_region(dom: &Dom) -> NodeId {
    dom.find(ROOT, |e| e.has_class("md-content__inner"))
        .or_else(|| dom.find(ROOT, |e| e.is("main")))
        .or_else(|| dom.find(ROOT, |e| e.is("article")))
        .or_else(|| dom.find(ROOT, |e| e.is("body")))
        .unwrap_or(ROOT)
}

fn is_skipped_container(e: &Element) -> bool {
    if is_injected(e) {
        return true;
    }
    if matches!(
        e.name(),
        "aside" | "details" | "figure" | "figcaption" | "caption" | "nav" | "header" | "footer"
    ) {
        return true;
    }
    e.classes().iter().any(|c| {
        c.starts_with("admonition")
            || c.starts_with("callout")
            || c == "caption"
            || c.ends_with("-caption")
    })
}

/// True if `id` or any of its ancestors is a skipped container.
fn in_skipped_container(dom: &Dom, id: NodeId) -> bool {
    std::iter::once(id)
        .chain(dom.ancestors(id))
        .filter_map(|n| dom.element(n))
        .any(is_skipped_container)
}

fn visible_text(dom: &Dom, id: NodeId) -> String {
    collapse_whitespace(&dom.text_content(id, |e| is_injected(e) || e.has_class("headerlink")))
}

fn first_paragraph(dom: &Dom, region: NodeId) -> Option<String> {
    dom.descendants(region)
        .filter(|&n| dom.element(n).is_some_and(|e| e.is("p")))
        .filter(|&n| !in_skipped_container(dom, n))
        .map(|n| visible_text(dom, n))
        .find(|text| text.chars().count() > MIN_PARAGRAPH_CHARS)
        .map(|text| truncate_at_word(&text, MAX_DESCRIPTION_CHARS))
}

fn is_decorative(e: &Element) -> bool {
    e.classes()
        .iter()
        .any(|c| DECORATIVE_CLASSES.contains(&c.as_str()))
        || e.attr("role").is_some_and(|r| r.eq_ignore_ascii_case("presentation"))
        || e.attr("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn usable_src(src: &str) -> bool {
    let lower = src.trim_start().to_ascii_lowercase();
    !src.trim().is_empty() && !UNSAFE_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// `src` of the first content image, or a YouTube thumbnail for the first
/// embedded video when there is no image.
fn first_image(dom: &Dom, region: NodeId) -> Option<String> {
    let image = dom.descendants(region).find_map(|n| {
        let e = dom.element(n).filter(|e| e.is("img"))?;
        if is_decorative(e) || dom.ancestors(n).filter_map(|a| dom.element(a)).any(is_injected) {
            return None;
        }
        // lazy loaders keep a placeholder in `src` and the real image in `data-src`
        ["src", "data-src"]
            .into_iter()
            .filter_map(|key| e.attr(key))
            .map(|src| src.trim().to_owned())
            .find(|src| usable_src(src))
    });

    image.or_else(|| {
        dom.descendants(region).find_map(|n| {
            let src = dom.element(n).filter(|e| e.is("iframe"))?.attr("src")?;
            let id = RE_YOUTUBE_EMBED.captures(&src)?.get(1)?.as_str().to_owned();
            Some(format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg"))
        })
    })
}

fn keywords(doc: &Document) -> Option<Vec<String>> {
    let keywords: Vec<String> = match doc.front_matter.get("keywords")? {
        FrontMatterValue::Text(s) => vec![s.trim().to_owned()],
        FrontMatterValue::List(items) => items.iter().map(|s| s.trim().to_owned()).collect(),
    };
    let keywords: Vec<String> = keywords.into_iter().filter(|k| !k.is_empty()).collect();
    (!keywords.is_empty()).then_some(keywords)
}

fn is_faq_heading(dom: &Dom, id: NodeId, e: &Element) -> bool {
    e.heading_level().is_some()
        && (e
            .attr("id")
            .is_some_and(|id| id.to_ascii_lowercase().contains("faq"))
            || RE_FAQ_HEADING.is_match(&visible_text(dom, id)))
}

/// Question/answer pairs under the first FAQ heading.
///
/// Deeper headings that follow the FAQ heading as siblings are questions;
/// the siblings after each question, up to the next heading, are its answer.
/// A heading at the FAQ heading's level or above ends the section.
fn faq_pairs(dom: &Dom, region: NodeId) -> Vec<FaqPair> {
    let Some(start) = dom
        .descendants(region)
        .find(|&n| dom.element(n).is_some_and(|e| is_faq_heading(dom, n, e)))
    else {
        return Vec::new();
    };
    let Some(level) = dom.element(start).and_then(Element::heading_level) else {
        return Vec::new();
    };
    let Some(parent) = dom.parent(start) else {
        return Vec::new();
    };

    let siblings = dom.children(parent);
    let after = siblings
        .iter()
        .position(|&c| c == start)
        .map_or(&[][..], |i| &siblings[i + 1..]);

    let mut pairs = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    let mut flush = |current: &mut Option<(String, Vec<String>)>| {
        if let Some((question, parts)) = current.take() {
            let answer = collapse_whitespace(&parts.join(" "));
            if !question.is_empty() && !answer.is_empty() {
                pairs.push(FaqPair { question, answer });
            }
        }
    };

    for &sibling in after {
        match dom.node(sibling) {
            Node::Element(e) if is_injected(e) => {}
            Node::Element(e) => match e.heading_level() {
                Some(l) if l <= level => break,
                Some(_) => {
                    flush(&mut current);
                    current = Some((visible_text(dom, sibling), Vec::new()));
                }
                None => {
                    if let Some((_, parts)) = current.as_mut() {
                        parts.push(visible_text(dom, sibling));
                    }
                }
            },
            Node::Text(_) => {
                if let Some((_, parts)) = current.as_mut() {
                    parts.push(visible_text(dom, sibling));
                }
            }
            Node::Root | Node::Raw(_) => {}
        }
    }
    flush(&mut current);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PageMeta, SiteContext};

    fn doc(body: &str) -> Document {
        let html = format!("<html><head><title>T</title></head><body>{body}</body></html>");
        Document::parse(&html, &PageMeta::default(), &SiteContext::default()).unwrap()
    }

    fn summary(body: &str) -> ExtractedSummary {
        extract(&doc(body), &MetaConfig::default())
    }

    #[test]
    fn test_first_paragraph_skips_short_and_callouts() {
        let s = summary(
            r#"<article class="md-content__inner">
                <p>Home</p>
                <div class="admonition note"><p>This note is long enough to count.</p></div>
                <figure><p>A caption paragraph that is long.</p></figure>
                <p>The   real
                   introduction text.</p>
            </article>"#,
        );
        assert_eq!(s.description.as_deref(), Some("The real introduction text."));
    }

    #[test]
    fn test_main_region_preferred_over_chrome() {
        let s = summary(
            r#"<header><p>Site wide banner text here.</p></header>
               <div class="md-content__inner"><p>Content paragraph, long enough.</p></div>"#,
        );
        assert_eq!(s.description.as_deref(), Some("Content paragraph, long enough."));
    }

    #[test]
    fn test_no_paragraph_means_no_description() {
        assert_eq!(summary("<main><p>tiny</p></main>").description, None);
    }

    #[test]
    fn test_description_truncated_at_word() {
        let long = "word ".repeat(200);
        let s = summary(&format!("<main><p>{long}</p></main>"));
        let desc = s.description.unwrap();
        assert!(desc.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(desc.ends_with("word"));
    }

    #[test]
    fn test_bare_less_than_stays_in_paragraph() {
        let s = summary(
            "<main><p>if a < b then this paragraph is long</p><p>Second paragraph long enough.</p></main>",
        );
        assert_eq!(
            s.description.as_deref(),
            Some("if a < b then this paragraph is long")
        );
    }

    #[test]
    fn test_description_decodes_entities() {
        let s = summary("<main><p>Fish &amp; chips, Q & A &lt;here&gt;</p></main>");
        assert_eq!(s.description.as_deref(), Some("Fish & chips, Q & A <here>"));
    }

    #[test]
    fn test_first_image_rules() {
        let s = summary(
            r#"<main>
                <img class="twemoji" src="/emoji.svg">
                <img src="data:image/png;base64,AAAA" data-src="lazy/real.png">
                <img src="second.png">
            </main>"#,
        );
        assert_eq!(s.image.as_deref(), Some("/lazy/real.png"));
    }

    #[test]
    fn test_image_skips_hidden_and_injected() {
        let s = summary(
            r#"<main>
                <div data-docmeta="footer"><img src="/avatar.png"></div>
                <img aria-hidden="true" src="/hidden.png">
                <img role="presentation" src="/spacer.gif">
                <img src="https://cdn.example.com/shot.png">
            </main>"#,
        );
        assert_eq!(s.image.as_deref(), Some("https://cdn.example.com/shot.png"));
    }

    #[test]
    fn test_youtube_thumbnail_fallback() {
        let s = summary(
            r#"<main><iframe src="https://www.youtube.com/embed/abc_123-X?start=4"></iframe></main>"#,
        );
        assert_eq!(
            s.image.as_deref(),
            Some("https://img.youtube.com/vi/abc_123-X/maxresdefault.jpg")
        );
    }

    #[test]
    fn test_image_resolved_against_site_url() {
        let site = SiteContext::new(Some("https://example.com/")).unwrap();
        let page = PageMeta {
            url: "guide/".into(),
            ..PageMeta::default()
        };
        let doc = Document::parse(
            r#"<html><head></head><body><main><img src="img/a.png"></main></body></html>"#,
            &page,
            &site,
        )
        .unwrap();
        let s = extract(&doc, &MetaConfig::default());
        assert_eq!(s.image.as_deref(), Some("https://example.com/guide/img/a.png"));
    }

    #[test]
    fn test_disabled_features_are_not_extracted() {
        let mut config = MetaConfig::default();
        config.add_desc = false;
        config.add_image = false;
        let s = extract(
            &doc(r#"<main><p>Long enough paragraph.</p><img src="a.png"></main>"#),
            &config,
        );
        assert_eq!(s.description, None);
        assert_eq!(s.image, None);
    }

    #[test]
    fn test_keywords_from_front_matter() {
        let mut d = doc("");
        d.front_matter.insert(
            "keywords".into(),
            FrontMatterValue::List(vec!["a".into(), " b ".into(), "".into()]),
        );
        let s = extract(&d, &MetaConfig::default());
        assert_eq!(s.keywords, Some(vec!["a".to_owned(), "b".to_owned()]));

        d.front_matter
            .insert("keywords".into(), FrontMatterValue::Text("x, y".into()));
        let s = extract(&d, &MetaConfig::default());
        assert_eq!(s.keywords, Some(vec!["x, y".to_owned()]));
    }

    #[test]
    fn test_faq_pairs_in_order() {
        let s = summary(
            r##"<article class="md-content__inner">
                <h1>Guide</h1>
                <h2 id="faq">FAQ<a class="headerlink" href="#faq">¶</a></h2>
                <h3>How do I install it?</h3>
                <p>Run the installer.</p>
                <p>Then restart.</p>
                <h3>Is it free?</h3>
                <p>Yes.</p>
                <h3>Empty question?</h3>
                <h2>Next section</h2>
                <h3>Not a FAQ</h3>
                <p>Ignored.</p>
            </article>"##,
        );
        assert_eq!(
            s.faq,
            vec![
                FaqPair {
                    question: "How do I install it?".into(),
                    answer: "Run the installer. Then restart.".into(),
                },
                FaqPair {
                    question: "Is it free?".into(),
                    answer: "Yes.".into(),
                },
            ]
        );
    }

    #[test]
    fn test_faq_heading_by_text() {
        let s = summary(
            "<main><h2>Frequently Asked Questions</h2><h4>Why?</h4><p>Because.</p></main>",
        );
        assert_eq!(s.faq.len(), 1);
        assert_eq!(s.faq[0].question, "Why?");
    }

    #[test]
    fn test_no_faq_heading() {
        let s = summary("<main><h2>Questions answered</h2><h3>Q</h3><p>A</p></main>");
        assert!(s.faq.is_empty());
    }
}
