//! Idempotent injection.
//!
//! Every injected element carries [`MARKER`]. A run first strips all marked
//! elements, then inserts fresh ones, so repeated runs reach a fixed point.
//! Fragments are inserted without surrounding whitespace: stripping them
//! restores the exact bytes they were inserted into.

use crate::{
    document::Document,
    extract::main_region,
    meta::MetaTagSet,
    utils::html::{Dom, Element, HtmlError, NodeId, ROOT},
};

/// Attribute on every injected element; its value names the [`Region`].
pub const MARKER: &str = "data-docmeta";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Meta,
    JsonLd,
    Css,
    Share,
    Footer,
    Copy,
}

impl Region {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::JsonLd => "jsonld",
            Self::Css => "css",
            Self::Share => "share",
            Self::Footer => "footer",
            Self::Copy => "copy",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[inline]
pub fn is_injected(e: &Element) -> bool {
    e.has_attr(MARKER)
}

/// Rendered markup per region; `None` leaves the region out.
#[derive(Debug, Clone, Default)]
pub struct Fragments {
    pub meta: Option<String>,
    pub json_ld: Option<String>,
    pub css: Option<String>,
    pub share: Option<String>,
    pub footer: Option<String>,
    /// Goes right after the page's edit link.
    pub copy_button: Option<String>,
    /// Goes at the end of `<body>`.
    pub copy_script: Option<String>,
}

/// Detach every marked element. Returns how many were removed.
pub fn strip(dom: &mut Dom) -> usize {
    let marked: Vec<NodeId> = dom
        .descendants(ROOT)
        .filter(|&n| dom.element(n).is_some_and(is_injected))
        .collect();
    for &id in &marked {
        dom.detach(id);
    }
    marked.len()
}

/// Author-provided structured data, which we leave alone.
pub fn has_foreign_json_ld(dom: &Dom) -> bool {
    dom.find(ROOT, |e| {
        e.is("script")
            && !is_injected(e)
            && e.attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
    })
    .is_some()
}

/// The theme's "Edit this page" link.
pub fn edit_link(dom: &Dom) -> Option<NodeId> {
    dom.find(ROOT, |e| {
        e.is("a") && !is_injected(e) && e.attr("title").as_deref() == Some("Edit this page")
    })
}

/// A copy button some other tool already put on the page.
pub fn has_foreign_copy_button(dom: &Dom) -> bool {
    dom.find(ROOT, |e| {
        e.is("a")
            && !is_injected(e)
            && e.attr("onclick")
                .is_some_and(|js| js.contains("copyMarkdownForLLM"))
    })
    .is_some()
}

/// Remove unmarked `<meta>` elements in `<head>` whose `name` or
/// `property` is about to be emitted.
fn remove_colliding_meta(dom: &mut Dom, head: NodeId, tags: &MetaTagSet) -> usize {
    let colliding: Vec<NodeId> = dom
        .descendants(head)
        .filter(|&n| {
            dom.element(n).is_some_and(|e| {
                e.is("meta")
                    && !is_injected(e)
                    && ["name", "property"]
                        .iter()
                        .filter_map(|key| e.attr(key))
                        .any(|key| tags.has_key(key.trim()))
            })
        })
        .collect();
    for &id in &colliding {
        dom.detach(id);
    }
    colliding.len()
}

/// Where share buttons and footer go: before the comments heading if the
/// page has one, else at the end of the main content.
enum Anchor {
    Before(NodeId),
    Append(NodeId),
}

fn content_anchor(dom: &Dom) -> Anchor {
    match dom.find(ROOT, |e| e.is("h2") && e.attr("id").as_deref() == Some("__comments")) {
        Some(comments) => Anchor::Before(comments),
        None => Anchor::Append(main_region(dom)),
    }
}

/// Merge fresh fragments into `doc`.
///
/// Regions are inserted independently; the ones that fail are returned and
/// the rest still land.
pub fn merge(doc: &mut Document, tags: &MetaTagSet, fragments: &Fragments) -> Vec<(Region, HtmlError)> {
    let head = doc.head();
    let dom = &mut doc.dom;
    let mut failures = Vec::new();

    strip(dom);
    if fragments.meta.is_some() {
        remove_colliding_meta(dom, head, tags);
    }

    let head_regions = [
        (Region::Meta, &fragments.meta),
        (Region::JsonLd, &fragments.json_ld),
        (Region::Css, &fragments.css),
    ];
    for (region, markup) in head_regions {
        let Some(markup) = markup else { continue };
        match dom.parse_fragment(markup) {
            Ok(nodes) => dom.append(head, &nodes),
            Err(err) => failures.push((region, err)),
        }
    }

    let mut content = Vec::new();
    let content_regions = [
        (Region::Share, &fragments.share),
        (Region::Footer, &fragments.footer),
    ];
    for (region, markup) in content_regions {
        let Some(markup) = markup else { continue };
        match dom.parse_fragment(markup) {
            Ok(nodes) => content.extend(nodes),
            Err(err) => failures.push((region, err)),
        }
    }
    if !content.is_empty() {
        match content_anchor(dom) {
            Anchor::Before(sibling) => dom.insert_before(sibling, &content),
            Anchor::Append(parent) => dom.append(parent, &content),
        }
    }

    // no edit link, no copy button
    if let Some(edit) = edit_link(dom) {
        if let Some(markup) = &fragments.copy_button {
            match dom.parse_fragment(markup) {
                Ok(nodes) => dom.insert_after(edit, &nodes),
                Err(err) => failures.push((Region::Copy, err)),
            }
        }
        if let Some(markup) = &fragments.copy_script {
            let body = dom.find(ROOT, |e| e.is("body")).unwrap_or(head);
            match dom.parse_fragment(markup) {
                Ok(nodes) => dom.append(body, &nodes),
                Err(err) => failures.push((Region::Copy, err)),
            }
        }
    }

    failures
}
