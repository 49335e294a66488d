//! Markup for the injected regions.
//!
//! Each renderer returns a self-contained fragment whose outer element
//! carries the injection marker. Output depends only on its inputs, so the
//! same page renders to the same bytes on every run.
//!
//! [`StructuredData::to_script_json`]: crate::schema::StructuredData::to_script_json

use crate::{
    config::MetaConfig,
    inject::{MARKER, Region},
    meta::MetaTagSet,
    provenance::{AuthorDirectory, Contributor, Provenance},
    utils::html::writer::{
        HtmlWriter, create_html_writer, finish, write_empty_elem, write_end, write_raw_element,
        write_start, write_text, write_text_element, write_trusted,
    },
};
use anyhow::Result;
use chrono::{DateTime, FixedOffset};

const X_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" aria-hidden="true"><path d="M18.901 1.153h3.68l-8.04 9.19L24 22.846h-7.406l-5.8-7.584-6.638 7.584H.474l8.6-9.83L0 1.154h7.594l5.243 6.932ZM17.61 20.644h2.039L6.486 3.24H4.298Z"/></svg>"#;

const LINKEDIN_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" aria-hidden="true"><path d="M20.45 20.45h-3.56v-5.57c0-1.33-.02-3.04-1.85-3.04-1.85 0-2.14 1.45-2.14 2.94v5.67H9.35V9h3.41v1.56h.05c.48-.9 1.64-1.85 3.37-1.85 3.6 0 4.27 2.37 4.27 5.46v6.28zM5.34 7.43a2.06 2.06 0 1 1 0-4.13 2.06 2.06 0 0 1 0 4.13zM7.12 20.45H3.56V9h3.56v11.45zM22.22 0H1.77C.79 0 0 .77 0 1.73v20.54C0 23.23.79 24 1.77 24h20.45c.98 0 1.78-.77 1.78-1.73V1.73C24 .77 23.2 0 22.22 0z"/></svg>"#;

const COPY_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" aria-hidden="true"><path d="M19 21H8V7h11m0-2H8a2 2 0 0 0-2 2v14a2 2 0 0 0 2 2h11a2 2 0 0 0 2-2V7a2 2 0 0 0-2-2m-3-4H4a2 2 0 0 0-2 2v14h2V3h12V1z"/></svg>"#;

/// Fetches the raw Markdown behind the page's edit link and copies it,
/// prefixed with the page title and URL, to the clipboard.
const COPY_SCRIPT: &str = r#"
document.addEventListener("click", async (event) => {
  const button = event.target.closest('a[data-docmeta="copy"]');
  if (!button) return;
  event.preventDefault();
  const edit = document.querySelector('a[title="Edit this page"]');
  if (!edit) return;
  const original = button.innerHTML;
  const restore = () => setTimeout(() => { button.innerHTML = original; }, 2000);
  const raw = edit.href
    .replace("github.com", "raw.githubusercontent.com")
    .replace("/blob/", "/")
    .replace("/tree/", "/")
    .replace("/edit/", "/");
  try {
    let markdown = await (await fetch(raw)).text();
    if (markdown.startsWith("---")) {
      const end = markdown.indexOf("
---
", 3);
      if (end !== -1) markdown = markdown.substring(end + 5).trim();
    }
    const title = document.querySelector("h1")?.textContent || document.title;
    await navigator.clipboard.writeText(`# ${title}

Source: ${window.location.href}

---

${markdown}`);
    button.textContent = "Copied!";
  } catch (err) {
    button.textContent = "Copy failed";
  }
  restore();
});
"#;

const STYLESHEET: &str = "\
.docmeta-share,.docmeta-footer__dates,.docmeta-footer__authors{display:flex;align-items:center;justify-content:flex-end;flex-wrap:wrap;gap:.5rem}\
.docmeta-share{margin-top:1rem}\
.docmeta-share__button{display:inline-flex;align-items:center;gap:.4rem;padding:.3rem .75rem;border-radius:.3rem;background:#1d1d1d;color:#fff;font-size:.8rem;text-decoration:none;transition:transform .2s ease}\
.docmeta-share__button--linkedin{background:#0a66c2}\
.docmeta-share__button:hover{color:#fff;transform:scale(1.05)}\
.docmeta-share__button svg{width:1em;height:1em;fill:currentColor}\
.docmeta-copy svg{width:1.2rem;height:1.2rem;fill:currentColor}\
.docmeta-footer{margin-top:1rem;font-size:.8em;color:grey}\
.docmeta-footer__authors{margin-top:.5rem}\
.docmeta-footer__author img{width:2.5rem;height:2.5rem;border-radius:50%;filter:grayscale(100%);transition:filter .2s ease}\
.docmeta-footer__author img:hover{filter:none}\
@media (max-width:1024px){.docmeta-footer__dates,.docmeta-footer__authors{justify-content:flex-start}}";

/// `<meta>` elements in tag order.
pub fn meta_tags(tags: &MetaTagSet) -> Result<String> {
    let mut w = create_html_writer();
    for (tag, content) in tags.iter() {
        write_empty_elem(
            &mut w,
            "meta",
            &[
                (tag.attr(), tag.key()),
                ("content", content),
                (MARKER, Region::Meta.as_str()),
            ],
        )?;
    }
    finish(w)
}

/// `json` must already be script-safe, see [`StructuredData::to_script_json`].
pub fn json_ld(json: &str) -> Result<String> {
    let mut w = create_html_writer();
    write_raw_element(
        &mut w,
        "script",
        &[("type", "application/ld+json"), (MARKER, Region::JsonLd.as_str())],
        json,
    )?;
    finish(w)
}

pub fn stylesheet() -> Result<String> {
    let mut w = create_html_writer();
    write_raw_element(&mut w, "style", &[(MARKER, Region::Css.as_str())], STYLESHEET)?;
    finish(w)
}

/// X and LinkedIn share links for `page_url`.
pub fn share_buttons(page_url: &str) -> Result<String> {
    let encoded = urlencoding::encode(page_url);
    let x = format!("https://x.com/intent/tweet?url={encoded}");
    let linkedin = format!("https://www.linkedin.com/sharing/share-offsite/?url={encoded}");

    let mut w = create_html_writer();
    write_start(
        &mut w,
        "div",
        &[("class", "docmeta-share"), (MARKER, Region::Share.as_str())],
    )?;
    share_link(&mut w, &x, "docmeta-share__button docmeta-share__button--x", X_ICON, "Post")?;
    share_link(
        &mut w,
        &linkedin,
        "docmeta-share__button docmeta-share__button--linkedin",
        LINKEDIN_ICON,
        "Share",
    )?;
    write_end(&mut w, "div")?;
    finish(w)
}

fn share_link(w: &mut HtmlWriter, href: &str, class: &str, icon: &str, label: &str) -> Result<()> {
    write_start(
        w,
        "a",
        &[
            ("class", class),
            ("href", href),
            ("target", "_blank"),
            ("rel", "noopener noreferrer"),
        ],
    )?;
    write_trusted(w, icon)?;
    write_text_element(w, "span", &[], label)?;
    write_end(w, "a")
}

/// Icon link placed next to the edit link; [`copy_script`] handles clicks.
pub fn copy_button() -> Result<String> {
    let mut w = create_html_writer();
    write_start(
        &mut w,
        "a",
        &[
            ("href", "#"),
            ("class", "md-content__button md-icon docmeta-copy"),
            ("title", "Copy page in Markdown format"),
            (MARKER, Region::Copy.as_str()),
        ],
    )?;
    write_trusted(&mut w, COPY_ICON)?;
    write_end(&mut w, "a")?;
    finish(w)
}

pub fn copy_script() -> Result<String> {
    let mut w = create_html_writer();
    write_raw_element(&mut w, "script", &[(MARKER, Region::Copy.as_str())], COPY_SCRIPT)?;
    finish(w)
}

/// Created/updated dates and contributors. `None` when there is nothing
/// to show.
pub fn footer(
    provenance: &Provenance,
    directory: &AuthorDirectory,
    config: &MetaConfig,
) -> Result<Option<String>> {
    let dates: Vec<(&str, DateTime<FixedOffset>)> = if config.add_dates {
        [("Created", provenance.created), ("Updated", provenance.modified)]
            .into_iter()
            .filter_map(|(label, at)| Some((label, at?)))
            .collect()
    } else {
        Vec::new()
    };
    let authors: &[Contributor] = if config.add_authors {
        &provenance.authors
    } else {
        &[]
    };
    if dates.is_empty() && authors.is_empty() {
        return Ok(None);
    }

    let mut w = create_html_writer();
    write_start(
        &mut w,
        "div",
        &[("class", "docmeta-footer"), (MARKER, Region::Footer.as_str())],
    )?;

    if !dates.is_empty() {
        write_start(&mut w, "div", &[("class", "docmeta-footer__dates")])?;
        for (label, at) in dates {
            let full = at.to_rfc3339();
            write_start(
                &mut w,
                "span",
                &[("class", "docmeta-footer__date"), ("title", full.as_str())],
            )?;
            write_text(&mut w, &format!("{label} "))?;
            write_text_element(
                &mut w,
                "time",
                &[("datetime", full.as_str())],
                &at.format("%B %d, %Y").to_string(),
            )?;
            write_end(&mut w, "span")?;
        }
        write_end(&mut w, "div")?;
    }

    if !authors.is_empty() {
        write_start(&mut w, "div", &[("class", "docmeta-footer__authors")])?;
        for contributor in authors {
            write_author(&mut w, contributor, directory)?;
        }
        write_end(&mut w, "div")?;
    }

    write_end(&mut w, "div")?;
    finish(w).map(Some)
}

fn write_author(w: &mut HtmlWriter, contributor: &Contributor, directory: &AuthorDirectory) -> Result<()> {
    let name = contributor.author.name.as_str();
    let title = match contributor.commits {
        0 => name.to_owned(),
        1 => format!("{name} (1 change)"),
        n => format!("{name} ({n} changes)"),
    };
    let profile = directory.profile(&contributor.author);

    let (tag, link_attrs): (&str, Vec<(&str, &str)>) = match profile.url.as_deref() {
        Some(url) => ("a", vec![("href", url)]),
        None => ("span", Vec::new()),
    };
    let mut attrs = vec![("class", "docmeta-footer__author"), ("title", title.as_str())];
    attrs.extend(link_attrs);

    write_start(w, tag, &attrs)?;
    match profile.avatar.as_deref() {
        Some(avatar) => write_empty_elem(
            w,
            "img",
            &[("src", avatar), ("alt", name), ("loading", "lazy")],
        )?,
        None => write_text(w, name)?,
    }
    write_end(w, tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::{Author, tests::commit};
    use std::path::PathBuf;

    #[test]
    fn test_share_buttons_encode_url() {
        let html = share_buttons("https://example.com/guide/?a=1&b=2").unwrap();
        assert!(html.starts_with(r#"<div class="docmeta-share" data-docmeta="share">"#));
        assert!(html.contains("url=https%3A%2F%2Fexample.com%2Fguide%2F%3Fa%3D1%26b%3D2"));
        assert!(html.contains("<svg"));
        assert!(!html.contains("font-awesome"));
    }

    #[test]
    fn test_footer_dates_and_authors() {
        let provenance = Provenance::from_commits(
            &[
                commit("2023-01-05T10:00:00Z", "Octo", "1+octocat@users.noreply.github.com"),
                commit("2023-02-01T10:00:00Z", "Bob <b>", "bob@example.com"),
                commit("2024-03-09T10:00:00+02:00", "Octo", "1+octocat@users.noreply.github.com"),
            ],
            PathBuf::from("/repo"),
        );
        let html = footer(&provenance, &AuthorDirectory::default(), &MetaConfig::default())
            .unwrap()
            .unwrap();

        assert!(html.contains(r#"data-docmeta="footer""#));
        assert!(html.contains(
            r#"Created <time datetime="2023-01-05T10:00:00+00:00">January 05, 2023</time>"#
        ));
        assert!(html.contains(
            r#"Updated <time datetime="2024-03-09T10:00:00+02:00">March 09, 2024</time>"#
        ));
        assert!(html.contains(r#"href="https://github.com/octocat""#));
        assert!(html.contains(r#"title="Octo (2 changes)""#));
        assert!(html.contains(r#"src="https://github.com/octocat.png""#));
        assert!(html.contains("Bob &lt;b&gt;"));
        assert!(!html.contains("ago"));
    }

    #[test]
    fn test_footer_for_default_author_only() {
        let default = Author::parse("Docs Team");
        let provenance = Provenance::fallback(default.as_ref(), "untracked");
        let html = footer(&provenance, &AuthorDirectory::default(), &MetaConfig::default())
            .unwrap()
            .unwrap();
        assert!(!html.contains("docmeta-footer__dates"));
        assert!(html.contains(r#"<span class="docmeta-footer__author" title="Docs Team">Docs Team</span>"#));
    }

    #[test]
    fn test_footer_nothing_to_show() {
        let provenance = Provenance::fallback(None, "no repository");
        assert!(
            footer(&provenance, &AuthorDirectory::default(), &MetaConfig::default())
                .unwrap()
                .is_none()
        );

        let mut config = MetaConfig::default();
        config.add_authors = false;
        config.add_dates = false;
        let provenance = Provenance::from_commits(
            &[commit("2023-01-05T10:00:00Z", "A", "a@example.com")],
            PathBuf::from("/repo"),
        );
        assert!(
            footer(&provenance, &AuthorDirectory::default(), &config)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_copy_fragments_are_marked() {
        let button = copy_button().unwrap();
        assert!(button.starts_with("<a "));
        assert!(button.contains(r#"title="Copy page in Markdown format" data-docmeta="copy">"#));
        assert!(!button.contains("onclick"));

        let script = copy_script().unwrap();
        assert!(script.starts_with(r#"<script data-docmeta="copy">"#));
        assert!(script.contains(r#"a[data-docmeta="copy"]"#));
        assert_eq!(script.matches("</script").count(), 1);
    }

    #[test]
    fn test_stylesheet_is_marked() {
        let css = stylesheet().unwrap();
        assert!(css.starts_with(r#"<style data-docmeta="css">"#));
        assert!(css.contains(".docmeta-share"));
    }
}
