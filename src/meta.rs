//! Meta tag synthesis.

use crate::{config::MetaConfig, document::Document, extract::ExtractedSummary};
use std::collections::BTreeMap;

/// Emitted tags. Declaration order is emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaTag {
    Title,
    Description,
    Keywords,
    OgType,
    OgUrl,
    OgTitle,
    OgDescription,
    OgImage,
    TwitterCard,
    TwitterUrl,
    TwitterTitle,
    TwitterDescription,
    TwitterImage,
}

impl MetaTag {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Keywords => "keywords",
            Self::OgType => "og:type",
            Self::OgUrl => "og:url",
            Self::OgTitle => "og:title",
            Self::OgDescription => "og:description",
            Self::OgImage => "og:image",
            Self::TwitterCard => "twitter:card",
            Self::TwitterUrl => "twitter:url",
            Self::TwitterTitle => "twitter:title",
            Self::TwitterDescription => "twitter:description",
            Self::TwitterImage => "twitter:image",
        }
    }

    /// Open Graph uses `property`, everything else `name`.
    pub const fn attr(self) -> &'static str {
        match self {
            Self::OgType | Self::OgUrl | Self::OgTitle | Self::OgDescription | Self::OgImage => {
                "property"
            }
            _ => "name",
        }
    }
}

/// Tag → content, iterated in [`MetaTag`] order regardless of insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaTagSet(BTreeMap<MetaTag, String>);

impl MetaTagSet {
    pub fn insert(&mut self, tag: MetaTag, content: impl Into<String>) {
        self.0.insert(tag, content.into());
    }

    pub fn get(&self, tag: MetaTag) -> Option<&str> {
        self.0.get(&tag).map(String::as_str)
    }

    pub fn contains(&self, tag: MetaTag) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetaTag, &str)> {
        self.0.iter().map(|(&tag, content)| (tag, content.as_str()))
    }

    /// Whether an existing `name`/`property` value collides with a tag here.
    pub fn has_key(&self, key: &str) -> bool {
        self.0.keys().any(|tag| tag.key().eq_ignore_ascii_case(key))
    }
}

/// The page image: extracted, else the configured default.
pub fn page_image(summary: &ExtractedSummary, doc: &Document, config: &MetaConfig) -> Option<String> {
    if !config.add_image {
        return None;
    }
    summary
        .image
        .clone()
        .or_else(|| config.default_image.as_deref().map(|src| doc.resolve_url(src)))
}

pub fn synthesize(summary: &ExtractedSummary, doc: &Document, config: &MetaConfig) -> MetaTagSet {
    let mut tags = MetaTagSet::default();
    let description = summary
        .description
        .as_deref()
        .filter(|d| config.add_desc && !d.is_empty());
    let image = page_image(summary, doc, config);

    if let Some(title) = &doc.title {
        tags.insert(MetaTag::Title, title);
        tags.insert(MetaTag::OgTitle, title);
        tags.insert(MetaTag::TwitterTitle, title);
    }
    if let Some(description) = description {
        tags.insert(MetaTag::Description, description);
        tags.insert(MetaTag::OgDescription, description);
        tags.insert(MetaTag::TwitterDescription, description);
    }
    if config.add_keywords
        && let Some(keywords) = summary.keywords.as_ref().filter(|k| !k.is_empty())
    {
        tags.insert(MetaTag::Keywords, keywords.join(", "));
    }

    tags.insert(MetaTag::OgType, "website");
    tags.insert(MetaTag::OgUrl, &doc.url);
    tags.insert(MetaTag::TwitterUrl, &doc.url);

    match image {
        Some(image) => {
            tags.insert(MetaTag::OgImage, &image);
            tags.insert(MetaTag::TwitterImage, image);
            tags.insert(MetaTag::TwitterCard, "summary_large_image");
        }
        None => tags.insert(MetaTag::TwitterCard, "summary"),
    }

    tags
}
