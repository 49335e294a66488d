//! JSON-LD structured data: one `Article`, plus a `FAQPage` when the page
//! has FAQ pairs, in a single `@graph`.

use crate::{
    config::MetaConfig,
    document::Document,
    extract::ExtractedSummary,
    meta::page_image,
    provenance::{AuthorDirectory, Provenance},
};
use serde::Serialize;

const CONTEXT: &str = "https://schema.org";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StructuredData {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@graph")]
    graph: Vec<Entity>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "@type")]
pub enum Entity {
    Article(Article),
    #[serde(rename = "FAQPage")]
    FaqPage(FaqPage),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "@id")]
    id: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    image: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    keywords: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    author: Vec<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_modified: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Person {
    #[serde(rename = "@type")]
    kind: &'static str,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaqPage {
    #[serde(rename = "@id")]
    id: String,
    main_entity: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "@type")]
    kind: &'static str,
    name: String,
    accepted_answer: Answer,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Answer {
    #[serde(rename = "@type")]
    kind: &'static str,
    text: String,
}

impl StructuredData {
    /// JSON safe to embed in a `<script>` element: `<`, `>` and `&` are
    /// written as unicode escapes, which only ever occur inside strings.
    pub fn to_script_json(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let mut out = String::with_capacity(json.len());
        for c in json.chars() {
            match c {
                '<' => out.push_str("\\u003c"),
                '>' => out.push_str("\\u003e"),
                '&' => out.push_str("\\u0026"),
                c => out.push(c),
            }
        }
        Ok(out)
    }
}

pub fn build(
    summary: &ExtractedSummary,
    provenance: &Provenance,
    authors: &AuthorDirectory,
    doc: &Document,
    config: &MetaConfig,
) -> Option<StructuredData> {
    if !config.add_json_ld {
        return None;
    }

    let article = Article {
        id: format!("{}#article", doc.url),
        url: doc.url.clone(),
        headline: doc.title.clone(),
        description: summary.description.clone(),
        image: page_image(summary, doc, config).into_iter().collect(),
        keywords: summary.keywords.clone().unwrap_or_default(),
        author: provenance
            .authors
            .iter()
            .map(|c| Person {
                kind: "Person",
                name: c.author.name.clone(),
                url: authors.profile(&c.author).url,
            })
            .collect(),
        date_published: provenance.created.map(|t| t.to_rfc3339()),
        date_modified: provenance.modified.map(|t| t.to_rfc3339()),
    };

    let mut graph = vec![Entity::Article(article)];
    if !summary.faq.is_empty() {
        graph.push(Entity::FaqPage(FaqPage {
            id: format!("{}#faq", doc.url),
            main_entity: summary
                .faq
                .iter()
                .map(|pair| Question {
                    kind: "Question",
                    name: pair.question.clone(),
                    accepted_answer: Answer {
                        kind: "Answer",
                        text: pair.answer.clone(),
                    },
                })
                .collect(),
        }));
    }

    Some(StructuredData {
        context: CONTEXT,
        graph,
    })
}
