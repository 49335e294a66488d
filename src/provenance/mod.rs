//! Authorship and timestamps from version history.
//!
//! A [`Resolver`] turns a source path into a [`Provenance`] using a
//! [`HistorySource`], memoized in a [`ProvenanceCache`] that lives for one
//! run. Failures never propagate: they produce a fallback provenance that
//! carries the configured default author and the reason.

mod authors;
mod cache;
mod history;

pub use authors::{Author, AuthorDirectory, Profile};
pub use cache::ProvenanceCache;
pub use history::{GitLog, HistoryIndex};

use chrono::{DateTime, FixedOffset};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvenanceError {
    #[error("`{0}` is not inside a git repository")]
    NoRepository(PathBuf),

    #[error("git executable not found")]
    GitUnavailable,

    #[error("history query failed: {0}")]
    Query(String),
}

/// One commit touching a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub author: Author,
}

/// Commits touching one path, oldest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub repo_root: PathBuf,
    pub commits: Vec<CommitRecord>,
    /// Authors of the current lines, when the source runs blame.
    pub blame_authors: Vec<Author>,
}

/// Version-history lookups, one path at a time.
pub trait HistorySource: Send + Sync {
    fn history(&self, path: &Path) -> Result<History, ProvenanceError>;
}

/// An author with the number of commits they made to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub author: Author,
    pub commits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub created: Option<DateTime<FixedOffset>>,
    pub modified: Option<DateTime<FixedOffset>>,
    /// Distinct by case-folded email, in order of first commit, then
    /// blame-only authors.
    pub authors: Vec<Contributor>,
    pub repo_root: Option<PathBuf>,
    /// Why history was not used, when it was not.
    pub fallback_reason: Option<String>,
}

impl Provenance {
    /// Build from commits sorted oldest first.
    pub fn from_commits(commits: &[CommitRecord], repo_root: PathBuf) -> Self {
        let mut authors: Vec<Contributor> = Vec::new();
        for commit in commits {
            let key = commit.author.identity_key();
            match authors.iter_mut().find(|c| c.author.identity_key() == key) {
                Some(existing) => existing.commits += 1,
                None => authors.push(Contributor {
                    author: commit.author.clone(),
                    commits: 1,
                }),
            }
        }

        Self {
            created: commits.first().map(|c| c.timestamp),
            modified: commits.last().map(|c| c.timestamp),
            authors,
            repo_root: Some(repo_root),
            fallback_reason: None,
        }
    }

    /// Add authors who only show up in blame, counted as one change each.
    pub fn with_blame_authors(mut self, blamed: &[Author]) -> Self {
        for author in blamed {
            let key = author.identity_key();
            if !self.authors.iter().any(|c| c.author.identity_key() == key) {
                self.authors.push(Contributor {
                    author: author.clone(),
                    commits: 1,
                });
            }
        }
        self
    }

    /// No history: default author only, no dates.
    pub fn fallback(default_author: Option<&Author>, reason: impl Into<String>) -> Self {
        Self {
            authors: default_author
                .map(|a| Contributor {
                    author: a.clone(),
                    commits: 0,
                })
                .into_iter()
                .collect(),
            fallback_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn has_history(&self) -> bool {
        self.fallback_reason.is_none()
    }
}

/// Resolves source paths through a history backend, with caching.
pub struct Resolver<'a> {
    source: &'a dyn HistorySource,
    default_author: Option<Author>,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn HistorySource, default_author: Option<Author>) -> Self {
        Self {
            source,
            default_author,
        }
    }

    /// Provenance for `path`; the history query runs at most once per path
    /// for the lifetime of `cache`.
    pub fn resolve(&self, path: &Path, cache: &ProvenanceCache) -> Arc<Provenance> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        cache.get_or_resolve(&key, || self.query(&key))
    }

    fn query(&self, path: &Path) -> Provenance {
        let default = self.default_author.as_ref();
        match self.source.history(path) {
            Ok(history) if history.commits.is_empty() => {
                Provenance::fallback(default, format!("`{}` is untracked", path.display()))
            }
            Ok(history) => Provenance::from_commits(&history.commits, history.repo_root)
                .with_blame_authors(&history.blame_authors),
            Err(err) => Provenance::fallback(default, err.to_string()),
        }
    }
}
