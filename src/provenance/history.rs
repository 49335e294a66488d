//! Git-backed history sources.
//!
//! Both sources read `git log` with the same record format, so a page gets
//! the same commits whether it was looked up alone or through the index.
//! With blame on, both also list the authors of the page's current lines.

use super::{Author, CommitRecord, History, HistorySource, ProvenanceError};
use crate::{exec, log};
use chrono::DateTime;
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
};

const RECORD_SEP: char = '\x1e';
const FIELD_SEP: char = '\x1f';
/// `<RS>author-date<US>author-name<US>author-email`
const LOG_FORMAT: &str = "--format=%x1e%aI%x1f%an%x1f%ae";
/// What `git blame` reports for lines not committed yet.
const UNCOMMITTED_EMAIL: &str = "not.committed.yet";

/// Worktree root of the repository containing `dir`.
pub fn repository_root(dir: &Path) -> Result<PathBuf, ProvenanceError> {
    let no_repo = || ProvenanceError::NoRepository(dir.to_path_buf());
    let repo = gix::discover(dir).map_err(|_| no_repo())?;
    let root = repo.workdir().ok_or_else(no_repo)?;
    Ok(fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()))
}

fn ensure_git() -> Result<(), ProvenanceError> {
    which::which("git")
        .map(|_| ())
        .map_err(|_| ProvenanceError::GitUnavailable)
}

/// Run `git log` from `root`, limited to `pathspec` (empty for everything).
fn git_log(root: &Path, pathspec: &Path, name_only: bool) -> Result<String, ProvenanceError> {
    let name_only = if name_only { "--name-only" } else { "" };
    let output = exec!(root; ["git"];
        "-c", "core.quotepath=off", "log", name_only, LOG_FORMAT, "--", pathspec
    )
    .map_err(|e| ProvenanceError::Query(e.to_string()))?;
    String::from_utf8(output.stdout).map_err(|e| ProvenanceError::Query(e.to_string()))
}

fn git_blame(root: &Path, rel: &Path) -> Result<Vec<Author>, ProvenanceError> {
    let output = exec!(root; ["git"]; "blame", "--line-porcelain", "--", rel)
        .map_err(|e| ProvenanceError::Query(e.to_string()))?;
    let stdout =
        String::from_utf8(output.stdout).map_err(|e| ProvenanceError::Query(e.to_string()))?;
    Ok(parse_blame(&stdout))
}

/// Distinct line authors in `--line-porcelain` output, in line order.
fn parse_blame(stdout: &str) -> Vec<Author> {
    let mut authors: Vec<Author> = Vec::new();
    let mut name = None;
    for line in stdout.lines() {
        if let Some(n) = line.strip_prefix("author ") {
            name = Some(n.trim());
        } else if let Some(mail) = line.strip_prefix("author-mail ") {
            let Some(name) = name.take() else { continue };
            let email = mail.trim().trim_start_matches('<').trim_end_matches('>');
            if email == UNCOMMITTED_EMAIL {
                continue;
            }
            let author = Author::new(name, Some(email));
            let key = author.identity_key();
            if !authors.iter().any(|a| a.identity_key() == key) {
                authors.push(author);
            }
        }
    }
    authors
}

/// Blame authors of a tracked page; a failed blame only costs the extras.
fn blame_authors(enabled: bool, root: &Path, rel: &Path, commits: &[CommitRecord]) -> Vec<Author> {
    if !enabled || commits.is_empty() {
        return Vec::new();
    }
    git_blame(root, rel).unwrap_or_else(|err| {
        log!("git"; "blame failed for {}: {err}", rel.display());
        Vec::new()
    })
}

/// One parsed log record: the commit and, with `--name-only`, its paths.
struct LogEntry<'a> {
    commit: CommitRecord,
    paths: Vec<&'a str>,
}

/// Parse log output (newest first, as git prints it). Malformed records
/// are skipped.
fn parse_log(stdout: &str) -> Vec<LogEntry<'_>> {
    stdout
        .split(RECORD_SEP)
        .filter_map(|record| {
            let mut lines = record.lines();
            let mut fields = lines.next()?.splitn(3, FIELD_SEP);
            let date = fields.next()?.trim();
            let name = fields.next()?.trim();
            let email = fields.next()?.trim();
            let timestamp = DateTime::parse_from_rfc3339(date).ok()?;
            Some(LogEntry {
                commit: CommitRecord {
                    timestamp,
                    author: Author::new(name, Some(email)),
                },
                paths: lines.map(str::trim).filter(|l| !l.is_empty()).collect(),
            })
        })
        .collect()
}

/// One `git log` per queried path.
pub struct GitLog {
    blame: bool,
}

impl GitLog {
    pub fn new() -> Self {
        Self { blame: false }
    }

    /// Also run `git blame` on each queried path.
    pub fn with_blame(mut self, blame: bool) -> Self {
        self.blame = blame;
        self
    }
}

impl Default for GitLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistorySource for GitLog {
    fn history(&self, path: &Path) -> Result<History, ProvenanceError> {
        ensure_git()?;
        let dir = path.parent().unwrap_or(path);
        let repo_root = repository_root(dir)?;
        let rel = path
            .strip_prefix(&repo_root)
            .map_err(|_| ProvenanceError::NoRepository(path.to_path_buf()))?;

        let stdout = git_log(&repo_root, rel, false)?;
        let mut commits: Vec<_> = parse_log(&stdout).into_iter().map(|e| e.commit).collect();
        commits.reverse();
        let blame_authors = blame_authors(self.blame, &repo_root, rel, &commits);
        Ok(History {
            repo_root,
            commits,
            blame_authors,
        })
    }
}

/// All history under a directory, read with a single `git log --name-only`.
pub struct HistoryIndex {
    repo_root: PathBuf,
    /// Repository-relative path → commits, oldest first.
    by_path: FxHashMap<PathBuf, Vec<CommitRecord>>,
    /// Blame is per path, so it stays a query even with the index.
    blame: bool,
}

impl HistoryIndex {
    pub fn build(dir: &Path) -> Result<Self, ProvenanceError> {
        ensure_git()?;
        let dir = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let repo_root = repository_root(&dir)?;
        let scope = dir.strip_prefix(&repo_root).unwrap_or(Path::new(""));

        let stdout = git_log(&repo_root, scope, true)?;
        let mut by_path: FxHashMap<PathBuf, Vec<CommitRecord>> = FxHashMap::default();
        for entry in parse_log(&stdout) {
            for path in entry.paths {
                by_path
                    .entry(PathBuf::from(path))
                    .or_default()
                    .push(entry.commit.clone());
            }
        }
        for commits in by_path.values_mut() {
            commits.reverse();
        }

        log!("git"; "indexed history of {} paths", by_path.len());
        Ok(Self {
            repo_root,
            by_path,
            blame: false,
        })
    }

    pub fn with_blame(mut self, blame: bool) -> Self {
        self.blame = blame;
        self
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

impl HistorySource for HistoryIndex {
    fn history(&self, path: &Path) -> Result<History, ProvenanceError> {
        let rel = path
            .strip_prefix(&self.repo_root)
            .map_err(|_| ProvenanceError::NoRepository(path.to_path_buf()))?;
        let commits = self.by_path.get(rel).cloned().unwrap_or_default();
        Ok(History {
            blame_authors: blame_authors(self.blame, &self.repo_root, rel, &commits),
            repo_root: self.repo_root.clone(),
            commits,
        })
    }
}
