//! Author identities and their public profiles.
//!
//! Profiles are derived locally: GitHub noreply addresses carry the
//! username, and an optional YAML directory maps other emails to a
//! username or avatar. Nothing is looked up over the network.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::{fs, path::Path};

const NOREPLY_SUFFIX: &str = "@users.noreply.github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            name: name.into(),
            email: email.map(str::to_owned).filter(|e| !e.is_empty()),
        }
    }

    /// Parse `Name` or `Name <email>`. Blank input yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Some((name, rest)) = s.split_once('<')
            && let Some(email) = rest.strip_suffix('>')
        {
            let name = name.trim();
            let email = email.trim();
            let name = if name.is_empty() { email } else { name };
            return (!name.is_empty()).then(|| Self::new(name, Some(email)));
        }
        Some(Self::new(s, None))
    }

    /// Case-folded email, or case-folded name for authors without one.
    pub fn identity_key(&self) -> String {
        self.email
            .as_deref()
            .unwrap_or(&self.name)
            .to_lowercase()
    }

    /// Username encoded in a GitHub noreply address
    /// (`12345+user@users.noreply.github.com` or `user@users.noreply.github.com`).
    pub fn github_username(&self) -> Option<&str> {
        let email = self.email.as_deref()?;
        let local = email
            .len()
            .checked_sub(NOREPLY_SUFFIX.len())
            .filter(|&at| {
                email
                    .get(at..)
                    .is_some_and(|s| s.eq_ignore_ascii_case(NOREPLY_SUFFIX))
            })
            .map(|at| &email[..at])?;
        let user = local.rsplit('+').next().unwrap_or(local);
        (!user.is_empty()).then_some(user)
    }
}

/// Profile links for one author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub username: Option<String>,
    pub url: Option<String>,
    pub avatar: Option<String>,
}

/// One entry of the authors file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthorEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Email → profile overrides loaded from YAML:
///
/// ```yaml
/// alice@example.com:
///   username: alice
/// bob@example.com:
///   avatar: https://example.com/bob.png
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthorDirectory {
    entries: FxHashMap<String, AuthorEntry>,
}

impl AuthorDirectory {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Option<FxHashMap<String, AuthorEntry>> = serde_yaml::from_str(content)?;
        let entries = raw
            .unwrap_or_default()
            .into_iter()
            .map(|(email, entry)| (email.to_lowercase(), entry))
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read authors file `{}`", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid authors file `{}`", path.display()))
    }

    pub fn profile(&self, author: &Author) -> Profile {
        let entry = author
            .email
            .as_deref()
            .and_then(|e| self.entries.get(&e.to_lowercase()));

        let username = entry
            .and_then(|e| e.username.clone())
            .or_else(|| author.github_username().map(str::to_owned));
        let avatar = entry
            .and_then(|e| e.avatar.clone())
            .or_else(|| username.as_ref().map(|u| format!("https://github.com/{u}.png")));

        Profile {
            url: username.as_ref().map(|u| format!("https://github.com/{u}")),
            username,
            avatar,
        }
    }
}
