//! Repository model as returned by the hosting API, plus statistics and filtering.
//!
//! Repositories are immutable once fetched. Jobs hold an `Arc<Repository>`
//! so every component shares the same value.

mod filter;
mod sanitize;

use serde::{Deserialize, Serialize};

pub use filter::{calculate_stats, filter_repositories, FilterType, RepositoryStats};
pub use sanitize::safe_dir_name;

/// One clonable repository of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub clone_url: String,
    #[serde(default)]
    pub ssh_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(rename = "stargazers_count", default)]
    pub star_count: u32,
    #[serde(rename = "forks_count", default)]
    pub fork_count: u32,
    #[serde(rename = "fork", default)]
    pub is_fork: bool,
    #[serde(rename = "private", default)]
    pub is_private: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Size in KiB as reported by the API.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl Repository {
    /// Minimal repository with just a name and clone URL.
    pub fn new(name: impl Into<String>, clone_url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: 0,
            full_name: name.clone(),
            name,
            description: None,
            clone_url: clone_url.into(),
            ssh_url: None,
            language: None,
            star_count: 0,
            fork_count: 0,
            is_fork: false,
            is_private: false,
            updated_at: None,
            size: 0,
            default_branch: None,
        }
    }

    /// Directory name this repository is cloned into.
    pub fn dir_name(&self) -> String {
        safe_dir_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_api_payload() {
        let json = r#"{
            "id": 42,
            "name": "widget",
            "full_name": "acme/widget",
            "description": null,
            "clone_url": "https://github.com/acme/widget.git",
            "ssh_url": "git@github.com:acme/widget.git",
            "language": "Rust",
            "stargazers_count": 17,
            "forks_count": 3,
            "fork": true,
            "private": false,
            "updated_at": "2024-05-01T10:00:00Z",
            "size": 1024,
            "default_branch": "main",
            "owner": {"login": "acme"}
        }"#;
        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.id, 42);
        assert_eq!(repo.name, "widget");
        assert!(repo.description.is_none());
        assert_eq!(repo.language.as_deref(), Some("Rust"));
        assert_eq!(repo.star_count, 17);
        assert_eq!(repo.fork_count, 3);
        assert!(repo.is_fork);
        assert!(!repo.is_private);
        assert_eq!(repo.default_branch.as_deref(), Some("main"));
    }

    #[test]
    fn new_fills_defaults() {
        let repo = Repository::new("tool", "file:///tmp/tool.git");
        assert_eq!(repo.full_name, "tool");
        assert_eq!(repo.dir_name(), "tool");
        assert!(!repo.is_fork);
    }
}
