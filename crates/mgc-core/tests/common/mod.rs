#![allow(dead_code)]

pub mod api_server;
pub mod fake_tool;

use std::path::Path;
use std::sync::Arc;

use mgc_core::repository::Repository;

/// Repository with a deterministic clone URL.
pub fn repo(name: &str) -> Arc<Repository> {
    Arc::new(Repository::new(
        name,
        format!("https://git.example.test/octo/{name}.git"),
    ))
}

pub fn repos(names: &[&str]) -> Vec<Arc<Repository>> {
    names.iter().map(|n| repo(n)).collect()
}

/// Sorted entry names of a directory.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
