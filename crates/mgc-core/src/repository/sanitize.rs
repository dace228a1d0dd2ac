//! Safe directory names for cloned repositories.

/// Derives the on-disk directory name for a repository name.
///
/// Hosting APIs already restrict names, but the name still ends up as a path
/// component, so it must never escape the account directory:
/// - Replaces NUL, `/`, `\` and control characters with `_`
/// - Maps `.` / `..` and empty names to `_`
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn safe_dir_name(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if out.is_empty() || out == "." || out == ".." {
        return "_".to_string();
    }

    if out.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !out.is_char_boundary(take) {
            take -= 1;
        }
        out.truncate(take);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_ordinary_names() {
        assert_eq!(safe_dir_name("mass-git-cloner"), "mass-git-cloner");
        assert_eq!(safe_dir_name("dotfiles.nvim"), "dotfiles.nvim");
        assert_eq!(safe_dir_name(".github"), ".github");
    }

    #[test]
    fn removes_separators() {
        assert_eq!(safe_dir_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(safe_dir_name("a\\b"), "a_b");
    }

    #[test]
    fn dot_names_are_replaced() {
        assert_eq!(safe_dir_name("."), "_");
        assert_eq!(safe_dir_name(".."), "_");
        assert_eq!(safe_dir_name("   "), "_");
    }

    #[test]
    fn long_names_are_truncated() {
        let long = "x".repeat(300);
        assert_eq!(safe_dir_name(&long).len(), 255);
    }
}
