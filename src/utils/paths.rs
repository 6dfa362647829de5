//! Path Safety
//!
//! Resolution and containment checks for paths targeted by agent actions.
//! Every file-touching action must resolve inside the project root and
//! avoid the sensitive-file blocklist.

use std::path::{Component, Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Default blocklist of sensitive path fragments, substring-matched
/// against the absolute path.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    ".env",
    "id_rsa",
    "id_dsa",
    "secrets",
    "config.yml",
    "config.yaml",
];

/// Resolve `path` against `root` if relative, returning an absolute path.
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Lexically normalize a path, removing `.` segments and folding `..`
/// into the preceding component. Does not touch the filesystem, so it
/// also covers paths that do not exist yet.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Check that `path` (relative to `root` if not absolute) stays inside
/// the cleaned project root and avoids the blocklist.
///
/// Returns the resolved absolute path on success.
pub fn check_path(root: &Path, path: &str, blocklist: &[String]) -> AppResult<PathBuf> {
    let abs = clean(&resolve(root, path));
    let root_clean = clean(root);

    if !abs.starts_with(&root_clean) {
        return Err(AppError::safety(format!(
            "path {} escapes project root",
            path
        )));
    }

    let abs_str = abs.to_string_lossy();
    for blocked in blocklist {
        if abs_str.contains(blocked.as_str()) {
            return Err(AppError::safety(format!("path {} is blocked", path)));
        }
    }

    Ok(abs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocklist() -> Vec<String> {
        DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_relative_against_root() {
        let root = Path::new("/project");
        assert_eq!(
            resolve(root, "src/main.rs"),
            PathBuf::from("/project/src/main.rs")
        );
        assert_eq!(resolve(root, "/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn clean_folds_parent_components() {
        assert_eq!(
            clean(Path::new("/project/src/../README.md")),
            PathBuf::from("/project/README.md")
        );
        assert_eq!(clean(Path::new("/a/./b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn rejects_escape_via_dotdot() {
        let root = Path::new("/project");
        let err = check_path(root, "../outside.txt", &blocklist()).unwrap_err();
        assert!(matches!(err, AppError::Safety(_)));
        assert!(err.to_string().contains("escapes project root"));
    }

    #[test]
    fn rejects_absolute_path_outside_root() {
        let root = Path::new("/project");
        let err = check_path(root, "/etc/passwd", &blocklist()).unwrap_err();
        assert!(matches!(err, AppError::Safety(_)));
    }

    #[test]
    fn rejects_blocklisted_fragments() {
        let root = Path::new("/project");
        for bad in [".env", "deploy/secrets/token", "keys/id_rsa", "config.yaml"] {
            let err = check_path(root, bad, &blocklist()).unwrap_err();
            assert!(
                matches!(err, AppError::Safety(_)),
                "{} should be blocked",
                bad
            );
        }
    }

    #[test]
    fn accepts_ordinary_paths() {
        let root = Path::new("/project");
        let abs = check_path(root, "src/lib.rs", &blocklist()).unwrap();
        assert_eq!(abs, PathBuf::from("/project/src/lib.rs"));
    }
}
