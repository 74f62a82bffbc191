// src/watch/path_utils.rs

//! Path helpers shared by the watcher and source resolution.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First try a direct `strip_prefix(root)`.
/// - If that fails (symlinks, `/private/var` vs `/var` on macOS), canonicalize
///   both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// True if the root-relative `rel` lies inside the root-relative directory `dir`.
pub fn is_under(rel: &str, dir: &Path) -> bool {
    Path::new(rel).starts_with(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix_with_forward_slashes() {
        let rel = relative_str(Path::new("/site"), Path::new("/site/src/html/index.html"));
        assert_eq!(rel.as_deref(), Some("src/html/index.html"));
        assert_eq!(relative_str(Path::new("/site"), Path::new("/elsewhere/a")), None);
    }

    #[test]
    fn output_root_membership_is_component_wise() {
        assert!(is_under("dist/assets/app.js", Path::new("dist")));
        assert!(!is_under("distro/app.js", Path::new("dist")));
    }
}
