//! Path filtering: media candidate test and directory exclusion

use std::path::{Path, PathBuf};

use crate::models::{MediaKind, TypeFilter};

/// Decides which files are media candidates and which directory subtrees
/// must be pruned from a traversal.
///
/// Exclusion prefixes are normalized once at construction; the directory
/// test is then a cheap string comparison run once per directory.
#[derive(Debug, Clone)]
pub struct PathFilter {
    type_filter: TypeFilter,
    excluded: Vec<String>,
}

impl PathFilter {
    pub fn new(type_filter: TypeFilter, excluded_prefixes: &[PathBuf]) -> Self {
        let excluded = excluded_prefixes
            .iter()
            .map(|p| normalize_path(p))
            .collect();
        Self {
            type_filter,
            excluded,
        }
    }

    /// Check whether a file path qualifies under the configured type filter.
    /// Classification is purely by lower-cased extension.
    pub fn is_candidate(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match MediaKind::from_extension(&ext) {
            MediaKind::Image => matches!(self.type_filter, TypeFilter::Images | TypeFilter::All),
            MediaKind::Video => matches!(self.type_filter, TypeFilter::Videos | TypeFilter::All),
            MediaKind::Other => false,
        }
    }

    /// Check whether a directory equals or is nested under any excluded
    /// prefix. Callers must prune the whole subtree when this returns true,
    /// not merely drop its results.
    pub fn should_skip_directory(&self, dir: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let current = normalize_path(dir);
        self.excluded.iter().any(|prefix| {
            current == *prefix || current.starts_with(&format!("{prefix}/"))
        })
    }
}

/// Normalize a path to an absolute, lower-cased, forward-slash string.
/// Falls back to the path as given when it cannot be resolved on disk.
pub fn normalize_path(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut s = resolved.to_string_lossy().replace('\\', "/").to_lowercase();
    while s.len() > 1 && s.ends_with('/') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_candidate_by_filter() {
        let images = PathFilter::new(TypeFilter::Images, &[]);
        let videos = PathFilter::new(TypeFilter::Videos, &[]);
        let all = PathFilter::new(TypeFilter::All, &[]);

        let photo = Path::new("/x/IMG_0001.JPG");
        let clip = Path::new("/x/clip.mp4");
        let doc = Path::new("/x/readme.txt");
        let bare = Path::new("/x/noext");

        assert!(images.is_candidate(photo));
        assert!(!images.is_candidate(clip));
        assert!(videos.is_candidate(clip));
        assert!(!videos.is_candidate(photo));
        assert!(all.is_candidate(photo));
        assert!(all.is_candidate(clip));
        assert!(!all.is_candidate(doc));
        assert!(!all.is_candidate(bare));
    }

    #[test]
    fn test_skip_directory_prefix_match() {
        let filter = PathFilter::new(TypeFilter::All, &[PathBuf::from("/media/Trash")]);

        assert!(filter.should_skip_directory(Path::new("/media/trash")));
        assert!(filter.should_skip_directory(Path::new("/media/Trash/2020")));
        assert!(filter.should_skip_directory(Path::new("/media/TRASH/deep/nested")));
        assert!(!filter.should_skip_directory(Path::new("/media/photos")));
    }

    #[test]
    fn test_skip_directory_no_sibling_false_positive() {
        // "/media/trash" must not shadow "/media/trashcan"
        let filter = PathFilter::new(TypeFilter::All, &[PathBuf::from("/media/trash")]);
        assert!(!filter.should_skip_directory(Path::new("/media/trashcan")));
    }

    #[test]
    fn test_skip_directory_empty_exclusions() {
        let filter = PathFilter::new(TypeFilter::All, &[]);
        assert!(!filter.should_skip_directory(Path::new("/anywhere")));
    }

    #[test]
    fn test_normalize_path_form() {
        assert_eq!(normalize_path(Path::new("/A/B/")), "/a/b");
        assert_eq!(normalize_path(Path::new("/")), "/");
    }
}
