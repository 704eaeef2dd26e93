//! Extension classification for discovered files.

use std::path::Path;

use crate::model::ClassificationKey;

/// Derive the classification key for `path` from its final extension.
///
/// Classification is syntactic: the path need not exist. Only the segment after
/// the last `.` of the file name counts, lowercased. Dotfiles such as
/// `.gitignore`, names without a dot, and names ending in a dot all map to
/// [`NO_EXTENSION`](crate::NO_EXTENSION).
#[must_use]
pub fn classify(path: &Path) -> ClassificationKey {
    match path.extension().map(|ext| ext.to_string_lossy()) {
        Some(ext) if !ext.is_empty() => ClassificationKey::new(ext.to_lowercase()),
        _ => ClassificationKey::no_extension(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NO_EXTENSION;

    fn key(path: &str) -> String {
        classify(Path::new(path)).as_str().to_string()
    }

    #[test]
    fn lowercases_extension() {
        assert_eq!(key("a.TXT"), "txt");
        assert_eq!(key("b.txt"), "txt");
        assert_eq!(key("photos/IMG_0001.JpEg"), "jpeg");
    }

    #[test]
    fn uses_last_segment_only() {
        assert_eq!(key("archive.tar.gz"), "gz");
        assert_eq!(key("nested/dir.with.dots/report.final.PDF"), "pdf");
    }

    #[test]
    fn extensionless_names_use_sentinel() {
        assert_eq!(key("c"), NO_EXTENSION);
        assert_eq!(key("dir/Makefile"), NO_EXTENSION);
        assert_eq!(key("notes."), NO_EXTENSION);
    }

    #[test]
    fn dotfiles_without_extension_use_sentinel() {
        assert_eq!(key(".hidden"), NO_EXTENSION);
        assert_eq!(key("repo/.gitignore"), NO_EXTENSION);
        assert_eq!(key(".env"), NO_EXTENSION);
    }

    #[test]
    fn dotfiles_with_extension_use_it() {
        assert_eq!(key(".config.toml"), "toml");
    }

    #[test]
    fn parent_dots_do_not_leak_into_key() {
        assert_eq!(key("v1.2/readme"), NO_EXTENSION);
    }
}
