use crate::catalog::FileType;
use std::collections::{HashMap, HashSet};

/// Files at or above this size never get a content snippet.
pub const SNIPPET_MAX_FILE_SIZE: u64 = 50 * 1024;
/// Snippets are truncated to this many characters.
pub const SNIPPET_MAX_CHARS: usize = 300;

lazy_static::lazy_static! {
    static ref TYPE_MAP: HashMap<&'static str, FileType> = {
        let mut map = HashMap::new();
        let entries: [(&[&str], FileType); 6] = [
            (
                &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico", "tiff", "avif"],
                FileType::Image,
            ),
            (
                &["mp4", "avi", "mkv", "mov", "webm", "flv", "wmv", "m4v"],
                FileType::Video,
            ),
            (
                &["mp3", "flac", "wav", "ogg", "aac", "m4a", "opus"],
                FileType::Audio,
            ),
            (
                &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "txt", "rtf",
                  "md", "csv", "epub"],
                FileType::Doc,
            ),
            (
                &["zip", "tar", "gz", "rar", "7z", "bz2", "xz"],
                FileType::Archive,
            ),
            (
                &["js", "ts", "jsx", "tsx", "py", "java", "c", "cpp", "cs", "go", "rs",
                  "php", "html", "css", "json", "yaml", "sh", "sql"],
                FileType::Code,
            ),
        ];
        for (exts, file_type) in entries {
            for ext in exts {
                map.insert(*ext, file_type);
            }
        }
        map
    };

    static ref TEXT_EXTS: HashSet<&'static str> = [
        "txt", "md", "json", "yaml", "yml", "csv", "log", "sh", "ini", "conf",
    ]
    .into_iter()
    .collect();
}

/// Fixed extension → category lookup. Unrecognized extensions are `Other`.
pub fn classify(ext: &str) -> FileType {
    TYPE_MAP.get(ext).copied().unwrap_or(FileType::Other)
}

/// Whether a small file with this extension gets a content snippet.
pub fn is_text_ext(ext: &str) -> bool {
    TEXT_EXTS.contains(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(classify("jpg"), FileType::Image);
        assert_eq!(classify("mkv"), FileType::Video);
        assert_eq!(classify("flac"), FileType::Audio);
        assert_eq!(classify("pdf"), FileType::Doc);
        assert_eq!(classify("7z"), FileType::Archive);
        assert_eq!(classify("rs"), FileType::Code);
    }

    #[test]
    fn test_classify_unknown_extension() {
        assert_eq!(classify("xyz123"), FileType::Other);
        assert_eq!(classify(""), FileType::Other);
    }

    #[test]
    fn test_text_extensions() {
        assert!(is_text_ext("txt"));
        assert!(is_text_ext("conf"));
        assert!(!is_text_ext("png"));
        assert!(!is_text_ext("exe"));
    }
}
