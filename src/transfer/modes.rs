//! Media kinds and content types

use serde::Deserialize;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv"];

/// Content type emitted for every video under `MimePolicy::Legacy`
pub const LEGACY_VIDEO_TYPE: &str = "video/mp4";

/// The two media families the browser knows how to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by (case-insensitive) extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// How the `Content-Type` of a media response is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimePolicy {
    /// Guess the type from the extension of every file
    PerExtension,
    /// Images by extension, everything else as `video/mp4`
    Legacy,
}

impl MimePolicy {
    pub fn content_type(self, path: &Path) -> String {
        let guessed = mime_guess::from_path(path).first_or_octet_stream();
        match self {
            MimePolicy::PerExtension => guessed.essence_str().to_string(),
            MimePolicy::Legacy => match MediaKind::from_path(path) {
                Some(MediaKind::Image) => guessed.essence_str().to_string(),
                _ => LEGACY_VIDEO_TYPE.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(MediaKind::from_path(Path::new("a/B.JPG")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("clip.mkv")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn per_extension_policy_guesses_each_type() {
        let policy = MimePolicy::PerExtension;
        assert_eq!(policy.content_type(Path::new("a.png")), "image/png");
        assert_eq!(policy.content_type(Path::new("a.webm")), "video/webm");
        assert_eq!(
            policy.content_type(Path::new("a.unknownext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn legacy_policy_fixes_video_type() {
        let policy = MimePolicy::Legacy;
        assert_eq!(policy.content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(policy.content_type(Path::new("a.mkv")), LEGACY_VIDEO_TYPE);
        assert_eq!(policy.content_type(Path::new("a.webm")), LEGACY_VIDEO_TYPE);
    }
}
