//! Input validation shared by the CLI and storage layers.
//!
//! - **Feed URLs**: only absolute `http`/`https` URLs with a host are accepted
//! - **Names**: user and feed names are stripped of control characters
//!
//! ```
//! use gator::util::{clean_name, validate_feed_url};
//!
//! let url = validate_feed_url("https://blog.boot.dev/index.xml").unwrap();
//! assert_eq!(url.host_str(), Some("blog.boot.dev"));
//!
//! assert_eq!(clean_name("  kahya\u{7} ").as_deref(), Some("kahya"));
//! assert_eq!(clean_name(" \t "), None);
//! ```

mod feed_url;

pub use feed_url::{validate_feed_url, UrlValidationError};

/// Strip control characters and surrounding whitespace from a display name.
///
/// Returns `None` when nothing printable is left.
pub fn clean_name(name: &str) -> Option<String> {
    let cleaned: String = name.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_passthrough() {
        assert_eq!(clean_name("Boot.dev Blog").as_deref(), Some("Boot.dev Blog"));
    }

    #[test]
    fn test_clean_name_strips_controls() {
        assert_eq!(clean_name("a\u{7}b\u{0}c\n").as_deref(), Some("abc"));
    }

    #[test]
    fn test_clean_name_rejects_blank() {
        assert_eq!(clean_name(""), None);
        assert_eq!(clean_name("\u{1b}\u{7f}  "), None);
    }

    #[test]
    fn test_clean_name_keeps_unicode() {
        assert_eq!(clean_name(" Café 世界 ").as_deref(), Some("Café 世界"));
    }
}
