use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title>(.*?)</title>").expect("failed to compile title regex"));

/// First `<title>` element wins, trimmed. No entity decoding and no
/// malformed-tag repair; a stricter parser could change which title a
/// broken page yields.
pub fn extract_title(html: &str) -> Option<String> {
    let inner = TITLE_RE.captures(html)?.get(1)?.as_str().trim().to_string();

    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_title() {
        let html = "<html><head><title>Example Domain</title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Example Domain"));
    }

    #[test]
    fn test_case_insensitive_tag() {
        let html = "<TITLE>Shouty</TITLE>";
        assert_eq!(extract_title(html).as_deref(), Some("Shouty"));
    }

    #[test]
    fn test_first_match_wins() {
        let html = "<title>first</title><title>second</title>";
        assert_eq!(extract_title(html).as_deref(), Some("first"));
    }

    #[test]
    fn test_inner_text_trimmed() {
        let html = "<title>  padded  </title>";
        assert_eq!(extract_title(html).as_deref(), Some("padded"));
    }

    #[test]
    fn test_no_title_element() {
        assert_eq!(extract_title("<html><body>nothing</body></html>"), None);
    }

    #[test]
    fn test_empty_title_is_absent() {
        assert_eq!(extract_title("<title>   </title>"), None);
    }

    #[test]
    fn test_unclosed_title_not_matched() {
        assert_eq!(extract_title("<title>never ends"), None);
    }

    #[test]
    fn test_attributed_title_not_matched() {
        // the original matched the bare tag only; kept as-is
        assert_eq!(extract_title(r#"<title lang="en">x</title>"#), None);
    }
}
