use regex::Regex;

/// Pull the CSRF token out of dashboard page HTML.
///
/// Matches `<meta name="csrf-token" content="...">` with either quote
/// style and either attribute order. Pages without the tag (early
/// backend revisions) yield `None`.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    const PATTERNS: [&str; 2] = [
        r#"(?i)<meta[^>]*\bname=["']csrf-token["'][^>]*\bcontent=["']([^"']*)["']"#,
        r#"(?i)<meta[^>]*\bcontent=["']([^"']*)["'][^>]*\bname=["']csrf-token["']"#,
    ];

    for pattern in PATTERNS {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(token) = re
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim())
        {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_double_quoted() {
        let html = r#"<head><meta name="csrf-token" content="abc123"></head>"#;
        assert_eq!(extract_csrf_token(html), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_single_quoted_and_spacing() {
        let html = "<meta  name='csrf-token'   content='tok-9'/>";
        assert_eq!(extract_csrf_token(html), Some("tok-9".to_string()));
    }

    #[test]
    fn test_extract_reversed_attribute_order() {
        let html = r#"<meta content="zz-top" name="csrf-token">"#;
        assert_eq!(extract_csrf_token(html), Some("zz-top".to_string()));
    }

    #[test]
    fn test_absent_tag() {
        let html = "<html><head><title>dash</title></head></html>";
        assert_eq!(extract_csrf_token(html), None);
    }

    #[test]
    fn test_empty_content_is_none() {
        let html = r#"<meta name="csrf-token" content="">"#;
        assert_eq!(extract_csrf_token(html), None);
    }

    #[test]
    fn test_ignores_other_meta_tags() {
        let html = r#"<meta name="viewport" content="width=device-width">
                      <meta name="csrf-token" content="real-token">"#;
        assert_eq!(extract_csrf_token(html), Some("real-token".to_string()));
    }
}
