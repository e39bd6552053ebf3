use regex::Regex;
use std::sync::OnceLock;
use ::url::Url;

/// Resolves a possibly relative `href` against the page it was read from.
#[must_use]
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

/// Extracts the image path from an inline `background-image: url("...")` style.
#[must_use]
pub fn style_background_url(style: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"url\(\s*["']?(?P<url>[^"')]+)["']?\s*\)"#)
            .expect("Invalid regex pattern defined in code")
    });

    let url = re.captures(style)?.name("url")?.as_str().trim();
    (!url.is_empty()).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_href() {
        let base = Url::parse("https://example.org/").unwrap();
        assert_eq!(
            resolve(&base, "/frieren-1234").as_deref(),
            Some("https://example.org/frieren-1234")
        );
        assert_eq!(
            resolve(&base, "https://other.example/x").as_deref(),
            Some("https://other.example/x")
        );
        assert_eq!(resolve(&base, "  "), None);
    }

    #[test]
    fn test_style_background_url() {
        let style = r#"background-image: url("/image/poster/frieren.webp"); background-position: center"#;
        assert_eq!(style_background_url(style), Some("/image/poster/frieren.webp"));
        assert_eq!(style_background_url("url(/a.jpg)"), Some("/a.jpg"));
        assert_eq!(style_background_url("background-position: center"), None);
    }
}
