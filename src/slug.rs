use once_cell::sync::Lazy;
use regex::Regex;

static RE_INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"));
static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("static regex"));
static RE_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static regex"));

/// Turn a title into a URL-safe slug. May return an empty string when the
/// input has no ASCII letters or digits.
pub fn slugify(s: &str) -> String {
    let lowered = s.to_lowercase().replace([' ', '_'], "-");
    let stripped = RE_INVALID.replace_all(&lowered, "");
    let collapsed = RE_DASHES.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

pub fn is_valid_slug(s: &str) -> bool {
    RE_SLUG.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_titles() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  foo__bar  "), "foo-bar");
        assert_eq!(slugify("Rust 2024: What's New?"), "rust-2024-whats-new");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn output_is_valid_or_empty_and_idempotent() {
        let inputs = [
            "Hello, World!",
            "  foo__bar  ",
            "a - b - c",
            "Ünïcödé Títle",
            "__--__",
            "Tabs\tand\nnewlines",
            "MiXeD CaSe 123",
            "",
        ];
        for input in inputs {
            let once = slugify(input);
            assert!(
                once.is_empty() || is_valid_slug(&once),
                "{input:?} -> {once:?}"
            );
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn slug_pattern() {
        assert!(is_valid_slug("my-post-1"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug(""));
    }
}
