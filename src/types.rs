//! Core types used throughout the project.

use serde::{
    Deserialize,
    Serialize,
};

/// One navigational tab: a location path and the translation key of its label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Route {
    pub path: String,
    pub key: String,
}

impl Route {
    #[must_use]
    pub fn new(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self { path: path.into(), key: key.into() }
    }
}

/// Placeholder syntax recognised in catalog strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderFormat {
    /// `{0}`, `{1}`, ...; `{n}` takes `params[n]`
    Braced,
    /// `%1$s`, `%2$s`, ...; `%n$s` also takes `params[n]`, so `%2$s` and `{2}`
    /// name the same value
    Numbered,
}

/// Normalizes a location for comparison.
///
/// The fragment is dropped, a missing leading slash is added and the root
/// index document collapses to `/`.
///
/// # Examples
/// - `/index.html` → `/`
/// - `` → `/`
/// - `/page/about.html#top` → `/page/about.html`
#[must_use]
pub fn normalize_path(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default().trim();

    if without_fragment.is_empty() {
        return "/".to_string();
    }

    let absolute = if without_fragment.starts_with('/') {
        without_fragment.to_string()
    } else {
        format!("/{without_fragment}")
    };

    if absolute == "/index.html" { "/".to_string() } else { absolute }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::root("/", "/")]
    #[case::empty("", "/")]
    #[case::index("/index.html", "/")]
    #[case::relative_index("index.html", "/")]
    #[case::page("/page/about.html", "/page/about.html")]
    #[case::fragment("/page/about.html#top", "/page/about.html")]
    #[case::fragment_only("#tabs", "/")]
    #[case::query_kept("/page/game.html?sort=name", "/page/game.html?sort=name")]
    #[case::nested_index_kept("/page/index.html", "/page/index.html")]
    fn test_normalize_path(#[case] input: &str, #[case] expected: &str) {
        assert_that!(normalize_path(input), eq(expected));
    }

    #[rstest]
    fn placeholder_format_deserializes_lowercase() {
        let formats: Vec<PlaceholderFormat> =
            serde_json::from_str(r#"["braced", "numbered"]"#).unwrap_or_default();

        assert_that!(formats, elements_are![eq(&PlaceholderFormat::Braced), eq(&PlaceholderFormat::Numbered)]);
    }
}
