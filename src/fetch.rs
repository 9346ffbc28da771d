//! Resource fetching.

use std::path::{
    Component,
    Path,
    PathBuf,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid resource URL: '{0}'")]
    InvalidUrl(String),

    #[error("Failed to read resource: {0}")]
    Io(#[from] std::io::Error),
}

/// Async GET of a site resource as text.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Serves resources from a site root directory.
///
/// The query string and fragment are ignored; directory URLs resolve to their
/// `index.html`.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    /// Site root directory
    root: PathBuf,
}

impl FsFetcher {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `url` to a file below the root.
    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();

        let Some(relative) = path.strip_prefix('/') else {
            return Err(FetchError::InvalidUrl(url.to_string()));
        };

        let relative = Path::new(relative);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut resolved = self.root.join(relative);
        if path.ends_with('/') {
            resolved.push("index.html");
        }
        Ok(resolved)
    }
}

impl Fetcher for FsFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let path = self.resolve(url)?;
        tracing::debug!(url = %url, path = %path.display(), "Fetching resource");

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(url.to_string()))
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    #[case::root("/", "index.html")]
    #[case::query("/cfg/lang_cfg.json?v=3.1", "cfg/lang_cfg.json")]
    #[case::fragment("/page/about.html#me", "page/about.html")]
    #[case::directory("/page/", "page/index.html")]
    fn resolve_maps_urls_below_root(#[case] url: &str, #[case] expected: &str) {
        let fetcher = FsFetcher::new("/site");

        assert_eq!(fetcher.resolve(url).unwrap(), Path::new("/site").join(expected));
    }

    #[rstest]
    #[case::relative("page/about.html")]
    #[case::parent("/../secret")]
    #[case::nested_parent("/page/../../secret")]
    fn resolve_rejects_escaping_urls(#[case] url: &str) {
        let fetcher = FsFetcher::new("/site");

        assert!(matches!(fetcher.resolve(url), Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn fetch_text_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("cfg")).unwrap();
        std::fs::write(temp_dir.path().join("cfg/lang_cfg.json"), "[]").unwrap();
        let fetcher = FsFetcher::new(temp_dir.path());

        let content = fetcher.fetch_text("/cfg/lang_cfg.json?v=1").await.unwrap();

        assert_eq!(content, "[]");
    }

    #[tokio::test]
    async fn fetch_text_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = FsFetcher::new(temp_dir.path());

        let result = fetcher.fetch_text("/page/missing.html").await;

        assert!(matches!(result, Err(FetchError::NotFound(url)) if url == "/page/missing.html"));
    }
}
