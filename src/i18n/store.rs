//! Translation state: catalog, active language and dynamic parameters.

use std::collections::HashMap;

use crate::config::{
    CatalogConfig,
    RuntimeSettings,
    StorageConfig,
};
use crate::fetch::Fetcher;
use crate::i18n::format::substitute;
use crate::input::catalog::{
    CachedCatalog,
    Catalog,
    CatalogError,
};
use crate::storage::Storage;
use crate::types::PlaceholderFormat;

/// Convenience for calling `translate` without parameters.
pub const NO_PARAMS: &[&str] = &[];

/// Where the active catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Durable cache with a matching version
    Cache,
    /// Fetched from the site
    Network,
}

/// Owns the translation catalog, the active language and the dynamic
/// parameter bindings.
///
/// Lookups never fail: a key missing from the active language falls back to
/// the fallback language and finally to the key itself.
#[derive(Debug)]
pub struct TranslationStore {
    /// Language looked up when the active language has no string
    fallback_language: String,
    /// Enabled placeholder syntaxes
    formats: Vec<PlaceholderFormat>,
    /// Catalog location and cache policy
    catalog_config: CatalogConfig,
    /// Storage keys
    storage_config: StorageConfig,
    /// Loaded catalog, empty until `load` succeeds
    catalog: Catalog,
    /// Active language code
    active: String,
    /// Translation key → parameters supplied at runtime
    dynamic: HashMap<String, Vec<String>>,
    /// `cached_translate` results, cleared on language switch and reload
    memo: HashMap<(String, Vec<String>), String>,
    /// Durable language preference and catalog cache
    storage: Box<dyn Storage>,
    /// Set once the owning localizer finished `init`
    initialized: bool,
}

impl TranslationStore {
    #[must_use]
    pub fn new(settings: &RuntimeSettings, storage: Box<dyn Storage>) -> Self {
        Self {
            fallback_language: settings.fallback_language.clone(),
            formats: settings.placeholder_formats.clone(),
            catalog_config: settings.catalog.clone(),
            storage_config: settings.storage.clone(),
            catalog: Catalog::empty(),
            active: settings.fallback_language.clone(),
            dynamic: HashMap::new(),
            memo: HashMap::new(),
            storage,
            initialized: false,
        }
    }

    /// Activates the persisted language preference, or `default_language` when
    /// none was persisted. Nothing is written.
    pub fn restore_language(&mut self, default_language: &str) {
        let persisted = self
            .storage
            .get_item(&self.storage_config.language_key)
            .filter(|code| !code.is_empty());

        self.active = match persisted {
            Some(code) => code,
            None if default_language.is_empty() => self.fallback_language.clone(),
            None => default_language.to_string(),
        };
    }

    /// Loads the catalog.
    ///
    /// A cached copy is used when its version matches the configured one;
    /// otherwise the catalog is fetched and written back to the cache. On failure
    /// the catalog is left empty so every lookup degrades to the raw key.
    pub async fn load<F: Fetcher>(&mut self, fetcher: &F) -> Result<CatalogSource, CatalogError> {
        if self.catalog_config.cache_enabled
            && let Some(cached) = self.cached_catalog()
        {
            if cached.version == self.catalog_config.version {
                tracing::debug!(version = %cached.version, entries = cached.data.len(), "Using cached catalog");
                self.catalog = cached.data;
                return Ok(CatalogSource::Cache);
            }
            tracing::debug!(
                cached = %cached.version,
                expected = %self.catalog_config.version,
                "Cached catalog is outdated"
            );
        }

        let url = format!("{}?v={}", self.catalog_config.path, self.catalog_config.version);
        let catalog = match Self::fetch_catalog(fetcher, &url).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Catalog load failed");
                self.catalog = Catalog::empty();
                return Err(e);
            }
        };

        tracing::info!(url = %url, entries = catalog.len(), "Catalog loaded");
        self.catalog = catalog;
        if self.catalog_config.cache_enabled {
            self.write_cache();
        }
        Ok(CatalogSource::Network)
    }

    /// Loads the catalog again and clears memoised translations.
    pub async fn reload<F: Fetcher>(&mut self, fetcher: &F) -> Result<CatalogSource, CatalogError> {
        let result = self.load(fetcher).await;
        self.memo.clear();
        result
    }

    /// GET and parse the catalog payload.
    async fn fetch_catalog<F: Fetcher>(fetcher: &F, url: &str) -> Result<Catalog, CatalogError> {
        let text = fetcher.fetch_text(url).await?;
        Catalog::from_json(&text)
    }

    /// Cached catalog, if present and readable.
    fn cached_catalog(&self) -> Option<CachedCatalog> {
        let raw = self.storage.get_item(&self.storage_config.catalog_key)?;
        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable catalog cache");
                None
            }
        }
    }

    /// Stores the current catalog with its version.
    fn write_cache(&mut self) {
        let cached = CachedCatalog::new(self.catalog_config.version.clone(), self.catalog.clone());
        let result = serde_json::to_string(&cached)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set_item(&self.storage_config.catalog_key, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to cache catalog");
        }
    }

    /// Catalog string for `key`: active language, then fallback language, then
    /// the key itself.
    #[must_use]
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.catalog
            .lookup(key, &self.active)
            .or_else(|| self.catalog.lookup(key, &self.fallback_language))
            .unwrap_or(key)
    }

    /// Resolves `key` and substitutes `params` verbatim.
    #[must_use]
    pub fn translate<P: AsRef<str>>(&self, key: &str, params: &[P]) -> String {
        substitute(self.resolve(key), params, &self.formats, false)
    }

    /// Resolves `key` and substitutes HTML-escaped `params`.
    #[must_use]
    pub fn translate_markup<P: AsRef<str>>(&self, key: &str, params: &[P]) -> String {
        substitute(self.resolve(key), params, &self.formats, true)
    }

    /// Memoised [`Self::translate`].
    pub fn cached_translate<P: AsRef<str>>(&mut self, key: &str, params: &[P]) -> String {
        let memo_key =
            (key.to_string(), params.iter().map(|p| p.as_ref().to_string()).collect::<Vec<_>>());
        if let Some(text) = self.memo.get(&memo_key) {
            return text.clone();
        }
        let text = self.translate(key, params);
        self.memo.insert(memo_key, text.clone());
        text
    }

    /// Switches the active language.
    ///
    /// Returns `false` without touching storage when `code` is empty or already
    /// active. Otherwise the choice is persisted and memoised translations are
    /// dropped.
    pub fn set_language(&mut self, code: &str) -> bool {
        if code.is_empty() || code == self.active {
            return false;
        }

        tracing::debug!(from = %self.active, to = %code, "Switching language");
        self.active = code.to_string();
        if let Err(e) = self.storage.set_item(&self.storage_config.language_key, code) {
            tracing::warn!(error = %e, "Failed to persist language preference");
        }
        self.memo.clear();
        true
    }

    pub fn set_parameters(&mut self, key: &str, params: Vec<String>) {
        self.dynamic.insert(key.to_string(), params);
    }

    pub fn clear_parameters(&mut self, key: &str) -> Option<Vec<String>> {
        self.dynamic.remove(key)
    }

    /// Dynamic parameters bound to `key`.
    #[must_use]
    pub fn parameters(&self, key: &str) -> &[String] {
        self.dynamic.get(key).map_or(&[], Vec::as_slice)
    }

    /// Keys with dynamic parameters.
    pub fn parameter_keys(&self) -> impl Iterator<Item = &str> {
        self.dynamic.keys().map(String::as_str)
    }

    #[must_use]
    pub fn current_language(&self) -> &str {
        &self.active
    }

    #[must_use]
    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    /// Every language code present in the catalog, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        self.catalog.languages().into_iter().map(str::to_string).collect()
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }
}
