use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::types::{
    PlaceholderFormat,
    Route,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "routes[0].path")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{}': {source}", path.display())]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    /// Used when no language preference has been persisted yet.
    pub default_language: String,
    /// Looked up when the active language has no string for a key.
    pub fallback_language: String,

    pub placeholder_formats: Vec<PlaceholderFormat>,

    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub markers: MarkerConfig,
    pub navigation: NavigationConfig,

    /// Static tab table, in display order.
    pub routes: Vec<Route>,

    /// Lowers the default log level to `debug`.
    pub debug: bool,
    /// Writes logs to this file (relative to the site root) instead of stderr.
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogConfig {
    /// Absolute location of the catalog on the site.
    pub path: String,
    /// Sent as `?v=` and compared against the cached copy.
    pub version: String,
    pub cache_enabled: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: "/cfg/lang_cfg.json".to_string(), version: "3.1".to_string(), cache_enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Storage key of the persisted language preference.
    pub language_key: String,
    /// Storage key of the cached catalog (`{version, data}`).
    pub catalog_key: String,
    /// Backing file of the durable storage, relative to the site root.
    pub file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            language_key: "user_lang".to_string(),
            catalog_key: "lang_data_v8".to_string(),
            file: ".site-storage.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerConfig {
    /// Attribute holding the translation key of a tagged element.
    pub key_attribute: String,
    /// Attribute holding a JSON array of element-local parameters.
    pub params_attribute: String,
    /// Class added to elements whose translation failed.
    pub error_class: String,
    /// `id` of the language switcher control.
    pub switcher_id: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            key_attribute: "data-lang-id".to_string(),
            params_attribute: "data-lang-params".to_string(),
            error_class: "lang-error".to_string(),
            switcher_id: "lang-switcher".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationConfig {
    /// `id` of the container replaced on every navigation swap.
    pub content_container_id: String,
    /// `role` of the tab list container.
    pub tab_list_role: String,
    /// Fetch the other tabs' pages once after startup.
    pub preload_tabs: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            content_container_id: "main".to_string(),
            tab_list_role: "tablist".to_string(),
            preload_tabs: true,
        }
    }
}

impl RuntimeSettings {
    /// # Errors
    /// - Required field is empty
    /// - Marker attributes collide
    /// - Invalid or duplicated route
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.fallback_language.is_empty() {
            errors.push(ValidationError::new(
                "fallbackLanguage",
                "The fallback language cannot be empty. Example: \"en\"",
            ));
        }

        if self.default_language.is_empty() {
            errors.push(ValidationError::new(
                "defaultLanguage",
                "The default language cannot be empty. Example: \"en\"",
            ));
        }

        if self.placeholder_formats.is_empty() {
            errors.push(ValidationError::new(
                "placeholderFormats",
                "At least one format is required. Example: [\"braced\", \"numbered\"]",
            ));
        }

        if !self.catalog.path.starts_with('/') {
            errors.push(ValidationError::new(
                "catalog.path",
                format!("The path must be absolute (start with '/'): '{}'", self.catalog.path),
            ));
        }

        for (field, value) in [
            ("storage.languageKey", &self.storage.language_key),
            ("storage.catalogKey", &self.storage.catalog_key),
            ("markers.keyAttribute", &self.markers.key_attribute),
            ("markers.paramsAttribute", &self.markers.params_attribute),
            ("markers.errorClass", &self.markers.error_class),
            ("navigation.contentContainerId", &self.navigation.content_container_id),
        ] {
            if value.is_empty() {
                errors.push(ValidationError::new(field, "The value cannot be empty"));
            }
        }

        if self.storage.language_key == self.storage.catalog_key {
            errors.push(ValidationError::new(
                "storage.catalogKey",
                "The catalog key must differ from 'storage.languageKey'",
            ));
        }

        if self.markers.key_attribute == self.markers.params_attribute {
            errors.push(ValidationError::new(
                "markers.paramsAttribute",
                "The parameter attribute must differ from 'markers.keyAttribute'",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for (index, route) in self.routes.iter().enumerate() {
            if !route.path.starts_with('/') {
                errors.push(ValidationError::new(
                    format!("routes[{index}].path"),
                    format!("The path must be absolute (start with '/'): '{}'", route.path),
                ));
            } else if !seen.insert(crate::types::normalize_path(&route.path)) {
                errors.push(ValidationError::new(
                    format!("routes[{index}].path"),
                    format!("Duplicate route path '{}'", route.path),
                ));
            }

            if route.key.is_empty() {
                errors.push(ValidationError::new(
                    format!("routes[{index}].key"),
                    "The translation key cannot be empty",
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            fallback_language: "en".to_string(),
            placeholder_formats: vec![PlaceholderFormat::Braced, PlaceholderFormat::Numbered],
            catalog: CatalogConfig::default(),
            storage: StorageConfig::default(),
            markers: MarkerConfig::default(),
            navigation: NavigationConfig::default(),
            routes: vec![
                Route::new("/", "tab_progress"),
                Route::new("/page/article.html", "tab_article"),
                Route::new("/page/game.html", "tab_game"),
                Route::new("/page/gallery.html", "tab_gallery"),
                Route::new("/page/about.html", "tab_about"),
            ],
            debug: false,
            log_file: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = RuntimeSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"fallbackLanguage": "ja", "catalog": {"version": "4.0"}}"#;

        let settings: RuntimeSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.fallback_language, eq("ja"));
        assert_that!(settings.catalog.version, eq("4.0"));
        assert_that!(settings.catalog.path, eq("/cfg/lang_cfg.json"));
        assert_that!(settings.routes, len(eq(5)));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let settings: RuntimeSettings = serde_json::from_str("{}").unwrap();

        assert_that!(settings.markers.key_attribute, eq("data-lang-id"));
        assert_that!(settings.storage.language_key, eq("user_lang"));
        assert_that!(settings.storage.catalog_key, eq("lang_data_v8"));
        assert_that!(settings.navigation.content_container_id, eq("main"));
        assert_that!(
            settings.placeholder_formats,
            elements_are![eq(&PlaceholderFormat::Braced), eq(&PlaceholderFormat::Numbered)]
        );
    }

    #[rstest]
    fn deserialize_routes() {
        let json = r#"{"routes": [{"path": "/", "key": "home"}]}"#;

        let settings: RuntimeSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.routes, elements_are![eq(&Route::new("/", "home"))]);
    }

    #[rstest]
    fn validate_empty_fallback_language() {
        let settings =
            RuntimeSettings { fallback_language: String::new(), ..RuntimeSettings::default() };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("fallbackLanguage")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn validate_no_placeholder_formats() {
        let settings =
            RuntimeSettings { placeholder_formats: vec![], ..RuntimeSettings::default() };

        assert_that!(
            settings.validate(),
            err(elements_are![field!(ValidationError.field_path, eq("placeholderFormats"))])
        );
    }

    #[rstest]
    fn validate_relative_catalog_path() {
        let settings = RuntimeSettings {
            catalog: CatalogConfig { path: "cfg/lang.json".to_string(), ..CatalogConfig::default() },
            ..RuntimeSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("catalog.path")),
                field!(ValidationError.message, contains_substring("cfg/lang.json"))
            ]])
        );
    }

    #[rstest]
    fn validate_colliding_marker_attributes() {
        let settings = RuntimeSettings {
            markers: MarkerConfig {
                params_attribute: "data-lang-id".to_string(),
                ..MarkerConfig::default()
            },
            ..RuntimeSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![field!(ValidationError.field_path, eq("markers.paramsAttribute"))])
        );
    }

    #[rstest]
    fn validate_duplicate_routes_after_normalization() {
        let settings = RuntimeSettings {
            routes: vec![Route::new("/", "home"), Route::new("/index.html", "home_again")],
            ..RuntimeSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("routes[1].path")),
                field!(ValidationError.message, contains_substring("Duplicate"))
            ]])
        );
    }

    #[rstest]
    fn validate_route_problems_are_all_reported() {
        let settings = RuntimeSettings {
            routes: vec![Route::new("page.html", ""), Route::new("/ok", "ok")],
            ..RuntimeSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![
                field!(ValidationError.field_path, eq("routes[0].path")),
                field!(ValidationError.field_path, eq("routes[0].key"))
            ])
        );
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let settings = RuntimeSettings {
            fallback_language: String::new(),
            placeholder_formats: vec![],
            ..RuntimeSettings::default()
        };

        let errors = settings.validate().unwrap_err();
        let config_error = ConfigError::ValidationErrors(errors);

        let error_message = format!("{config_error}");
        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. fallbackLanguage"));
        assert_that!(error_message, contains_substring("2. placeholderFormats"));
    }
}
