//! 設定ファイルの読み込み

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    RuntimeSettings,
};

/// サイトルート直下の設定ファイル名
pub(super) const CONFIG_FILE_NAME: &str = ".site-runtime.json";

/// 設定ファイルのパス
pub(super) fn config_path(site_root: &Path) -> PathBuf {
    site_root.join(CONFIG_FILE_NAME)
}

/// サイトルートの設定ファイルを読み込む
///
/// ファイルが無ければ `Ok(None)`。読み込み・パースエラーにはファイルのパスを含める。
pub(super) fn load_from_site_root(site_root: &Path) -> Result<Option<RuntimeSettings>, ConfigError> {
    let path = config_path(site_root);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No site configuration, using defaults");
            return Ok(None);
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let settings = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Site configuration loaded");

    Ok(Some(settings))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn partial_config_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(config_path(temp_dir.path()), r#"{"catalog": {"version": "4.0"}}"#).unwrap();

        let settings = load_from_site_root(temp_dir.path()).unwrap().unwrap();

        assert_eq!(settings.catalog.version, "4.0");
        assert_eq!(settings.catalog.path, "/cfg/lang_cfg.json");
        assert_eq!(settings.storage.language_key, "user_lang");
    }

    #[rstest]
    fn missing_config_is_none() {
        let temp_dir = TempDir::new().unwrap();

        assert!(load_from_site_root(temp_dir.path()).unwrap().is_none());
    }

    #[rstest]
    fn parse_error_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(config_path(temp_dir.path()), "{ not json").unwrap();

        let error = load_from_site_root(temp_dir.path()).unwrap_err();

        assert!(matches!(&error, ConfigError::Parse { path, .. } if path.ends_with(CONFIG_FILE_NAME)));
        assert!(error.to_string().contains(CONFIG_FILE_NAME));
    }

    #[rstest]
    fn unreadable_config_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(config_path(temp_dir.path())).unwrap();

        let result = load_from_site_root(temp_dir.path());

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
