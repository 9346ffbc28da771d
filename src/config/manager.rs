//! サイト単位の設定管理

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    RuntimeSettings,
    loader,
};

/// サイトルートと、そこから読み込んだ設定を保持する
///
/// 設定内の相対パス（ストレージ、ログファイル）はサイトルート基準で解決する。
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: RuntimeSettings,
    /// サイトのルートディレクトリ
    site_root: PathBuf,
}

impl ConfigManager {
    /// デフォルト設定で作成（ファイルは読まない）
    #[must_use]
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self { current_settings: RuntimeSettings::default(), site_root: site_root.into() }
    }

    /// サイトルートの設定ファイルを読み込んで検証する
    ///
    /// 失敗した場合は現在の設定を維持する。
    ///
    /// # Errors
    /// - ファイル読み込み・JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self) -> Result<(), ConfigError> {
        let settings = loader::load_from_site_root(&self.site_root)?.unwrap_or_default();
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        tracing::debug!(site_root = %self.site_root.display(), "Settings loaded");
        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &RuntimeSettings {
        &self.current_settings
    }

    #[must_use]
    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// 永続ストレージのファイル
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.site_root.join(&self.current_settings.storage.file)
    }

    /// ログファイル（未設定なら `None`）
    #[must_use]
    pub fn log_path(&self) -> Option<PathBuf> {
        self.current_settings.log_file.as_ref().map(|file| self.site_root.join(file))
    }
}
