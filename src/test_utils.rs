//! テスト用ユーティリティ
//!
//! 複数のテストモジュールで使用される共通のフェイクとサンプルデータを提供します。
#![cfg(test)]

use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};
use std::time::Duration;

use crate::dom::NodeSpec;
use crate::fetch::{
    FetchError,
    Fetcher,
};
use crate::input::page::PageFragment;

/// テスト用の翻訳カタログ（JSON）
pub(crate) const SAMPLE_CATALOG: &str = r#"[
    {"id": "greet", "en": "Hi {0}", "ja": "こんにちは {0}"},
    {"id": "items", "en": "Hello {0}, you have %2$s new items from {1}"},
    {"id": "countdown", "en": "Refresh in {0}:{1}", "fr": "Actualisation dans {0}:{1}"},
    {"id": "multiline", "en": "first\nsecond"},
    {"id": "page_title", "en": "Welcome", "fr": "Bienvenue"},
    {"id": "tab_progress", "en": "Progress", "fr": "Progrès"},
    {"id": "tab_article", "en": "Articles", "fr": "Articles"},
    {"id": "tab_game", "en": "Games", "fr": "Jeux"},
    {"id": "tab_gallery", "en": "Gallery", "fr": "Galerie"},
    {"id": "tab_about", "en": "About Me", "fr": "À propos"},
    {"en": "orphan"}
]"#;

/// フェイクのレスポンス
#[derive(Debug, Clone)]
enum FakeResponse {
    Body { text: String, delay: Option<Duration> },
    Missing { delay: Option<Duration> },
}

#[derive(Debug, Default)]
struct FakeInner {
    /// URL パス（クエリなし）→ レスポンス
    responses: HashMap<String, FakeResponse>,
    /// 受け付けたリクエスト（クエリ付き）
    requests: Vec<String>,
}

/// メモリ上のレスポンスを返す `Fetcher`
///
/// 登録されていない URL は `FetchError::NotFound` を返します。
/// クローンは同じレスポンスとリクエスト履歴を共有します。
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeFetcher {
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// サンプルカタログを `/cfg/lang_cfg.json` に登録した状態で作成
    pub(crate) fn with_catalog() -> Self {
        Self::new().with_body("/cfg/lang_cfg.json", SAMPLE_CATALOG)
    }

    pub(crate) fn with_body(self, url: &str, text: &str) -> Self {
        self.insert(url, FakeResponse::Body { text: text.to_string(), delay: None });
        self
    }

    pub(crate) fn with_delayed_body(self, url: &str, text: &str, delay: Duration) -> Self {
        self.insert(url, FakeResponse::Body { text: text.to_string(), delay: Some(delay) });
        self
    }

    pub(crate) fn with_page(self, url: &str, title: &str, main: Vec<NodeSpec>) -> Self {
        let body = page_json(title, main);
        self.with_body(url, &body)
    }

    pub(crate) fn with_delayed_page(
        self,
        url: &str,
        title: &str,
        main: Vec<NodeSpec>,
        delay: Duration,
    ) -> Self {
        let body = page_json(title, main);
        self.with_delayed_body(url, &body, delay)
    }

    pub(crate) fn with_delayed_missing(self, url: &str, delay: Duration) -> Self {
        self.insert(url, FakeResponse::Missing { delay: Some(delay) });
        self
    }

    /// これまでに受け付けたリクエスト
    pub(crate) fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// パスが `path` で始まるリクエストの数
    pub(crate) fn request_count(&self, path: &str) -> usize {
        self.lock().requests.iter().filter(|url| url.starts_with(path)).count()
    }

    fn insert(&self, url: &str, response: FakeResponse) {
        self.lock().responses.insert(url.to_string(), response);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let response = {
            let mut inner = self.lock();
            inner.requests.push(url.to_string());
            inner.responses.get(path).cloned()
        };

        match response {
            Some(FakeResponse::Body { text, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(text)
            }
            Some(FakeResponse::Missing { delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Err(FetchError::NotFound(url.to_string()))
            }
            None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}

/// ページフラグメントの JSON を作成
pub(crate) fn page_json(title: &str, main: Vec<NodeSpec>) -> String {
    let page = PageFragment { title: title.to_string(), main };
    serde_json::to_string(&page).unwrap_or_default()
}

/// `data-lang-id` 付きの要素
pub(crate) fn tagged(tag: &str, key: &str) -> NodeSpec {
    NodeSpec::element(tag).attr("data-lang-id", key)
}
