//! サイトランタイム
//!
//! ドキュメント・ローカライザー・タブ・ナビゲーションを束ね、
//! クリック/変更イベントを各コンポーネントへ振り分ける。

use std::sync::atomic::{
    AtomicBool,
    Ordering,
};

use tokio::sync::{
    Mutex,
    broadcast,
};

use crate::config::RuntimeSettings;
use crate::dom::{
    Document,
    Dom,
    Listener,
    NodeId,
    ReadyState,
};
use crate::fetch::Fetcher;
use crate::i18n::Localizer;
use crate::nav::{
    NavigationCoordinator,
    NavigationError,
    NavigationEvent,
    NavigationOutcome,
    TabClick,
    TabSelectionState,
};
use crate::storage::Storage;

/// クリックイベントの処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// どのリスナーも反応しなかった（ブラウザの既定動作に任せる）
    Unhandled,
    /// 現在地へのリンク。既定動作のみ抑止した
    AlreadyCurrent,
    /// ナビゲーションを実行した
    Navigated(NavigationOutcome),
}

/// クリックの振り分け先
#[derive(Debug)]
enum ClickAction {
    /// 該当なし
    Ignore,
    /// 既定動作の抑止のみ
    Prevent,
    /// タブクリック（選択状態は先行して更新済み）
    Tab(String),
    /// コンテンツ内リンク
    Link(String),
}

/// サイト全体の共有状態
///
/// ロック順序: `document` → `localizer` → `tabs`
/// （デッドロック防止のため、複数ロックを取る場合は必ずこの順序で取得すること）
pub struct SiteRuntime<F> {
    /// ランタイム設定
    settings: RuntimeSettings,
    /// ドキュメント
    document: Mutex<Document>,
    /// 翻訳ストア + DOM 同期
    localizer: Mutex<Localizer>,
    /// タブ選択状態
    tabs: Mutex<TabSelectionState>,
    /// ページ遷移
    coordinator: NavigationCoordinator,
    /// ページ・カタログの取得元
    fetcher: F,
    /// `start` 済みフラグ
    started: AtomicBool,
}

impl<F> std::fmt::Debug for SiteRuntime<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRuntime")
            .field("coordinator", &self.coordinator)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl<F: Fetcher> SiteRuntime<F> {
    #[must_use]
    pub fn new(
        settings: RuntimeSettings,
        document: Document,
        storage: Box<dyn Storage>,
        fetcher: F,
    ) -> Self {
        let localizer = Localizer::new(&settings, storage);
        let tabs = TabSelectionState::new(
            settings.routes.clone(),
            &settings.navigation,
            &settings.markers,
        );
        let coordinator = NavigationCoordinator::new(&settings.navigation);

        Self {
            settings,
            document: Mutex::new(document),
            localizer: Mutex::new(localizer),
            tabs: Mutex::new(tabs),
            coordinator,
            fetcher,
            started: AtomicBool::new(false),
        }
    }

    /// 初期コンテンツを読み込む（イベントは発行しない）
    ///
    /// # Errors
    /// ページの取得・解析に失敗した場合、またはコンテナが存在しない場合
    pub async fn hydrate(&self, url: &str) -> Result<(), NavigationError> {
        let mut doc = self.document.lock().await;
        self.coordinator.hydrate(&mut doc, &self.fetcher, url).await
    }

    /// ランタイムを起動する（2 回目以降は何もせず `false` を返す）
    ///
    /// 1. リンクのインターセプトとタブ一覧を設定
    /// 2. ドキュメントの読み込み完了を待機
    /// 3. 言語設定の復元とカタログの読み込み
    /// 4. 初回レンダリング・スイッチャーのバインド・監視開始
    /// 5. 現在地のタブを選択し、他のタブを先読み
    pub async fn start(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }

        let mut ready = {
            let mut doc = self.document.lock().await;
            self.coordinator.setup(&mut doc);
            self.tabs.lock().await.render(&mut doc);
            doc.ready_signal()
        };
        if ready.wait_for(|state| *state == ReadyState::Complete).await.is_err() {
            tracing::warn!("Document readiness is no longer tracked, continuing");
        }

        // カタログ取得中はドキュメントをロックしない
        let source = self
            .localizer
            .lock()
            .await
            .prepare(&self.fetcher, &self.settings.default_language)
            .await;

        let location = {
            let mut doc = self.document.lock().await;
            let mut localizer = self.localizer.lock().await;
            localizer.attach(&mut *doc);
            let location = doc.location().to_string();
            self.tabs.lock().await.update_selected(&mut doc, &location);
            location
        };

        tracing::info!(location = %location, catalog = ?source, "Site runtime started");

        if self.settings.navigation.preload_tabs {
            self.preload(&location).await;
        }
        true
    }

    /// 現在地以外のタブのページを並列に先読みする
    async fn preload(&self, current: &str) {
        let targets = self.tabs.lock().await.preload_targets(current);
        let futures = targets
            .iter()
            .map(|url| self.coordinator.prefetch(&self.fetcher, url));
        let results = futures::future::join_all(futures).await;

        for (url, result) in targets.iter().zip(results) {
            if let Err(error) = result {
                tracing::warn!(url = %url, error = %error, "Failed to preload page");
            }
        }
    }

    /// `url` へ遷移し、完了した場合はタブ選択と翻訳を追従させる
    ///
    /// # Errors
    /// 最新のリクエストの取得・解析・差し替えに失敗した場合
    pub async fn navigate(&self, url: &str) -> Result<NavigationOutcome, NavigationError> {
        let outcome = self.coordinator.load_url(&self.document, &self.fetcher, url).await?;
        if outcome == NavigationOutcome::Completed {
            self.after_swap().await;
        }
        Ok(outcome)
    }

    /// コンテンツ差し替え後の同期処理
    async fn after_swap(&self) {
        let mut doc = self.document.lock().await;
        let mut localizer = self.localizer.lock().await;
        let location = doc.location().to_string();
        self.tabs.lock().await.update_selected(&mut doc, &location);
        localizer.process_mutations(&mut *doc);
        localizer.bind_switcher(&mut *doc);
    }

    /// `target` のクリックを祖先方向に配送する
    ///
    /// タブのクリックは遷移前に選択状態を更新し、遷移が失敗した場合は
    /// 現在地に合わせて選択を戻す。
    ///
    /// # Errors
    /// 発生したナビゲーションが失敗した場合
    pub async fn click(&self, target: NodeId) -> Result<ClickOutcome, NavigationError> {
        match self.dispatch_click(target).await {
            ClickAction::Ignore => Ok(ClickOutcome::Unhandled),
            ClickAction::Prevent => Ok(ClickOutcome::AlreadyCurrent),
            ClickAction::Link(url) => self.navigate(&url).await.map(ClickOutcome::Navigated),
            ClickAction::Tab(url) => match self.navigate(&url).await {
                Ok(outcome) => Ok(ClickOutcome::Navigated(outcome)),
                Err(error) => {
                    let mut doc = self.document.lock().await;
                    let location = doc.location().to_string();
                    self.tabs.lock().await.update_selected(&mut doc, &location);
                    Err(error)
                }
            },
        }
    }

    /// クリック対象から最初に反応したリスナーを決める
    async fn dispatch_click(&self, target: NodeId) -> ClickAction {
        let mut doc = self.document.lock().await;

        for node in doc.ancestors(target) {
            for (_, listener) in doc.listeners(node) {
                match listener {
                    Listener::TabList => {
                        let tabs = self.tabs.lock().await;
                        let current = doc.location().to_string();
                        match tabs.handle_click(&doc, target, &current) {
                            TabClick::Ignored => {}
                            TabClick::AlreadyCurrent => return ClickAction::Prevent,
                            TabClick::Navigate(url) => {
                                tabs.update_selected(&mut doc, &url);
                                return ClickAction::Tab(url);
                            }
                        }
                    }
                    Listener::LinkInterceptor => {
                        if let Some(url) = self.coordinator.intercept_click(&doc, target) {
                            return ClickAction::Link(url);
                        }
                    }
                    Listener::LanguageSwitcher => {}
                }
            }
        }
        ClickAction::Ignore
    }

    /// `target` の change イベント。言語スイッチャー以外は無視する
    pub async fn change(&self, target: NodeId) -> bool {
        let mut doc = self.document.lock().await;
        let bound = doc
            .listeners(target)
            .iter()
            .any(|(_, listener)| *listener == Listener::LanguageSwitcher);
        if !bound {
            return false;
        }
        self.localizer.lock().await.switcher_changed(&mut *doc)
    }

    /// 言語を切り替えて再描画する
    pub async fn change_language(&self, code: &str) -> bool {
        let mut doc = self.document.lock().await;
        self.localizer.lock().await.set_language(&mut *doc, code)
    }

    /// 動的パラメータを設定して該当要素を再描画する
    pub async fn set_parameters(&self, key: &str, params: Vec<String>) {
        let mut doc = self.document.lock().await;
        self.localizer.lock().await.set_parameters(&mut *doc, key, params);
    }

    pub async fn translate(&self, key: &str, params: &[&str]) -> String {
        self.localizer.lock().await.translate(key, params)
    }

    pub async fn current_language(&self) -> String {
        self.localizer.lock().await.current_language().to_string()
    }

    /// 選択中のタブのパス
    pub async fn selected_tab(&self) -> Option<String> {
        let doc = self.document.lock().await;
        self.tabs.lock().await.selected_tab(&doc)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.coordinator.subscribe()
    }

    #[must_use]
    pub fn document(&self) -> &Mutex<Document> {
        &self.document
    }

    #[must_use]
    pub fn localizer(&self) -> &Mutex<Localizer> {
        &self.localizer
    }

    #[must_use]
    pub fn coordinator(&self) -> &NavigationCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }
}
