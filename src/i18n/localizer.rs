//! Translation store and DOM sync engine wired together.

use crate::config::RuntimeSettings;
use crate::dom::{
    Dom,
    NodeId,
    ReadyState,
    Selector,
};
use crate::fetch::Fetcher;
use crate::i18n::store::{
    CatalogSource,
    TranslationStore,
};
use crate::i18n::sync::{
    DomSyncEngine,
    RenderStats,
};
use crate::storage::Storage;

/// Public face of the localization runtime.
#[derive(Debug)]
pub struct Localizer {
    /// Catalog and language state
    store: TranslationStore,
    /// Document synchronisation
    engine: DomSyncEngine,
}

impl Localizer {
    #[must_use]
    pub fn new(settings: &RuntimeSettings, storage: Box<dyn Storage>) -> Self {
        Self {
            store: TranslationStore::new(settings, storage),
            engine: DomSyncEngine::new(settings.markers.clone()),
        }
    }

    /// Initializes localization once.
    ///
    /// Waits until the document is fully loaded, restores the language
    /// preference (or `default_language`), loads the catalog, renders every
    /// tagged element, binds the switcher and starts observing mutations.
    /// A catalog failure leaves an empty catalog behind and is not an error.
    pub async fn init<D: Dom, F: Fetcher>(
        &mut self,
        dom: &mut D,
        fetcher: &F,
        default_language: &str,
    ) {
        if self.store.is_initialized() {
            return;
        }

        let mut ready = dom.ready_signal();
        if ready.wait_for(|state| *state == ReadyState::Complete).await.is_err() {
            tracing::warn!("Document readiness is no longer tracked, continuing");
        }

        let source = self.prepare(fetcher, default_language).await;
        self.attach(dom);
        tracing::info!(
            language = %self.store.current_language(),
            source = ?source,
            "Localization initialized"
        );
    }

    /// Restores the language and loads the catalog. Does not touch the document.
    pub async fn prepare<F: Fetcher>(
        &mut self,
        fetcher: &F,
        default_language: &str,
    ) -> Option<CatalogSource> {
        self.store.restore_language(default_language);
        self.store.load(fetcher).await.ok()
    }

    /// Renders the document, binds the switcher and starts observing.
    ///
    /// Marks the localizer initialized; later calls are no-ops.
    pub fn attach<D: Dom>(&mut self, dom: &mut D) {
        if self.store.is_initialized() {
            return;
        }
        self.engine.render_pass(&self.store, dom);
        self.engine.bind_switcher(&self.store, dom);
        self.engine.start_observer(dom);
        self.store.mark_initialized();
    }

    /// Switches the language and re-renders.
    ///
    /// Returns `false`, with no storage write and no document mutation, when
    /// `code` is already active.
    pub fn set_language<D: Dom>(&mut self, dom: &mut D, code: &str) -> bool {
        if !self.store.set_language(code) {
            return false;
        }

        let keys: Vec<String> = self.store.parameter_keys().map(str::to_string).collect();
        for key in &keys {
            self.engine.queue_key(dom, key);
        }
        self.engine.render_pass(&self.store, dom);
        self.engine.sync_switcher(&self.store, dom);
        tracing::info!(language = %code, "Language switched");
        true
    }

    /// Applies the language selected on the switcher control.
    pub fn switcher_changed<D: Dom>(&mut self, dom: &mut D) -> bool {
        let Some(code) = self
            .engine
            .switcher()
            .and_then(|switcher| dom.value(switcher))
            .map(str::to_string)
        else {
            return false;
        };
        self.set_language(dom, &code)
    }

    /// Binds runtime parameters to `key` and re-renders the elements using it.
    pub fn set_parameters<D: Dom>(&mut self, dom: &mut D, key: &str, params: Vec<String>) {
        self.store.set_parameters(key, params);
        self.rerender_key(dom, key);
    }

    /// Drops the runtime parameters of `key` and re-renders the elements using it.
    pub fn clear_parameters<D: Dom>(&mut self, dom: &mut D, key: &str) {
        self.store.clear_parameters(key);
        self.rerender_key(dom, key);
    }

    /// Queues the elements tagged with `key` and renders them unless a pass is
    /// already running.
    fn rerender_key<D: Dom>(&mut self, dom: &mut D, key: &str) {
        self.engine.queue_key(dom, key);
        if !self.engine.is_update_in_progress() {
            self.engine.render_pass(&self.store, dom);
        }
    }

    /// Tags `node` with `key` (unless already tagged), binds `params` to the key
    /// and renders `key` into the element right away.
    ///
    /// An element tagged with another key keeps its tag, so later render passes
    /// show its own key again. Returns `false` when rendering failed; the
    /// element is then marked.
    pub fn apply_parameters<D: Dom>(
        &mut self,
        dom: &mut D,
        node: NodeId,
        key: &str,
        params: Vec<String>,
    ) -> bool {
        let key_attribute = self.engine.markers().key_attribute.clone();
        if dom.attribute(node, &key_attribute).is_none_or(str::is_empty) {
            dom.set_attribute(node, &key_attribute, key);
        }
        self.store.set_parameters(key, params);
        self.engine.render_key(&self.store, dom, node, key)
    }

    /// Tags every element matching `selector` with `key`, derives the key's
    /// parameters from each element and renders them.
    ///
    /// When several elements match, the parameters of the last one stay bound.
    /// Returns the number of matched elements.
    pub fn bind_dynamic_element<D, G>(
        &mut self,
        dom: &mut D,
        selector: &Selector,
        key: &str,
        mut param_generator: G,
    ) -> usize
    where
        D: Dom,
        G: FnMut(&D, NodeId) -> Vec<String>,
    {
        let key_attribute = self.engine.markers().key_attribute.clone();
        let nodes = dom.select(selector);
        for &node in &nodes {
            dom.set_attribute(node, &key_attribute, key);
            let params = param_generator(dom, node);
            self.store.set_parameters(key, params);
            self.engine.queue(node);
        }
        self.engine.render_pass(&self.store, dom);
        nodes.len()
    }

    /// Reloads the catalog and re-renders.
    pub async fn reload<D: Dom, F: Fetcher>(&mut self, dom: &mut D, fetcher: &F) -> bool {
        let loaded = self.store.reload(fetcher).await.is_ok();
        self.engine.render_pass(&self.store, dom);
        loaded
    }

    /// Renders tagged elements that appeared since the last call.
    pub fn process_mutations<D: Dom>(&mut self, dom: &mut D) -> bool {
        self.engine.process_mutations(&self.store, dom)
    }

    /// Re-binds the language switcher, e.g. after a navigation swap.
    pub fn bind_switcher<D: Dom>(&mut self, dom: &mut D) -> bool {
        self.engine.bind_switcher(&self.store, dom)
    }

    /// Runs a render pass over the whole document.
    pub fn render<D: Dom>(&mut self, dom: &mut D) -> bool {
        self.engine.render_pass(&self.store, dom)
    }

    #[must_use]
    pub fn translate<P: AsRef<str>>(&self, key: &str, params: &[P]) -> String {
        self.store.translate(key, params)
    }

    pub fn cached_translate<P: AsRef<str>>(&mut self, key: &str, params: &[P]) -> String {
        self.store.cached_translate(key, params)
    }

    #[must_use]
    pub fn current_language(&self) -> &str {
        self.store.current_language()
    }

    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        self.store.languages()
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.engine.stats()
    }

    #[must_use]
    pub const fn store(&self) -> &TranslationStore {
        &self.store
    }

    #[must_use]
    pub const fn engine(&self) -> &DomSyncEngine {
        &self.engine
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::dom::{
        Document,
        NodeSpec,
        mutation_channel,
    };
    use crate::i18n::store::NO_PARAMS;
    use crate::storage::MemoryStorage;
    use crate::test_utils::{
        FakeFetcher,
        tagged,
    };

    fn localizer(storage: &MemoryStorage) -> Localizer {
        Localizer::new(&RuntimeSettings::default(), Box::new(storage.clone()))
    }

    fn attach(doc: &mut Document, spec: &NodeSpec) -> NodeId {
        let node = doc.instantiate(spec);
        let body = doc.body();
        doc.append_child(body, node);
        node
    }

    fn ready_document() -> Document {
        let doc = Document::new("/");
        doc.mark_complete();
        doc
    }

    #[tokio::test]
    async fn init_renders_and_binds_switcher() {
        let mut doc = ready_document();
        let title = attach(&mut doc, &tagged("h1", "page_title"));
        let switcher = attach(&mut doc, &NodeSpec::element("select").attr("id", "lang-switcher"));
        let mut localizer = localizer(&MemoryStorage::new());

        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "fr").await;

        assert_that!(localizer.is_initialized(), eq(true));
        assert_that!(localizer.current_language(), eq("fr"));
        assert_that!(doc.inner_markup(title), some(eq("Bienvenue")));
        assert_that!(doc.value(switcher), some(eq("fr")));
        assert_that!(doc.listeners(switcher), len(eq(1)));
        assert_that!(doc.observer_count(), eq(1));
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let mut doc = ready_document();
        let fetcher = FakeFetcher::with_catalog();
        let mut localizer = localizer(&MemoryStorage::new());

        localizer.init(&mut doc, &fetcher, "en").await;
        localizer.init(&mut doc, &fetcher, "en").await;

        assert_that!(fetcher.request_count("/cfg/lang_cfg.json"), eq(1));
        assert_that!(doc.observer_count(), eq(1));
        assert_that!(localizer.stats().passes, eq(1));
    }

    #[tokio::test(start_paused = true)]
    async fn init_waits_for_document_ready() {
        let mut doc = Document::new("/");
        let trigger = doc.ready_trigger();
        let mut localizer = localizer(&MemoryStorage::new());

        let completer = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.complete();
        };
        let init = async {
            localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;
            tokio::time::Instant::now()
        };
        let started = tokio::time::Instant::now();
        let ((), finished) = tokio::join!(completer, init);

        assert!(finished - started >= Duration::from_millis(50));
        assert_that!(localizer.is_initialized(), eq(true));
    }

    #[tokio::test]
    async fn init_survives_catalog_failure() {
        let mut doc = ready_document();
        let node = attach(&mut doc, &tagged("p", "any_key"));
        let mut localizer = localizer(&MemoryStorage::new());

        localizer.init(&mut doc, &FakeFetcher::new(), "en").await;

        assert_that!(localizer.is_initialized(), eq(true));
        assert_that!(localizer.translate("any_key", NO_PARAMS), eq("any_key"));
        assert_that!(doc.inner_markup(node), some(eq("any_key")));
    }

    #[tokio::test]
    async fn init_restores_persisted_language() {
        let mut storage = MemoryStorage::new();
        storage.set_item("user_lang", "fr").unwrap();
        let mut doc = ready_document();
        let mut localizer = localizer(&storage);

        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        assert_that!(localizer.current_language(), eq("fr"));
    }

    #[tokio::test]
    async fn set_same_language_is_silent() {
        let storage = MemoryStorage::new();
        let mut doc = ready_document();
        attach(&mut doc, &tagged("h1", "page_title"));
        let mut localizer = localizer(&storage);
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;
        let writes = storage.write_count();
        let (tx, mut rx) = mutation_channel();
        doc.observe(tx);

        assert_that!(localizer.set_language(&mut doc, "en"), eq(false));

        assert_that!(storage.write_count(), eq(writes));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn set_language_rerenders_and_syncs_switcher() {
        let storage = MemoryStorage::new();
        let mut doc = ready_document();
        let title = attach(&mut doc, &tagged("h1", "page_title"));
        let switcher = attach(&mut doc, &NodeSpec::element("select").attr("id", "lang-switcher"));
        let mut localizer = localizer(&storage);
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        assert_that!(localizer.set_language(&mut doc, "fr"), eq(true));

        assert_that!(doc.inner_markup(title), some(eq("Bienvenue")));
        assert_that!(doc.value(switcher), some(eq("fr")));
        assert_that!(storage.get_item("user_lang"), some(eq("fr")));
    }

    #[tokio::test]
    async fn switcher_change_switches_language() {
        let mut doc = ready_document();
        let title = attach(&mut doc, &tagged("h1", "page_title"));
        let switcher = attach(&mut doc, &NodeSpec::element("select").attr("id", "lang-switcher"));
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        doc.set_value(switcher, "fr");

        assert_that!(localizer.switcher_changed(&mut doc), eq(true));
        assert_that!(doc.inner_markup(title), some(eq("Bienvenue")));
    }

    #[tokio::test]
    async fn set_and_clear_parameters_rerender_elements() {
        let mut doc = ready_document();
        let node = attach(&mut doc, &tagged("span", "countdown"));
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        localizer.set_parameters(&mut doc, "countdown", vec!["59".to_string(), "30".to_string()]);
        assert_that!(doc.inner_markup(node), some(eq("Refresh in 59:30")));

        localizer.clear_parameters(&mut doc, "countdown");
        assert_that!(doc.inner_markup(node), some(eq("Refresh in {0}:{1}")));
    }

    #[tokio::test]
    async fn apply_parameters_tags_and_renders() {
        let mut doc = ready_document();
        let node = attach(&mut doc, &NodeSpec::element("span").attr("id", "refresh-timer"));
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        let applied =
            localizer.apply_parameters(&mut doc, node, "countdown", vec!["1".into(), "05".into()]);

        assert_that!(applied, eq(true));
        assert_that!(doc.attribute(node, "data-lang-id"), some(eq("countdown")));
        assert_that!(doc.inner_markup(node), some(eq("Refresh in 1:05")));
    }

    #[tokio::test]
    async fn apply_parameters_reports_failure() {
        let mut doc = ready_document();
        let node = attach(&mut doc, &tagged("span", "countdown").attr("data-lang-params", "{"));
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        let applied = localizer.apply_parameters(&mut doc, node, "countdown", vec!["1".into()]);

        assert_that!(applied, eq(false));
        assert_that!(doc.has_class(node, "lang-error"), eq(true));
    }

    #[tokio::test]
    async fn apply_parameters_renders_requested_key_on_tagged_element() {
        let mut doc = ready_document();
        let node = attach(&mut doc, &tagged("span", "page_title"));
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        let applied =
            localizer.apply_parameters(&mut doc, node, "countdown", vec!["2".into(), "30".into()]);

        assert_that!(applied, eq(true));
        assert_that!(doc.attribute(node, "data-lang-id"), some(eq("page_title")));
        assert_that!(doc.inner_markup(node), some(eq("Refresh in 2:30")));
    }

    #[tokio::test]
    async fn bind_dynamic_element_tags_matches() {
        let mut doc = ready_document();
        let timer = attach(&mut doc, &NodeSpec::element("span").attr("class", "timer").attr("data-left", "42"));
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        let bound = localizer.bind_dynamic_element(
            &mut doc,
            &Selector::Class("timer".to_string()),
            "countdown",
            |dom, node| vec![dom.attribute(node, "data-left").unwrap_or_default().to_string(), "00".to_string()],
        );

        assert_that!(bound, eq(1));
        assert_that!(doc.inner_markup(timer), some(eq("Refresh in 42:00")));
    }

    #[tokio::test]
    async fn process_mutations_translates_swapped_content() {
        let mut doc = ready_document();
        let mut localizer = localizer(&MemoryStorage::new());
        localizer.init(&mut doc, &FakeFetcher::with_catalog(), "en").await;

        let node = attach(&mut doc, &tagged("p", "tab_article"));

        assert_that!(localizer.process_mutations(&mut doc), eq(true));
        assert_that!(doc.inner_markup(node), some(eq("Articles")));
    }

    #[tokio::test]
    async fn reload_refetches_outdated_catalog() {
        let storage = MemoryStorage::new();
        let mut doc = ready_document();
        let node = attach(&mut doc, &tagged("p", "greet"));
        let fetcher = FakeFetcher::new().with_body("/cfg/lang_cfg.json", r#"[{"id": "greet", "en": "Hey"}]"#);
        let mut localizer = Localizer::new(&RuntimeSettings::default(), Box::new(storage.clone()));
        localizer.init(&mut doc, &fetcher, "en").await;
        assert_that!(localizer.cached_translate("greet", NO_PARAMS), eq("Hey"));

        let mut settings = RuntimeSettings::default();
        settings.catalog.version = "3.2".to_string();
        let mut reloaded = Localizer::new(&settings, Box::new(storage));
        let updated = FakeFetcher::new().with_body("/cfg/lang_cfg.json", r#"[{"id": "greet", "en": "Hello"}]"#);

        assert_that!(reloaded.reload(&mut doc, &updated).await, eq(true));
        assert_that!(reloaded.cached_translate("greet", NO_PARAMS), eq("Hello"));
        assert_that!(doc.inner_markup(node), some(eq("Hello")));
        assert_that!(updated.requests(), elements_are![eq("/cfg/lang_cfg.json?v=3.2")]);
    }

    #[rstest]
    fn switcher_changed_without_binding() {
        let mut doc = ready_document();
        let mut localizer = localizer(&MemoryStorage::new());

        assert_that!(localizer.switcher_changed(&mut doc), eq(false));
    }
}
