//! Keeps tagged elements in sync with the translation store.
//!
//! A render pass rewrites every element carrying the key attribute. Mutations
//! observed while a pass is running are collected into a pending set and
//! rendered by a single follow-up pass, so a burst of insertions during a pass
//! never cascades into one pass per insertion.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::config::MarkerConfig;
use crate::dom::{
    Dom,
    Listener,
    ListenerId,
    MutationReceiver,
    MutationRecord,
    NodeId,
    mutation_channel,
};
use crate::i18n::error::RenderError;
use crate::i18n::format::newlines_to_br;
use crate::i18n::store::TranslationStore;

/// Upper bound of consecutive passes triggered by one `render_pass` call.
const MAX_CONSECUTIVE_PASSES: usize = 8;

/// Prefix of the tooltip set on elements whose translation failed.
const ERROR_TITLE_PREFIX: &str = "Translation error:";

/// Where the translated string of an element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// `input` / `textarea`: the value property, parameters inserted verbatim
    ValueProperty,
    /// Everything else: rendered content, parameters escaped and newlines
    /// converted to line breaks
    MarkupContent,
}

impl RenderTarget {
    #[must_use]
    pub fn for_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea") {
            Self::ValueProperty
        } else {
            Self::MarkupContent
        }
    }

    /// Final string for `key` as written to this target.
    fn render(self, store: &TranslationStore, key: &str, params: &[String]) -> String {
        match self {
            Self::ValueProperty => store.translate(key, params),
            Self::MarkupContent => newlines_to_br(&store.translate_markup(key, params)),
        }
    }

    /// Writes `text` unless the element already shows it.
    fn write<D: Dom>(self, dom: &mut D, node: NodeId, text: &str) {
        match self {
            Self::ValueProperty => {
                if dom.value(node) != Some(text) {
                    dom.set_value(node, text);
                }
            }
            Self::MarkupContent => {
                if dom.inner_markup(node) != Some(text) {
                    dom.set_inner_markup(node, text);
                }
            }
        }
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Completed render passes, follow-up passes included
    pub passes: usize,
    /// Element renders, failed ones included
    pub elements_rendered: usize,
    /// Element renders that fell back to the raw key
    pub errors: usize,
}

/// Propagates translation state to the document.
#[derive(Debug)]
pub struct DomSyncEngine {
    /// Attribute names and switcher id
    markers: MarkerConfig,
    /// Set while a pass is writing to the document
    update_in_progress: bool,
    /// Elements to render on the next pass
    pending: BTreeSet<NodeId>,
    /// Mutation feed, present once the observer is started
    observer: Option<MutationReceiver>,
    /// Currently bound language switcher listener
    switcher: Option<(NodeId, ListenerId)>,
    /// Diagnostics counters
    stats: RenderStats,
}

impl DomSyncEngine {
    #[must_use]
    pub fn new(markers: MarkerConfig) -> Self {
        Self {
            markers,
            update_in_progress: false,
            pending: BTreeSet::new(),
            observer: None,
            switcher: None,
            stats: RenderStats::default(),
        }
    }

    #[must_use]
    pub const fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    #[must_use]
    pub const fn is_update_in_progress(&self) -> bool {
        self.update_in_progress
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub const fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    /// Starts observing document mutations. Subsequent calls are no-ops.
    pub fn start_observer<D: Dom>(&mut self, dom: &mut D) {
        if self.observer.is_some() {
            return;
        }
        let (tx, rx) = mutation_channel();
        dom.observe(tx);
        self.observer = Some(rx);
    }

    /// Marks `node` for the next pass.
    pub fn queue(&mut self, node: NodeId) {
        self.pending.insert(node);
    }

    /// Marks every element tagged with `key` for the next pass.
    pub fn queue_key<D: Dom>(&mut self, dom: &D, key: &str) {
        self.pending.extend(dom.query_attribute_value(&self.markers.key_attribute, key));
    }

    /// Renders pending and tagged elements.
    ///
    /// Returns `false` when a pass is already in progress. Elements that show up
    /// during the pass are rendered by one follow-up pass; further passes only
    /// run while each follow-up itself produced new work.
    pub fn render_pass<D: Dom>(&mut self, store: &TranslationStore, dom: &mut D) -> bool {
        if self.update_in_progress {
            return false;
        }

        let mut passes = 0;
        loop {
            self.run_pass(store, dom);
            passes += 1;

            if self.pending.is_empty() {
                break;
            }
            if passes >= MAX_CONSECUTIVE_PASSES {
                tracing::warn!(
                    passes,
                    pending = self.pending.len(),
                    "Render passes keep producing work, deferring the rest"
                );
                break;
            }
            tracing::debug!(pending = self.pending.len(), "Running follow-up render pass");
        }
        true
    }

    /// One pass: pending elements, then a full re-query.
    fn run_pass<D: Dom>(&mut self, store: &TranslationStore, dom: &mut D) {
        self.update_in_progress = true;

        let mut rendered = BTreeSet::new();
        for node in std::mem::take(&mut self.pending) {
            if dom.is_attached(node) && rendered.insert(node) {
                self.render_element(store, dom, node);
            }
        }
        for node in dom.query_attribute(&self.markers.key_attribute) {
            if rendered.insert(node) {
                self.render_element(store, dom, node);
            }
        }

        let arrived = self.drain_observer(dom);
        self.pending.extend(arrived);

        self.stats.passes += 1;
        self.update_in_progress = false;
    }

    /// Renders one tagged element.
    ///
    /// Failures never propagate: the element gets the error class and tooltip
    /// and shows its raw key. Returns whether the render succeeded.
    pub fn render_element<D: Dom>(
        &mut self,
        store: &TranslationStore,
        dom: &mut D,
        node: NodeId,
    ) -> bool {
        let Some(key) = dom.attribute(node, &self.markers.key_attribute).map(str::to_string) else {
            return false;
        };
        self.render_key(store, dom, node, &key)
    }

    /// Renders `key` into `node`, whatever key the element is tagged with.
    pub fn render_key<D: Dom>(
        &mut self,
        store: &TranslationStore,
        dom: &mut D,
        node: NodeId,
        key: &str,
    ) -> bool {
        if key.is_empty() {
            return false;
        }

        let target = RenderTarget::for_tag(dom.tag(node).unwrap_or_default());
        let params = element_parameters(dom.attribute(node, &self.markers.params_attribute))
            .map(|local| store.parameters(key).iter().cloned().chain(local).collect::<Vec<_>>());

        self.stats.elements_rendered += 1;
        match params {
            Ok(params) => {
                let text = target.render(store, key, &params);
                target.write(dom, node, &text);
                self.clear_error(dom, node);
                true
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Translation failed");
                self.stats.errors += 1;
                self.mark_error(dom, node, key);
                target.write(dom, node, key);
                false
            }
        }
    }

    /// Adds the error class and diagnostic tooltip.
    fn mark_error<D: Dom>(&self, dom: &mut D, node: NodeId, key: &str) {
        if !dom.has_class(node, &self.markers.error_class) {
            dom.add_class(node, &self.markers.error_class);
        }
        let title = format!("{ERROR_TITLE_PREFIX} {key}");
        if dom.attribute(node, "title") != Some(title.as_str()) {
            dom.set_attribute(node, "title", &title);
        }
    }

    /// Removes a marker left by an earlier failed render.
    fn clear_error<D: Dom>(&self, dom: &mut D, node: NodeId) {
        if dom.has_class(node, &self.markers.error_class) {
            dom.remove_class(node, &self.markers.error_class);
        }
        if dom.attribute(node, "title").is_some_and(|title| title.starts_with(ERROR_TITLE_PREFIX)) {
            dom.remove_attribute(node, "title");
        }
    }

    /// Handles mutations observed since the last call.
    ///
    /// Relevant changes (tagged insertions or key attribute changes) trigger a
    /// render pass and a switcher rebind. Returns whether that happened.
    pub fn process_mutations<D: Dom>(&mut self, store: &TranslationStore, dom: &mut D) -> bool {
        let relevant = self.drain_observer(dom);
        if relevant.is_empty() {
            return false;
        }

        tracing::debug!(elements = relevant.len(), "Observed tagged elements");
        self.pending.extend(relevant);
        self.render_pass(store, dom);
        self.bind_switcher(store, dom);
        true
    }

    /// Tagged elements affected by the records queued on the observer.
    fn drain_observer<D: Dom>(&mut self, dom: &D) -> BTreeSet<NodeId> {
        let mut nodes = BTreeSet::new();
        let Some(observer) = self.observer.as_mut() else {
            return nodes;
        };

        let key_attribute = self.markers.key_attribute.as_str();
        while let Ok(record) = observer.try_recv() {
            match record {
                MutationRecord::ChildList { added, .. } => {
                    for node in added {
                        if dom.attribute(node, key_attribute).is_some() {
                            nodes.insert(node);
                        }
                        nodes.extend(dom.descendants_with_attribute(node, key_attribute));
                    }
                }
                MutationRecord::Attribute { target, name } if name == key_attribute => {
                    nodes.insert(target);
                }
                MutationRecord::Attribute { .. } => {}
            }
        }
        nodes
    }

    /// Binds the language switcher listener.
    ///
    /// The previous binding is removed first, so at most one listener exists
    /// however often this runs. The switcher's value follows the active language.
    /// Returns `false` when the document has no switcher.
    pub fn bind_switcher<D: Dom>(&mut self, store: &TranslationStore, dom: &mut D) -> bool {
        if let Some((node, id)) = self.switcher.take() {
            dom.remove_listener(node, id);
        }

        let Some(switcher) = dom.get_element_by_id(&self.markers.switcher_id) else {
            return false;
        };

        for (id, listener) in dom.listeners(switcher) {
            if listener == Listener::LanguageSwitcher {
                dom.remove_listener(switcher, id);
            }
        }

        self.sync_switcher(store, dom);
        self.switcher = dom.add_listener(switcher, Listener::LanguageSwitcher).map(|id| (switcher, id));
        self.switcher.is_some()
    }

    /// Sets the switcher's value to the active language.
    pub fn sync_switcher<D: Dom>(&self, store: &TranslationStore, dom: &mut D) {
        let Some(switcher) = dom.get_element_by_id(&self.markers.switcher_id) else {
            return;
        };
        let language = store.current_language();
        if dom.value(switcher) != Some(language) {
            dom.set_value(switcher, language);
        }
    }

    /// Node currently carrying the switcher listener.
    #[must_use]
    pub fn switcher(&self) -> Option<NodeId> {
        self.switcher.map(|(node, _)| node)
    }
}

/// Parses the element-local parameter attribute.
///
/// A missing or blank attribute means no parameters. Strings are used as-is,
/// numbers and booleans are stringified, anything else is rejected.
pub fn element_parameters(raw: Option<&str>) -> Result<Vec<String>, RenderError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let Value::Array(items) = serde_json::from_str(raw)? else {
        return Err(RenderError::ParametersNotAList);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(text) => Ok(text),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            other => Err(RenderError::UnsupportedParameter { index, value: other.to_string() }),
        })
        .collect()
}
