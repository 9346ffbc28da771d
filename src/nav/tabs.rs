//! Tab list rendering and selection.

use crate::config::{
    MarkerConfig,
    NavigationConfig,
};
use crate::dom::{
    Document,
    Listener,
    ListenerId,
    NodeId,
    NodeSpec,
};
use crate::types::{
    Route,
    normalize_path,
};

/// Result of a click inside the tab list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabClick {
    /// Not on a tab.
    Ignored,
    /// The tab of the current location; the default action is prevented and
    /// nothing else happens.
    AlreadyCurrent,
    /// Navigate to this path.
    Navigate(String),
}

/// The navigational tab list.
///
/// Labels are translation keys, so tabs follow language switches through the
/// regular render passes.
#[derive(Debug)]
pub struct TabSelectionState {
    /// Tabs in display order
    routes: Vec<Route>,
    /// `role` of the tab list container
    tab_list_role: String,
    /// Attribute carrying the label's translation key
    key_attribute: String,
    /// Rendered tab list container
    tab_list: Option<NodeId>,
    /// Click listener bound on the container
    listener: Option<ListenerId>,
}

impl TabSelectionState {
    #[must_use]
    pub fn new(routes: Vec<Route>, navigation: &NavigationConfig, markers: &MarkerConfig) -> Self {
        Self {
            routes,
            tab_list_role: navigation.tab_list_role.clone(),
            key_attribute: markers.key_attribute.clone(),
            tab_list: None,
            listener: None,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Rebuilds the tab list and binds its click listener.
    ///
    /// Every tab is `li[role=tab][data-url]` wrapping `a[href][key attribute]`.
    /// Returns `false` when the document has no tab list.
    pub fn render(&mut self, doc: &mut Document) -> bool {
        let Some(container) = self.find_container(doc) else {
            tracing::warn!(role = %self.tab_list_role, "Tab list not found");
            return false;
        };

        let items = self
            .routes
            .iter()
            .map(|route| {
                let spec = NodeSpec::element("li")
                    .attr("role", "tab")
                    .attr("data-url", &route.path)
                    .attr("aria-selected", "false")
                    .child(
                        NodeSpec::element("a")
                            .attr("href", &route.path)
                            .attr(&self.key_attribute, &route.key),
                    );
                doc.instantiate(&spec)
            })
            .collect();
        doc.replace_children(container, items);

        if let Some((node, id)) = self.tab_list.zip(self.listener.take()) {
            doc.remove_listener(node, id);
        }
        for (id, listener) in doc.listeners(container) {
            if listener == Listener::TabList {
                doc.remove_listener(container, id);
            }
        }
        self.listener = doc.add_listener(container, Listener::TabList);
        self.tab_list = Some(container);

        tracing::debug!(tabs = self.routes.len(), "Tab list rendered");
        true
    }

    /// Selects the first tab whose path matches `url`; every other tab is
    /// deselected. Returns the selected tab.
    pub fn update_selected(&self, doc: &mut Document, url: &str) -> Option<NodeId> {
        let target = normalize_path(url);
        let mut selected = None;

        for tab in self.tabs(doc) {
            let matches = selected.is_none()
                && doc.attribute(tab, "data-url").is_some_and(|path| normalize_path(path) == target);
            if matches {
                selected = Some(tab);
            }

            let value = if matches { "true" } else { "false" };
            if doc.attribute(tab, "aria-selected") != Some(value) {
                doc.set_attribute(tab, "aria-selected", value);
            }
            if matches {
                doc.add_class(tab, "active");
            } else if doc.has_class(tab, "active") {
                doc.remove_class(tab, "active");
            }
        }
        selected
    }

    /// Interprets a click on `target` given the current location.
    #[must_use]
    pub fn handle_click(&self, doc: &Document, target: NodeId, current_url: &str) -> TabClick {
        let Some(tab_list) = self.tab_list else {
            return TabClick::Ignored;
        };

        let chain = doc.ancestors(target);
        if !chain.contains(&tab_list) {
            return TabClick::Ignored;
        }
        let Some(url) = chain
            .iter()
            .take_while(|&&node| node != tab_list)
            .find(|&&node| doc.attribute(node, "role") == Some("tab"))
            .and_then(|&tab| doc.attribute(tab, "data-url"))
        else {
            return TabClick::Ignored;
        };

        if normalize_path(url) == normalize_path(current_url) {
            TabClick::AlreadyCurrent
        } else {
            TabClick::Navigate(url.to_string())
        }
    }

    /// Path of the selected tab.
    #[must_use]
    pub fn selected_tab(&self, doc: &Document) -> Option<String> {
        self.tabs(doc)
            .into_iter()
            .find(|&tab| doc.attribute(tab, "aria-selected") == Some("true"))
            .and_then(|tab| doc.attribute(tab, "data-url"))
            .map(str::to_string)
    }

    /// Paths of every tab other than `current_url`, for preloading.
    #[must_use]
    pub fn preload_targets(&self, current_url: &str) -> Vec<String> {
        let current = normalize_path(current_url);
        self.routes
            .iter()
            .filter(|route| normalize_path(&route.path) != current)
            .map(|route| route.path.clone())
            .collect()
    }

    /// Tab elements in display order.
    #[must_use]
    pub fn tabs(&self, doc: &Document) -> Vec<NodeId> {
        let Some(container) = self.tab_list.or_else(|| self.find_container(doc)) else {
            return Vec::new();
        };
        doc.children(container)
            .iter()
            .copied()
            .filter(|&child| doc.attribute(child, "role") == Some("tab"))
            .collect()
    }

    /// First attached element with the tab list role.
    fn find_container(&self, doc: &Document) -> Option<NodeId> {
        doc.find_by_attribute("role", &self.tab_list_role)
    }
}
