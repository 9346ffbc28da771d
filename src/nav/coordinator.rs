//! Page loading and content swapping.
//!
//! A navigation fetches the target page as a [`PageFragment`] and replaces the
//! document title and the content container. Each request takes the next
//! sequence number; only the most recently requested navigation is allowed to
//! swap, so out-of-order completions never leave stale content behind.

use std::collections::HashMap;
use std::sync::PoisonError;

use tokio::sync::{
    Mutex,
    broadcast,
};

use crate::config::NavigationConfig;
use crate::dom::{
    Document,
    Listener,
    ListenerId,
    NodeId,
};
use crate::fetch::Fetcher;
use crate::input::page::PageFragment;
use crate::nav::error::NavigationError;
use crate::types::normalize_path;

/// Buffered lifecycle events per subscriber.
const EVENT_CAPACITY: usize = 64;

/// Lifecycle notifications for consumers such as a loading indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Sent before the page is fetched.
    Start { url: String },
    /// Sent after the content was swapped.
    Complete { url: String },
    /// Sent when the most recent navigation failed; the content is unchanged.
    Failed { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPhase {
    #[default]
    Idle,
    Loading,
}

/// How a `load_url` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The content was swapped.
    Completed,
    /// The URL is the current location; nothing was fetched.
    AlreadyCurrent,
    /// A newer navigation was requested meanwhile; the page was discarded.
    Superseded,
}

/// Mutable coordinator state. Never held across an await point.
#[derive(Debug, Default)]
struct NavigationState {
    /// Sequence number of the most recent request
    latest: u64,
    /// Requests that have not finished yet
    in_flight: usize,
    /// Bound link interceptor
    interceptor: Option<(NodeId, ListenerId)>,
    /// Normalized URL → prefetched page body, consumed by the next navigation
    prefetched: HashMap<String, String>,
}

/// Coordinates in-app page transitions.
#[derive(Debug)]
pub struct NavigationCoordinator {
    /// `id` of the container whose children are replaced
    container_id: String,
    /// Shared state
    state: std::sync::Mutex<NavigationState>,
    /// Lifecycle event publisher
    events: broadcast::Sender<NavigationEvent>,
}

impl NavigationCoordinator {
    #[must_use]
    pub fn new(config: &NavigationConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            container_id: config.content_container_id.clone(),
            state: std::sync::Mutex::new(NavigationState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        if self.state().in_flight > 0 { NavigationPhase::Loading } else { NavigationPhase::Idle }
    }

    /// Binds link interception on the document root.
    ///
    /// Returns `false` when an interceptor is already bound.
    pub fn setup(&self, doc: &mut Document) -> bool {
        let root = doc.root();
        let bound = doc.listeners(root).iter().any(|(_, listener)| *listener == Listener::LinkInterceptor);
        if bound {
            return false;
        }

        let id = doc.add_listener(root, Listener::LinkInterceptor);
        self.state().interceptor = id.map(|id| (root, id));
        tracing::debug!("Link interception bound");
        id.is_some()
    }

    /// In-app destination of a click on `target`, if the click should be
    /// turned into a navigation.
    ///
    /// The nearest `a[href]` ancestor decides. Links opening a new window,
    /// downloads, links marked `data-no-swap`, external or protocol-relative
    /// URLs, other schemes and fragment-only links are left to the browser.
    #[must_use]
    pub fn intercept_click(&self, doc: &Document, target: NodeId) -> Option<String> {
        let anchor = doc
            .ancestors(target)
            .into_iter()
            .find(|&node| doc.tag(node) == Some("a") && doc.attribute(node, "href").is_some())?;

        let new_window =
            doc.attribute(anchor, "target").is_some_and(|t| t.eq_ignore_ascii_case("_blank"));
        if new_window
            || doc.attribute(anchor, "download").is_some()
            || doc.attribute(anchor, "data-no-swap").is_some()
        {
            return None;
        }

        in_app_target(doc.location(), doc.attribute(anchor, "href")?)
    }

    /// Fetches `url` ahead of time; the next navigation to it skips the network.
    pub async fn prefetch<F: Fetcher>(&self, fetcher: &F, url: &str) -> Result<(), NavigationError> {
        let target = normalize_path(url);
        let text = fetcher.fetch_text(&target).await?;
        self.state().prefetched.insert(target, text);
        Ok(())
    }

    /// Navigates to `url`.
    ///
    /// A URL equal to the current location (after normalization) fetches
    /// nothing and publishes no event, but still supersedes pending requests so
    /// that the user stays where they asked to be. Otherwise `Start` is published, the page is
    /// fetched and parsed, and the content swapped; errors leave the document
    /// untouched.
    pub async fn load_url<F: Fetcher>(
        &self,
        document: &Mutex<Document>,
        fetcher: &F,
        url: &str,
    ) -> Result<NavigationOutcome, NavigationError> {
        let target = normalize_path(url);
        if normalize_path(document.lock().await.location()) == target {
            self.supersede_pending();
            tracing::debug!(url = %target, "Already at requested location");
            return Ok(NavigationOutcome::AlreadyCurrent);
        }

        let seq = self.begin(&target);
        let result = self.fetch_and_swap(document, fetcher, &target, seq).await;
        self.finish(&target, seq, &result);
        result
    }

    /// Loads the initial content of `url` without publishing events.
    pub async fn hydrate<F: Fetcher>(
        &self,
        doc: &mut Document,
        fetcher: &F,
        url: &str,
    ) -> Result<(), NavigationError> {
        let target = normalize_path(url);
        let text = fetcher.fetch_text(&target).await?;
        let page = parse_page(&target, &text)?;
        self.apply_page(doc, &target, &page)
    }

    /// Replaces the title and the container children with `page` and moves
    /// the location to `url`.
    ///
    /// Fails without touching the document when the container is missing.
    pub fn apply_page(
        &self,
        doc: &mut Document,
        url: &str,
        page: &PageFragment,
    ) -> Result<(), NavigationError> {
        let container = doc
            .get_element_by_id(&self.container_id)
            .ok_or_else(|| NavigationError::MissingContainer(self.container_id.clone()))?;

        let children = page.main.iter().map(|spec| doc.instantiate(spec)).collect();
        doc.replace_children(container, children);
        doc.set_title(page.title.as_str());
        doc.set_location(url);
        Ok(())
    }

    /// Registers a new request and publishes `Start`.
    fn begin(&self, url: &str) -> u64 {
        let seq = {
            let mut state = self.state();
            state.latest += 1;
            state.in_flight += 1;
            state.latest
        };
        tracing::info!(url = %url, seq, "Navigation started");
        self.publish(NavigationEvent::Start { url: url.to_string() });
        seq
    }

    /// Invalidates every request still in flight without starting a new one.
    fn supersede_pending(&self) {
        let mut state = self.state();
        if state.in_flight > 0 {
            state.latest += 1;
            tracing::debug!(pending = state.in_flight, "Pending navigations superseded");
        }
    }

    /// Fetches, parses and swaps unless a newer request exists.
    async fn fetch_and_swap<F: Fetcher>(
        &self,
        document: &Mutex<Document>,
        fetcher: &F,
        url: &str,
        seq: u64,
    ) -> Result<NavigationOutcome, NavigationError> {
        let prefetched = self.state().prefetched.remove(url);
        let text = match prefetched {
            Some(text) => text,
            None => fetcher.fetch_text(url).await?,
        };
        let page = parse_page(url, &text)?;

        if !self.is_latest(seq) {
            return Ok(NavigationOutcome::Superseded);
        }
        let mut doc = document.lock().await;
        if !self.is_latest(seq) {
            return Ok(NavigationOutcome::Superseded);
        }

        self.apply_page(&mut doc, url, &page)?;
        Ok(NavigationOutcome::Completed)
    }

    /// Ends a request. Only the most recent request publishes its result.
    fn finish(&self, url: &str, seq: u64, result: &Result<NavigationOutcome, NavigationError>) {
        let latest = {
            let mut state = self.state();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.latest == seq
        };

        match result {
            Ok(NavigationOutcome::Completed) => {
                tracing::info!(url = %url, seq, "Navigation complete");
                self.publish(NavigationEvent::Complete { url: url.to_string() });
            }
            Ok(NavigationOutcome::Superseded | NavigationOutcome::AlreadyCurrent) => {
                tracing::debug!(url = %url, seq, "Discarding superseded navigation");
            }
            Err(e) if latest => {
                tracing::warn!(url = %url, seq, error = %e, "Navigation failed");
                self.publish(NavigationEvent::Failed { url: url.to_string(), reason: e.to_string() });
            }
            Err(e) => {
                tracing::debug!(url = %url, seq, error = %e, "Superseded navigation failed");
            }
        }
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.state().latest == seq
    }

    fn publish(&self, event: NavigationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NavigationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parses a fetched page body.
fn parse_page(url: &str, text: &str) -> Result<PageFragment, NavigationError> {
    PageFragment::from_json(text)
        .map_err(|source| NavigationError::Parse { url: url.to_string(), source })
}

/// Resolves `href` against the location `base`.
///
/// Returns `None` for links the browser should handle itself.
fn in_app_target(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("//") || has_scheme(href) {
        return None;
    }

    let joined = if href.starts_with('/') {
        href.to_string()
    } else if href.starts_with('?') {
        let base_path = base.split(['?', '#']).next().unwrap_or_default();
        format!("{base_path}{href}")
    } else {
        let base_path = base.split(['?', '#']).next().unwrap_or_default();
        let dir = base_path.rfind('/').and_then(|i| base_path.get(..=i)).unwrap_or("/");
        format!("{dir}{href}")
    };

    Some(normalize_path(&collapse_dot_segments(&joined)))
}

/// Whether `href` starts with a URL scheme (`https:`, `mailto:`, ...).
fn has_scheme(href: &str) -> bool {
    let end = href.find(['/', '?', '#']).unwrap_or(href.len());
    href.get(..end).is_some_and(|head| head.contains(':'))
}

/// Removes `.` and `..` segments from an absolute path.
fn collapse_dot_segments(path: &str) -> String {
    let (path, suffix) = path.find(['?', '#']).map_or((path, ""), |i| path.split_at(i));

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut collapsed = format!("/{}", segments.join("/"));
    if path.ends_with('/') && !segments.is_empty() {
        collapsed.push('/');
    }
    collapsed.push_str(suffix);
    collapsed
}
