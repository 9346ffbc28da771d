//! Event listener registry types.

/// Identifies one bound listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// What a bound listener does when an event reaches its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// `change` on the language switcher control.
    LanguageSwitcher,
    /// `click` on in-app links, bound on the document root.
    LinkInterceptor,
    /// `click` on a tab inside the tab list.
    TabList,
}
