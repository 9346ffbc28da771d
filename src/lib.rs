//! site-runtime
//!
//! Headless runtime for a small personal site: a translation store with
//! placeholder substitution, a DOM sync engine keeping tagged elements in the
//! active language, and in-app navigation that swaps the content container
//! without a full reload while keeping the tab list selection in sync.

pub mod config;
pub mod dom;
pub mod fetch;
pub mod i18n;
pub mod input;
pub mod nav;
pub mod site;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use i18n::Localizer;
pub use nav::NavigationCoordinator;
pub use site::SiteRuntime;
