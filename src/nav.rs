//! In-app navigation.
//!
//! [`NavigationCoordinator`] swaps page content without a full reload and
//! publishes lifecycle events; [`TabSelectionState`] renders the tab list and
//! keeps exactly one tab selected.

/// Page loading and swapping
pub mod coordinator;
/// Error types
pub mod error;
/// Tab list
pub mod tabs;

pub use coordinator::{
    NavigationCoordinator,
    NavigationEvent,
    NavigationOutcome,
    NavigationPhase,
};
pub use error::NavigationError;
pub use tabs::{
    TabClick,
    TabSelectionState,
};
