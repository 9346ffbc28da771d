//! Site bootstrap: document shell and the runtime wiring every component.

/// Shared runtime state and event dispatch
pub mod runtime;
/// Page shell
pub mod shell;

pub use runtime::{
    ClickOutcome,
    SiteRuntime,
};
pub use shell::shell_spec;
