//! Localization runtime.
//!
//! [`TranslationStore`] owns the catalog, the active language and the dynamic
//! parameters; [`DomSyncEngine`] keeps tagged elements of the document in sync
//! with it; [`Localizer`] wires the two together.

/// Error types
pub mod error;
/// Placeholder substitution
pub mod format;
/// Store and engine facade
pub mod localizer;
/// Translation state
pub mod store;
/// Document synchronisation
pub mod sync;

pub use error::RenderError;
pub use localizer::Localizer;
pub use store::{
    CatalogSource,
    NO_PARAMS,
    TranslationStore,
};
pub use sync::{
    DomSyncEngine,
    RenderStats,
    RenderTarget,
};
