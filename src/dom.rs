//! Headless document model.
//!
//! An in-memory element tree standing in for the browser document. Every
//! mutation on an attached node is published as a [`MutationRecord`] to the
//! registered observers, which is what the localization engine reacts to.

/// Arena-backed document
mod document;
/// Event listener registry types
mod listener;
/// Mutation records
mod mutation;
/// Element selectors
mod selector;
/// Serializable subtree description
mod spec;

use tokio::sync::watch;

pub use document::{
    Document,
    NodeId,
    ReadyState,
    ReadyTrigger,
};
pub use listener::{
    Listener,
    ListenerId,
};
pub use mutation::{
    MutationReceiver,
    MutationRecord,
    MutationSender,
    mutation_channel,
};
pub use selector::Selector;
pub use spec::NodeSpec;

/// Document operations used by the DOM sync engine.
///
/// [`Document`] is the production implementation. The trait exists so that the
/// engine can be driven by a document that reacts to its writes (e.g. inserting
/// new tagged elements while a render pass is running).
pub trait Dom {
    /// All attached nodes carrying `name`, in document order.
    fn query_attribute(&self, name: &str) -> Vec<NodeId>;

    /// All attached nodes whose `name` attribute equals `value`, in document order.
    fn query_attribute_value(&self, name: &str, value: &str) -> Vec<NodeId>;

    /// Descendants of `node` (excluding itself) carrying `name`.
    fn descendants_with_attribute(&self, node: NodeId, name: &str) -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String>;

    /// Lowercase tag name.
    fn tag(&self, node: NodeId) -> Option<&str>;

    fn is_attached(&self, node: NodeId) -> bool;

    /// Replaces the rendered content of `node`. Element children are detached.
    fn set_inner_markup(&mut self, node: NodeId, markup: &str);

    fn inner_markup(&self, node: NodeId) -> Option<&str>;

    /// Sets the value property of a form control. Not observable as a mutation.
    fn set_value(&mut self, node: NodeId, value: &str);

    fn value(&self, node: NodeId) -> Option<&str>;

    fn add_class(&mut self, node: NodeId, class: &str);

    fn remove_class(&mut self, node: NodeId, class: &str);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn get_element_by_id(&self, id: &str) -> Option<NodeId>;

    /// All attached nodes matching `selector`, in document order.
    fn select(&self, selector: &Selector) -> Vec<NodeId>;

    fn add_listener(&mut self, node: NodeId, listener: Listener) -> Option<ListenerId>;

    fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool;

    fn listeners(&self, node: NodeId) -> Vec<(ListenerId, Listener)>;

    /// Registers an observer that receives every subsequent mutation record.
    fn observe(&mut self, sender: MutationSender);

    /// Receiver tracking the document ready state.
    fn ready_signal(&self) -> watch::Receiver<ReadyState>;
}
