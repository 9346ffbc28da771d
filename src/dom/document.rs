//! Arena-backed document tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;

use super::Dom;
use super::listener::{
    Listener,
    ListenerId,
};
use super::mutation::{
    MutationRecord,
    MutationSender,
};
use super::selector::Selector;
use super::spec::NodeSpec;

/// Handle of an element inside a [`Document`].
///
/// Discarded elements free their slot for reuse. The generation tells a stale
/// handle apart from the element now living in the slot, so lookups through a
/// stale handle find nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Slot in the arena
    index: usize,
    /// Generation of the slot when the element was created
    generation: u32,
}

/// Loading state of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Complete,
}

/// Completes the ready state of a document from outside of it.
#[derive(Debug, Clone)]
pub struct ReadyTrigger {
    /// Shared with the owning document
    sender: Arc<watch::Sender<ReadyState>>,
}

impl ReadyTrigger {
    pub fn complete(&self) {
        self.sender.send_replace(ReadyState::Complete);
    }
}

/// One element of the arena.
#[derive(Debug)]
struct Node {
    /// Lowercase tag name
    tag: String,
    /// Attributes, `class` included
    attributes: BTreeMap<String, String>,
    /// Parent element, `None` for the root and detached subtrees
    parent: Option<NodeId>,
    /// Element children in document order
    children: Vec<NodeId>,
    /// Rendered content (inner markup)
    markup: String,
    /// Value property of form controls
    value: String,
    /// Whether the node is reachable from the root
    attached: bool,
    /// Bound event listeners
    listeners: Vec<(ListenerId, Listener)>,
}

/// Arena slot.
#[derive(Debug)]
struct Slot {
    /// Bumped every time the slot is freed
    generation: u32,
    /// Occupant, `None` while the slot is free
    node: Option<Node>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            markup: String::new(),
            value: String::new(),
            attached: false,
            listeners: Vec::new(),
        }
    }
}

/// In-memory document.
///
/// Children discarded by [`Document::replace_children`] and
/// [`Document::set_inner_markup`] are freed together with their subtree.
/// Nodes detached through [`Document::remove_child`] stay alive so they can be
/// inserted again.
#[derive(Debug)]
pub struct Document {
    /// Node arena
    slots: Vec<Slot>,
    /// Indices of free slots
    free: Vec<usize>,
    /// `<html>`
    root: NodeId,
    /// `<body>`
    body: NodeId,
    /// Document title
    title: String,
    /// Current location path
    location: String,
    /// Ready state publisher
    ready: Arc<watch::Sender<ReadyState>>,
    /// Registered mutation observers
    observers: Vec<MutationSender>,
    /// Next listener id
    next_listener_id: u64,
}

impl Document {
    /// Creates an empty document (`<html><body></body></html>`) at `location`.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        let mut root = Node::new("html");
        root.attached = true;
        let (ready, _) = watch::channel(ReadyState::Loading);

        let mut document = Self {
            slots: vec![Slot { generation: 0, node: Some(root) }],
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            body: NodeId { index: 0, generation: 0 },
            title: String::new(),
            location: location.into(),
            ready: Arc::new(ready),
            observers: Vec::new(),
            next_listener_id: 0,
        };

        let root = document.root;
        let body = document.create_element("body");
        document.append_child(root, body);
        document.body = body;
        document
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    #[must_use]
    pub fn ready_trigger(&self) -> ReadyTrigger {
        ReadyTrigger { sender: Arc::clone(&self.ready) }
    }

    /// Marks the document as fully loaded.
    pub fn mark_complete(&self) {
        self.ready.send_replace(ReadyState::Complete);
    }

    /// Number of observers still listening.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        if let Some(index) = self.free.pop()
            && let Some(slot) = self.slots.get_mut(index)
        {
            slot.node = Some(Node::new(tag));
            return NodeId { index, generation: slot.generation };
        }

        let index = self.slots.len();
        self.slots.push(Slot { generation: 0, node: Some(Node::new(tag)) });
        NodeId { index, generation: 0 }
    }

    /// Number of live elements, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Builds a detached subtree from `spec` and returns its root.
    pub fn instantiate(&mut self, spec: &NodeSpec) -> NodeId {
        let tag = if spec.tag.is_empty() { "div" } else { spec.tag.as_str() };
        let id = self.create_element(tag);
        if let Some(node) = self.node_mut(id) {
            node.attributes.clone_from(&spec.attributes);
            if let Some(text) = &spec.text {
                node.markup.clone_from(text);
            }
        }
        for child_spec in &spec.children {
            let child = self.instantiate(child_spec);
            self.append_child(id, child);
        }
        id
    }

    /// Appends `child` to `parent`, moving it out of its previous parent.
    ///
    /// Returns `false` when either node is unknown or the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return false;
        }
        if self.subtree(child).contains(&parent) {
            return false;
        }

        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }

        if self.is_attached(parent) {
            self.set_attached(child, true);
            self.notify(&MutationRecord::ChildList {
                target: parent,
                added: vec![child],
                removed: Vec::new(),
            });
        }
        true
    }

    /// Removes `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        if self.is_attached(parent) {
            self.notify(&MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }
        true
    }

    /// Replaces all children of `parent` with `children` as one mutation.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        if self.node(parent).is_none() {
            return;
        }

        let removed = self.take_children(parent);
        let mut added = Vec::with_capacity(children.len());
        for child in children {
            if self.node(child).is_none() || self.subtree(child).contains(&parent) {
                continue;
            }
            self.detach(child);
            if let Some(node) = self.node_mut(child) {
                node.parent = Some(parent);
            }
            added.push(child);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.clone_from(&added);
        }

        if self.is_attached(parent) {
            for child in &added {
                self.set_attached(*child, true);
            }
            self.notify(&MutationRecord::ChildList { target: parent, added, removed: removed.clone() });
        }
        self.discard(&removed);
    }

    pub fn clear_children(&mut self, parent: NodeId) {
        self.replace_children(parent, Vec::new());
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    /// `node` followed by its ancestors up to the root.
    #[must_use]
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.node(node).map(|_| node);
        while let Some(id) = current {
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.attached)
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).and_then(|n| n.attributes.get(name)).map(String::as_str)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(target) = self.node_mut(node) else {
            return;
        };
        target.attributes.insert(name.to_string(), value.to_string());
        if target.attached {
            self.notify(&MutationRecord::Attribute { target: node, name: name.to_string() });
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let target = self.node_mut(node)?;
        let old = target.attributes.remove(name)?;
        if target.attached {
            self.notify(&MutationRecord::Attribute { target: node, name: name.to_string() });
        }
        Some(old)
    }

    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.node(node).is_none() || self.has_class(node, class) {
            return;
        }
        let mut classes: Vec<&str> =
            self.attribute(node, "class").map(|c| c.split_whitespace().collect()).unwrap_or_default();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attribute(node, "class", &joined);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let remaining = self
            .attribute(node, "class")
            .map(|c| c.split_whitespace().filter(|c| *c != class).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        if remaining.is_empty() {
            self.remove_attribute(node, "class");
        } else {
            self.set_attribute(node, "class", &remaining);
        }
    }

    #[must_use]
    pub fn inner_markup(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.markup.as_str())
    }

    pub fn set_inner_markup(&mut self, node: NodeId, markup: &str) {
        if self.node(node).is_none() {
            return;
        }
        let removed = self.take_children(node);
        if let Some(target) = self.node_mut(node) {
            markup.clone_into(&mut target.markup);
        }
        if self.is_attached(node) {
            self.notify(&MutationRecord::ChildList {
                target: node,
                added: Vec::new(),
                removed: removed.clone(),
            });
        }
        self.discard(&removed);
    }

    #[must_use]
    pub fn value(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.value.as_str())
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(target) = self.node_mut(node) {
            value.clone_into(&mut target.value);
        }
    }

    /// First attached element whose `id` attribute equals `id`.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.subtree(self.root).into_iter().find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// First attached element whose `name` attribute equals `value`.
    #[must_use]
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        self.query_attribute_value(name, value).into_iter().next()
    }

    #[must_use]
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.subtree(self.root).into_iter().filter(|node| self.matches(*node, selector)).collect()
    }

    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.attribute(node, "id") == Some(id.as_str()),
            Selector::Tag(tag) => self.tag(node).is_some_and(|t| t.eq_ignore_ascii_case(tag)),
            Selector::Class(class) => self.has_class(node, class),
            Selector::Attribute(name) => self.attribute(node, name).is_some(),
            Selector::AttributeValue(name, value) => {
                self.attribute(node, name) == Some(value.as_str())
            }
        }
    }

    #[must_use]
    pub fn query_attribute(&self, name: &str) -> Vec<NodeId> {
        self.subtree(self.root)
            .into_iter()
            .filter(|node| self.attribute(*node, name).is_some())
            .collect()
    }

    #[must_use]
    pub fn query_attribute_value(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.subtree(self.root)
            .into_iter()
            .filter(|node| self.attribute(*node, name) == Some(value))
            .collect()
    }

    #[must_use]
    pub fn descendants_with_attribute(&self, node: NodeId, name: &str) -> Vec<NodeId> {
        self.subtree(node)
            .into_iter()
            .skip(1)
            .filter(|id| self.attribute(*id, name).is_some())
            .collect()
    }

    pub fn add_listener(&mut self, node: NodeId, listener: Listener) -> Option<ListenerId> {
        let id = ListenerId(self.next_listener_id);
        let target = self.node_mut(node)?;
        target.listeners.push((id, listener));
        self.next_listener_id += 1;
        Some(id)
    }

    pub fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        let Some(target) = self.node_mut(node) else {
            return false;
        };
        let before = target.listeners.len();
        target.listeners.retain(|(bound, _)| *bound != id);
        target.listeners.len() != before
    }

    #[must_use]
    pub fn listeners(&self, node: NodeId) -> Vec<(ListenerId, Listener)> {
        self.node(node).map(|n| n.listeners.clone()).unwrap_or_default()
    }

    pub fn observe(&mut self, sender: MutationSender) {
        self.observers.push(sender);
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Frees the subtrees of `removed` that were not inserted elsewhere.
    fn discard(&mut self, removed: &[NodeId]) {
        for &child in removed {
            if self.node(child).is_some_and(|node| node.parent.is_none()) && child != self.root {
                self.release(child);
            }
        }
    }

    /// Frees `from` and its descendants.
    fn release(&mut self, from: NodeId) {
        for id in self.subtree(from) {
            if let Some(slot) = self.slots.get_mut(id.index) {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    /// Publishes `record`, dropping observers whose receiver is gone.
    fn notify(&mut self, record: &MutationRecord) {
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    /// `from` and all of its descendants, pre-order.
    fn subtree(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn set_attached(&mut self, from: NodeId, attached: bool) {
        for id in self.subtree(from) {
            if let Some(node) = self.node_mut(id) {
                node.attached = attached;
            }
        }
    }

    /// Unlinks `child` from its parent without publishing a record.
    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
        self.set_attached(child, false);
    }

    /// Unlinks every child of `parent` and returns them.
    fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let removed = self.node_mut(parent).map(|n| std::mem::take(&mut n.children)).unwrap_or_default();
        for child in &removed {
            if let Some(node) = self.node_mut(*child) {
                node.parent = None;
            }
            self.set_attached(*child, false);
        }
        removed
    }
}

impl Dom for Document {
    fn query_attribute(&self, name: &str) -> Vec<NodeId> {
        Self::query_attribute(self, name)
    }

    fn query_attribute_value(&self, name: &str, value: &str) -> Vec<NodeId> {
        Self::query_attribute_value(self, name, value)
    }

    fn descendants_with_attribute(&self, node: NodeId, name: &str) -> Vec<NodeId> {
        Self::descendants_with_attribute(self, node, name)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        Self::attribute(self, node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        Self::set_attribute(self, node, name, value);
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        Self::remove_attribute(self, node, name)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        Self::tag(self, node)
    }

    fn is_attached(&self, node: NodeId) -> bool {
        Self::is_attached(self, node)
    }

    fn set_inner_markup(&mut self, node: NodeId, markup: &str) {
        Self::set_inner_markup(self, node, markup);
    }

    fn inner_markup(&self, node: NodeId) -> Option<&str> {
        Self::inner_markup(self, node)
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        Self::set_value(self, node, value);
    }

    fn value(&self, node: NodeId) -> Option<&str> {
        Self::value(self, node)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        Self::add_class(self, node, class);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        Self::remove_class(self, node, class);
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        Self::has_class(self, node, class)
    }

    fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        Self::get_element_by_id(self, id)
    }

    fn select(&self, selector: &Selector) -> Vec<NodeId> {
        Self::select(self, selector)
    }

    fn add_listener(&mut self, node: NodeId, listener: Listener) -> Option<ListenerId> {
        Self::add_listener(self, node, listener)
    }

    fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        Self::remove_listener(self, node, id)
    }

    fn listeners(&self, node: NodeId) -> Vec<(ListenerId, Listener)> {
        Self::listeners(self, node)
    }

    fn observe(&mut self, sender: MutationSender) {
        Self::observe(self, sender);
    }

    fn ready_signal(&self) -> watch::Receiver<ReadyState> {
        self.ready.subscribe()
    }
}
