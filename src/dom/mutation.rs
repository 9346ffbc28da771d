//! Mutation records published by the document.

use tokio::sync::mpsc;

use super::NodeId;

/// A single observed change on an attached node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children of `target` were inserted and/or removed.
    ChildList { target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId> },
    /// Attribute `name` of `target` was set or removed.
    Attribute { target: NodeId, name: String },
}

impl MutationRecord {
    #[must_use]
    pub const fn target(&self) -> NodeId {
        match self {
            Self::ChildList { target, .. } | Self::Attribute { target, .. } => *target,
        }
    }
}

pub type MutationSender = mpsc::UnboundedSender<MutationRecord>;
pub type MutationReceiver = mpsc::UnboundedReceiver<MutationRecord>;

/// Creates a channel suitable for [`super::Dom::observe`].
#[must_use]
pub fn mutation_channel() -> (MutationSender, MutationReceiver) {
    mpsc::unbounded_channel()
}
