//! Serializable subtree description used for page fragments and fixtures.

use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};

/// Description of an element and its subtree.
///
/// # Examples
/// ```
/// use site_runtime::dom::NodeSpec;
///
/// let spec = NodeSpec::element("p").attr("data-lang-id", "greet").text("Hi");
/// assert_eq!(spec.attributes.get("data-lang-id").map(String::as_str), Some("greet"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeSpec {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Initial rendered content.
    pub text: Option<String>,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Self::default() }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[googletest::test]
    fn deserialize_fills_defaults() {
        let spec: NodeSpec =
            serde_json::from_str(r#"{"tag":"p","attributes":{"data-lang-id":"a"}}"#).unwrap();

        expect_that!(spec.tag, eq("p"));
        expect_that!(spec.text, none());
        expect_that!(spec.children, is_empty());
    }

    #[googletest::test]
    fn builder_nests_children() {
        let spec = NodeSpec::element("ul").child(NodeSpec::element("li").text("one"));

        expect_that!(spec.children, len(eq(1)));
        expect_that!(spec.children[0].text, some(eq("one")));
    }
}
