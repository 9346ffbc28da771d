//! Page fragment input definitions.
//!
//! A navigation swap only replaces the document title and the content
//! container, so a fetched page only needs to describe those two regions.

use serde::{
    Deserialize,
    Serialize,
};

use crate::dom::NodeSpec;

/// Replacement content for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PageFragment {
    pub title: String,
    /// Children of the content container, in order.
    #[serde(default)]
    pub main: Vec<NodeSpec>,
}

impl PageFragment {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn from_json_reads_title_and_main() {
        let page = PageFragment::from_json(
            r#"{"title": "About", "main": [{"tag": "h1", "attributes": {"data-lang-id": "about_title"}}]}"#,
        )
        .unwrap();

        assert_eq!(page.title, "About");
        assert_eq!(page.main.len(), 1);
        assert_eq!(page.main[0].tag, "h1");
    }

    #[rstest]
    fn main_defaults_to_empty() {
        let page = PageFragment::from_json(r#"{"title": "Empty"}"#).unwrap();

        assert!(page.main.is_empty());
    }

    #[rstest]
    #[case::missing_title(r#"{"main": []}"#)]
    #[case::html("<html></html>")]
    fn invalid_fragments_fail(#[case] json: &str) {
        assert!(PageFragment::from_json(json).is_err());
    }
}
