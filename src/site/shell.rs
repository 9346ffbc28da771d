//! Static page shell surrounding the swapped content.

use crate::config::RuntimeSettings;
use crate::dom::NodeSpec;

/// `header > (ul[role=tablist], select#switcher)` followed by the content container.
#[must_use]
pub fn shell_spec(settings: &RuntimeSettings) -> NodeSpec {
    let header = NodeSpec::element("header")
        .child(NodeSpec::element("ul").attr("role", &settings.navigation.tab_list_role))
        .child(NodeSpec::element("select").attr("id", &settings.markers.switcher_id));
    let main = NodeSpec::element("main").attr("id", &settings.navigation.content_container_id);

    NodeSpec::element("div").attr("class", "window").child(header).child(main)
}
