//! Element selectors.

/// The subset of CSS selectors the runtime needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `#id`
    Id(String),
    /// `tag` (case-insensitive)
    Tag(String),
    /// `.class`
    Class(String),
    /// `[name]`
    Attribute(String),
    /// `[name="value"]`
    AttributeValue(String, String),
}
